use std::io::Write;

use billbook_core::{
    core::services::{SheetRow, SheetService},
    domain::{BillBook, MonthOwner},
};

fn pix_row(supplier: &str) -> SheetRow {
    SheetRow {
        year: 2025,
        kind: Some("PIX".into()),
        bank: Some("Nubank".into()),
        group: Some("Personal".into()),
        supplier: Some(supplier.into()),
        ..SheetRow::default()
    }
}

#[test]
fn importing_the_same_rows_twice_creates_nothing_new() {
    let mut book = BillBook::new("Home");
    let mut row = pix_row("Netflix");
    row.january = Some(100.0);

    let first = SheetService::import_rows(&mut book, &[row.clone()]);
    assert_eq!(first.bills_created, 1);
    assert_eq!(first.expenses_created, 1);

    let bill = book.bill_by_name("personal pix nubank", 2025).unwrap();
    let bill_id = bill.id;
    let total_after_first = bill.total;
    assert_eq!(total_after_first, 100.0);

    let second = SheetService::import_rows(&mut book, &[row]);
    assert_eq!(second.bills_created, 0);
    assert_eq!(second.expenses_created, 0);
    assert_eq!(second.bills_reused, 1);
    assert_eq!(second.expenses_reused, 1);

    // One bill, one expense, identical totals.
    assert_eq!(book.bills.iter().filter(|b| b.is_active()).count(), 1);
    assert_eq!(book.expenses_of_bill(bill_id).len(), 1);
    assert_eq!(book.bill(bill_id).unwrap().total, total_after_first);
}

#[test]
fn imported_rows_follow_the_interactive_naming_rules() {
    let mut book = BillBook::new("Home");
    let mut card_row = pix_row("Amazon");
    card_row.kind = Some("CREDIT_CARD".into());
    SheetService::import_rows(&mut book, &[card_row]);

    // Credit-card bills keep the doubled bank name on the import path too.
    let bill = book
        .bill_by_name("personal credit card nubank nubank", 2025)
        .expect("credit card bill");
    assert_eq!(bill.name, "Personal Credit Card Nubank Nubank");
    let expense = book.expenses_of_bill(bill.id)[0];
    assert_eq!(expense.name, "Personal Credit Card Nubank Nubank Amazon");
}

#[test]
fn aggregate_rows_resolve_children_and_fold_totals() {
    let mut book = BillBook::new("Home");
    let mut parent = pix_row("Streaming Bundle");
    parent.aggregate_name = Some("Streaming".into());
    parent.children = Some("Netflix; Spotify".into());

    let mut netflix = pix_row("Netflix");
    netflix.aggregate_name = Some("Streaming".into());
    netflix.march = Some(40.0);

    let mut spotify = pix_row("Spotify");
    spotify.aggregate_name = Some("Streaming".into());
    spotify.march = Some(20.0);
    spotify.march_paid = Some(true);

    let summary = SheetService::import_rows(&mut book, &[parent, netflix, spotify]);
    assert!(summary.rejected.is_empty(), "{:?}", summary.rejected);
    // Parent + two children on the first row; the child rows only fill values.
    assert_eq!(summary.expenses_created, 3);

    let bill = book.bill_by_name("personal pix nubank", 2025).unwrap();
    let parent = book
        .expense_in_bill(bill.id, "personal pix nubank streaming bundle")
        .unwrap();
    assert_eq!(parent.children.len(), 2);
    assert_eq!(parent.total, 60.0);
    assert_eq!(parent.total_paid, 20.0);

    let march = book
        .months_of(MonthOwner::Expense(parent.id))
        .into_iter()
        .find(|m| m.code == 3)
        .unwrap();
    assert_eq!(march.value, 60.0);

    // The bill counts the aggregate once, not the children twice.
    assert_eq!(bill.total, 60.0);
}

#[test]
fn csv_files_import_idempotently_and_reject_bad_rows_alone() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("bills.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "year,kind,bank,group,supplier,january,january_paid,february").unwrap();
    writeln!(file, "2025,PIX,Nubank,Personal,Netflix,100.0,true,").unwrap();
    writeln!(file, "2025,PIX,,Personal,Orphan,50.0,,").unwrap();
    writeln!(file, "2025,BANK_SLIP,Itaú,Personal,Condominium,0.0,,380.5").unwrap();
    drop(file);

    let mut book = BillBook::new("Home");
    let first = SheetService::import_path(&mut book, &path).unwrap();
    assert_eq!(first.rejected.len(), 1, "{:?}", first.rejected);
    assert_eq!(first.rejected[0].row, 1);
    assert_eq!(first.bills_created, 2);
    assert_eq!(first.expenses_created, 2);

    let pix = book.bill_by_name("personal pix nubank", 2025).unwrap();
    assert_eq!(pix.total, 100.0);
    assert_eq!(pix.total_paid, 100.0);
    let pix_id = pix.id;
    let slip = book.bill_by_name("personal bank slip itau", 2025).unwrap();
    assert_eq!(slip.total, 380.5);
    let slip_id = slip.id;

    let second = SheetService::import_path(&mut book, &path).unwrap();
    assert_eq!(second.bills_created, 0);
    assert_eq!(second.expenses_created, 0);
    assert_eq!(book.bill(pix_id).unwrap().total, 100.0);
    assert_eq!(book.bill(slip_id).unwrap().total, 380.5);
}
