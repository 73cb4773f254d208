//! Bill lifecycle: creation, uniqueness, expense orchestration, rollover
//! into the following year, and the (group, year) report.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{month_code, name_code, Bill, BillBook, BillKind, Expense, MonthOwner};
use crate::errors::{BillError, Result};

use super::expense_service::{ExpenseRequest, ExpenseService};
use super::month_service::MonthService;

/// Creation/update payload for a bill.
#[derive(Debug, Clone)]
pub struct BillRequest {
    pub year: i32,
    pub kind: BillKind,
    pub bank_id: Option<Uuid>,
    pub bank_name: Option<String>,
    pub group_id: Option<Uuid>,
    pub group_name: Option<String>,
    /// When set, a duplicate (name, year) returns the stored bill instead of
    /// conflicting. The import path relies on this.
    pub return_existing: bool,
}

impl BillRequest {
    pub fn new(year: i32, kind: BillKind) -> Self {
        Self {
            year,
            kind,
            bank_id: None,
            bank_name: None,
            group_id: None,
            group_name: None,
            return_existing: false,
        }
    }
}

/// Payload for adding a recurring charge to a bill.
#[derive(Debug, Clone)]
pub struct AddExpenseRequest {
    pub expense: ExpenseRequest,
    pub value: f64,
    /// Month name, resolved through the month table ("November" -> 11).
    pub start_month: String,
    pub paid: bool,
}

/// What `add_expense` produced: the expense itself plus the rolled
/// (bill, expense) pair when the instalments overflowed the year.
#[derive(Debug, Clone)]
pub struct AddExpenseOutcome {
    pub expense_id: Uuid,
    pub rolled: Option<(Uuid, Uuid)>,
}

/// Read model for the (group, year) spreadsheet report: the full entity
/// graph with totals pre-computed, never recomputed by consumers.
#[derive(Debug, Clone)]
pub struct BillReport {
    pub bill_id: Uuid,
    pub name: String,
    pub year: i32,
    pub kind: BillKind,
    pub bank: String,
    pub group: String,
    pub total: f64,
    pub total_paid: f64,
    pub all_paid: bool,
    pub expenses: Vec<ExpenseReport>,
}

#[derive(Debug, Clone)]
pub struct ExpenseReport {
    pub expense_id: Uuid,
    pub name: String,
    pub supplier: String,
    pub total: f64,
    pub total_paid: f64,
    pub paid: bool,
    pub is_aggregate: bool,
    pub children: Vec<Uuid>,
    pub months: Vec<MonthCell>,
}

#[derive(Debug, Clone)]
pub struct MonthCell {
    pub code: u8,
    pub label: String,
    pub value: f64,
    pub paid: bool,
}

pub struct BillService;

impl BillService {
    /// Creates a bill for a (bank, group, kind, year) combination.
    ///
    /// The canonical name is derived from the group, the humanized kind and
    /// the bank. A non-deleted bill with the same (name, year) conflicts
    /// unless the caller asked for the existing row back.
    pub fn create(book: &mut BillBook, req: &BillRequest) -> Result<Uuid> {
        let bank_id = Self::resolve_bank(book, req)?;
        let group_id = Self::resolve_group(book, req)?;
        let bank_name = book.bank(bank_id).map(|b| b.name.clone()).unwrap_or_default();
        let group_name = book
            .group(group_id)
            .map(|g| g.name.clone())
            .unwrap_or_default();

        let name = Bill::derive_name(&group_name, req.kind, &bank_name);
        if let Some(existing) = book.bill_by_name(&name_code(&name), req.year) {
            if req.return_existing {
                return Ok(existing.id);
            }
            return Err(BillError::Conflict(format!(
                "bill `{}` already exists for {}",
                name, req.year
            )));
        }
        let bill = Bill::new(name.clone(), req.year, req.kind, bank_id, group_id);
        let id = book.add_bill(bill);
        tracing::info!(bill = %name, year = req.year, "created bill");
        Ok(id)
    }

    /// Re-derives the name from the requested bank/group/kind and applies
    /// the same uniqueness rule as creation.
    pub fn update(book: &mut BillBook, bill_id: Uuid, req: &BillRequest) -> Result<()> {
        let (current_bank, current_group) = {
            let bill = book
                .bill(bill_id)
                .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
            (bill.bank_id, bill.group_id)
        };
        let bank_id = match (req.bank_id, req.bank_name.as_deref()) {
            (Some(id), _) => {
                book.bank(id)
                    .ok_or_else(|| BillError::NotFound(format!("bank {id}")))?;
                id
            }
            (None, Some(name)) => book.find_or_create_bank(name),
            (None, None) => current_bank,
        };
        let group_id = match (req.group_id, req.group_name.as_deref()) {
            (Some(id), _) => {
                book.group(id)
                    .ok_or_else(|| BillError::NotFound(format!("group {id}")))?;
                id
            }
            (None, Some(name)) => book.find_or_create_group(name),
            (None, None) => current_group,
        };
        let bank_name = book.bank(bank_id).map(|b| b.name.clone()).unwrap_or_default();
        let group_name = book
            .group(group_id)
            .map(|g| g.name.clone())
            .unwrap_or_default();
        let name = Bill::derive_name(&group_name, req.kind, &bank_name);
        let code = name_code(&name);
        if let Some(other) = book.bill_by_name(&code, req.year) {
            if other.id != bill_id {
                return Err(BillError::Conflict(format!(
                    "bill `{}` already exists for {}",
                    name, req.year
                )));
            }
        }
        let bill = book
            .bill_mut(bill_id)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        bill.name = name;
        bill.name_code = code;
        bill.year = req.year;
        bill.kind = req.kind;
        bill.bank_id = bank_id;
        bill.group_id = group_id;
        bill.updated_at = Utc::now();
        book.touch();
        Ok(())
    }

    /// Adds a recurring charge to the bill, rolling overflow instalments
    /// into the following year's bill.
    ///
    /// The duplicate-sibling guard runs before anything is created, so
    /// adding the same recurring charge twice conflicts instead of
    /// producing twins. When the distribution overflows, the `year + 1`
    /// bill for the same (bank, group, kind) is created or reused and the
    /// overflow months are delegated to the expense manager.
    pub fn add_expense(
        book: &mut BillBook,
        bill_id: Uuid,
        req: &AddExpenseRequest,
    ) -> Result<AddExpenseOutcome> {
        let bill = book
            .bill(bill_id)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        let (kind, bank_id, group_id) = (bill.kind, bill.bank_id, bill.group_id);

        let start = month_code(&req.start_month)?;
        let expense_id = ExpenseService::create(book, bill_id, &req.expense)?;
        let instalments = book
            .expense(expense_id)
            .map(|e| e.instalment_number)
            .unwrap_or(1);
        let dist =
            ExpenseService::initialize(book, expense_id, req.value, start, instalments, req.paid)?;

        let mut rolled = None;
        if dist.requires_new_bill {
            let next_req = BillRequest {
                year: dist.next_year_number,
                kind,
                bank_id: Some(bank_id),
                bank_name: None,
                group_id: Some(group_id),
                group_name: None,
                return_existing: true,
            };
            let next_bill_id = Self::create(book, &next_req)?;
            let template_code = book
                .expense(expense_id)
                .map(|e| e.name_code.clone())
                .unwrap_or_default();
            let existing = Self::exist_expense_in_bill(book, next_bill_id, &template_code);
            let next_expense_id = ExpenseService::add_expense_for_next_year(
                book,
                next_bill_id,
                &dist.next_year,
                dist.next_year_number,
                expense_id,
                existing,
            )?;
            rolled = Some((next_bill_id, next_expense_id));
        }

        ExpenseService::refresh_bill_totals(book, bill_id)?;
        Ok(AddExpenseOutcome { expense_id, rolled })
    }

    /// Returns the id of a non-deleted expense with the given natural key
    /// inside the bill, if any.
    pub fn exist_expense_in_bill(book: &BillBook, bill_id: Uuid, code: &str) -> Option<Uuid> {
        book.expense_in_bill(bill_id, code).map(|e| e.id)
    }

    /// Soft-deletes the bill. Refused while the bill still owns any
    /// non-deleted expense.
    pub fn remove(book: &mut BillBook, bill_id: Uuid) -> Result<()> {
        let bill = book
            .bill(bill_id)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        let name = bill.name.clone();
        let owned = book.expenses_of_bill(bill_id).len();
        if owned > 0 {
            return Err(BillError::Conflict(format!(
                "bill `{name}` still owns {owned} expenses"
            )));
        }
        book.soft_remove_bill(bill_id);
        tracing::info!(bill = %name, "removed bill");
        Ok(())
    }

    /// Removes an expense through its owning bill, cascading its ledger.
    pub fn remove_expense(book: &mut BillBook, bill_id: Uuid, expense_id: Uuid) -> Result<String> {
        let expense = book
            .expense(expense_id)
            .filter(|e| e.bill_id == bill_id)
            .ok_or_else(|| {
                BillError::NotFound(format!("expense {expense_id} in bill {bill_id}"))
            })?;
        let parent_id = expense.parent_id;
        book.soft_remove_expense(expense_id);
        let summary = MonthService::remove_list(book, MonthOwner::Expense(expense_id));
        if let Some(parent_id) = parent_id {
            if let Some(parent) = book.expense_mut(parent_id) {
                parent.children.retain(|c| *c != expense_id);
            }
            ExpenseService::rebuild_aggregate(book, parent_id)?;
        }
        ExpenseService::refresh_bill_totals(book, bill_id)?;
        Ok(summary)
    }

    /// Read-only aggregation of every bill of a (group, year) pair for the
    /// spreadsheet export. An unknown pair yields an empty list.
    pub fn spreadsheet_processing(book: &BillBook, group_id: Uuid, year: i32) -> Vec<BillReport> {
        book.bills_of_group(group_id, year)
            .into_iter()
            .map(|bill| BillReport {
                bill_id: bill.id,
                name: bill.name.clone(),
                year: bill.year,
                kind: bill.kind,
                bank: book
                    .bank(bill.bank_id)
                    .map(|b| b.name.clone())
                    .unwrap_or_default(),
                group: book
                    .group(bill.group_id)
                    .map(|g| g.name.clone())
                    .unwrap_or_default(),
                total: bill.total,
                total_paid: bill.total_paid,
                all_paid: bill.all_paid,
                expenses: book
                    .expenses_of_bill(bill.id)
                    .into_iter()
                    .map(|expense| Self::expense_report(book, expense))
                    .collect(),
            })
            .collect()
    }

    fn expense_report(book: &BillBook, expense: &Expense) -> ExpenseReport {
        let mut months: Vec<MonthCell> = book
            .months_of(MonthOwner::Expense(expense.id))
            .into_iter()
            .map(|m| MonthCell {
                code: m.code,
                label: m.label.clone(),
                value: m.value,
                paid: m.paid,
            })
            .collect();
        months.sort_by_key(|m| m.code);
        ExpenseReport {
            expense_id: expense.id,
            name: expense.name.clone(),
            supplier: book
                .supplier(expense.supplier_id)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            total: expense.total,
            total_paid: expense.total_paid,
            paid: expense.paid,
            is_aggregate: expense.is_aggregate,
            children: expense.children.clone(),
            months,
        }
    }

    fn resolve_bank(book: &mut BillBook, req: &BillRequest) -> Result<Uuid> {
        match (req.bank_id, req.bank_name.as_deref()) {
            (Some(id), _) => {
                book.bank(id)
                    .ok_or_else(|| BillError::NotFound(format!("bank {id}")))?;
                Ok(id)
            }
            (None, Some(name)) => Ok(book.find_or_create_bank(name)),
            (None, None) => Err(BillError::Validation(
                "a bill needs a bank id or a bank name".into(),
            )),
        }
    }

    fn resolve_group(book: &mut BillBook, req: &BillRequest) -> Result<Uuid> {
        match (req.group_id, req.group_name.as_deref()) {
            (Some(id), _) => {
                book.group(id)
                    .ok_or_else(|| BillError::NotFound(format!("group {id}")))?;
                Ok(id)
            }
            (None, Some(name)) => Ok(book.find_or_create_group(name)),
            (None, None) => Err(BillError::Validation(
                "a bill needs a group id or a group name".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExpenseKind;

    fn pix_request(year: i32) -> BillRequest {
        BillRequest {
            bank_name: Some("Nubank".into()),
            group_name: Some("Personal".into()),
            ..BillRequest::new(year, BillKind::Pix)
        }
    }

    fn charge(supplier: &str, instalments: u32, value: f64, month: &str) -> AddExpenseRequest {
        AddExpenseRequest {
            expense: ExpenseRequest {
                supplier_name: Some(supplier.into()),
                kind: ExpenseKind::Fixed,
                instalment_number: instalments,
                ..ExpenseRequest::default()
            },
            value,
            start_month: month.into(),
            paid: false,
        }
    }

    #[test]
    fn create_derives_the_canonical_name() {
        let mut book = BillBook::new("Home");
        let id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        assert_eq!(book.bill(id).unwrap().name, "Personal Pix Nubank");
    }

    #[test]
    fn duplicate_name_year_conflicts_unless_reuse_requested() {
        let mut book = BillBook::new("Home");
        let first = BillService::create(&mut book, &pix_request(2025)).unwrap();
        let err = BillService::create(&mut book, &pix_request(2025)).unwrap_err();
        assert!(matches!(err, BillError::Conflict(_)));

        let mut reuse = pix_request(2025);
        reuse.return_existing = true;
        assert_eq!(BillService::create(&mut book, &reuse).unwrap(), first);

        // A different year is a different bill.
        assert_ne!(
            BillService::create(&mut book, &pix_request(2026)).unwrap(),
            first
        );
    }

    #[test]
    fn credit_card_bills_keep_the_doubled_bank_name() {
        let mut book = BillBook::new("Home");
        let req = BillRequest {
            bank_name: Some("Nubank".into()),
            group_name: Some("Personal".into()),
            ..BillRequest::new(2025, BillKind::CreditCard)
        };
        let id = BillService::create(&mut book, &req).unwrap();
        // Inherited convention, intentionally not "fixed".
        assert_eq!(
            book.bill(id).unwrap().name,
            "Personal Credit Card Nubank Nubank"
        );
    }

    #[test]
    fn add_expense_rolls_overflow_into_a_new_bill() {
        let mut book = BillBook::new("Home");
        let bill_id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        let outcome =
            BillService::add_expense(&mut book, bill_id, &charge("Sofa Store", 3, 90.0, "November"))
                .unwrap();

        let (rolled_bill, rolled_expense) = outcome.rolled.expect("instalments overflow");
        let next_bill = book.bill(rolled_bill).unwrap();
        assert_eq!(next_bill.year, 2026);
        assert_eq!(next_bill.name, "Personal Pix Nubank");

        // Current year keeps Nov + Dec, next year carries Jan.
        let current = book.expense(outcome.expense_id).unwrap();
        assert_eq!(current.total, 180.0);
        let rolled = book.expense(rolled_expense).unwrap();
        assert_eq!(rolled.total, 90.0);
        assert_eq!(book.months_of(MonthOwner::Expense(rolled_expense)).len(), 12);
    }

    #[test]
    fn adding_the_same_charge_twice_conflicts() {
        let mut book = BillBook::new("Home");
        let bill_id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        BillService::add_expense(&mut book, bill_id, &charge("Netflix", 1, 40.0, "January"))
            .unwrap();
        let err =
            BillService::add_expense(&mut book, bill_id, &charge("Netflix", 1, 40.0, "March"))
                .unwrap_err();
        assert!(matches!(err, BillError::Conflict(_)));
    }

    #[test]
    fn invalid_month_token_fails_before_anything_is_written() {
        let mut book = BillBook::new("Home");
        let bill_id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        let err =
            BillService::add_expense(&mut book, bill_id, &charge("Netflix", 1, 40.0, "Brumaire"))
                .unwrap_err();
        assert!(matches!(err, BillError::Precondition(_)));
        assert!(book.expenses_of_bill(bill_id).is_empty());
    }

    #[test]
    fn remove_is_guarded_by_owned_expenses() {
        let mut book = BillBook::new("Home");
        let bill_id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        let outcome =
            BillService::add_expense(&mut book, bill_id, &charge("Netflix", 1, 40.0, "January"))
                .unwrap();

        let err = BillService::remove(&mut book, bill_id).unwrap_err();
        assert!(matches!(err, BillError::Conflict(_)));

        BillService::remove_expense(&mut book, bill_id, outcome.expense_id).unwrap();
        BillService::remove(&mut book, bill_id).unwrap();
        assert!(book.bill(bill_id).is_none());
    }

    #[test]
    fn spreadsheet_processing_aggregates_the_group_year_pair() {
        let mut book = BillBook::new("Home");
        let bill_id = BillService::create(&mut book, &pix_request(2025)).unwrap();
        BillService::add_expense(&mut book, bill_id, &charge("Netflix", 2, 40.0, "January"))
            .unwrap();
        let group_id = book.bill(bill_id).unwrap().group_id;

        let reports = BillService::spreadsheet_processing(&book, group_id, 2025);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].bank, "Nubank");
        assert_eq!(reports[0].total, 80.0);
        assert_eq!(reports[0].expenses.len(), 1);
        assert_eq!(reports[0].expenses[0].months.len(), 12);

        // Unknown pairs aggregate to nothing rather than failing.
        assert!(BillService::spreadsheet_processing(&book, group_id, 1999).is_empty());
    }
}
