//! Spreadsheet-driven reconciliation: typed rows upserted through the same
//! lifecycle rules as the interactive path.
//!
//! Every row is an independent natural-key upsert, so a malformed row is
//! rejected on its own while the rest of the file keeps importing, and
//! re-importing an unchanged file creates nothing.

use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{name_code, Bill, BillBook, BillKind, ExpenseKind, MonthOwner};
use crate::errors::{BillError, Result};

use super::bill_service::{BillRequest, BillService};
use super::distributor::MonthSlot;
use super::expense_service::{ExpenseRequest, ExpenseService};
use super::month_service::MonthService;

/// One typed spreadsheet row.
///
/// A row locates a bill (`year`, `kind`, `bank`, `group`) and optionally
/// carries one charge for it: a plain `supplier`, an aggregate parent
/// (`supplier` + `aggregate_name` + `children`), or an aggregate child
/// (`supplier` + `aggregate_name`). Month columns hold the charged value;
/// a present zero is recorded as a zero-value ledger entry, an absent cell
/// leaves the default slot untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetRow {
    pub year: i32,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub bank: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub expense_kind: Option<String>,
    #[serde(default)]
    pub aggregate_name: Option<String>,
    /// `;`-separated supplier names of an aggregate's children.
    #[serde(default)]
    pub children: Option<String>,
    #[serde(default)]
    pub january: Option<f64>,
    #[serde(default)]
    pub january_paid: Option<bool>,
    #[serde(default)]
    pub february: Option<f64>,
    #[serde(default)]
    pub february_paid: Option<bool>,
    #[serde(default)]
    pub march: Option<f64>,
    #[serde(default)]
    pub march_paid: Option<bool>,
    #[serde(default)]
    pub april: Option<f64>,
    #[serde(default)]
    pub april_paid: Option<bool>,
    #[serde(default)]
    pub may: Option<f64>,
    #[serde(default)]
    pub may_paid: Option<bool>,
    #[serde(default)]
    pub june: Option<f64>,
    #[serde(default)]
    pub june_paid: Option<bool>,
    #[serde(default)]
    pub july: Option<f64>,
    #[serde(default)]
    pub july_paid: Option<bool>,
    #[serde(default)]
    pub august: Option<f64>,
    #[serde(default)]
    pub august_paid: Option<bool>,
    #[serde(default)]
    pub september: Option<f64>,
    #[serde(default)]
    pub september_paid: Option<bool>,
    #[serde(default)]
    pub october: Option<f64>,
    #[serde(default)]
    pub october_paid: Option<bool>,
    #[serde(default)]
    pub november: Option<f64>,
    #[serde(default)]
    pub november_paid: Option<bool>,
    #[serde(default)]
    pub december: Option<f64>,
    #[serde(default)]
    pub december_paid: Option<bool>,
}

impl SheetRow {
    /// The month slots the row explicitly carries, in calendar order.
    pub fn slots(&self) -> Vec<MonthSlot> {
        let values = [
            (1u8, self.january, self.january_paid),
            (2, self.february, self.february_paid),
            (3, self.march, self.march_paid),
            (4, self.april, self.april_paid),
            (5, self.may, self.may_paid),
            (6, self.june, self.june_paid),
            (7, self.july, self.july_paid),
            (8, self.august, self.august_paid),
            (9, self.september, self.september_paid),
            (10, self.october, self.october_paid),
            (11, self.november, self.november_paid),
            (12, self.december, self.december_paid),
        ];
        values
            .into_iter()
            .filter_map(|(code, value, paid)| {
                value.map(|value| MonthSlot {
                    code,
                    value,
                    paid: paid.unwrap_or(false),
                })
            })
            .collect()
    }
}

/// Aggregated result of one import run.
#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub bills_created: usize,
    pub bills_reused: usize,
    pub expenses_created: usize,
    pub expenses_reused: usize,
    pub rejected: Vec<RowRejection>,
}

#[derive(Debug, Clone)]
pub struct RowRejection {
    pub row: usize,
    pub reason: String,
}

struct RowOutcome {
    bill_created: bool,
    expenses_created: usize,
    expense_touched: bool,
}

pub struct SheetService;

impl SheetService {
    /// Reads a csv file of [`SheetRow`]s and reconciles it into the book.
    ///
    /// Unreadable files fail as a whole; unreadable rows are rejected
    /// individually and the remaining rows keep importing.
    pub fn import_path(book: &mut BillBook, path: &Path) -> Result<ImportSummary> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| BillError::Storage(format!("cannot open sheet: {e}")))?;
        let mut summary = ImportSummary::default();
        for (idx, record) in reader.deserialize::<SheetRow>().enumerate() {
            match record {
                Ok(row) => Self::reconcile_row(book, &row, idx, &mut summary),
                Err(e) => summary.rejected.push(RowRejection {
                    row: idx,
                    reason: format!("malformed row: {e}"),
                }),
            }
        }
        tracing::info!(
            bills = summary.bills_created,
            expenses = summary.expenses_created,
            rejected = summary.rejected.len(),
            "imported sheet"
        );
        Ok(summary)
    }

    /// Reconciles already-parsed rows; the entry point the tests and any
    /// non-csv tabular source use.
    pub fn import_rows(book: &mut BillBook, rows: &[SheetRow]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for (idx, row) in rows.iter().enumerate() {
            Self::reconcile_row(book, row, idx, &mut summary);
        }
        summary
    }

    fn reconcile_row(book: &mut BillBook, row: &SheetRow, idx: usize, summary: &mut ImportSummary) {
        match Self::upsert_row(book, row) {
            Ok(outcome) => {
                if outcome.bill_created {
                    summary.bills_created += 1;
                } else {
                    summary.bills_reused += 1;
                }
                match outcome.expenses_created {
                    0 if outcome.expense_touched => summary.expenses_reused += 1,
                    0 => {}
                    n => summary.expenses_created += n,
                }
            }
            Err(e) => summary.rejected.push(RowRejection {
                row: idx,
                reason: e.to_string(),
            }),
        }
    }

    fn upsert_row(book: &mut BillBook, row: &SheetRow) -> Result<RowOutcome> {
        let bank = row
            .bank
            .as_deref()
            .ok_or_else(|| BillError::Validation("row is missing a bank".into()))?;
        let group = row
            .group
            .as_deref()
            .ok_or_else(|| BillError::Validation("row is missing a group".into()))?;
        let kind = row
            .kind
            .as_deref()
            .ok_or_else(|| BillError::Validation("row is missing a bill kind".into()))
            .and_then(BillKind::parse)?;

        let (bill_id, bill_created) = Self::upsert_bill(book, row.year, kind, bank, group)?;
        let mut outcome = RowOutcome {
            bill_created,
            expenses_created: 0,
            expense_touched: false,
        };

        let Some(supplier) = row.supplier.as_deref() else {
            if row.children.is_some() || row.aggregate_name.is_some() {
                return Err(BillError::Validation(
                    "aggregate rows need a supplier".into(),
                ));
            }
            return Ok(outcome);
        };
        let expense_kind = match row.expense_kind.as_deref() {
            Some(token) => ExpenseKind::parse(token)?,
            None => ExpenseKind::Variable,
        };

        let children: Vec<&str> = row
            .children
            .as_deref()
            .map(|raw| {
                raw.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if !children.is_empty() {
            let label = row.aggregate_name.as_deref().ok_or_else(|| {
                BillError::Validation("aggregate rows need an aggregate name".into())
            })?;
            Self::upsert_aggregate(book, bill_id, supplier, expense_kind, label, &children, &mut outcome)?;
        } else if let Some(label) = row.aggregate_name.as_deref() {
            Self::upsert_child(book, bill_id, row, supplier, expense_kind, label, &mut outcome)?;
        } else {
            Self::upsert_plain(book, bill_id, row, supplier, expense_kind, &mut outcome)?;
        }
        Ok(outcome)
    }

    /// Find-or-create for a bill: the canonical name the interactive path
    /// would derive, looked up by (name_code, year) among non-deleted rows.
    fn upsert_bill(
        book: &mut BillBook,
        year: i32,
        kind: BillKind,
        bank: &str,
        group: &str,
    ) -> Result<(Uuid, bool)> {
        let code = name_code(&Bill::derive_name(group, kind, bank));
        if let Some(existing) = book.bill_by_name(&code, year) {
            return Ok((existing.id, false));
        }
        let req = BillRequest {
            bank_name: Some(bank.to_string()),
            group_name: Some(group.to_string()),
            return_existing: true,
            ..BillRequest::new(year, kind)
        };
        Ok((BillService::create(book, &req)?, true))
    }

    /// A standalone charge: reuse the stored row untouched when the derived
    /// name already exists, otherwise create it and record the row's month
    /// values, zeros included.
    fn upsert_plain(
        book: &mut BillBook,
        bill_id: Uuid,
        row: &SheetRow,
        supplier: &str,
        kind: ExpenseKind,
        outcome: &mut RowOutcome,
    ) -> Result<()> {
        let expense_id = match Self::existing_expense(book, bill_id, None, supplier) {
            Some(id) => {
                outcome.expense_touched = true;
                id
            }
            None => {
                let req = ExpenseRequest {
                    supplier_name: Some(supplier.to_string()),
                    kind,
                    instalment_number: 1,
                    ..ExpenseRequest::default()
                };
                let id = ExpenseService::create(book, bill_id, &req)?;
                outcome.expenses_created += 1;
                id
            }
        };
        Self::apply_slots(book, bill_id, expense_id, row)?;
        Ok(())
    }

    /// An aggregate parent and its listed children. Children are resolved
    /// before the parent's ledger is rebuilt from them; their own values
    /// arrive through their individual rows.
    fn upsert_aggregate(
        book: &mut BillBook,
        bill_id: Uuid,
        supplier: &str,
        kind: ExpenseKind,
        label: &str,
        children: &[&str],
        outcome: &mut RowOutcome,
    ) -> Result<()> {
        let parent_id = match Self::existing_expense(book, bill_id, None, supplier) {
            Some(id) => {
                outcome.expense_touched = true;
                id
            }
            None => {
                let req = ExpenseRequest {
                    supplier_name: Some(supplier.to_string()),
                    kind,
                    instalment_number: 1,
                    ..ExpenseRequest::default()
                };
                let id = ExpenseService::create(book, bill_id, &req)?;
                outcome.expenses_created += 1;
                id
            }
        };

        for child in children {
            if Self::existing_expense(book, bill_id, Some(label), child).is_some() {
                continue;
            }
            let req = ExpenseRequest {
                supplier_name: Some(child.to_string()),
                kind,
                instalment_number: 1,
                parent_id: Some(parent_id),
                aggregate_name: Some(label.to_string()),
                ..ExpenseRequest::default()
            };
            let child_id = ExpenseService::create(book, bill_id, &req)?;
            outcome.expenses_created += 1;
            Self::attach_to_parent(book, parent_id, child_id);
        }
        ExpenseService::rebuild_aggregate(book, parent_id)?;
        ExpenseService::refresh_bill_totals(book, bill_id)?;
        Ok(())
    }

    /// An aggregate child on its own row: locate the parent through any
    /// sibling carrying the same aggregate label.
    fn upsert_child(
        book: &mut BillBook,
        bill_id: Uuid,
        row: &SheetRow,
        supplier: &str,
        kind: ExpenseKind,
        label: &str,
        outcome: &mut RowOutcome,
    ) -> Result<()> {
        let parent_id = book
            .expenses_of_bill(bill_id)
            .iter()
            .find(|e| e.aggregate_name.as_deref() == Some(label))
            .and_then(|e| e.parent_id)
            .ok_or_else(|| {
                BillError::Validation(format!("no aggregate `{label}` in the target bill"))
            })?;
        let child_id = match Self::existing_expense(book, bill_id, Some(label), supplier) {
            Some(id) => {
                outcome.expense_touched = true;
                id
            }
            None => {
                let req = ExpenseRequest {
                    supplier_name: Some(supplier.to_string()),
                    kind,
                    instalment_number: 1,
                    parent_id: Some(parent_id),
                    aggregate_name: Some(label.to_string()),
                    ..ExpenseRequest::default()
                };
                let id = ExpenseService::create(book, bill_id, &req)?;
                outcome.expenses_created += 1;
                Self::attach_to_parent(book, parent_id, id);
                id
            }
        };
        Self::apply_slots(book, bill_id, child_id, row)?;
        ExpenseService::rebuild_aggregate(book, parent_id)?;
        ExpenseService::refresh_bill_totals(book, bill_id)?;
        Ok(())
    }

    fn apply_slots(book: &mut BillBook, bill_id: Uuid, expense_id: Uuid, row: &SheetRow) -> Result<()> {
        let slots = row.slots();
        if !slots.is_empty() {
            MonthService::persist_list(book, row.year, &slots, MonthOwner::Expense(expense_id))?;
        }
        ExpenseService::refresh_totals(book, expense_id)?;
        ExpenseService::refresh_bill_totals(book, bill_id)
    }

    fn existing_expense(
        book: &BillBook,
        bill_id: Uuid,
        label: Option<&str>,
        supplier: &str,
    ) -> Option<Uuid> {
        let bill = book.bill(bill_id)?;
        let name = crate::domain::Expense::derive_name(&bill.name, label, supplier);
        book.expense_in_bill(bill_id, &name_code(&name)).map(|e| e.id)
    }

    fn attach_to_parent(book: &mut BillBook, parent_id: Uuid, child_id: Uuid) {
        if let Some(parent) = book.expense_mut(parent_id) {
            if !parent.children.contains(&child_id) {
                parent.children.push(child_id);
            }
        }
    }
}
