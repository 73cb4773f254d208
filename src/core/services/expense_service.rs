//! Expense lifecycle: creation, instalment initialization, year rollover,
//! updates and totals upkeep.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{round2, BillBook, Expense, ExpenseKind, MonthOwner};
use crate::errors::{BillError, Result};

use super::distributor::{self, Distribution, MonthSlot};
use super::month_service::MonthService;

/// Creation payload for one recurring charge.
#[derive(Debug, Clone, Default)]
pub struct ExpenseRequest {
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    /// Classifies the supplier when it is created along the way.
    pub supplier_type_name: Option<String>,
    pub kind: ExpenseKind,
    pub instalment_number: u32,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub aggregate_name: Option<String>,
}

/// Partial update payload; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ExpenseUpdate {
    pub supplier_name: Option<String>,
    pub kind: Option<ExpenseKind>,
    pub instalment_number: Option<u32>,
    pub description: Option<String>,
}

pub struct ExpenseService;

impl ExpenseService {
    /// Builds an expense for creation without writing it to the book.
    ///
    /// The supplier is resolved by id when given, otherwise found-or-created
    /// from the supplied name. The 12-slot ledger is seeded when the expense
    /// is actually created.
    pub fn build_for_creation(
        book: &mut BillBook,
        bill_id: Uuid,
        req: &ExpenseRequest,
    ) -> Result<Expense> {
        let bill = book
            .bill(bill_id)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        let bill_name = bill.name.clone();

        if req.parent_id.is_some() != req.aggregate_name.is_some() {
            return Err(BillError::Validation(
                "aggregate name and parent reference must be supplied together".into(),
            ));
        }
        if let Some(parent_id) = req.parent_id {
            book.expense(parent_id)
                .ok_or_else(|| BillError::NotFound(format!("parent expense {parent_id}")))?;
        }

        let supplier_id = match (req.supplier_id, req.supplier_name.as_deref()) {
            (Some(id), _) => {
                book.supplier(id)
                    .ok_or_else(|| BillError::NotFound(format!("supplier {id}")))?;
                id
            }
            (None, Some(name)) => {
                let id = book.find_or_create_supplier(name);
                if let Some(type_name) = req.supplier_type_name.as_deref() {
                    let type_id = book.find_or_create_supplier_type(type_name);
                    if let Some(supplier) = book.supplier_mut(id) {
                        supplier.supplier_type_id.get_or_insert(type_id);
                    }
                }
                id
            }
            (None, None) => {
                return Err(BillError::Validation(
                    "an expense needs a supplier id or a supplier name".into(),
                ))
            }
        };
        let supplier_name = book
            .supplier(supplier_id)
            .map(|s| s.name.clone())
            .unwrap_or_default();

        let name = Expense::derive_name(&bill_name, req.aggregate_name.as_deref(), &supplier_name);
        let expense = Expense::new(
            name,
            req.kind,
            supplier_id,
            req.instalment_number.max(1),
            req.description.clone(),
            req.aggregate_name.clone(),
            req.parent_id,
            bill_id,
        );
        expense.check_aggregate_coupling()?;
        Ok(expense)
    }

    /// Creates the expense and seeds its default zero-value 12-slot ledger.
    ///
    /// A sibling with the same derived natural key in the same bill is a
    /// conflict and is surfaced untouched.
    pub fn create(book: &mut BillBook, bill_id: Uuid, req: &ExpenseRequest) -> Result<Uuid> {
        let expense = Self::build_for_creation(book, bill_id, req)?;
        if book.expense_in_bill(bill_id, &expense.name_code).is_some() {
            return Err(BillError::Conflict(format!(
                "expense `{}` already exists in bill for that year",
                expense.name
            )));
        }
        let year = book
            .bill(bill_id)
            .map(|b| b.year)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        let name = expense.name.clone();
        let id = book.add_expense(expense);
        MonthService::persist_list(book, year, &default_ledger(), MonthOwner::Expense(id))?;
        Self::refresh_totals(book, id)?;
        tracing::info!(expense = %name, "created expense");
        Ok(id)
    }

    /// Distributes the requested value over the calendar and persists the
    /// current-year portion. Returns the distribution so the bill manager
    /// can drive the rollover when it overflows.
    ///
    /// A child expense is folded into its parent's children on first
    /// initialization and the parent's aggregate ledger is rebuilt.
    pub fn initialize(
        book: &mut BillBook,
        expense_id: Uuid,
        value: f64,
        start_month: u8,
        instalment_count: u32,
        paid: bool,
    ) -> Result<Distribution> {
        let (bill_id, parent_id) = {
            let expense = book
                .expense(expense_id)
                .ok_or_else(|| BillError::NotFound(format!("expense {expense_id}")))?;
            (expense.bill_id, expense.parent_id)
        };
        let year = book
            .bill(bill_id)
            .map(|b| b.year)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;

        let dist = distributor::distribute(start_month, instalment_count, value, year, paid)?;
        MonthService::persist_list(
            book,
            year,
            &dist.current_year,
            MonthOwner::Expense(expense_id),
        )?;
        Self::refresh_totals(book, expense_id)?;

        if let Some(parent_id) = parent_id {
            Self::attach_child(book, parent_id, expense_id)?;
            Self::rebuild_aggregate(book, parent_id)?;
        }
        Self::refresh_bill_totals(book, bill_id)?;
        Ok(dist)
    }

    /// Carries the overflow instalments into the rolled bill.
    ///
    /// Reuses `existing` when the rolled bill already holds the charge;
    /// otherwise creates a fresh standalone expense named after the
    /// template. Either way the overflow slots are merged over the target's
    /// ledger and totals are recomputed.
    pub fn add_expense_for_next_year(
        book: &mut BillBook,
        rolled_bill_id: Uuid,
        slots: &[MonthSlot],
        next_year: i32,
        template_id: Uuid,
        existing: Option<Uuid>,
    ) -> Result<Uuid> {
        let target = match existing {
            Some(id) => id,
            None => {
                let template = book
                    .expense(template_id)
                    .ok_or_else(|| BillError::NotFound(format!("expense {template_id}")))?
                    .clone();
                // The rolled bill shares the template's derived name: years
                // never appear in bill names.
                let expense = Expense::new(
                    template.name.clone(),
                    template.kind,
                    template.supplier_id,
                    template.instalment_number,
                    template.description.clone(),
                    None,
                    None,
                    rolled_bill_id,
                );
                let id = book.add_expense(expense);
                MonthService::persist_list(
                    book,
                    next_year,
                    &default_ledger(),
                    MonthOwner::Expense(id),
                )?;
                id
            }
        };
        MonthService::persist_list(book, next_year, slots, MonthOwner::Expense(target))?;
        Self::refresh_totals(book, target)?;
        Self::refresh_bill_totals(book, rolled_bill_id)?;
        tracing::info!(year = next_year, "rolled instalments into next year's bill");
        Ok(target)
    }

    /// Shallow-merges an update over the stored expense.
    ///
    /// The supplier is re-resolved only when the update names one, which
    /// also re-derives the expense name; everything else is preserved.
    pub fn build_for_update(
        book: &mut BillBook,
        expense_id: Uuid,
        upd: &ExpenseUpdate,
    ) -> Result<Expense> {
        let mut merged = book
            .expense(expense_id)
            .ok_or_else(|| BillError::NotFound(format!("expense {expense_id}")))?
            .clone();
        if let Some(name) = upd.supplier_name.as_deref() {
            let supplier_id = book.find_or_create_supplier(name);
            let supplier_name = book
                .supplier(supplier_id)
                .map(|s| s.name.clone())
                .unwrap_or_default();
            let bill_name = book
                .bill(merged.bill_id)
                .map(|b| b.name.clone())
                .ok_or_else(|| BillError::NotFound(format!("bill {}", merged.bill_id)))?;
            merged.supplier_id = supplier_id;
            merged.name =
                Expense::derive_name(&bill_name, merged.aggregate_name.as_deref(), &supplier_name);
            merged.name_code = crate::domain::name_code(&merged.name);
        }
        if let Some(kind) = upd.kind {
            merged.kind = kind;
        }
        if let Some(count) = upd.instalment_number {
            merged.instalment_number = count;
        }
        if let Some(description) = upd.description.clone() {
            merged.description = Some(description);
        }
        Ok(merged)
    }

    /// Applies [`Self::build_for_update`] to the stored row.
    pub fn update(book: &mut BillBook, expense_id: Uuid, upd: &ExpenseUpdate) -> Result<()> {
        let merged = Self::build_for_update(book, expense_id, upd)?;
        if let Some(other) = book.expense_in_bill(merged.bill_id, &merged.name_code) {
            if other.id != expense_id {
                return Err(BillError::Conflict(format!(
                    "expense `{}` already exists in bill for that year",
                    merged.name
                )));
            }
        }
        let stored = book
            .expense_mut(expense_id)
            .ok_or_else(|| BillError::NotFound(format!("expense {expense_id}")))?;
        *stored = Expense {
            updated_at: Utc::now(),
            ..merged
        };
        book.touch();
        Ok(())
    }

    /// Recomputes `total`, `total_paid` and `paid` from the month ledger.
    pub fn refresh_totals(book: &mut BillBook, expense_id: Uuid) -> Result<()> {
        let owner = MonthOwner::Expense(expense_id);
        let months = book.months_of(owner);
        let total = round2(months.iter().map(|m| m.value).sum());
        let total_paid = round2(months.iter().filter(|m| m.paid).map(|m| m.value).sum());
        let paid = !months.is_empty() && months.iter().all(|m| m.paid);
        let expense = book
            .expense_mut(expense_id)
            .ok_or_else(|| BillError::NotFound(format!("expense {expense_id}")))?;
        expense.total = total;
        expense.total_paid = total_paid;
        expense.paid = paid;
        expense.updated_at = Utc::now();
        Ok(())
    }

    /// Recomputes the owning bill's totals from its expenses.
    ///
    /// Children are accounted through their aggregate parent, so only
    /// top-level expenses feed the sums; `all_paid` covers every expense.
    pub fn refresh_bill_totals(book: &mut BillBook, bill_id: Uuid) -> Result<()> {
        let expenses = book.expenses_of_bill(bill_id);
        let total = round2(
            expenses
                .iter()
                .filter(|e| e.parent_id.is_none())
                .map(|e| e.total)
                .sum(),
        );
        let total_paid = round2(
            expenses
                .iter()
                .filter(|e| e.parent_id.is_none())
                .map(|e| e.total_paid)
                .sum(),
        );
        let all_paid = !expenses.is_empty() && expenses.iter().all(|e| e.paid);
        let bill = book
            .bill_mut(bill_id)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        bill.total = total;
        bill.total_paid = total_paid;
        bill.all_paid = all_paid;
        bill.updated_at = Utc::now();
        book.touch();
        Ok(())
    }

    fn attach_child(book: &mut BillBook, parent_id: Uuid, child_id: Uuid) -> Result<()> {
        let parent = book
            .expense_mut(parent_id)
            .ok_or_else(|| BillError::NotFound(format!("parent expense {parent_id}")))?;
        // Dedup by id: a child seen in a prior set is not appended again.
        if !parent.children.contains(&child_id) {
            parent.children.push(child_id);
            parent.updated_at = Utc::now();
        }
        Ok(())
    }

    /// Rebuilds the parent's ledger as the per-month sum of its children,
    /// and its totals from the children's totals.
    ///
    /// A month slot is only paid when every child paid it, so the parent's
    /// `total_paid` is taken from the children directly: a per-slot flag
    /// cannot represent a partially paid month.
    pub(crate) fn rebuild_aggregate(book: &mut BillBook, parent_id: Uuid) -> Result<()> {
        let (bill_id, children) = {
            let parent = book
                .expense(parent_id)
                .ok_or_else(|| BillError::NotFound(format!("parent expense {parent_id}")))?;
            (parent.bill_id, parent.children.clone())
        };
        let year = book
            .bill(bill_id)
            .map(|b| b.year)
            .ok_or_else(|| BillError::NotFound(format!("bill {bill_id}")))?;
        let children: Vec<Uuid> = children
            .into_iter()
            .filter(|id| book.expense(*id).is_some())
            .collect();

        let mut slots = Vec::with_capacity(12);
        for code in 1u8..=12 {
            let mut value = 0.0;
            let mut paid = true;
            for child_id in &children {
                for entry in book.months_of(MonthOwner::Expense(*child_id)) {
                    if entry.code == code {
                        value += entry.value;
                        paid = paid && entry.paid;
                    }
                }
            }
            slots.push(MonthSlot {
                code,
                value: round2(value),
                paid,
            });
        }
        MonthService::persist_list(book, year, &slots, MonthOwner::Expense(parent_id))?;

        let mut total = 0.0;
        let mut total_paid = 0.0;
        let mut all_paid = !children.is_empty();
        for child_id in &children {
            if let Some(child) = book.expense(*child_id) {
                total += child.total;
                total_paid += child.total_paid;
                all_paid = all_paid && child.paid;
            }
        }
        let parent = book
            .expense_mut(parent_id)
            .ok_or_else(|| BillError::NotFound(format!("parent expense {parent_id}")))?;
        parent.total = round2(total);
        parent.total_paid = round2(total_paid);
        parent.paid = all_paid;
        parent.updated_at = Utc::now();
        Ok(())
    }
}

/// The default ledger every fresh expense starts from: twelve zero-value
/// slots with nothing outstanding.
fn default_ledger() -> Vec<MonthSlot> {
    (1u8..=12)
        .map(|code| MonthSlot {
            code,
            value: 0.0,
            paid: true,
        })
        .collect()
}
