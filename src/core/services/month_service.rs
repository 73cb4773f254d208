//! Reconciles month ledger entries against their owner.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{month_label, BillBook, MonthEntry, MonthOwner};
use crate::errors::Result;

use super::distributor::MonthSlot;

/// Persists and removes month-entry lists for one owner at a time.
pub struct MonthService;

impl MonthService {
    /// Merges `slots` into the owner's existing ledger.
    ///
    /// Incoming slots are matched by month code: a match updates the stored
    /// row in place (keeping its id), a miss inserts a new row. Stored
    /// entries with no incoming counterpart are left untouched. Entries are
    /// processed one code at a time so two slots can never claim the same
    /// month.
    pub fn persist_list(
        book: &mut BillBook,
        year: i32,
        slots: &[MonthSlot],
        owner: MonthOwner,
    ) -> Result<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(slots.len());
        for slot in slots {
            let existing = book
                .months
                .iter_mut()
                .find(|m| m.is_active() && owner.matches(m) && m.code == slot.code);
            match existing {
                Some(entry) => {
                    entry.year = year;
                    entry.label = month_label(slot.code).to_string();
                    entry.value = slot.value;
                    if slot.paid && !entry.paid {
                        entry.received_at = Some(Utc::now());
                    } else if !slot.paid {
                        entry.received_at = None;
                    }
                    entry.paid = slot.paid;
                    entry.updated_at = Utc::now();
                    ids.push(entry.id);
                }
                None => {
                    let entry = MonthEntry::new(year, slot.code, slot.value, slot.paid, owner);
                    ids.push(entry.id);
                    book.months.push(entry);
                }
            }
        }
        book.touch();
        tracing::debug!(count = slots.len(), "reconciled month entries");
        Ok(ids)
    }

    /// Soft-deletes every ledger entry of the owner.
    ///
    /// Removal is no-op-safe: an owner without entries yields a "nothing to
    /// remove" message, not an error.
    pub fn remove_list(book: &mut BillBook, owner: MonthOwner) -> String {
        let now = Utc::now();
        let mut removed = 0usize;
        for entry in book
            .months
            .iter_mut()
            .filter(|m| m.is_active() && owner.matches(m))
        {
            entry.deleted_at = Some(now);
            removed += 1;
        }
        if removed == 0 {
            return "no month entries to remove".to_string();
        }
        book.touch();
        format!("removed {removed} month entries")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> MonthOwner {
        MonthOwner::Expense(Uuid::new_v4())
    }

    fn slot(code: u8, value: f64, paid: bool) -> MonthSlot {
        MonthSlot { code, value, paid }
    }

    #[test]
    fn persist_inserts_then_updates_in_place() {
        let mut book = BillBook::new("Home");
        let owner = owner();
        let first =
            MonthService::persist_list(&mut book, 2025, &[slot(3, 100.0, false)], owner).unwrap();
        assert_eq!(book.months_of(owner).len(), 1);

        let second =
            MonthService::persist_list(&mut book, 2025, &[slot(3, 140.0, true)], owner).unwrap();
        // Same month code: the row is updated, its id preserved.
        assert_eq!(first, second);
        let entries = book.months_of(owner);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 140.0);
        assert!(entries[0].paid);
        assert!(entries[0].received_at.is_some());
    }

    #[test]
    fn persist_is_a_merge_not_a_replace() {
        let mut book = BillBook::new("Home");
        let owner = owner();
        MonthService::persist_list(
            &mut book,
            2025,
            &[slot(1, 10.0, false), slot(2, 20.0, false)],
            owner,
        )
        .unwrap();
        MonthService::persist_list(&mut book, 2025, &[slot(2, 25.0, false)], owner).unwrap();

        let entries = book.months_of(owner);
        assert_eq!(entries.len(), 2);
        let january = entries.iter().find(|m| m.code == 1).unwrap();
        assert_eq!(january.value, 10.0);
        let february = entries.iter().find(|m| m.code == 2).unwrap();
        assert_eq!(february.value, 25.0);
    }

    #[test]
    fn unpaying_a_month_clears_reception_time() {
        let mut book = BillBook::new("Home");
        let owner = owner();
        MonthService::persist_list(&mut book, 2025, &[slot(4, 60.0, true)], owner).unwrap();
        MonthService::persist_list(&mut book, 2025, &[slot(4, 60.0, false)], owner).unwrap();
        let entries = book.months_of(owner);
        assert!(!entries[0].paid);
        assert!(entries[0].received_at.is_none());
    }

    #[test]
    fn remove_list_reports_counts_and_tolerates_empty_owners() {
        let mut book = BillBook::new("Home");
        let owner = owner();
        assert_eq!(
            MonthService::remove_list(&mut book, owner),
            "no month entries to remove"
        );

        MonthService::persist_list(
            &mut book,
            2025,
            &[slot(1, 10.0, false), slot(2, 20.0, false)],
            owner,
        )
        .unwrap();
        assert_eq!(
            MonthService::remove_list(&mut book, owner),
            "removed 2 month entries"
        );
        assert!(book.months_of(owner).is_empty());
    }

    #[test]
    fn incomes_reconcile_through_the_same_routines() {
        let mut book = BillBook::new("Home");
        let income = crate::domain::Income::new("Salary", 2025);
        let income_id = book.add_income(income);
        let owner = MonthOwner::Income(income_id);

        MonthService::persist_list(
            &mut book,
            2025,
            &[slot(1, 5000.0, true), slot(2, 5000.0, false)],
            owner,
        )
        .unwrap();
        assert_eq!(book.months_of(owner).len(), 2);
        assert!(book.income(income_id).is_some());
        assert_eq!(
            MonthService::remove_list(&mut book, owner),
            "removed 2 month entries"
        );
    }

    #[test]
    fn owners_do_not_see_each_other_entries() {
        let mut book = BillBook::new("Home");
        let expense_owner = MonthOwner::Expense(Uuid::new_v4());
        let income_owner = MonthOwner::Income(Uuid::new_v4());
        MonthService::persist_list(&mut book, 2025, &[slot(1, 10.0, false)], expense_owner)
            .unwrap();
        MonthService::persist_list(&mut book, 2025, &[slot(1, 99.0, true)], income_owner).unwrap();

        assert_eq!(book.months_of(expense_owner)[0].value, 10.0);
        assert_eq!(book.months_of(income_owner)[0].value, 99.0);
    }
}
