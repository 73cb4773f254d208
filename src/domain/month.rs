//! Monthly ledger entries and month-name resolution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BillError, Result};

/// Display labels indexed by `code - 1`.
pub const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

static MONTHS_BY_NAME: Lazy<HashMap<String, u8>> = Lazy::new(|| {
    MONTH_LABELS
        .iter()
        .enumerate()
        .map(|(idx, label)| (label.to_lowercase(), idx as u8 + 1))
        .collect()
});

/// Resolves a month name into its calendar code (1–12).
///
/// Unrecognized tokens fail the whole calling operation; there is no partial
/// distribution.
pub fn month_code(name: &str) -> Result<u8> {
    MONTHS_BY_NAME
        .get(name.trim().to_lowercase().as_str())
        .copied()
        .ok_or_else(|| BillError::Precondition(format!("invalid month: `{name}`")))
}

/// Returns the display label for a month code.
pub fn month_label(code: u8) -> &'static str {
    MONTH_LABELS[(code as usize).saturating_sub(1).min(11)]
}

/// Identifies the single owner of a run of month entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthOwner {
    Expense(Uuid),
    Income(Uuid),
}

impl MonthOwner {
    /// Resolves the owner from the two optional foreign keys a caller may
    /// supply. Supplying both or neither is a precondition violation.
    pub fn resolve(expense_id: Option<Uuid>, income_id: Option<Uuid>) -> Result<Self> {
        match (expense_id, income_id) {
            (Some(id), None) => Ok(MonthOwner::Expense(id)),
            (None, Some(id)) => Ok(MonthOwner::Income(id)),
            (Some(_), Some(_)) => Err(BillError::Precondition(
                "month entries take exactly one owner, got both an expense and an income".into(),
            )),
            (None, None) => Err(BillError::Precondition(
                "month entries take exactly one owner, got neither".into(),
            )),
        }
    }

    pub fn matches(&self, entry: &MonthEntry) -> bool {
        match self {
            MonthOwner::Expense(id) => entry.expense_id == Some(*id),
            MonthOwner::Income(id) => entry.income_id == Some(*id),
        }
    }
}

/// One calendar slot of an expense's (or income's) yearly ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthEntry {
    pub id: Uuid,
    pub year: i32,
    pub code: u8,
    pub label: String,
    pub value: f64,
    pub paid: bool,
    pub received_at: Option<DateTime<Utc>>,
    pub expense_id: Option<Uuid>,
    pub income_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl MonthEntry {
    pub fn new(year: i32, code: u8, value: f64, paid: bool, owner: MonthOwner) -> Self {
        let now = Utc::now();
        let (expense_id, income_id) = match owner {
            MonthOwner::Expense(id) => (Some(id), None),
            MonthOwner::Income(id) => (None, Some(id)),
        };
        Self {
            id: Uuid::new_v4(),
            year,
            code,
            label: month_label(code).to_string(),
            value,
            paid,
            received_at: paid.then_some(now),
            expense_id,
            income_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_code_resolves_names_case_insensitively() {
        assert_eq!(month_code("November").unwrap(), 11);
        assert_eq!(month_code("january").unwrap(), 1);
        assert_eq!(month_code(" December ").unwrap(), 12);
    }

    #[test]
    fn month_code_rejects_unknown_tokens() {
        let err = month_code("Smarch").unwrap_err();
        assert!(matches!(err, BillError::Precondition(ref m) if m.contains("Smarch")));
    }

    #[test]
    fn owner_resolution_requires_exactly_one_side() {
        let id = Uuid::new_v4();
        assert!(MonthOwner::resolve(Some(id), None).is_ok());
        assert!(MonthOwner::resolve(None, Some(id)).is_ok());
        assert!(matches!(
            MonthOwner::resolve(Some(id), Some(id)),
            Err(BillError::Precondition(_))
        ));
        assert!(matches!(
            MonthOwner::resolve(None, None),
            Err(BillError::Precondition(_))
        ));
    }

    #[test]
    fn paid_entries_record_reception_time() {
        let owner = MonthOwner::Expense(Uuid::new_v4());
        let paid = MonthEntry::new(2025, 1, 50.0, true, owner);
        assert!(paid.received_at.is_some());
        let open = MonthEntry::new(2025, 2, 50.0, false, owner);
        assert!(open.received_at.is_none());
    }
}
