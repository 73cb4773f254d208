//! Incomes: the alternate owner of monthly ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::name_code;

/// A yearly income stream. Incomes share the month ledger and its
/// reconciliation routines with expenses but have no lifecycle manager of
/// their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub name: String,
    pub name_code: String,
    pub year: i32,
    pub total: f64,
    pub total_paid: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Income {
    pub fn new(name: impl Into<String>, year: i32) -> Self {
        let now = Utc::now();
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            name_code: name_code(&name),
            name,
            year,
            total: 0.0,
            total_paid: 0.0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
