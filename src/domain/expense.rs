//! Recurring charges and the aggregate parent/child relation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BillError, Result};

use super::common::name_code;

/// Whether a charge repeats with a fixed or variable amount.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExpenseKind {
    Fixed,
    #[default]
    Variable,
}

impl ExpenseKind {
    /// Parses the tokens the spreadsheet source uses; absence defaults to
    /// [`ExpenseKind::Variable`] at the call site.
    pub fn parse(token: &str) -> Result<Self> {
        match name_code(token).as_str() {
            "fixed" => Ok(ExpenseKind::Fixed),
            "variable" => Ok(ExpenseKind::Variable),
            _ => Err(BillError::Validation(format!(
                "unknown expense kind: `{token}`"
            ))),
        }
    }
}

/// One recurring charge inside exactly one bill, owning a 12-slot ledger.
///
/// Parent/child aggregation is expressed through id references: a child
/// carries `parent_id` (with `is_aggregate` and `aggregate_name` coupled to
/// it), a parent carries the `children` id list. Nothing is embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub name: String,
    pub name_code: String,
    pub kind: ExpenseKind,
    pub paid: bool,
    pub supplier_id: Uuid,
    pub instalment_number: u32,
    pub description: Option<String>,
    pub total: f64,
    pub total_paid: f64,
    pub is_aggregate: bool,
    pub aggregate_name: Option<String>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub children: Vec<Uuid>,
    pub bill_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    /// Derives the expense name from its bill, optional aggregate label and
    /// supplier.
    pub fn derive_name(bill_name: &str, aggregate_name: Option<&str>, supplier_name: &str) -> String {
        match aggregate_name {
            Some(label) => format!("{bill_name} {label} {supplier_name}"),
            None => format!("{bill_name} {supplier_name}"),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        kind: ExpenseKind,
        supplier_id: Uuid,
        instalment_number: u32,
        description: Option<String>,
        aggregate_name: Option<String>,
        parent_id: Option<Uuid>,
        bill_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            name_code: name_code(&name),
            name,
            kind,
            paid: false,
            supplier_id,
            instalment_number,
            description,
            total: 0.0,
            total_paid: 0.0,
            is_aggregate: parent_id.is_some(),
            aggregate_name,
            parent_id,
            children: Vec::new(),
            bill_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Checks the aggregate coupling invariant: a parent reference, the
    /// aggregate flag and the aggregate label are present together or not at
    /// all.
    pub fn check_aggregate_coupling(&self) -> Result<()> {
        let coupled = self.parent_id.is_some();
        if self.is_aggregate != coupled || self.aggregate_name.is_some() != coupled {
            return Err(BillError::Validation(format!(
                "expense `{}` mixes parent, aggregate flag and aggregate name inconsistently",
                self.name
            )));
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
