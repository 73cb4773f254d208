//! Yearly bill containers and their canonical naming.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{BillError, Result};

use super::common::name_code;

/// How a bill is charged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillKind {
    BankSlip,
    CreditCard,
    Pix,
}

impl BillKind {
    /// Human form used inside derived bill names.
    pub fn humanized(&self) -> &'static str {
        match self {
            BillKind::BankSlip => "Bank Slip",
            BillKind::CreditCard => "Credit Card",
            BillKind::Pix => "Pix",
        }
    }

    /// Parses the tokens the spreadsheet source uses.
    pub fn parse(token: &str) -> Result<Self> {
        match name_code(token).as_str() {
            "bank slip" => Ok(BillKind::BankSlip),
            "credit card" => Ok(BillKind::CreditCard),
            "pix" => Ok(BillKind::Pix),
            _ => Err(BillError::Validation(format!("unknown bill kind: `{token}`"))),
        }
    }
}

/// Yearly container for the recurring charges of one (bank, group, kind).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub name: String,
    pub name_code: String,
    pub year: i32,
    pub kind: BillKind,
    pub bank_id: Uuid,
    pub group_id: Uuid,
    pub total: f64,
    pub total_paid: f64,
    pub all_paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Bill {
    /// Derives the canonical bill name.
    ///
    /// Credit-card bills append the bank name twice, mirroring the statement
    /// naming convention this engine inherited. Preserved as-is.
    pub fn derive_name(group_name: &str, kind: BillKind, bank_name: &str) -> String {
        match kind {
            BillKind::CreditCard => {
                format!("{} {} {} {}", group_name, kind.humanized(), bank_name, bank_name)
            }
            _ => format!("{} {} {}", group_name, kind.humanized(), bank_name),
        }
    }

    pub fn new(name: impl Into<String>, year: i32, kind: BillKind, bank_id: Uuid, group_id: Uuid) -> Self {
        let now = Utc::now();
        let name = name.into();
        Self {
            id: Uuid::new_v4(),
            name_code: name_code(&name),
            name,
            year,
            kind,
            bank_id,
            group_id,
            total: 0.0,
            total_paid: 0.0,
            all_paid: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}
