//! Pure instalment distribution over a 12-slot calendar year.

use crate::errors::{BillError, Result};

/// One month's share of a distribution, not yet persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthSlot {
    pub code: u8,
    pub value: f64,
    pub paid: bool,
}

/// Result of distributing instalments starting part-way through a year.
#[derive(Debug, Clone)]
pub struct Distribution {
    /// All 12 slots of the starting year; unassigned months are zero-valued
    /// and paid (nothing owed on them).
    pub current_year: Vec<MonthSlot>,
    /// Only the assigned overflow slots; padding to 12 happens when the
    /// rolled expense seeds its own ledger.
    pub next_year: Vec<MonthSlot>,
    pub year: i32,
    pub next_year_number: i32,
    pub requires_new_bill: bool,
}

/// Assigns one instalment per calendar month starting at `start_month`.
///
/// Instalments past December roll into `year + 1` and flag the caller to
/// create (or reuse) the following year's bill. A single instalment never
/// overflows.
pub fn distribute(
    start_month: u8,
    instalment_count: u32,
    value: f64,
    year: i32,
    paid: bool,
) -> Result<Distribution> {
    if !(1..=12).contains(&start_month) {
        return Err(BillError::Precondition(format!(
            "start month must be 1-12, got {start_month}"
        )));
    }
    if instalment_count == 0 {
        return Err(BillError::Precondition(
            "instalment count must be at least 1".into(),
        ));
    }
    let last = start_month as u32 + instalment_count - 1;
    if last > 24 {
        return Err(BillError::Precondition(format!(
            "{instalment_count} instalments starting in month {start_month} span more than two years"
        )));
    }

    let current_year = (1u8..=12)
        .map(|code| {
            if code >= start_month && (code as u32) <= last {
                MonthSlot { code, value, paid }
            } else {
                MonthSlot {
                    code,
                    value: 0.0,
                    paid: true,
                }
            }
        })
        .collect();

    let requires_new_bill = last > 12;
    let next_year = if requires_new_bill {
        (1u8..=(last - 12) as u8)
            .map(|code| MonthSlot { code, value, paid })
            .collect()
    } else {
        Vec::new()
    };

    Ok(Distribution {
        current_year,
        next_year,
        year,
        next_year_number: year + 1,
        requires_new_bill,
    })
}
