#![doc(test(attr(deny(warnings))))]

//! Billbook Core tracks a household's recurring charges as yearly bills of
//! expenses, each carrying a month-by-month ledger, and reconciles the same
//! entity graph whether it is built interactively or imported from a
//! spreadsheet.

pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Billbook Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
