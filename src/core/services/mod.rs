//! Lifecycle services over the [`crate::domain::BillBook`] document.

pub mod bill_service;
pub mod distributor;
pub mod expense_service;
pub mod month_service;
pub mod sheet_service;

pub use bill_service::{
    AddExpenseOutcome, AddExpenseRequest, BillReport, BillRequest, BillService, ExpenseReport,
    MonthCell,
};
pub use distributor::{distribute, Distribution, MonthSlot};
pub use expense_service::{ExpenseRequest, ExpenseService, ExpenseUpdate};
pub use month_service::MonthService;
pub use sheet_service::{ImportSummary, RowRejection, SheetRow, SheetService};
