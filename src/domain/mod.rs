//! Domain entities for the recurring-charge engine.

pub mod bill;
pub mod book;
pub mod common;
pub mod expense;
pub mod income;
pub mod month;
pub mod refs;

pub use bill::{Bill, BillKind};
pub use book::BillBook;
pub use common::{name_code, round2};
pub use expense::{Expense, ExpenseKind};
pub use income::Income;
pub use month::{month_code, month_label, MonthEntry, MonthOwner, MONTH_LABELS};
pub use refs::{Bank, Group, Supplier, SupplierType};
