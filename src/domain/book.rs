//! The persistent arena document every operation mutates.
//!
//! A `BillBook` holds every entity as a flat, soft-deleting vector and
//! resolves all relations through ids. One public operation mutates one book
//! in memory; the caller persists the whole document afterwards, which makes
//! the book the unit of work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    bill::Bill,
    common::name_code,
    expense::Expense,
    income::Income,
    month::{MonthEntry, MonthOwner},
    refs::{Bank, Group, Supplier, SupplierType},
};

const CURRENT_SCHEMA_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillBook {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub bills: Vec<Bill>,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub months: Vec<MonthEntry>,
    #[serde(default)]
    pub incomes: Vec<Income>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub banks: Vec<Bank>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub supplier_types: Vec<SupplierType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "BillBook::schema_version_default")]
    pub schema_version: u8,
}

impl BillBook {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bills: Vec::new(),
            expenses: Vec::new(),
            months: Vec::new(),
            incomes: Vec::new(),
            suppliers: Vec::new(),
            banks: Vec::new(),
            groups: Vec::new(),
            supplier_types: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    // ----- bills -----

    pub fn add_bill(&mut self, bill: Bill) -> Uuid {
        let id = bill.id;
        self.bills.push(bill);
        self.touch();
        id
    }

    pub fn bill(&self, id: Uuid) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id == id && b.is_active())
    }

    pub fn bill_mut(&mut self, id: Uuid) -> Option<&mut Bill> {
        self.bills.iter_mut().find(|b| b.id == id && b.is_active())
    }

    /// Natural-key lookup among non-deleted bills.
    pub fn bill_by_name(&self, code: &str, year: i32) -> Option<&Bill> {
        self.bills
            .iter()
            .find(|b| b.is_active() && b.year == year && b.name_code == code)
    }

    pub fn bills_of_group(&self, group_id: Uuid, year: i32) -> Vec<&Bill> {
        self.bills
            .iter()
            .filter(|b| b.is_active() && b.group_id == group_id && b.year == year)
            .collect()
    }

    pub fn soft_remove_bill(&mut self, id: Uuid) {
        if let Some(bill) = self.bill_mut(id) {
            bill.deleted_at = Some(Utc::now());
            self.touch();
        }
    }

    // ----- expenses -----

    pub fn add_expense(&mut self, expense: Expense) -> Uuid {
        let id = expense.id;
        self.expenses.push(expense);
        self.touch();
        id
    }

    pub fn expense(&self, id: Uuid) -> Option<&Expense> {
        self.expenses.iter().find(|e| e.id == id && e.is_active())
    }

    pub fn expense_mut(&mut self, id: Uuid) -> Option<&mut Expense> {
        self.expenses
            .iter_mut()
            .find(|e| e.id == id && e.is_active())
    }

    /// Natural-key lookup among the non-deleted expenses of one bill.
    pub fn expense_in_bill(&self, bill_id: Uuid, code: &str) -> Option<&Expense> {
        self.expenses
            .iter()
            .find(|e| e.is_active() && e.bill_id == bill_id && e.name_code == code)
    }

    pub fn expenses_of_bill(&self, bill_id: Uuid) -> Vec<&Expense> {
        self.expenses
            .iter()
            .filter(|e| e.is_active() && e.bill_id == bill_id)
            .collect()
    }

    pub fn soft_remove_expense(&mut self, id: Uuid) {
        if let Some(expense) = self.expense_mut(id) {
            expense.deleted_at = Some(Utc::now());
            self.touch();
        }
    }

    // ----- month ledger -----

    pub fn months_of(&self, owner: MonthOwner) -> Vec<&MonthEntry> {
        self.months
            .iter()
            .filter(|m| m.is_active() && owner.matches(m))
            .collect()
    }

    // ----- incomes -----

    pub fn add_income(&mut self, income: Income) -> Uuid {
        let id = income.id;
        self.incomes.push(income);
        self.touch();
        id
    }

    pub fn income(&self, id: Uuid) -> Option<&Income> {
        self.incomes.iter().find(|i| i.id == id && i.is_active())
    }

    // ----- reference entities -----

    pub fn bank(&self, id: Uuid) -> Option<&Bank> {
        self.banks.iter().find(|b| b.id == id && b.is_active())
    }

    pub fn group(&self, id: Uuid) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id && g.is_active())
    }

    pub fn supplier(&self, id: Uuid) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| s.id == id && s.is_active())
    }

    pub fn supplier_mut(&mut self, id: Uuid) -> Option<&mut Supplier> {
        self.suppliers
            .iter_mut()
            .find(|s| s.id == id && s.is_active())
    }

    pub fn supplier_type(&self, id: Uuid) -> Option<&SupplierType> {
        self.supplier_types
            .iter()
            .find(|s| s.id == id && s.is_active())
    }

    /// Finds or creates a bank by name. The lookup runs against the
    /// normalized natural key first, so a second caller with the same name
    /// reads back the existing row.
    pub fn find_or_create_bank(&mut self, name: &str) -> Uuid {
        let code = name_code(name);
        if let Some(bank) = self
            .banks
            .iter()
            .find(|b| b.is_active() && b.name_code == code)
        {
            return bank.id;
        }
        let bank = Bank::new(name);
        let id = bank.id;
        self.banks.push(bank);
        self.touch();
        id
    }

    pub fn find_or_create_group(&mut self, name: &str) -> Uuid {
        let code = name_code(name);
        if let Some(group) = self
            .groups
            .iter()
            .find(|g| g.is_active() && g.name_code == code)
        {
            return group.id;
        }
        let group = Group::new(name);
        let id = group.id;
        self.groups.push(group);
        self.touch();
        id
    }

    pub fn find_or_create_supplier(&mut self, name: &str) -> Uuid {
        let code = name_code(name);
        if let Some(supplier) = self
            .suppliers
            .iter()
            .find(|s| s.is_active() && s.name_code == code)
        {
            return supplier.id;
        }
        let supplier = Supplier::new(name);
        let id = supplier.id;
        self.suppliers.push(supplier);
        self.touch();
        id
    }

    pub fn find_or_create_supplier_type(&mut self, name: &str) -> Uuid {
        let code = name_code(name);
        if let Some(kind) = self
            .supplier_types
            .iter()
            .find(|s| s.is_active() && s.name_code == code)
        {
            return kind.id;
        }
        let kind = SupplierType::new(name);
        let id = kind.id;
        self.supplier_types.push(kind);
        self.touch();
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_create_is_idempotent_per_natural_key() {
        let mut book = BillBook::new("Home");
        let first = book.find_or_create_bank("Nubank");
        // A losing concurrent writer would land here: same key, winner's row.
        let second = book.find_or_create_bank("NUBANK");
        assert_eq!(first, second);
        assert_eq!(book.banks.len(), 1);

        let other = book.find_or_create_bank("Itaú");
        assert_ne!(first, other);
        assert_eq!(book.banks.len(), 2);
    }

    #[test]
    fn natural_key_lookups_skip_soft_deleted_rows() {
        let mut book = BillBook::new("Home");
        let bank = book.find_or_create_bank("Nubank");
        let group = book.find_or_create_group("Personal");
        let bill = Bill::new("Personal Pix Nubank", 2025, crate::domain::BillKind::Pix, bank, group);
        let bill_id = book.add_bill(bill);

        assert!(book.bill_by_name("personal pix nubank", 2025).is_some());
        book.soft_remove_bill(bill_id);
        assert!(book.bill_by_name("personal pix nubank", 2025).is_none());
        assert!(book.bill(bill_id).is_none());
    }
}
