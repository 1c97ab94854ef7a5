use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use crate::core::*;

/// Persistence boundary for customers, invoices and expenses.
///
/// Implementations must make [`commit_invoice`](LedgerStore::commit_invoice)
/// all-or-nothing: either the invoice is stored and the customer's last
/// meter reading advanced, or neither happens.
pub trait LedgerStore {
    fn customer(&self, id: &CustomerId) -> Option<Customer>;
    fn customers(&self) -> Vec<Customer>;
    fn insert_customer(&mut self, customer: Customer) -> Result<(), LedgerError>;
    fn update_customer(&mut self, customer: Customer) -> Result<(), LedgerError>;
    fn remove_customer(&mut self, id: &CustomerId) -> Result<Customer, LedgerError>;

    fn invoice(&self, number: &str) -> Option<Invoice>;
    fn invoices(&self) -> Vec<Invoice>;
    /// Store a new invoice and set the customer's last reading to its current reading.
    fn commit_invoice(&mut self, invoice: Invoice) -> Result<(), LedgerError>;
    /// Overwrite an existing invoice with the same number.
    fn replace_invoice(&mut self, invoice: Invoice) -> Result<(), LedgerError>;
    fn remove_invoice(&mut self, number: &str) -> Result<Invoice, LedgerError>;

    fn expense(&self, id: &ExpenseId) -> Option<Expense>;
    fn expenses(&self) -> Vec<Expense>;
    fn insert_expense(&mut self, expense: Expense) -> Result<(), LedgerError>;
    fn update_expense(&mut self, expense: Expense) -> Result<(), LedgerError>;
    fn remove_expense(&mut self, id: &ExpenseId) -> Result<Expense, LedgerError>;
}

/// In-memory ledger keeping records in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryLedger {
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    expenses: Vec<Expense>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn customer_index(&self, id: &CustomerId) -> Result<usize, LedgerError> {
        self.customers
            .iter()
            .position(|c| c.id == *id)
            .ok_or(LedgerError::CustomerNotFound(*id))
    }

    fn invoice_index(&self, number: &str) -> Result<usize, LedgerError> {
        self.invoices
            .iter()
            .position(|i| i.number == number)
            .ok_or_else(|| LedgerError::InvoiceNotFound(number.to_string()))
    }

    fn expense_index(&self, id: &ExpenseId) -> Result<usize, LedgerError> {
        self.expenses
            .iter()
            .position(|e| e.id == *id)
            .ok_or(LedgerError::ExpenseNotFound(*id))
    }

    /// Load a ledger previously written by [`to_json_string`](Self::to_json_string).
    #[cfg(feature = "json")]
    pub fn from_json_str(json: &str) -> Result<Self, LedgerError> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "json")]
    pub fn to_json_string(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl LedgerStore for MemoryLedger {
    fn customer(&self, id: &CustomerId) -> Option<Customer> {
        self.customers.iter().find(|c| c.id == *id).cloned()
    }

    fn customers(&self) -> Vec<Customer> {
        self.customers.clone()
    }

    fn insert_customer(&mut self, customer: Customer) -> Result<(), LedgerError> {
        if self.customers.iter().any(|c| c.id == customer.id) {
            return Err(LedgerError::DuplicateCustomer(customer.id));
        }
        self.customers.push(customer);
        Ok(())
    }

    fn update_customer(&mut self, customer: Customer) -> Result<(), LedgerError> {
        let idx = self.customer_index(&customer.id)?;
        self.customers[idx] = customer;
        Ok(())
    }

    fn remove_customer(&mut self, id: &CustomerId) -> Result<Customer, LedgerError> {
        let idx = self.customer_index(id)?;
        Ok(self.customers.remove(idx))
    }

    fn invoice(&self, number: &str) -> Option<Invoice> {
        self.invoices.iter().find(|i| i.number == number).cloned()
    }

    fn invoices(&self) -> Vec<Invoice> {
        self.invoices.clone()
    }

    fn commit_invoice(&mut self, invoice: Invoice) -> Result<(), LedgerError> {
        // All checks run before anything is mutated.
        let idx = self.customer_index(&invoice.customer_id)?;
        if self.invoices.iter().any(|i| i.number == invoice.number) {
            return Err(LedgerError::DuplicateInvoiceNumber(invoice.number));
        }
        if self
            .invoices
            .iter()
            .any(|i| i.customer_id == invoice.customer_id && i.period == invoice.period)
        {
            return Err(LedgerError::DuplicateInvoice {
                customer: invoice.customer_id,
                period: invoice.period,
            });
        }

        let customer = &mut self.customers[idx];
        customer.last_meter_reading = invoice.meter_current;
        customer.updated_at = Some(Utc::now());
        self.invoices.push(invoice);
        Ok(())
    }

    fn replace_invoice(&mut self, invoice: Invoice) -> Result<(), LedgerError> {
        let idx = self.invoice_index(&invoice.number)?;
        self.invoices[idx] = invoice;
        Ok(())
    }

    fn remove_invoice(&mut self, number: &str) -> Result<Invoice, LedgerError> {
        let idx = self.invoice_index(number)?;
        Ok(self.invoices.remove(idx))
    }

    fn expense(&self, id: &ExpenseId) -> Option<Expense> {
        self.expenses.iter().find(|e| e.id == *id).cloned()
    }

    fn expenses(&self) -> Vec<Expense> {
        self.expenses.clone()
    }

    fn insert_expense(&mut self, expense: Expense) -> Result<(), LedgerError> {
        self.expenses.push(expense);
        Ok(())
    }

    fn update_expense(&mut self, expense: Expense) -> Result<(), LedgerError> {
        let idx = self.expense_index(&expense.id)?;
        self.expenses[idx] = expense;
        Ok(())
    }

    fn remove_expense(&mut self, id: &ExpenseId) -> Result<Expense, LedgerError> {
        let idx = self.expense_index(id)?;
        Ok(self.expenses.remove(idx))
    }
}

impl CustomerProvider for MemoryLedger {
    fn customer_tariff(&self, id: &CustomerId) -> Option<Tariff> {
        self.customers.iter().find(|c| c.id == *id).map(Customer::tariff)
    }
}
