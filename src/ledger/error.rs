use thiserror::Error;

use crate::core::{BillingError, BillingPeriod, CalculationError, CustomerId, ExpenseId};

/// Errors raised by the ledger store and the billing service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LedgerError {
    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("invoice {0} not found")]
    InvoiceNotFound(String),

    #[error("expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    #[error("customer {0} already exists")]
    DuplicateCustomer(CustomerId),

    #[error("invoice number {0} already exists")]
    DuplicateInvoiceNumber(String),

    /// A second invoice for the same customer and period.
    #[error("customer {customer} already has an invoice for {period}")]
    DuplicateInvoice {
        customer: CustomerId,
        period: BillingPeriod,
    },

    #[error("customer {0} is inactive")]
    InactiveCustomer(CustomerId),

    /// An edit tried to change the invoice number or the billed customer.
    #[error("an invoice edit cannot change `{0}`")]
    ImmutableField(&'static str),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[cfg(feature = "json")]
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl From<CalculationError> for LedgerError {
    fn from(err: CalculationError) -> Self {
        Self::Billing(err.into())
    }
}
