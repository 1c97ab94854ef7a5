//! Record keeping for customers, invoices and expenses.
//!
//! [`LedgerStore`] is the persistence boundary; [`MemoryLedger`] keeps
//! everything in memory and can be snapshotted to JSON with the `json`
//! feature. [`BillingService`] sequences the billing operations on top of a
//! store: validate, calculate, then commit the invoice together with the
//! customer's new meter reading.

mod error;
mod service;
mod store;

pub use error::*;
pub use service::*;
pub use store::*;
