//! # ishtirak
//!
//! Billing engine for small electricity-subscription utilities: meter-based
//! consumption invoices priced in USD, in local currency, or in both, with
//! local-currency totals snapped to a configurable rounding unit.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use ishtirak::core::*;
//! use rust_decimal_macros::dec;
//!
//! let settings = Settings::default(); // 90 000 LBP per USD, rounded to 1 000
//! let period: BillingPeriod = "2024-03".parse().unwrap();
//!
//! let invoice = InvoiceBuilder::new(CustomerId::new(), period)
//!     .meter_previous(dec!(1000))
//!     .meter_current(dec!(1250))
//!     .pricing_mode(PricingMode::Usd)
//!     .price_per_kwh_usd(dec!(0.45))
//!     .fixed_fee(dec!(6))
//!     .build("INV-2024-03-001", &settings)
//!     .unwrap();
//!
//! assert_eq!(invoice.consumption_kwh(), dec!(250));
//! assert_eq!(invoice.total_usd(), dec!(118.5));
//! assert_eq!(invoice.total_local(), dec!(10665000));
//! assert!(validate_invoice(&invoice).is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Data model, invoice calculator, validation, periods, numbering |
//! | `ledger` | In-memory ledger and `BillingService` (customers, invoices, expenses) |
//! | `reports` | Monthly income/expense report |
//! | `json` | JSON settings and ledger snapshots |
//! | `all` | Everything |
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (calculation results at `debug`, ledger
//! mutations at `info`, rejections at `warn`) and never installs a subscriber.

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "ledger")]
pub mod ledger;

#[cfg(feature = "reports")]
pub mod reports;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
