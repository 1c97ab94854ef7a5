//! Core billing types, the invoice calculator, validation and numbering.
//!
//! This module turns meter readings, a customer's tariff and the utility's
//! dual-currency settings into invoice totals, snapping local-currency
//! amounts to the configured rounding unit.

mod builder;
mod calculator;
mod currencies;
mod error;
mod numbering;
mod period;
mod provider;
mod types;
mod validation;

pub use builder::*;
pub use calculator::*;
pub use currencies::is_known_currency_code;
pub use error::*;
pub use numbering::*;
pub use period::*;
pub use provider::*;
pub use types::*;
pub use validation::*;
