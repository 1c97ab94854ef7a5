use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{Currency, PricingMode};

/// Errors that can occur while building, numbering or validating billing records.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BillingError {
    /// The invoice calculator rejected its inputs.
    #[error(transparent)]
    Calculation(#[from] CalculationError),

    /// One or more validation rules failed.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Invoice number sequencing error.
    #[error("numbering error: {0}")]
    Numbering(String),

    /// Billing period could not be parsed or is out of range.
    #[error("period error: {0}")]
    Period(String),

    /// JSON (de)serialisation of settings failed.
    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BillingError {
    /// Collapse a list of validation errors into a single `Validation` error.
    pub fn from_validation(errors: &[ValidationError]) -> Self {
        let msg = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self::Validation(msg)
    }
}

/// Rejections produced by [`calculate`](super::calculate).
///
/// Every variant is recoverable: the caller corrects the input and retries.
/// Nothing is persisted when a calculation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CalculationError {
    /// The current meter reading is lower than the previous one.
    #[error("current reading {current} precedes previous reading {previous}")]
    NegativeConsumption { previous: Decimal, current: Decimal },

    /// A meter reading below zero.
    #[error("meter reading `{field}` must not be negative (got {value})")]
    NegativeReading { field: &'static str, value: Decimal },

    /// The pricing mode needs a per-kWh price that was not supplied.
    #[error("pricing mode {mode} requires a per-kWh price in {currency}")]
    MissingPrice {
        mode: PricingMode,
        currency: Currency,
    },

    /// A monetary input that must be zero or positive was negative.
    #[error("`{field}` must not be negative (got {value})")]
    NegativeAmount { field: &'static str, value: Decimal },

    /// Exchange rate of zero or below.
    #[error("exchange rate must be positive (got {0})")]
    NonPositiveExchangeRate(Decimal),

    /// Rounding unit of zero.
    #[error("rounding unit must be a positive integer")]
    NonPositiveRoundingUnit,

    /// A discount was supplied in a mode that has no discount field.
    #[error("pricing mode {0} does not support a discount")]
    DiscountNotSupported(PricingMode),

    /// Decimal overflow or division by zero.
    #[error("arithmetic error: {0}")]
    Arithmetic(&'static str),
}

/// A single validation error with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "totals.total_local").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<CalculationError> for ValidationError {
    fn from(err: CalculationError) -> Self {
        let field = match &err {
            CalculationError::NegativeConsumption { .. } => "meter_current",
            CalculationError::NegativeReading { field, .. }
            | CalculationError::NegativeAmount { field, .. } => field,
            CalculationError::MissingPrice { currency, .. } => match currency {
                Currency::Usd => "price_per_kwh_usd",
                Currency::Local => "price_per_kwh_local",
            },
            CalculationError::NonPositiveExchangeRate(_) => "exchange_rate",
            CalculationError::NonPositiveRoundingUnit => "rounding_unit",
            CalculationError::DiscountNotSupported(_) => "discount",
            CalculationError::Arithmetic(_) => "totals",
        };
        Self::new(field, err.to_string())
    }
}
