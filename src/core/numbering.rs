use super::error::BillingError;
use super::period::BillingPeriod;

/// Sequential invoice numbers within a billing period.
///
/// Numbers look like `{prefix}{YYYY-MM}-{sequential}`, e.g. "INV-2024-03-001".
/// The counter restarts at 1 whenever the sequence moves to a later period.
#[derive(Debug, Clone)]
pub struct InvoiceNumberSequence {
    prefix: String,
    period: BillingPeriod,
    next_number: u64,
    zero_pad: usize,
}

impl InvoiceNumberSequence {
    /// Create a new sequence starting at 1.
    pub fn new(prefix: impl Into<String>, period: BillingPeriod) -> Self {
        Self::starting_at(prefix, period, 1)
    }

    /// Create a sequence continuing from a given number.
    pub fn starting_at(prefix: impl Into<String>, period: BillingPeriod, next_number: u64) -> Self {
        Self {
            prefix: prefix.into(),
            period,
            next_number,
            zero_pad: 3,
        }
    }

    /// Set zero-padding width (default: 3, so "001").
    pub fn with_padding(mut self, width: usize) -> Self {
        self.zero_pad = width;
        self
    }

    /// Generate the next invoice number.
    pub fn next_number(&mut self) -> String {
        let number = self.peek();
        self.next_number += 1;
        number
    }

    /// Preview the next number without consuming it.
    pub fn peek(&self) -> String {
        format!(
            "{}{}-{:0>width$}",
            self.prefix,
            self.period,
            self.next_number,
            width = self.zero_pad
        )
    }

    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the next number that will be issued (without prefix/formatting).
    pub fn next_raw(&self) -> u64 {
        self.next_number
    }

    /// Move to a later period, resetting the counter to 1.
    pub fn advance_period(&mut self, period: BillingPeriod) -> Result<(), BillingError> {
        if period <= self.period {
            return Err(BillingError::Numbering(format!(
                "new period {period} must be later than current period {}",
                self.period
            )));
        }
        self.period = period;
        self.next_number = 1;
        Ok(())
    }

    /// Advance if `period` is later than the current one.
    /// Returns true if the period was advanced.
    pub fn auto_advance(&mut self, period: BillingPeriod) -> bool {
        self.advance_period(period).is_ok()
    }
}
