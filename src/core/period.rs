use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::BillingError;

/// A calendar year-month identifying one billing cycle, written `YYYY-MM`.
///
/// ```
/// use ishtirak::core::BillingPeriod;
///
/// let period: BillingPeriod = "2024-03".parse().unwrap();
/// assert_eq!(period.year(), 2024);
/// assert_eq!(period.month(), 3);
/// assert_eq!(period.next().unwrap().to_string(), "2024-04");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingPeriod {
    year: i32,
    month: u32,
}

impl BillingPeriod {
    /// Create a period; the year must have four digits and the month be 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, BillingError> {
        if !(1000..=9999).contains(&year) {
            return Err(BillingError::Period(format!(
                "year {year} must have four digits"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(BillingError::Period(format!(
                "month {month} must be between 1 and 12"
            )));
        }
        Ok(Self { year, month })
    }

    /// Period containing `date`. Fails for dates outside years 1000-9999.
    pub fn from_date(date: NaiveDate) -> Result<Self, BillingError> {
        Self::new(date.year(), date.month())
    }

    /// Period containing today's date (UTC).
    pub fn current() -> Result<Self, BillingError> {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month. Fails past 9999-12.
    pub fn next(&self) -> Result<Self, BillingError> {
        match self.month {
            12 => Self::new(self.year + 1, 1),
            m => Self::new(self.year, m + 1),
        }
    }

    /// The preceding month. Fails before 1000-01.
    pub fn previous(&self) -> Result<Self, BillingError> {
        match self.month {
            1 => Self::new(self.year - 1, 12),
            m => Self::new(self.year, m - 1),
        }
    }

    /// Whether `date` falls inside this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for BillingPeriod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BillingError::Period(format!("'{s}' is not a YYYY-MM period"));

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for BillingPeriod {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingPeriod> for String {
    fn from(period: BillingPeriod) -> Self {
        period.to_string()
    }
}
