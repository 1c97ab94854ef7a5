use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::calculator::{CalculationInput, calculate};
use super::error::BillingError;
use super::period::BillingPeriod;
use super::provider::SettingsProvider;
use super::types::*;
use super::validation::{self, MAX_EXTRAS, MAX_NOTE_CHARS};

/// Builder for issuing a consumption invoice.
///
/// ```
/// use ishtirak::core::*;
/// use rust_decimal_macros::dec;
///
/// let settings = Settings::default();
/// let period: BillingPeriod = "2024-03".parse().unwrap();
///
/// let invoice = InvoiceBuilder::new(CustomerId::new(), period)
///     .meter_previous(dec!(1000))
///     .meter_current(dec!(1250))
///     .pricing_mode(PricingMode::Usd)
///     .price_per_kwh_usd(dec!(0.45))
///     .fixed_fee(dec!(6))
///     .issued_by("operator")
///     .build("INV-2024-03-001", &settings)
///     .unwrap();
///
/// assert_eq!(invoice.total_usd(), dec!(118.5));
/// assert_eq!(invoice.total_local(), dec!(10665000));
/// assert_eq!(invoice.exchange_rate_used, dec!(90000));
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceBuilder {
    customer_id: CustomerId,
    period: BillingPeriod,
    meter_previous: Decimal,
    meter_current: Option<Decimal>,
    pricing_mode: PricingMode,
    price_per_kwh_usd: Option<Decimal>,
    price_per_kwh_local: Option<Decimal>,
    fixed_fee: Decimal,
    extras: Vec<Extra>,
    discount: Decimal,
    note: Option<String>,
    issued_by: String,
    issued_at: Option<DateTime<Utc>>,
}

impl InvoiceBuilder {
    pub fn new(customer_id: CustomerId, period: BillingPeriod) -> Self {
        Self {
            customer_id,
            period,
            meter_previous: Decimal::ZERO,
            meter_current: None,
            pricing_mode: PricingMode::Usd,
            price_per_kwh_usd: None,
            price_per_kwh_local: None,
            fixed_fee: Decimal::ZERO,
            extras: Vec::new(),
            discount: Decimal::ZERO,
            note: None,
            issued_by: "system".to_string(),
            issued_at: None,
        }
    }

    /// Prefill the previous reading, prices and fixed fee from a customer's tariff.
    /// Zero prices fall back to the utility defaults.
    pub fn from_tariff(
        customer_id: CustomerId,
        period: BillingPeriod,
        tariff: &Tariff,
        settings: &impl SettingsProvider,
    ) -> Self {
        let defaults = settings.default_prices();
        let or_default = |price: Decimal, default: Decimal| {
            if price.is_zero() { default } else { price }
        };
        Self {
            meter_previous: tariff.last_meter_reading,
            price_per_kwh_usd: Some(or_default(tariff.price_usd, defaults.usd)),
            price_per_kwh_local: Some(or_default(tariff.price_local, defaults.local)),
            fixed_fee: tariff.fixed_fee,
            ..Self::new(customer_id, period)
        }
    }

    pub fn meter_previous(mut self, reading: Decimal) -> Self {
        self.meter_previous = reading;
        self
    }

    pub fn meter_current(mut self, reading: Decimal) -> Self {
        self.meter_current = Some(reading);
        self
    }

    pub fn pricing_mode(mut self, mode: PricingMode) -> Self {
        self.pricing_mode = mode;
        self
    }

    pub fn price_per_kwh_usd(mut self, price: Decimal) -> Self {
        self.price_per_kwh_usd = Some(price);
        self
    }

    pub fn price_per_kwh_local(mut self, price: Decimal) -> Self {
        self.price_per_kwh_local = Some(price);
        self
    }

    pub fn fixed_fee(mut self, fee: Decimal) -> Self {
        self.fixed_fee = fee;
        self
    }

    pub fn add_extra(mut self, label: impl Into<String>, value: Decimal) -> Self {
        self.extras.push(Extra::new(label, value));
        self
    }

    pub fn discount(mut self, amount: Decimal) -> Self {
        self.discount = amount;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn issued_by(mut self, user: impl Into<String>) -> Self {
        self.issued_by = user.into();
        self
    }

    /// Fix the issue timestamp (defaults to the moment `build` runs).
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.issued_at = Some(at);
        self
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn period(&self) -> BillingPeriod {
        self.period
    }

    /// Calculate the invoice, capturing the current exchange rate and rounding unit.
    ///
    /// Extras with a blank label or a zero value are dropped.
    pub fn build(
        self,
        number: impl Into<String>,
        settings: &impl SettingsProvider,
    ) -> Result<Invoice, BillingError> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(BillingError::Builder("invoice number is required".into()));
        }
        if number.len() > 200 {
            return Err(BillingError::Builder(
                "invoice number cannot exceed 200 characters".into(),
            ));
        }
        let meter_current = self
            .meter_current
            .ok_or_else(|| BillingError::Builder("current meter reading is required".into()))?;
        if self.extras.len() > MAX_EXTRAS {
            return Err(BillingError::Builder(format!(
                "invoice cannot have more than {MAX_EXTRAS} extras"
            )));
        }
        if self
            .note
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS)
        {
            return Err(BillingError::Builder(format!(
                "note cannot exceed {MAX_NOTE_CHARS} characters"
            )));
        }
        if self.issued_by.trim().is_empty() {
            return Err(BillingError::Builder("issuing user is required".into()));
        }

        let extras: Vec<Extra> = self
            .extras
            .into_iter()
            .filter(|e| !e.label.trim().is_empty() && !e.value.is_zero())
            .collect();

        let exchange_rate = settings.exchange_rate();
        let rounding_unit = settings.rounding_unit();

        let totals = calculate(&CalculationInput {
            meter_previous: self.meter_previous,
            meter_current,
            pricing_mode: self.pricing_mode,
            price_per_kwh_usd: self.price_per_kwh_usd,
            price_per_kwh_local: self.price_per_kwh_local,
            fixed_fee: self.fixed_fee,
            extras: &extras,
            discount: self.discount,
            exchange_rate,
            rounding_unit,
        })?;

        Ok(Invoice {
            number,
            period: self.period,
            customer_id: self.customer_id,
            meter_previous: self.meter_previous,
            meter_current,
            pricing_mode: self.pricing_mode,
            price_per_kwh_usd: self.price_per_kwh_usd,
            price_per_kwh_local: self.price_per_kwh_local,
            fixed_fee: self.fixed_fee,
            extras,
            discount: self.discount,
            exchange_rate_used: exchange_rate,
            rounding_unit_used: rounding_unit,
            totals,
            note: self.note.filter(|n| !n.trim().is_empty()),
            issued_at: self.issued_at.unwrap_or_else(Utc::now),
            issued_by: self.issued_by,
        })
    }
}

/// Builder for Customer, prefilled with the utility's default tariff.
pub struct CustomerBuilder {
    name: String,
    address: Option<String>,
    phone: Option<String>,
    status: CustomerStatus,
    subscription_fee: Decimal,
    price_per_kwh_usd: Decimal,
    price_per_kwh_local: Decimal,
    last_meter_reading: Decimal,
}

impl CustomerBuilder {
    pub fn new(name: impl Into<String>, settings: &Settings) -> Self {
        Self {
            name: name.into(),
            address: None,
            phone: None,
            status: CustomerStatus::Active,
            subscription_fee: settings.default_subscription_fee,
            price_per_kwh_usd: settings.default_price_usd,
            price_per_kwh_local: settings.default_price_local,
            last_meter_reading: Decimal::ZERO,
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn status(mut self, status: CustomerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn subscription_fee(mut self, fee: Decimal) -> Self {
        self.subscription_fee = fee;
        self
    }

    pub fn price_per_kwh_usd(mut self, price: Decimal) -> Self {
        self.price_per_kwh_usd = price;
        self
    }

    pub fn price_per_kwh_local(mut self, price: Decimal) -> Self {
        self.price_per_kwh_local = price;
        self
    }

    /// Opening meter reading for a customer joining with an existing meter.
    pub fn last_meter_reading(mut self, reading: Decimal) -> Self {
        self.last_meter_reading = reading;
        self
    }

    /// Build the customer with a fresh identifier and run validation.
    pub fn build(self) -> Result<Customer, BillingError> {
        let customer = Customer {
            id: CustomerId::new(),
            name: self.name.trim().to_string(),
            address: self.address.filter(|a| !a.trim().is_empty()),
            phone: self.phone.filter(|p| !p.trim().is_empty()),
            status: self.status,
            subscription_fee: self.subscription_fee,
            price_per_kwh_usd: self.price_per_kwh_usd,
            price_per_kwh_local: self.price_per_kwh_local,
            last_meter_reading: self.last_meter_reading,
            created_at: Utc::now(),
            updated_at: None,
        };

        let errors = validation::validate_customer(&customer);
        if !errors.is_empty() {
            return Err(BillingError::from_validation(&errors));
        }
        Ok(customer)
    }
}
