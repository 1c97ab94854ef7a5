use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::period::BillingPeriod;

/// The two currency ledgers an invoice can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US dollar.
    #[serde(rename = "USD")]
    Usd,
    /// Local currency (Lebanese pound unless configured otherwise).
    #[serde(rename = "LBP", alias = "LOCAL")]
    Local,
}

impl Currency {
    /// Currency code token used on stored records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Local => "LBP",
        }
    }

    /// Parse from a code token. `"LOCAL"` is accepted as a generic alias.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::Usd),
            "LBP" | "LOCAL" => Some(Self::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Currency policy governing how one invoice's energy cost is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PricingMode {
    /// Priced in USD; local total derived through the exchange rate.
    Usd,
    /// Priced in local currency; USD total derived through the exchange rate.
    Local,
    /// Both ledgers priced independently.
    Dual,
}

impl PricingMode {
    /// Currencies whose per-kWh price must be supplied for this mode.
    pub fn required_currencies(&self) -> &'static [Currency] {
        match self {
            Self::Usd => &[Currency::Usd],
            Self::Local => &[Currency::Local],
            Self::Dual => &[Currency::Usd, Currency::Local],
        }
    }

    /// Whether the mode carries a flat discount.
    pub fn supports_discount(&self) -> bool {
        !matches!(self, Self::Dual)
    }
}

impl std::fmt::Display for PricingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Usd => "USD",
            Self::Local => "LOCAL",
            Self::Dual => "DUAL",
        })
    }
}

/// Ad-hoc labelled line item added on top of energy cost and fixed fee.
/// A negative value is a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extra {
    pub label: String,
    pub value: Decimal,
}

impl Extra {
    pub fn new(label: impl Into<String>, value: Decimal) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Customer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl CustomerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Subscription status. Inactive customers keep their history but are not billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

/// A subscriber of the utility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub status: CustomerStatus,
    /// Fixed monthly fee in USD. Drafts priced in local currency convert it
    /// at the exchange rate in effect when the draft is made.
    #[serde(alias = "subscription")]
    pub subscription_fee: Decimal,
    #[serde(alias = "priceUsd")]
    pub price_per_kwh_usd: Decimal,
    #[serde(alias = "priceLbp")]
    pub price_per_kwh_local: Decimal,
    /// Advanced only when an invoice for this customer is committed.
    #[serde(default)]
    pub last_meter_reading: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Pricing parameters currently in effect for this customer.
    pub fn tariff(&self) -> Tariff {
        Tariff {
            price_usd: self.price_per_kwh_usd,
            price_local: self.price_per_kwh_local,
            fixed_fee: self.subscription_fee,
            last_meter_reading: self.last_meter_reading,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}

/// Per-customer pricing parameters used to prefill an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tariff {
    pub price_usd: Decimal,
    pub price_local: Decimal,
    pub fixed_fee: Decimal,
    pub last_meter_reading: Decimal,
}

/// Default per-kWh prices offered to new customers and invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPrices {
    pub usd: Decimal,
    pub local: Decimal,
}

/// Utility-wide configuration.
///
/// Missing fields fall back to the defaults of a freshly installed utility:
/// 90 000 local units per USD, local totals snapped to the nearest 1 000,
/// 0.45 USD or 40 000 LBP per kWh and a 6 unit subscription fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Utility name printed on invoices.
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub default_currency: Currency,
    /// ISO 4217 code of the local currency.
    pub local_currency_code: String,
    /// Local-currency units per USD.
    pub exchange_rate: Decimal,
    /// Granularity local-currency totals are snapped to.
    pub rounding_unit: u64,
    pub default_price_usd: Decimal,
    #[serde(alias = "defaultPriceLbp")]
    pub default_price_local: Decimal,
    /// Subscription fee for new customers, in USD.
    #[serde(alias = "defaultSubscription")]
    pub default_subscription_fee: Decimal,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "اشتراك كهرباء الضيعة".to_string(),
            address: None,
            phone: None,
            default_currency: Currency::Usd,
            local_currency_code: "LBP".to_string(),
            exchange_rate: dec!(90000),
            rounding_unit: 1000,
            default_price_usd: dec!(0.45),
            default_price_local: dec!(40000),
            default_subscription_fee: dec!(6),
        }
    }
}

#[cfg(feature = "json")]
impl Settings {
    /// Parse settings from JSON, filling absent fields with defaults, and validate them.
    ///
    /// Accepts the field names written by [`to_json_string`](Self::to_json_string)
    /// as well as the older `defaultPriceLbp` / `defaultSubscription` keys.
    pub fn from_json_str(json: &str) -> Result<Self, super::error::BillingError> {
        let settings: Self = serde_json::from_str(json)?;
        let errors = super::validation::validate_settings(&settings);
        if !errors.is_empty() {
            return Err(super::error::BillingError::from_validation(&errors));
        }
        Ok(settings)
    }

    pub fn to_json_string(&self) -> Result<String, super::error::BillingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Consumption and monetary totals for one billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    /// `meter_current - meter_previous`, never negative.
    pub consumption_kwh: Decimal,
    /// Unrounded energy cost in USD (USD and DUAL modes).
    pub energy_cost_usd: Option<Decimal>,
    /// Unrounded energy cost in local currency (LOCAL and DUAL modes).
    pub energy_cost_local: Option<Decimal>,
    pub fixed_fee: Decimal,
    pub extras_total: Decimal,
    pub discount: Decimal,
    /// Full-precision USD total.
    pub total_usd: Decimal,
    /// Local total, always a multiple of the rounding unit.
    pub total_local: Decimal,
}

impl InvoiceTotals {
    /// USD total rounded to cents for display.
    pub fn total_usd_display(&self) -> Decimal {
        self.total_usd
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
    }
}

/// An issued consumption invoice.
///
/// Immutable history: the only way to change derived figures is
/// [`Invoice::recalculate`], which overwrites all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Invoice number, e.g. "INV-2024-03-001".
    pub number: String,
    pub period: BillingPeriod,
    pub customer_id: CustomerId,
    pub meter_previous: Decimal,
    pub meter_current: Decimal,
    pub pricing_mode: PricingMode,
    pub price_per_kwh_usd: Option<Decimal>,
    pub price_per_kwh_local: Option<Decimal>,
    pub fixed_fee: Decimal,
    pub extras: Vec<Extra>,
    #[serde(default)]
    pub discount: Decimal,
    /// Rate captured when the invoice was issued; later settings changes do not apply.
    pub exchange_rate_used: Decimal,
    pub rounding_unit_used: u64,
    pub totals: InvoiceTotals,
    #[serde(default)]
    pub note: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub issued_by: String,
}

impl Invoice {
    pub fn consumption_kwh(&self) -> Decimal {
        self.totals.consumption_kwh
    }

    pub fn total_usd(&self) -> Decimal {
        self.totals.total_usd
    }

    pub fn total_local(&self) -> Decimal {
        self.totals.total_local
    }
}

/// Expense identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub Uuid);

impl ExpenseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExpenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Operating expense categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseType {
    /// Generator fuel.
    Diesel,
    Maintenance,
    Other,
}

impl ExpenseType {
    /// Label filled in automatically for the known categories.
    pub fn default_label(&self) -> Option<&'static str> {
        match self {
            Self::Diesel => Some("ثمن مازوت"),
            Self::Maintenance => Some("صيانة المولد"),
            Self::Other => None,
        }
    }
}

/// An operating expense booked against a billing period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub period: BillingPeriod,
    #[serde(rename = "type")]
    pub expense_type: ExpenseType,
    pub label: String,
    #[serde(alias = "amountValue")]
    pub amount: Decimal,
    #[serde(alias = "amountCurrency")]
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    /// Create an expense, auto-filling the label for known types.
    pub fn new(
        period: BillingPeriod,
        expense_type: ExpenseType,
        amount: Decimal,
        currency: Currency,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            period,
            expense_type,
            label: expense_type.default_label().unwrap_or_default().to_string(),
            amount,
            currency,
            created_at: Utc::now(),
        }
    }

    /// Override the auto-filled label. A blank label keeps the default.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.label = label;
        }
        self
    }
}
