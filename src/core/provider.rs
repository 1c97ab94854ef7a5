//! Read-only collaborators the calculator and builders consume.

use rust_decimal::Decimal;

use super::types::{CustomerId, DefaultPrices, Settings, Tariff};

/// Source of utility-wide pricing configuration.
pub trait SettingsProvider {
    /// Local-currency units per USD.
    fn exchange_rate(&self) -> Decimal;
    /// Granularity local-currency totals are snapped to.
    fn rounding_unit(&self) -> u64;
    /// Per-kWh prices used to prefill new customers and invoices.
    fn default_prices(&self) -> DefaultPrices;
}

/// Lookup of per-customer tariffs.
pub trait CustomerProvider {
    fn customer_tariff(&self, id: &CustomerId) -> Option<Tariff>;
}

impl SettingsProvider for Settings {
    fn exchange_rate(&self) -> Decimal {
        self.exchange_rate
    }

    fn rounding_unit(&self) -> u64 {
        self.rounding_unit
    }

    fn default_prices(&self) -> DefaultPrices {
        DefaultPrices {
            usd: self.default_price_usd,
            local: self.default_price_local,
        }
    }
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for &T {
    fn exchange_rate(&self) -> Decimal {
        (**self).exchange_rate()
    }

    fn rounding_unit(&self) -> u64 {
        (**self).rounding_unit()
    }

    fn default_prices(&self) -> DefaultPrices {
        (**self).default_prices()
    }
}
