use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use super::error::CalculationError;
use super::types::*;

/// Raw inputs for one billing period.
///
/// Prices for currencies the pricing mode does not use are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationInput<'a> {
    pub meter_previous: Decimal,
    pub meter_current: Decimal,
    pub pricing_mode: PricingMode,
    pub price_per_kwh_usd: Option<Decimal>,
    pub price_per_kwh_local: Option<Decimal>,
    /// Fixed fee, in the currency of the pricing mode.
    pub fixed_fee: Decimal,
    /// Extras, in the currency of the pricing mode. In DUAL mode each value
    /// is added to both ledgers as-is, without conversion.
    pub extras: &'a [Extra],
    /// Flat discount in USD. Not available in DUAL mode.
    pub discount: Decimal,
    /// Local-currency units per USD.
    pub exchange_rate: Decimal,
    pub rounding_unit: u64,
}

/// Compute consumption and both currency totals for one billing period.
///
/// ```
/// use ishtirak::core::*;
/// use rust_decimal_macros::dec;
///
/// let totals = calculate(&CalculationInput {
///     meter_previous: dec!(1000),
///     meter_current: dec!(1250),
///     pricing_mode: PricingMode::Usd,
///     price_per_kwh_usd: Some(dec!(0.45)),
///     price_per_kwh_local: None,
///     fixed_fee: dec!(6),
///     extras: &[],
///     discount: dec!(0),
///     exchange_rate: dec!(90000),
///     rounding_unit: 1000,
/// })
/// .unwrap();
///
/// assert_eq!(totals.consumption_kwh, dec!(250));
/// assert_eq!(totals.total_usd, dec!(118.5));
/// assert_eq!(totals.total_local, dec!(10665000));
/// ```
pub fn calculate(input: &CalculationInput<'_>) -> Result<InvoiceTotals, CalculationError> {
    let result = compute(input);
    match &result {
        Ok(totals) => debug!(
            mode = %input.pricing_mode,
            consumption_kwh = %totals.consumption_kwh,
            total_usd = %totals.total_usd,
            total_local = %totals.total_local,
            "invoice calculated"
        ),
        Err(err) => warn!(mode = %input.pricing_mode, error = %err, "invoice calculation rejected"),
    }
    result
}

fn compute(input: &CalculationInput<'_>) -> Result<InvoiceTotals, CalculationError> {
    check_non_negative_reading("meter_previous", input.meter_previous)?;
    check_non_negative_reading("meter_current", input.meter_current)?;

    let consumption = input.meter_current - input.meter_previous;
    if consumption < Decimal::ZERO {
        return Err(CalculationError::NegativeConsumption {
            previous: input.meter_previous,
            current: input.meter_current,
        });
    }

    if input.exchange_rate <= Decimal::ZERO {
        return Err(CalculationError::NonPositiveExchangeRate(
            input.exchange_rate,
        ));
    }
    if input.rounding_unit == 0 {
        return Err(CalculationError::NonPositiveRoundingUnit);
    }

    check_non_negative_amount("fixed_fee", input.fixed_fee)?;
    check_non_negative_amount("discount", input.discount)?;
    if !input.pricing_mode.supports_discount() && !input.discount.is_zero() {
        return Err(CalculationError::DiscountNotSupported(input.pricing_mode));
    }

    let mode = input.pricing_mode;
    let price_usd = required_price(mode, Currency::Usd, input.price_per_kwh_usd)?;
    let price_local = required_price(mode, Currency::Local, input.price_per_kwh_local)?;

    let energy_cost_usd = price_usd
        .map(|p| mul(consumption, p, "energy cost (USD)"))
        .transpose()?;
    let energy_cost_local = price_local
        .map(|p| mul(consumption, p, "energy cost (local)"))
        .transpose()?;

    let extras_total = input
        .extras
        .iter()
        .try_fold(Decimal::ZERO, |acc, e| add(acc, e.value, "extras total"))?;

    let (total_usd, total_local) = match mode {
        PricingMode::Usd => {
            let energy = energy_cost_usd.unwrap_or_default();
            let total_usd = sub(
                add(add(energy, input.fixed_fee, "USD total")?, extras_total, "USD total")?,
                input.discount,
                "USD total",
            )?;
            let local = mul(total_usd, input.exchange_rate, "local total")?;
            (total_usd, round_to_unit(local, input.rounding_unit)?)
        }
        PricingMode::Local => {
            let energy = energy_cost_local.unwrap_or_default();
            let discount_local = mul(input.discount, input.exchange_rate, "local discount")?;
            let subtotal = sub(
                add(add(energy, input.fixed_fee, "local total")?, extras_total, "local total")?,
                discount_local,
                "local total",
            )?;
            let total_local = round_to_unit(subtotal, input.rounding_unit)?;
            let total_usd = total_local
                .checked_div(input.exchange_rate)
                .ok_or(CalculationError::Arithmetic("USD total"))?;
            (total_usd, total_local)
        }
        PricingMode::Dual => {
            let energy_usd = energy_cost_usd.unwrap_or_default();
            let energy_local = energy_cost_local.unwrap_or_default();
            let total_usd = add(
                add(energy_usd, input.fixed_fee, "USD total")?,
                extras_total,
                "USD total",
            )?;
            let subtotal_local = add(
                add(energy_local, input.fixed_fee, "local total")?,
                extras_total,
                "local total",
            )?;
            (total_usd, round_to_unit(subtotal_local, input.rounding_unit)?)
        }
    };

    Ok(InvoiceTotals {
        consumption_kwh: consumption,
        energy_cost_usd,
        energy_cost_local,
        fixed_fee: input.fixed_fee,
        extras_total,
        discount: input.discount,
        total_usd,
        total_local,
    })
}

/// Snap `value` to the nearest multiple of `unit`, halves away from zero.
///
/// ```
/// use ishtirak::core::round_to_unit;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(round_to_unit(dec!(10665499), 1000).unwrap(), dec!(10665000));
/// assert_eq!(round_to_unit(dec!(10665500), 1000).unwrap(), dec!(10666000));
/// assert_eq!(round_to_unit(dec!(-1500), 1000).unwrap(), dec!(-2000));
/// ```
pub fn round_to_unit(value: Decimal, unit: u64) -> Result<Decimal, CalculationError> {
    if unit == 0 {
        return Err(CalculationError::NonPositiveRoundingUnit);
    }
    let unit = Decimal::from(unit);
    let steps = value
        .checked_div(unit)
        .ok_or(CalculationError::Arithmetic("rounding"))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    mul(steps, unit, "rounding")
}

impl Invoice {
    /// Calculator inputs as stored on this invoice, using the captured rate.
    pub fn calculation_input(&self) -> CalculationInput<'_> {
        CalculationInput {
            meter_previous: self.meter_previous,
            meter_current: self.meter_current,
            pricing_mode: self.pricing_mode,
            price_per_kwh_usd: self.price_per_kwh_usd,
            price_per_kwh_local: self.price_per_kwh_local,
            fixed_fee: self.fixed_fee,
            extras: &self.extras,
            discount: self.discount,
            exchange_rate: self.exchange_rate_used,
            rounding_unit: self.rounding_unit_used,
        }
    }

    /// Recompute and overwrite every derived total from the stored inputs.
    /// On error the invoice is left unchanged.
    pub fn recalculate(&mut self) -> Result<(), CalculationError> {
        let totals = calculate(&self.calculation_input())?;
        self.totals = totals;
        Ok(())
    }
}

fn required_price(
    mode: PricingMode,
    currency: Currency,
    price: Option<Decimal>,
) -> Result<Option<Decimal>, CalculationError> {
    if !mode.required_currencies().contains(&currency) {
        return Ok(None);
    }
    let price = price.ok_or(CalculationError::MissingPrice { mode, currency })?;
    let field = match currency {
        Currency::Usd => "price_per_kwh_usd",
        Currency::Local => "price_per_kwh_local",
    };
    check_non_negative_amount(field, price)?;
    Ok(Some(price))
}

fn check_non_negative_reading(field: &'static str, value: Decimal) -> Result<(), CalculationError> {
    if value < Decimal::ZERO {
        return Err(CalculationError::NegativeReading { field, value });
    }
    Ok(())
}

fn check_non_negative_amount(field: &'static str, value: Decimal) -> Result<(), CalculationError> {
    if value < Decimal::ZERO {
        return Err(CalculationError::NegativeAmount { field, value });
    }
    Ok(())
}

fn add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_add(b).ok_or(CalculationError::Arithmetic(what))
}

fn sub(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_sub(b).ok_or(CalculationError::Arithmetic(what))
}

fn mul(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_mul(b).ok_or(CalculationError::Arithmetic(what))
}
