use rust_decimal::Decimal;

use super::calculator::calculate;
use super::currencies::is_known_currency_code;
use super::error::ValidationError;
use super::types::*;

/// Most extras one invoice may carry.
pub const MAX_EXTRAS: usize = 100;
/// Longest invoice note, in characters.
pub const MAX_NOTE_CHARS: usize = 2000;

/// Validate utility settings.
/// Returns all validation errors found (not just the first).
pub fn validate_settings(settings: &Settings) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if settings.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "utility name must not be empty"));
    }

    if settings.exchange_rate <= Decimal::ZERO {
        errors.push(ValidationError::new(
            "exchange_rate",
            format!("exchange rate must be positive (got {})", settings.exchange_rate),
        ));
    }

    if settings.rounding_unit == 0 {
        errors.push(ValidationError::new(
            "rounding_unit",
            "rounding unit must be a positive integer",
        ));
    }

    let code = &settings.local_currency_code;
    if code.len() != 3 {
        errors.push(ValidationError::new(
            "local_currency_code",
            "currency code must be 3 characters (ISO 4217)",
        ));
    } else if !is_known_currency_code(code) {
        errors.push(ValidationError::new(
            "local_currency_code",
            format!("currency code '{code}' is not a known ISO 4217 code"),
        ));
    } else if code == "USD" {
        errors.push(ValidationError::new(
            "local_currency_code",
            "local currency must differ from USD",
        ));
    }

    non_negative(settings.default_price_usd, "default_price_usd", &mut errors);
    non_negative(settings.default_price_local, "default_price_local", &mut errors);
    non_negative(
        settings.default_subscription_fee,
        "default_subscription_fee",
        &mut errors,
    );

    errors
}

/// Validate a customer record.
pub fn validate_customer(customer: &Customer) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if customer.name.trim().is_empty() {
        errors.push(ValidationError::new("name", "customer name must not be empty"));
    }

    if let Some(phone) = &customer.phone {
        let valid = phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '/'));
        if !valid || !phone.chars().any(|c| c.is_ascii_digit()) {
            errors.push(ValidationError::new(
                "phone",
                format!("'{phone}' is not a phone number"),
            ));
        }
    }

    non_negative(customer.subscription_fee, "subscription_fee", &mut errors);
    non_negative(customer.price_per_kwh_usd, "price_per_kwh_usd", &mut errors);
    non_negative(customer.price_per_kwh_local, "price_per_kwh_local", &mut errors);
    non_negative(customer.last_meter_reading, "last_meter_reading", &mut errors);

    errors
}

/// Validate an expense record.
pub fn validate_expense(expense: &Expense) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if expense.label.trim().is_empty() {
        errors.push(ValidationError::new(
            "label",
            "expense label must not be empty",
        ));
    }

    if expense.amount <= Decimal::ZERO {
        errors.push(ValidationError::new(
            "amount",
            format!("expense amount must be positive (got {})", expense.amount),
        ));
    }

    errors
}

/// Validate a stored invoice: identity fields, and that the derived totals
/// agree with a fresh calculation from the stored inputs and captured rate.
pub fn validate_invoice(invoice: &Invoice) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if invoice.number.trim().is_empty() {
        errors.push(ValidationError::new("number", "invoice number must not be empty"));
    }
    if invoice.issued_by.trim().is_empty() {
        errors.push(ValidationError::new("issued_by", "issuing user must not be empty"));
    }

    if invoice.extras.len() > MAX_EXTRAS {
        errors.push(ValidationError::new(
            "extras",
            format!("invoice cannot have more than {MAX_EXTRAS} extras"),
        ));
    }
    for (i, extra) in invoice.extras.iter().enumerate() {
        if extra.label.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("extras[{i}].label"),
                "extra label must not be empty",
            ));
        }
        if extra.value.is_zero() {
            errors.push(ValidationError::new(
                format!("extras[{i}].value"),
                "extra value must not be zero",
            ));
        }
    }

    if invoice
        .note
        .as_ref()
        .is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS)
    {
        errors.push(ValidationError::new(
            "note",
            format!("note cannot exceed {MAX_NOTE_CHARS} characters"),
        ));
    }

    let expected = match calculate(&invoice.calculation_input()) {
        Ok(totals) => totals,
        Err(err) => {
            errors.push(err.into());
            return errors;
        }
    };

    let stored = &invoice.totals;
    let checks = [
        ("totals.consumption_kwh", stored.consumption_kwh, expected.consumption_kwh),
        ("totals.fixed_fee", stored.fixed_fee, expected.fixed_fee),
        ("totals.extras_total", stored.extras_total, expected.extras_total),
        ("totals.discount", stored.discount, expected.discount),
        ("totals.total_usd", stored.total_usd, expected.total_usd),
        ("totals.total_local", stored.total_local, expected.total_local),
    ];
    for (field, actual, wanted) in checks {
        if actual != wanted {
            errors.push(ValidationError::new(
                field,
                format!("stored value {actual} does not match calculation {wanted}"),
            ));
        }
    }

    if stored.energy_cost_usd != expected.energy_cost_usd
        || stored.energy_cost_local != expected.energy_cost_local
    {
        errors.push(ValidationError::new(
            "totals.energy_cost",
            "stored energy cost does not match calculation",
        ));
    }

    errors
}

fn non_negative(value: Decimal, field: &str, errors: &mut Vec<ValidationError>) {
    if value < Decimal::ZERO {
        errors.push(ValidationError::new(
            field,
            format!("must not be negative (got {value})"),
        ));
    }
}
