//! Integration tests for the billing service over the in-memory ledger.
//!
//! Run with: `cargo test --features all --test ledger_tests`

#![cfg(feature = "ledger")]

use chrono::{DateTime, TimeZone, Utc};
use ishtirak::core::*;
use ishtirak::ledger::*;
use rust_decimal_macros::dec;

fn period(s: &str) -> BillingPeriod {
    s.parse().unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
}

fn service() -> BillingService {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    BillingService::in_memory(Settings::default()).unwrap()
}

fn add_customer(billing: &mut BillingService, name: &str) -> CustomerId {
    let customer = billing.new_customer(name).build().unwrap();
    billing.add_customer(customer).unwrap()
}

fn issue(billing: &mut BillingService, id: &CustomerId, p: &str, current: rust_decimal::Decimal) -> Invoice {
    let draft = billing
        .draft_invoice(id, period(p))
        .unwrap()
        .meter_current(current);
    billing.issue_invoice(draft).unwrap()
}

// ── Issuing ──

#[test]
fn issue_advances_customer_reading() {
    let mut billing = service();
    let id = add_customer(&mut billing, "Abu Ali");

    let march = issue(&mut billing, &id, "2024-03", dec!(250));
    assert_eq!(march.number, "INV-2024-03-001");
    assert_eq!(march.meter_previous, dec!(0));
    assert_eq!(march.total_usd(), dec!(118.5));
    assert_eq!(march.total_local(), dec!(10665000));
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(250));

    let april = issue(&mut billing, &id, "2024-04", dec!(400));
    assert_eq!(april.meter_previous, dec!(250));
    assert_eq!(april.total_usd(), dec!(73.5));
    assert_eq!(april.total_local(), dec!(6615000));
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(400));
}

#[test]
fn numbers_are_sequential_within_a_period() {
    let mut billing = service();
    let a = add_customer(&mut billing, "A");
    let b = add_customer(&mut billing, "B");

    assert_eq!(issue(&mut billing, &a, "2024-03", dec!(10)).number, "INV-2024-03-001");
    assert_eq!(issue(&mut billing, &b, "2024-03", dec!(10)).number, "INV-2024-03-002");
    assert_eq!(issue(&mut billing, &a, "2024-04", dec!(20)).number, "INV-2024-04-001");
}

#[test]
fn numbering_continues_after_deleted_gap() {
    let mut billing = service().with_number_prefix("F-");
    let a = add_customer(&mut billing, "A");
    let b = add_customer(&mut billing, "B");
    let c = add_customer(&mut billing, "C");

    issue(&mut billing, &a, "2024-03", dec!(10));
    issue(&mut billing, &b, "2024-03", dec!(10));
    billing.delete_invoice("F-2024-03-001").unwrap();

    assert_eq!(issue(&mut billing, &c, "2024-03", dec!(10)).number, "F-2024-03-003");
}

#[test]
fn default_local_currency_converts_subscription_fee() {
    let settings = Settings {
        default_currency: Currency::Local,
        ..Settings::default()
    };
    let mut billing = BillingService::in_memory(settings).unwrap();
    let id = add_customer(&mut billing, "Layla");

    let invoice = issue(&mut billing, &id, "2024-03", dec!(100));
    assert_eq!(invoice.pricing_mode, PricingMode::Local);
    // 100 × 40 000 + 6 USD × 90 000
    assert_eq!(invoice.fixed_fee, dec!(540000));
    assert_eq!(invoice.total_local(), dec!(4540000));
}

#[test]
fn preview_does_not_commit() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let draft = billing
        .draft_invoice(&id, period("2024-03"))
        .unwrap()
        .meter_current(dec!(250));

    let totals = billing.preview_invoice(&draft).unwrap();
    assert_eq!(totals.total_usd, dec!(118.5));
    assert!(billing.invoices(&InvoiceFilter::default()).is_empty());
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(0));
}

// ── Rejections leave the ledger untouched ──

#[test]
fn reversed_reading_commits_nothing() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    issue(&mut billing, &id, "2024-03", dec!(250));

    let draft = billing
        .draft_invoice(&id, period("2024-04"))
        .unwrap()
        .meter_current(dec!(200));
    let err = billing.issue_invoice(draft).unwrap_err();

    assert!(matches!(
        err,
        LedgerError::Billing(BillingError::Calculation(
            CalculationError::NegativeConsumption { .. }
        ))
    ));
    assert_eq!(billing.invoices(&InvoiceFilter::default()).len(), 1);
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(250));
}

#[test]
fn second_invoice_for_same_period_is_rejected() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    issue(&mut billing, &id, "2024-03", dec!(250));

    let draft = billing
        .draft_invoice(&id, period("2024-03"))
        .unwrap()
        .meter_current(dec!(300));
    let err = billing.issue_invoice(draft).unwrap_err();

    assert!(matches!(err, LedgerError::DuplicateInvoice { .. }));
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(250));
}

#[test]
fn inactive_customer_cannot_be_billed() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    billing
        .set_customer_status(&id, CustomerStatus::Inactive)
        .unwrap();

    let draft = billing
        .draft_invoice(&id, period("2024-03"))
        .unwrap()
        .meter_current(dec!(10));
    assert!(matches!(
        billing.issue_invoice(draft),
        Err(LedgerError::InactiveCustomer(c)) if c == id
    ));
}

#[test]
fn unknown_customer_is_reported() {
    let billing = service();
    let missing = CustomerId::new();
    assert!(matches!(
        billing.draft_invoice(&missing, period("2024-03")),
        Err(LedgerError::CustomerNotFound(c)) if c == missing
    ));
}

// ── Editing ──

#[test]
fn edit_recomputes_totals_without_moving_reading() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));
    issue(&mut billing, &id, "2024-04", dec!(400));

    let edited = billing
        .edit_invoice(&march.number, |inv| inv.meter_current = dec!(300))
        .unwrap();

    assert_eq!(edited.consumption_kwh(), dec!(300));
    assert_eq!(edited.total_usd(), dec!(141));
    assert_eq!(edited.total_local(), dec!(12690000));
    assert_eq!(billing.invoice(&march.number).unwrap(), edited);
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(400));
}

#[test]
fn edit_keeps_captured_exchange_rate() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));

    billing
        .update_settings(Settings {
            exchange_rate: dec!(100000),
            ..Settings::default()
        })
        .unwrap();
    let edited = billing
        .edit_invoice(&march.number, |inv| inv.note = Some("corrected".into()))
        .unwrap();

    assert_eq!(edited.exchange_rate_used, dec!(90000));
    assert_eq!(edited.total_local(), dec!(10665000));
}

#[test]
fn rejected_edit_keeps_stored_invoice() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));

    let err = billing
        .edit_invoice(&march.number, |inv| inv.meter_previous = dec!(500))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Billing(BillingError::Calculation(_))));
    assert_eq!(billing.invoice(&march.number).unwrap(), march);

    let err = billing
        .edit_invoice(&march.number, |inv| inv.number = "X".into())
        .unwrap_err();
    assert!(matches!(err, LedgerError::ImmutableField("number")));
}

#[test]
fn edit_is_held_to_the_issuing_limits() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));

    let err = billing
        .edit_invoice(&march.number, |inv| inv.extras.push(Extra::new("none", dec!(0))))
        .unwrap_err();
    assert!(matches!(err, LedgerError::Billing(BillingError::Validation(_))));

    let err = billing
        .edit_invoice(&march.number, |inv| {
            inv.extras = (0..=MAX_EXTRAS).map(|i| Extra::new(format!("x{i}"), dec!(1))).collect()
        })
        .unwrap_err();
    assert!(err.to_string().contains("extras"));

    let err = billing
        .edit_invoice(&march.number, |inv| inv.note = Some("n".repeat(MAX_NOTE_CHARS + 1)))
        .unwrap_err();
    assert!(err.to_string().contains("note"));

    assert_eq!(billing.invoice(&march.number).unwrap(), march);
}

#[test]
fn edit_cannot_move_into_a_billed_period() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));
    issue(&mut billing, &id, "2024-04", dec!(400));

    let err = billing
        .edit_invoice(&march.number, |inv| inv.period = period("2024-04"))
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateInvoice { .. }));
}

#[test]
fn delete_keeps_customer_reading() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let march = issue(&mut billing, &id, "2024-03", dec!(250));

    let removed = billing.delete_invoice(&march.number).unwrap();
    assert_eq!(removed.number, march.number);
    assert!(billing.invoice(&march.number).is_none());
    assert_eq!(billing.customer(&id).unwrap().last_meter_reading, dec!(250));
    assert!(matches!(
        billing.delete_invoice(&march.number),
        Err(LedgerError::InvoiceNotFound(_))
    ));
}

// ── Queries ──

#[test]
fn history_is_newest_first() {
    let mut billing = service();
    let a = add_customer(&mut billing, "A");
    let b = add_customer(&mut billing, "B");

    for (id, p, current, when) in [
        (a, "2024-01", dec!(100), at(2024, 2, 1)),
        (a, "2024-02", dec!(200), at(2024, 3, 1)),
        (b, "2024-02", dec!(50), at(2024, 3, 2)),
        (a, "2023-12", dec!(300), at(2024, 1, 1)),
    ] {
        let draft = billing
            .draft_invoice(&id, period(p))
            .unwrap()
            .meter_current(current)
            .issued_at(when);
        billing.issue_invoice(draft).unwrap();
    }

    let history = billing.history(&InvoiceFilter::customer(a));
    let periods: Vec<String> = history.iter().map(|i| i.period.to_string()).collect();
    assert_eq!(periods, ["2024-02", "2024-01", "2023-12"]);

    let filter = InvoiceFilter {
        year: Some(2024),
        ..InvoiceFilter::default()
    };
    assert_eq!(billing.history(&filter).len(), 3);
    assert_eq!(billing.invoices(&InvoiceFilter::period(period("2024-02"))).len(), 2);
    assert_eq!(billing.active_years(), [2024, 2023]);
}

#[test]
fn customer_search_by_name_phone_and_status() {
    let mut billing = service();
    let ali = billing
        .new_customer("Abu Ali")
        .phone("03 123 456")
        .build()
        .unwrap();
    let ali = billing.add_customer(ali).unwrap();
    let sami = add_customer(&mut billing, "Sami");
    billing
        .set_customer_status(&sami, CustomerStatus::Inactive)
        .unwrap();

    let by_name = billing.find_customers(&CustomerFilter {
        search: Some("abu ALI".into()),
        ..CustomerFilter::default()
    });
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, ali);

    let by_phone = billing.find_customers(&CustomerFilter {
        search: Some("123".into()),
        ..CustomerFilter::default()
    });
    assert_eq!(by_phone[0].id, ali);

    let inactive = billing.find_customers(&CustomerFilter {
        status: Some(CustomerStatus::Inactive),
        ..CustomerFilter::default()
    });
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].id, sami);

    assert_eq!(billing.find_customers(&CustomerFilter::default()).len(), 2);
}

// ── Customers ──

#[test]
fn update_customer_keeps_ledger_owned_fields() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    issue(&mut billing, &id, "2024-03", dec!(250));

    let mut changed = billing.customer(&id).unwrap();
    changed.name = "A. Haddad".into();
    changed.last_meter_reading = dec!(0);
    changed.price_per_kwh_usd = dec!(0.5);
    billing.update_customer(changed).unwrap();

    let stored = billing.customer(&id).unwrap();
    assert_eq!(stored.name, "A. Haddad");
    assert_eq!(stored.price_per_kwh_usd, dec!(0.5));
    assert_eq!(stored.last_meter_reading, dec!(250));
    assert!(stored.updated_at.is_some());
}

#[test]
fn removed_customer_keeps_invoices() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let invoice = issue(&mut billing, &id, "2024-03", dec!(250));

    billing.remove_customer(&id).unwrap();
    assert!(billing.customer(&id).is_none());
    assert!(billing.invoice(&invoice.number).is_some());
}

#[test]
fn invalid_customer_is_rejected() {
    let mut billing = service();
    let mut customer = billing.new_customer("A").build().unwrap();
    customer.subscription_fee = dec!(-1);
    assert!(matches!(
        billing.add_customer(customer),
        Err(LedgerError::Billing(BillingError::Validation(_)))
    ));
}

// ── Expenses ──

#[test]
fn expense_lifecycle() {
    let mut billing = service();
    let diesel = billing
        .add_expense(Expense::new(period("2024-03"), ExpenseType::Diesel, dec!(120), Currency::Usd))
        .unwrap();
    billing
        .add_expense(Expense::new(
            period("2024-03"),
            ExpenseType::Maintenance,
            dec!(900000),
            Currency::Local,
        ))
        .unwrap();
    billing
        .add_expense(Expense::new(period("2024-04"), ExpenseType::Diesel, dec!(80), Currency::Usd))
        .unwrap();

    let march_diesel = billing.expenses(&ExpenseFilter {
        period: Some(period("2024-03")),
        expense_type: Some(ExpenseType::Diesel),
    });
    assert_eq!(march_diesel.len(), 1);

    let mut updated = billing.expense(&diesel).unwrap();
    updated.amount = dec!(130);
    billing.update_expense(updated).unwrap();
    assert_eq!(billing.expense(&diesel).unwrap().amount, dec!(130));

    billing.delete_expense(&diesel).unwrap();
    assert!(billing.expense(&diesel).is_none());
    assert!(matches!(
        billing.delete_expense(&diesel),
        Err(LedgerError::ExpenseNotFound(_))
    ));
}

#[test]
fn non_positive_expense_is_rejected() {
    let mut billing = service();
    let expense = Expense::new(period("2024-03"), ExpenseType::Other, dec!(0), Currency::Usd)
        .with_label("oil");
    assert!(billing.add_expense(expense).is_err());
    assert!(billing.expenses(&ExpenseFilter::default()).is_empty());
}

// ── Settings ──

#[test]
fn invalid_settings_are_rejected() {
    let bad = Settings {
        exchange_rate: dec!(0),
        ..Settings::default()
    };
    assert!(BillingService::in_memory(bad.clone()).is_err());

    let mut billing = service();
    assert!(billing.update_settings(bad).is_err());
    assert_eq!(billing.settings().exchange_rate, dec!(90000));
}

// ── Reports and snapshots ──

#[cfg(feature = "reports")]
#[test]
fn monthly_report_through_service() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    issue(&mut billing, &id, "2024-03", dec!(250));
    billing
        .add_expense(Expense::new(period("2024-03"), ExpenseType::Diesel, dec!(100), Currency::Usd))
        .unwrap();

    let report = billing.monthly_report(period("2024-03")).unwrap();
    assert_eq!(report.invoice_count, 1);
    assert_eq!(report.net_usd, dec!(18.5));
    assert_eq!(report.net_local, dec!(10665000));
    assert_eq!(report.invoices[0].customer_name.as_deref(), Some("A"));
}

#[cfg(feature = "reports")]
#[test]
fn oversized_expenses_fail_the_report_without_panicking() {
    let mut billing = service();
    for _ in 0..2 {
        billing
            .add_expense(Expense::new(
                period("2024-03"),
                ExpenseType::Diesel,
                rust_decimal::Decimal::MAX,
                Currency::Usd,
            ))
            .unwrap();
    }

    assert!(matches!(
        billing.monthly_report(period("2024-03")),
        Err(LedgerError::Billing(BillingError::Calculation(
            CalculationError::Arithmetic(_)
        )))
    ));
    assert!(billing.monthly_report(period("2024-04")).is_ok());
}

#[cfg(feature = "json")]
#[test]
fn ledger_snapshot_round_trip() {
    let mut billing = service();
    let id = add_customer(&mut billing, "A");
    let invoice = issue(&mut billing, &id, "2024-03", dec!(250));
    billing
        .add_expense(Expense::new(period("2024-03"), ExpenseType::Diesel, dec!(100), Currency::Usd))
        .unwrap();

    let json = billing.into_store().to_json_string().unwrap();
    let store = MemoryLedger::from_json_str(&json).unwrap();
    let restored = BillingService::new(store, Settings::default()).unwrap();

    assert_eq!(restored.invoice(&invoice.number).unwrap(), invoice);
    assert_eq!(restored.customer(&id).unwrap().last_meter_reading, dec!(250));
    assert_eq!(restored.expenses(&ExpenseFilter::default()).len(), 1);
    assert!(validate_invoice(&invoice).is_empty());
}
