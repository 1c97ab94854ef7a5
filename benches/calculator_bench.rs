use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal_macros::dec;

use ishtirak::core::*;
use ishtirak::ledger::*;

fn period() -> BillingPeriod {
    BillingPeriod::new(2024, 3).unwrap()
}

fn extras() -> Vec<Extra> {
    (0..10)
        .map(|i| Extra::new(format!("extra {i}"), dec!(1.25)))
        .collect()
}

fn bench_calculate(c: &mut Criterion) {
    let extras = extras();
    let mut group = c.benchmark_group("calculate");

    for mode in [PricingMode::Usd, PricingMode::Local, PricingMode::Dual] {
        let input = CalculationInput {
            meter_previous: dec!(10432.5),
            meter_current: dec!(10867.25),
            pricing_mode: mode,
            price_per_kwh_usd: Some(dec!(0.45)),
            price_per_kwh_local: Some(dec!(40000)),
            fixed_fee: dec!(6),
            extras: &extras,
            discount: dec!(0),
            exchange_rate: dec!(89500),
            rounding_unit: 1000,
        };
        group.bench_function(mode.to_string(), |b| {
            b.iter(|| calculate(black_box(&input)).unwrap())
        });
    }
    group.finish();
}

fn bench_build_and_validate(c: &mut Criterion) {
    let settings = Settings::default();
    let draft = InvoiceBuilder::new(CustomerId::new(), period())
        .meter_previous(dec!(1000))
        .meter_current(dec!(1250))
        .pricing_mode(PricingMode::Dual)
        .price_per_kwh_usd(dec!(0.45))
        .price_per_kwh_local(dec!(40000))
        .fixed_fee(dec!(6))
        .add_extra("صيانة", dec!(2));

    c.bench_function("build_invoice", |b| {
        b.iter(|| draft.clone().build(black_box("INV-2024-03-001"), &settings).unwrap())
    });

    let invoice = draft.build("INV-2024-03-001", &settings).unwrap();
    c.bench_function("validate_invoice", |b| {
        b.iter(|| validate_invoice(black_box(&invoice)))
    });
}

fn bench_issue_month(c: &mut Criterion) {
    c.bench_function("issue_200_invoices", |b| {
        b.iter(|| {
            let mut billing = BillingService::in_memory(Settings::default()).unwrap();
            for i in 0..200 {
                let customer = billing.new_customer(format!("Customer {i}")).build().unwrap();
                let id = billing.add_customer(customer).unwrap();
                let draft = billing
                    .draft_invoice(&id, period())
                    .unwrap()
                    .meter_current(dec!(300));
                billing.issue_invoice(draft).unwrap();
            }
            black_box(billing.monthly_report(period()).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_calculate,
    bench_build_and_validate,
    bench_issue_month
);
criterion_main!(benches);
