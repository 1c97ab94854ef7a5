#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Accepted periods must print back to the exact input.
        if let Ok(period) = s.parse::<ishtirak::core::BillingPeriod>() {
            assert_eq!(period.to_string(), s);
            if let Ok(next) = period.next() {
                assert_eq!(next.previous().unwrap(), period);
            }
        }
    }
});
