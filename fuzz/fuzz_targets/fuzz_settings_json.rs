#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Must not panic. Settings that pass validation must round-trip.
        if let Ok(settings) = ishtirak::core::Settings::from_json_str(s) {
            let json = settings.to_json_string().unwrap();
            let again = ishtirak::core::Settings::from_json_str(&json).unwrap();
            assert_eq!(settings, again);
        }
    }
});
