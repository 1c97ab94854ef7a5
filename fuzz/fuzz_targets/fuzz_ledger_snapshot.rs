#![no_main]

use ishtirak::core::validate_invoice;
use ishtirak::ledger::{LedgerStore, MemoryLedger};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Arbitrary snapshots may hold inconsistent invoices; validating them
        // must report errors, never panic.
        if let Ok(ledger) = MemoryLedger::from_json_str(s) {
            for invoice in ledger.invoices() {
                let _ = validate_invoice(&invoice);
            }
        }
    }
});
