#![no_main]

use adscore_signature::{SignRole, Signature4, VerdictTable};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse, then drive verification over whatever fields survived.
    if let Ok(mut sig) = Signature4::from_bytes(data) {
        let _ = sig.verify(["10.0.0.1", "::1"], "fuzz", b"key", SignRole::Customer, &VerdictTable::default());
    }
});
