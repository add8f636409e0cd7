#![no_main]

use adscore_signature::{Signature5, StaticKey};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let key = StaticKey::new([0u8; 32]);
    if let Ok(mut sig) = Signature5::from_bytes(data, &key) {
        let _ = sig.verify(["10.0.0.1"], "fuzz");
    }
});
