#![no_main]

use adscore_signature::{compact_pem, expand_pem};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whatever expands and compacts again must expand to the same text.
    if let Ok(text) = expand_pem(data, 64) {
        if let Ok(compact) = compact_pem(&text) {
            if !data.starts_with(b"-----BEGIN ") {
                assert_eq!(expand_pem(&compact, 64).ok().as_deref(), Some(text.as_str()));
            }
        }
    }
});
