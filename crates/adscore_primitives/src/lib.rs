#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! AdScore signature primitives: text encodings and constant-time helpers.
//
// Shared by the v4 and v5 signature engines:
//
// - Base64 (standard / URL-safe, padded / unpadded, strict / lenient) and hex
// - Name-based formatter factory
// - Constant-time equality and byte-prefix comparison

use subtle::ConstantTimeEq;

pub mod formatter;

pub use formatter::{create_formatter, Base64, Base64Variant, EncodingError, Formatter, Hex};

/// Constant-time equality of two byte strings.
///
/// Length is not secret: strings of different length compare unequal immediately.
#[must_use]
pub fn ct_eq(known: &[u8], user: &[u8]) -> bool {
    known.ct_eq(user).into()
}

/// Compare the first `n` bytes of two byte strings for exact equality.
///
/// Returns `false` if either string is shorter than `n`. A zero-length prefix
/// always compares equal.
#[must_use]
pub fn bytes_equal_prefix(known: &[u8], user: &[u8], n: usize) -> bool {
    if known.len() < n || user.len() < n {
        return false;
    }
    ct_eq(&known[..n], &user[..n])
}
