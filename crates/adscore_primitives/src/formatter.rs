//! Binary ⇄ ASCII formatters used for signature transport.

use base64::{
    alphabet,
    engine::{general_purpose, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("not a valid base64-encoded value: {0}")]
    InvalidBase64(String),

    #[error("not a valid hexadecimal value: {0}")]
    InvalidHex(String),

    #[error("invalid base64 variant {0}")]
    InvalidVariant(u8),

    #[error("unsupported formatter \"{0}\"")]
    UnsupportedFormatter(String),
}

/// Text encoding of opaque signature bytes.
pub trait Formatter {
    /// Binary to ASCII conversion.
    fn format(&self, value: &[u8]) -> String;

    /// ASCII to binary conversion.
    fn parse(&self, value: &str) -> Result<Vec<u8>, EncodingError>;
}

/// Base64 variants, numbered as libsodium's `SODIUM_BASE64_VARIANT_*`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Base64Variant {
    Original = 1,
    OriginalNoPadding = 3,
    UrlSafe = 5,
    #[default]
    UrlSafeNoPadding = 7,
}

impl TryFrom<u8> for Base64Variant {
    type Error = EncodingError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Original),
            3 => Ok(Self::OriginalNoPadding),
            5 => Ok(Self::UrlSafe),
            7 => Ok(Self::UrlSafeNoPadding),
            other => Err(EncodingError::InvalidVariant(other)),
        }
    }
}

// Decoding accepts either alphabet: URL-safe symbols are mapped onto the standard
// ones first, so one engine with optional padding covers all four variants.
const DECODE_CONFIG: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);
const DECODER: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, DECODE_CONFIG);

/// Base64 formatter.
///
/// In strict mode ASCII whitespace is skipped and any other byte outside the
/// alphabet fails the whole decode; in lenient mode such bytes are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Base64 {
    variant: Base64Variant,
    strict: bool,
}

impl Default for Base64 {
    fn default() -> Self {
        Self::new(Base64Variant::UrlSafeNoPadding, true)
    }
}

impl Base64 {
    #[must_use]
    pub const fn new(variant: Base64Variant, strict: bool) -> Self {
        Self { variant, strict }
    }

    #[must_use]
    pub const fn variant(&self) -> Base64Variant {
        self.variant
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }
}

const fn is_std_symbol(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

impl Formatter for Base64 {
    fn format(&self, value: &[u8]) -> String {
        match self.variant {
            Base64Variant::Original => general_purpose::STANDARD.encode(value),
            Base64Variant::OriginalNoPadding => general_purpose::STANDARD_NO_PAD.encode(value),
            Base64Variant::UrlSafe => general_purpose::URL_SAFE.encode(value),
            Base64Variant::UrlSafeNoPadding => general_purpose::URL_SAFE_NO_PAD.encode(value),
        }
    }

    fn parse(&self, value: &str) -> Result<Vec<u8>, EncodingError> {
        let mapped = value.bytes().map(|b| match b {
            b'-' => b'+',
            b'_' => b'/',
            other => other,
        });
        let input: Vec<u8> = if self.strict {
            mapped.filter(|b| !b.is_ascii_whitespace()).collect()
        } else {
            let mut kept: Vec<u8> = mapped.filter(|b| is_std_symbol(*b)).collect();
            // A single dangling symbol carries no complete byte.
            if kept.len() % 4 == 1 {
                kept.pop();
            }
            kept
        };
        DECODER
            .decode(&input)
            .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
    }
}

/// Lowercase hexadecimal formatter, high nibble first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hex;

impl Formatter for Hex {
    fn format(&self, value: &[u8]) -> String {
        hex::encode(value)
    }

    fn parse(&self, value: &str) -> Result<Vec<u8>, EncodingError> {
        hex::decode(value).map_err(|e| EncodingError::InvalidHex(e.to_string()))
    }
}

/// Resolve a formatter by name.
///
/// `base64` yields the signature default (URL-safe, no padding, strict); the
/// explicit variants are also accepted.
pub fn create_formatter(name: &str) -> Result<Box<dyn Formatter + Send + Sync>, EncodingError> {
    let formatter: Box<dyn Formatter + Send + Sync> = match name.to_ascii_lowercase().as_str() {
        "base64" | "base64-urlsafe-nopad" => Box::new(Base64::default()),
        "base64-urlsafe" => Box::new(Base64::new(Base64Variant::UrlSafe, true)),
        "base64-original" => Box::new(Base64::new(Base64Variant::Original, true)),
        "base64-original-nopad" => Box::new(Base64::new(Base64Variant::OriginalNoPadding, true)),
        "hex" => Box::new(Hex),
        _ => return Err(EncodingError::UnsupportedFormatter(name.to_owned())),
    };
    Ok(formatter)
}
