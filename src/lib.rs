#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! AdScore signature verification.
//!
//! Parses and verifies the signatures AdScore attaches to its anti-fraud
//! verdicts, so that a server can trust a verdict relayed by a browser.
//
// Two wire generations are supported:
//
// - v4: TLV field list, HMAC-SHA256 or asymmetric token per candidate result
// - v5: `version || length || zone || cipher(codec(payload))` envelope
//
// Building blocks are exposed on their own: codec and cipher dispatch by
// frame tag, method-tagged framing, and compact/PEM key transcoding.

pub mod asymmetric;
pub mod cipher;
pub mod codec;
pub mod config;
pub mod errors;
pub mod framing;
pub mod hashers;
pub mod pem;
pub mod signature;
pub mod signature4;
pub mod signature5;
pub mod types;
pub mod verdict;

pub use adscore_primitives::{create_formatter, Base64, Base64Variant, EncodingError, Formatter, Hex};
pub use asymmetric::{create_ec_private_key, public_key_pem, Asymmetric};
pub use cipher::{CipherMethod, SymmetricCipher};
pub use codec::{CodecType, StructCodec};
pub use config::SignatureConfig;
pub use errors::{ConfigError, CryptoError, ErrorKind, FormatError, ParseError, Result, SignatureError, VerifyError};
pub use pem::{compact_pem, expand_pem, CompactKey, KeyType};
pub use signature::{default_formatter, KeyResolver, SignRole, StaticKey};
pub use signature4::Signature4;
pub use signature5::Signature5;
pub use types::{Payload, Value, VerificationOutcome};
pub use verdict::{VerdictEntry, VerdictTable};

pub type Error = SignatureError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
