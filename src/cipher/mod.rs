//! Symmetric cipher engines for v5 payloads.
//!
//! Every cipher frame is `LE16(method) || fixed fields || ciphertext`; the
//! fixed fields (IV, nonce, tag) are declared per engine and sliced by
//! [`crate::framing::unframe`].

use core::str::FromStr;

use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::errors::{FormatError, ParseError, Result};
use crate::framing::{self, Unframed};

pub mod cbc;
pub mod gcm;
pub mod secretbox;

pub use self::cbc::Aes256Cbc;
pub use self::gcm::Aes256Gcm;
pub use self::secretbox::Secretbox;

/// Derived symmetric key; wiped on drop.
pub type Key = Zeroizing<Vec<u8>>;

/// Capability contract shared by every cipher engine.
pub trait SymmetricCipher {
    fn method(&self) -> u16;

    fn name(&self) -> &'static str;

    /// Declared fixed-length frame fields, in wire order.
    fn frame_fields(&self) -> &'static [(&'static str, usize)];

    /// Derive a key from a password. Without a salt the derivation is a plain
    /// one-way hash; recipients should insist on a salt.
    fn derive_key(&self, password: &[u8], salt: Option<&[u8]>) -> Result<Key>;

    /// Encrypt under a fresh random IV/nonce and return the full frame.
    fn encrypt(&self, plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Parse a frame produced by [`SymmetricCipher::encrypt`] and decrypt it.
    fn decrypt(&self, frame: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    fn encrypt_with_password(&self, plaintext: &[u8], password: &[u8], salt: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = self.derive_key(password, salt)?;
        self.encrypt(plaintext, &key, &[])
    }

    fn decrypt_with_password(&self, frame: &[u8], password: &[u8], salt: Option<&[u8]>) -> Result<Vec<u8>> {
        let key = self.derive_key(password, salt)?;
        self.decrypt(frame, &key, &[])
    }

    /// Slice a frame by the declared fields and check the method tag.
    fn unframe<'a>(&self, frame: &'a [u8]) -> Result<Unframed<'a>> {
        let parsed = framing::unframe(frame, self.frame_fields())?;
        if parsed.method != self.method() {
            return Err(FormatError::TagMismatch { expected: self.method(), got: parsed.method }.into());
        }
        Ok(parsed)
    }
}

pub type BoxedCipher = Box<dyn SymmetricCipher + Send + Sync>;

/// Known method tags (little-endian on the wire).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CipherMethod {
    Secretbox = 0x0101,
    Aes256Cbc = 0x0200,
    Aes256Gcm = 0x0201,
}

impl CipherMethod {
    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Result<Self, FormatError> {
        match tag {
            0x0101 => Ok(Self::Secretbox),
            0x0200 => Ok(Self::Aes256Cbc),
            0x0201 => Ok(Self::Aes256Gcm),
            other => Err(FormatError::UnsupportedCipher(format!("{other:#06x}"))),
        }
    }

    #[must_use]
    pub fn create(self) -> BoxedCipher {
        match self {
            Self::Secretbox => Box::new(Secretbox::default()),
            Self::Aes256Cbc => Box::new(Aes256Cbc),
            Self::Aes256Gcm => Box::new(Aes256Gcm),
        }
    }
}

impl FromStr for CipherMethod {
    type Err = FormatError;

    /// A two-byte string is a raw little-endian tag; anything longer is a
    /// case-insensitive engine or algorithm name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let [lo, hi] = s.as_bytes() {
            return Self::from_tag(u16::from_le_bytes([*lo, *hi]));
        }
        match s.to_ascii_lowercase().as_str() {
            "secretbox" | "xsalsa20poly1305" => Ok(Self::Secretbox),
            "openssl" | "aes-256-cbc" => Ok(Self::Aes256Cbc),
            "opensslaead" | "aes-256-gcm" => Ok(Self::Aes256Gcm),
            _ => Err(FormatError::UnsupportedCipher(s.to_owned())),
        }
    }
}

pub fn resolve(name: &str) -> Result<BoxedCipher> {
    Ok(name.parse::<CipherMethod>()?.create())
}

pub fn resolve_by_tag(tag: u16) -> Result<BoxedCipher> {
    Ok(CipherMethod::from_tag(tag)?.create())
}

/// Resolve the engine named by the first two bytes of `payload`.
pub fn resolve_from_payload(payload: &[u8]) -> Result<BoxedCipher> {
    let tag = framing::peek_method(payload).ok_or(ParseError::TruncatedPayload {
        needed: framing::METHOD_SIZE,
        got: payload.len(),
    })?;
    resolve_by_tag(tag)
}

pub(crate) fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}
