//! XSalsa20-Poly1305 secretbox (`0x0101`).
//!
//! Frame: `method(2) || nonce(24) || mac(16) || ciphertext`, the mac leading
//! the ciphertext as in NaCl's combined box.

use argon2::{Algorithm, Argon2, Params, Version};
use crypto_secretbox::aead::generic_array::GenericArray;
use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use tracing::debug;
use zeroize::Zeroizing;

use super::cbc::check_key;
use super::{random_bytes, CipherMethod, Key, SymmetricCipher};
use crate::errors::{CryptoError, Result};
use crate::framing;
use crate::hashers;

pub const NONCE_LEN: usize = 24;
pub const MAC_LEN: usize = 16;
pub const SALT_LEN: usize = 16;

/// Interactive Argon2id cost: 64 MiB, two passes.
pub const DEFAULT_MEMORY_KIB: u32 = 65_536;
pub const DEFAULT_ITERATIONS: u32 = 2;

const FIELDS: &[(&str, usize)] = &[("nonce", NONCE_LEN), ("mac", MAC_LEN)];

#[derive(Clone, Copy, Debug)]
pub struct Secretbox {
    memory_kib: u32,
    iterations: u32,
}

impl Default for Secretbox {
    fn default() -> Self {
        Self::with_cost(DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS)
    }
}

impl Secretbox {
    /// Engine with a non-default Argon2id cost. Both sides of a password
    /// exchange must agree on it.
    #[must_use]
    pub const fn with_cost(memory_kib: u32, iterations: u32) -> Self {
        Self { memory_kib, iterations }
    }

    fn engine(key: &[u8]) -> Result<XSalsa20Poly1305> {
        check_key(key)?;
        Ok(XSalsa20Poly1305::new_from_slice(key).map_err(|e| CryptoError::Provider(e.to_string()))?)
    }
}

/// Repeat the salt until it covers [`SALT_LEN`], then cut it there.
fn stretch_salt(salt: &[u8]) -> Result<[u8; SALT_LEN], CryptoError> {
    if salt.is_empty() {
        return Err(CryptoError::InvalidKey("empty salt"));
    }
    let mut out = [0u8; SALT_LEN];
    for (dst, src) in out.iter_mut().zip(salt.iter().cycle()) {
        *dst = *src;
    }
    Ok(out)
}

impl SymmetricCipher for Secretbox {
    fn method(&self) -> u16 {
        CipherMethod::Secretbox.tag()
    }

    fn name(&self) -> &'static str {
        "xsalsa20poly1305"
    }

    fn frame_fields(&self) -> &'static [(&'static str, usize)] {
        FIELDS
    }

    fn derive_key(&self, password: &[u8], salt: Option<&[u8]>) -> Result<Key> {
        let Some(salt) = salt else {
            return Ok(Zeroizing::new(hashers::sha256(password).to_vec()));
        };
        let salt = stretch_salt(salt)?;
        let params = Params::new(self.memory_kib, self.iterations, 1, Some(32))
            .map_err(|e| CryptoError::Provider(e.to_string()))?;
        let mut key = Zeroizing::new(vec![0u8; 32]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(password, &salt, &mut key)
            .map_err(|e| CryptoError::Provider(e.to_string()))?;
        Ok(key)
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if !aad.is_empty() {
            return Err(CryptoError::AadUnsupported.into());
        }
        let cipher = Self::engine(key)?;
        let nonce = random_bytes::<NONCE_LEN>();
        let mut body = plaintext.to_vec();
        let mac = cipher
            .encrypt_in_place_detached(GenericArray::from_slice(&nonce), &[], &mut body)
            .map_err(|_| CryptoError::Provider("secretbox seal failed".into()))?;
        Ok(framing::frame(self.method(), &[&nonce, &mac, &body]))
    }

    fn decrypt(&self, frame: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let parsed = self.unframe(frame)?;
        if !aad.is_empty() {
            return Err(CryptoError::AadUnsupported.into());
        }
        let cipher = Self::engine(key)?;
        let mut body = parsed.data.to_vec();
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(parsed.fields.field("nonce")),
                &[],
                &mut body,
                GenericArray::from_slice(parsed.fields.field("mac")),
            )
            .map_err(|_| {
                debug!(cipher = self.name(), len = parsed.data.len(), "mac check failed");
                CryptoError::AuthenticationFailed
            })?;
        Ok(body)
    }
}
