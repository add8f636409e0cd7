//! AES-256-GCM (`0x0201`).
//!
//! Frame: `method(2) || iv(12) || tag(16) || ciphertext`.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm as Engine, Nonce};
use tracing::debug;

use super::cbc::check_key;
use super::{random_bytes, CipherMethod, Key, SymmetricCipher};
use crate::errors::{CryptoError, Result};
use crate::framing;
use crate::hashers;

pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

const FIELDS: &[(&str, usize)] = &[("iv", IV_LEN), ("tag", TAG_LEN)];

#[derive(Clone, Copy, Debug, Default)]
pub struct Aes256Gcm;

fn engine(key: &[u8]) -> Result<Engine> {
    check_key(key)?;
    Ok(Engine::new_from_slice(key).map_err(|e| CryptoError::Provider(e.to_string()))?)
}

impl SymmetricCipher for Aes256Gcm {
    fn method(&self) -> u16 {
        CipherMethod::Aes256Gcm.tag()
    }

    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn frame_fields(&self) -> &'static [(&'static str, usize)] {
        FIELDS
    }

    fn derive_key(&self, password: &[u8], salt: Option<&[u8]>) -> Result<Key> {
        Ok(hashers::derive_key_sha256(password, salt)?)
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = engine(key)?;
        let iv = random_bytes::<IV_LEN>();
        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
            .map_err(|_| CryptoError::Provider("aes-gcm seal failed".into()))?;
        // aead appends the tag; the wire carries it ahead of the ciphertext.
        let (ct, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(framing::frame(self.method(), &[&iv, tag, ct]))
    }

    fn decrypt(&self, frame: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let parsed = self.unframe(frame)?;
        let cipher = engine(key)?;
        let mut sealed = Vec::with_capacity(parsed.data.len() + TAG_LEN);
        sealed.extend_from_slice(parsed.data);
        sealed.extend_from_slice(parsed.fields.field("tag"));
        cipher
            .decrypt(Nonce::from_slice(parsed.fields.field("iv")), Payload { msg: &sealed, aad })
            .map_err(|_| {
                debug!(cipher = self.name(), len = parsed.data.len(), "tag check failed");
                CryptoError::AuthenticationFailed.into()
            })
    }
}
