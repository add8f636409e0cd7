//! AES-256-CBC with PKCS#7 padding (`0x0200`).
//!
//! Frame: `method(2) || iv(16) || ciphertext`. Unauthenticated; integrity of
//! the envelope rests on the surrounding signature.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use tracing::debug;

use super::{random_bytes, CipherMethod, Key, SymmetricCipher};
use crate::errors::{CryptoError, Result};
use crate::framing;
use crate::hashers;

type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

const FIELDS: &[(&str, usize)] = &[("iv", IV_LEN)];

pub(crate) fn check_key(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() == KEY_LEN {
        Ok(())
    } else {
        Err(CryptoError::InvalidKeyLength { expected: KEY_LEN, got: key.len() })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Aes256Cbc;

impl SymmetricCipher for Aes256Cbc {
    fn method(&self) -> u16 {
        CipherMethod::Aes256Cbc.tag()
    }

    fn name(&self) -> &'static str {
        "aes-256-cbc"
    }

    fn frame_fields(&self) -> &'static [(&'static str, usize)] {
        FIELDS
    }

    fn derive_key(&self, password: &[u8], salt: Option<&[u8]>) -> Result<Key> {
        Ok(hashers::derive_key_sha256(password, salt)?)
    }

    fn encrypt(&self, plaintext: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if !aad.is_empty() {
            return Err(CryptoError::AadUnsupported.into());
        }
        check_key(key)?;
        let iv = random_bytes::<IV_LEN>();
        let ct = Encryptor::new_from_slices(key, &iv)
            .map_err(|e| CryptoError::Provider(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
        Ok(framing::frame(self.method(), &[&iv, &ct]))
    }

    fn decrypt(&self, frame: &[u8], key: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let parsed = self.unframe(frame)?;
        if !aad.is_empty() {
            return Err(CryptoError::AadUnsupported.into());
        }
        check_key(key)?;
        Decryptor::new_from_slices(key, parsed.fields.field("iv"))
            .map_err(|e| CryptoError::Provider(e.to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(parsed.data)
            .map_err(|_| {
                debug!(cipher = self.name(), len = parsed.data.len(), "bad padding");
                CryptoError::AuthenticationFailed.into()
            })
    }
}
