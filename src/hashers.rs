use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Length of the embedded-IPv6 token checksum.
pub const CHECKSUM_LEN: usize = 16;

#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

fn mac(key: &[u8], parts: &[&[u8]]) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| CryptoError::Provider(e.to_string()))?;
    for p in parts {
        mac.update(p);
    }
    Ok(mac)
}

/// HMAC-SHA256(key, data), raw 32-byte digest.
///
/// # Errors
///
/// Returns `CryptoError::Provider` if the MAC cannot be keyed.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], CryptoError> {
    let tag = mac(key, &[data])?.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&tag);
    Ok(out)
}

/// Constant-time check of `token` against HMAC-SHA256(key, data).
#[must_use]
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], token: &[u8]) -> bool {
    mac(key, &[data]).is_ok_and(|m| m.verify_slice(token).is_ok())
}

/// Key derivation for the AES ciphers: SHA-256(password) without salt,
/// HMAC-SHA256(key = salt, message = password) with one.
///
/// # Errors
///
/// Returns `CryptoError::Provider` if the MAC cannot be keyed.
pub fn derive_key_sha256(password: &[u8], salt: Option<&[u8]>) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let key = match salt {
        None => sha256(password).to_vec(),
        Some(salt) => hmac_sha256(salt, password)?.to_vec(),
    };
    Ok(Zeroizing::new(key))
}

/// Checksum binding the primary and IPv6 tokens of a v4 signature:
/// first 16 bytes of HMAC-SHA256(key, token || token6).
///
/// # Errors
///
/// Returns `CryptoError::Provider` if the MAC cannot be keyed.
pub fn token_checksum(key: &[u8], token: &[u8], token6: &[u8]) -> Result<[u8; CHECKSUM_LEN], CryptoError> {
    let tag = mac(key, &[token, token6])?.finalize().into_bytes();
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&tag[..CHECKSUM_LEN]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn hmac_rfc4231_case_2() {
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(tag, hex!("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"));
    }

    #[test]
    fn sha256_empty() {
        assert_eq!(sha256(b""), hex!("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"));
    }

    #[test]
    fn verify_hmac_rejects_wrong_token() {
        let tag = hmac_sha256(b"k", b"data").unwrap();
        assert!(verify_hmac_sha256(b"k", b"data", &tag));
        assert!(!verify_hmac_sha256(b"k", b"datA", &tag));
        assert!(!verify_hmac_sha256(b"k", b"data", &tag[..31]));
    }

    #[test]
    fn derive_key_with_and_without_salt() {
        let plain = derive_key_sha256(b"pass", None).unwrap();
        assert_eq!(plain.as_slice(), sha256(b"pass"));
        let salted = derive_key_sha256(b"pass", Some(b"salt")).unwrap();
        assert_eq!(salted.as_slice(), hmac_sha256(b"salt", b"pass").unwrap());
        assert_ne!(plain, salted);
    }

    #[test]
    fn checksum_is_order_sensitive() {
        let a = token_checksum(b"k", b"t4", b"t6").unwrap();
        let b = token_checksum(b"k", b"t6", b"t4").unwrap();
        assert_ne!(a, b);
    }
}
