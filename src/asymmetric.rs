//! Asymmetric sign/verify for v4 `signType = 2` tokens.
//!
//! Keys are accepted as PEM text or in the compact form of [`crate::pem`].
//! The digest is SHA-256; Ed25519 hashes internally and ignores it.

use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rand_core::OsRng;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use crate::errors::{ConfigError, CryptoError, Result};
use crate::pem::{self, CompactKey, KeyType};

const SUPPORTED_DIGEST: &str = "sha256";

/// SHA-256 signature scheme over whichever key algorithm the key names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Asymmetric;

impl Asymmetric {
    /// # Errors
    ///
    /// `ConfigError::UnsupportedAlgorithm` for anything but `sha256`.
    pub fn new(digest: &str) -> Result<Self> {
        if digest.eq_ignore_ascii_case(SUPPORTED_DIGEST) {
            Ok(Self)
        } else {
            Err(ConfigError::UnsupportedAlgorithm(digest.to_owned()).into())
        }
    }

    /// `Ok(false)` for a well-formed key that does not verify `signature`.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKey` if `public_key` is not a supported public key.
    pub fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
        let key = PublicKey::from_compact(&pem::load_key(public_key)?)?;
        Ok(key.verify(data, signature))
    }

    /// # Errors
    ///
    /// `CryptoError::InvalidKey` if `private_key` is not a supported private
    /// key, `CryptoError::Provider` if signing fails.
    pub fn sign(&self, data: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
        let key = PrivateKey::from_compact(&pem::load_key(private_key)?)?;
        Ok(key.sign(data)?)
    }
}

/// Fresh EC private key in compact form.
///
/// # Errors
///
/// `ConfigError::UnsupportedCurve` for curves other than P-256 and secp256k1.
pub fn create_ec_private_key(curve: &str) -> Result<Zeroizing<Vec<u8>>> {
    let der = match curve.to_ascii_lowercase().as_str() {
        "prime256v1" | "secp256r1" | "p-256" => p256::SecretKey::random(&mut OsRng).to_sec1_der(),
        "secp256k1" => k256::SecretKey::random(&mut OsRng).to_sec1_der(),
        _ => return Err(ConfigError::UnsupportedCurve(curve.to_owned()).into()),
    }
    .map_err(|e| CryptoError::Provider(e.to_string()))?;
    Ok(Zeroizing::new(CompactKey::new(KeyType::EcPrivate, der.to_vec()).to_bytes()))
}

/// SPKI PEM of the public half of a private key.
///
/// # Errors
///
/// `CryptoError::InvalidKey` if `private_key` is not a supported private key.
pub fn public_key_pem(private_key: &[u8]) -> Result<String> {
    PrivateKey::from_compact(&pem::load_key(private_key)?)?.public_key_pem()
}

fn provider(e: impl core::fmt::Display) -> CryptoError {
    CryptoError::Provider(e.to_string())
}

enum PublicKey {
    P256(p256::ecdsa::VerifyingKey),
    K256(k256::ecdsa::VerifyingKey),
    Ed25519(ed25519_dalek::VerifyingKey),
    Rsa(rsa::pkcs1v15::VerifyingKey<Sha256>),
}

impl PublicKey {
    fn from_compact(key: &CompactKey) -> Result<Self, CryptoError> {
        if key.kind() != &KeyType::Public {
            return Err(CryptoError::InvalidKey("expected a public key"));
        }
        let der = key.der();
        if let Ok(pk) = p256::PublicKey::from_public_key_der(der) {
            return Ok(Self::P256(pk.into()));
        }
        if let Ok(pk) = k256::PublicKey::from_public_key_der(der) {
            return Ok(Self::K256(pk.into()));
        }
        if let Ok(vk) = ed25519_dalek::VerifyingKey::from_public_key_der(der) {
            return Ok(Self::Ed25519(vk));
        }
        if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(der) {
            return Ok(Self::Rsa(rsa::pkcs1v15::VerifyingKey::new(pk)));
        }
        debug!(len = der.len(), "unsupported public key algorithm");
        Err(CryptoError::InvalidKey("unsupported public key algorithm"))
    }

    fn verify(&self, data: &[u8], sig: &[u8]) -> bool {
        match self {
            // DER or fixed-width r||s, high-S folded to low-S.
            Self::P256(vk) => p256::ecdsa::Signature::from_der(sig)
                .or_else(|_| p256::ecdsa::Signature::from_slice(sig))
                .map(|s| s.normalize_s().unwrap_or(s))
                .is_ok_and(|s| vk.verify(data, &s).is_ok()),
            Self::K256(vk) => k256::ecdsa::Signature::from_der(sig)
                .or_else(|_| k256::ecdsa::Signature::from_slice(sig))
                .map(|s| s.normalize_s().unwrap_or(s))
                .is_ok_and(|s| vk.verify(data, &s).is_ok()),
            Self::Ed25519(vk) => ed25519_dalek::Signature::from_slice(sig).is_ok_and(|s| vk.verify(data, &s).is_ok()),
            Self::Rsa(vk) => rsa::pkcs1v15::Signature::try_from(sig).is_ok_and(|s| vk.verify(data, &s).is_ok()),
        }
    }
}

enum PrivateKey {
    P256(p256::SecretKey),
    K256(k256::SecretKey),
    Ed25519(ed25519_dalek::SigningKey),
    Rsa(Box<rsa::RsaPrivateKey>),
}

impl PrivateKey {
    fn from_compact(key: &CompactKey) -> Result<Self, CryptoError> {
        let der = key.der();
        let parsed = match key.kind() {
            KeyType::EcPrivate => p256::SecretKey::from_sec1_der(der)
                .map(Self::P256)
                .or_else(|_| k256::SecretKey::from_sec1_der(der).map(Self::K256))
                .ok(),
            KeyType::RsaPrivate => rsa::RsaPrivateKey::from_pkcs1_der(der).map(|k| Self::Rsa(Box::new(k))).ok(),
            KeyType::Custom(label) if label == "PRIVATE KEY" => Self::from_pkcs8(der),
            _ => return Err(CryptoError::InvalidKey("expected a private key")),
        };
        parsed.ok_or_else(|| {
            debug!(code = key.kind().code(), len = der.len(), "undecodable private key");
            CryptoError::InvalidKey("undecodable private key")
        })
    }

    fn from_pkcs8(der: &[u8]) -> Option<Self> {
        if let Ok(k) = p256::SecretKey::from_pkcs8_der(der) {
            return Some(Self::P256(k));
        }
        if let Ok(k) = k256::SecretKey::from_pkcs8_der(der) {
            return Some(Self::K256(k));
        }
        if let Ok(k) = ed25519_dalek::SigningKey::from_pkcs8_der(der) {
            return Some(Self::Ed25519(k));
        }
        rsa::RsaPrivateKey::from_pkcs8_der(der).ok().map(|k| Self::Rsa(Box::new(k)))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(match self {
            Self::P256(k) => {
                let sig: p256::ecdsa::Signature = p256::ecdsa::SigningKey::from(k).try_sign(data).map_err(provider)?;
                sig.to_der().as_bytes().to_vec()
            }
            Self::K256(k) => {
                let sig: k256::ecdsa::Signature = k256::ecdsa::SigningKey::from(k).try_sign(data).map_err(provider)?;
                sig.to_der().as_bytes().to_vec()
            }
            Self::Ed25519(k) => k.try_sign(data).map_err(provider)?.to_bytes().to_vec(),
            Self::Rsa(k) => rsa::pkcs1v15::SigningKey::<Sha256>::new(k.as_ref().clone())
                .try_sign(data)
                .map_err(provider)?
                .to_vec(),
        })
    }

    fn public_key_pem(&self) -> Result<String> {
        let pem = match self {
            Self::P256(k) => k.public_key().to_public_key_pem(LineEnding::LF),
            Self::K256(k) => k.public_key().to_public_key_pem(LineEnding::LF),
            Self::Ed25519(k) => k.verifying_key().to_public_key_pem(LineEnding::LF),
            Self::Rsa(k) => k.to_public_key().to_public_key_pem(LineEnding::LF),
        };
        Ok(pem.map_err(provider)?)
    }
}
