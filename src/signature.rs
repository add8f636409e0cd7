//! Pieces shared by the v4 and v5 engines.

use core::fmt;
use core::str::FromStr;
use std::net::IpAddr;

use adscore_primitives::Base64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::cipher::Key;
use crate::errors::{ConfigError, Result, VerifyError};
use crate::types::VerificationOutcome;

/// URL-safe, unpadded, strict base64.
#[must_use]
pub fn default_formatter() -> Base64 {
    Base64::default()
}

/// Which party's token a v4 signature is checked against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignRole {
    #[default]
    Customer,
    Master,
}

impl SignRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Master => "master",
        }
    }

    #[must_use]
    pub const fn sign_type_field(self) -> &'static str {
        match self {
            Self::Customer => "customerSignType",
            Self::Master => "masterSignType",
        }
    }

    #[must_use]
    pub const fn token_field(self) -> &'static str {
        match self {
            Self::Customer => "customerToken",
            Self::Master => "masterToken",
        }
    }

    #[must_use]
    pub const fn token6_field(self) -> &'static str {
        match self {
            Self::Customer => "customerToken6",
            Self::Master => "masterToken6",
        }
    }

    #[must_use]
    pub const fn checksum_field(self) -> &'static str {
        match self {
            Self::Customer => "customerChecksum",
            Self::Master => "masterChecksum",
        }
    }
}

impl fmt::Display for SignRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(Self::Customer),
            "master" => Ok(Self::Master),
            _ => Err(ConfigError::Invalid(format!("unknown sign role \"{s}\""))),
        }
    }
}

/// Zone id → decryption key lookup consulted once per v5 parse.
pub trait KeyResolver {
    fn resolve_key(&self, zone_id: i64) -> Option<Key>;
}

impl<F, K> KeyResolver for F
where
    F: Fn(i64) -> Option<K>,
    K: AsRef<[u8]>,
{
    fn resolve_key(&self, zone_id: i64) -> Option<Key> {
        self(zone_id).map(|k| Zeroizing::new(k.as_ref().to_vec()))
    }
}

/// One key for every zone.
#[derive(Clone)]
pub struct StaticKey(Key);

impl StaticKey {
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self(Zeroizing::new(key.as_ref().to_vec()))
    }
}

impl fmt::Debug for StaticKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticKey(..)")
    }
}

impl KeyResolver for StaticKey {
    fn resolve_key(&self, _zone_id: i64) -> Option<Key> {
        Some(self.0.clone())
    }
}

/// Candidate client address; surrounding whitespace is ignored.
pub(crate) fn parse_ip(candidate: &str) -> Option<IpAddr> {
    candidate.trim().parse().ok()
}

/// Text form of an address as the issuer hashes it.
///
/// IPv4-compatible IPv6 addresses (`::a.b.c.d` with a non-zero seventh
/// group) keep the dotted tail that `inet_ntop` prints; every other address
/// uses the standard display.
#[must_use]
pub fn canonical_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V6(v6) => {
            let s = v6.segments();
            if s[..6].iter().all(|g| *g == 0) && s[6] != 0 {
                let [.., a, b, c, d] = v6.octets();
                return format!("::{a}.{b}.{c}.{d}");
            }
            v6.to_string()
        }
        IpAddr::V4(v4) => v4.to_string(),
    }
}

pub(crate) fn result_of(outcome: Option<&VerificationOutcome>) -> Result<i64> {
    outcome.map(|o| o.result).ok_or_else(|| VerifyError::Unverified.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_fields() {
        assert_eq!(SignRole::Customer.token_field(), "customerToken");
        assert_eq!(SignRole::Master.sign_type_field(), "masterSignType");
        assert_eq!("Master".parse::<SignRole>().unwrap(), SignRole::Master);
        assert!("admin".parse::<SignRole>().is_err());
    }

    #[test]
    fn closures_resolve_keys() {
        let resolver = |zone: i64| (zone == 7).then_some(b"k7".to_vec());
        assert_eq!(resolver.resolve_key(7).as_deref().map(Vec::as_slice), Some(&b"k7"[..]));
        assert!(resolver.resolve_key(8).is_none());
        assert_eq!(StaticKey::new("abc").resolve_key(123).unwrap().as_slice(), b"abc");
    }

    #[test]
    fn ip_candidates_are_trimmed() {
        assert_eq!(parse_ip(" 10.0.0.1 "), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(parse_ip("2001:DB8::1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(parse_ip("not an ip"), None);
    }

    #[test]
    fn ipv4_compatible_addresses_keep_dotted_tail() {
        let text = |s: &str| canonical_ip(s.parse().unwrap());
        assert_eq!(text("::a00:1"), "::10.0.0.1");
        assert_eq!(text("::ffff:10.0.0.1"), "::ffff:10.0.0.1");
        assert_eq!(text("::1"), "::1");
        assert_eq!(text("::102"), "::102");
        assert_eq!(text("2001:db8::1"), "2001:db8::1");
        assert_eq!(text("10.0.0.1"), "10.0.0.1");
    }
}
