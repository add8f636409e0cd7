use core::fmt;
use indexmap::IndexMap;
use std::net::{IpAddr, Ipv6Addr};

pub const SIGNATURE4_VERSION: u8 = 4;
pub const SIGNATURE5_VERSION: u8 = 5;
pub const SIGNATURE5_HEADER_LEN: usize = 1 + 2 + 8; // version || length || zone id
pub const IPV4_SIZE: usize = 4;
pub const IPV6_SIZE: usize = 16;

/// Ordered field name → value mapping carried by a signature.
pub type Payload = IndexMap<String, Value>;

/// A decoded payload value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Payload),
}

impl Value {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Integer view. Decimal byte strings are accepted because some codecs
    /// (form-urlencoded) do not preserve types.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bytes(b) => core::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| core::str::from_utf8(b).ok())
    }

    #[must_use]
    pub const fn as_map(&self) -> Option<&Payload> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Empty-ish in the sense of "carries nothing usable": null, false, zero,
    /// or an empty string/collection.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::Float(f) => *f == 0.0,
            Self::Bytes(b) => b.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::Map(m) => m.is_empty(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Bytes(v.into_bytes())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<Payload> for Value {
    fn from(v: Payload) -> Self {
        Self::Map(v)
    }
}

/// Successful verification result. Absence of an outcome means rejection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub result: i64,
    pub verdict: Option<String>,
    pub ip: IpAddr,
    pub embedded_ipv6: Option<Ipv6Addr>,
}

impl VerificationOutcome {
    #[must_use]
    pub const fn ip_version(&self) -> u8 {
        match self.ip {
            IpAddr::V4(_) => 4,
            IpAddr::V6(_) => 6,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "result={} verdict={} ipv{}.ip={}",
            self.result,
            self.verdict.as_deref().unwrap_or("-"),
            self.ip_version(),
            self.ip
        )
    }
}
