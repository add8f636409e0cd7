//! Legacy v4 signatures: a TLV field list authenticated by a per-result token.
//!
//! ```text
//! version(1) = 4 || count(1) || field{count}
//! field = id(1) || value
//! ```
//!
//! Value width comes from the field table, or for unknown ids from the top two
//! bits of the id so that newer fields can be skipped correctly.

use std::net::{IpAddr, Ipv6Addr};

use adscore_primitives::{ct_eq, Formatter};
use tracing::{debug, trace};

use crate::asymmetric::Asymmetric;
use crate::config::SignatureConfig;
use crate::errors::{ParseError, Result, VerifyError};
use crate::hashers;
use crate::signature::{self, SignRole};
use crate::types::{Payload, Value, VerificationOutcome, IPV6_SIZE, SIGNATURE4_VERSION};
use crate::verdict::VerdictTable;

/// HMAC-SHA256 token.
pub const HASH_SHA256: i64 = 1;
/// Asymmetric signature over SHA-256.
pub const SIGN_SHA256: i64 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Uchar,
    Ushort,
    Ulong,
    String,
}

impl FieldType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uchar => "uchar",
            Self::Ushort => "ushort",
            Self::Ulong => "ulong",
            Self::String => "string",
        }
    }

    /// Width family encoded in the top two bits of a field id.
    #[must_use]
    pub const fn from_id_bits(id: u8) -> Self {
        match id & 0xC0 {
            0xC0 => Self::String,
            0x80 => Self::Uchar,
            0x40 => Self::Ushort,
            _ => Self::Ulong,
        }
    }
}

const FIELDS: &[(u8, Option<&str>, FieldType)] = &[
    (0x00, Some("requestTime"), FieldType::Ulong),
    (0x01, Some("signatureTime"), FieldType::Ulong),
    (0x10, Some("ipv4"), FieldType::Ulong),
    // Reserved.
    (0x40, None, FieldType::Ushort),
    (0x80, Some("masterSignType"), FieldType::Uchar),
    (0x81, Some("customerSignType"), FieldType::Uchar),
    (0xC0, Some("masterToken"), FieldType::String),
    (0xC1, Some("customerToken"), FieldType::String),
    (0xC2, Some("masterToken6"), FieldType::String),
    (0xC3, Some("customerToken6"), FieldType::String),
    (0xC4, Some("ipv6"), FieldType::String),
    (0xC5, Some("masterChecksum"), FieldType::String),
    (0xC6, Some("customerChecksum"), FieldType::String),
    (0xD0, Some("userAgent"), FieldType::String),
];

/// Registered name and type of a field id.
#[must_use]
pub fn field_definition(id: u8) -> (Option<&'static str>, FieldType) {
    FIELDS
        .iter()
        .find(|(fid, _, _)| *fid == id)
        .map_or((None, FieldType::from_id_bits(id)), |(_, name, kind)| (*name, *kind))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let out = self.buf.get(self.pos..self.pos + n).ok_or(ParseError::TruncatedSignature)?;
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn field(&mut self, kind: FieldType) -> Result<Value, ParseError> {
        Ok(match kind {
            FieldType::Uchar => Value::Int(i64::from(self.u8()?)),
            FieldType::Ushort => Value::Int(i64::from(self.u16()?)),
            FieldType::Ulong => Value::Int(i64::from(self.u32()?)),
            FieldType::String => {
                let mut len = self.u16()?;
                // High bit reserved; only the low byte counts then.
                if len & 0x8000 != 0 {
                    len &= 0xFF;
                }
                Value::Bytes(self.take(usize::from(len))?.to_vec())
            }
        })
    }
}

/// `result \n requestTime \n signatureTime \n ip \n userAgent`
#[must_use]
pub fn hash_base(result: i64, request_time: i64, signature_time: i64, ip: &str, user_agent: &str) -> String {
    format!("{result}\n{request_time}\n{signature_time}\n{ip}\n{user_agent}")
}

/// HMAC-SHA256 keyed by `key`.
pub fn hash_data(data: &[u8], key: &[u8]) -> Result<[u8; 32]> {
    Ok(hashers::hmac_sha256(key, data)?)
}

pub fn sign_data(data: &[u8], private_key: &[u8]) -> Result<Vec<u8>> {
    Asymmetric::default().sign(data, private_key)
}

pub fn verify_data(data: &[u8], signature: &[u8], public_key: &[u8]) -> Result<bool> {
    Asymmetric::default().verify(data, signature, public_key)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signature4 {
    version: u8,
    payload: Payload,
    outcome: Option<VerificationOutcome>,
}

impl Default for Signature4 {
    fn default() -> Self {
        Self::new(Payload::new())
    }
}

impl Signature4 {
    #[must_use]
    pub const fn new(payload: Payload) -> Self {
        Self { version: SIGNATURE4_VERSION, payload, outcome: None }
    }

    /// Decode `signature` with `formatter` and parse the field list.
    ///
    /// # Errors
    ///
    /// `ParseError::InvalidEncoding` if the text does not decode, then as
    /// [`Signature4::from_bytes`].
    pub fn parse(signature: &str, formatter: &dyn Formatter) -> Result<Self> {
        let data = formatter.parse(signature).map_err(ParseError::from)?;
        Self::from_bytes(&data)
    }

    /// Parse raw signature bytes.
    ///
    /// # Errors
    ///
    /// `ParseError::EmptyPayload` for no input, `ParseError::VersionMismatch`
    /// for a version other than 4, `ParseError::TruncatedSignature` when the
    /// input ends inside a field.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(ParseError::EmptyPayload.into());
        }
        let mut r = Reader { buf: data, pos: 0 };
        let version = r.u8()?;
        if version != SIGNATURE4_VERSION {
            debug!(code = 102, version, "rejecting signature");
            return Err(ParseError::VersionMismatch { expected: SIGNATURE4_VERSION, got: version }.into());
        }
        let count = r.u8()?;
        let mut payload = Payload::with_capacity(usize::from(count));
        for i in 0..count {
            let id = r.u8()?;
            let (name, kind) = field_definition(id);
            let name = name.map_or_else(|| format!("{}{i:02x}", kind.name()), str::to_owned);
            trace!(id, field = %name, kind = kind.name(), "v4 field");
            let value = r.field(kind)?;
            payload.insert(name, value);
        }
        Ok(Self { version, payload, outcome: None })
    }

    /// Parse then verify with the default verdict table and customer role.
    ///
    /// # Errors
    ///
    /// See [`Signature4::parse`] and [`Signature4::verify`].
    pub fn create_from_request<I, S>(
        signature: &str,
        ip_addresses: I,
        user_agent: &str,
        key: &[u8],
        formatter: Option<&dyn Formatter>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let default = signature::default_formatter();
        let mut sig = Self::parse(signature, formatter.unwrap_or(&default))?;
        sig.verify(ip_addresses, user_agent, key, SignRole::Customer, &VerdictTable::default())?;
        Ok(sig)
    }

    /// As [`Signature4::create_from_request`], with formatter, role and
    /// verdict table taken from `config`.
    pub fn create_from_request_with_config<I, S>(
        signature: &str,
        ip_addresses: I,
        user_agent: &str,
        key: &[u8],
        config: &SignatureConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let formatter = config.formatter()?;
        let mut sig = Self::parse(signature, &*formatter)?;
        sig.verify(ip_addresses, user_agent, key, config.role, &config.verdict_table())?;
        Ok(sig)
    }

    #[must_use]
    pub const fn version(&self) -> u8 {
        self.version
    }

    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Replace the payload; any previous verification is discarded.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = payload;
        self.outcome = None;
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<&VerificationOutcome> {
        self.outcome.as_ref()
    }

    /// Matched result code.
    ///
    /// # Errors
    ///
    /// `VerifyError::Unverified` before a successful [`Signature4::verify`].
    pub fn result(&self) -> Result<i64> {
        signature::result_of(self.outcome.as_ref())
    }

    fn int_field(&self, name: &'static str) -> Result<i64> {
        self.payload
            .get(name)
            .and_then(Value::as_int)
            .ok_or_else(|| VerifyError::MissingField(name).into())
    }

    fn bytes_field(&self, name: &str) -> Option<&[u8]> {
        self.payload.get(name).and_then(Value::as_bytes)
    }

    /// Search every `(ip, result)` pair, IPs in caller order and results in
    /// table order, for one whose recomputed token matches. First match wins.
    ///
    /// # Errors
    ///
    /// `VerifyError::InvalidRole` if the payload lacks the role's sign type or
    /// token, `VerifyError::UnrecognizedSignType` for a sign type other than 1
    /// or 2, `VerifyError::NoVerdictMatched` if nothing matches.
    pub fn verify<I, S>(
        &mut self,
        ip_addresses: I,
        user_agent: &str,
        key: &[u8],
        role: SignRole,
        results: &VerdictTable,
    ) -> Result<&VerificationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (Some(sign_type), Some(token)) = (
            self.payload.get(role.sign_type_field()).and_then(Value::as_int),
            self.bytes_field(role.token_field()),
        ) else {
            debug!(code = 402, role = role.as_str(), "rejecting signature");
            return Err(VerifyError::InvalidRole.into());
        };
        let request_time = self.int_field("requestTime")?;
        let signature_time = self.int_field("signatureTime")?;
        let token6 = self.bytes_field(role.token6_field());

        for candidate in ip_addresses {
            let Some(ip) = signature::parse_ip(candidate.as_ref()) else {
                trace!("skipping unparseable ip candidate");
                continue;
            };
            let expected = match (ip, token6) {
                (IpAddr::V4(_), _) => token,
                (IpAddr::V6(_), Some(t6)) => t6,
                (IpAddr::V6(_), None) => continue,
            };
            let ip_text = signature::canonical_ip(ip);
            for entry in results.iter() {
                let base = hash_base(entry.code, request_time, signature_time, &ip_text, user_agent);
                let matched = match sign_type {
                    HASH_SHA256 => hashers::verify_hmac_sha256(key, base.as_bytes(), expected),
                    SIGN_SHA256 => verify_data(base.as_bytes(), expected, key)?,
                    other => {
                        debug!(code = 403, sign_type = other, "rejecting signature");
                        return Err(VerifyError::UnrecognizedSignType(other).into());
                    }
                };
                if matched {
                    let embedded_ipv6 = self.embedded_ipv6(entry.code, key, user_agent, role);
                    trace!(result = entry.code, ip = %ip, "v4 token matched");
                    return Ok(self.outcome.insert(VerificationOutcome {
                        result: entry.code,
                        verdict: entry.verdict.clone(),
                        ip,
                        embedded_ipv6,
                    }));
                }
            }
        }
        debug!(code = 410, "rejecting signature");
        Err(VerifyError::NoVerdictMatched.into())
    }

    /// Recover an IPv6 address carried alongside an IPv4 match, if its
    /// checksum and hash token both check out.
    fn embedded_ipv6(&self, result: i64, key: &[u8], user_agent: &str, role: SignRole) -> Option<Ipv6Addr> {
        let raw = self.bytes_field("ipv6").filter(|b| !b.is_empty())?;
        let token = self.bytes_field(role.token_field())?;
        let token6 = self.bytes_field(role.token6_field()).filter(|b| !b.is_empty())?;
        let checksum = self.bytes_field(role.checksum_field())?;
        let sign_type = self.payload.get(role.sign_type_field()).and_then(Value::as_int)?;

        let expected = hashers::token_checksum(key, token, token6).ok()?;
        if !ct_eq(&expected, checksum) {
            trace!("embedded ipv6 checksum mismatch");
            return None;
        }
        let octets: [u8; IPV6_SIZE] = raw.try_into().ok()?;
        let ip = Ipv6Addr::from(octets);
        let base = hash_base(
            result,
            self.int_field("requestTime").ok()?,
            self.int_field("signatureTime").ok()?,
            &signature::canonical_ip(IpAddr::V6(ip)),
            user_agent,
        );
        // Only hash-type tokens carry an embedded address.
        (sign_type == HASH_SHA256 && hashers::verify_hmac_sha256(key, base.as_bytes(), token6)).then_some(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SignatureError;

    fn header(count: u8) -> Vec<u8> {
        vec![SIGNATURE4_VERSION, count]
    }

    #[test]
    fn parses_declared_fields_only() {
        let mut data = header(2);
        data.extend_from_slice(&[0xC1, 0x00, 0x20]);
        data.extend_from_slice(&[0xAB; 32]);
        data.extend_from_slice(&[0x81, 0x01]);
        let sig = Signature4::from_bytes(&data).unwrap();
        assert_eq!(sig.version(), 4);
        assert_eq!(sig.payload().len(), 2);
        assert_eq!(sig.payload()["customerToken"], Value::Bytes(vec![0xAB; 32]));
        assert_eq!(sig.payload()["customerSignType"], Value::Int(1));
    }

    #[test]
    fn unknown_ids_use_width_family() {
        let mut data = header(4);
        data.extend_from_slice(&[0xC9, 0x00, 0x02, b'h', b'i']);
        data.extend_from_slice(&[0x8F, 0x07]);
        data.extend_from_slice(&[0x41, 0x01, 0x02]);
        data.extend_from_slice(&[0x22, 0, 0, 1, 0]);
        let sig = Signature4::from_bytes(&data).unwrap();
        let keys: Vec<&str> = sig.payload().keys().map(String::as_str).collect();
        assert_eq!(keys, ["string00", "uchar01", "ushort02", "ulong03"]);
        assert_eq!(sig.payload()["ushort02"], Value::Int(0x0102));
        assert_eq!(sig.payload()["ulong03"], Value::Int(256));
    }

    #[test]
    fn reserved_id_gets_synthetic_name() {
        let mut data = header(1);
        data.extend_from_slice(&[0x40, 0xFF, 0xFF]);
        let sig = Signature4::from_bytes(&data).unwrap();
        assert_eq!(sig.payload()["ushort00"], Value::Int(0xFFFF));
    }

    #[test]
    fn high_bit_length_masks_to_low_byte() {
        let mut data = header(1);
        data.extend_from_slice(&[0xD0, 0x80, 0x03, b'a', b'b', b'c']);
        let sig = Signature4::from_bytes(&data).unwrap();
        assert_eq!(sig.payload()["userAgent"], Value::from("abc"));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut data = header(1);
        data.extend_from_slice(&[0x81, 0x02, 0xEE, 0xEE]);
        assert_eq!(Signature4::from_bytes(&data).unwrap().payload().len(), 1);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(Signature4::from_bytes(&[]).unwrap_err(), SignatureError::from(ParseError::EmptyPayload));
        assert_eq!(
            Signature4::from_bytes(&[5, 0]).unwrap_err(),
            SignatureError::from(ParseError::VersionMismatch { expected: 4, got: 5 })
        );
        for truncated in [&[4u8][..], &[4, 1], &[4, 1, 0x00, 1, 2], &[4, 1, 0xC0, 0x00, 0x05, b'a']] {
            assert_eq!(
                Signature4::from_bytes(truncated).unwrap_err(),
                SignatureError::from(ParseError::TruncatedSignature),
                "{truncated:?}"
            );
        }
    }

    #[test]
    fn result_requires_verification() {
        let sig = Signature4::default();
        assert_eq!(sig.result().unwrap_err(), SignatureError::from(VerifyError::Unverified));
    }

    #[test]
    fn hash_base_layout() {
        assert_eq!(hash_base(9, 1, 2, "::1", "UA"), "9\n1\n2\n::1\nUA");
    }
}
