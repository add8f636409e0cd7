//! v5 signatures: an 11-byte header around a cipher frame holding a codec
//! frame.
//!
//! ```text
//! version(1) = 5 || length(2, BE) || zone_id(8, BE) || cipher frame(length)
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use adscore_primitives::{bytes_equal_prefix, Formatter};
use tracing::{debug, trace};

use crate::cipher::{self, SymmetricCipher};
use crate::codec::{self, StructCodec};
use crate::config::SignatureConfig;
use crate::errors::{FormatError, ParseError, Result, VerifyError};
use crate::framing;
use crate::signature::{self, KeyResolver};
use crate::types::{Payload, Value, VerificationOutcome, IPV4_SIZE, IPV6_SIZE, SIGNATURE5_HEADER_LEN, SIGNATURE5_VERSION};
use crate::verdict::VerdictTable;

const HEADER_FIELDS: &[(&str, usize)] = &[("version", 1), ("length", 2), ("zone_id", 8)];

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signature5 {
    zone_id: Option<i64>,
    payload: Payload,
    outcome: Option<VerificationOutcome>,
}

/// Decrypt a cipher frame, then decode the codec frame inside it.
fn decrypt_payload(frame: &[u8], key: &[u8]) -> Result<Payload> {
    let cipher = cipher::resolve_from_payload(frame)?;
    let plaintext = cipher.decrypt(frame, key, &[])?;
    let codec = codec::resolve_from_payload(&plaintext)?;
    trace!(cipher = cipher.name(), codec = codec.name(), "v5 payload");
    match codec.decode(&plaintext)? {
        Value::Map(m) => Ok(m),
        other => Err(ParseError::UnexpectedPayloadType(other.type_name()).into()),
    }
}

/// Prefix length from a `*.v` field, or the full address size. Values that
/// are not a non-negative integer fall back to the full size.
fn prefix_len(payload: &Payload, field: &str, full: usize) -> usize {
    payload
        .get(field)
        .and_then(Value::as_int)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(full)
}

impl Signature5 {
    #[must_use]
    pub const fn new(zone_id: Option<i64>, payload: Payload) -> Self {
        Self { zone_id, payload, outcome: None }
    }

    /// Decode `signature` with `formatter`, then as [`Signature5::from_bytes`].
    ///
    /// # Errors
    ///
    /// `ParseError::InvalidEncoding` if the text does not decode.
    pub fn parse<R: KeyResolver + ?Sized>(signature: &str, resolver: &R, formatter: &dyn Formatter) -> Result<Self> {
        let data = formatter.parse(signature)?;
        Self::from_bytes(&data, resolver)
    }

    /// Parse the envelope, look up the zone key and decrypt the payload.
    ///
    /// # Errors
    ///
    /// `ParseError::MalformedSignature` if there is nothing past the header,
    /// `ParseError::VersionMismatch` for a version other than 5,
    /// `ParseError::TruncatedPayload` when fewer than `length` bytes follow the
    /// header, `VerifyError::KeyNotFound` when the resolver has no key, then
    /// any cipher or codec error.
    pub fn from_bytes<R: KeyResolver + ?Sized>(data: &[u8], resolver: &R) -> Result<Self> {
        if data.len() <= SIGNATURE5_HEADER_LEN {
            debug!(code = 101, len = data.len(), "rejecting signature");
            return Err(ParseError::MalformedSignature.into());
        }
        let (header, body) = framing::split_fields(data, HEADER_FIELDS)?;
        let version = header.field("version")[0];
        if version != SIGNATURE5_VERSION {
            debug!(code = 102, version, "rejecting signature");
            return Err(ParseError::VersionMismatch { expected: SIGNATURE5_VERSION, got: version }.into());
        }
        let length = match header.field("length") {
            [hi, lo] => usize::from(u16::from_be_bytes([*hi, *lo])),
            _ => return Err(ParseError::MalformedSignature.into()),
        };
        let zone_id = i64::from_be_bytes(header.field("zone_id").try_into().map_err(|_| ParseError::MalformedSignature)?);
        let Some(frame) = body.get(..length) else {
            debug!(code = 103, needed = length, got = body.len(), "rejecting signature");
            return Err(ParseError::TruncatedPayload { needed: length, got: body.len() }.into());
        };
        let key = resolver.resolve_key(zone_id).ok_or(VerifyError::KeyNotFound(zone_id))?;
        let payload = decrypt_payload(frame, &key)?;
        Ok(Self { zone_id: Some(zone_id), payload, outcome: None })
    }

    /// Parse then verify.
    ///
    /// # Errors
    ///
    /// See [`Signature5::parse`] and [`Signature5::verify`].
    pub fn create_from_request<I, S, R>(
        signature: &str,
        ip_addresses: I,
        user_agent: &str,
        resolver: &R,
        formatter: Option<&dyn Formatter>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: KeyResolver + ?Sized,
    {
        let default = signature::default_formatter();
        let mut sig = Self::parse(signature, resolver, formatter.unwrap_or(&default))?;
        sig.verify(ip_addresses, user_agent)?;
        Ok(sig)
    }

    /// As [`Signature5::create_from_request`], with the formatter and verdict
    /// labels taken from `config`.
    pub fn create_from_request_with_config<I, S, R>(
        signature: &str,
        ip_addresses: I,
        user_agent: &str,
        resolver: &R,
        config: &SignatureConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: KeyResolver + ?Sized,
    {
        let formatter = config.formatter()?;
        let mut sig = Self::parse(signature, resolver, &*formatter)?;
        sig.verify_with_results(ip_addresses, user_agent, &config.verdict_table())?;
        Ok(sig)
    }

    #[must_use]
    pub const fn zone_id(&self) -> Option<i64> {
        self.zone_id
    }

    pub fn set_zone_id(&mut self, zone_id: i64) {
        self.zone_id = Some(zone_id);
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

    /// # Errors
    ///
    /// `VerifyError::Unverified` before a successful [`Signature5::verify`].
    pub fn result(&self) -> Result<i64> {
        signature::result_of(self.outcome.as_ref())
    }

    /// Match a client IP against the stored (possibly coarsened) address and
    /// check the user agent. Verdict labels come from the default table.
    ///
    /// # Errors
    ///
    /// `VerifyError::IpMismatch`, `VerifyError::MissingUserAgent`,
    /// `VerifyError::UserAgentMismatch`, or `VerifyError::MissingField` when
    /// the payload has no integer `result`.
    pub fn verify<I, S>(&mut self, ip_addresses: I, user_agent: &str) -> Result<&VerificationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.verify_with_results(ip_addresses, user_agent, &VerdictTable::default())
    }

    pub fn verify_with_results<I, S>(
        &mut self,
        ip_addresses: I,
        user_agent: &str,
        results: &VerdictTable,
    ) -> Result<&VerificationOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let p = &self.payload;
        let stored4 = p.get("ipv4.ip").and_then(Value::as_str).and_then(|s| s.trim().parse::<Ipv4Addr>().ok());
        let stored6 = p.get("ipv6.ip").and_then(Value::as_str).and_then(|s| s.trim().parse::<Ipv6Addr>().ok());
        let n4 = prefix_len(p, "ipv4.v", IPV4_SIZE);
        let n6 = prefix_len(p, "ipv6.v", IPV6_SIZE);

        let matched = ip_addresses
            .into_iter()
            .filter_map(|c| signature::parse_ip(c.as_ref()))
            .find(|ip| match ip {
                IpAddr::V4(v4) => stored4.is_some_and(|s| bytes_equal_prefix(&s.octets(), &v4.octets(), n4)),
                IpAddr::V6(v6) => stored6.is_some_and(|s| bytes_equal_prefix(&s.octets(), &v6.octets(), n6)),
            });
        let Some(ip) = matched else {
            debug!(code = 413, "rejecting signature");
            return Err(VerifyError::IpMismatch.into());
        };

        let Some(ua) = p.get("b.ua").and_then(Value::as_bytes) else {
            debug!(code = 415, "rejecting signature");
            return Err(VerifyError::MissingUserAgent.into());
        };
        if ua != user_agent.as_bytes() {
            debug!(code = 414, "rejecting signature");
            return Err(VerifyError::UserAgentMismatch.into());
        }

        let result = p
            .get("result")
            .and_then(Value::as_int)
            .ok_or(VerifyError::MissingField("result"))?;
        let verdict = results.verdict(result).map(str::to_owned);
        Ok(self.outcome.insert(VerificationOutcome { result, verdict, ip, embedded_ipv6: None }))
    }

    /// Encode, encrypt and frame the payload without text encoding.
    ///
    /// # Errors
    ///
    /// `FormatError::Unrepresentable` without a zone id or for values the
    /// codec cannot carry, `FormatError::PayloadTooLarge` when the cipher
    /// frame exceeds the 16-bit length field, or any cipher error.
    pub fn to_bytes(&self, codec: &dyn StructCodec, cipher: &dyn SymmetricCipher, key: &[u8]) -> Result<Vec<u8>> {
        let zone_id = self
            .zone_id
            .ok_or_else(|| FormatError::Unrepresentable("zone id is not set".into()))?;
        let encoded = codec.encode(&Value::Map(self.payload.clone()))?;
        let frame = cipher.encrypt(&encoded, key, &[])?;
        let length = u16::try_from(frame.len()).map_err(|_| FormatError::PayloadTooLarge(frame.len()))?;

        let mut out = Vec::with_capacity(SIGNATURE5_HEADER_LEN + frame.len());
        out.push(SIGNATURE5_VERSION);
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&zone_id.to_be_bytes());
        out.extend_from_slice(&frame);
        Ok(out)
    }

    /// Produce signature text; the inverse of [`Signature5::parse`].
    ///
    /// # Errors
    ///
    /// See [`Signature5::to_bytes`].
    pub fn format(
        &self,
        codec: &dyn StructCodec,
        cipher: &dyn SymmetricCipher,
        key: &[u8],
        formatter: &dyn Formatter,
    ) -> Result<String> {
        Ok(formatter.format(&self.to_bytes(codec, cipher, key)?))
    }
}
