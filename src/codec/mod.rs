//! Serialization codecs for v5 payloads.
//!
//! Every codec frame is `tag(1) || body`. The tag selects the codec on decode;
//! a frame carrying another codec's tag is rejected rather than reinterpreted.

use core::str::FromStr;

use tracing::trace;

use crate::errors::{ConfigError, FormatError, ParseError, Result};
use crate::types::Value;

pub mod form;
pub mod native;
mod value_serde;

pub use form::FormUrlencoded;
pub use native::NativeSerialize;

/// Capability contract shared by every codec.
pub trait StructCodec {
    fn tag(&self) -> u8;

    fn name(&self) -> &'static str;

    /// Serialize without the tag byte.
    fn serialize(&self, value: &Value) -> Result<Vec<u8>>;

    /// Deserialize a body that has already had its tag stripped.
    fn deserialize(&self, body: &[u8]) -> Result<Value>;

    /// `tag || serialize(value)`
    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let body = self.serialize(value)?;
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(self.tag());
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<Value> {
        match data.split_first() {
            Some((tag, body)) if *tag == self.tag() => {
                trace!(codec = self.name(), len = body.len(), "decoding struct");
                self.deserialize(body)
            }
            Some((tag, _)) => Err(FormatError::FormatMismatch { expected: self.tag(), got: *tag }.into()),
            None => Err(ParseError::TruncatedPayload { needed: 1, got: 0 }.into()),
        }
    }
}

pub type BoxedCodec = Box<dyn StructCodec + Send + Sync>;

/// Known codec tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CodecType {
    Native = b'S',
    Igbinary = b'I',
    Msgpack = b'M',
    Json = b'J',
    Rfc3986 = b'H',
}

impl CodecType {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, FormatError> {
        match tag {
            b'S' => Ok(Self::Native),
            b'I' => Ok(Self::Igbinary),
            b'M' => Ok(Self::Msgpack),
            b'J' => Ok(Self::Json),
            b'H' => Ok(Self::Rfc3986),
            other => Err(FormatError::UnsupportedCodec(format!("{other:#04x}"))),
        }
    }

    /// Construct the concrete codec.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnavailableCodec` when no implementation of the
    /// format is linked into this build.
    pub fn create(self) -> Result<BoxedCodec> {
        let codec: BoxedCodec = match self {
            Self::Native => Box::new(NativeSerialize),
            Self::Igbinary => return Err(ConfigError::UnavailableCodec("igbinary").into()),
            Self::Msgpack => Box::new(Msgpack),
            Self::Json => Box::new(Json),
            Self::Rfc3986 => Box::new(FormUrlencoded),
        };
        Ok(codec)
    }
}

impl FromStr for CodecType {
    type Err = FormatError;

    /// A single byte is a raw tag; anything longer is a case-insensitive name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let [tag] = s.as_bytes() {
            return Self::from_tag(*tag);
        }
        match s.to_ascii_lowercase().as_str() {
            "serialize" | "native" => Ok(Self::Native),
            "igbinary" => Ok(Self::Igbinary),
            "msgpack" => Ok(Self::Msgpack),
            "json" => Ok(Self::Json),
            "rfc3986" | "form" => Ok(Self::Rfc3986),
            _ => Err(FormatError::UnsupportedCodec(s.to_owned())),
        }
    }
}

/// Resolve a codec by raw tag (1-byte string) or symbolic name.
pub fn resolve(tag_or_name: &str) -> Result<BoxedCodec> {
    tag_or_name.parse::<CodecType>()?.create()
}

/// Resolve the codec named by the first byte of `payload`.
pub fn resolve_from_payload(payload: &[u8]) -> Result<BoxedCodec> {
    let tag = payload
        .first()
        .ok_or(ParseError::TruncatedPayload { needed: 1, got: 0 })?;
    CodecType::from_tag(*tag)?.create()
}

/// JSON refuses raw binary and non-finite floats instead of silently changing type.
fn ensure_json_representable(value: &Value) -> Result<(), FormatError> {
    match value {
        Value::Bytes(b) if core::str::from_utf8(b).is_err() => {
            Err(FormatError::Unrepresentable("binary string in JSON".into()))
        }
        Value::Float(f) if !f.is_finite() => Err(FormatError::Unrepresentable("non-finite float in JSON".into())),
        Value::List(items) => items.iter().try_for_each(ensure_json_representable),
        Value::Map(m) => m.values().try_for_each(ensure_json_representable),
        _ => Ok(()),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Json;

impl StructCodec for Json {
    fn tag(&self) -> u8 {
        CodecType::Json.tag()
    }

    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        ensure_json_representable(value)?;
        serde_json::to_vec(value).map_err(|e| FormatError::Unrepresentable(e.to_string()).into())
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value> {
        serde_json::from_slice(body).map_err(|e| ParseError::MalformedPayload(e.to_string()).into())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Msgpack;

impl StructCodec for Msgpack {
    fn tag(&self) -> u8 {
        CodecType::Msgpack.tag()
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        rmp_serde::to_vec(value).map_err(|e| FormatError::Unrepresentable(e.to_string()).into())
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value> {
        rmp_serde::from_slice(body).map_err(|e| ParseError::MalformedPayload(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SignatureError;
    use crate::types::Payload;

    fn sample() -> Value {
        let mut inner = Payload::new();
        inner.insert("ua".into(), Value::from("Mozilla/5.0"));
        let mut m = Payload::new();
        m.insert("result".into(), Value::Int(3));
        m.insert("ipv4.ip".into(), Value::from("10.0.0.1"));
        m.insert("b".into(), Value::Map(inner));
        Value::Map(m)
    }

    #[test]
    fn resolve_by_tag_and_name() {
        assert_eq!(resolve("J").unwrap().tag(), b'J');
        assert_eq!(resolve("JSON").unwrap().tag(), b'J');
        assert_eq!(resolve("msgpack").unwrap().tag(), b'M');
        assert_eq!(resolve("Rfc3986").unwrap().tag(), b'H');
        assert_eq!(resolve("serialize").unwrap().tag(), b'S');
    }

    #[test]
    fn resolve_unknown() {
        assert!(matches!(
            resolve("yaml").err(),
            Some(SignatureError::Format(FormatError::UnsupportedCodec(_)))
        ));
        assert!(matches!(
            resolve("j").err(),
            Some(SignatureError::Format(FormatError::UnsupportedCodec(_)))
        ));
    }

    #[test]
    fn igbinary_is_unavailable() {
        let err = resolve("igbinary").err().unwrap();
        assert!(err.is_fatal());
        assert_eq!(err, SignatureError::from(ConfigError::UnavailableCodec("igbinary")));
        assert!(resolve_from_payload(b"Ia:0:{}").is_err());
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let encoded = Json.encode(&sample()).unwrap();
        assert_eq!(encoded[0], b'J');
        assert_eq!(
            &encoded[1..],
            br#"{"result":3,"ipv4.ip":"10.0.0.1","b":{"ua":"Mozilla/5.0"}}"#
        );
        let decoded = Json.decode(&encoded).unwrap();
        let keys: Vec<&str> = decoded.as_map().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["result", "ipv4.ip", "b"]);
        assert_eq!(decoded, sample());
    }

    #[test]
    fn json_rejects_binary() {
        let v = Value::Bytes(vec![0xff, 0xfe]);
        assert!(matches!(
            Json.encode(&v),
            Err(SignatureError::Format(FormatError::Unrepresentable(_)))
        ));
    }

    #[test]
    fn msgpack_round_trip_with_binary() {
        let mut m = Payload::new();
        m.insert("raw".into(), Value::Bytes(vec![0xff, 0x00, 0x80]));
        m.insert("n".into(), Value::Int(-42));
        m.insert("list".into(), Value::List(vec![Value::Null, Value::Bool(true), Value::Float(1.5)]));
        let v = Value::Map(m);
        let encoded = Msgpack.encode(&v).unwrap();
        assert_eq!(Msgpack.decode(&encoded).unwrap(), v);
    }

    #[test]
    fn decode_checks_tag() {
        let encoded = Json.encode(&sample()).unwrap();
        assert_eq!(
            Msgpack.decode(&encoded).err(),
            Some(SignatureError::from(FormatError::FormatMismatch { expected: b'M', got: b'J' }))
        );
        assert!(Json.decode(&[]).is_err());
    }

    #[test]
    fn resolve_from_payload_dispatches() {
        let encoded = Msgpack.encode(&sample()).unwrap();
        let codec = resolve_from_payload(&encoded).unwrap();
        assert_eq!(codec.name(), "msgpack");
        assert_eq!(codec.decode(&encoded).unwrap(), sample());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            Json.decode(b"J{\"a\":"),
            Err(SignatureError::Parse(ParseError::MalformedPayload(_)))
        ));
    }
}
