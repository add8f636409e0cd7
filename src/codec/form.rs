//! Form-urlencoded codec (`H` tag).
//!
//! Decoding follows the WHATWG algorithm: split on `&`, split each pair on the
//! first `=`, map `+` to space and percent-decode both sides. Duplicate keys
//! overwrite. Values come back as byte strings; the format carries no types.

use percent_encoding::percent_decode;

use crate::codec::{CodecType, StructCodec};
use crate::errors::{FormatError, ParseError, Result};
use crate::types::{Payload, Value};

#[derive(Clone, Copy, Debug, Default)]
pub struct FormUrlencoded;

fn decode_component(raw: &[u8]) -> Vec<u8> {
    let plus_mapped: Vec<u8> = raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect();
    percent_decode(&plus_mapped).collect()
}

fn scalar_text(key: &str, value: &Value) -> Result<Option<Vec<u8>>> {
    let text = match value {
        // Nulls are omitted, like an absent field.
        Value::Null => return Ok(None),
        Value::Bool(b) => u8::from(*b).to_string().into_bytes(),
        Value::Int(i) => i.to_string().into_bytes(),
        Value::Float(f) => f.to_string().into_bytes(),
        Value::Bytes(b) => b.clone(),
        Value::List(_) | Value::Map(_) => {
            return Err(FormatError::Unrepresentable(format!("nested value under \"{key}\"")).into());
        }
    };
    Ok(Some(text))
}

impl StructCodec for FormUrlencoded {
    fn tag(&self) -> u8 {
        CodecType::Rfc3986.tag()
    }

    fn name(&self) -> &'static str {
        "rfc3986"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let Value::Map(m) = value else {
            return Err(FormatError::Unrepresentable(format!("{} at top level", value.type_name())).into());
        };
        let mut pairs = Vec::with_capacity(m.len());
        for (k, v) in m {
            if let Some(text) = scalar_text(k, v)? {
                let key: String = form_urlencoded::byte_serialize(k.as_bytes()).collect();
                let val: String = form_urlencoded::byte_serialize(&text).collect();
                pairs.push(format!("{key}={val}"));
            }
        }
        Ok(pairs.join("&").into_bytes())
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value> {
        let mut m = Payload::new();
        for pair in body.split(|b| *b == b'&').filter(|p| !p.is_empty()) {
            let (name, val) = match pair.iter().position(|b| *b == b'=') {
                Some(i) => (&pair[..i], &pair[i + 1..]),
                None => (pair, &[][..]),
            };
            let name = String::from_utf8(decode_component(name))
                .map_err(|_| ParseError::MalformedPayload("form key is not UTF-8".into()))?;
            m.insert(name, Value::Bytes(decode_component(val)));
        }
        Ok(Value::Map(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_whatwg() {
        let v = FormUrlencoded.deserialize(b"result=3&b.ua=Mozilla%2F5.0+(X11)&flag&&a=1=2").unwrap();
        let m = v.as_map().unwrap();
        assert_eq!(m["result"].as_int(), Some(3));
        assert_eq!(m["b.ua"], Value::from("Mozilla/5.0 (X11)"));
        assert_eq!(m["flag"], Value::from(""));
        assert_eq!(m["a"], Value::from("1=2"));
        assert_eq!(m.len(), 4);
    }

    #[test]
    fn duplicate_keys_overwrite() {
        let v = FormUrlencoded.deserialize(b"k=1&k=2").unwrap();
        let m = v.as_map().unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m["k"], Value::from("2"));
    }

    #[test]
    fn encode_scalars() {
        let mut m = Payload::new();
        m.insert("result".into(), Value::Int(9));
        m.insert("b.ua".into(), Value::from("a b&c"));
        m.insert("skip".into(), Value::Null);
        m.insert("t".into(), Value::Bool(true));
        let out = FormUrlencoded.serialize(&Value::Map(m)).unwrap();
        assert_eq!(out, b"result=9&b.ua=a+b%26c&t=1".to_vec());
    }

    #[test]
    fn binary_values_survive() {
        let mut m = Payload::new();
        m.insert("raw".into(), Value::Bytes(vec![0x00, 0xff, b'+']));
        let v = Value::Map(m);
        let out = FormUrlencoded.encode(&v).unwrap();
        assert_eq!(FormUrlencoded.decode(&out).unwrap(), v);
    }

    #[test]
    fn nested_is_unrepresentable() {
        let mut m = Payload::new();
        m.insert("b".into(), Value::Map(Payload::new()));
        assert!(FormUrlencoded.serialize(&Value::Map(m)).is_err());
        assert!(FormUrlencoded.serialize(&Value::Int(1)).is_err());
    }
}
