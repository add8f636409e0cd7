//! Native structured serialization (`S` tag).
//!
//! Grammar, one value per production:
//!
//! ```text
//! N;              null
//! b:0; | b:1;     bool
//! i:<int>;        integer
//! d:<float>;      float (also INF, -INF, NAN)
//! s:<len>:"..";   byte string, <len> bytes between the quotes
//! a:<n>:{k v ..}  ordered map, keys are i: or s:
//! ```
//!
//! Objects and references are rejected. Arrays always decode to maps.

use std::io::Write;

use crate::codec::{CodecType, StructCodec};
use crate::errors::{FormatError, ParseError, Result};
use crate::types::{Payload, Value};

/// Nesting cap for untrusted input.
pub const MAX_DEPTH: usize = 64;

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeSerialize;

impl StructCodec for NativeSerialize {
    fn tag(&self) -> u8 {
        CodecType::Native.tag()
    }

    fn name(&self) -> &'static str {
        "serialize"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_value(&mut out, value, 0)?;
        Ok(out)
    }

    fn deserialize(&self, body: &[u8]) -> Result<Value> {
        let mut r = Reader { buf: body, pos: 0 };
        let value = r.value(0)?;
        if r.pos != body.len() {
            return Err(malformed("trailing data"));
        }
        Ok(value)
    }
}

fn malformed(what: &str) -> crate::errors::SignatureError {
    ParseError::MalformedPayload(format!("serialize: {what}")).into()
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_owned()
    } else if f.is_infinite() {
        if f > 0.0 { "INF" } else { "-INF" }.to_owned()
    } else {
        f.to_string()
    }
}

fn write_bytes(out: &mut Vec<u8>, b: &[u8]) {
    // Writing into a Vec cannot fail.
    let _ = write!(out, "s:{}:\"", b.len());
    out.extend_from_slice(b);
    out.extend_from_slice(b"\";");
}

/// Keys that look like canonical integers are written as integer keys.
fn write_key(out: &mut Vec<u8>, key: &str) {
    match key.parse::<i64>() {
        Ok(i) if i.to_string() == key => {
            let _ = write!(out, "i:{i};");
        }
        _ => write_bytes(out, key.as_bytes()),
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(FormatError::Unrepresentable("nesting too deep".into()).into());
    }
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(b) => {
            let _ = write!(out, "b:{};", u8::from(*b));
        }
        Value::Int(i) => {
            let _ = write!(out, "i:{i};");
        }
        Value::Float(f) => {
            let _ = write!(out, "d:{};", format_float(*f));
        }
        Value::Bytes(b) => write_bytes(out, b),
        Value::List(items) => {
            let _ = write!(out, "a:{}:{{", items.len());
            for (i, item) in items.iter().enumerate() {
                let _ = write!(out, "i:{i};");
                write_value(out, item, depth + 1)?;
            }
            out.push(b'}');
        }
        Value::Map(m) => {
            let _ = write!(out, "a:{}:{{", m.len());
            for (k, v) in m {
                write_key(out, k);
                write_value(out, v, depth + 1)?;
            }
            out.push(b'}');
        }
    }
    Ok(())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn expect(&mut self, b: u8) -> Result<()> {
        if self.buf.get(self.pos) == Some(&b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(malformed("unexpected byte"))
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|e| *e <= self.buf.len()).ok_or_else(|| malformed("truncated"))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Bytes up to (not including) `delim`, consuming the delimiter.
    fn until(&mut self, delim: u8) -> Result<&'a str> {
        let rest = &self.buf[self.pos..];
        let n = rest.iter().position(|b| *b == delim).ok_or_else(|| malformed("missing delimiter"))?;
        let token = core::str::from_utf8(&rest[..n]).map_err(|_| malformed("non-ascii token"))?;
        self.pos += n + 1;
        Ok(token)
    }

    fn int_until(&mut self, delim: u8) -> Result<i64> {
        self.until(delim)?.parse().map_err(|_| malformed("bad integer"))
    }

    fn len_until(&mut self, delim: u8) -> Result<usize> {
        self.until(delim)?.parse().map_err(|_| malformed("bad length"))
    }

    fn string_body(&mut self) -> Result<&'a [u8]> {
        let len = self.len_until(b':')?;
        self.expect(b'"')?;
        let body = self.take(len)?;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(body)
    }

    fn key(&mut self) -> Result<String> {
        let kind = *self.take(1)?.first().ok_or_else(|| malformed("truncated"))?;
        self.expect(b':')?;
        match kind {
            b'i' => Ok(self.int_until(b';')?.to_string()),
            b's' => {
                let body = self.string_body()?;
                String::from_utf8(body.to_vec()).map_err(|_| malformed("key is not UTF-8"))
            }
            _ => Err(malformed("invalid array key")),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(malformed("nesting too deep"));
        }
        let kind = *self.take(1)?.first().ok_or_else(|| malformed("truncated"))?;
        if kind == b'N' {
            self.expect(b';')?;
            return Ok(Value::Null);
        }
        self.expect(b':')?;
        match kind {
            b'b' => match self.until(b';')? {
                "0" => Ok(Value::Bool(false)),
                "1" => Ok(Value::Bool(true)),
                _ => Err(malformed("bad bool")),
            },
            b'i' => Ok(Value::Int(self.int_until(b';')?)),
            b'd' => {
                let token = self.until(b';')?;
                let f = match token {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NAN" => f64::NAN,
                    other => other.parse().map_err(|_| malformed("bad float"))?,
                };
                Ok(Value::Float(f))
            }
            b's' => Ok(Value::Bytes(self.string_body()?.to_vec())),
            b'a' => {
                let n = self.len_until(b':')?;
                self.expect(b'{')?;
                // Every entry needs at least 4 bytes ("i:0;N;" is 6).
                let mut m = Payload::with_capacity(n.min(self.buf.len() / 4));
                for _ in 0..n {
                    let k = self.key()?;
                    let v = self.value(depth + 1)?;
                    m.insert(k, v);
                }
                self.expect(b'}')?;
                Ok(Value::Map(m))
            }
            b'O' | b'C' | b'r' | b'R' => Err(malformed("objects and references are not allowed")),
            _ => Err(malformed("unknown type")),
        }
    }
}
