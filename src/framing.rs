//! Caller-declared fixed-length framing shared by cipher frames and the v5
//! envelope header.
//!
//! Field order and length come from the caller, so a cipher with an extra
//! fixed field (e.g. an AEAD tag) only declares one more entry.

use crate::errors::ParseError;

/// Size of the little-endian method tag that opens every cipher frame.
pub const METHOD_SIZE: usize = 2;

/// Named fixed-length fields sliced out of a frame, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fields<'a>(Vec<(&'static str, &'a [u8])>);

impl<'a> Fields<'a> {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    /// Field declared by the caller; absent names are a programming error
    /// and surface as an empty slice.
    #[must_use]
    pub fn field(&self, name: &str) -> &'a [u8] {
        self.get(name).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'a [u8])> + '_ {
        self.0.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unframed<'a> {
    pub method: u16,
    pub fields: Fields<'a>,
    /// Everything after the declared fields (ciphertext or data).
    pub data: &'a [u8],
}

/// `LE16(method)` || items...
#[must_use]
pub fn frame(method: u16, items: &[&[u8]]) -> Vec<u8> {
    let len = METHOD_SIZE + items.iter().map(|i| i.len()).sum::<usize>();
    let mut v = Vec::with_capacity(len);
    v.extend_from_slice(&method.to_le_bytes());
    for item in items {
        v.extend_from_slice(item);
    }
    v
}

/// Walk `lengths` in order, consuming exactly that many bytes per field.
///
/// # Errors
///
/// Returns `ParseError::TruncatedPayload` if `payload` is shorter than the sum
/// of the declared lengths.
pub fn split_fields<'a>(
    payload: &'a [u8],
    lengths: &[(&'static str, usize)],
) -> Result<(Fields<'a>, &'a [u8]), ParseError> {
    let needed: usize = lengths.iter().map(|(_, l)| l).sum();
    if payload.len() < needed {
        return Err(ParseError::TruncatedPayload { needed, got: payload.len() });
    }
    let mut fields = Vec::with_capacity(lengths.len());
    let mut rest = payload;
    for (name, len) in lengths {
        let (head, tail) = rest.split_at(*len);
        fields.push((*name, head));
        rest = tail;
    }
    Ok((Fields(fields), rest))
}

/// Inverse of [`frame`]: method tag, declared fields, remainder.
///
/// The length check covers the tag and every declared field before anything
/// is sliced.
///
/// # Errors
///
/// Returns `ParseError::TruncatedPayload` if `payload` is shorter than
/// `METHOD_SIZE + sum(lengths)`.
pub fn unframe<'a>(
    payload: &'a [u8],
    lengths: &[(&'static str, usize)],
) -> Result<Unframed<'a>, ParseError> {
    let needed = METHOD_SIZE + lengths.iter().map(|(_, l)| l).sum::<usize>();
    if payload.len() < needed {
        return Err(ParseError::TruncatedPayload { needed, got: payload.len() });
    }
    let method = u16::from_le_bytes([payload[0], payload[1]]);
    let (fields, data) = split_fields(&payload[METHOD_SIZE..], lengths)?;
    Ok(Unframed { method, fields, data })
}

/// Peek at the method tag without validating the rest of the frame.
#[must_use]
pub fn peek_method(payload: &[u8]) -> Option<u16> {
    match payload {
        [a, b, ..] => Some(u16::from_le_bytes([*a, *b])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout_is_tag_then_items() {
        let f = frame(0x0201, &[&[1, 2], &[3], &[4, 5, 6]]);
        assert_eq!(f, vec![0x01, 0x02, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn unframe_by_declared_lengths() {
        let f = frame(0x0201, &[&[1, 2], &[3], &[4, 5, 6]]);
        let u = unframe(&f, &[("iv", 2), ("tag", 1)]).unwrap();
        assert_eq!(u.method, 0x0201);
        assert_eq!(u.fields.field("iv"), &[1, 2]);
        assert_eq!(u.fields.field("tag"), &[3]);
        assert_eq!(u.data, &[4, 5, 6]);
        assert_eq!(u.fields.get("nonce"), None);
    }

    #[test]
    fn unframe_allows_empty_remainder() {
        let f = frame(0x0101, &[&[9; 4]]);
        let u = unframe(&f, &[("nonce", 4)]).unwrap();
        assert!(u.data.is_empty());
    }

    #[test]
    fn unframe_truncated() {
        let f = frame(0x0101, &[&[9; 3]]);
        assert_eq!(
            unframe(&f, &[("nonce", 4)]),
            Err(ParseError::TruncatedPayload { needed: 6, got: 5 })
        );
        assert!(unframe(&[0x01], &[]).is_err());
    }

    #[test]
    fn peek() {
        assert_eq!(peek_method(&[0x00, 0x02, 0xff]), Some(0x0200));
        assert_eq!(peek_method(&[0x00]), None);
    }
}
