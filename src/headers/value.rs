//! Typed header values and their binary encoding.
//!
//! Kafka headers carry opaque bytes, so each [`HeaderValue`] is written as a
//! one-byte type tag followed by a fixed or variable width payload. Integers
//! are big-endian and floats are stored as their IEEE-754 bit patterns, so
//! every value decodes back to exactly what was encoded.
//!
//! ```rust
//! use eventhub_typed_headers::headers::HeaderValue;
//!
//! let value = HeaderValue::U64(10_000_000_000);
//! let encoded = value.encode();
//! assert_eq!(encoded[0], 0x0A);
//! assert_eq!(HeaderValue::decode(&encoded).unwrap(), value);
//! ```

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bigdecimal::BigDecimal;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta};
use url::Url;
use uuid::Uuid;

use crate::{Error, Result};

/// Wire tag identifying the type of an encoded header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HeaderType {
    String = 0x01,
    Bool = 0x02,
    U8 = 0x03,
    I8 = 0x04,
    I16 = 0x05,
    U16 = 0x06,
    I32 = 0x07,
    U32 = 0x08,
    I64 = 0x09,
    U64 = 0x0A,
    F32 = 0x0B,
    F64 = 0x0C,
    Decimal = 0x0D,
    Char = 0x0E,
    Uuid = 0x0F,
    DateTime = 0x10,
    DateTimeOffset = 0x11,
    Duration = 0x12,
    Uri = 0x13,
    Bytes = 0x14,
    Stream = 0x15,
}

impl HeaderType {
    pub const ALL: [HeaderType; 21] = [
        HeaderType::String,
        HeaderType::Bool,
        HeaderType::U8,
        HeaderType::I8,
        HeaderType::I16,
        HeaderType::U16,
        HeaderType::I32,
        HeaderType::U32,
        HeaderType::I64,
        HeaderType::U64,
        HeaderType::F32,
        HeaderType::F64,
        HeaderType::Decimal,
        HeaderType::Char,
        HeaderType::Uuid,
        HeaderType::DateTime,
        HeaderType::DateTimeOffset,
        HeaderType::Duration,
        HeaderType::Uri,
        HeaderType::Bytes,
        HeaderType::Stream,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|ty| ty.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            HeaderType::String => "string",
            HeaderType::Bool => "bool",
            HeaderType::U8 => "u8",
            HeaderType::I8 => "i8",
            HeaderType::I16 => "i16",
            HeaderType::U16 => "u16",
            HeaderType::I32 => "i32",
            HeaderType::U32 => "u32",
            HeaderType::I64 => "i64",
            HeaderType::U64 => "u64",
            HeaderType::F32 => "f32",
            HeaderType::F64 => "f64",
            HeaderType::Decimal => "decimal",
            HeaderType::Char => "char",
            HeaderType::Uuid => "uuid",
            HeaderType::DateTime => "datetime",
            HeaderType::DateTimeOffset => "datetimeoffset",
            HeaderType::Duration => "duration",
            HeaderType::Uri => "uri",
            HeaderType::Bytes => "bytes",
            HeaderType::Stream => "stream",
        }
    }
}

impl fmt::Display for HeaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An open, in-memory byte stream attached to an event.
///
/// Cloning shares the underlying buffer, so the event and the code that
/// created the stream can both hold it until the event has been sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteStream {
    data: Bytes,
}

impl ByteStream {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// Returns a reader positioned at the start of the stream.
    pub fn reader(&self) -> impl Read {
        self.data.clone().reader()
    }
}

/// A strongly-typed header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(BigDecimal),
    Char(char),
    Uuid(Uuid),
    /// A timestamp without zone, interpreted as UTC.
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Duration(TimeDelta),
    Uri(Url),
    Bytes(Bytes),
    Stream(ByteStream),
}

const NANOS_PER_SEC: i32 = 1_000_000_000;

impl HeaderValue {
    pub fn header_type(&self) -> HeaderType {
        match self {
            HeaderValue::String(_) => HeaderType::String,
            HeaderValue::Bool(_) => HeaderType::Bool,
            HeaderValue::U8(_) => HeaderType::U8,
            HeaderValue::I8(_) => HeaderType::I8,
            HeaderValue::I16(_) => HeaderType::I16,
            HeaderValue::U16(_) => HeaderType::U16,
            HeaderValue::I32(_) => HeaderType::I32,
            HeaderValue::U32(_) => HeaderType::U32,
            HeaderValue::I64(_) => HeaderType::I64,
            HeaderValue::U64(_) => HeaderType::U64,
            HeaderValue::F32(_) => HeaderType::F32,
            HeaderValue::F64(_) => HeaderType::F64,
            HeaderValue::Decimal(_) => HeaderType::Decimal,
            HeaderValue::Char(_) => HeaderType::Char,
            HeaderValue::Uuid(_) => HeaderType::Uuid,
            HeaderValue::DateTime(_) => HeaderType::DateTime,
            HeaderValue::DateTimeOffset(_) => HeaderType::DateTimeOffset,
            HeaderValue::Duration(_) => HeaderType::Duration,
            HeaderValue::Uri(_) => HeaderType::Uri,
            HeaderValue::Bytes(_) => HeaderType::Bytes,
            HeaderValue::Stream(_) => HeaderType::Stream,
        }
    }

    /// Encodes the value as `[tag][payload]`.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(17);
        buf.put_u8(self.header_type().tag());

        match self {
            HeaderValue::String(s) => buf.put_slice(s.as_bytes()),
            HeaderValue::Bool(b) => buf.put_u8(u8::from(*b)),
            HeaderValue::U8(v) => buf.put_u8(*v),
            HeaderValue::I8(v) => buf.put_i8(*v),
            HeaderValue::I16(v) => buf.put_i16(*v),
            HeaderValue::U16(v) => buf.put_u16(*v),
            HeaderValue::I32(v) => buf.put_i32(*v),
            HeaderValue::U32(v) => buf.put_u32(*v),
            HeaderValue::I64(v) => buf.put_i64(*v),
            HeaderValue::U64(v) => buf.put_u64(*v),
            HeaderValue::F32(v) => buf.put_u32(v.to_bits()),
            HeaderValue::F64(v) => buf.put_u64(v.to_bits()),
            HeaderValue::Decimal(d) => buf.put_slice(d.to_string().as_bytes()),
            HeaderValue::Char(c) => buf.put_u32(u32::from(*c)),
            HeaderValue::Uuid(u) => buf.put_slice(u.as_bytes()),
            HeaderValue::DateTime(dt) => {
                let utc = dt.and_utc();
                buf.put_i64(utc.timestamp());
                buf.put_u32(utc.timestamp_subsec_nanos());
            }
            HeaderValue::DateTimeOffset(dt) => {
                buf.put_i64(dt.timestamp());
                buf.put_u32(dt.timestamp_subsec_nanos());
                buf.put_i32(dt.offset().local_minus_utc());
            }
            HeaderValue::Duration(d) => {
                // TimeDelta truncates toward zero; store floor seconds with positive nanos.
                let mut secs = d.num_seconds();
                let mut nanos = d.subsec_nanos();
                if nanos < 0 {
                    secs -= 1;
                    nanos += NANOS_PER_SEC;
                }
                buf.put_i64(secs);
                buf.put_u32(nanos as u32);
            }
            HeaderValue::Uri(u) => buf.put_slice(u.as_str().as_bytes()),
            HeaderValue::Bytes(b) => buf.put_slice(b),
            HeaderValue::Stream(s) => buf.put_slice(s.as_bytes()),
        }

        buf.freeze()
    }

    /// Length of [`encode`](Self::encode)'s output.
    pub fn encoded_len(&self) -> usize {
        let payload = match self {
            HeaderValue::String(s) => s.len(),
            HeaderValue::Bool(_) | HeaderValue::U8(_) | HeaderValue::I8(_) => 1,
            HeaderValue::I16(_) | HeaderValue::U16(_) => 2,
            HeaderValue::I32(_) | HeaderValue::U32(_) | HeaderValue::F32(_) => 4,
            HeaderValue::Char(_) => 4,
            HeaderValue::I64(_) | HeaderValue::U64(_) | HeaderValue::F64(_) => 8,
            HeaderValue::Decimal(d) => d.to_string().len(),
            HeaderValue::Uuid(_) => 16,
            HeaderValue::DateTime(_) | HeaderValue::Duration(_) => 12,
            HeaderValue::DateTimeOffset(_) => 16,
            HeaderValue::Uri(u) => u.as_str().len(),
            HeaderValue::Bytes(b) => b.len(),
            HeaderValue::Stream(s) => s.len(),
        };
        1 + payload
    }

    /// Decodes a value produced by [`encode`](Self::encode).
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (&tag, payload) = data
            .split_first()
            .ok_or_else(|| Error::invalid_message("empty header value"))?;
        let ty = HeaderType::from_tag(tag)
            .ok_or_else(|| Error::invalid_message(format!("unknown header type tag 0x{:02X}", tag)))?;

        let value = match ty {
            HeaderType::String => HeaderValue::String(utf8(payload, ty)?.to_owned()),
            HeaderType::Bool => match fixed::<1>(payload, ty)? {
                [0] => HeaderValue::Bool(false),
                [1] => HeaderValue::Bool(true),
                [other] => {
                    return Err(Error::invalid_message(format!(
                        "invalid bool header byte 0x{:02X}",
                        other
                    )))
                }
            },
            HeaderType::U8 => HeaderValue::U8(u8::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::I8 => HeaderValue::I8(i8::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::I16 => HeaderValue::I16(i16::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::U16 => HeaderValue::U16(u16::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::I32 => HeaderValue::I32(i32::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::U32 => HeaderValue::U32(u32::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::I64 => HeaderValue::I64(i64::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::U64 => HeaderValue::U64(u64::from_be_bytes(fixed(payload, ty)?)),
            HeaderType::F32 => HeaderValue::F32(f32::from_bits(u32::from_be_bytes(fixed(payload, ty)?))),
            HeaderType::F64 => HeaderValue::F64(f64::from_bits(u64::from_be_bytes(fixed(payload, ty)?))),
            HeaderType::Decimal => {
                let text = utf8(payload, ty)?;
                let decimal = BigDecimal::from_str(text).map_err(|e| {
                    Error::invalid_message(format!("invalid decimal header '{}': {}", text, e))
                })?;
                HeaderValue::Decimal(decimal)
            }
            HeaderType::Char => {
                let scalar = u32::from_be_bytes(fixed(payload, ty)?);
                let c = char::from_u32(scalar).ok_or_else(|| {
                    Error::invalid_message(format!("invalid char header scalar 0x{:X}", scalar))
                })?;
                HeaderValue::Char(c)
            }
            HeaderType::Uuid => HeaderValue::Uuid(Uuid::from_bytes(fixed(payload, ty)?)),
            HeaderType::DateTime => {
                let raw = fixed::<12>(payload, ty)?;
                let mut cursor = &raw[..];
                let secs = cursor.get_i64();
                let nanos = cursor.get_u32();
                let dt = DateTime::from_timestamp(secs, nanos)
                    .ok_or_else(|| Error::invalid_message("datetime header out of range"))?;
                HeaderValue::DateTime(dt.naive_utc())
            }
            HeaderType::DateTimeOffset => {
                let raw = fixed::<16>(payload, ty)?;
                let mut cursor = &raw[..];
                let secs = cursor.get_i64();
                let nanos = cursor.get_u32();
                let offset_secs = cursor.get_i32();
                let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| {
                    Error::invalid_message(format!("invalid utc offset {}s", offset_secs))
                })?;
                let dt = DateTime::from_timestamp(secs, nanos)
                    .ok_or_else(|| Error::invalid_message("datetimeoffset header out of range"))?;
                HeaderValue::DateTimeOffset(dt.with_timezone(&offset))
            }
            HeaderType::Duration => {
                let raw = fixed::<12>(payload, ty)?;
                let mut cursor = &raw[..];
                let secs = cursor.get_i64();
                let nanos = cursor.get_u32();
                let delta = TimeDelta::new(secs, nanos)
                    .ok_or_else(|| Error::invalid_message("duration header out of range"))?;
                HeaderValue::Duration(delta)
            }
            HeaderType::Uri => {
                let text = utf8(payload, ty)?;
                let uri = Url::parse(text).map_err(|e| {
                    Error::invalid_message(format!("invalid uri header '{}': {}", text, e))
                })?;
                HeaderValue::Uri(uri)
            }
            HeaderType::Bytes => HeaderValue::Bytes(Bytes::copy_from_slice(payload)),
            HeaderType::Stream => HeaderValue::Stream(ByteStream::new(payload.to_vec())),
        };

        Ok(value)
    }
}

fn fixed<const N: usize>(payload: &[u8], ty: HeaderType) -> Result<[u8; N]> {
    payload.try_into().map_err(|_| {
        Error::invalid_message(format!(
            "{} header expects {} payload bytes, got {}",
            ty,
            N,
            payload.len()
        ))
    })
}

fn utf8(payload: &[u8], ty: HeaderType) -> Result<&str> {
    std::str::from_utf8(payload)
        .map_err(|e| Error::invalid_message(format!("{} header is not valid UTF-8: {}", ty, e)))
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => f.write_str(s),
            HeaderValue::Bool(v) => write!(f, "{}", v),
            HeaderValue::U8(v) => write!(f, "{}", v),
            HeaderValue::I8(v) => write!(f, "{}", v),
            HeaderValue::I16(v) => write!(f, "{}", v),
            HeaderValue::U16(v) => write!(f, "{}", v),
            HeaderValue::I32(v) => write!(f, "{}", v),
            HeaderValue::U32(v) => write!(f, "{}", v),
            HeaderValue::I64(v) => write!(f, "{}", v),
            HeaderValue::U64(v) => write!(f, "{}", v),
            HeaderValue::F32(v) => write!(f, "{}", v),
            HeaderValue::F64(v) => write!(f, "{}", v),
            HeaderValue::Decimal(v) => write!(f, "{}", v),
            HeaderValue::Char(v) => write!(f, "{}", v),
            HeaderValue::Uuid(v) => write!(f, "{}", v),
            HeaderValue::DateTime(v) => write!(f, "{}", v.and_utc().to_rfc3339()),
            HeaderValue::DateTimeOffset(v) => write!(f, "{}", v.to_rfc3339()),
            HeaderValue::Duration(v) => write!(f, "{}", v),
            HeaderValue::Uri(v) => write!(f, "{}", v),
            HeaderValue::Bytes(v) => f.write_str(&BASE64.encode(v)),
            HeaderValue::Stream(v) => f.write_str(&BASE64.encode(v.as_bytes())),
        }
    }
}
