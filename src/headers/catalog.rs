//! The fixed catalog of typed headers attached to every test event.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use bytes::Bytes;
use chrono::{Local, TimeDelta, Utc};
use url::Url;
use uuid::Uuid;

use super::value::{ByteStream, HeaderType, HeaderValue};
use crate::event::EventData;
use crate::{Error, Result};

pub const HEADER_STRING: &str = "header_string";
pub const HEADER_BOOL: &str = "header_bool";
pub const HEADER_BYTE: &str = "header_byte";
pub const HEADER_SBYTE: &str = "header_sbyte";
pub const HEADER_SHORT: &str = "header_short";
pub const HEADER_USHORT: &str = "header_ushort";
pub const HEADER_INT: &str = "header_int";
pub const HEADER_UINT: &str = "header_uint";
pub const HEADER_LONG: &str = "header_long";
pub const HEADER_ULONG: &str = "header_ulong";
pub const HEADER_FLOAT: &str = "header_float";
pub const HEADER_DOUBLE: &str = "header_double";
pub const HEADER_DECIMAL: &str = "header_decimal";
pub const HEADER_CHAR: &str = "header_char";
pub const HEADER_GUID: &str = "header_guid";
pub const HEADER_DATETIME: &str = "header_datetime";
pub const HEADER_DATETIMEOFFSET: &str = "header_datetimeoffset";
pub const HEADER_TIMESPAN: &str = "header_timespan";
pub const HEADER_URI: &str = "header_uri";
pub const HEADER_BYTEARRAY: &str = "header_bytearray";
pub const HEADER_STREAM: &str = "header_stream";

/// Catalog names and their declared types, in attachment order.
pub const CATALOG: [(&str, HeaderType); 21] = [
    (HEADER_STRING, HeaderType::String),
    (HEADER_BOOL, HeaderType::Bool),
    (HEADER_BYTE, HeaderType::U8),
    (HEADER_SBYTE, HeaderType::I8),
    (HEADER_SHORT, HeaderType::I16),
    (HEADER_USHORT, HeaderType::U16),
    (HEADER_INT, HeaderType::I32),
    (HEADER_UINT, HeaderType::U32),
    (HEADER_LONG, HeaderType::I64),
    (HEADER_ULONG, HeaderType::U64),
    (HEADER_FLOAT, HeaderType::F32),
    (HEADER_DOUBLE, HeaderType::F64),
    (HEADER_DECIMAL, HeaderType::Decimal),
    (HEADER_CHAR, HeaderType::Char),
    (HEADER_GUID, HeaderType::Uuid),
    (HEADER_DATETIME, HeaderType::DateTime),
    (HEADER_DATETIMEOFFSET, HeaderType::DateTimeOffset),
    (HEADER_TIMESPAN, HeaderType::Duration),
    (HEADER_URI, HeaderType::Uri),
    (HEADER_BYTEARRAY, HeaderType::Bytes),
    (HEADER_STREAM, HeaderType::Stream),
];

pub const CATALOG_URI: &str = "https://example.com";

pub const CATALOG_DECIMAL: &str = "1234567890.1234567890";

/// Builds the catalog values. The UUID and both timestamps are fresh on
/// every call; everything else is a fixed literal.
pub fn typed_header_catalog(stream: &ByteStream) -> Result<Vec<(&'static str, HeaderValue)>> {
    let uri = Url::parse(CATALOG_URI)
        .map_err(|e| Error::invalid_message(format!("catalog uri: {}", e)))?;
    let decimal = BigDecimal::from_str(CATALOG_DECIMAL)
        .map_err(|e| Error::invalid_message(format!("catalog decimal: {}", e)))?;

    Ok(vec![
        (HEADER_STRING, HeaderValue::String("Sample string".to_string())),
        (HEADER_BOOL, HeaderValue::Bool(true)),
        (HEADER_BYTE, HeaderValue::U8(42)),
        (HEADER_SBYTE, HeaderValue::I8(-42)),
        (HEADER_SHORT, HeaderValue::I16(-1000)),
        (HEADER_USHORT, HeaderValue::U16(1000)),
        (HEADER_INT, HeaderValue::I32(-100_000)),
        (HEADER_UINT, HeaderValue::U32(100_000)),
        (HEADER_LONG, HeaderValue::I64(-10_000_000_000)),
        (HEADER_ULONG, HeaderValue::U64(10_000_000_000)),
        (HEADER_FLOAT, HeaderValue::F32(3.14)),
        (HEADER_DOUBLE, HeaderValue::F64(3.1415926535)),
        (HEADER_DECIMAL, HeaderValue::Decimal(decimal)),
        (HEADER_CHAR, HeaderValue::Char('X')),
        (HEADER_GUID, HeaderValue::Uuid(Uuid::new_v4())),
        (HEADER_DATETIME, HeaderValue::DateTime(Utc::now().naive_utc())),
        (
            HEADER_DATETIMEOFFSET,
            HeaderValue::DateTimeOffset(Local::now().fixed_offset()),
        ),
        (HEADER_TIMESPAN, HeaderValue::Duration(TimeDelta::minutes(150))),
        (HEADER_URI, HeaderValue::Uri(uri)),
        (
            HEADER_BYTEARRAY,
            HeaderValue::Bytes(Bytes::from_static(&[0x01, 0x02, 0x03])),
        ),
        (HEADER_STREAM, HeaderValue::Stream(stream.clone())),
    ])
}

/// Attaches the whole catalog to `event`, in catalog order.
///
/// `stream` stays owned by the caller. The event gets a reference-counted
/// handle to the same buffer, so it remains valid after the caller drops
/// its handle and there is nothing to release once the event is sent.
///
/// If any catalog name is already set on `event`, nothing is attached and
/// [`Error::DuplicateProperty`] names the first conflict.
pub fn attach_typed_headers(event: &mut EventData, stream: &ByteStream) -> Result<()> {
    if let Some((name, _)) = CATALOG
        .iter()
        .find(|(name, _)| event.properties.contains(name))
    {
        return Err(Error::DuplicateProperty {
            name: name.to_string(),
        });
    }

    for (name, value) in typed_header_catalog(stream)? {
        event.properties.add(name, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn stream() -> ByteStream {
        ByteStream::from_static(b"Stream data")
    }

    #[test]
    fn test_catalog_values_match_declared_types() {
        let values = typed_header_catalog(&stream()).unwrap();
        assert_eq!(values.len(), CATALOG.len());

        for ((name, value), (expected_name, expected_type)) in values.iter().zip(CATALOG.iter()) {
            assert_eq!(name, expected_name);
            assert_eq!(value.header_type(), *expected_type, "type of {}", name);
        }
    }

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<&str> = CATALOG.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), 21);
    }

    #[test]
    fn test_attach_sets_every_header_once_in_order() {
        let mut event = EventData::new(&b"{}"[..]);
        attach_typed_headers(&mut event, &stream()).unwrap();

        let names: Vec<&str> = event.properties.names().collect();
        let expected: Vec<&str> = CATALOG.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_attach_twice_reports_duplicate() {
        let mut event = EventData::new(&b"{}"[..]);
        attach_typed_headers(&mut event, &stream()).unwrap();

        let err = attach_typed_headers(&mut event, &stream()).unwrap_err();
        assert!(matches!(err, Error::DuplicateProperty { ref name } if name == HEADER_STRING));
    }

    #[test]
    fn test_conflict_leaves_event_untouched() {
        let mut event = EventData::new(&b"{}"[..]);
        event
            .properties
            .add(HEADER_INT, HeaderValue::String("taken".to_string()))
            .unwrap();

        let err = attach_typed_headers(&mut event, &stream()).unwrap_err();
        assert!(matches!(err, Error::DuplicateProperty { ref name } if name == HEADER_INT));
        assert_eq!(event.properties.len(), 1);
        assert_eq!(
            event.properties.get(HEADER_INT),
            Some(&HeaderValue::String("taken".to_string()))
        );
    }

    #[test]
    fn test_event_keeps_stream_after_caller_drops_it() {
        let mut event = EventData::new(&b"{}"[..]);
        {
            let stream = ByteStream::new(Bytes::from(b"Stream data".to_vec()));
            attach_typed_headers(&mut event, &stream).unwrap();
        }
        assert_eq!(event.properties.get(HEADER_STREAM), Some(&HeaderValue::Stream(stream())));
    }

    #[test]
    fn test_fixed_literals() {
        let mut event = EventData::new(&b"{}"[..]);
        attach_typed_headers(&mut event, &stream()).unwrap();
        let props = &event.properties;

        assert_eq!(props.get(HEADER_LONG), Some(&HeaderValue::I64(-10_000_000_000)));
        assert_eq!(props.get(HEADER_ULONG), Some(&HeaderValue::U64(10_000_000_000)));
        assert_eq!(
            props.get(HEADER_DECIMAL).map(ToString::to_string).as_deref(),
            Some("1234567890.1234567890")
        );
        assert_eq!(
            props.get(HEADER_TIMESPAN),
            Some(&HeaderValue::Duration(TimeDelta::seconds(9000)))
        );
        assert_eq!(
            props.get(HEADER_URI).map(ToString::to_string).as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(props.get(HEADER_STREAM), Some(&HeaderValue::Stream(stream())));
    }

    #[test]
    fn test_guid_is_fresh_per_call() {
        let first = typed_header_catalog(&stream()).unwrap();
        let second = typed_header_catalog(&stream()).unwrap();
        assert_ne!(first[14].1, second[14].1);
    }
}
