//! Outgoing and received events.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use crate::headers::HeaderValue;
use crate::{Error, Result};

/// Fixed per-record framing counted against a batch's size limit.
pub const RECORD_OVERHEAD: usize = 21;

/// Fixed per-header framing counted against a batch's size limit.
pub const HEADER_OVERHEAD: usize = 10;

/// Named, typed properties of an event, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<(String, HeaderValue)>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property. Each name may be set only once.
    pub fn add(&mut self, name: impl Into<String>, value: HeaderValue) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(Error::DuplicateProperty { name });
        }
        self.entries.push((name, value));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

/// An event waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EventData {
    pub body: Bytes,
    pub partition_key: Option<String>,
    pub properties: Properties,
}

impl EventData {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            partition_key: None,
            properties: Properties::new(),
        }
    }

    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Estimated number of bytes this event occupies in a batch.
    pub fn encoded_size(&self) -> usize {
        let headers: usize = self
            .properties
            .iter()
            .map(|(name, value)| HEADER_OVERHEAD + name.len() + value.encoded_len())
            .sum();

        RECORD_OVERHEAD
            + self.body.len()
            + self.partition_key.as_ref().map_or(0, String::len)
            + headers
    }
}

/// An event delivered by the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedEvent {
    pub partition_id: String,
    pub sequence_number: i64,
    /// Enqueue time in milliseconds since the Unix epoch.
    pub enqueued_time_ms: i64,
    pub body: Bytes,
    pub partition_key: Option<String>,
    /// Opaque position token within the partition.
    pub offset: String,
    pub properties: Properties,
}

impl ReceivedEvent {
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Renders the properties as `name:value` pairs, binary values in base64.
    pub fn properties_line(&self) -> String {
        self.properties
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ReceivedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event received from partition {}:", self.partition_id)?;
        writeln!(f, "\tSequence number: {}", self.sequence_number)?;
        writeln!(f, "\tTime: {}", self.enqueued_time_ms)?;
        writeln!(f, "\tBody: {}", self.body_text())?;
        writeln!(f, "\tKey: {}", self.partition_key.as_deref().unwrap_or(""))?;
        write!(f, "\tOffset: {}", self.offset)
    }
}
