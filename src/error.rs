//! Error types and result handling for eventhub-typed-headers.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use eventhub_typed_headers::{Error, Result};
//!
//! fn parse_count(input: &str) -> Result<usize> {
//!     input
//!         .trim()
//!         .parse()
//!         .map_err(|_| Error::InvalidInput(format!("'{}' is not a number", input)))
//! }
//!
//! match parse_count("abc") {
//!     Ok(n) => println!("Sending {} messages", n),
//!     Err(Error::InvalidInput(msg)) => eprintln!("Invalid input: {}", msg),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// The main error type for eventhub-typed-headers operations.
///
/// Core components never print; they return one of these and the binary
/// decides how to report it.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error: missing or malformed settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Kafka client, producer or consumer error.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON serialization error when encoding payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from operator input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic transport error not covered by specific types.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operator input that could not be understood.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A header value or event that could not be decoded.
    #[error("Invalid message format: {message}")]
    InvalidMessage {
        /// Description of what was invalid
        message: String,
    },

    /// A property name was added twice to the same event.
    #[error("Property '{name}' is already set on this event")]
    DuplicateProperty {
        /// The property name that collided
        name: String,
    },

    /// An event does not fit even into an empty batch.
    #[error("Event #{index} is too large for the batch ({size} bytes, limit {max_size} bytes)")]
    EventTooLarge {
        /// 1-based index of the offending event
        index: usize,
        /// Estimated encoded size of the event
        size: usize,
        /// Maximum size of a batch
        max_size: usize,
    },
}

impl Error {
    pub(crate) fn invalid_message(message: impl Into<String>) -> Self {
        Error::InvalidMessage {
            message: message.into(),
        }
    }
}

/// A convenient Result type alias for eventhub-typed-headers operations.
///
/// This is equivalent to `std::result::Result<T, eventhub_typed_headers::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
