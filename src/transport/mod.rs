//! The seam between the reader/writer and the hub.
//!
//! [`EventProducer`] and [`EventSource`] are the only calls the rest of the
//! crate makes against a hub. [`kafka`] talks to a real hub through its
//! Kafka endpoint; [`memory`] is an in-process hub used by `--dry-run` and
//! the tests.

use async_trait::async_trait;

use crate::event::ReceivedEvent;
use crate::Result;

pub mod batch;
pub mod kafka;
pub mod memory;

pub use batch::{EventBatch, BATCH_OVERHEAD};
pub use kafka::{KafkaConnector, KafkaEventProducer, KafkaEventSource};
pub use memory::{InMemoryHub, InMemoryProducer, InMemorySource};

/// Sending side of a hub.
#[async_trait]
pub trait EventProducer: Send {
    /// Opens an empty batch bounded by the hub's maximum batch size.
    async fn create_batch(&mut self) -> Result<EventBatch>;

    /// Transmits every event of `batch`, returning once all are acknowledged.
    async fn send_batch(&mut self, batch: &EventBatch) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Receiving side of a hub.
#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event. `None` means the stream has ended.
    async fn next_event(&mut self) -> Result<Option<ReceivedEvent>>;

    /// Releases the subscription. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Opens producers and sources against one hub.
///
/// Nothing is opened until an operation asks for it, so a rejected
/// operator choice never touches the hub.
pub trait Connector {
    type Producer: EventProducer;
    type Source: EventSource;

    fn open_producer(&self) -> Result<Self::Producer>;

    fn open_source(&self) -> Result<Self::Source>;
}
