//! Drains an [`EventSource`] until it ends, fails, or shutdown is requested.
//!
//! The reader owns its source and closes it on every exit path:
//!
//! ```rust,no_run
//! use eventhub_typed_headers::reader::EventReader;
//! use eventhub_typed_headers::transport::InMemorySource;
//!
//! # async fn example() -> eventhub_typed_headers::Result<()> {
//! let reader = EventReader::new(InMemorySource::new(Vec::new()));
//! let summary = reader
//!     .run(tokio::signal::ctrl_c(), |event| println!("{}", event))
//!     .await?;
//! println!("Read {} events", summary.events);
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use tracing::{debug, info, warn};

use crate::event::ReceivedEvent;
use crate::transport::EventSource;
use crate::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadSummary {
    pub events: u64,
}

pub struct EventReader<S> {
    source: S,
}

impl<S: EventSource> EventReader<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Hands every received event to `on_event` until the stream ends,
    /// `shutdown` completes, or the source fails.
    ///
    /// A read error wins over a close error; the latter is only logged.
    pub async fn run<Fut, F>(mut self, shutdown: Fut, mut on_event: F) -> Result<ReadSummary>
    where
        Fut: Future,
        F: FnMut(&ReceivedEvent),
    {
        info!("Starting to read events");
        tokio::pin!(shutdown);

        let mut summary = ReadSummary::default();
        let outcome = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping reader");
                    break Ok(());
                }
                next = self.source.next_event() => match next {
                    Ok(Some(event)) => {
                        debug!(
                            partition = %event.partition_id,
                            sequence_number = event.sequence_number,
                            "Received event"
                        );
                        summary.events += 1;
                        on_event(&event);
                    }
                    Ok(None) => {
                        info!("Event stream ended");
                        break Ok(());
                    }
                    Err(e) => break Err(e),
                },
            }
        };

        let closed = self.source.close().await;
        info!(events = summary.events, "Reader stopped");

        match (outcome, closed) {
            (Ok(()), Ok(())) => Ok(summary),
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Failed to close subscription after error: {}", close_err);
                Err(e)
            }
        }
    }
}
