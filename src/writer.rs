//! Generates test events with typed headers and sends them in batches.
//!
//! One batch is open at a time. An event that does not fit flushes the
//! open batch and goes into a fresh one; an event that does not fit an
//! empty batch aborts the run with [`Error::EventTooLarge`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::event::EventData;
use crate::headers::{attach_typed_headers, ByteStream};
use crate::payload::SyntheticPayload;
use crate::transport::{EventBatch, EventProducer};
use crate::{Error, Result};

/// Contents of the byte stream attached to every event as `header_stream`.
pub const STREAM_CONTENT: &[u8] = b"Stream data";

/// One transmitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// 1-based position of the batch within the run.
    pub batch_number: usize,
    pub events: usize,
    pub bytes: usize,
    /// Set for the batch sent after the last event was generated.
    pub is_final: bool,
}

/// Outcome of a completed write run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub sent: usize,
    /// Event count of each flushed batch, in send order.
    pub batches: Vec<usize>,
}

pub struct BatchingWriter<P, R = StdRng> {
    producer: P,
    rng: R,
}

impl<P: EventProducer> BatchingWriter<P> {
    pub fn new(producer: P) -> Self {
        Self::with_rng(producer, StdRng::from_entropy())
    }
}

impl<P: EventProducer, R: Rng> BatchingWriter<P, R> {
    pub fn with_rng(producer: P, rng: R) -> Self {
        Self { producer, rng }
    }

    /// Sends `count` generated events, calling `on_flush` after every batch.
    ///
    /// The producer is closed whether or not the run succeeds.
    pub async fn run<F>(mut self, count: usize, on_flush: F) -> Result<WriteReport>
    where
        F: FnMut(&FlushReport),
    {
        info!(count, "Preparing to send messages with typed headers");

        let outcome = self.write_all(count, on_flush).await;
        let closed = self.producer.close().await;

        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                warn!("Failed to close producer after error: {}", close_err);
                Err(e)
            }
        }
    }

    async fn write_all<F>(&mut self, count: usize, mut on_flush: F) -> Result<WriteReport>
    where
        F: FnMut(&FlushReport),
    {
        let mut report = WriteReport::default();
        let mut batch = self.producer.create_batch().await?;
        let stream = ByteStream::from_static(STREAM_CONTENT);

        for index in 1..=count {
            let event = self.build_event(index, &stream)?;

            if let Err(event) = batch.try_add(event) {
                if batch.is_empty() {
                    return Err(too_large(index, &event, &batch));
                }

                self.flush(&batch, false, &mut report, &mut on_flush).await?;

                batch = self.producer.create_batch().await?;
                if let Err(event) = batch.try_add(event) {
                    return Err(too_large(index, &event, &batch));
                }
            }
        }

        if !batch.is_empty() {
            self.flush(&batch, true, &mut report, &mut on_flush).await?;
        }

        info!(
            sent = report.sent,
            batches = report.batches.len(),
            "Finished sending messages"
        );
        Ok(report)
    }

    fn build_event(&mut self, index: usize, stream: &ByteStream) -> Result<EventData> {
        let payload = SyntheticPayload::generate(index as u64, &mut self.rng);
        let mut event = EventData::new(payload.to_json_bytes()?);
        attach_typed_headers(&mut event, stream)?;
        Ok(event)
    }

    async fn flush<F>(
        &mut self,
        batch: &EventBatch,
        is_final: bool,
        report: &mut WriteReport,
        on_flush: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&FlushReport),
    {
        self.producer.send_batch(batch).await?;

        report.sent += batch.len();
        report.batches.push(batch.len());

        let flush = FlushReport {
            batch_number: report.batches.len(),
            events: batch.len(),
            bytes: batch.size_bytes(),
            is_final,
        };
        info!(
            batch = flush.batch_number,
            events = flush.events,
            bytes = flush.bytes,
            "Sent batch"
        );
        on_flush(&flush);
        Ok(())
    }
}

fn too_large(index: usize, event: &EventData, batch: &EventBatch) -> Error {
    Error::EventTooLarge {
        index,
        size: event.encoded_size(),
        max_size: batch.max_size_bytes(),
    }
}
