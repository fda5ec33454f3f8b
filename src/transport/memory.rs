//! An in-process hub that records what is sent to it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use super::{Connector, EventBatch, EventProducer, EventSource};
use crate::config::DEFAULT_MAX_BATCH_BYTES;
use crate::event::{EventData, ReceivedEvent};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct HubState {
    batches: Vec<Vec<EventData>>,
    max_batch_bytes: Option<usize>,
    producers_opened: usize,
    sources_opened: usize,
    create_batch_calls: usize,
    send_calls: usize,
    fail_send_at: Option<usize>,
    producer_closed: bool,
}

/// Shared handle to an in-memory hub. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl InMemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn producer(&self, max_batch_bytes: usize) -> InMemoryProducer {
        InMemoryProducer {
            hub: self.clone(),
            max_batch_bytes,
        }
    }

    /// Batch limit for producers opened through [`Connector`].
    pub fn with_max_batch_bytes(self, max_batch_bytes: usize) -> Self {
        self.state().max_batch_bytes = Some(max_batch_bytes);
        self
    }

    /// Makes the `n`th send (1-based) fail with a connection error.
    pub fn fail_send_at(&self, n: usize) {
        self.state().fail_send_at = Some(n);
    }

    pub fn sent_batches(&self) -> Vec<Vec<EventData>> {
        self.state().batches.clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state().batches.iter().map(Vec::len).collect()
    }

    pub fn sent_events(&self) -> usize {
        self.state().batches.iter().map(Vec::len).sum()
    }

    pub fn create_batch_calls(&self) -> usize {
        self.state().create_batch_calls
    }

    pub fn send_calls(&self) -> usize {
        self.state().send_calls
    }

    pub fn transport_calls(&self) -> usize {
        let state = self.state();
        state.create_batch_calls + state.send_calls
    }

    pub fn producer_closed(&self) -> bool {
        self.state().producer_closed
    }

    /// Producers and sources handed out through [`Connector`].
    pub fn connections_opened(&self) -> usize {
        let state = self.state();
        state.producers_opened + state.sources_opened
    }
}

impl Connector for InMemoryHub {
    type Producer = InMemoryProducer;
    type Source = InMemorySource;

    fn open_producer(&self) -> Result<InMemoryProducer> {
        let max_batch_bytes = {
            let mut state = self.state();
            state.producers_opened += 1;
            state.max_batch_bytes.unwrap_or(DEFAULT_MAX_BATCH_BYTES)
        };
        Ok(self.producer(max_batch_bytes))
    }

    /// Replays everything sent so far on partition "0", then ends.
    fn open_source(&self) -> Result<InMemorySource> {
        let mut state = self.state();
        state.sources_opened += 1;
        let events = state
            .batches
            .iter()
            .flatten()
            .zip(0i64..)
            .map(|(event, sequence_number)| ReceivedEvent {
                partition_id: "0".to_string(),
                sequence_number,
                enqueued_time_ms: 0,
                body: event.body.clone(),
                partition_key: event.partition_key.clone(),
                offset: sequence_number.to_string(),
                properties: event.properties.clone(),
            })
            .collect();
        Ok(InMemorySource::new(events))
    }
}

pub struct InMemoryProducer {
    hub: InMemoryHub,
    max_batch_bytes: usize,
}

#[async_trait]
impl EventProducer for InMemoryProducer {
    async fn create_batch(&mut self) -> Result<EventBatch> {
        self.hub.state().create_batch_calls += 1;
        Ok(EventBatch::new(self.max_batch_bytes))
    }

    async fn send_batch(&mut self, batch: &EventBatch) -> Result<()> {
        let mut state = self.hub.state();
        state.send_calls += 1;
        if state.fail_send_at == Some(state.send_calls) {
            return Err(Error::Connection(format!(
                "send #{} rejected by in-memory hub",
                state.send_calls
            )));
        }
        debug!(events = batch.len(), bytes = batch.size_bytes(), "Recorded batch");
        state.batches.push(batch.iter().cloned().collect());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.hub.state().producer_closed = true;
        Ok(())
    }
}

/// Replays a fixed list of events, then ends, fails or waits forever.
pub struct InMemorySource {
    events: VecDeque<ReceivedEvent>,
    tail: Tail,
    closed: Arc<AtomicBool>,
}

enum Tail {
    End,
    Fail(String),
    Pending,
}

impl InMemorySource {
    /// Yields `events` and then reports end of stream.
    pub fn new(events: Vec<ReceivedEvent>) -> Self {
        Self {
            events: events.into(),
            tail: Tail::End,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Yields `events` and then fails with a connection error.
    pub fn failing_after(events: Vec<ReceivedEvent>, message: impl Into<String>) -> Self {
        Self {
            tail: Tail::Fail(message.into()),
            ..Self::new(events)
        }
    }

    /// Yields `events` and then waits for more that never arrive.
    pub fn endless(events: Vec<ReceivedEvent>) -> Self {
        Self {
            tail: Tail::Pending,
            ..Self::new(events)
        }
    }

    /// Flag set once [`EventSource::close`] has been called.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

#[async_trait]
impl EventSource for InMemorySource {
    async fn next_event(&mut self) -> Result<Option<ReceivedEvent>> {
        if let Some(event) = self.events.pop_front() {
            return Ok(Some(event));
        }
        match &self.tail {
            Tail::End => Ok(None),
            Tail::Fail(message) => Err(Error::Connection(message.clone())),
            Tail::Pending => futures::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
