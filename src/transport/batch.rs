use std::slice;

use crate::event::EventData;

/// Fixed framing of a batch before any event is added.
pub const BATCH_OVERHEAD: usize = 61;

/// A size-bounded, append-only group of events sent in one transport call.
#[derive(Debug, Clone)]
pub struct EventBatch {
    max_size_bytes: usize,
    size_bytes: usize,
    events: Vec<EventData>,
}

impl EventBatch {
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            max_size_bytes,
            size_bytes: BATCH_OVERHEAD,
            events: Vec::new(),
        }
    }

    /// Appends `event` if it fits, otherwise hands it back unchanged.
    pub fn try_add(&mut self, event: EventData) -> std::result::Result<(), EventData> {
        let size = event.encoded_size();
        if self.size_bytes + size > self.max_size_bytes {
            return Err(event);
        }
        self.size_bytes += size;
        self.events.push(event);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn max_size_bytes(&self) -> usize {
        self.max_size_bytes
    }

    pub fn iter(&self) -> slice::Iter<'_, EventData> {
        self.events.iter()
    }

    pub fn into_events(self) -> Vec<EventData> {
        self.events
    }
}

impl<'a> IntoIterator for &'a EventBatch {
    type Item = &'a EventData;
    type IntoIter = slice::Iter<'a, EventData>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
