//! Producer execution unit: feeds a fixed snapshot into the queue.

use std::sync::Arc;

use crate::sync::bounded::BoundedQueue;
use crate::trace::debug;

use super::message::Message;
use super::worker::Worker;
use super::PipelineError;

/// Thread name used when none is given.
pub const DEFAULT_PRODUCER_NAME: &str = "conduit-producer";

/// Drains an owned snapshot of its source into a shared queue, then sends
/// [`Message::EndOfStream`].
///
/// The source is copied into the producer at construction, on the caller's
/// thread, so later changes to the original collection have no effect.
pub struct Producer<T> {
    name: String,
    source: Vec<T>,
    queue: Arc<BoundedQueue<Message<T>>>,
    core: Option<usize>,
}

impl<T> Producer<T> {
    /// Creates a producer over a snapshot of `source`.
    pub fn new<I>(source: I, queue: Arc<BoundedQueue<Message<T>>>) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Self {
            name: DEFAULT_PRODUCER_NAME.to_owned(),
            source: source.into_iter().collect(),
            queue,
            core: None,
        }
    }

    /// Sets the thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pins the producer thread to `core` when started.
    #[must_use]
    pub fn pinned_to(mut self, core: Option<usize>) -> Self {
        self.core = core;
        self
    }

    /// Returns the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of items in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Returns `true` if the snapshot holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Puts every item, then end-of-stream, on the calling thread.
    ///
    /// Blocks whenever the queue is full. End-of-stream is sent even if this
    /// method unwinds, so a consumer waiting on the queue always terminates.
    pub fn run(self) {
        let Self { source, queue, .. } = self;
        let _eos = EndOfStreamGuard { queue: &queue };

        debug!(items = source.len(), "producing");
        for item in source {
            queue.put(Message::Payload(item));
        }
    }
}

impl<T: Send + 'static> Producer<T> {
    /// Starts [`Producer::run`] on a new named thread.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Spawn`] if the OS refuses to create the thread.
    /// No end-of-stream is sent in that case.
    pub fn start(self) -> Result<Worker<()>, PipelineError> {
        let name = self.name.clone();
        let core = self.core;
        Worker::spawn(name, core, move || self.run())
    }
}

/// Sends end-of-stream when dropped, on both normal exit and unwind.
struct EndOfStreamGuard<'a, T> {
    queue: &'a BoundedQueue<Message<T>>,
}

impl<T> Drop for EndOfStreamGuard<'_, T> {
    fn drop(&mut self) {
        self.queue.put(Message::EndOfStream);
    }
}
