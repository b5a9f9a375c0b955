//! Consumer execution unit: drains the queue until end-of-stream.

use std::iter;
use std::sync::Arc;

use crate::sync::bounded::BoundedQueue;
use crate::trace::{debug, warn};

use super::message::Message;
use super::worker::Worker;
use super::PipelineError;

/// Thread name used when none is given.
pub const DEFAULT_CONSUMER_NAME: &str = "conduit-consumer";

/// Reads items from a shared queue into a destination until it receives
/// [`Message::EndOfStream`].
///
/// The destination (a `Vec<T>` unless another is given) is owned by the
/// consumer and handed back when the run finishes. End-of-stream is never
/// written to it.
pub struct Consumer<T, D = Vec<T>> {
    name: String,
    queue: Arc<BoundedQueue<Message<T>>>,
    destination: D,
    core: Option<usize>,
}

impl<T, D: Default> Consumer<T, D> {
    /// Creates a consumer writing into an empty `D`.
    pub fn new(queue: Arc<BoundedQueue<Message<T>>>) -> Self {
        Self::with_destination(queue, D::default())
    }
}

impl<T, D> Consumer<T, D> {
    /// Creates a consumer writing into `destination`.
    pub fn with_destination(queue: Arc<BoundedQueue<Message<T>>>, destination: D) -> Self {
        Self {
            name: DEFAULT_CONSUMER_NAME.to_owned(),
            queue,
            destination,
            core: None,
        }
    }

    /// Sets the thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pins the consumer thread to `core` when started.
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
}

impl<T, D: Extend<T>> Consumer<T, D> {
    /// Drains the queue on the calling thread and returns the destination.
    ///
    /// Blocks whenever the queue is empty. If writing to the destination
    /// unwinds, the remaining items are read and discarded up to
    /// end-of-stream, so a producer blocked on a full queue is released.
    pub fn run(self) -> D {
        let Self {
            queue,
            mut destination,
            ..
        } = self;
        let mut guard = DrainGuard {
            queue: &queue,
            finished: false,
        };

        while let Message::Payload(item) = queue.get() {
            destination.extend(iter::once(item));
        }
        guard.finished = true;

        debug!("end of stream received");
        destination
    }
}

impl<T, D> Consumer<T, D>
where
    T: Send + 'static,
    D: Extend<T> + Send + 'static,
{
    /// Starts [`Consumer::run`] on a new named thread.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Spawn`] if the OS refuses to create the thread.
    pub fn start(self) -> Result<Worker<D>, PipelineError> {
        let name = self.name.clone();
        let core = self.core;
        Worker::spawn(name, core, move || self.run())
    }
}

/// Reads and discards messages until end-of-stream.
///
/// Returns the number of payloads discarded.
pub(crate) fn drain_until_end<T>(queue: &BoundedQueue<Message<T>>) -> usize {
    let mut discarded = 0;
    while let Message::Payload(_) = queue.get() {
        discarded += 1;
    }
    discarded
}

/// Drains the queue to end-of-stream if the consumer loop exits early.
struct DrainGuard<'a, T> {
    queue: &'a BoundedQueue<Message<T>>,
    finished: bool,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("consumer stopped before end of stream, draining queue");
        let discarded = drain_until_end(self.queue);
        if discarded > 0 {
            warn!(discarded, "discarded unread items after consumer failure");
        }
    }
}
