//! Single-producer, single-consumer pipeline over a [`BoundedQueue`].
//!
//! # Architecture
//!
//! A run spawns two threads that share one queue:
//! - **Producer thread**: puts every item of an owned snapshot, then
//!   [`Message::EndOfStream`].
//! - **Consumer thread**: gets messages into an owned output until it sees
//!   end-of-stream.
//!
//! ```text
//! source ──snapshot──> Producer ──put──> BoundedQueue ──get──> Consumer ──> output
//! ```
//!
//! The calling thread only builds the pieces and joins both workers. Every run
//! gets a fresh queue and output; nothing is shared between runs.
//!
//! # Failure handling
//!
//! Worker panics never hang the run. The producer always sends end-of-stream,
//! even while unwinding, and a consumer that unwinds keeps draining the queue
//! up to end-of-stream so the producer is never left blocked on a full queue.
//! Both workers are joined and the first failure is returned as
//! [`PipelineError::Panicked`].
//!
//! # Example
//!
//! ```
//! use conduit::pipeline::run_pipeline;
//!
//! let output = run_pipeline(vec!["alpha", "beta", "gamma"], 2)?;
//! assert_eq!(output, vec!["alpha", "beta", "gamma"]);
//! # Ok::<(), conduit::pipeline::PipelineError>(())
//! ```

pub mod consumer;
pub mod message;
pub mod producer;
pub mod worker;

use std::sync::Arc;

use thiserror::Error;

use crate::placement::CpuConfig;
use crate::sync::bounded::{BoundedQueue, QueueError};
use crate::trace::{error, info};

use self::consumer::drain_until_end;

pub use consumer::{Consumer, DEFAULT_CONSUMER_NAME};
pub use message::Message;
pub use producer::{DEFAULT_PRODUCER_NAME, Producer};
pub use worker::Worker;

/// Queue capacity used by [`PipelineConfig::default`].
pub const DEFAULT_CAPACITY: usize = 10;

/// Errors from building or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The queue could not be built. Returned before any thread starts.
    #[error("invalid queue: {0}")]
    Queue(#[from] QueueError),
    /// The OS refused to create a worker thread.
    #[error("failed to spawn thread {name}: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
    /// A worker thread unwound.
    #[error("thread {name} panicked: {message}")]
    Panicked {
        /// Name of the thread that panicked.
        name: String,
        /// Panic message, if it was a string.
        message: String,
    },
}

/// Configuration for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of messages buffered between producer and consumer.
    /// Must be greater than zero.
    pub capacity: usize,
    /// Name of the producer thread.
    pub producer_name: String,
    /// Name of the consumer thread.
    pub consumer_name: String,
    /// CPU pinning for the two threads.
    pub cpu: CpuConfig,
}

impl PipelineConfig {
    /// Default configuration with the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            producer_name: DEFAULT_PRODUCER_NAME.to_owned(),
            consumer_name: DEFAULT_CONSUMER_NAME.to_owned(),
            cpu: CpuConfig::Disabled,
        }
    }
}

/// Reusable pipeline runner.
///
/// Holds only configuration; each [`Pipeline::run`] builds its own queue and
/// threads, so one `Pipeline` may be run any number of times.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Creates a runner with the given configuration.
    #[must_use]
    pub const fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Moves every item of `source` through a fresh queue and returns them in
    /// their original order.
    ///
    /// The source is collected on the calling thread before any worker
    /// starts. Returns once both workers have exited.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Queue`] if the configured capacity is zero.
    /// - [`PipelineError::Spawn`] if a worker thread cannot be created.
    /// - [`PipelineError::Panicked`] if a worker unwound.
    pub fn run<T, I>(&self, source: I) -> Result<Vec<T>, PipelineError>
    where
        T: Send + 'static,
        I: IntoIterator<Item = T>,
    {
        let queue = Arc::new(BoundedQueue::new(self.config.capacity)?);
        let placement = self.config.cpu.resolve();

        let producer = Producer::new(source, Arc::clone(&queue))
            .with_name(self.config.producer_name.as_str())
            .pinned_to(placement.producer_core);
        let consumer = Consumer::<T, Vec<T>>::new(Arc::clone(&queue))
            .with_name(self.config.consumer_name.as_str())
            .pinned_to(placement.consumer_core);

        info!(
            capacity = self.config.capacity,
            items = producer.len(),
            producer_core = ?placement.producer_core,
            consumer_core = ?placement.consumer_core,
            "pipeline starting"
        );

        let producer = producer.start()?;
        let consumer = match consumer.start() {
            Ok(consumer) => consumer,
            Err(err) => {
                // Nobody else will read the queue; take the consumer's place
                // so the producer can run to end-of-stream and exit.
                drain_until_end(&queue);
                if let Err(producer_err) = producer.join() {
                    error!(error = %producer_err, "producer failed while consumer was missing");
                }
                return Err(err);
            }
        };

        let produced = producer.join();
        let consumed = consumer.join();
        produced?;
        let output = consumed?;

        info!(items = output.len(), state = %queue.state(), "pipeline finished");
        Ok(output)
    }
}

/// Runs a pipeline with default configuration and the given queue capacity.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run_pipeline<T, I>(source: I, capacity: usize) -> Result<Vec<T>, PipelineError>
where
    T: Send + 'static,
    I: IntoIterator<Item = T>,
{
    Pipeline::new(PipelineConfig::with_capacity(capacity)).run(source)
}
