//! Bounded blocking queue and a producer/consumer pipeline built on it.
//!
//! - [`sync::bounded`]: the mutex and condition-variable queue.
//! - [`pipeline`]: producer and consumer threads wired through one queue.
//! - [`placement`]: optional CPU pinning of the pipeline threads.

pub mod pipeline;
pub mod placement;
pub mod sync;
pub mod trace;

#[doc(inline)]
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, run_pipeline};

#[doc(inline)]
pub use sync::bounded::{BoundedQueue, QueueError};

pub use trace::init_tracing;
