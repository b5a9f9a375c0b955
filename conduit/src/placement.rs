//! CPU placement for pipeline worker threads.
//!
//! The producer and consumer hand every item across one cache line (the
//! queue's buffer), so pinning them to two distinct physical cores keeps
//! their working sets from being migrated mid-run. Pinning is opt-in.
//!
//! # Detection
//!
//! Uses `num_cpus` for physical/logical core counts and `core_affinity` for
//! pinning. On most systems, core IDs 0..N map to separate physical cores
//! before SMT siblings are enumerated.

use core_affinity::CoreId;

/// Which cores the producer and consumer threads run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadPlacement {
    /// Core for the producer thread (None = unpinned).
    pub producer_core: Option<usize>,
    /// Core for the consumer thread (None = unpinned).
    pub consumer_core: Option<usize>,
}

impl ThreadPlacement {
    /// Placement that leaves both threads to the OS scheduler.
    #[must_use]
    pub const fn unpinned() -> Self {
        Self {
            producer_core: None,
            consumer_core: None,
        }
    }
}

/// CPU pinning configuration for a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CpuConfig {
    /// Pin producer and consumer to the first two available cores, if the
    /// machine has at least two physical cores.
    Auto,
    /// Pin to explicit cores.
    Manual {
        /// Core for the producer thread (None = unpinned).
        producer_core: Option<usize>,
        /// Core for the consumer thread (None = unpinned).
        consumer_core: Option<usize>,
    },
    /// Disable CPU pinning entirely.
    #[default]
    Disabled,
}

impl CpuConfig {
    /// Resolves the config to a concrete thread placement.
    #[must_use]
    pub fn resolve(&self) -> ThreadPlacement {
        match *self {
            Self::Auto => auto_placement(),
            Self::Manual {
                producer_core,
                consumer_core,
            } => ThreadPlacement {
                producer_core,
                consumer_core,
            },
            Self::Disabled => ThreadPlacement::unpinned(),
        }
    }
}

fn auto_placement() -> ThreadPlacement {
    // Two busy threads on one physical core: leave it to the scheduler
    if num_cpus::get_physical() < 2 {
        return ThreadPlacement::unpinned();
    }

    let available: Vec<usize> = core_affinity::get_core_ids()
        .map(|ids| ids.into_iter().map(|id| id.id).collect())
        .unwrap_or_else(|| (0..num_cpus::get()).collect());

    match available.as_slice() {
        [producer, consumer, ..] => ThreadPlacement {
            producer_core: Some(*producer),
            consumer_core: Some(*consumer),
        },
        _ => ThreadPlacement::unpinned(),
    }
}

/// Pins the current thread to the specified core.
///
/// Returns `true` if pinning succeeded, `false` otherwise.
/// Core IDs outside the set reported by the OS are rejected without a syscall.
pub fn pin_to_core(core_id: usize) -> bool {
    let known = core_affinity::get_core_ids()
        .is_some_and(|ids| ids.iter().any(|id| id.id == core_id));
    known && core_affinity::set_for_current(CoreId { id: core_id })
}
