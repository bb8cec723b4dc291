use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::LodLevel;
use crate::foundation::error::{StrokeResult, consistency_fault};

/// Ordering class of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobClass {
    /// Runs in FIFO order with the other sequential jobs of its run, on the owning thread.
    Sequential,
    /// May run on any worker, in any order, alongside the rest of its run.
    Concurrent,
    /// Waits for everything queued before it, then runs alone with exclusive state access.
    Barrier,
}

/// State access handed to a running job.
///
/// Barrier jobs get exclusive access; everything else shares the state, so anything a
/// concurrent job writes must go through interior synchronization.
pub enum JobAccess<'a, S> {
    /// Shared access during a run.
    Shared(&'a S),
    /// Exclusive access inside a barrier.
    Exclusive(&'a mut S),
}

impl<'a, S> JobAccess<'a, S> {
    /// Shared view, available in both modes.
    pub fn shared(&self) -> &S {
        match self {
            Self::Shared(s) => s,
            Self::Exclusive(s) => s,
        }
    }

    /// Exclusive view; asking for it outside a barrier is a sequencing bug.
    pub fn exclusive(self) -> StrokeResult<&'a mut S> {
        match self {
            Self::Exclusive(s) => Ok(s),
            Self::Shared(_) => Err(consistency_fault(
                "exclusive state access requested outside a barrier",
            )),
        }
    }
}

/// One schedulable unit of work.
pub trait Job: Send + Sized + 'static {
    /// State the job operates on.
    type State: Send + Sync;

    /// Ordering class.
    fn class(&self) -> JobClass;

    /// Resolution this job runs at.
    fn level_of_detail(&self) -> LodLevel {
        LodLevel::FULL
    }

    /// Cancellable jobs are dropped when cancellation is observed before they start.
    fn is_cancellable(&self) -> bool {
        true
    }

    /// Variant of this job for a reduced-resolution run, or `None` when the job runs unchanged
    /// at every level.
    fn lod_clone(&self, _level: LodLevel) -> Option<Self> {
        None
    }

    /// Execute.
    fn run(self, access: JobAccess<'_, Self::State>) -> StrokeResult<()>;
}

/// Cancellation flag shared between a scheduler and whoever may cancel it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next barrier or run boundary.
    pub fn request(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once cancellation was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear a previous request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
