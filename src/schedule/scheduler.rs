use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::foundation::core::LodLevel;
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::schedule::job::{CancelToken, Job, JobAccess, JobClass};

/// Worker pool configuration for a [`Scheduler`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SchedulerOpts {
    /// Run concurrent jobs on a dedicated rayon pool. When `false`, every job of a run executes
    /// inline on the owning thread in queue order.
    pub parallel: bool,
    /// Pool size; `None` lets rayon pick. `Some(0)` is rejected.
    pub threads: Option<usize>,
}

impl Default for SchedulerOpts {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

/// Counters for one or more scheduler steps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Sequential jobs executed.
    pub sequential: u64,
    /// Concurrent jobs executed.
    pub concurrent: u64,
    /// Barrier jobs executed.
    pub barriers: u64,
    /// Jobs replaced by their level-of-detail clone.
    pub lod_clones: u64,
    /// Pending cancellable jobs dropped after cancellation.
    pub dropped: u64,
}

impl RunStats {
    /// Jobs that actually ran.
    pub fn executed(&self) -> u64 {
        self.sequential + self.concurrent + self.barriers
    }

    fn absorb(&mut self, other: RunStats) {
        self.sequential += other.sequential;
        self.concurrent += other.concurrent;
        self.barriers += other.barriers;
        self.lod_clones += other.lod_clones;
        self.dropped += other.dropped;
    }
}

/// Barrier-delimited job queue.
///
/// The queue is cut into runs at every barrier. Within a run, sequential jobs execute in FIFO
/// order on the calling thread while the run's concurrent jobs execute on the pool; the run
/// ends when all of them are done. Barriers execute alone, with exclusive access to the state.
pub struct Scheduler<J: Job> {
    queue: VecDeque<J>,
    pool: Option<rayon::ThreadPool>,
    active_lod: LodLevel,
    cancel: CancelToken,
}

impl<J: Job> fmt::Debug for Scheduler<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.queue.len())
            .field("parallel", &self.pool.is_some())
            .field("active_lod", &self.active_lod)
            .field("cancel_requested", &self.cancel.is_requested())
            .finish()
    }
}

impl<J: Job> Scheduler<J> {
    /// Create a scheduler, building its worker pool when `opts.parallel` is set.
    pub fn new(opts: &SchedulerOpts) -> StrokeResult<Self> {
        let pool = if opts.parallel {
            Some(build_thread_pool(opts.threads)?)
        } else {
            None
        };
        Ok(Self {
            queue: VecDeque::new(),
            pool,
            active_lod: LodLevel::FULL,
            cancel: CancelToken::new(),
        })
    }

    /// Append one job.
    pub fn enqueue(&mut self, job: J) {
        self.queue.push_back(job);
    }

    /// Append jobs in order.
    pub fn extend(&mut self, jobs: impl IntoIterator<Item = J>) {
        self.queue.extend(jobs);
    }

    /// Jobs not yet started.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Level of detail applied to jobs as they are dequeued.
    pub fn active_lod(&self) -> LodLevel {
        self.active_lod
    }

    /// Switch the level of detail for jobs dequeued from now on.
    pub fn set_active_lod(&mut self, lod: LodLevel) {
        self.active_lod = lod;
    }

    /// Token that cancels pending cancellable jobs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain the queue.
    #[tracing::instrument(skip(self, state), fields(pending = self.queue.len()))]
    pub fn run(&mut self, state: &mut J::State) -> StrokeResult<RunStats> {
        let mut stats = RunStats::default();
        while let Some(step) = self.run_next(state)? {
            stats.absorb(step);
        }
        Ok(stats)
    }

    /// Execute the next barrier, or the next run of sequential and concurrent jobs.
    ///
    /// Returns `None` once the queue is empty. Errors are returned after every job already
    /// dispatched in the step has finished.
    pub fn run_next(&mut self, state: &mut J::State) -> StrokeResult<Option<RunStats>> {
        let mut stats = RunStats::default();
        if self.cancel.is_requested() {
            stats.dropped += self.drop_cancellable();
        }
        let Some(front) = self.queue.front() else {
            return Ok((stats.dropped > 0).then_some(stats));
        };

        if front.class() == JobClass::Barrier {
            let Some(job) = self.queue.pop_front() else {
                return Ok(Some(stats));
            };
            let job = self.lod_variant(job, &mut stats);
            stats.barriers += 1;
            job.run(JobAccess::Exclusive(state))?;
            return Ok(Some(stats));
        }

        let mut run = Vec::new();
        while self
            .queue
            .front()
            .is_some_and(|j| j.class() != JobClass::Barrier)
        {
            if let Some(job) = self.queue.pop_front() {
                run.push(self.lod_variant(job, &mut stats));
            }
        }
        for job in &run {
            match job.class() {
                JobClass::Concurrent => stats.concurrent += 1,
                _ => stats.sequential += 1,
            }
        }
        self.execute_run(run, state)?;
        Ok(Some(stats))
    }

    fn lod_variant(&self, job: J, stats: &mut RunStats) -> J {
        if self.active_lod.is_full() {
            return job;
        }
        match job.lod_clone(self.active_lod) {
            Some(clone) => {
                stats.lod_clones += 1;
                clone
            }
            None => job,
        }
    }

    fn drop_cancellable(&mut self) -> u64 {
        let before = self.queue.len();
        self.queue.retain(|j| !j.is_cancellable());
        let dropped = (before - self.queue.len()) as u64;
        if dropped > 0 {
            tracing::debug!(dropped, "dropped pending cancellable jobs");
        }
        dropped
    }

    fn execute_run(&self, run: Vec<J>, state: &J::State) -> StrokeResult<()> {
        let errors: Mutex<Vec<StrokeError>> = Mutex::new(Vec::new());
        let record = |r: StrokeResult<()>| {
            if let Err(e) = r {
                errors.lock().unwrap_or_else(PoisonError::into_inner).push(e);
            }
        };

        match &self.pool {
            Some(pool) => {
                let (concurrent, sequential): (Vec<J>, Vec<J>) = run
                    .into_iter()
                    .partition(|j| j.class() == JobClass::Concurrent);
                pool.in_place_scope(|scope| {
                    for job in concurrent {
                        let record = &record;
                        scope.spawn(move |_| record(job.run(JobAccess::Shared(state))));
                    }
                    for job in sequential {
                        record(job.run(JobAccess::Shared(state)));
                    }
                });
            }
            None => {
                for job in run {
                    record(job.run(JobAccess::Shared(state)));
                }
            }
        }

        let mut errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        if errors.len() > 1 {
            for e in &errors[1..] {
                tracing::error!(error = %e, "additional job failure in the same run");
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.swap_remove(0))
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> StrokeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(StrokeError::precondition(
            "scheduler 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("stroke-worker-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build rayon thread pool: {e}").into())
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
