use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Pending<P> {
    params: P,
    force: bool,
}

/// Throttles preview recomputes while parameters change continuously.
///
/// At most one recompute is in flight. A request made while one runs, or before the minimum
/// interval since the last dispatch has elapsed, is parked as the pending request; a newer
/// request replaces it ("latest wins"). Time is passed in by the caller, so the coordinator
/// owns no clock and no thread.
#[derive(Clone, Debug)]
pub struct PreviewCoordinator<P> {
    min_interval: Duration,
    pending: Option<Pending<P>>,
    latest: Option<P>,
    in_flight: bool,
    last_start: Option<Instant>,
    dispatched: u64,
    coalesced: u64,
}

impl<P: Clone> PreviewCoordinator<P> {
    /// Coordinator enforcing `min_interval` between dispatch starts.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            pending: None,
            latest: None,
            in_flight: false,
            last_start: None,
            dispatched: 0,
            coalesced: 0,
        }
    }

    /// Minimum interval between two dispatch starts.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Submit new parameters.
    ///
    /// Returns them back when they should be dispatched right now (the caller then runs the
    /// recompute); otherwise they become the pending request and `None` is returned. A forced
    /// request skips the interval but still waits for the in-flight recompute.
    pub fn request_update(&mut self, params: P, force_immediate: bool, now: Instant) -> Option<P> {
        self.latest = Some(params.clone());
        let force = match self.pending.take() {
            Some(old) => {
                self.coalesced += 1;
                old.force || force_immediate
            }
            None => force_immediate,
        };
        self.pending = Some(Pending { params, force });
        self.poll(now)
    }

    /// Record that a recompute started outside [`PreviewCoordinator::request_update`]
    /// (initialization counts as one).
    pub fn mark_started(&mut self, now: Instant) {
        self.in_flight = true;
        self.last_start = Some(now);
    }

    /// Record that the in-flight recompute finished; returns the pending request if it is
    /// already due.
    pub fn finish(&mut self, now: Instant) -> Option<P> {
        self.in_flight = false;
        self.poll(now)
    }

    /// Dispatch the pending request if it is due.
    pub fn poll(&mut self, now: Instant) -> Option<P> {
        if !self.is_due(now) {
            return None;
        }
        let pending = self.pending.take()?;
        self.mark_started(now);
        self.dispatched += 1;
        Some(pending.params)
    }

    /// How long until the pending request becomes due; `None` when nothing is pending or a
    /// recompute is in flight.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        let pending = self.pending.as_ref()?;
        if self.in_flight {
            return None;
        }
        match (pending.force, self.last_start) {
            (true, _) | (_, None) => Some(Duration::ZERO),
            (false, Some(start)) => Some(
                self.min_interval
                    .saturating_sub(now.saturating_duration_since(start)),
            ),
        }
    }

    /// Most recent parameters ever submitted, dropping any pending request.
    ///
    /// Used by commit, which must see the latest parameters regardless of throttling.
    pub fn take_latest(&mut self) -> Option<P> {
        self.pending = None;
        self.latest.take()
    }

    /// Return `true` while a request waits.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Return `true` while a recompute runs.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Requests handed out for dispatch.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Requests replaced by a newer one before dispatch.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    fn is_due(&self, now: Instant) -> bool {
        self.time_until_due(now).is_some_and(|d| d.is_zero())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/preview.rs"]
mod tests;
