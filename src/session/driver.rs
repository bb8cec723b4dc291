use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Instant;

use crate::foundation::core::LodLevel;
use crate::foundation::error::{StrokeError, StrokeResult, consistency_fault};
use crate::schedule::scheduler::Scheduler;
use crate::session::jobs::{JobKind, StrokeJob, StrokeState};
use crate::session::preview::PreviewCoordinator;
use crate::session::state::{CommitOutcome, SessionState, SessionStats};
use crate::transform::params::ParamsHandle;

/// Parameters tagged with the revision the handle assigned them.
#[derive(Clone, Debug)]
pub(crate) struct Revisioned {
    pub(crate) revision: u64,
    pub(crate) params: ParamsHandle,
}

/// Messages from a [`crate::StrokeSession`] handle to its driver thread.
pub(crate) enum Request {
    Update {
        params: Revisioned,
        force: bool,
    },
    Stats(Sender<SessionStats>),
    Commit(Sender<StrokeResult<CommitOutcome>>),
    Cancel(Sender<StrokeResult<SessionStats>>),
}

/// Owning context of a stroke: drives state transitions and runs every scheduler step.
#[derive(Debug)]
pub(crate) struct StrokeDriver {
    scheduler: Scheduler<StrokeJob>,
    state: StrokeState,
    coordinator: PreviewCoordinator<Revisioned>,
    current: Revisioned,
    preview_lod: LodLevel,
    continuing: bool,
}

impl StrokeDriver {
    pub(crate) fn new(
        scheduler: Scheduler<StrokeJob>,
        state: StrokeState,
        coordinator: PreviewCoordinator<Revisioned>,
        initial: ParamsHandle,
        preview_lod: LodLevel,
        continuing: bool,
    ) -> Self {
        Self {
            scheduler,
            state,
            coordinator,
            current: Revisioned {
                revision: 0,
                params: initial,
            },
            preview_lod,
            continuing,
        }
    }

    pub(crate) fn phase(&self) -> SessionState {
        self.state.phase()
    }

    pub(crate) fn stats(&self) -> SessionStats {
        SessionStats {
            coalesced: self.coordinator.coalesced(),
            ..self.state.stats()
        }
    }

    /// Thread body: initialize, then serve requests until the stroke is terminal or the handle
    /// is gone.
    pub(crate) fn run_loop(mut self, rx: Receiver<Request>) {
        if let Err(e) = self.start(Instant::now()) {
            tracing::error!(error = %e, "stroke initialization failed");
        }
        loop {
            let msg = match self.coordinator.time_until_due(Instant::now()) {
                Some(wait) => rx.recv_timeout(wait),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match msg {
                Ok(req) => {
                    if !self.handle(req, Instant::now()) {
                        return;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if self.phase().is_cancellable()
                        && let Err(e) = self.cancel()
                    {
                        tracing::error!(error = %e, "rollback of abandoned stroke failed");
                    }
                    return;
                }
            }
            if let Err(e) = self.pump(Instant::now()) {
                tracing::error!(error = %e, "preview recompute failed");
            }
        }
    }

    /// Serve one request; returns `false` once the stroke is terminal.
    pub(crate) fn handle(&mut self, req: Request, now: Instant) -> bool {
        match req {
            Request::Update { params, force } => {
                if let Err(e) = self.update(params, force, now) {
                    tracing::error!(error = %e, "preview recompute failed");
                }
            }
            Request::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Request::Commit(reply) => {
                let _ = reply.send(self.commit());
            }
            Request::Cancel(reply) => {
                let _ = reply.send(self.cancel().map(|()| self.stats()));
            }
        }
        !self.phase().is_terminal()
    }

    /// Snapshot and clear every node, then show the initial preview.
    ///
    /// Counts as an in-flight recompute for throttling. A continued stroke first undoes the
    /// continued macro; that path is not cancellable.
    #[tracing::instrument(
        skip_all,
        fields(nodes = self.state.node_count(), continuing = self.continuing)
    )]
    pub(crate) fn start(&mut self, now: Instant) -> StrokeResult<()> {
        self.coordinator.mark_started(now);
        let cancellable = !self.continuing;
        if self.continuing {
            self.scheduler
                .enqueue(StrokeJob::new(JobKind::UndoOverridden, false));
        }
        for slot in 0..self.state.node_count() {
            self.scheduler
                .enqueue(StrokeJob::new(JobKind::ClearNode { slot }, cancellable));
        }
        self.scheduler
            .enqueue(StrokeJob::new(JobKind::Publish, cancellable));
        let initial = self.current.clone();
        self.enqueue_pass(&initial, false, cancellable);

        let result = self.scheduler.run(&mut self.state).map(|_| ());
        let next = self.coordinator.finish(Instant::now());
        result?;
        self.drive(next)
    }

    /// Dispatch the pending update if it is due.
    pub(crate) fn pump(&mut self, now: Instant) -> StrokeResult<()> {
        if self.phase() != SessionState::Previewing {
            return Ok(());
        }
        let next = self.coordinator.poll(now);
        self.drive(next)
    }

    fn update(&mut self, params: Revisioned, force: bool, now: Instant) -> StrokeResult<()> {
        if self.phase() != SessionState::Previewing {
            tracing::debug!(revision = params.revision, phase = ?self.phase(), "update ignored");
            return Ok(());
        }
        let next = self.coordinator.request_update(params, force, now);
        self.drive(next)
    }

    fn drive(&mut self, mut next: Option<Revisioned>) -> StrokeResult<()> {
        while let Some(req) = next {
            next = self.recompute(req)?;
        }
        Ok(())
    }

    fn recompute(&mut self, req: Revisioned) -> StrokeResult<Option<Revisioned>> {
        self.state.set_phase(SessionState::Recomputing);
        self.state.stats_mut().recomputes += 1;
        self.enqueue_pass(&req, false, true);
        tracing::debug!(revision = req.revision, "preview recompute");
        self.current = req;

        let result = self.scheduler.run(&mut self.state);
        if self.state.phase() == SessionState::Recomputing {
            self.state.set_phase(SessionState::Previewing);
        }
        let next = self.coordinator.finish(Instant::now());
        result?;
        Ok(next)
    }

    fn enqueue_pass(&mut self, req: &Revisioned, final_pass: bool, cancellable: bool) {
        let lod = if final_pass {
            LodLevel::FULL
        } else {
            self.preview_lod
        };
        self.scheduler.set_active_lod(lod);
        self.scheduler
            .enqueue(StrokeJob::new(JobKind::UndoPreview, cancellable));
        for slot in 0..self.state.node_count() {
            self.scheduler.enqueue(StrokeJob::new(
                JobKind::TransformNode {
                    slot,
                    params: req.params.clone(),
                    revision: req.revision,
                    final_pass,
                },
                cancellable,
            ));
        }
        self.scheduler.enqueue(StrokeJob::new(
            JobKind::Harvest {
                revision: req.revision,
                final_pass,
            },
            cancellable,
        ));
    }

    /// Produce the committed result from the latest parameters.
    ///
    /// When the routine fails on the full-resolution pass nothing is recorded: the stroke goes
    /// back to `Previewing` with the previous preview shown and the error is returned.
    #[tracing::instrument(skip_all)]
    pub(crate) fn commit(&mut self) -> StrokeResult<CommitOutcome> {
        let phase = self.phase();
        if phase.is_terminal() || phase == SessionState::Finalizing {
            return Err(StrokeError::precondition(format!(
                "cannot commit a stroke that is {phase:?}"
            )));
        }
        if phase == SessionState::Initializing {
            return Err(StrokeError::precondition(
                "cannot commit a stroke that never finished initializing",
            ));
        }
        self.state.set_phase(SessionState::Finalizing);

        let target = self
            .coordinator
            .take_latest()
            .unwrap_or_else(|| self.current.clone());
        if !self.continuing
            && target.params.is_identity()
            && !self.state.requires_structural_change()
        {
            tracing::debug!(revision = target.revision, "identity transform, nothing to commit");
            self.rollback()?;
            return Ok(CommitOutcome::Identity {
                stats: self.stats(),
            });
        }

        self.scheduler.set_active_lod(LodLevel::FULL);
        self.scheduler
            .enqueue(StrokeJob::new(JobKind::Separator, false));
        if self.state.needs_final_pass(target.revision) {
            self.state.stats_mut().final_passes += 1;
            self.enqueue_pass(&target, true, false);
        } else {
            self.scheduler
                .enqueue(StrokeJob::new(JobKind::PromotePreview, false));
        }
        self.scheduler.enqueue(StrokeJob::new(
            JobKind::Commit {
                params: target.params.clone(),
            },
            false,
        ));
        self.current = target;
        if let Err(e) = self.scheduler.run(&mut self.state) {
            // a routine failure leaves the restored preview in place
            if e.is_routine() && self.phase() == SessionState::Finalizing {
                self.state.set_phase(SessionState::Previewing);
            }
            return Err(e);
        }

        let macro_id = self
            .state
            .committed()
            .ok_or_else(|| consistency_fault("commit finished without a macro"))?;
        Ok(CommitOutcome::Committed {
            macro_id,
            stats: self.stats(),
        })
    }

    /// Roll every recorded change back.
    #[tracing::instrument(skip_all)]
    pub(crate) fn cancel(&mut self) -> StrokeResult<()> {
        let phase = self.phase();
        if !phase.is_cancellable() {
            return Err(StrokeError::precondition(format!(
                "cannot cancel a stroke that is {phase:?}"
            )));
        }
        self.scheduler.cancel_token().request();
        self.rollback()
    }

    fn rollback(&mut self) -> StrokeResult<()> {
        self.scheduler
            .enqueue(StrokeJob::new(JobKind::Rollback, false));
        let stats = self.scheduler.run(&mut self.state)?;
        if stats.dropped > 0 {
            tracing::debug!(dropped = stats.dropped, "pending stroke jobs dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/driver.rs"]
mod tests;
