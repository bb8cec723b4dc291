use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use anyhow::Context;

use crate::command::history::{SharedHistory, UndoHistory};
use crate::command::macro_command::MacroId;
use crate::document::node::NodeRef;
use crate::document::renderer::Renderer;
use crate::foundation::core::{LodLevel, NodeId, Rect};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::region::area::Region;
use crate::schedule::job::CancelToken;
use crate::schedule::scheduler::Scheduler;
use crate::session::driver::{Request, Revisioned, StrokeDriver};
use crate::session::extra::{TRANSFORM_MERGE_KEY, TransformExtra};
use crate::session::jobs::{StrokeSetup, StrokeState};
use crate::session::opts::{ContinuationPolicy, SessionOpts};
use crate::session::preview::PreviewCoordinator;
use crate::session::state::{CommitOutcome, SessionState, SessionStats};
use crate::transform::params::ParamsHandle;
use crate::transform::routine::TransformRoutine;

/// External parts a stroke works with.
pub struct Collaborators {
    /// Geometric transform applied to every node.
    pub routine: Arc<dyn TransformRoutine>,
    /// Receives flushed dirty regions.
    pub renderer: Arc<dyn Renderer>,
    /// Document history the committed macro is pushed to.
    pub history: SharedHistory,
    /// Called once with the working bounds when initialization completes.
    pub on_initialized: Option<Box<dyn FnOnce(Rect) + Send>>,
}

impl Collaborators {
    /// Collaborators without an initialization callback.
    pub fn new(
        routine: Arc<dyn TransformRoutine>,
        renderer: Arc<dyn Renderer>,
        history: SharedHistory,
    ) -> Self {
        Self {
            routine,
            renderer,
            history,
            on_initialized: None,
        }
    }

    /// Builder: set the initialization callback.
    pub fn on_initialized(mut self, callback: impl FnOnce(Rect) + Send + 'static) -> Self {
        self.on_initialized = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("on_initialized", &self.on_initialized.is_some())
            .finish_non_exhaustive()
    }
}

/// Handle to one running stroke.
///
/// The stroke runs on its own driver thread; every method returns without waiting for preview
/// work except [`StrokeSession::commit`], [`StrokeSession::cancel`] and
/// [`StrokeSession::stats`], which wait for the driver to answer. Dropping an active session
/// cancels it.
pub struct StrokeSession {
    tx: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
    cancel: CancelToken,
    status: Arc<Mutex<SessionState>>,
    next_revision: AtomicU64,
    final_stats: Option<SessionStats>,
}

impl fmt::Debug for StrokeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrokeSession")
            .field("state", &self.state())
            .field("next_revision", &self.next_revision.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl StrokeSession {
    /// Start a stroke over `nodes`.
    ///
    /// Non-editable nodes are skipped; the first remaining node is the root. When the most
    /// recent history entry is a transform over the same nodes (per
    /// [`SessionOpts::continuation`]) the stroke continues it: the previous parameters become
    /// the initial ones (unless [`SessionOpts::force_reset`]) and the commit replaces that
    /// entry. The history stays busy until the stroke ends.
    #[tracing::instrument(skip_all, fields(nodes = nodes.len(), label = %opts.label))]
    pub fn begin(
        nodes: Vec<NodeRef>,
        initial: ParamsHandle,
        collaborators: Collaborators,
        opts: SessionOpts,
    ) -> StrokeResult<Self> {
        let nodes: Vec<NodeRef> = nodes
            .into_iter()
            .filter(|n| {
                let editable = n.is_editable();
                if !editable {
                    tracing::debug!(node = ?n.id(), "skipping non-editable node");
                }
                editable
            })
            .collect();
        let Some(root) = nodes.first().map(|n| n.id()) else {
            return Err(StrokeError::precondition("no editable node to transform"));
        };
        let preview_lod = LodLevel::new(opts.preview_lod.0)?;
        let scheduler = Scheduler::new(&opts.scheduler)?;
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id()).collect();

        let Collaborators {
            routine,
            renderer,
            history,
            on_initialized,
        } = collaborators;
        let (overridden, initial) = {
            let mut guard = history.lock().unwrap_or_else(PoisonError::into_inner);
            if guard.is_busy() {
                return Err(StrokeError::precondition(
                    "another stroke holds the undo history",
                ));
            }
            let prior = find_continuation(
                &guard,
                opts.continuation,
                root,
                &ids,
                opts.selection.as_ref(),
            );
            guard.set_busy(true);
            match prior {
                Some((id, params)) if !opts.force_reset => (Some(id), params),
                Some((id, _)) => (Some(id), initial),
                None => (None, initial),
            }
        };
        if let Some(id) = overridden {
            tracing::debug!(macro_id = ?id, "continuing previous transform");
        }

        let status = Arc::new(Mutex::new(SessionState::Initializing));
        let state = StrokeState::new(StrokeSetup {
            label: opts.label.clone(),
            nodes,
            root,
            routine,
            renderer,
            history: Arc::clone(&history),
            overridden,
            preview_lod,
            selection: opts.selection.clone(),
            status: Arc::clone(&status),
            on_initialized,
        });
        let cancel = scheduler.cancel_token();
        let driver = StrokeDriver::new(
            scheduler,
            state,
            PreviewCoordinator::new(opts.throttle()),
            initial,
            preview_lod,
            overridden.is_some(),
        );

        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("stroke-driver".to_owned())
            .spawn(move || driver.run_loop(rx))
            .context("failed to spawn stroke driver thread");
        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                history
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_busy(false);
                return Err(e.into());
            }
        };

        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            cancel,
            status,
            next_revision: AtomicU64::new(1),
            final_stats: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request a preview with new parameters, throttled. Returns the request's revision.
    pub fn update_params(&self, params: ParamsHandle) -> StrokeResult<u64> {
        self.send_update(params, false)
    }

    /// Request a preview with new parameters, skipping the throttle interval.
    pub fn update_params_now(&self, params: ParamsHandle) -> StrokeResult<u64> {
        self.send_update(params, true)
    }

    /// Current counters (waits for the driver between two steps).
    pub fn stats(&self) -> StrokeResult<SessionStats> {
        if let Some(stats) = self.final_stats {
            return Ok(stats);
        }
        let (reply, answer) = mpsc::channel();
        self.send(Request::Stats(reply))?;
        answer.recv().map_err(|_| driver_gone())
    }

    /// Finish the stroke, pushing the result to history unless it is the identity.
    #[tracing::instrument(skip(self))]
    pub fn commit(&mut self) -> StrokeResult<CommitOutcome> {
        let state = self.state();
        if state.is_terminal() {
            return Err(StrokeError::precondition(format!(
                "cannot commit a stroke that is {state:?}"
            )));
        }
        let (reply, answer) = mpsc::channel();
        self.send(Request::Commit(reply))?;
        let outcome = answer.recv().map_err(|_| driver_gone())??;
        self.final_stats = Some(outcome.stats());
        self.join_if_terminal();
        Ok(outcome)
    }

    /// Roll the stroke back. A second call is rejected without effect.
    #[tracing::instrument(skip(self))]
    pub fn cancel(&mut self) -> StrokeResult<()> {
        let state = self.state();
        if !state.is_cancellable() {
            return Err(StrokeError::precondition(format!(
                "cannot cancel a stroke that is {state:?}"
            )));
        }
        self.cancel.request();
        let (reply, answer) = mpsc::channel();
        self.send(Request::Cancel(reply))?;
        let stats = answer.recv().map_err(|_| driver_gone())??;
        self.final_stats = Some(stats);
        self.join_if_terminal();
        Ok(())
    }

    fn send_update(&self, params: ParamsHandle, force: bool) -> StrokeResult<u64> {
        let state = self.state();
        if state.is_terminal() || state == SessionState::Finalizing {
            return Err(StrokeError::precondition(format!(
                "cannot update a stroke that is {state:?}"
            )));
        }
        let revision = self.next_revision.fetch_add(1, Ordering::Relaxed);
        self.send(Request::Update {
            params: Revisioned { revision, params },
            force,
        })?;
        Ok(revision)
    }

    fn send(&self, req: Request) -> StrokeResult<()> {
        self.tx
            .as_ref()
            .ok_or_else(driver_gone)?
            .send(req)
            .map_err(|_| driver_gone())
    }

    fn join_if_terminal(&mut self) {
        if self.state().is_terminal() {
            self.join();
        }
    }

    fn join(&mut self) {
        self.tx = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("stroke driver thread panicked");
        }
    }
}

impl Drop for StrokeSession {
    fn drop(&mut self) {
        if self.worker.is_none() {
            return;
        }
        if self.state().is_cancellable() {
            self.cancel.request();
        }
        // Disconnecting makes the driver roll back whatever is still cancellable and exit.
        self.join();
    }
}

fn driver_gone() -> StrokeError {
    StrokeError::precondition("stroke driver has stopped")
}

fn find_continuation(
    history: &UndoHistory,
    policy: ContinuationPolicy,
    root: NodeId,
    nodes: &[NodeId],
    selection: Option<&Region>,
) -> Option<(MacroId, ParamsHandle)> {
    let prior = history.last_committed()?;
    if prior.merge_key() != Some(TRANSFORM_MERGE_KEY) {
        return None;
    }
    let extra = prior.extra_as::<TransformExtra>()?;
    let same_selection =
        extra.selection.as_ref().map(Region::compressed) == selection.map(Region::compressed);
    (same_selection && policy.accepts(extra.root, &extra.nodes, root, nodes))
        .then(|| (prior.id(), extra.params.clone()))
}

#[cfg(test)]
#[path = "../../tests/unit/session/stroke_session.rs"]
mod tests;
