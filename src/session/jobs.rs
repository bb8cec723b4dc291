use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::command::arena::{CommandArena, CommandId};
use crate::command::command::{Command, CommandCx, Effect};
use crate::command::history::SharedHistory;
use crate::command::macro_command::{MacroCommand, MacroId};
use crate::document::content::ContentHandle;
use crate::document::node::{NodeKind, NodeRef};
use crate::document::renderer::Renderer;
use crate::foundation::core::{LodLevel, NodeId, Rect};
use crate::foundation::error::{StrokeError, StrokeResult, consistency_fault};
use crate::region::area::Region;
use crate::region::tracker::BatchRegionTracker;
use crate::schedule::job::{Job, JobAccess, JobClass};
use crate::session::extra::{TRANSFORM_MERGE_KEY, TransformExtra};
use crate::session::state::{CommandGroup, SessionState, SessionStats};
use crate::transform::params::ParamsHandle;
use crate::transform::routine::TransformRoutine;

/// Receives the working bounds once initialization has snapshotted every node.
pub(crate) type InitCallback = Box<dyn FnOnce(Rect) + Send>;

/// Slot used for records that belong to no node.
const NO_SLOT: usize = usize::MAX;

/// Pre-stroke content of every processed node, at full resolution and at each level of detail
/// a preview asked for.
#[derive(Debug, Default)]
struct PristineCache {
    full: BTreeMap<NodeId, ContentHandle>,
    reduced: BTreeMap<(NodeId, LodLevel), ContentHandle>,
}

impl PristineCache {
    fn insert(&mut self, node: NodeId, content: ContentHandle) {
        self.reduced.retain(|(id, _), _| *id != node);
        self.full.insert(node, content);
    }

    fn ensure_lod(&mut self, lod: LodLevel) {
        if lod.is_full() {
            return;
        }
        for (id, content) in &self.full {
            self.reduced
                .entry((*id, lod))
                .or_insert_with(|| content.at_lod(lod));
        }
    }

    fn source(&self, node: NodeId, lod: LodLevel) -> Option<&ContentHandle> {
        if lod.is_full() {
            self.full.get(&node)
        } else {
            self.reduced.get(&(node, lod))
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct RecordedCommand {
    id: CommandId,
    group: CommandGroup,
    slot: usize,
    seq: u64,
}

#[derive(Debug)]
struct PendingCommand {
    slot: usize,
    group: CommandGroup,
    cmd: Command,
}

#[derive(Debug)]
struct NodeSnapshot {
    slot: usize,
    node: NodeId,
    content: ContentHandle,
    visible: Rect,
}

/// Results handed from shared-access jobs to the next barrier.
#[derive(Debug, Default)]
struct JobInbox {
    snapshots: Vec<NodeSnapshot>,
    commands: Vec<PendingCommand>,
    effects: Vec<(usize, Effect)>,
    failed_slots: BTreeSet<usize>,
}

/// Full-resolution and preview-resolution dirty tracking.
#[derive(Debug)]
struct RegionTrackers {
    full: BatchRegionTracker,
    preview: BatchRegionTracker,
}

impl RegionTrackers {
    fn new(preview_lod: LodLevel) -> Self {
        Self {
            full: BatchRegionTracker::new(LodLevel::FULL),
            preview: BatchRegionTracker::new(preview_lod),
        }
    }

    fn set_preview_lod(&mut self, lod: LodLevel) {
        if !lod.is_full() && self.preview.lod() != lod {
            self.preview = self.preview.rescaled(lod);
        }
    }

    fn record(&mut self, effect: &Effect) {
        if effect.lod.is_full() {
            self.full.add_update(effect.node, &effect.region);
        } else if effect.lod == self.preview.lod() {
            self.preview.add_update(effect.node, &effect.region);
        } else {
            let region = effect.region.rescaled(effect.lod, self.preview.lod());
            self.preview.add_update(effect.node, &region);
        }
    }

    fn flush(&mut self, renderer: &dyn Renderer) -> usize {
        let mut notified = 0;
        for tracker in [&mut self.full, &mut self.preview] {
            if tracker.is_empty() {
                continue;
            }
            let snapshot = tracker.take_and_clear();
            for (node, region) in &snapshot.entries {
                renderer.notify_region_dirty(*node, region, snapshot.lod);
                notified += 1;
            }
        }
        notified
    }
}

/// What the node contents currently show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct AppliedPreview {
    pub(crate) revision: u64,
    pub(crate) lod: LodLevel,
    pub(crate) had_failures: bool,
}

/// Everything [`StrokeState::new`] needs.
pub(crate) struct StrokeSetup {
    pub(crate) label: String,
    pub(crate) nodes: Vec<NodeRef>,
    pub(crate) root: NodeId,
    pub(crate) routine: Arc<dyn TransformRoutine>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) history: SharedHistory,
    pub(crate) overridden: Option<MacroId>,
    pub(crate) preview_lod: LodLevel,
    pub(crate) selection: Option<Region>,
    pub(crate) status: Arc<Mutex<SessionState>>,
    pub(crate) on_initialized: Option<InitCallback>,
}

/// State shared by the jobs of one stroke.
///
/// Concurrent jobs only read it and post their results to the inbox; the ledger, cache and
/// trackers change inside barriers only.
pub(crate) struct StrokeState {
    label: String,
    nodes: Vec<NodeRef>,
    root: NodeId,
    cache: PristineCache,
    arena: CommandArena,
    ledger: Vec<RecordedCommand>,
    stash: Vec<RecordedCommand>,
    next_seq: u64,
    trackers: RegionTrackers,
    inbox: Mutex<JobInbox>,
    routine: Arc<dyn TransformRoutine>,
    renderer: Arc<dyn Renderer>,
    history: SharedHistory,
    updates_suppressed: bool,
    overridden: Option<MacroId>,
    phase: SessionState,
    status: Arc<Mutex<SessionState>>,
    selection: Option<Region>,
    working_bounds: Region,
    on_initialized: Mutex<Option<InitCallback>>,
    applied: AppliedPreview,
    final_pass_failed: bool,
    stats: SessionStats,
    committed: Option<MacroId>,
}

impl fmt::Debug for StrokeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrokeState")
            .field("root", &self.root)
            .field("nodes", &self.nodes.len())
            .field("phase", &self.phase)
            .field("recorded", &self.ledger.len())
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

impl StrokeState {
    pub(crate) fn new(setup: StrokeSetup) -> Self {
        let phase = *setup.status.lock().unwrap_or_else(PoisonError::into_inner);
        Self {
            label: setup.label,
            nodes: setup.nodes,
            root: setup.root,
            cache: PristineCache::default(),
            arena: CommandArena::new(),
            ledger: Vec::new(),
            stash: Vec::new(),
            next_seq: 0,
            trackers: RegionTrackers::new(setup.preview_lod),
            inbox: Mutex::new(JobInbox::default()),
            routine: setup.routine,
            renderer: setup.renderer,
            history: setup.history,
            updates_suppressed: true,
            overridden: setup.overridden,
            phase,
            status: setup.status,
            selection: setup.selection.map(|s| s.compressed()),
            working_bounds: Region::new(),
            on_initialized: Mutex::new(setup.on_initialized),
            applied: AppliedPreview::default(),
            final_pass_failed: false,
            stats: SessionStats::default(),
            committed: None,
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn phase(&self) -> SessionState {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SessionState) {
        if self.phase == phase {
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?phase, "stroke phase");
        self.phase = phase;
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    pub(crate) fn stats(&self) -> SessionStats {
        self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut SessionStats {
        &mut self.stats
    }

    pub(crate) fn committed(&self) -> Option<MacroId> {
        self.committed
    }

    pub(crate) fn requires_structural_change(&self) -> bool {
        self.nodes.iter().any(|n| n.requires_structural_change())
    }

    /// Whether the preview on screen can become the committed result as is.
    pub(crate) fn needs_final_pass(&self, revision: u64) -> bool {
        self.applied.revision != revision
            || !self.applied.lod.is_full()
            || self.applied.had_failures
            || self
                .ledger
                .iter()
                .any(|r| r.group == CommandGroup::TransformPreviewTemporary)
    }

    fn cx(&self) -> CommandCx<'_> {
        CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        }
    }

    fn post(&self, f: impl FnOnce(&mut JobInbox)) {
        let mut inbox = self.inbox.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *inbox);
    }

    fn node(&self, slot: usize) -> StrokeResult<&NodeRef> {
        self.nodes
            .get(slot)
            .ok_or_else(|| consistency_fault(format!("job addressed unknown node slot {slot}")))
    }

    // Shared-access steps.

    fn clear_node(&self, slot: usize) -> StrokeResult<()> {
        let node = self.node(slot)?;
        let content = node.content_snapshot();
        let (pristine, cleared, visible) = match &self.selection {
            Some(selection) => (
                content.masked(selection),
                content.cleared(selection),
                selection.bounds(),
            ),
            None => (
                content.clone(),
                ContentHandle::empty(LodLevel::FULL),
                node.tight_visible_bounds(),
            ),
        };
        let mut cmd = Command::content("Clear", Arc::clone(node), content, cleared);
        let effect = cmd.redo(&self.cx())?;
        self.post(|inbox| {
            inbox.snapshots.push(NodeSnapshot {
                slot,
                node: node.id(),
                content: pristine,
                visible,
            });
            inbox.commands.push(PendingCommand {
                slot,
                group: CommandGroup::Clear,
                cmd,
            });
            if let Some(effect) = effect {
                inbox.effects.push((slot, effect));
            }
        });
        Ok(())
    }

    fn transform_node(
        &self,
        slot: usize,
        params: &ParamsHandle,
        revision: u64,
        final_pass: bool,
        lod: LodLevel,
    ) -> StrokeResult<()> {
        let node = self.node(slot)?;
        let src = self.cache.source(node.id(), lod).ok_or_else(|| {
            consistency_fault(format!(
                "no pristine content for {:?} at level {}",
                node.id(),
                lod.0
            ))
        })?;
        if src.is_empty() {
            // nothing of this node to move
            return Ok(());
        }
        let before = node.content_snapshot();
        let dst = before.at_lod(lod);

        let output = match self.routine.apply(params.as_ref(), src, &dst) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    node = ?node.id(),
                    revision,
                    lod = lod.0,
                    error = %e,
                    "transform routine failed, keeping the previous result"
                );
                self.post(|inbox| {
                    inbox.failed_slots.insert(slot);
                });
                return Ok(());
            }
        };

        let group = if final_pass {
            CommandGroup::Transform
        } else if node.kind() == NodeKind::Decorated {
            CommandGroup::TransformPreviewTemporary
        } else {
            CommandGroup::TransformPreview
        };
        let mut cmd = Command::content("Transform", Arc::clone(node), before, output.content);
        let effect = cmd.redo(&self.cx())?.map(|mut effect| {
            effect.region.union_with(&output.changed);
            effect
        });
        self.post(|inbox| {
            inbox.commands.push(PendingCommand { slot, group, cmd });
            if let Some(effect) = effect {
                inbox.effects.push((slot, effect));
            }
        });
        Ok(())
    }

    fn record_separator(&self) -> StrokeResult<()> {
        let mut cmd = Command::separator("Transform separator");
        cmd.redo(&self.cx())?;
        self.post(|inbox| {
            inbox.commands.push(PendingCommand {
                slot: NO_SLOT,
                group: CommandGroup::Transform,
                cmd,
            });
        });
        Ok(())
    }

    // Barrier steps.

    /// Move everything posted since the last barrier into the ledger, cache and trackers.
    ///
    /// Results are taken in slot order, so the outcome does not depend on which concurrent job
    /// finished first. Returns the slots whose routine failed.
    fn harvest(&mut self) -> BTreeSet<usize> {
        let JobInbox {
            mut snapshots,
            mut commands,
            mut effects,
            failed_slots,
        } = std::mem::take(self.inbox.get_mut().unwrap_or_else(PoisonError::into_inner));

        snapshots.sort_by_key(|s| s.slot);
        for snap in snapshots {
            self.cache.insert(snap.node, snap.content);
            self.working_bounds.add_rect(snap.visible);
        }
        commands.sort_by_key(|c| c.slot);
        for pending in commands {
            self.record(pending.cmd, pending.group, pending.slot);
        }
        effects.sort_by_key(|(slot, _)| *slot);
        for (_, effect) in &effects {
            self.trackers.record(effect);
        }
        failed_slots
    }

    fn record(&mut self, cmd: Command, group: CommandGroup, slot: usize) {
        let id = self.arena.insert(cmd);
        self.ledger.push(RecordedCommand {
            id,
            group,
            slot,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    fn take_preview_records(&mut self) -> Vec<RecordedCommand> {
        let (preview, keep): (Vec<RecordedCommand>, Vec<RecordedCommand>) =
            std::mem::take(&mut self.ledger)
                .into_iter()
                .partition(|r| r.group.is_preview());
        self.ledger = keep;
        preview
    }

    fn drop_stash(&mut self) -> StrokeResult<()> {
        for rec in std::mem::take(&mut self.stash) {
            self.arena.remove(rec.id)?;
        }
        Ok(())
    }

    fn undo_preview(&mut self, lod: LodLevel) -> StrokeResult<()> {
        self.harvest();
        self.drop_stash()?;
        let preview = self.take_preview_records();
        let cx = CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        };
        for rec in preview.iter().rev() {
            if let Some(effect) = self.arena.expect_mut(rec.id)?.undo(&cx)? {
                self.trackers.record(&effect);
            }
        }
        self.stash = preview;
        self.cache.ensure_lod(lod);
        self.trackers.set_preview_lod(lod);
        Ok(())
    }

    fn finish_pass(&mut self, revision: u64, final_pass: bool, lod: LodLevel) -> StrokeResult<()> {
        let failed = self.harvest();
        self.stats.failed_transforms += failed.len() as u64;
        if final_pass && !failed.is_empty() {
            self.abandon_final_pass()?;
            let notified = self.flush();
            tracing::warn!(
                revision,
                failed = failed.len(),
                notified,
                "final pass failed, previous preview restored"
            );
            return Ok(());
        }

        let cx = CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        };
        for rec in std::mem::take(&mut self.stash) {
            if !failed.contains(&rec.slot) {
                self.arena.remove(rec.id)?;
                continue;
            }
            if let Some(effect) = self.arena.expect_mut(rec.id)?.redo(&cx)? {
                self.trackers.record(&effect);
            }
            self.ledger.push(RecordedCommand {
                seq: self.next_seq,
                ..rec
            });
            self.next_seq += 1;
        }
        self.applied = AppliedPreview {
            revision,
            lod,
            had_failures: !failed.is_empty(),
        };
        if failed.is_empty() {
            self.stats.last_applied_revision = revision;
        }
        let notified = self.flush();
        tracing::debug!(revision, lod = lod.0, final_pass, notified, "pass harvested");
        Ok(())
    }

    /// Undo the separator and every transform of a failed final pass, then put the stashed
    /// preview back on screen. The following `Commit` job reports the failure.
    fn abandon_final_pass(&mut self) -> StrokeResult<()> {
        let (finals, keep): (Vec<RecordedCommand>, Vec<RecordedCommand>) =
            std::mem::take(&mut self.ledger)
                .into_iter()
                .partition(|r| r.group == CommandGroup::Transform);
        self.ledger = keep;
        let cx = CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        };
        for rec in finals.iter().rev() {
            let mut cmd = self.arena.remove(rec.id)?;
            if let Some(effect) = cmd.undo(&cx)? {
                self.trackers.record(&effect);
            }
        }
        for rec in std::mem::take(&mut self.stash) {
            if let Some(effect) = self.arena.expect_mut(rec.id)?.redo(&cx)? {
                self.trackers.record(&effect);
            }
            self.ledger.push(RecordedCommand {
                seq: self.next_seq,
                ..rec
            });
            self.next_seq += 1;
        }
        self.final_pass_failed = true;
        Ok(())
    }

    fn promote_preview(&mut self) -> StrokeResult<()> {
        self.harvest();
        for rec in self.take_preview_records() {
            if rec.group == CommandGroup::TransformPreviewTemporary {
                return Err(consistency_fault(
                    "temporary preview cannot be promoted to the committed result",
                ));
            }
            self.ledger.push(RecordedCommand {
                group: CommandGroup::Transform,
                seq: self.next_seq,
                ..rec
            });
            self.next_seq += 1;
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.harvest();
        let bounds = self.working_bounds.bounds();
        let callback = self
            .on_initialized
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(callback) = callback {
            callback(bounds);
        }
        self.set_phase(SessionState::Previewing);
        self.flush();
    }

    fn undo_overridden(&mut self) -> StrokeResult<()> {
        self.harvest();
        let Some(id) = self.overridden else {
            return Ok(());
        };
        let cx = CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        };
        let effects = {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            let prior = history
                .last_committed_mut()
                .filter(|m| m.id() == id)
                .ok_or_else(|| consistency_fault(format!("continued macro {id:?} is not on top")))?;
            prior.undo_all(&cx)?
        };
        for effect in &effects {
            self.trackers.record(effect);
        }
        tracing::debug!(macro_id = ?id, "continued macro undone in place");
        Ok(())
    }

    fn commit(&mut self, params: ParamsHandle) -> StrokeResult<()> {
        self.harvest();
        if std::mem::take(&mut self.final_pass_failed) {
            return Err(StrokeError::routine(
                "transform routine failed at full resolution; the preview was kept",
            ));
        }
        let mut macro_cmd =
            MacroCommand::new(self.label.clone()).with_merge_key(TRANSFORM_MERGE_KEY);
        let mut records = std::mem::take(&mut self.ledger);
        records.sort_by_key(|r| r.seq);
        for rec in records {
            let cmd = self.arena.remove(rec.id)?;
            if rec.group.is_preview() {
                return Err(consistency_fault(format!(
                    "{:?} command '{}' reached commit",
                    rec.group,
                    cmd.label()
                )));
            }
            macro_cmd.push_child(cmd)?;
        }
        self.drop_stash()?;
        macro_cmd.set_extra(Box::new(TransformExtra {
            params,
            root: self.root,
            nodes: self.nodes.iter().map(|n| n.id()).collect(),
            selection: self.selection.clone(),
        }));

        let macro_id = macro_cmd.id();
        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prior) = self.overridden {
                let linked = history
                    .get(prior)
                    .is_some_and(|p| macro_cmd.try_set_override(p));
                if !linked {
                    return Err(consistency_fault(format!(
                        "cannot link override of continued macro {prior:?}"
                    )));
                }
            }
            history.push(macro_cmd)?;
            history.set_busy(false);
        }
        self.committed = Some(macro_id);
        self.flush();
        self.set_phase(SessionState::Committed);
        tracing::debug!(macro_id = ?macro_id, "stroke committed");
        Ok(())
    }

    fn rollback(&mut self) -> StrokeResult<()> {
        self.harvest();
        self.drop_stash()?;
        let cx = CommandCx {
            renderer: self.renderer.as_ref(),
            updates_suppressed: self.updates_suppressed,
        };
        let mut records = std::mem::take(&mut self.ledger);
        records.sort_by_key(|r| std::cmp::Reverse(r.seq));
        for rec in records {
            let mut cmd = self.arena.remove(rec.id)?;
            if let Some(effect) = cmd.undo(&cx)? {
                self.trackers.record(&effect);
            }
        }

        {
            let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = self.overridden {
                let prior = history
                    .last_committed_mut()
                    .filter(|m| m.id() == id)
                    .ok_or_else(|| {
                        consistency_fault(format!("continued macro {id:?} is not on top"))
                    })?;
                for effect in prior.redo_all(&cx)? {
                    self.trackers.record(&effect);
                }
            }
            history.set_busy(false);
        }
        self.flush();
        self.set_phase(SessionState::Cancelled);
        tracing::debug!("stroke rolled back");
        Ok(())
    }

    fn flush(&mut self) -> usize {
        self.trackers.flush(self.renderer.as_ref())
    }
}

/// Steps of a stroke.
#[derive(Clone, Debug)]
pub(crate) enum JobKind {
    /// Undo the continued macro in place before snapshotting.
    UndoOverridden,
    /// Snapshot a node into the pristine cache and clear it.
    ClearNode { slot: usize },
    /// Publish snapshots and working bounds; enter `Previewing`.
    Publish,
    /// Undo the previous preview and prepare sources at the job's level.
    UndoPreview,
    /// Re-render one node from its pristine content.
    TransformNode {
        slot: usize,
        params: ParamsHandle,
        revision: u64,
        final_pass: bool,
    },
    /// Record the pass and flush dirty regions.
    Harvest { revision: u64, final_pass: bool },
    /// Boundary between the clear and transform commands of the committed macro.
    Separator,
    /// Keep the full-resolution preview as the committed result.
    PromotePreview,
    /// Fold recorded commands into a macro and push it to history.
    Commit { params: ParamsHandle },
    /// Undo everything recorded and release history.
    Rollback,
}

impl JobKind {
    fn name(&self) -> &'static str {
        match self {
            Self::UndoOverridden => "undo_overridden",
            Self::ClearNode { .. } => "clear_node",
            Self::Publish => "publish",
            Self::UndoPreview => "undo_preview",
            Self::TransformNode { .. } => "transform_node",
            Self::Harvest { .. } => "harvest",
            Self::Separator => "separator",
            Self::PromotePreview => "promote_preview",
            Self::Commit { .. } => "commit",
            Self::Rollback => "rollback",
        }
    }
}

/// One scheduled step of a stroke.
#[derive(Clone, Debug)]
pub(crate) struct StrokeJob {
    pub(crate) kind: JobKind,
    pub(crate) lod: LodLevel,
    pub(crate) cancellable: bool,
}

impl StrokeJob {
    pub(crate) fn new(kind: JobKind, cancellable: bool) -> Self {
        Self {
            kind,
            lod: LodLevel::FULL,
            cancellable,
        }
    }
}

impl Job for StrokeJob {
    type State = StrokeState;

    fn class(&self) -> JobClass {
        match self.kind {
            JobKind::ClearNode { .. } | JobKind::TransformNode { .. } => JobClass::Concurrent,
            JobKind::Separator => JobClass::Sequential,
            _ => JobClass::Barrier,
        }
    }

    fn level_of_detail(&self) -> LodLevel {
        self.lod
    }

    fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    fn lod_clone(&self, level: LodLevel) -> Option<Self> {
        let kind = match &self.kind {
            JobKind::TransformNode {
                slot,
                params,
                revision,
                final_pass: false,
            } => JobKind::TransformNode {
                slot: *slot,
                params: params.at_lod(level),
                revision: *revision,
                final_pass: false,
            },
            JobKind::UndoPreview => JobKind::UndoPreview,
            JobKind::Harvest {
                revision,
                final_pass: false,
            } => JobKind::Harvest {
                revision: *revision,
                final_pass: false,
            },
            _ => return None,
        };
        Some(Self {
            kind,
            lod: level,
            cancellable: self.cancellable,
        })
    }

    fn run(self, access: JobAccess<'_, StrokeState>) -> StrokeResult<()> {
        tracing::trace!(job = self.kind.name(), lod = self.lod.0, "job");
        match self.kind {
            JobKind::ClearNode { slot } => access.shared().clear_node(slot),
            JobKind::TransformNode {
                slot,
                params,
                revision,
                final_pass,
            } => access
                .shared()
                .transform_node(slot, &params, revision, final_pass, self.lod),
            JobKind::Separator => access.shared().record_separator(),
            JobKind::UndoOverridden => access.exclusive()?.undo_overridden(),
            JobKind::Publish => {
                access.exclusive()?.publish();
                Ok(())
            }
            JobKind::UndoPreview => access.exclusive()?.undo_preview(self.lod),
            JobKind::Harvest {
                revision,
                final_pass,
            } => access
                .exclusive()?
                .finish_pass(revision, final_pass, self.lod),
            JobKind::PromotePreview => access.exclusive()?.promote_preview(),
            JobKind::Commit { params } => access.exclusive()?.commit(params),
            JobKind::Rollback => access.exclusive()?.rollback(),
        }
    }
}
