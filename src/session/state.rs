use crate::command::macro_command::MacroId;

/// Lifecycle of a stroke.
///
/// `Initializing -> Previewing <-> Recomputing -> Finalizing -> Committed`, with `Cancelled`
/// reachable from every non-terminal state before finalizing starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Snapshotting and clearing the processed nodes.
    Initializing,
    /// Showing a preview; parameter updates are accepted.
    Previewing,
    /// A preview recompute is executing.
    Recomputing,
    /// Producing the committed result. No longer cancellable.
    Finalizing,
    /// The edit is in the undo history.
    Committed,
    /// Every recorded change was rolled back.
    Cancelled,
}

impl SessionState {
    /// Return `true` for `Committed` and `Cancelled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Cancelled)
    }

    /// Return `true` when a cancel request is accepted in this state.
    pub fn is_cancellable(self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Previewing | Self::Recomputing
        )
    }
}

/// Tag of a command recorded by a stroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandGroup {
    /// Clearing a node before it is re-rendered from its pristine snapshot.
    Clear,
    /// Committed transform result.
    Transform,
    /// Preview result, promoted to `Transform` when it already matches the committed one.
    TransformPreview,
    /// Preview of a node whose committed result is always re-derived. Never reaches history.
    TransformPreviewTemporary,
}

impl CommandGroup {
    /// Return `true` for both preview groups.
    pub fn is_preview(self) -> bool {
        matches!(self, Self::TransformPreview | Self::TransformPreviewTemporary)
    }
}

/// Counters describing one stroke.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct SessionStats {
    /// Preview recomputes issued for parameter updates (initialization's own pass excluded).
    pub recomputes: u64,
    /// Full-resolution passes run while finalizing.
    pub final_passes: u64,
    /// Parameter updates replaced by a newer one before being dispatched.
    pub coalesced: u64,
    /// Per-node routine failures absorbed as no-op cycles.
    pub failed_transforms: u64,
    /// Revision of the last pass that succeeded on every node (0 is the initial set).
    pub last_applied_revision: u64,
}

/// Result of [`crate::StrokeSession::commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A macro was pushed to the history.
    Committed {
        /// Identity of the pushed macro (an override replaces the previous entry in place).
        macro_id: MacroId,
        /// Final counters.
        stats: SessionStats,
    },
    /// The transform was the identity; nothing was recorded.
    Identity {
        /// Final counters.
        stats: SessionStats,
    },
}

impl CommitOutcome {
    /// Counters at the end of the stroke.
    pub fn stats(&self) -> SessionStats {
        match self {
            Self::Committed { stats, .. } | Self::Identity { stats } => *stats,
        }
    }

    /// Pushed macro, when one was.
    pub fn macro_id(&self) -> Option<MacroId> {
        match self {
            Self::Committed { macro_id, .. } => Some(*macro_id),
            Self::Identity { .. } => None,
        }
    }
}
