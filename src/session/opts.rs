use std::collections::BTreeSet;
use std::time::Duration;

use crate::foundation::core::{LodLevel, NodeId};
use crate::region::area::Region;
use crate::schedule::scheduler::SchedulerOpts;

/// When a new stroke continues the previously committed transform instead of stacking a new
/// one on top of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationPolicy {
    /// Always start a fresh transform.
    Never,
    /// Continue when the processed node sets are equal, in any order.
    SameNodeSet,
    /// Continue when the root node matches and the node sets are equal, in any order.
    #[default]
    SameRootAndNodeSet,
}

impl ContinuationPolicy {
    pub(crate) fn accepts(
        self,
        prior_root: NodeId,
        prior_nodes: &[NodeId],
        root: NodeId,
        nodes: &[NodeId],
    ) -> bool {
        let same_set = || {
            prior_nodes.iter().collect::<BTreeSet<_>>() == nodes.iter().collect::<BTreeSet<_>>()
        };
        match self {
            Self::Never => false,
            Self::SameNodeSet => same_set(),
            Self::SameRootAndNodeSet => prior_root == root && same_set(),
        }
    }
}

/// Options for [`crate::StrokeSession::begin`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SessionOpts {
    /// Label of the committed history entry.
    pub label: String,
    /// Resolution used for previews; commits always run at full resolution.
    pub preview_lod: LodLevel,
    /// Minimum interval between the starts of two preview recomputes.
    pub throttle_ms: u64,
    /// Worker pool for per-node jobs.
    pub scheduler: SchedulerOpts,
    /// Continuation of the previous commit.
    pub continuation: ContinuationPolicy,
    /// Start a continued stroke from the caller's parameters instead of the previous commit's.
    pub force_reset: bool,
    /// Restrict the stroke to these full-resolution pixels. Only they are cleared and moved,
    /// and their bounds become the working bounds.
    pub selection: Option<Region>,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            label: "Transform".to_owned(),
            preview_lod: LodLevel::FULL,
            throttle_ms: 30,
            scheduler: SchedulerOpts::default(),
            continuation: ContinuationPolicy::default(),
            force_reset: false,
            selection: None,
        }
    }
}

impl SessionOpts {
    /// Throttle interval as a [`Duration`].
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}
