use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::document::content::ContentHandle;
use crate::foundation::core::{LodLevel, NodeId, Rect};
use crate::region::area::Region;

/// How a node's transformed preview relates to its committed effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Plain pixel layer: the preview is the committed result.
    #[default]
    Raster,
    /// Layer whose true content is re-derived from a live projection (external or decorated
    /// content). Previews of these nodes are temporary and are recomputed when committing.
    Decorated,
}

/// One layer or mask owned by the surrounding document.
///
/// The engine reads and writes node content but never creates or destroys nodes. Writes to
/// distinct nodes may happen concurrently, so implementations synchronize internally.
pub trait Node: fmt::Debug + Send + Sync {
    /// Stable identity.
    fn id(&self) -> NodeId;

    /// Preview semantics of this node.
    fn kind(&self) -> NodeKind {
        NodeKind::Raster
    }

    /// Locked or hidden nodes are skipped when a stroke begins.
    fn is_editable(&self) -> bool {
        true
    }

    /// Current content.
    fn content_snapshot(&self) -> ContentHandle;

    /// Replace the content, returning the changed area in the coordinate space of `content`.
    fn apply_content(&self, content: &ContentHandle) -> Region;

    /// Bounds of what is visible for this node, which may exceed its raw pixels.
    fn tight_visible_bounds(&self) -> Rect;

    /// Return `true` when committing a transform needs a structural document change
    /// (for example a mask switching type), even if the pixels end up unchanged.
    fn requires_structural_change(&self) -> bool {
        false
    }
}

/// Shared reference to a document node.
pub type NodeRef = Arc<dyn Node>;

/// In-memory node used by embedders without a document model and by tests.
pub struct MemoryNode {
    id: NodeId,
    kind: NodeKind,
    editable: bool,
    structural: bool,
    content: RwLock<ContentHandle>,
}

impl MemoryNode {
    /// Editable raster node holding `content`.
    pub fn new(id: NodeId, content: ContentHandle) -> Self {
        Self {
            id,
            kind: NodeKind::Raster,
            editable: true,
            structural: false,
            content: RwLock::new(content),
        }
    }

    /// Builder: change the node kind.
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder: mark the node locked.
    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Builder: require a structural change when committing.
    pub fn with_structural_change(mut self) -> Self {
        self.structural = true;
        self
    }

    /// Wrap into a [`NodeRef`].
    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}

impl fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("editable", &self.editable)
            .finish_non_exhaustive()
    }
}

impl Node for MemoryNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn is_editable(&self) -> bool {
        self.editable
    }

    fn content_snapshot(&self) -> ContentHandle {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn apply_content(&self, content: &ContentHandle) -> Region {
        let mut slot = self.content.write().unwrap_or_else(PoisonError::into_inner);
        let old = std::mem::replace(&mut *slot, content.clone());
        drop(slot);

        if old == *content {
            return Region::new();
        }
        let mut changed = Region::from_rect(LodLevel::rescale_rect(
            old.bounds(),
            old.lod(),
            content.lod(),
        ));
        changed.add_rect(content.bounds());
        changed
    }

    fn tight_visible_bounds(&self) -> Rect {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bounds()
    }

    fn requires_structural_change(&self) -> bool {
        self.structural
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/node.rs"]
mod tests;
