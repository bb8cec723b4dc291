use std::sync::{Mutex, PoisonError};

use crate::foundation::core::{LodLevel, NodeId};
use crate::region::area::Region;

/// Downstream redraw trigger.
///
/// Called once per node entry of every flushed dirty-region snapshot, and directly by commands
/// applied outside a stroke (history undo/redo).
pub trait Renderer: Send + Sync {
    /// `region` is expressed in the coordinate space of `lod`.
    fn notify_region_dirty(&self, node: NodeId, region: &Region, lod: LodLevel);
}

/// Renderer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn notify_region_dirty(&self, _node: NodeId, _region: &Region, _lod: LodLevel) {}
}

/// One recorded redraw request.
#[derive(Clone, Debug, PartialEq)]
pub struct DirtyNotice {
    /// Node to redraw.
    pub node: NodeId,
    /// Area to redraw.
    pub region: Region,
    /// Coordinate space of `region`.
    pub lod: LodLevel,
}

/// Renderer that keeps every notification, for inspection.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    notices: Mutex<Vec<DirtyNotice>>,
}

impl RecordingRenderer {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn notices(&self) -> Vec<DirtyNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain recorded notifications.
    pub fn take(&self) -> Vec<DirtyNotice> {
        std::mem::take(&mut *self.notices.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Renderer for RecordingRenderer {
    fn notify_region_dirty(&self, node: NodeId, region: &Region, lod: LodLevel) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DirtyNotice {
                node,
                region: region.clone(),
                lod,
            });
    }
}
