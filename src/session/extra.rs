use std::any::Any;

use crate::command::command::ExtraData;
use crate::foundation::core::NodeId;
use crate::region::area::Region;
use crate::transform::params::ParamsHandle;

/// Merge key carried by every committed transform macro.
pub const TRANSFORM_MERGE_KEY: u32 = 0x5452_4e53;

/// Intent attached to a committed transform: which parameters were applied to which nodes.
///
/// A later stroke reads it back to continue the transform from the original pixels.
#[derive(Clone, Debug)]
pub struct TransformExtra {
    /// Parameters of the committed transform, at full resolution.
    pub params: ParamsHandle,
    /// Node the stroke was started on.
    pub root: NodeId,
    /// Every processed node, in processing order.
    pub nodes: Vec<NodeId>,
    /// Pixels the stroke was restricted to, if any.
    pub selection: Option<Region>,
}

impl ExtraData for TransformExtra {
    fn clone_extra(&self) -> Box<dyn ExtraData> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
