use std::any::Any;
use std::fmt;

use crate::command::macro_command::MacroId;
use crate::document::content::ContentHandle;
use crate::document::node::NodeRef;
use crate::document::renderer::Renderer;
use crate::foundation::core::{LodLevel, NodeId};
use crate::foundation::error::{StrokeResult, consistency_fault};
use crate::region::area::Region;

/// Opaque payload recording the intent behind a command (for example the transform
/// parameters that produced it), so it can be recovered without re-deriving it from pixels.
pub trait ExtraData: Any + fmt::Debug + Send + Sync {
    /// Boxed clone.
    fn clone_extra(&self) -> Box<dyn ExtraData>;

    /// Upcast for downcasting to the concrete payload.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn ExtraData> {
    fn clone(&self) -> Self {
        self.clone_extra()
    }
}

/// Area a command changed on one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    /// Touched node.
    pub node: NodeId,
    /// Coordinate space of `region`.
    pub lod: LodLevel,
    /// Changed area.
    pub region: Region,
}

/// Where command effects go when applied.
///
/// With updates suppressed (inside a stroke) the caller collects the returned [`Effect`] and
/// flushes it later; otherwise the command notifies the renderer itself.
#[derive(Clone, Copy)]
pub struct CommandCx<'a> {
    /// Redraw target.
    pub renderer: &'a dyn Renderer,
    /// Suppress direct renderer notifications.
    pub updates_suppressed: bool,
}

impl<'a> CommandCx<'a> {
    /// Commands notify `renderer` as they apply.
    pub fn direct(renderer: &'a dyn Renderer) -> Self {
        Self {
            renderer,
            updates_suppressed: false,
        }
    }

    /// Commands only return their effects.
    pub fn suppressed(renderer: &'a dyn Renderer) -> Self {
        Self {
            renderer,
            updates_suppressed: true,
        }
    }

    fn publish(&self, effect: &Effect) {
        if !self.updates_suppressed && !effect.region.is_empty() {
            self.renderer
                .notify_region_dirty(effect.node, &effect.region, effect.lod);
        }
    }
}

impl fmt::Debug for CommandCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCx")
            .field("updates_suppressed", &self.updates_suppressed)
            .finish_non_exhaustive()
    }
}

/// Document mutation kinds.
#[derive(Clone, Debug)]
pub enum CommandOp {
    /// Swap a node's content between two snapshots.
    Content {
        /// Target node.
        node: NodeRef,
        /// Content restored by undo.
        before: ContentHandle,
        /// Content installed by redo.
        after: ContentHandle,
    },
    /// Boundary marker between phases of a macro; no document effect.
    Separator,
}

/// Application state of a [`Command`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandState {
    /// Constructed, never applied.
    Pending,
    /// Forward effect in place.
    Applied,
    /// Reversed after having been applied.
    Undone,
}

/// One reversible document mutation.
///
/// Construction never touches the document: the first [`Command::redo`] applies it. A pending
/// command dropped without being applied leaves no trace. Commands are not `Clone`;
/// each has exactly one owner (arena, macro, or history).
#[derive(Debug)]
pub struct Command {
    label: String,
    op: CommandOp,
    state: CommandState,
    extra: Option<Box<dyn ExtraData>>,
    parent: Option<MacroId>,
}

impl Command {
    /// Replace `node`'s content `before -> after`.
    pub fn content(
        label: impl Into<String>,
        node: NodeRef,
        before: ContentHandle,
        after: ContentHandle,
    ) -> Self {
        Self::from_op(label, CommandOp::Content {
            node,
            before,
            after,
        })
    }

    /// Effect-free boundary marker.
    pub fn separator(label: impl Into<String>) -> Self {
        Self::from_op(label, CommandOp::Separator)
    }

    fn from_op(label: impl Into<String>, op: CommandOp) -> Self {
        Self {
            label: label.into(),
            op,
            state: CommandState::Pending,
            extra: None,
            parent: None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Operation payload.
    pub fn op(&self) -> &CommandOp {
        &self.op
    }

    /// Current application state.
    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Return `true` while the forward effect is in place.
    pub fn is_applied(&self) -> bool {
        self.state == CommandState::Applied
    }

    /// Node touched by this command, if any.
    pub fn node_id(&self) -> Option<NodeId> {
        match &self.op {
            CommandOp::Content { node, .. } => Some(node.id()),
            CommandOp::Separator => None,
        }
    }

    /// Level of detail of the content this command installs.
    pub fn lod(&self) -> LodLevel {
        match &self.op {
            CommandOp::Content { after, .. } => after.lod(),
            CommandOp::Separator => LodLevel::FULL,
        }
    }

    /// Attached intent payload.
    pub fn extra(&self) -> Option<&dyn ExtraData> {
        self.extra.as_deref()
    }

    /// Attached payload downcast to `T`.
    pub fn extra_as<T: ExtraData>(&self) -> Option<&T> {
        self.extra.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Attach an intent payload, replacing any previous one.
    pub fn set_extra(&mut self, extra: Box<dyn ExtraData>) {
        self.extra = Some(extra);
    }

    /// Macro owning this command.
    pub fn parent(&self) -> Option<MacroId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: MacroId) {
        self.parent = Some(parent);
    }

    /// Apply the forward effect. Valid from `Pending` or `Undone`.
    pub fn redo(&mut self, cx: &CommandCx<'_>) -> StrokeResult<Option<Effect>> {
        if self.state == CommandState::Applied {
            return Err(consistency_fault(format!(
                "redo of '{}' without a preceding undo",
                self.label
            )));
        }
        let effect = match &self.op {
            CommandOp::Content { node, after, .. } => Some(Effect {
                node: node.id(),
                lod: after.lod(),
                region: node.apply_content(after),
            }),
            CommandOp::Separator => None,
        };
        self.state = CommandState::Applied;
        if let Some(effect) = &effect {
            cx.publish(effect);
        }
        Ok(effect)
    }

    /// Reverse the forward effect. Valid from `Applied` only.
    pub fn undo(&mut self, cx: &CommandCx<'_>) -> StrokeResult<Option<Effect>> {
        if self.state != CommandState::Applied {
            return Err(consistency_fault(format!(
                "undo of '{}' while {:?}",
                self.label, self.state
            )));
        }
        let effect = match &self.op {
            CommandOp::Content { node, before, .. } => Some(Effect {
                node: node.id(),
                lod: before.lod(),
                region: node.apply_content(before),
            }),
            CommandOp::Separator => None,
        };
        self.state = CommandState::Undone;
        if let Some(effect) = &effect {
            cx.publish(effect);
        }
        Ok(effect)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/command.rs"]
mod tests;
