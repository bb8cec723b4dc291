use std::sync::atomic::{AtomicU64, Ordering};

use crate::command::command::{Command, CommandCx, Effect, ExtraData};
use crate::foundation::error::{StrokeResult, consistency_fault};

static NEXT_MACRO_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`MacroCommand`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct MacroId(pub u64);

impl MacroId {
    fn next() -> Self {
        Self(NEXT_MACRO_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Named, ordered group of commands that undoes and redoes as one edit.
///
/// Undo walks children in strict reverse order, redo in forward order.
#[derive(Debug)]
pub struct MacroCommand {
    id: MacroId,
    label: String,
    children: Vec<Command>,
    merge_key: Option<u32>,
    mergeable: bool,
    overrides: Option<MacroId>,
    extra: Option<Box<dyn ExtraData>>,
}

impl MacroCommand {
    /// Empty macro with a fresh id.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: MacroId::next(),
            label: label.into(),
            children: Vec::new(),
            merge_key: None,
            mergeable: false,
            overrides: None,
            extra: None,
        }
    }

    /// Builder: tag the macro with the kind of edit it records (used for override and merge
    /// compatibility checks).
    pub fn with_merge_key(mut self, key: u32) -> Self {
        self.merge_key = Some(key);
        self
    }

    /// Builder: allow consecutive macros with the same merge key to collapse into one.
    pub fn mergeable(mut self) -> Self {
        self.mergeable = true;
        self
    }

    /// Identity.
    pub fn id(&self) -> MacroId {
        self.id
    }

    /// Label shown in history.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Edit-kind tag.
    pub fn merge_key(&self) -> Option<u32> {
        self.merge_key
    }

    /// Macro this one supersedes, if any.
    pub fn overrides(&self) -> Option<MacroId> {
        self.overrides
    }

    /// Children in application order.
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Return `true` without children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Return `true` when every child's forward effect is in place.
    pub fn is_applied(&self) -> bool {
        self.children.iter().all(Command::is_applied)
    }

    /// Attached intent payload.
    pub fn extra(&self) -> Option<&dyn ExtraData> {
        self.extra.as_deref()
    }

    /// Attached payload downcast to `T`.
    pub fn extra_as<T: ExtraData>(&self) -> Option<&T> {
        self.extra.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Attach an intent payload.
    pub fn set_extra(&mut self, extra: Box<dyn ExtraData>) {
        self.extra = Some(extra);
    }

    /// Append a child. A command belongs to at most one macro.
    pub fn push_child(&mut self, mut cmd: Command) -> StrokeResult<()> {
        if let Some(parent) = cmd.parent() {
            return Err(consistency_fault(format!(
                "command '{}' already belongs to macro {parent:?}",
                cmd.label()
            )));
        }
        cmd.set_parent(self.id);
        self.children.push(cmd);
        Ok(())
    }

    /// Undo every child in reverse order.
    pub fn undo_all(&mut self, cx: &CommandCx<'_>) -> StrokeResult<Vec<Effect>> {
        let mut effects = Vec::with_capacity(self.children.len());
        for cmd in self.children.iter_mut().rev() {
            effects.extend(cmd.undo(cx)?);
        }
        Ok(effects)
    }

    /// Redo every child in forward order.
    pub fn redo_all(&mut self, cx: &CommandCx<'_>) -> StrokeResult<Vec<Effect>> {
        let mut effects = Vec::with_capacity(self.children.len());
        for cmd in &mut self.children {
            effects.extend(cmd.redo(cx)?);
        }
        Ok(effects)
    }

    /// Mark this macro as superseding `prior`.
    ///
    /// Succeeds only when both carry the same merge key; returns whether the link was set.
    pub fn try_set_override(&mut self, prior: &MacroCommand) -> bool {
        if prior.id == self.id || self.merge_key.is_none() || self.merge_key != prior.merge_key {
            return false;
        }
        self.overrides = Some(prior.id);
        true
    }

    /// Fold a newer macro into this one when both are mergeable with the same key.
    ///
    /// On success `newer`'s children follow this macro's children and its payload replaces this
    /// one's. Otherwise `newer` is handed back untouched.
    pub fn try_merge(&mut self, newer: MacroCommand) -> Result<(), MacroCommand> {
        let compatible = self.mergeable
            && newer.mergeable
            && self.merge_key.is_some()
            && self.merge_key == newer.merge_key
            && self.is_applied()
            && newer.is_applied();
        if !compatible {
            return Err(newer);
        }
        let MacroCommand {
            children, extra, ..
        } = newer;
        for mut cmd in children {
            cmd.set_parent(self.id);
            self.children.push(cmd);
        }
        if extra.is_some() {
            self.extra = extra;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/macro_command.rs"]
mod tests;
