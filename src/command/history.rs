use std::fmt;
use std::sync::{Arc, Mutex};

use crate::command::command::CommandCx;
use crate::command::macro_command::{MacroCommand, MacroId};
use crate::document::renderer::{NullRenderer, Renderer};
use crate::foundation::error::{StrokeError, StrokeResult, consistency_fault};

/// History handle shared between the document and active strokes.
pub type SharedHistory = Arc<Mutex<UndoHistory>>;

/// Document-wide undo/redo stack of committed macros.
///
/// Entries before the cursor are applied, entries after it are undone and available to redo.
/// While a stroke holds the history busy, undo and redo are rejected.
pub struct UndoHistory {
    entries: Vec<MacroCommand>,
    cursor: usize,
    limit: Option<usize>,
    busy: bool,
    renderer: Arc<dyn Renderer>,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(Arc::new(NullRenderer))
    }
}

impl fmt::Debug for UndoHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoHistory")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("limit", &self.limit)
            .field("busy", &self.busy)
            .finish_non_exhaustive()
    }
}

impl UndoHistory {
    /// Empty history whose undo/redo notify `renderer`.
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: None,
            busy: false,
            renderer,
        }
    }

    /// Builder: keep at most `limit` applied entries, dropping the oldest.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self
    }

    /// Wrap for sharing with strokes.
    pub fn shared(self) -> SharedHistory {
        Arc::new(Mutex::new(self))
    }

    /// Total number of entries, including the redo tail.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` without entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of applied entries.
    pub fn applied_len(&self) -> usize {
        self.cursor
    }

    /// Return `true` when an entry can be undone.
    pub fn can_undo(&self) -> bool {
        !self.busy && self.cursor > 0
    }

    /// Return `true` when an entry can be redone.
    pub fn can_redo(&self) -> bool {
        !self.busy && self.cursor < self.entries.len()
    }

    /// Return `true` while a stroke holds the history.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Most recent applied macro.
    pub fn last_committed(&self) -> Option<&MacroCommand> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub(crate) fn last_committed_mut(&mut self) -> Option<&mut MacroCommand> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get_mut(i))
    }

    /// Macro with `id`, anywhere in the stack.
    pub fn get(&self, id: MacroId) -> Option<&MacroCommand> {
        self.entries.iter().find(|m| m.id() == id)
    }

    /// Record a committed macro.
    ///
    /// Drops the redo tail. A macro overriding the current top replaces it; a mergeable macro
    /// folds into a compatible top; anything else is appended.
    pub fn push(&mut self, mut macro_cmd: MacroCommand) -> StrokeResult<()> {
        if !macro_cmd.is_applied() {
            return Err(consistency_fault(format!(
                "macro '{}' pushed to history before being applied",
                macro_cmd.label()
            )));
        }
        self.entries.truncate(self.cursor);

        if let Some(top) = self.entries.last_mut() {
            if macro_cmd.overrides() == Some(top.id()) {
                tracing::debug!(
                    replaced = ?top.id(),
                    by = ?macro_cmd.id(),
                    "history entry overridden"
                );
                *top = macro_cmd;
                return Ok(());
            }
            match top.try_merge(macro_cmd) {
                Ok(()) => return Ok(()),
                Err(back) => macro_cmd = back,
            }
        }

        self.entries.push(macro_cmd);
        if let Some(limit) = self.limit
            && self.entries.len() > limit
        {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len();
        Ok(())
    }

    /// Undo the most recent applied macro. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> StrokeResult<bool> {
        self.ensure_idle("undo")?;
        let Some(idx) = self.cursor.checked_sub(1) else {
            return Ok(false);
        };
        let cx = CommandCx::direct(self.renderer.as_ref());
        self.entries[idx].undo_all(&cx)?;
        self.cursor = idx;
        Ok(true)
    }

    /// Redo the next undone macro. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> StrokeResult<bool> {
        self.ensure_idle("redo")?;
        if self.cursor >= self.entries.len() {
            return Ok(false);
        }
        let cx = CommandCx::direct(self.renderer.as_ref());
        self.entries[self.cursor].redo_all(&cx)?;
        self.cursor += 1;
        Ok(true)
    }

    fn ensure_idle(&self, what: &str) -> StrokeResult<()> {
        if self.busy {
            return Err(StrokeError::precondition(format!(
                "cannot {what} while a stroke is active"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/history.rs"]
mod tests;
