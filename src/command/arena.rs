use std::fmt;

use crate::command::command::Command;
use crate::foundation::error::{StrokeResult, consistency_fault};

/// Handle to a [`Command`] held by a [`CommandArena`].
///
/// Carries the slot generation so a handle to a removed command never resolves to whatever
/// later reuses the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId {
    idx: u32,
    generation: u32,
}

impl CommandId {
    /// Raw slot index (diagnostics only).
    pub fn index(self) -> u32 {
        self.idx
    }

    /// Slot generation this handle was issued for.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandId({}@gen{})", self.idx, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    cmd: Option<Command>,
}

/// Owning store for commands referenced from several transient lists.
///
/// Lists hold [`CommandId`]s; the arena holds the only copy of each command until it is moved
/// out with [`CommandArena::remove`].
#[derive(Debug, Default)]
pub struct CommandArena {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl CommandArena {
    /// Empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live commands.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Return `true` when no command is stored.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Store `cmd`, reusing a freed slot when available.
    pub fn insert(&mut self, cmd: Command) -> CommandId {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.cmd = Some(cmd);
            return CommandId {
                idx,
                generation: slot.generation,
            };
        }
        let idx = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            cmd: Some(cmd),
        });
        CommandId { idx, generation: 0 }
    }

    /// Return `true` when `id` resolves to a live command.
    pub fn contains(&self, id: CommandId) -> bool {
        self.get(id).is_some()
    }

    /// Resolve `id`; `None` for removed or foreign handles.
    pub fn get(&self, id: CommandId) -> Option<&Command> {
        self.slots
            .get(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.cmd.as_ref())
    }

    /// Mutable counterpart of [`CommandArena::get`].
    pub fn get_mut(&mut self, id: CommandId) -> Option<&mut Command> {
        self.slots
            .get_mut(id.idx as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.cmd.as_mut())
    }

    /// Resolve `id` or report a stale handle.
    pub fn expect_mut(&mut self, id: CommandId) -> StrokeResult<&mut Command> {
        self.get_mut(id)
            .ok_or_else(|| consistency_fault(format!("stale command handle {id:?}")))
    }

    /// Move the command out, bumping the slot generation so `id` stops resolving.
    pub fn remove(&mut self, id: CommandId) -> StrokeResult<Command> {
        let slot = self
            .slots
            .get_mut(id.idx as usize)
            .filter(|s| s.generation == id.generation && s.cmd.is_some())
            .ok_or_else(|| consistency_fault(format!("stale command handle {id:?}")))?;
        let cmd = slot.cmd.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.idx);
        self.live -= 1;
        cmd.ok_or_else(|| consistency_fault(format!("empty command slot {id:?}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/arena.rs"]
mod tests;
