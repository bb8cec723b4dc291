use super::*;

#[test]
fn insert_get_remove() {
    let mut arena = CommandArena::new();
    let a = arena.insert(Command::separator("a"));
    let b = arena.insert(Command::separator("b"));
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.get(a).unwrap().label(), "a");

    let taken = arena.remove(a).unwrap();
    assert_eq!(taken.label(), "a");
    assert!(!arena.contains(a));
    assert!(arena.contains(b));
    assert_eq!(arena.len(), 1);
}

#[test]
fn reused_slot_rejects_old_handle() {
    let mut arena = CommandArena::new();
    let old = arena.insert(Command::separator("old"));
    arena.remove(old).unwrap();
    let new = arena.insert(Command::separator("new"));

    assert_eq!(old.index(), new.index());
    assert_ne!(old.generation(), new.generation());
    assert!(arena.get(old).is_none());
    assert_eq!(arena.get(new).unwrap().label(), "new");
}

#[test]
fn get_mut_allows_in_place_changes() {
    let mut arena = CommandArena::new();
    let id = arena.insert(Command::separator("s"));
    let renderer = crate::document::renderer::NullRenderer;
    let cx = crate::command::command::CommandCx::direct(&renderer);
    arena.expect_mut(id).unwrap().redo(&cx).unwrap();
    assert!(arena.get(id).unwrap().is_applied());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "stale command handle")]
fn removing_twice_is_a_consistency_fault() {
    let mut arena = CommandArena::new();
    let id = arena.insert(Command::separator("s"));
    arena.remove(id).unwrap();
    let _ = arena.remove(id);
}
