use std::sync::Arc;

use super::*;
use crate::document::content::ContentHandle;
use crate::document::node::{MemoryNode, Node};
use crate::document::renderer::NullRenderer;
use crate::foundation::core::{LodLevel, NodeId, Rect};

fn solid(x: f64, rgba: [u8; 4]) -> ContentHandle {
    ContentHandle::solid(LodLevel::FULL, Rect::new(x, 0.0, x + 2.0, 2.0), rgba)
}

#[test]
fn undo_all_walks_children_in_reverse() {
    let renderer = NullRenderer;
    let cx = CommandCx::direct(&renderer);
    let node = Arc::new(MemoryNode::new(NodeId(1), solid(0.0, [1, 1, 1, 255])));
    let original = node.content_snapshot();

    let mut m = MacroCommand::new("two steps");
    let s1 = solid(4.0, [2, 2, 2, 255]);
    let s2 = solid(8.0, [3, 3, 3, 255]);

    let mut c1 = Command::content("step 1", node.clone(), original.clone(), s1.clone());
    c1.redo(&cx).unwrap();
    m.push_child(c1).unwrap();
    let mut c2 = Command::content("step 2", node.clone(), s1.clone(), s2.clone());
    c2.redo(&cx).unwrap();
    m.push_child(c2).unwrap();
    assert!(m.is_applied());

    let effects = m.undo_all(&cx).unwrap();
    assert_eq!(effects.len(), 2);
    assert_eq!(node.content_snapshot(), original);

    m.redo_all(&cx).unwrap();
    assert_eq!(node.content_snapshot(), s2);
}

#[test]
fn children_record_their_parent() {
    let mut m = MacroCommand::new("m");
    m.push_child(Command::separator("s")).unwrap();
    assert_eq!(m.children()[0].parent(), Some(m.id()));
}

#[test]
fn override_requires_same_merge_key() {
    let prior = MacroCommand::new("prior").with_merge_key(7);
    let mut same = MacroCommand::new("same").with_merge_key(7);
    let mut other = MacroCommand::new("other").with_merge_key(8);
    let mut untagged = MacroCommand::new("untagged");

    assert!(same.try_set_override(&prior));
    assert_eq!(same.overrides(), Some(prior.id()));
    assert!(!other.try_set_override(&prior));
    assert!(!untagged.try_set_override(&prior));
    assert_eq!(other.overrides(), None);
}

#[test]
fn try_merge_collapses_mergeable_neighbours() {
    let renderer = NullRenderer;
    let cx = CommandCx::direct(&renderer);
    let mut first = MacroCommand::new("nudge").with_merge_key(1).mergeable();
    let mut c = Command::separator("a");
    c.redo(&cx).unwrap();
    first.push_child(c).unwrap();

    let mut second = MacroCommand::new("nudge").with_merge_key(1).mergeable();
    let mut c = Command::separator("b");
    c.redo(&cx).unwrap();
    second.push_child(c).unwrap();

    first.try_merge(second).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first.children()[1].parent(), Some(first.id()));

    let plain = MacroCommand::new("plain").with_merge_key(1);
    assert!(first.try_merge(plain).is_err());
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "already belongs")]
fn a_command_has_one_parent() {
    let mut a = MacroCommand::new("a");
    a.push_child(Command::separator("s")).unwrap();
    let mut b = MacroCommand::new("b");
    // Re-parenting requires moving the command out of `a`, which the API does not offer,
    // so build a command that already carries a parent.
    let mut orphan = Command::separator("t");
    orphan.set_parent(a.id());
    let _ = b.push_child(orphan);
}
