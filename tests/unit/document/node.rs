use super::*;

#[test]
fn apply_content_reports_old_and_new_extent() {
    let a = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 4.0, 4.0), [1, 1, 1, 255]);
    let b = ContentHandle::solid(LodLevel::FULL, Rect::new(10.0, 0.0, 12.0, 2.0), [2, 2, 2, 255]);
    let node = MemoryNode::new(NodeId(1), a);

    let changed = node.apply_content(&b);
    assert!(changed.contains_rect(Rect::new(0.0, 0.0, 4.0, 4.0)));
    assert!(changed.contains_rect(Rect::new(10.0, 0.0, 12.0, 2.0)));
    assert_eq!(node.content_snapshot(), b);
}

#[test]
fn reapplying_identical_content_changes_nothing() {
    let a = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 4.0, 4.0), [1, 1, 1, 255]);
    let node = MemoryNode::new(NodeId(1), a.clone());
    assert!(node.apply_content(&a).is_empty());
}

#[test]
fn changed_region_uses_new_content_level() {
    let full = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 8.0, 8.0), [1, 1, 1, 255]);
    let node = MemoryNode::new(NodeId(1), full);
    let changed = node.apply_content(&ContentHandle::empty(LodLevel(2)));
    assert_eq!(changed.bounds(), Rect::new(0.0, 0.0, 2.0, 2.0));
}

#[test]
fn builders_set_flags() {
    let node = MemoryNode::new(NodeId(4), ContentHandle::empty(LodLevel::FULL))
        .with_kind(NodeKind::Decorated)
        .read_only()
        .with_structural_change();
    assert_eq!(node.kind(), NodeKind::Decorated);
    assert!(!node.is_editable());
    assert!(node.requires_structural_change());
    assert_eq!(node.tight_visible_bounds(), Rect::ZERO);
}
