use super::*;

#[test]
fn from_rgba8_validates_length() {
    assert!(ContentHandle::from_rgba8(LodLevel::FULL, 0, 0, 2, 2, vec![0; 15]).is_err());
    let c = ContentHandle::from_rgba8(LodLevel::FULL, 3, 4, 2, 1, vec![1; 8]).unwrap();
    assert_eq!(c.bounds(), Rect::new(3.0, 4.0, 5.0, 5.0));
}

#[test]
fn pixel_outside_extent_is_transparent() {
    let c = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 2.0, 2.0), [9, 9, 9, 255]);
    assert_eq!(c.pixel(1, 1), [9, 9, 9, 255]);
    assert_eq!(c.pixel(2, 0), [0; 4]);
    assert_eq!(c.pixel(-1, 0), [0; 4]);
}

#[test]
fn equality_is_byte_equality() {
    let a = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 3.0, 3.0), [1, 2, 3, 4]);
    let b = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 3.0, 3.0), [1, 2, 3, 4]);
    assert_eq!(a, b);
    assert!(!a.ptr_eq(&b));
    assert_eq!(a.fingerprint(), b.fingerprint());

    let moved = ContentHandle::solid(LodLevel::FULL, Rect::new(1.0, 0.0, 4.0, 3.0), [1, 2, 3, 4]);
    assert_ne!(a, moved);
    assert_ne!(a.fingerprint(), moved.fingerprint());
}

#[test]
fn downscale_box_filters_blocks() {
    // 4x2 at origin: left half opaque white, right half transparent.
    let mut data = Vec::new();
    for _y in 0..2 {
        data.extend_from_slice(&[255, 255, 255, 255, 255, 255, 255, 255]);
        data.extend_from_slice(&[0; 8]);
    }
    let c = ContentHandle::from_rgba8(LodLevel::FULL, 0, 0, 4, 2, data).unwrap();
    let low = c.at_lod(LodLevel(1));
    assert_eq!(low.lod(), LodLevel(1));
    assert_eq!(low.size(), (2, 1));
    assert_eq!(low.pixel(0, 0), [255; 4]);
    assert_eq!(low.pixel(1, 0), [0; 4]);
}

#[test]
fn downscale_rounds_extent_outward() {
    let c = ContentHandle::solid(LodLevel::FULL, Rect::new(-3.0, 1.0, 2.0, 2.0), [0, 0, 0, 255]);
    let low = c.at_lod(LodLevel(1));
    assert_eq!(low.bounds(), Rect::new(-2.0, 0.0, 1.0, 1.0));
}

#[test]
fn upscale_replicates() {
    let c = ContentHandle::solid(LodLevel(1), Rect::new(1.0, 1.0, 2.0, 2.0), [5, 5, 5, 5]);
    let full = c.at_lod(LodLevel::FULL);
    assert_eq!(full.bounds(), Rect::new(2.0, 2.0, 4.0, 4.0));
    assert_eq!(full.pixel(3, 3), [5, 5, 5, 5]);
}

#[test]
fn empty_stays_empty_across_levels() {
    let e = ContentHandle::empty(LodLevel::FULL);
    assert!(e.at_lod(LodLevel(3)).is_empty());
    assert_eq!(e.at_lod(LodLevel(3)).lod(), LodLevel(3));
}

#[test]
fn masked_keeps_only_selected_pixels() {
    let c = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 8.0, 8.0), [5, 6, 7, 255]);
    let selection = Region::from_rect(Rect::new(2.0, 2.0, 4.0, 20.0));

    let inside = c.masked(&selection);
    assert_eq!(
        inside,
        ContentHandle::solid(LodLevel::FULL, Rect::new(2.0, 2.0, 4.0, 8.0), [5, 6, 7, 255])
    );

    let outside = c.cleared(&selection);
    assert_eq!(outside.bounds(), c.bounds());
    assert_eq!(outside.pixel(3, 3), [0; 4]);
    assert_eq!(outside.pixel(1, 3), [5, 6, 7, 255]);
    assert_eq!(outside.pixel(5, 0), [5, 6, 7, 255]);
}

#[test]
fn selections_missing_the_content_trim_to_empty() {
    let c = ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 4.0, 4.0), [1, 1, 1, 255]);
    let far = Region::from_rect(Rect::new(10.0, 10.0, 12.0, 12.0));
    assert!(c.masked(&far).is_empty());
    assert_eq!(c.cleared(&far), c);

    let all = Region::from_rect(c.bounds());
    assert!(c.cleared(&all).is_empty());
}

#[test]
fn masking_reduced_content_rescales_the_selection() {
    let c = ContentHandle::solid(LodLevel(1), Rect::new(0.0, 0.0, 4.0, 4.0), [1, 1, 1, 255]);
    // full-resolution (0, 0)-(4, 4) covers (0, 0)-(2, 2) at level 1
    let selection = Region::from_rect(Rect::new(0.0, 0.0, 4.0, 4.0));
    assert_eq!(c.masked(&selection).bounds(), Rect::new(0.0, 0.0, 2.0, 2.0));
}
