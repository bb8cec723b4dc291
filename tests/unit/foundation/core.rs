use super::*;

#[test]
fn lod_level_validation() {
    assert!(LodLevel::new(0).unwrap().is_full());
    assert_eq!(LodLevel::new(3).unwrap().factor(), 8);
    assert!(LodLevel::new(LodLevel::MAX + 1).is_err());
}

#[test]
fn lod_scale_is_inverse_factor() {
    assert_eq!(LodLevel(2).scale(), 0.25);
    assert_eq!(LodLevel::FULL.scale(), 1.0);
}

#[test]
fn rescale_rect_rounds_outward() {
    let r = Rect::new(1.0, 3.0, 9.0, 10.0);
    let down = LodLevel::rescale_rect(r, LodLevel::FULL, LodLevel(2));
    assert_eq!(down, Rect::new(0.0, 0.0, 3.0, 3.0));

    let up = LodLevel::rescale_rect(down, LodLevel(2), LodLevel::FULL);
    assert_eq!(up, Rect::new(0.0, 0.0, 12.0, 12.0));
    assert_eq!(up.union(r), up);
}

#[test]
fn rect_to_pixels_handles_inverted_rects() {
    assert_eq!(
        rect_to_pixels(Rect::new(4.0, 6.0, 1.5, 2.0)),
        (1, 2, 3, 4)
    );
    assert_eq!(rect_to_pixels(Rect::ZERO), (0, 0, 0, 0));
}
