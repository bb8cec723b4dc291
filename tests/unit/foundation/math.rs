use super::*;

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
}

#[test]
fn over_opaque_replaces_destination() {
    assert_eq!(over_premul([10, 20, 30, 255], [1, 2, 3, 4]), [10, 20, 30, 255]);
}

#[test]
fn over_transparent_keeps_destination() {
    assert_eq!(over_premul([0, 0, 0, 0], [9, 8, 7, 200]), [9, 8, 7, 200]);
}

#[test]
fn average_rounds_to_nearest() {
    assert_eq!(average_px([3, 4, 0, 1020], 4), [1, 1, 0, 255]);
    assert_eq!(average_px([5, 5, 5, 5], 0), [0, 0, 0, 0]);
}
