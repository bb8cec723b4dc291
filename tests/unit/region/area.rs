use super::*;

fn r(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
    Rect::new(x0, y0, x1, y1)
}

#[test]
fn zero_area_rects_are_dropped() {
    let mut region = Region::new();
    region.add_rect(r(3.0, 3.0, 3.0, 10.0));
    assert!(region.is_empty());
    assert_eq!(region.bounds(), Rect::ZERO);
}

#[test]
fn fractional_rects_expand_to_pixels() {
    let region = Region::from_rect(r(0.5, 0.5, 2.2, 3.9));
    assert_eq!(region.rects(), &[r(0.0, 0.0, 3.0, 4.0)]);
}

#[test]
fn compressed_keeps_the_exact_union_in_bands() {
    let mut region = Region::new();
    region.add_rect(r(20.0, 20.0, 30.0, 30.0));
    region.add_rect(r(0.0, 0.0, 10.0, 10.0));
    region.add_rect(r(5.0, 5.0, 12.0, 12.0));

    let c = region.compressed();
    assert_eq!(
        c.rects(),
        &[
            r(0.0, 0.0, 10.0, 5.0),
            r(0.0, 5.0, 12.0, 10.0),
            r(5.0, 10.0, 12.0, 12.0),
            r(20.0, 20.0, 30.0, 30.0),
        ]
    );
    assert_eq!(c.area(), 100.0 + 49.0 - 25.0 + 100.0);
}

#[test]
fn compressed_joins_shared_edges_exactly() {
    let mut region = Region::new();
    region.add_rect(r(0.0, 0.0, 4.0, 2.0));
    region.add_rect(r(4.0, 0.0, 8.0, 2.0));
    assert_eq!(region.compressed().rects(), &[r(0.0, 0.0, 8.0, 2.0)]);

    let mut region = Region::new();
    region.add_rect(r(0.0, 0.0, 4.0, 2.0));
    region.add_rect(r(0.0, 2.0, 4.0, 5.0));
    assert_eq!(region.compressed().rects(), &[r(0.0, 0.0, 4.0, 5.0)]);

    // Corner contact is not a shared edge.
    let mut region = Region::new();
    region.add_rect(r(0.0, 0.0, 2.0, 2.0));
    region.add_rect(r(2.0, 2.0, 4.0, 4.0));
    assert_eq!(region.compressed().rects().len(), 2);
}

#[test]
fn compressed_is_independent_of_report_order() {
    let a = r(0.0, 0.0, 1.0, 1.0);
    let b = r(1.0, 0.0, 2.0, 1.0);
    let c = r(0.0, 1.0, 1.0, 2.0);
    let expected = [r(0.0, 0.0, 2.0, 1.0), r(0.0, 1.0, 1.0, 2.0)];
    for order in [[a, b, c], [a, c, b], [b, a, c], [b, c, a], [c, a, b], [c, b, a]] {
        assert_eq!(Region::from(order.to_vec()).compressed().rects(), &expected);
    }

    let x = r(0.0, 0.0, 10.0, 10.0);
    let y = r(8.0, 8.0, 20.0, 12.0);
    assert_eq!(
        Region::from(vec![x, y]).compressed(),
        Region::from(vec![y, x]).compressed()
    );
}

#[test]
fn compressed_is_independent_of_how_rects_were_split() {
    // the same L shape cut horizontally and vertically
    let rows = Region::from(vec![r(0.0, 0.0, 6.0, 2.0), r(0.0, 2.0, 2.0, 6.0)]);
    let cols = Region::from(vec![
        r(0.0, 0.0, 2.0, 6.0),
        r(2.0, 0.0, 4.0, 2.0),
        r(4.0, 0.0, 6.0, 2.0),
    ]);
    assert_eq!(rows.compressed(), cols.compressed());
    assert_eq!(rows.compressed().compressed(), rows.compressed());
}

#[test]
fn compressed_collapses_long_lists() {
    let mut region = Region::new();
    for i in 0..(MAX_REGION_RECTS + 4) {
        let x = (i * 10) as f64;
        region.add_rect(r(x, 0.0, x + 1.0, 1.0));
    }
    let c = region.compressed();
    assert_eq!(c.rects().len(), 1);
    assert_eq!(c.bounds(), region.bounds());
}

#[test]
fn subtract_cuts_a_hole() {
    let outer = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
    let hole = Region::from_rect(r(4.0, 4.0, 6.0, 6.0));
    let rest = outer.subtract(&hole);

    assert_eq!(rest.area(), 96.0);
    assert!(!rest.contains_rect(r(4.0, 4.0, 6.0, 6.0)));
    assert!(rest.contains_rect(r(0.0, 0.0, 10.0, 4.0)));
    // Compression must not refill the hole.
    assert_eq!(rest.compressed().area(), 96.0);
}

#[test]
fn subtract_everything_is_empty() {
    let a = Region::from_rect(r(2.0, 2.0, 4.0, 4.0));
    let b = Region::from_rect(r(0.0, 0.0, 10.0, 10.0));
    assert!(a.subtract(&b).is_empty());
}

#[test]
fn serializes_as_a_rect_list() {
    let region = Region::from(vec![r(0.0, 0.0, 2.0, 2.0), r(4.0, 0.0, 5.5, 1.0)]);
    let json = serde_json::to_value(&region).unwrap();
    let back: Region = serde_json::from_value(json).unwrap();
    assert_eq!(back, region);
    assert_eq!(back.rects()[1], r(4.0, 0.0, 6.0, 1.0));
}

#[test]
fn rescaled_round_trip_covers_original() {
    let region = Region::from_rect(r(3.0, 5.0, 17.0, 9.0));
    let low = region.rescaled(LodLevel::FULL, LodLevel(1));
    assert_eq!(low.rects(), &[r(1.0, 2.0, 9.0, 5.0)]);

    let back = low.rescaled(LodLevel(1), LodLevel::FULL);
    assert!(back.contains_rect(r(3.0, 5.0, 17.0, 9.0)));
}
