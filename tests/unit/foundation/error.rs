use super::*;

#[test]
fn constructors_pick_matching_variant() {
    assert!(StrokeError::precondition("x").is_precondition());
    assert!(StrokeError::consistency("x").is_consistency());
    assert!(StrokeError::routine("x").is_routine());
    assert!(!StrokeError::precondition("x").is_routine());
    assert!(matches!(StrokeError::serde("x"), StrokeError::Serde(_)));
}

#[test]
fn display_prefixes_taxonomy() {
    let e = StrokeError::precondition("session already committed");
    assert_eq!(e.to_string(), "precondition failed: session already committed");

    let e = StrokeError::consistency("undo twice");
    assert_eq!(e.to_string(), "consistency violation: undo twice");
}

#[test]
fn anyhow_errors_are_transparent() {
    let e: StrokeError = anyhow::anyhow!("disk on fire").into();
    assert_eq!(e.to_string(), "disk on fire");
    assert!(!e.is_precondition());
}
