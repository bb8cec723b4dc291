use super::*;
use crate::transform::affine::AffineParams;

#[test]
fn builtins_include_affine() {
    let reg = ParamsRegistry::with_builtins();
    assert!(reg.contains(AffineParams::KIND));
    assert_eq!(reg.kinds().collect::<Vec<_>>(), vec!["affine"]);
}

#[test]
fn encode_then_decode_by_tag() {
    let reg = ParamsRegistry::with_builtins();
    let params = AffineParams::translate(3.0, -2.0);
    let value = reg.encode(&params).unwrap();
    assert_eq!(value["kind"], "affine");

    let back = reg.decode(&value).unwrap();
    let back = back.as_any().downcast_ref::<AffineParams>().unwrap();
    assert_eq!(*back, params);
}

#[test]
fn unknown_kinds_are_rejected() {
    let reg = ParamsRegistry::new();
    let err = reg.encode(&AffineParams::identity()).unwrap_err();
    assert!(matches!(err, StrokeError::Serde(_)));

    let value = serde_json::json!({ "kind": "warp", "params": {} });
    assert!(ParamsRegistry::with_builtins().decode(&value).is_err());
    assert!(ParamsRegistry::with_builtins().decode(&serde_json::json!({})).is_err());
}

#[test]
fn register_replaces_previous_decoder() {
    fn always_identity(_: serde_json::Value) -> StrokeResult<ParamsHandle> {
        Ok(AffineParams::identity().into_handle())
    }

    let mut reg = ParamsRegistry::with_builtins();
    assert!(reg.register(AffineParams::KIND, always_identity).is_some());
    let value = reg.encode(&AffineParams::translate(1.0, 1.0)).unwrap();
    assert!(reg.decode(&value).unwrap().is_identity());
}
