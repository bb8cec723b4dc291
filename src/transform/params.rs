use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::foundation::core::LodLevel;
use crate::foundation::error::{StrokeError, StrokeResult};

/// Parameters of one transform kind, opaque to the engine.
///
/// The engine only needs to know whether the parameters are a no-op, how to express them at a
/// reduced resolution, and how to persist them.
pub trait TransformParams: fmt::Debug + Send + Sync + 'static {
    /// Registry tag of this kind.
    fn kind(&self) -> &'static str;

    /// Return `true` when applying these parameters changes nothing.
    fn is_identity(&self) -> bool;

    /// Equivalent parameters for content expressed at `lod`.
    fn at_lod(&self, lod: LodLevel) -> ParamsHandle;

    /// Serialized form, decodable by the decoder registered for [`TransformParams::kind`].
    fn to_json(&self) -> StrokeResult<serde_json::Value>;

    /// Upcast for routines that downcast to their concrete parameter type.
    fn as_any(&self) -> &dyn Any;
}

/// Shared, immutable transform parameters.
pub type ParamsHandle = Arc<dyn TransformParams>;

/// Decoder for one parameter kind.
pub type ParamsDecoder = fn(serde_json::Value) -> StrokeResult<ParamsHandle>;

/// Explicit mapping from parameter kind tags to decoders.
///
/// Persisted parameters are stored as `{"kind": <tag>, "params": <value>}` and resolved by tag
/// only.
#[derive(Clone, Default)]
pub struct ParamsRegistry {
    decoders: BTreeMap<&'static str, ParamsDecoder>,
}

impl fmt::Debug for ParamsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

impl ParamsRegistry {
    /// Registry without any kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kind shipped in this crate.
    pub fn with_builtins() -> Self {
        let mut out = Self::new();
        out.register(
            crate::transform::affine::AffineParams::KIND,
            crate::transform::affine::AffineParams::decode,
        );
        out
    }

    /// Add or replace the decoder for `kind`, returning the previous one.
    pub fn register(
        &mut self,
        kind: &'static str,
        decoder: ParamsDecoder,
    ) -> Option<ParamsDecoder> {
        self.decoders.insert(kind, decoder)
    }

    /// Return `true` when `kind` can be decoded.
    pub fn contains(&self, kind: &str) -> bool {
        self.decoders.contains_key(kind)
    }

    /// Registered tags in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }

    /// Tagged serialized form of `params`.
    pub fn encode(&self, params: &dyn TransformParams) -> StrokeResult<serde_json::Value> {
        if !self.contains(params.kind()) {
            return Err(StrokeError::serde(format!(
                "transform kind '{}' is not registered",
                params.kind()
            )));
        }
        Ok(serde_json::json!({
            "kind": params.kind(),
            "params": params.to_json()?,
        }))
    }

    /// Decode a tagged value produced by [`ParamsRegistry::encode`].
    pub fn decode(&self, value: &serde_json::Value) -> StrokeResult<ParamsHandle> {
        let kind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| StrokeError::serde("transform params need a string 'kind' tag"))?;
        let decoder = self
            .decoders
            .get(kind)
            .ok_or_else(|| StrokeError::serde(format!("unknown transform kind '{kind}'")))?;
        let params = value.get("params").cloned().unwrap_or(serde_json::Value::Null);
        decoder(params)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/params.rs"]
mod tests;
