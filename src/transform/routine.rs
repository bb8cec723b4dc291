use crate::document::content::ContentHandle;
use crate::region::area::Region;
use crate::transform::params::TransformParams;

/// Why a routine refused its input. Absorbed by the engine as a no-op cycle.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    /// Nothing to transform.
    #[error("source content is empty")]
    EmptySource,
    /// Parameters collapse the content (for example a singular matrix).
    #[error("degenerate transform: {0}")]
    Degenerate(String),
    /// Source and destination disagree on level of detail.
    #[error("source is at level {src} but destination is at level {dst}")]
    LodMismatch {
        /// Source level.
        src: u8,
        /// Destination level.
        dst: u8,
    },
    /// The routine does not handle this parameter kind.
    #[error("unsupported transform kind '{0}'")]
    Unsupported(&'static str),
}

/// Result of one routine call.
#[derive(Clone, Debug)]
pub struct RoutineOutput {
    /// Destination content with the transformed source merged in.
    pub content: ContentHandle,
    /// Area of the destination that changed.
    pub changed: Region,
}

/// Pluggable geometric transform.
///
/// Must be a pure function of its inputs: the same parameters and content always produce the
/// same bytes. Called concurrently for distinct nodes.
pub trait TransformRoutine: Send + Sync {
    /// Transform `src` by `params` and merge it into `dst`.
    fn apply(
        &self,
        params: &dyn TransformParams,
        src: &ContentHandle,
        dst: &ContentHandle,
    ) -> Result<RoutineOutput, RoutineError>;
}

impl From<RoutineError> for crate::foundation::error::StrokeError {
    fn from(e: RoutineError) -> Self {
        Self::routine(e.to_string())
    }
}
