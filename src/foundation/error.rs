/// Convenience result type used across strokework.
pub type StrokeResult<T> = Result<T, StrokeError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum StrokeError {
    /// A request that is invalid for the current state; nothing was changed.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The external transform routine could not process its input.
    #[error("transform routine error: {0}")]
    Routine(String),

    /// Internal sequencing bug: undo/redo out of order, stale handle, wrong job access.
    #[error("consistency violation: {0}")]
    Consistency(String),

    /// Errors when serializing or deserializing parameters.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrokeError {
    /// Build a [`StrokeError::Precondition`] value.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Build a [`StrokeError::Routine`] value.
    pub fn routine(msg: impl Into<String>) -> Self {
        Self::Routine(msg.into())
    }

    /// Build a [`StrokeError::Consistency`] value.
    ///
    /// Callers raise these next to a `debug_assert!` so debug builds abort at the faulty site.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Build a [`StrokeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// True for [`StrokeError::Precondition`].
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// True for [`StrokeError::Routine`].
    pub fn is_routine(&self) -> bool {
        matches!(self, Self::Routine(_))
    }

    /// True for [`StrokeError::Consistency`].
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }
}

/// Report an internal sequencing bug.
///
/// Aborts in debug builds; release builds log and hand back a [`StrokeError::Consistency`].
#[track_caller]
pub(crate) fn consistency_fault(msg: impl Into<String>) -> StrokeError {
    let msg = msg.into();
    tracing::error!(fault = %msg, "stroke consistency violation");
    if cfg!(debug_assertions) {
        panic!("consistency violation: {msg}");
    }
    StrokeError::Consistency(msg)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
