//! Strokework is a transactional execution engine for interactive transform strokes.
//!
//! A stroke previews a geometric transform over a set of document nodes while the user drags,
//! then either commits the result to the undo history as one macro command or rolls every
//! change back. The public API is session-oriented:
//!
//! - Describe the nodes ([`Node`], [`MemoryNode`]) and the transform ([`TransformRoutine`],
//!   [`TransformParams`])
//! - Start a [`StrokeSession`] and feed it parameter updates
//! - [`StrokeSession::commit`] into an [`UndoHistory`], or [`StrokeSession::cancel`]
//!
//! Preview work runs on a barrier-delimited [`Scheduler`] backed by a rayon pool, optionally
//! at a reduced [`LodLevel`]; dirty areas are batched per node and flushed to a [`Renderer`].
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod document;
mod foundation;
mod region;
mod schedule;
mod session;
mod transform;

pub use crate::foundation::core::{Affine, LodLevel, NodeId, Point, Rect, Vec2};
pub use crate::foundation::error::{StrokeError, StrokeResult};

pub use crate::region::area::{MAX_REGION_RECTS, Region};
pub use crate::region::tracker::{BatchRegionTracker, RegionSnapshot};

pub use crate::document::content::ContentHandle;
pub use crate::document::node::{MemoryNode, Node, NodeKind, NodeRef};
pub use crate::document::renderer::{DirtyNotice, NullRenderer, RecordingRenderer, Renderer};

pub use crate::command::arena::{CommandArena, CommandId};
pub use crate::command::command::{
    Command, CommandCx, CommandOp, CommandState, Effect, ExtraData,
};
pub use crate::command::history::{SharedHistory, UndoHistory};
pub use crate::command::macro_command::{MacroCommand, MacroId};

pub use crate::transform::affine::{AffineParams, AffineRoutine};
pub use crate::transform::params::{ParamsDecoder, ParamsHandle, ParamsRegistry, TransformParams};
pub use crate::transform::routine::{RoutineError, RoutineOutput, TransformRoutine};

pub use crate::schedule::job::{CancelToken, Job, JobAccess, JobClass};
pub use crate::schedule::scheduler::{RunStats, Scheduler, SchedulerOpts};

pub use crate::session::extra::{TRANSFORM_MERGE_KEY, TransformExtra};
pub use crate::session::opts::{ContinuationPolicy, SessionOpts};
pub use crate::session::preview::PreviewCoordinator;
pub use crate::session::state::{CommandGroup, CommitOutcome, SessionState, SessionStats};
pub use crate::session::stroke_session::{Collaborators, StrokeSession};
