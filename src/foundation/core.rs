use crate::foundation::error::{StrokeError, StrokeResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Stable identity of a document node (layer or mask).
///
/// The engine never creates nodes; ids come from the surrounding document model.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u32);

/// Resolution level of a computation.
///
/// Level `0` is full resolution; level `n > 0` works on content downscaled by `2^n`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct LodLevel(pub u8);

impl LodLevel {
    /// Full resolution.
    pub const FULL: Self = Self(0);

    /// Coarsest supported level (64x downscale).
    pub const MAX: u8 = 6;

    /// Create a validated level `<= LodLevel::MAX`.
    pub fn new(level: u8) -> StrokeResult<Self> {
        if level > Self::MAX {
            return Err(StrokeError::precondition(format!(
                "level of detail {level} exceeds maximum {}",
                Self::MAX
            )));
        }
        Ok(Self(level))
    }

    /// Return `true` for level `0`.
    pub fn is_full(self) -> bool {
        self.0 == 0
    }

    /// Integer downscale factor (`2^level`).
    pub fn factor(self) -> u32 {
        1u32 << self.0
    }

    /// Linear scale from full resolution into this level (`1 / 2^level`).
    pub fn scale(self) -> f64 {
        1.0 / f64::from(self.factor())
    }

    /// Map a pixel rect expressed at `from` into the coordinate space of `to`.
    ///
    /// Downscaling rounds outward so the result always covers the source area.
    pub fn rescale_rect(rect: Rect, from: LodLevel, to: LodLevel) -> Rect {
        if from == to {
            return rect;
        }
        let k = f64::from(from.factor()) / f64::from(to.factor());
        rect.scale_from_origin(k).expand()
    }
}

/// Integer pixel bounds as `(x, y, width, height)`; negative extents collapse to zero.
pub(crate) fn rect_to_pixels(rect: Rect) -> (i32, i32, u32, u32) {
    let r = rect.abs().expand();
    let w = (r.x1 - r.x0).max(0.0) as u32;
    let h = (r.y1 - r.y0).max(0.0) as u32;
    (r.x0 as i32, r.y0 as i32, w, h)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
