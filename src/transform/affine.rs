use std::any::Any;
use std::sync::Arc;

use rayon::prelude::*;

use crate::document::content::ContentHandle;
use crate::foundation::core::{Affine, LodLevel, Point, Rect, rect_to_pixels};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::foundation::math::over_premul;
use crate::region::area::Region;
use crate::transform::params::{ParamsHandle, TransformParams};
use crate::transform::routine::{RoutineError, RoutineOutput, TransformRoutine};

const IDENTITY_EPS: f64 = 1e-9;
const SINGULAR_EPS: f64 = 1e-12;

/// Affine transform parameters in full-resolution pixel space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AffineParams {
    /// Maps source pixel coordinates to destination pixel coordinates.
    pub transform: Affine,
}

impl AffineParams {
    /// Registry tag.
    pub const KIND: &'static str = "affine";

    /// Wrap a matrix.
    pub fn new(transform: Affine) -> Self {
        Self { transform }
    }

    /// No-op transform.
    pub fn identity() -> Self {
        Self::new(Affine::IDENTITY)
    }

    /// Pure translation.
    pub fn translate(dx: f64, dy: f64) -> Self {
        Self::new(Affine::translate((dx, dy)))
    }

    /// Shared handle.
    pub fn into_handle(self) -> ParamsHandle {
        Arc::new(self)
    }

    pub(crate) fn decode(value: serde_json::Value) -> StrokeResult<ParamsHandle> {
        let params: AffineParams = serde_json::from_value(value)
            .map_err(|e| StrokeError::serde(format!("invalid affine params: {e}")))?;
        Ok(params.into_handle())
    }
}

impl TransformParams for AffineParams {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn is_identity(&self) -> bool {
        let id = Affine::IDENTITY.as_coeffs();
        self.transform
            .as_coeffs()
            .iter()
            .zip(id)
            .all(|(a, b)| (a - b).abs() <= IDENTITY_EPS)
    }

    fn at_lod(&self, lod: LodLevel) -> ParamsHandle {
        if lod.is_full() {
            return Arc::new(*self);
        }
        let s = lod.scale();
        Arc::new(Self::new(
            Affine::scale(s) * self.transform * Affine::scale(1.0 / s),
        ))
    }

    fn to_json(&self) -> StrokeResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| StrokeError::serde(e.to_string()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Nearest-neighbour affine resampler merging its result over the destination.
#[derive(Clone, Copy, Debug)]
pub struct AffineRoutine {
    /// Largest output the routine accepts, in pixels.
    pub max_output_pixels: u64,
}

impl Default for AffineRoutine {
    fn default() -> Self {
        Self {
            max_output_pixels: 1 << 26,
        }
    }
}

impl TransformRoutine for AffineRoutine {
    fn apply(
        &self,
        params: &dyn TransformParams,
        src: &ContentHandle,
        dst: &ContentHandle,
    ) -> Result<RoutineOutput, RoutineError> {
        let params = params
            .as_any()
            .downcast_ref::<AffineParams>()
            .ok_or(RoutineError::Unsupported(params.kind()))?;
        if src.lod() != dst.lod() {
            return Err(RoutineError::LodMismatch {
                src: src.lod().0,
                dst: dst.lod().0,
            });
        }
        if src.is_empty() {
            return Err(RoutineError::EmptySource);
        }
        let m = params.transform;
        let det = m.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS {
            return Err(RoutineError::Degenerate(format!("singular matrix (det {det})")));
        }

        let out_rect = m.transform_rect_bbox(src.bounds()).expand();
        let (ox, oy, w, h) = rect_to_pixels(out_rect);
        if u64::from(w) * u64::from(h) > self.max_output_pixels {
            return Err(RoutineError::Degenerate(format!(
                "output of {w}x{h} pixels exceeds the routine limit"
            )));
        }

        let moved = resample(src, m.inverse(), ox, oy, w, h);
        let moved = ContentHandle::from_rgba8(src.lod(), ox, oy, w, h, moved)
            .map_err(|e| RoutineError::Degenerate(e.to_string()))?;
        let changed = Region::from_rect(moved.bounds());
        let content = if dst.is_empty() {
            moved
        } else {
            merge_over(&moved, dst)
        };
        Ok(RoutineOutput { content, changed })
    }
}

fn resample(src: &ContentHandle, inv: Affine, ox: i32, oy: i32, w: u32, h: u32) -> Vec<u8> {
    let stride = (w as usize) * 4;
    let mut out = vec![0u8; stride * (h as usize)];
    if stride == 0 {
        return out;
    }
    out.par_chunks_mut(stride)
        .enumerate()
        .for_each(|(row, line)| {
            let y = f64::from(oy) + row as f64 + 0.5;
            for (col, px) in line.chunks_exact_mut(4).enumerate() {
                let x = f64::from(ox) + col as f64 + 0.5;
                let p = inv * Point::new(x, y);
                px.copy_from_slice(&src.pixel(p.x.floor() as i32, p.y.floor() as i32));
            }
        });
    out
}

fn merge_over(top: &ContentHandle, dst: &ContentHandle) -> ContentHandle {
    let bounds: Rect = top.bounds().union(dst.bounds());
    let (x0, y0, w, h) = rect_to_pixels(bounds);
    let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
    for y in y0..y0 + h as i32 {
        for x in x0..x0 + w as i32 {
            data.extend_from_slice(&over_premul(top.pixel(x, y), dst.pixel(x, y)));
        }
    }
    match ContentHandle::from_rgba8(top.lod(), x0, y0, w, h, data) {
        Ok(c) => c,
        Err(_) => top.clone(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/affine.rs"]
mod tests;
