use std::fmt;
use std::sync::Arc;

use xxhash_rust::xxh3::Xxh3;

use crate::foundation::core::{LodLevel, Rect, rect_to_pixels};
use crate::foundation::error::{StrokeError, StrokeResult};
use crate::foundation::math::average_px;
use crate::region::area::Region;

const XXH3_SEED: u64 = 0x51f1_7e3a_94c2_d0b7;

/// Immutable snapshot of node pixels.
///
/// Premultiplied RGBA8, tightly packed, row-major, placed at an integer origin in the coordinate
/// space of its level of detail. Cloning shares the pixel buffer. Equality compares bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentHandle {
    lod: LodLevel,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    data: Arc<Vec<u8>>,
}

impl ContentHandle {
    /// Transparent content with no extent.
    pub fn empty(lod: LodLevel) -> Self {
        Self {
            lod,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            data: Arc::new(Vec::new()),
        }
    }

    /// Wrap premultiplied RGBA8 bytes placed at `(x, y)`.
    pub fn from_rgba8(
        lod: LodLevel,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> StrokeResult<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(StrokeError::precondition(format!(
                "content buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        if width == 0 || height == 0 {
            return Ok(Self::empty(lod));
        }
        Ok(Self {
            lod,
            x,
            y,
            width,
            height,
            data: Arc::new(data),
        })
    }

    /// Fill `rect` (expanded to whole pixels) with one premultiplied color.
    pub fn solid(lod: LodLevel, rect: Rect, rgba: [u8; 4]) -> Self {
        let (x, y, width, height) = rect_to_pixels(rect);
        if width == 0 || height == 0 {
            return Self::empty(lod);
        }
        let data = rgba.repeat((width as usize) * (height as usize));
        Self {
            lod,
            x,
            y,
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// Level of detail the pixels are expressed at.
    pub fn lod(&self) -> LodLevel {
        self.lod
    }

    /// Return `true` when there are no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Pixel extent, `Rect::ZERO` when empty.
    pub fn bounds(&self) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }

    /// Origin of the first stored pixel.
    pub fn origin(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel at `(px, py)`; transparent outside the extent.
    pub fn pixel(&self, px: i32, py: i32) -> [u8; 4] {
        let lx = i64::from(px) - i64::from(self.x);
        let ly = i64::from(py) - i64::from(self.y);
        if lx < 0 || ly < 0 || lx >= i64::from(self.width) || ly >= i64::from(self.height) {
            return [0; 4];
        }
        let i = ((ly as usize) * (self.width as usize) + lx as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Return `true` when both handles share the same pixel buffer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Stable content hash over level, placement and bytes.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Xxh3::with_seed(XXH3_SEED);
        h.update(&[self.lod.0]);
        h.update(&self.x.to_le_bytes());
        h.update(&self.y.to_le_bytes());
        h.update(&self.width.to_le_bytes());
        h.update(&self.height.to_le_bytes());
        h.update(&self.data);
        h.digest()
    }

    /// Only the pixels inside `selection` (full-resolution coordinates), trimmed to what is
    /// left.
    pub fn masked(&self, selection: &Region) -> ContentHandle {
        self.select(selection, true)
    }

    /// The pixels outside `selection` (full-resolution coordinates), trimmed to what is left.
    pub fn cleared(&self, selection: &Region) -> ContentHandle {
        self.select(selection, false)
    }

    fn select(&self, selection: &Region, keep_inside: bool) -> ContentHandle {
        if self.is_empty() {
            return self.clone();
        }
        let selection = selection.rescaled(LodLevel::FULL, self.lod).compressed();
        let mut data = if keep_inside {
            vec![0u8; self.data.len()]
        } else {
            self.data.to_vec()
        };
        let (x_end, y_end) = (self.x + self.width as i32, self.y + self.height as i32);
        for rect in selection.rects() {
            let (rx, ry, rw, rh) = rect_to_pixels(*rect);
            let (x0, x1) = (rx.max(self.x), (rx + rw as i32).min(x_end));
            let (y0, y1) = (ry.max(self.y), (ry + rh as i32).min(y_end));
            if x0 >= x1 || y0 >= y1 {
                continue;
            }
            let len = (x1 - x0) as usize * 4;
            for y in y0..y1 {
                let start =
                    ((y - self.y) as usize * self.width as usize + (x0 - self.x) as usize) * 4;
                let row = start..start + len;
                if keep_inside {
                    data[row.clone()].copy_from_slice(&self.data[row]);
                } else {
                    data[row].fill(0);
                }
            }
        }
        self.trimmed(data)
    }

    /// Wrap `data` (laid out like `self`) cropped to its non-transparent pixels.
    fn trimmed(&self, data: Vec<u8>) -> ContentHandle {
        let w = self.width as usize;
        let opaque = |x: usize, y: usize| data[(y * w + x) * 4 + 3] != 0;
        let (mut x0, mut y0, mut x1, mut y1) = (usize::MAX, usize::MAX, 0, 0);
        for y in 0..self.height as usize {
            for x in 0..w {
                if opaque(x, y) {
                    x0 = x0.min(x);
                    y0 = y0.min(y);
                    x1 = x1.max(x + 1);
                    y1 = y1.max(y + 1);
                }
            }
        }
        if x0 >= x1 {
            return Self::empty(self.lod);
        }
        if (x0, y0, x1, y1) == (0, 0, w, self.height as usize) {
            return ContentHandle {
                data: Arc::new(data),
                ..self.clone()
            };
        }
        let mut cropped = Vec::with_capacity((x1 - x0) * (y1 - y0) * 4);
        for y in y0..y1 {
            cropped.extend_from_slice(&data[(y * w + x0) * 4..(y * w + x1) * 4]);
        }
        ContentHandle {
            lod: self.lod,
            x: self.x + x0 as i32,
            y: self.y + y0 as i32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
            data: Arc::new(cropped),
        }
    }

    /// Same pixels expressed at `target`.
    ///
    /// Coarser targets box-filter `2^n x 2^n` blocks (missing pixels count as transparent);
    /// finer targets replicate pixels.
    pub fn at_lod(&self, target: LodLevel) -> ContentHandle {
        if target == self.lod {
            return self.clone();
        }
        if self.is_empty() {
            return Self::empty(target);
        }
        if target > self.lod {
            self.downscaled(target)
        } else {
            self.upscaled(target)
        }
    }

    fn downscaled(&self, target: LodLevel) -> ContentHandle {
        let f = i64::from(1u32 << (target.0 - self.lod.0));
        let x0 = i64::from(self.x).div_euclid(f);
        let y0 = i64::from(self.y).div_euclid(f);
        let x1 = (i64::from(self.x) + i64::from(self.width) + f - 1).div_euclid(f);
        let y1 = (i64::from(self.y) + i64::from(self.height) + f - 1).div_euclid(f);
        let (w, h) = ((x1 - x0) as u32, (y1 - y0) as u32);

        let block = (f * f) as u32;
        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for by in y0..y1 {
            for bx in x0..x1 {
                let mut sum = [0u32; 4];
                for sy in (by * f)..(by * f + f) {
                    for sx in (bx * f)..(bx * f + f) {
                        let px = self.pixel(sx as i32, sy as i32);
                        for c in 0..4 {
                            sum[c] += u32::from(px[c]);
                        }
                    }
                }
                data.extend_from_slice(&average_px(sum, block));
            }
        }
        ContentHandle {
            lod: target,
            x: x0 as i32,
            y: y0 as i32,
            width: w,
            height: h,
            data: Arc::new(data),
        }
    }

    fn upscaled(&self, target: LodLevel) -> ContentHandle {
        let f = 1i32 << (self.lod.0 - target.0);
        let (w, h) = (self.width * f as u32, self.height * f as u32);
        let mut data = Vec::with_capacity((w as usize) * (h as usize) * 4);
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                data.extend_from_slice(&self.pixel(self.x + x / f, self.y + y / f));
            }
        }
        ContentHandle {
            lod: target,
            x: self.x * f,
            y: self.y * f,
            width: w,
            height: h,
            data: Arc::new(data),
        }
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHandle")
            .field("lod", &self.lod.0)
            .field("origin", &(self.x, self.y))
            .field("size", &(self.width, self.height))
            .field("fingerprint", &format_args!("{:016x}", self.fingerprint()))
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/content.rs"]
mod tests;
