use std::cmp::Ordering;

use smallvec::SmallVec;

use crate::foundation::core::{LodLevel, Rect};

/// Rect count above which [`Region::compressed`] collapses to a single bounding rect.
pub const MAX_REGION_RECTS: usize = 16;

/// Union of pixel-aligned rectangles describing content that changed.
///
/// Rects are kept as reported until [`Region::compressed`] is asked for the canonical form.
/// Zero-area rects are never stored.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "Vec<Rect>", into = "Vec<Rect>")]
pub struct Region {
    rects: SmallVec<[Rect; 4]>,
}

impl Region {
    /// Empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Region covering `rect`, expanded outward to whole pixels.
    pub fn from_rect(rect: Rect) -> Self {
        let mut out = Self::new();
        out.add_rect(rect);
        out
    }

    /// Return `true` when nothing is covered.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Raw rect list in insertion order (or canonical order after compression).
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Add one rect. Zero-area rects are ignored.
    pub fn add_rect(&mut self, rect: Rect) {
        let r = rect.abs().expand();
        if r.width() > 0.0 && r.height() > 0.0 {
            self.rects.push(r);
        }
    }

    /// Union `other` into `self`.
    pub fn union_with(&mut self, other: &Region) {
        self.rects.extend_from_slice(&other.rects);
    }

    /// By-value union.
    pub fn union(mut self, other: &Region) -> Region {
        self.union_with(other);
        self
    }

    /// Bounding rect of every covered pixel, `Rect::ZERO` when empty.
    pub fn bounds(&self) -> Rect {
        let mut it = self.rects.iter();
        let Some(first) = it.next() else {
            return Rect::ZERO;
        };
        it.fold(*first, |acc, r| acc.union(*r))
    }

    /// Total covered area counting overlaps once, computed on the compressed form.
    pub fn area(&self) -> f64 {
        self.compressed().rects.iter().map(|r| r.area()).sum()
    }

    /// Return `true` when `rect` is entirely inside the region.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        Region::from_rect(rect).subtract(self).is_empty()
    }

    /// Canonical form of the region.
    ///
    /// The covered pixels are cut into horizontal bands at every rect edge; each band keeps its
    /// disjoint x-spans and adjacent bands with identical spans merge. The result depends only
    /// on the covered pixels, never on how the rects were split up or the order they were
    /// reported in. Above [`MAX_REGION_RECTS`] it collapses to the bounding rect.
    pub fn compressed(&self) -> Region {
        let mut edges: Vec<f64> = self.rects.iter().flat_map(|r| [r.y0, r.y1]).collect();
        edges.sort_by(f64::total_cmp);
        edges.dedup();

        let mut rects: Vec<Rect> = Vec::new();
        let mut open: Vec<Rect> = Vec::new();
        for band in edges.windows(2) {
            let (y0, y1) = (band[0], band[1]);
            let spans = band_spans(&self.rects, y0, y1);
            let continues = !open.is_empty()
                && open.len() == spans.len()
                && open
                    .iter()
                    .zip(&spans)
                    .all(|(r, s)| r.y1 == y0 && r.x0 == s.0 && r.x1 == s.1);
            if continues {
                for r in &mut open {
                    r.y1 = y1;
                }
            } else {
                rects.append(&mut open);
                open = spans
                    .into_iter()
                    .map(|(x0, x1)| Rect::new(x0, y0, x1, y1))
                    .collect();
            }
        }
        rects.append(&mut open);

        if rects.len() > MAX_REGION_RECTS {
            rects = vec![self.bounds()];
        }
        rects.sort_by(cmp_rect);
        Region {
            rects: SmallVec::from_vec(rects),
        }
    }

    /// Area of `self` not covered by `other`.
    pub fn subtract(&self, other: &Region) -> Region {
        let mut remaining: Vec<Rect> = self.rects.to_vec();
        for cut in &other.rects {
            let mut next = Vec::with_capacity(remaining.len());
            for r in remaining {
                subtract_rect(r, *cut, &mut next);
            }
            remaining = next;
        }
        Region {
            rects: SmallVec::from_vec(remaining),
        }
    }

    /// Convert from the coordinate space of `from` into that of `to`.
    pub fn rescaled(&self, from: LodLevel, to: LodLevel) -> Region {
        if from == to {
            return self.clone();
        }
        let mut out = Region::new();
        for r in &self.rects {
            out.add_rect(LodLevel::rescale_rect(*r, from, to));
        }
        out
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl From<Vec<Rect>> for Region {
    fn from(rects: Vec<Rect>) -> Self {
        let mut out = Self::new();
        for rect in rects {
            out.add_rect(rect);
        }
        out
    }
}

impl From<Region> for Vec<Rect> {
    fn from(region: Region) -> Self {
        region.rects.into_vec()
    }
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

/// Disjoint, sorted x-spans covered by `rects` over the band `y0..y1`.
fn band_spans(rects: &[Rect], y0: f64, y1: f64) -> Vec<(f64, f64)> {
    let mut spans: Vec<(f64, f64)> = rects
        .iter()
        .filter(|r| r.y0 <= y0 && r.y1 >= y1)
        .map(|r| (r.x0, r.x1))
        .collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(spans.len());
    for (x0, x1) in spans {
        match merged.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => merged.push((x0, x1)),
        }
    }
    merged
}

fn subtract_rect(a: Rect, cut: Rect, out: &mut Vec<Rect>) {
    if !overlaps(a, cut) {
        out.push(a);
        return;
    }
    let i = a.intersect(cut);
    let pieces = [
        Rect::new(a.x0, a.y0, a.x1, i.y0),
        Rect::new(a.x0, i.y1, a.x1, a.y1),
        Rect::new(a.x0, i.y0, i.x0, i.y1),
        Rect::new(i.x1, i.y0, a.x1, i.y1),
    ];
    out.extend(
        pieces
            .into_iter()
            .filter(|p| p.width() > 0.0 && p.height() > 0.0),
    );
}

fn cmp_rect(a: &Rect, b: &Rect) -> Ordering {
    a.y0.total_cmp(&b.y0)
        .then(a.x0.total_cmp(&b.x0))
        .then(a.y1.total_cmp(&b.y1))
        .then(a.x1.total_cmp(&b.x1))
}

#[cfg(test)]
#[path = "../../tests/unit/region/area.rs"]
mod tests;
