use std::collections::BTreeMap;
use std::ops::{BitOr, BitOrAssign};

use crate::foundation::core::{LodLevel, NodeId, Rect};
use crate::region::area::Region;

/// Per-node dirty regions accumulated across jobs and flushed together.
///
/// Every tracker lives at one level of detail. Combining trackers of different levels rescales
/// the right-hand side explicitly, so regions from different resolutions never mix raw.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchRegionTracker {
    lod: LodLevel,
    entries: BTreeMap<NodeId, Region>,
}

/// Read-only view of a tracker's coalesced regions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionSnapshot {
    /// Coordinate space of every region in the snapshot.
    pub lod: LodLevel,
    /// Compressed region per node, ordered by node id.
    pub entries: Vec<(NodeId, Region)>,
}

impl RegionSnapshot {
    /// Return `true` when no node has a dirty region.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Region reported for `node`, if any.
    pub fn get(&self, node: NodeId) -> Option<&Region> {
        self.entries
            .iter()
            .find_map(|(id, region)| (*id == node).then_some(region))
    }

    /// Bounding rect of every entry.
    pub fn bounds(&self) -> Rect {
        let mut all = Region::new();
        for (_, region) in &self.entries {
            all.union_with(region);
        }
        all.bounds()
    }
}

impl BatchRegionTracker {
    /// Empty tracker at `lod`.
    pub fn new(lod: LodLevel) -> Self {
        Self {
            lod,
            entries: BTreeMap::new(),
        }
    }

    /// Level of detail of every stored region.
    pub fn lod(&self) -> LodLevel {
        self.lod
    }

    /// Return `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes with a pending region.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Union `region` into the entry for `node`, creating it if absent.
    pub fn add_update(&mut self, node: NodeId, region: &Region) {
        if region.is_empty() {
            return;
        }
        self.entries.entry(node).or_default().union_with(region);
    }

    /// Shorthand for a single-rect update.
    pub fn add_rect(&mut self, node: NodeId, rect: Rect) {
        self.add_update(node, &Region::from_rect(rect));
    }

    /// Coalesced snapshot; the tracker keeps its state.
    pub fn compressed(&self) -> RegionSnapshot {
        RegionSnapshot {
            lod: self.lod,
            entries: self
                .entries
                .iter()
                .map(|(id, region)| (*id, region.compressed()))
                .collect(),
        }
    }

    /// Coalesced snapshot, leaving the tracker empty.
    pub fn take_and_clear(&mut self) -> RegionSnapshot {
        let entries = std::mem::take(&mut self.entries);
        RegionSnapshot {
            lod: self.lod,
            entries: entries
                .into_iter()
                .map(|(id, region)| (id, region.compressed()))
                .collect(),
        }
    }

    /// Copy of this tracker expressed at `lod`.
    pub fn rescaled(&self, lod: LodLevel) -> Self {
        Self {
            lod,
            entries: self
                .entries
                .iter()
                .map(|(id, region)| (*id, region.rescaled(self.lod, lod)))
                .collect(),
        }
    }

    /// Entrywise `self - other`; entries that become empty are dropped.
    pub fn diff(&self, other: &Self) -> Self {
        let other = other.rescaled(self.lod);
        let mut out = Self::new(self.lod);
        for (id, region) in &self.entries {
            let rest = match other.entries.get(id) {
                Some(cut) => region.subtract(cut),
                None => region.clone(),
            };
            if !rest.is_empty() {
                out.entries.insert(*id, rest);
            }
        }
        out
    }
}

impl BitOrAssign<&BatchRegionTracker> for BatchRegionTracker {
    fn bitor_assign(&mut self, rhs: &BatchRegionTracker) {
        let rescaled;
        let rhs = if rhs.lod == self.lod {
            rhs
        } else {
            rescaled = rhs.rescaled(self.lod);
            &rescaled
        };
        for (id, region) in &rhs.entries {
            self.add_update(*id, region);
        }
    }
}

impl BitOr<&BatchRegionTracker> for &BatchRegionTracker {
    type Output = BatchRegionTracker;

    fn bitor(self, rhs: &BatchRegionTracker) -> BatchRegionTracker {
        let mut out = self.clone();
        out |= rhs;
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/region/tracker.rs"]
mod tests;
