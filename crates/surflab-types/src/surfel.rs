//! Surfel geometry — the disk-like point sample and its bounding volume.

use serde::{Deserialize, Serialize};

/// A disk-like point sample approximating a small surface patch.
///
/// Immutable once loaded from disk; the label assignment for a surfel lives
/// in the materialized assignment state, never inside the block payload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surfel {
    /// World-space position.
    pub position: [f32; 3],
    /// Unit surface normal.
    pub normal: [f32; 3],
    /// RGB color.
    pub color: [u8; 3],
    /// Disk radius.
    pub radius: f32,
}

impl Surfel {
    /// In-memory footprint of one surfel, for accounting of loaded
    /// levels against the cache ceiling.
    pub const MEM_SIZE: u64 = std::mem::size_of::<Surfel>() as u64;
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Aabb {
    /// Box spanning the two corners.
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// An empty box (inverted extents) for accumulation via `union`.
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Centroid of the box.
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: [
                self.min[0].min(other.min[0]),
                self.min[1].min(other.min[1]),
                self.min[2].min(other.min[2]),
            ],
            max: [
                self.max[0].max(other.max[0]),
                self.max[1].max(other.max[1]),
                self.max[2].max(other.max[2]),
            ],
        }
    }

    /// Grow to contain a point.
    pub fn extend(&mut self, p: [f32; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    /// Distance from a point to the box (0 if inside).
    pub fn distance_to(&self, p: [f32; 3]) -> f32 {
        let mut sq = 0.0f32;
        for axis in 0..3 {
            let d = if p[axis] < self.min[axis] {
                self.min[axis] - p[axis]
            } else if p[axis] > self.max[axis] {
                p[axis] - self.max[axis]
            } else {
                0.0
            };
            sq += d * d;
        }
        sq.sqrt()
    }

    /// Check whether a point is inside (inclusive).
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|axis| p[axis] >= self.min[axis] && p[axis] <= self.max[axis])
    }
}
