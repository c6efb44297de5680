//! Morton (Z-order) codes for spatially coherent block iteration.
//!
//! Block centroids are quantized onto a 1024³ grid over the scene bounds
//! and sorted by interleaved bits. Spatially adjacent blocks land adjacent
//! in iteration order, which is what makes sequential prefetch effective.

use surflab_types::Aabb;

const GRID_BITS: u32 = 10;
const GRID_SIZE: f32 = (1u32 << GRID_BITS) as f32;

/// Spread the low 10 bits of `v` so there are two zero bits between each.
fn spread(v: u32) -> u64 {
    let mut x = (v as u64) & 0x3ff;
    x = (x | (x << 16)) & 0x0300_00ff;
    x = (x | (x << 8)) & 0x0300_f00f;
    x = (x | (x << 4)) & 0x030c_30c3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// Interleave three 10-bit coordinates into a 30-bit Morton code.
pub fn morton3(x: u32, y: u32, z: u32) -> u64 {
    spread(x) | (spread(y) << 1) | (spread(z) << 2)
}

/// Morton code of a point quantized within `scene_bounds`.
///
/// Degenerate axes (zero extent) quantize to cell 0.
pub fn morton_code(p: [f32; 3], scene_bounds: &Aabb) -> u64 {
    let mut cell = [0u32; 3];
    for axis in 0..3 {
        let extent = scene_bounds.max[axis] - scene_bounds.min[axis];
        if extent > 0.0 {
            let t = ((p[axis] - scene_bounds.min[axis]) / extent).clamp(0.0, 1.0);
            cell[axis] = ((t * GRID_SIZE) as u32).min((1 << GRID_BITS) - 1);
        }
    }
    morton3(cell[0], cell[1], cell[2])
}
