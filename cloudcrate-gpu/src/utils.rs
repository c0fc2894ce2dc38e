//! Host-side packing for GPU buffers

use cloudcrate_core::Point3f;

/// Pack points as `vec4<f32>` with `w = 1` for finite points and `w = 0`
/// otherwise; kernels skip points whose `w` is zero
pub fn pack_points(points: &[Point3f]) -> Vec<[f32; 4]> {
    points
        .iter()
        .map(|p| {
            let w = if p.coords.iter().all(|v| v.is_finite()) { 1.0 } else { 0.0 };
            [p.x, p.y, p.z, w]
        })
        .collect()
}

/// Split `0..len` into consecutive ranges of at most `chunk` elements
pub fn chunk_ranges(len: usize, chunk: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    let chunk = chunk.max(1);
    (0..len).step_by(chunk).map(move |start| start..(start + chunk).min(len))
}
