//! GPU-accelerated nearest neighbor search
//!
//! Each query runs a brute-force scan over all points in its own invocation,
//! keeping the best candidates in a sorted local array. Rows come back in the
//! sentinel layout decoded by [`NeighborResult::from_raw`].

use crate::utils::{chunk_ranges, pack_points};
use crate::GpuContext;
use cloudcrate_core::{Error, NeighborResult, Point3f, Result, NUM_MAX_NN};
use tracing::debug;

const NEIGHBOR_SEARCH_SHADER: &str = r#"
const NUM_MAX_NN: u32 = 100u;

struct SearchParams {
    num_queries: u32,
    num_points: u32,
    max_nn: u32,
    use_radius: u32,
    radius_sq: f32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read> points: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read> queries: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read_write> out_indices: array<i32>;
@group(0) @binding(3) var<storage, read_write> out_distances: array<f32>;
@group(0) @binding(4) var<uniform> params: SearchParams;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let q = global_id.x;
    if (q >= params.num_queries) {
        return;
    }

    var best_dist: array<f32, NUM_MAX_NN>;
    var best_index: array<i32, NUM_MAX_NN>;
    var count = 0u;

    let query = queries[q];
    if (query.w != 0.0) {
        for (var p = 0u; p < params.num_points; p++) {
            let point = points[p];
            if (point.w == 0.0) {
                continue;
            }

            let diff = point.xyz - query.xyz;
            let d = dot(diff, diff);
            if (params.use_radius != 0u && d > params.radius_sq) {
                continue;
            }
            // Points arrive in index order, so an equal distance never
            // displaces an earlier index.
            if (count == params.max_nn && d >= best_dist[count - 1u]) {
                continue;
            }

            var j = min(count, params.max_nn - 1u);
            if (count < params.max_nn) {
                count += 1u;
            }
            loop {
                if (j == 0u || best_dist[j - 1u] <= d) {
                    break;
                }
                best_dist[j] = best_dist[j - 1u];
                best_index[j] = best_index[j - 1u];
                j -= 1u;
            }
            best_dist[j] = d;
            best_index[j] = i32(p);
        }
    }

    let base = q * params.max_nn;
    for (var s = 0u; s < params.max_nn; s++) {
        if (s < count) {
            out_indices[base + s] = best_index[s];
            out_distances[base + s] = sqrt(best_dist[s]);
        } else {
            out_indices[base + s] = -1;
            out_distances[base + s] = -1.0;
        }
    }
}
"#;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SearchParams {
    num_queries: u32,
    num_points: u32,
    max_nn: u32,
    use_radius: u32,
    radius_sq: f32,
    _pad: [u32; 3],
}

impl GpuContext {
    /// Find the `k` nearest `points` of every query on the GPU.
    ///
    /// Rows are `k` slots wide and ordered by `(distance, index)`.
    pub async fn search_knn(&self, points: &[Point3f], queries: &[Point3f], k: usize) -> Result<NeighborResult> {
        if k == 0 || k > NUM_MAX_NN {
            return Err(Error::InvalidParameter(format!(
                "k must be in 1..={}, got {}",
                NUM_MAX_NN, k
            )));
        }
        self.neighbor_search(points, queries, k, None).await
    }

    /// Find up to `max_nn` of `points` within `radius` of every query on the GPU
    pub async fn search_radius(&self, points: &[Point3f], queries: &[Point3f], radius: f32, max_nn: usize) -> Result<NeighborResult> {
        if radius.is_nan() || radius <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "radius must be positive, got {}",
                radius
            )));
        }
        if max_nn == 0 || max_nn > NUM_MAX_NN {
            return Err(Error::InvalidParameter(format!(
                "max_nn must be in 1..={}, got {}",
                NUM_MAX_NN, max_nn
            )));
        }
        self.neighbor_search(points, queries, max_nn, Some(radius)).await
    }

    async fn neighbor_search(
        &self,
        points: &[Point3f],
        queries: &[Point3f],
        max_nn: usize,
        radius: Option<f32>,
    ) -> Result<NeighborResult> {
        if points.is_empty() || queries.is_empty() {
            return Ok(NeighborResult::new(queries.len(), max_nn));
        }

        let point_bytes = points.len() * std::mem::size_of::<[f32; 4]>();
        if point_bytes > self.max_storage_binding_size() || points.len() > i32::MAX as usize {
            return Err(Error::Unsupported(format!(
                "{} points exceed the device storage binding limit",
                points.len()
            )));
        }

        let row_bytes = max_nn * std::mem::size_of::<i32>();
        let chunk = self
            .max_invocations_per_dispatch()
            .min(self.max_storage_binding_size() / row_bytes);

        let points_buffer = self.create_buffer_init(
            "Search Points",
            &pack_points(points),
            wgpu::BufferUsages::STORAGE,
        );
        let pipeline = self.create_compute_pipeline("Neighbor Search", NEIGHBOR_SEARCH_SHADER);

        let mut indices = Vec::with_capacity(queries.len() * max_nn);
        let mut distances = Vec::with_capacity(queries.len() * max_nn);

        for range in chunk_ranges(queries.len(), chunk) {
            let num_queries = range.len();
            let slots = num_queries * max_nn;

            let queries_buffer = self.create_buffer_init(
                "Search Queries",
                &pack_points(&queries[range]),
                wgpu::BufferUsages::STORAGE,
            );
            let indices_buffer = self.create_buffer(
                "Neighbor Indices",
                (slots * std::mem::size_of::<i32>()) as u64,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            let distances_buffer = self.create_buffer(
                "Neighbor Distances",
                (slots * std::mem::size_of::<f32>()) as u64,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );

            let params = SearchParams {
                num_queries: num_queries as u32,
                num_points: points.len() as u32,
                max_nn: max_nn as u32,
                use_radius: radius.is_some() as u32,
                radius_sq: radius.map_or(0.0, |r| r * r),
                _pad: [0; 3],
            };
            let params_buffer = self.create_buffer_init("Search Params", &[params], wgpu::BufferUsages::UNIFORM);

            let bind_group = self.create_bind_group(
                "Neighbor Search",
                &pipeline,
                &[&points_buffer, &queries_buffer, &indices_buffer, &distances_buffer, &params_buffer],
            );

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Neighbor Search Encoder"),
            });
            self.dispatch(&mut encoder, "Neighbor Search Pass", &pipeline, &bind_group, num_queries);
            indices.extend(self.read_buffer::<i32>(encoder, &indices_buffer, slots).await?);

            let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Neighbor Distances Readback"),
            });
            distances.extend(self.read_buffer::<f32>(encoder, &distances_buffer, slots).await?);
        }

        debug!(
            "GPU neighbor search: {} queries against {} points (max_nn={}, radius={:?})",
            queries.len(),
            points.len(),
            max_nn,
            radius
        );
        NeighborResult::from_raw(&indices, &distances, max_nn)
    }
}

/// GPU-accelerated k-nearest-neighbor search for a batch of queries
pub async fn gpu_search_knn(
    gpu_context: &GpuContext,
    points: &[Point3f],
    queries: &[Point3f],
    k: usize,
) -> Result<NeighborResult> {
    gpu_context.search_knn(points, queries, k).await
}

/// GPU-accelerated radius search for a batch of queries
pub async fn gpu_search_radius(
    gpu_context: &GpuContext,
    points: &[Point3f],
    queries: &[Point3f],
    radius: f32,
    max_nn: usize,
) -> Result<NeighborResult> {
    gpu_context.search_radius(points, queries, radius, max_nn).await
}
