//! GPU-accelerated voxel downsampling
//!
//! Voxel keys are computed on the device; grouping and averaging reuse the
//! CPU reduction so both paths produce the same voxel order.

use crate::utils::{chunk_ranges, pack_points};
use crate::GpuContext;
use cloudcrate_algorithms::{down_sample_by_keys, finite_points};
use cloudcrate_core::{Bounded, Point3f, PointCloud, Result, VoxelGrid, VoxelKey};
use tracing::{debug, warn};

const VOXEL_KEYS_SHADER: &str = r#"
struct GridParams {
    origin: vec3<f32>,
    voxel_size: f32,
    num_points: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

@group(0) @binding(0) var<storage, read> points: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> keys: array<i32>;
@group(0) @binding(2) var<uniform> params: GridParams;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let index = global_id.x;
    if (index >= params.num_points) {
        return;
    }

    let rel = floor((points[index].xyz - params.origin) / params.voxel_size);
    keys[index * 3u] = i32(rel.x);
    keys[index * 3u + 1u] = i32(rel.y);
    keys[index * 3u + 2u] = i32(rel.z);
}
"#;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GridParams {
    origin: [f32; 3],
    voxel_size: f32,
    num_points: u32,
    _pad: [u32; 3],
}

impl GpuContext {
    /// Compute the voxel key of every point on the GPU
    pub async fn compute_voxel_keys(&self, points: &[Point3f], grid: &VoxelGrid) -> Result<Vec<VoxelKey>> {
        let pipeline = self.create_compute_pipeline("Voxel Keys", VOXEL_KEYS_SHADER);
        let chunk = self
            .max_invocations_per_dispatch()
            .min(self.max_storage_binding_size() / std::mem::size_of::<[f32; 4]>());

        let mut keys = Vec::with_capacity(points.len());
        for range in chunk_ranges(points.len(), chunk) {
            let num_points = range.len();
            let points_buffer = self.create_buffer_init(
                "Voxel Points",
                &pack_points(&points[range]),
                wgpu::BufferUsages::STORAGE,
            );
            let keys_buffer = self.create_buffer(
                "Voxel Keys",
                (num_points * std::mem::size_of::<VoxelKey>()) as u64,
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            );
            let params = GridParams {
                origin: [grid.origin.x, grid.origin.y, grid.origin.z],
                voxel_size: grid.voxel_size,
                num_points: num_points as u32,
                _pad: [0; 3],
            };
            let params_buffer = self.create_buffer_init("Grid Params", &[params], wgpu::BufferUsages::UNIFORM);

            let bind_group = self.create_bind_group(
                "Voxel Keys",
                &pipeline,
                &[&points_buffer, &keys_buffer, &params_buffer],
            );

            let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Voxel Keys Encoder"),
            });
            self.dispatch(&mut encoder, "Voxel Keys Pass", &pipeline, &bind_group, num_points);
            keys.extend(self.read_buffer::<VoxelKey>(encoder, &keys_buffer, num_points).await?);
        }

        Ok(keys)
    }
}

/// GPU-accelerated voxel downsampling
///
/// Same contract as the CPU `voxel_down_sample`: a non-positive voxel size or
/// a grid too large for `i32` keys logs a warning and yields an empty cloud.
pub async fn gpu_voxel_down_sample(
    gpu_context: &GpuContext,
    cloud: &PointCloud,
    voxel_size: f32,
) -> Result<PointCloud> {
    cloud.validate()?;
    let finite = finite_points(cloud)?;

    let grid = match VoxelGrid::covering(&finite.bounding_box(), voxel_size) {
        Ok(grid) => grid,
        Err(e) => {
            warn!("voxel downsampling skipped: {}", e);
            return Ok(PointCloud::new());
        }
    };

    if finite.is_empty() {
        return Ok(PointCloud::new());
    }

    let keys = gpu_context.compute_voxel_keys(&finite.points, &grid).await?;
    let downsampled = down_sample_by_keys(&finite, &keys)?;

    debug!(
        "GPU voxel downsampled {} points to {} (voxel_size={})",
        cloud.len(),
        downsampled.len(),
        voxel_size
    );
    Ok(downsampled)
}
