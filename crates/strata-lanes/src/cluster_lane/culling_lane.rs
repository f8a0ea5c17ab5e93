// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-frame orchestration of the clustering pipeline.

use std::borrow::Cow;

use strata_core::renderer::{
    BufferDescriptor, BufferDevice, BufferId, BufferUsage, CameraState, ClusterCameraUniforms,
    ClusterError, ClusterGridConfig, ClusterGridUniforms, LightSphere,
};
use strata_core::ClusterSettings;

use super::assigner::{AssignmentStats, ClusterAssigner};
use super::buffer_writer::ClusterBufferWriter;
use super::frustum_grid::{ClusterBounds, FrustumGridBuilder};
use super::light_store::LightStore;

/// Fixed overhead of a clustering pass (in ms).
const CLUSTERING_OVERHEAD: f32 = 0.05;

/// Cost per cluster for clearing and serializing its record (in ms).
const PER_CLUSTER_COST: f32 = 0.00002;

/// Cost per light-cluster sphere test (in ms).
const LIGHT_CLUSTER_TEST_COST: f32 = 0.000002;

/// What a single [`ClusterCullingLane::prepare_frame`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frame counter, starting at 0.
    pub frame_index: u64,
    /// Lights that were clustered.
    pub light_count: usize,
    /// Whether the cluster bounds were rebuilt this frame.
    pub rebuilt_bounds: bool,
    /// Clusters with at least one light.
    pub non_empty_clusters: usize,
    /// Sum of all stored counts.
    pub total_references: usize,
    /// Largest stored count.
    pub max_count: u32,
    /// Clusters that dropped lights because of the cap.
    pub truncated_clusters: usize,
    /// Intersections dropped because of the cap.
    pub dropped_references: usize,
}

impl FrameStats {
    fn new(
        frame_index: u64,
        light_count: usize,
        rebuilt_bounds: bool,
        assignment: AssignmentStats,
    ) -> Self {
        Self {
            frame_index,
            light_count,
            rebuilt_bounds,
            non_empty_clusters: assignment.non_empty_clusters,
            total_references: assignment.total_references,
            max_count: assignment.max_count,
            truncated_clusters: assignment.truncated_clusters,
            dropped_references: assignment.dropped_references,
        }
    }
}

/// A device buffer and the size it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBufferSlot {
    /// The device handle.
    pub id: BufferId,
    /// Size in bytes.
    pub size: u64,
}

/// Device buffers owned by the lane, for binding by the shading pass.
///
/// The lookup shader binds them in group 0 as camera uniforms (0), light set (1),
/// clusters (2) and grid uniforms (3).
#[derive(Debug, Default)]
pub struct ClusterGpuBuffers {
    /// `[count][indices]` records, storage.
    pub cluster_buffer: Option<GpuBufferSlot>,
    /// `{count, lights[]}`, storage.
    pub light_buffer: Option<GpuBufferSlot>,
    /// [`ClusterCameraUniforms`], uniform.
    pub camera_uniforms: Option<GpuBufferSlot>,
    /// [`ClusterGridUniforms`], uniform.
    pub grid_uniforms: Option<GpuBufferSlot>,
}

impl ClusterGpuBuffers {
    /// Returns true once every buffer has been created.
    pub fn is_initialized(&self) -> bool {
        self.cluster_buffer.is_some()
            && self.light_buffer.is_some()
            && self.camera_uniforms.is_some()
            && self.grid_uniforms.is_some()
    }
}

/// Runs the clustering steps for each frame and pushes the results to a device.
///
/// Bounds are cached and rebuilt only when the camera projection changes. The assigner
/// arena, the cluster buffer and the scratch sphere list are allocated once.
#[derive(Debug)]
pub struct ClusterCullingLane {
    config: ClusterGridConfig,
    bounds: Option<ClusterBounds>,
    assigner: ClusterAssigner,
    writer: ClusterBufferWriter,
    spheres: Vec<LightSphere>,
    light_bytes: Vec<u8>,
    light_storage_size: u64,
    camera_uniforms: ClusterCameraUniforms,
    grid_uniforms: ClusterGridUniforms,
    gpu: ClusterGpuBuffers,
    frame_index: u64,
    truncating: bool,
    prepared: bool,
}

impl ClusterCullingLane {
    /// Creates a lane for `config`.
    pub fn new(config: ClusterGridConfig) -> Result<Self, ClusterError> {
        Ok(Self {
            config,
            bounds: None,
            assigner: ClusterAssigner::new(config)?,
            writer: ClusterBufferWriter::new(config)?,
            spheres: Vec::new(),
            light_bytes: Vec::new(),
            light_storage_size: 0,
            camera_uniforms: bytemuck::Zeroable::zeroed(),
            grid_uniforms: bytemuck::Zeroable::zeroed(),
            gpu: ClusterGpuBuffers::default(),
            frame_index: 0,
            truncating: false,
            prepared: false,
        })
    }

    /// Creates a lane from loaded settings.
    pub fn from_settings(settings: &ClusterSettings) -> Result<Self, ClusterError> {
        settings.validate()?;
        Self::new(settings.grid)
    }

    /// The grid configuration.
    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    /// Cached cluster bounds, once a frame has been prepared.
    pub fn bounds(&self) -> Option<&ClusterBounds> {
        self.bounds.as_ref()
    }

    /// The per-cluster lists of the last prepared frame.
    pub fn assigner(&self) -> &ClusterAssigner {
        &self.assigner
    }

    /// The serialized cluster buffer of the last prepared frame.
    pub fn writer(&self) -> &ClusterBufferWriter {
        &self.writer
    }

    /// Device buffers created by [`ClusterCullingLane::upload`].
    pub fn gpu_buffers(&self) -> &ClusterGpuBuffers {
        &self.gpu
    }

    /// Camera uniforms of the last prepared frame.
    pub fn camera_uniforms(&self) -> &ClusterCameraUniforms {
        &self.camera_uniforms
    }

    /// Grid uniforms of the last prepared frame.
    pub fn grid_uniforms(&self) -> &ClusterGridUniforms {
        &self.grid_uniforms
    }

    /// Forces the bounds to be rebuilt on the next frame.
    pub fn invalidate_bounds(&mut self) {
        self.bounds = None;
    }

    /// Rough cost of a frame in milliseconds, for budget decisions.
    pub fn estimate_cost(&self, light_count: usize) -> f32 {
        let clusters = self.config.cluster_count() as f32;
        CLUSTERING_OVERHEAD
            + clusters * PER_CLUSTER_COST
            + clusters * light_count as f32 * LIGHT_CLUSTER_TEST_COST
    }

    /// Clusters `lights` for `camera` and serializes the result.
    ///
    /// Must run after the light store was updated for the frame and before
    /// [`ClusterCullingLane::upload`].
    pub fn prepare_frame(
        &mut self,
        camera: &CameraState,
        lights: &LightStore,
    ) -> Result<FrameStats, ClusterError> {
        let projection = camera.projection();
        let mut rebuilt_bounds = false;
        let bounds = match self.bounds.take() {
            Some(bounds) if bounds.is_current(projection) => bounds,
            _ => {
                rebuilt_bounds = true;
                FrustumGridBuilder::new(*projection, self.config.dims)?.build()
            }
        };
        let bounds = self.bounds.insert(bounds);

        lights.view_spheres(&camera.view(), &mut self.spheres);
        let assignment = self.assigner.assign(bounds, &self.spheres)?;
        self.writer.write(&self.assigner)?;

        lights.write_storage(&mut self.light_bytes);
        self.light_storage_size = lights.storage_size_bytes();
        self.camera_uniforms = camera.uniforms();
        self.grid_uniforms = self.config.uniforms(projection);

        let stats = FrameStats::new(self.frame_index, lights.len(), rebuilt_bounds, assignment);
        self.report_truncation(&stats);
        log::debug!(
            "Cluster frame {}: {} lights, {} non-empty clusters, {} references, max {} per cluster",
            stats.frame_index,
            stats.light_count,
            stats.non_empty_clusters,
            stats.total_references,
            stats.max_count
        );

        self.frame_index += 1;
        self.prepared = true;
        Ok(stats)
    }

    /// Pushes the cluster buffer, the light set and both uniform blocks to `device`.
    ///
    /// Buffers are created on first use and recreated when their size changes. The
    /// caller submits its shading work after this returns.
    pub fn upload(&mut self, device: &dyn BufferDevice) -> Result<(), ClusterError> {
        if !self.prepared {
            log::warn!("Cluster upload requested before any frame was prepared");
            return Ok(());
        }
        if let Err(err) = self.upload_inner(device) {
            log::error!("Failed to upload cluster data: {err}");
            return Err(err);
        }
        Ok(())
    }

    fn upload_inner(&mut self, device: &dyn BufferDevice) -> Result<(), ClusterError> {
        let cluster = ensure_buffer(
            device,
            &mut self.gpu.cluster_buffer,
            "cluster_light_lists",
            self.writer.size_bytes(),
            BufferUsage::STORAGE | BufferUsage::COPY_DST,
        )?;
        self.writer.upload(device, cluster)?;

        let lights = ensure_buffer(
            device,
            &mut self.gpu.light_buffer,
            "cluster_light_set",
            self.light_storage_size,
            BufferUsage::STORAGE | BufferUsage::COPY_DST,
        )?;
        device.write_buffer(lights, 0, &self.light_bytes)?;

        let camera = ensure_buffer(
            device,
            &mut self.gpu.camera_uniforms,
            "cluster_camera_uniforms",
            std::mem::size_of::<ClusterCameraUniforms>() as u64,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        )?;
        device.write_buffer(camera, 0, bytemuck::bytes_of(&self.camera_uniforms))?;

        let grid = ensure_buffer(
            device,
            &mut self.gpu.grid_uniforms,
            "cluster_grid_uniforms",
            std::mem::size_of::<ClusterGridUniforms>() as u64,
            BufferUsage::UNIFORM | BufferUsage::COPY_DST,
        )?;
        device.write_buffer(grid, 0, bytemuck::bytes_of(&self.grid_uniforms))?;

        log::debug!(
            "Uploaded cluster data: {} + {} bytes of storage",
            self.writer.size_bytes(),
            self.light_bytes.len()
        );
        Ok(())
    }

    /// Destroys every device buffer owned by the lane.
    pub fn release(&mut self, device: &dyn BufferDevice) -> Result<(), ClusterError> {
        let slots = [
            self.gpu.cluster_buffer.take(),
            self.gpu.light_buffer.take(),
            self.gpu.camera_uniforms.take(),
            self.gpu.grid_uniforms.take(),
        ];
        for slot in slots.into_iter().flatten() {
            device.destroy_buffer(slot.id)?;
        }
        Ok(())
    }

    fn report_truncation(&mut self, stats: &FrameStats) {
        let truncating = stats.truncated_clusters > 0;
        if truncating && !self.truncating {
            log::warn!(
                "{} clusters exceed {} lights, {} light references dropped (lowest indices kept)",
                stats.truncated_clusters,
                self.config.max_lights_per_cluster,
                stats.dropped_references
            );
        } else if !truncating && self.truncating {
            log::info!("No cluster exceeds the light cap anymore");
        }
        self.truncating = truncating;
    }
}

/// Returns the buffer in `slot`, creating it or replacing it if its size differs.
fn ensure_buffer(
    device: &dyn BufferDevice,
    slot: &mut Option<GpuBufferSlot>,
    label: &'static str,
    size: u64,
    usage: BufferUsage,
) -> Result<BufferId, ClusterError> {
    if let Some(existing) = slot {
        if existing.size == size {
            return Ok(existing.id);
        }
        device.destroy_buffer(existing.id)?;
        *slot = None;
    }
    let id = device.create_buffer(&BufferDescriptor {
        label: Some(Cow::Borrowed(label)),
        size,
        usage,
        mapped_at_creation: false,
    })?;
    log::debug!("Created buffer '{label}' ({size} bytes) as {id:?}");
    *slot = Some(GpuBufferSlot { id, size });
    Ok(id)
}
