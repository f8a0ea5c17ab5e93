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

//! Cluster grid configuration shared by the clustering producer and the shading consumer.
//!
//! The view frustum is split into `x * y` uniform screen tiles and `z` logarithmic depth
//! slices between the near and far planes. Every cluster owns a fixed-size record in the
//! cluster buffer:
//!
//! ```text
//! [count: u32][indices: u32 x max_lights_per_cluster]
//! ```
//!
//! Records are laid out by linear cluster index `x + y * X + z * X * Y`. Tile row `y = 0`
//! is the top of the screen, matching framebuffer coordinates.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::camera::{CameraProjection, CameraState};
use super::error::ClusterError;

/// Number of clusters along each axis of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterDims {
    /// Horizontal screen tiles.
    pub x: u32,
    /// Vertical screen tiles.
    pub y: u32,
    /// Depth slices.
    pub z: u32,
}

impl Default for ClusterDims {
    fn default() -> Self {
        Self::new(16, 9, 24)
    }
}

impl ClusterDims {
    /// Creates grid dimensions. See [`ClusterGridConfig::new`] for validation.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of clusters.
    #[inline]
    pub const fn count(&self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    /// Linear index of cluster `(x, y, z)`.
    #[inline]
    pub const fn linear_index(&self, x: u32, y: u32, z: u32) -> usize {
        x as usize + y as usize * self.x as usize + z as usize * self.x as usize * self.y as usize
    }

    /// Inverse of [`ClusterDims::linear_index`].
    #[inline]
    pub const fn coords(&self, index: usize) -> (u32, u32, u32) {
        let plane = self.x as usize * self.y as usize;
        let z = index / plane;
        let rem = index % plane;
        (
            (rem % self.x as usize) as u32,
            (rem / self.x as usize) as u32,
            z as u32,
        )
    }
}

/// The single source of truth for grid dimensions and the per-cluster light cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterGridConfig {
    /// Grid dimensions.
    pub dims: ClusterDims,
    /// Capacity of each cluster's index list. Lights past it are dropped, keeping
    /// the lowest indices.
    pub max_lights_per_cluster: u32,
}

impl Default for ClusterGridConfig {
    fn default() -> Self {
        Self {
            dims: ClusterDims::default(),
            max_lights_per_cluster: 256,
        }
    }
}

impl ClusterGridConfig {
    /// Creates a validated configuration.
    pub fn new(dims: ClusterDims, max_lights_per_cluster: u32) -> Result<Self, ClusterError> {
        let config = Self {
            dims,
            max_lights_per_cluster,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every dimension and the cap must be non-zero, and the buffer must be addressable
    /// with 32-bit word offsets.
    pub fn validate(&self) -> Result<(), ClusterError> {
        let ClusterDims { x, y, z } = self.dims;
        if x == 0 || y == 0 || z == 0 {
            return Err(ClusterError::InvalidGrid(format!(
                "grid dimensions must be non-zero, got {x}x{y}x{z}"
            )));
        }
        if self.max_lights_per_cluster == 0 {
            return Err(ClusterError::InvalidGrid(
                "max_lights_per_cluster must be non-zero".to_string(),
            ));
        }
        let words = self.dims.count() as u64 * self.record_stride_words() as u64;
        if words > u32::MAX as u64 {
            return Err(ClusterError::InvalidGrid(format!(
                "cluster buffer of {words} words is not addressable"
            )));
        }
        Ok(())
    }

    /// Total number of clusters.
    #[inline]
    pub fn cluster_count(&self) -> usize {
        self.dims.count()
    }

    /// Number of `u32` words in one cluster record.
    #[inline]
    pub fn record_stride_words(&self) -> usize {
        1 + self.max_lights_per_cluster as usize
    }

    /// Byte size of one cluster record.
    #[inline]
    pub fn record_size_bytes(&self) -> u64 {
        (self.record_stride_words() * std::mem::size_of::<u32>()) as u64
    }

    /// Byte size of the whole cluster buffer.
    #[inline]
    pub fn buffer_size_bytes(&self) -> u64 {
        self.cluster_count() as u64 * self.record_size_bytes()
    }

    /// Number of slots in the flat index arena.
    #[inline]
    pub fn index_slots(&self) -> usize {
        self.cluster_count() * self.max_lights_per_cluster as usize
    }

    /// Depth slice containing `view_depth`, clamped to the grid.
    pub fn depth_slice(&self, view_depth: f32, projection: &CameraProjection) -> u32 {
        let t = (view_depth / projection.near).ln() / projection.log_depth_range();
        clamp_cell(t * self.dims.z as f32, self.dims.z)
    }

    /// Cluster coordinates of a fragment at pixel `(screen_x, screen_y)` and positive
    /// view depth.
    pub fn cluster_coords_for_fragment(
        &self,
        screen_x: f32,
        screen_y: f32,
        view_depth: f32,
        camera: &CameraState,
    ) -> (u32, u32, u32) {
        let x = clamp_cell(
            screen_x / camera.screen_width() as f32 * self.dims.x as f32,
            self.dims.x,
        );
        let y = clamp_cell(
            screen_y / camera.screen_height() as f32 * self.dims.y as f32,
            self.dims.y,
        );
        (x, y, self.depth_slice(view_depth, camera.projection()))
    }

    /// Linear cluster index of a fragment, the same lookup the shading pass performs.
    pub fn cluster_index_for_fragment(
        &self,
        screen_x: f32,
        screen_y: f32,
        view_depth: f32,
        camera: &CameraState,
    ) -> usize {
        let (x, y, z) = self.cluster_coords_for_fragment(screen_x, screen_y, view_depth, camera);
        self.dims.linear_index(x, y, z)
    }

    /// Packs the grid constants for the shading pass.
    pub fn uniforms(&self, projection: &CameraProjection) -> ClusterGridUniforms {
        ClusterGridUniforms {
            dims: [self.dims.x, self.dims.y, self.dims.z],
            max_lights_per_cluster: self.max_lights_per_cluster,
            near: projection.near,
            far: projection.far,
            log_far_over_near: projection.log_depth_range(),
            _padding: 0.0,
        }
    }
}

/// `floor(value)` clamped to `[0, cells - 1]`. NaN maps to 0.
#[inline]
fn clamp_cell(value: f32, cells: u32) -> u32 {
    let cell = value.floor();
    if cell >= 0.0 {
        (cell as u32).min(cells.saturating_sub(1))
    } else {
        0
    }
}

/// Grid constants as seen by the shading pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ClusterGridUniforms {
    /// Grid dimensions.
    pub dims: [u32; 3],
    /// Capacity of each cluster record.
    pub max_lights_per_cluster: u32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// `ln(far / near)`.
    pub log_far_over_near: f32,
    /// Padding for 16-byte alignment.
    pub _padding: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, PI};

    #[test]
    fn test_default_config() {
        let config = ClusterGridConfig::default();
        assert_eq!(config.dims, ClusterDims::new(16, 9, 24));
        assert_eq!(config.cluster_count(), 3456);
        assert_eq!(config.record_stride_words(), 257);
        assert_eq!(config.record_size_bytes(), 1028);
        assert_eq!(config.buffer_size_bytes(), 3456 * 1028);
        assert_eq!(config.index_slots(), 3456 * 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(ClusterGridConfig::new(ClusterDims::new(0, 1, 1), 4).is_err());
        assert!(ClusterGridConfig::new(ClusterDims::new(1, 1, 0), 4).is_err());
        assert!(ClusterGridConfig::new(ClusterDims::new(1, 1, 1), 0).is_err());
        assert!(ClusterGridConfig::new(ClusterDims::new(1024, 1024, 1024), 64).is_err());
    }

    #[test]
    fn test_linear_index_bijection() {
        let dims = ClusterDims::new(3, 4, 5);
        let mut seen = vec![false; dims.count()];
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let i = dims.linear_index(x, y, z);
                    assert!(!seen[i]);
                    seen[i] = true;
                    assert_eq!(dims.coords(i), (x, y, z));
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_depth_slice() {
        let config = ClusterGridConfig::new(ClusterDims::new(1, 1, 4), 8).unwrap();
        let p = CameraProjection::new(0.1, 100.0, PI / 2.0, 1.0).unwrap();
        assert_eq!(config.depth_slice(0.1, &p), 0);
        assert_eq!(config.depth_slice(0.05, &p), 0);
        assert_eq!(config.depth_slice(0.5, &p), 0);
        assert_eq!(config.depth_slice(1.0, &p), 1);
        assert_eq!(config.depth_slice(5.0, &p), 2);
        assert_eq!(config.depth_slice(50.0, &p), 3);
        assert_eq!(config.depth_slice(1000.0, &p), 3);
        assert_eq!(config.depth_slice(f32::NAN, &p), 0);
    }

    #[test]
    fn test_fragment_lookup_clamps() {
        let config = ClusterGridConfig::new(ClusterDims::new(4, 2, 4), 8).unwrap();
        let p = CameraProjection::new(0.1, 100.0, PI / 2.0, 2.0).unwrap();
        let camera = CameraState::new(p, Mat4::IDENTITY, 400, 200).unwrap();

        assert_eq!(
            config.cluster_coords_for_fragment(0.0, 0.0, 0.1, &camera),
            (0, 0, 0)
        );
        assert_eq!(
            config.cluster_coords_for_fragment(150.0, 120.0, 5.0, &camera),
            (1, 1, 2)
        );
        assert_eq!(
            config.cluster_coords_for_fragment(400.0, 200.0, 100.0, &camera),
            (3, 1, 3)
        );
        assert_eq!(
            config.cluster_index_for_fragment(-5.0, 999.0, 5.0, &camera),
            config.dims.linear_index(0, 1, 2)
        );
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<ClusterGridUniforms>(), 32);
        let config = ClusterGridConfig::default();
        let p = CameraProjection::default();
        let u = config.uniforms(&p);
        assert_eq!(u.dims, [16, 9, 24]);
        assert_eq!(u.max_lights_per_cluster, 256);
        assert!((u.log_far_over_near - (500.0f32).ln()).abs() < 1e-5);
    }
}
