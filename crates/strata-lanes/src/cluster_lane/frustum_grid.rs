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

//! View-space bounds of every cluster in the grid.

use rayon::prelude::*;
use strata_core::math::{Aabb, Vec3};
use strata_core::renderer::{CameraProjection, ClusterDims, ClusterError};

/// View depth of the boundary between slices `slice - 1` and `slice`.
///
/// `near * (far / near) ^ (slice / slices)`. Boundary `0` is exactly `near` and
/// boundary `slices` is exactly `far`.
pub fn depth_slice(near: f32, far: f32, slice: u32, slices: u32) -> f32 {
    if slice == 0 {
        near
    } else if slice >= slices {
        far
    } else {
        near * (far / near).powf(slice as f32 / slices as f32)
    }
}

/// Derives cluster bounds from a projection and grid dimensions.
///
/// Construction validates both, so a builder always produces finite, non-empty boxes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumGridBuilder {
    projection: CameraProjection,
    dims: ClusterDims,
}

impl FrustumGridBuilder {
    /// Creates a builder, refusing degenerate projections and empty grids.
    pub fn new(projection: CameraProjection, dims: ClusterDims) -> Result<Self, ClusterError> {
        projection.validate()?;
        if dims.x == 0 || dims.y == 0 || dims.z == 0 {
            return Err(ClusterError::InvalidGrid(format!(
                "grid dimensions must be non-zero, got {}x{}x{}",
                dims.x, dims.y, dims.z
            )));
        }
        Ok(Self { projection, dims })
    }

    /// The projection the bounds are derived from.
    pub fn projection(&self) -> &CameraProjection {
        &self.projection
    }

    /// The grid dimensions.
    pub fn dims(&self) -> ClusterDims {
        self.dims
    }

    /// View depth of slice boundary `slice`, in `0..=dims.z`.
    pub fn depth_slice(&self, slice: u32) -> f32 {
        depth_slice(self.projection.near, self.projection.far, slice, self.dims.z)
    }

    /// All `dims.z + 1` slice boundaries, from `near` to `far`.
    pub fn depth_slices(&self) -> Vec<f32> {
        (0..=self.dims.z).map(|z| self.depth_slice(z)).collect()
    }

    /// View-space box of cluster `(x, y, z)`.
    ///
    /// Tile row `y = 0` is the top of the screen, i.e. the largest view-space `y`.
    pub fn cluster_aabb(&self, x: u32, y: u32, z: u32) -> Aabb {
        let nx = self.dims.x as f32;
        let ny = self.dims.y as f32;

        // Normalized device fractions of the tile edges, in [-1, 1].
        let left = 2.0 * x as f32 / nx - 1.0;
        let right = 2.0 * (x + 1) as f32 / nx - 1.0;
        let top = 1.0 - 2.0 * y as f32 / ny;
        let bottom = 1.0 - 2.0 * (y + 1) as f32 / ny;

        [self.depth_slice(z), self.depth_slice(z + 1)]
            .iter()
            .flat_map(|&depth| {
                let (half_w, half_h) = self.projection.half_extents_at(depth);
                [
                    Vec3::new(left * half_w, top * half_h, -depth),
                    Vec3::new(right * half_w, top * half_h, -depth),
                    Vec3::new(left * half_w, bottom * half_h, -depth),
                    Vec3::new(right * half_w, bottom * half_h, -depth),
                ]
            })
            .fold(Aabb::INVALID, |acc, corner| acc.merged_with_point(corner))
    }

    /// Computes the bounds of every cluster, ordered by linear cluster index.
    pub fn build(&self) -> ClusterBounds {
        let dims = self.dims;
        let aabbs: Vec<Aabb> = (0..dims.count())
            .into_par_iter()
            .map(|index| {
                let (x, y, z) = dims.coords(index);
                self.cluster_aabb(x, y, z)
            })
            .collect();

        log::info!(
            "Built cluster bounds: {}x{}x{} grid, depth {}..{}, fov {:.3} rad, aspect {:.3}",
            dims.x,
            dims.y,
            dims.z,
            self.projection.near,
            self.projection.far,
            self.projection.fov_y_radians,
            self.projection.aspect_ratio
        );

        ClusterBounds {
            projection: self.projection,
            dims,
            aabbs,
        }
    }
}

/// View-space boxes of all clusters, valid for one projection.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterBounds {
    projection: CameraProjection,
    dims: ClusterDims,
    aabbs: Vec<Aabb>,
}

impl ClusterBounds {
    /// The projection these bounds were derived from.
    pub fn projection(&self) -> &CameraProjection {
        &self.projection
    }

    /// The grid dimensions.
    pub fn dims(&self) -> ClusterDims {
        self.dims
    }

    /// All boxes, by linear cluster index.
    pub fn aabbs(&self) -> &[Aabb] {
        &self.aabbs
    }

    /// Box of the cluster at `index`.
    pub fn get(&self, index: usize) -> Option<&Aabb> {
        self.aabbs.get(index)
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.aabbs.len()
    }

    /// `true` if there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.aabbs.is_empty()
    }

    /// Whether the bounds still describe `projection`.
    pub fn is_current(&self, projection: &CameraProjection) -> bool {
        self.projection == *projection
    }

    /// Fails with [`ClusterError::StaleBounds`] if the camera moved on to another
    /// projection since these bounds were built.
    pub fn validate_for(&self, projection: &CameraProjection) -> Result<(), ClusterError> {
        if self.is_current(projection) {
            Ok(())
        } else {
            Err(ClusterError::StaleBounds {
                built: self.projection,
                current: *projection,
            })
        }
    }
}
