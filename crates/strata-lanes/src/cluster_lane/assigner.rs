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

//! Light-to-cluster assignment.

use rayon::prelude::*;
use strata_core::math::Aabb;
use strata_core::renderer::{ClusterError, ClusterGridConfig, LightSphere};

use super::frustum_grid::ClusterBounds;

/// Result of assigning lights to a single cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClusterAssignment {
    /// Number of indices written, at most the slot count.
    pub count: u32,
    /// Number of lights that intersect the cluster, including those past the cap.
    pub intersecting: u32,
}

impl ClusterAssignment {
    /// Whether some intersecting lights did not fit.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.intersecting > self.count
    }
}

/// Tests every sphere against `bounds` and writes the indices of the intersecting ones
/// into `slots`, in increasing order.
///
/// When more lights intersect than `slots` can hold, the lowest indices are kept.
/// Slots past the written count are zeroed so the output only depends on the inputs.
pub fn assign_cluster(bounds: &Aabb, spheres: &[LightSphere], slots: &mut [u32]) -> ClusterAssignment {
    let mut written = 0usize;
    let mut intersecting = 0u32;
    for (index, sphere) in spheres.iter().enumerate() {
        if !bounds.intersects_sphere(sphere.center, sphere.radius) {
            continue;
        }
        intersecting += 1;
        if written < slots.len() {
            slots[written] = index as u32;
            written += 1;
        }
    }
    slots[written..].fill(0);
    ClusterAssignment {
        count: written as u32,
        intersecting,
    }
}

/// Aggregate figures for one assignment pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignmentStats {
    /// Clusters with at least one light.
    pub non_empty_clusters: usize,
    /// Sum of all stored counts.
    pub total_references: usize,
    /// Largest stored count.
    pub max_count: u32,
    /// Clusters that hit the cap and dropped lights.
    pub truncated_clusters: usize,
    /// Intersections that were dropped by the cap.
    pub dropped_references: usize,
}

/// Owns the per-cluster light lists for a frame.
///
/// The index arena holds `cluster_count * max_lights_per_cluster` slots and is allocated
/// once. Each assignment overwrites it entirely. Clusters write disjoint slot ranges, so
/// they are processed in parallel without synchronization.
#[derive(Debug, Clone)]
pub struct ClusterAssigner {
    config: ClusterGridConfig,
    counts: Vec<u32>,
    intersecting: Vec<u32>,
    indices: Vec<u32>,
}

impl ClusterAssigner {
    /// Allocates the arena for `config`.
    pub fn new(config: ClusterGridConfig) -> Result<Self, ClusterError> {
        config.validate()?;
        let clusters = config.cluster_count();
        Ok(Self {
            config,
            counts: vec![0; clusters],
            intersecting: vec![0; clusters],
            indices: vec![0; config.index_slots()],
        })
    }

    /// The grid configuration the arena was sized for.
    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    /// Assigns `spheres` (view space, indexed by light index) to the clusters of `bounds`.
    pub fn assign(
        &mut self,
        bounds: &ClusterBounds,
        spheres: &[LightSphere],
    ) -> Result<AssignmentStats, ClusterError> {
        if bounds.dims() != self.config.dims {
            let (b, c) = (bounds.dims(), self.config.dims);
            return Err(ClusterError::InvalidGrid(format!(
                "bounds cover a {}x{}x{} grid but the assigner was sized for {}x{}x{}",
                b.x, b.y, b.z, c.x, c.y, c.z
            )));
        }
        if spheres.len() > u32::MAX as usize {
            return Err(ClusterError::CapacityExceeded {
                requested: spheres.len(),
                capacity: u32::MAX as usize,
            });
        }

        let cap = self.config.max_lights_per_cluster as usize;
        self.indices
            .par_chunks_mut(cap)
            .zip(self.counts.par_iter_mut())
            .zip(self.intersecting.par_iter_mut())
            .zip(bounds.aabbs().par_iter())
            .for_each(|(((slots, count), intersecting), aabb)| {
                let result = assign_cluster(aabb, spheres, slots);
                *count = result.count;
                *intersecting = result.intersecting;
            });

        Ok(self.stats())
    }

    /// Figures for the last assignment.
    pub fn stats(&self) -> AssignmentStats {
        self.counts.iter().zip(&self.intersecting).fold(
            AssignmentStats::default(),
            |mut stats, (&count, &intersecting)| {
                if count > 0 {
                    stats.non_empty_clusters += 1;
                }
                if intersecting > count {
                    stats.truncated_clusters += 1;
                    stats.dropped_references += (intersecting - count) as usize;
                }
                stats.total_references += count as usize;
                stats.max_count = stats.max_count.max(count);
                stats
            },
        )
    }

    /// Stored light count of every cluster, by linear index.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The whole index arena, `max_lights_per_cluster` slots per cluster.
    pub fn index_slots(&self) -> &[u32] {
        &self.indices
    }

    /// Light indices stored for `cluster`, or `None` if it is out of range.
    pub fn cluster_lights(&self, cluster: usize) -> Option<&[u32]> {
        let count = *self.counts.get(cluster)? as usize;
        let start = cluster * self.config.max_lights_per_cluster as usize;
        Some(&self.indices[start..start + count])
    }

    /// Assignment outcome for `cluster`.
    pub fn assignment(&self, cluster: usize) -> Option<ClusterAssignment> {
        Some(ClusterAssignment {
            count: *self.counts.get(cluster)?,
            intersecting: self.intersecting[cluster],
        })
    }
}
