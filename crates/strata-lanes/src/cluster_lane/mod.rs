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

//! Clustered light culling.
//!
//! The per-frame flow is:
//!
//! 1. [`FrustumGridBuilder`] derives the view-space [`ClusterBounds`] of every cluster,
//!    only when the projection changes.
//! 2. [`LightStore`] holds the frame's lights and produces their view-space spheres.
//! 3. [`ClusterAssigner`] tests every sphere against every cluster, in parallel per
//!    cluster, into a fixed arena of index slots.
//! 4. [`ClusterBufferWriter`] serializes the lists into fixed-size records.
//!
//! [`ClusterCullingLane`] runs these steps in order and uploads the results.

mod assigner;
mod buffer_writer;
mod culling_lane;
mod frustum_grid;
mod light_store;
pub mod shaders;

pub use self::assigner::{assign_cluster, AssignmentStats, ClusterAssigner, ClusterAssignment};
pub use self::buffer_writer::{ClusterBufferWriter, ClusterRecord};
pub use self::culling_lane::{ClusterCullingLane, ClusterGpuBuffers, FrameStats, GpuBufferSlot};
pub use self::frustum_grid::{depth_slice, ClusterBounds, FrustumGridBuilder};
pub use self::light_store::LightStore;
