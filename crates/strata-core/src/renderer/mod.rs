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

//! Backend-agnostic contracts for the clustered lighting pipeline.
//!
//! This module is the shared configuration surface between the producer (the
//! clustering lane in `strata-lanes`) and the shading consumer: grid dimensions,
//! record layout, camera and light GPU layouts, and the cluster addressing rule all
//! live here so both sides are built from the same values.

pub mod api;
pub mod camera;
pub mod cluster;
pub mod error;
pub mod light;
pub mod traits;

pub use self::api::*;
pub use self::camera::{CameraProjection, CameraState, ClusterCameraUniforms};
pub use self::cluster::{ClusterDims, ClusterGridConfig, ClusterGridUniforms};
pub use self::error::{ClusterError, ResourceError};
pub use self::light::{GpuPointLight, LightSetHeader, LightSphere, PointLight};
pub use self::traits::BufferDevice;
