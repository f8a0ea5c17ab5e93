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

//! Point light description and its GPU representations.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::error::ClusterError;
use crate::math::Vec3;

/// A spherical point light in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    /// Center of the light.
    pub position: Vec3,
    /// Radius of influence. Beyond it the light contributes nothing.
    pub radius: f32,
    /// Linear RGB color.
    pub color: Vec3,
    /// Intensity multiplier applied to `color`.
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 2.0,
            color: Vec3::ONE,
            intensity: 1.0,
        }
    }
}

impl PointLight {
    /// A white light of unit intensity.
    pub fn new(position: Vec3, radius: f32) -> Self {
        Self {
            position,
            radius,
            ..Default::default()
        }
    }

    /// Sets the color.
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Sets the intensity.
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    /// Checks the light against the store contract. `index` is only used for reporting.
    pub fn validate(&self, index: usize) -> Result<(), ClusterError> {
        let reason = if !self.position.is_finite() {
            "position must be finite"
        } else if !self.radius.is_finite() {
            "radius must be finite"
        } else if self.radius <= 0.0 {
            "radius must be positive"
        } else {
            return Ok(());
        };
        Err(ClusterError::InvalidLight { index, reason })
    }
}

/// The bounding sphere of a light in view space, as consumed by the assigner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSphere {
    /// View-space center.
    pub center: Vec3,
    /// Radius of influence.
    pub radius: f32,
}

impl LightSphere {
    /// Creates a sphere.
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// GPU layout of a single point light in the light-set storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    /// World-space position.
    pub position: [f32; 3],
    /// Radius of influence.
    pub radius: f32,
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Intensity multiplier.
    pub intensity: f32,
}

impl From<&PointLight> for GpuPointLight {
    fn from(light: &PointLight) -> Self {
        Self {
            position: light.position.to_array(),
            radius: light.radius,
            color: light.color.to_array(),
            intensity: light.intensity,
        }
    }
}

/// Header preceding the light array in the light-set storage buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct LightSetHeader {
    /// Number of valid lights following the header.
    pub count: u32,
    /// Pads the header to 16 bytes so the array starts aligned.
    pub _padding: [u32; 3],
}

impl LightSetHeader {
    /// Creates a header for `count` lights.
    pub const fn new(count: u32) -> Self {
        Self {
            count,
            _padding: [0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layouts() {
        assert_eq!(std::mem::size_of::<GpuPointLight>(), 32);
        assert_eq!(std::mem::size_of::<LightSetHeader>(), 16);
    }

    #[test]
    fn test_validate() {
        assert!(PointLight::new(Vec3::ONE, 1.0).validate(0).is_ok());

        let err = PointLight::new(Vec3::ONE, 0.0).validate(3).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidLight { index: 3, .. }));

        assert!(PointLight::new(Vec3::ONE, -1.0).validate(0).is_err());
        assert!(PointLight::new(Vec3::ONE, f32::NAN).validate(0).is_err());
        assert!(PointLight::new(Vec3::new(f32::INFINITY, 0.0, 0.0), 1.0)
            .validate(0)
            .is_err());
    }

    #[test]
    fn test_gpu_conversion() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 4.0)
            .with_color(Vec3::new(0.5, 0.25, 1.0))
            .with_intensity(2.0);
        let gpu = GpuPointLight::from(&light);
        assert_eq!(gpu.position, [1.0, 2.0, 3.0]);
        assert_eq!(gpu.radius, 4.0);
        assert_eq!(gpu.color, [0.5, 0.25, 1.0]);
        assert_eq!(gpu.intensity, 2.0);
    }
}
