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

//! Camera projection parameters, per-frame camera state and its GPU uniform layout.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::error::ClusterError;
use crate::math::{degrees_to_radians, Mat4, Vec3, PI};

/// The projection parameters the cluster grid is derived from.
///
/// Two projections that compare equal produce identical cluster bounds, so this value
/// doubles as the cache key for the frustum grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraProjection {
    /// Distance to the near clipping plane, in view units.
    pub near: f32,
    /// Distance to the far clipping plane, in view units.
    pub far: f32,
    /// Full vertical field of view, in radians.
    pub fov_y_radians: f32,
    /// Width divided by height of the viewport.
    pub aspect_ratio: f32,
}

impl Default for CameraProjection {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 50.0,
            fov_y_radians: degrees_to_radians(45.0),
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

impl CameraProjection {
    /// Creates a validated projection.
    pub fn new(
        near: f32,
        far: f32,
        fov_y_radians: f32,
        aspect_ratio: f32,
    ) -> Result<Self, ClusterError> {
        let projection = Self {
            near,
            far,
            fov_y_radians,
            aspect_ratio,
        };
        projection.validate()?;
        Ok(projection)
    }

    /// Same as [`CameraProjection::new`] with the field of view given in degrees.
    pub fn from_degrees(
        near: f32,
        far: f32,
        fov_y_degrees: f32,
        aspect_ratio: f32,
    ) -> Result<Self, ClusterError> {
        Self::new(near, far, degrees_to_radians(fov_y_degrees), aspect_ratio)
    }

    /// Checks `0 < near < far`, `0 < fov < PI` and a positive aspect ratio.
    pub fn validate(&self) -> Result<(), ClusterError> {
        let finite = self.near.is_finite()
            && self.far.is_finite()
            && self.fov_y_radians.is_finite()
            && self.aspect_ratio.is_finite();
        if !finite {
            return Err(ClusterError::InvalidProjection(
                "all projection parameters must be finite".to_string(),
            ));
        }
        if self.near <= 0.0 {
            return Err(ClusterError::InvalidProjection(format!(
                "near plane must be positive, got {}",
                self.near
            )));
        }
        if self.far <= self.near {
            return Err(ClusterError::InvalidProjection(format!(
                "far plane ({}) must lie beyond the near plane ({})",
                self.far, self.near
            )));
        }
        if self.fov_y_radians <= 0.0 || self.fov_y_radians >= PI {
            return Err(ClusterError::InvalidProjection(format!(
                "vertical field of view must be in (0, pi), got {}",
                self.fov_y_radians
            )));
        }
        if self.aspect_ratio <= 0.0 {
            return Err(ClusterError::InvalidProjection(format!(
                "aspect ratio must be positive, got {}",
                self.aspect_ratio
            )));
        }
        Ok(())
    }

    /// `tan(fov_y / 2)`.
    #[inline]
    pub fn tan_half_fov(&self) -> f32 {
        (self.fov_y_radians * 0.5).tan()
    }

    /// Half-width and half-height of the view frustum cross-section at `depth`.
    #[inline]
    pub fn half_extents_at(&self, depth: f32) -> (f32, f32) {
        let half_height = depth * self.tan_half_fov();
        (half_height * self.aspect_ratio, half_height)
    }

    /// `ln(far / near)`, the denominator of the logarithmic depth slicing.
    #[inline]
    pub fn log_depth_range(&self) -> f32 {
        (self.far / self.near).ln()
    }

    /// Right-handed projection matrix with a `[0, 1]` depth range.
    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_zo(self.fov_y_radians, self.aspect_ratio, self.near, self.far)
    }

    /// Analytic inverse of [`CameraProjection::matrix`].
    pub fn inverse_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_zo_inverse(self.fov_y_radians, self.aspect_ratio, self.near, self.far)
    }
}

/// Slack allowed on the orthonormality of the view's linear part.
const RIGID_TOLERANCE: f32 = 1e-4;

/// Everything the clustering pipeline needs to know about the camera for one frame.
///
/// The view matrix is right-handed: the camera looks down `-Z` and the view depth of a
/// point is `-z` of its view-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    projection: CameraProjection,
    view: Mat4,
    inverse_view: Mat4,
    screen_width: u32,
    screen_height: u32,
}

impl CameraState {
    /// Creates a camera state from an explicit view matrix.
    ///
    /// Fails when the projection is invalid, the screen has a zero dimension, or the
    /// view matrix is not a rigid transform (it scales, shears or mirrors).
    pub fn new(
        projection: CameraProjection,
        view: Mat4,
        screen_width: u32,
        screen_height: u32,
    ) -> Result<Self, ClusterError> {
        projection.validate()?;
        check_screen(screen_width, screen_height)?;
        let inverse_view = rigid_inverse(&view)?;
        Ok(Self {
            projection,
            view,
            inverse_view,
            screen_width,
            screen_height,
        })
    }

    /// Creates a camera at `eye` looking at `target`.
    pub fn look_at(
        projection: CameraProjection,
        eye: Vec3,
        target: Vec3,
        up: Vec3,
        screen_width: u32,
        screen_height: u32,
    ) -> Result<Self, ClusterError> {
        let view = Mat4::look_at_rh(eye, target, up).ok_or_else(|| {
            ClusterError::InvalidCamera(
                "eye and target coincide or up is parallel to the view direction".to_string(),
            )
        })?;
        Self::new(projection, view, screen_width, screen_height)
    }

    /// Updates the screen size and derives the new aspect ratio from it.
    pub fn resize(&mut self, screen_width: u32, screen_height: u32) -> Result<(), ClusterError> {
        check_screen(screen_width, screen_height)?;
        self.screen_width = screen_width;
        self.screen_height = screen_height;
        self.projection.aspect_ratio = screen_width as f32 / screen_height as f32;
        Ok(())
    }

    /// Replaces the view matrix, e.g. after the camera moved.
    ///
    /// The view must be rigid, as for [`CameraState::new`]. On failure the previous
    /// view is kept.
    pub fn set_view(&mut self, view: Mat4) -> Result<(), ClusterError> {
        self.inverse_view = rigid_inverse(&view)?;
        self.view = view;
        Ok(())
    }

    /// The projection parameters.
    #[inline]
    pub fn projection(&self) -> &CameraProjection {
        &self.projection
    }

    /// World-to-view transform.
    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// View-to-world transform.
    #[inline]
    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// Screen width in pixels.
    #[inline]
    pub fn screen_width(&self) -> u32 {
        self.screen_width
    }

    /// Screen height in pixels.
    #[inline]
    pub fn screen_height(&self) -> u32 {
        self.screen_height
    }

    /// The projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// The inverse projection matrix.
    pub fn inverse_projection(&self) -> Mat4 {
        self.projection.inverse_matrix()
    }

    /// `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view
    }

    /// `inverse_view * inverse_projection`.
    pub fn inverse_view_projection(&self) -> Mat4 {
        self.inverse_view * self.inverse_projection()
    }

    /// Transforms a world-space point into view space.
    #[inline]
    pub fn world_to_view(&self, point: Vec3) -> Vec3 {
        self.view.transform_point3(point)
    }

    /// Packs the camera into its GPU uniform layout.
    pub fn uniforms(&self) -> ClusterCameraUniforms {
        ClusterCameraUniforms {
            view_proj: self.view_projection().to_cols_array_2d(),
            inv_view_proj: self.inverse_view_projection().to_cols_array_2d(),
            view: self.view.to_cols_array_2d(),
            inv_proj: self.inverse_projection().to_cols_array_2d(),
            z_planes: [self.projection.near, self.projection.far],
            screen_dimensions: [self.screen_width as f32, self.screen_height as f32],
        }
    }
}

/// Light radii are carried into view space unchanged, so the view may only rotate
/// and translate.
fn rigid_inverse(view: &Mat4) -> Result<Mat4, ClusterError> {
    if !view.is_rigid(RIGID_TOLERANCE) {
        return Err(ClusterError::InvalidCamera(
            "view matrix must be a rotation plus translation without scale, shear or mirroring"
                .to_string(),
        ));
    }
    view.affine_inverse()
        .ok_or_else(|| ClusterError::InvalidCamera("view matrix is not invertible".to_string()))
}

fn check_screen(width: u32, height: u32) -> Result<(), ClusterError> {
    if width == 0 || height == 0 {
        return Err(ClusterError::InvalidCamera(format!(
            "screen size must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Camera uniform block read by the clustering and shading passes.
///
/// Matrices are column-major.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ClusterCameraUniforms {
    /// World to clip.
    pub view_proj: [[f32; 4]; 4],
    /// Clip to world.
    pub inv_view_proj: [[f32; 4]; 4],
    /// World to view.
    pub view: [[f32; 4]; 4],
    /// Clip to view.
    pub inv_proj: [[f32; 4]; 4],
    /// Near and far plane distances.
    pub z_planes: [f32; 2],
    /// Screen width and height in pixels.
    pub screen_dimensions: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq_eps, Vec4};

    fn camera() -> CameraState {
        CameraState::look_at(
            CameraProjection::default(),
            Vec3::new(-7.0, 2.0, 0.0),
            Vec3::ZERO,
            Vec3::Y,
            1280,
            720,
        )
        .unwrap()
    }

    #[test]
    fn test_projection_validation() {
        assert!(CameraProjection::default().validate().is_ok());
        assert!(CameraProjection::new(0.0, 10.0, 1.0, 1.0).is_err());
        assert!(CameraProjection::new(-1.0, 10.0, 1.0, 1.0).is_err());
        assert!(CameraProjection::new(10.0, 10.0, 1.0, 1.0).is_err());
        assert!(CameraProjection::new(0.1, 10.0, 0.0, 1.0).is_err());
        assert!(CameraProjection::new(0.1, 10.0, PI, 1.0).is_err());
        assert!(CameraProjection::new(0.1, 10.0, 1.0, 0.0).is_err());
        assert!(CameraProjection::new(0.1, f32::INFINITY, 1.0, 1.0).is_err());
        assert!(CameraProjection::from_degrees(0.1, 100.0, 60.0, 1.5).is_ok());
    }

    #[test]
    fn test_half_extents() {
        let p = CameraProjection::new(1.0, 10.0, PI / 2.0, 2.0).unwrap();
        let (hw, hh) = p.half_extents_at(3.0);
        assert!(approx_eq_eps(hh, 3.0, 1e-5));
        assert!(approx_eq_eps(hw, 6.0, 1e-5));
    }

    #[test]
    fn test_camera_rejects_bad_state() {
        let p = CameraProjection::default();
        assert!(CameraState::new(p, Mat4::IDENTITY, 0, 720).is_err());
        assert!(CameraState::look_at(p, Vec3::ZERO, Vec3::ZERO, Vec3::Y, 1, 1).is_err());
    }

    #[test]
    fn test_camera_rejects_scaling_view() {
        let p = CameraProjection::default();
        let scaled = Mat4::from_cols(
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 2.0, 0.0),
            Vec4::W,
        );
        assert!(matches!(
            CameraState::new(p, scaled, 64, 64),
            Err(ClusterError::InvalidCamera(_))
        ));

        let mut cam = camera();
        let before = cam.view();
        assert!(matches!(
            cam.set_view(scaled),
            Err(ClusterError::InvalidCamera(_))
        ));
        assert_eq!(cam.view(), before);

        let moved = Mat4::from_rotation_y(0.3) * Mat4::from_translation(Vec3::new(1.0, 0.0, -2.0));
        assert!(cam.set_view(moved).is_ok());
    }

    #[test]
    fn test_world_to_view_depth_is_negative_z() {
        let cam = camera();
        let p = cam.world_to_view(Vec3::ZERO);
        // Target lies straight ahead at the eye distance.
        let dist = (Vec3::new(-7.0, 2.0, 0.0)).length();
        assert!(approx_eq_eps(p.x, 0.0, 1e-4));
        assert!(approx_eq_eps(p.y, 0.0, 1e-4));
        assert!(approx_eq_eps(-p.z, dist, 1e-4));
    }

    #[test]
    fn test_inverse_view_projection_roundtrip() {
        let cam = camera();
        let world = Vec4::new(1.0, 0.5, -2.0, 1.0);
        let clip = cam.view_projection() * world;
        let back = cam.inverse_view_projection() * clip;
        let back = back.truncate() / back.w;
        assert!(approx_eq_eps(back.x, 1.0, 1e-3));
        assert!(approx_eq_eps(back.y, 0.5, 1e-3));
        assert!(approx_eq_eps(back.z, -2.0, 1e-3));
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut cam = camera();
        cam.resize(800, 800).unwrap();
        assert_eq!(cam.projection().aspect_ratio, 1.0);
        assert_eq!(cam.screen_width(), 800);
        assert!(cam.resize(800, 0).is_err());
    }

    #[test]
    fn test_uniforms_layout() {
        assert_eq!(std::mem::size_of::<ClusterCameraUniforms>(), 272);
        assert_eq!(std::mem::size_of::<ClusterCameraUniforms>() % 16, 0);
        let u = camera().uniforms();
        assert_eq!(u.z_planes, [0.1, 50.0]);
        assert_eq!(u.screen_dimensions, [1280.0, 720.0]);
    }
}
