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

//! Defines the `Mat4` type used for view and projection transforms.

use super::{Vec3, Vec4, EPSILON};
use std::ops::Mul;

/// A 4x4 column-major matrix.
///
/// The memory layout is column-major, which is what WGSL `mat4x4<f32>` expects, so
/// [`Mat4::to_cols_array_2d`] can be copied straight into a uniform block.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The columns of the matrix. `cols[0]` is the first column, and so on.
    pub cols: [Vec4; 4],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [Vec4::X, Vec4::Y, Vec4::Z, Vec4::W],
    };

    /// Creates a new matrix from four column vectors.
    #[inline]
    pub fn from_cols(c0: Vec4, c1: Vec4, c2: Vec4, c3: Vec4) -> Self {
        Self {
            cols: [c0, c1, c2, c3],
        }
    }

    /// Returns a row of the matrix as a `Vec4`.
    #[inline]
    pub fn get_row(&self, index: usize) -> Vec4 {
        Vec4::new(
            self.cols[0].get(index),
            self.cols[1].get(index),
            self.cols[2].get(index),
            self.cols[3].get(index),
        )
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(v: Vec3) -> Self {
        Self::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::from_vec3(v, 1.0))
    }

    /// Creates a rotation around the Y axis.
    #[inline]
    pub fn from_rotation_y(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(
            Vec4::new(c, 0.0, -s, 0.0),
            Vec4::Y,
            Vec4::new(s, 0.0, c, 0.0),
            Vec4::W,
        )
    }

    /// Creates a right-handed perspective projection matrix with a [0, 1] depth range.
    ///
    /// The caller is responsible for passing a validated projection
    /// (`0 < z_near < z_far`, `0 < fov_y_radians < PI`, positive aspect).
    #[inline]
    pub fn perspective_rh_zo(
        fov_y_radians: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let f = 1.0 / (fov_y_radians * 0.5).tan();
        let c = z_far / (z_near - z_far);
        let d = (z_near * z_far) / (z_near - z_far);

        Self::from_cols(
            Vec4::new(f / aspect_ratio, 0.0, 0.0, 0.0),
            Vec4::new(0.0, f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, c, -1.0),
            Vec4::new(0.0, 0.0, d, 0.0),
        )
    }

    /// Closed-form inverse of [`Mat4::perspective_rh_zo`] for the same parameters.
    ///
    /// Avoids the precision loss of a general 4x4 inversion on the large depth terms.
    #[inline]
    pub fn perspective_rh_zo_inverse(
        fov_y_radians: f32,
        aspect_ratio: f32,
        z_near: f32,
        z_far: f32,
    ) -> Self {
        let f = 1.0 / (fov_y_radians * 0.5).tan();
        let c = z_far / (z_near - z_far);
        let d = (z_near * z_far) / (z_near - z_far);

        Self::from_cols(
            Vec4::new(aspect_ratio / f, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 1.0 / f, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 0.0, 1.0 / d),
            Vec4::new(0.0, 0.0, -1.0, c / d),
        )
    }

    /// Creates a right-handed view matrix for a camera at `eye` looking at `target`.
    ///
    /// Returns `None` if `eye` and `target` coincide or `up` is parallel to the
    /// viewing direction.
    #[inline]
    pub fn look_at_rh(eye: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let forward = target - eye;
        if forward.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let f = forward.normalize();
        let s = f.cross(up);
        if s.length_squared() < EPSILON * EPSILON {
            return None;
        }
        let s = s.normalize();
        let u = s.cross(f);

        Some(Self::from_cols(
            Vec4::new(s.x, u.x, -f.x, 0.0),
            Vec4::new(s.y, u.y, -f.y, 0.0),
            Vec4::new(s.z, u.z, -f.z, 0.0),
            Vec4::new(-eye.dot(s), -eye.dot(u), eye.dot(f), 1.0),
        ))
    }

    /// Inverts an affine matrix (rotation, scale and translation only).
    ///
    /// Returns `None` when the linear part is singular.
    pub fn affine_inverse(&self) -> Option<Self> {
        let a = self.cols[0].truncate();
        let b = self.cols[1].truncate();
        let c = self.cols[2].truncate();
        let t = self.cols[3].truncate();

        // Rows of the inverse 3x3 are the cross products of the columns over the determinant.
        let r0 = b.cross(c);
        let r1 = c.cross(a);
        let r2 = a.cross(b);
        let det = a.dot(r0);
        if det.abs() < EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let (r0, r1, r2) = (r0 * inv_det, r1 * inv_det, r2 * inv_det);

        Some(Self::from_cols(
            Vec4::new(r0.x, r1.x, r2.x, 0.0),
            Vec4::new(r0.y, r1.y, r2.y, 0.0),
            Vec4::new(r0.z, r1.z, r2.z, 0.0),
            Vec4::new(-r0.dot(t), -r1.dot(t), -r2.dot(t), 1.0),
        ))
    }

    /// Returns `true` when the matrix is a rotation plus translation.
    ///
    /// The linear part must be orthonormal with determinant `+1` and the bottom row
    /// must be `(0, 0, 0, 1)`, all within `tolerance`.
    pub fn is_rigid(&self, tolerance: f32) -> bool {
        let a = self.cols[0].truncate();
        let b = self.cols[1].truncate();
        let c = self.cols[2].truncate();
        let bottom = self.get_row(3);
        let affine = bottom.x.abs() <= tolerance
            && bottom.y.abs() <= tolerance
            && bottom.z.abs() <= tolerance
            && (bottom.w - 1.0).abs() <= tolerance;
        let unit = [a, b, c]
            .iter()
            .all(|v| (v.length_squared() - 1.0).abs() <= tolerance);
        let orthogonal = a.dot(b).abs() <= tolerance
            && b.dot(c).abs() <= tolerance
            && c.dot(a).abs() <= tolerance;
        let det = a.dot(b.cross(c));
        affine && unit && orthogonal && (det - 1.0).abs() <= tolerance
    }

    /// Transforms a point (`w = 1`) and drops the homogeneous coordinate.
    ///
    /// No perspective divide is applied; use it with affine matrices.
    #[inline]
    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        (*self * Vec4::from_vec3(p, 1.0)).truncate()
    }

    /// Returns the matrix as a column-major 2D array for GPU upload.
    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        [
            self.cols[0].to_array(),
            self.cols[1].to_array(),
            self.cols[2].to_array(),
            self.cols[3].to_array(),
        ]
    }
}

impl Default for Mat4 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Mat4) -> Self::Output {
        let rows = [
            self.get_row(0),
            self.get_row(1),
            self.get_row(2),
            self.get_row(3),
        ];
        let col = |c: Vec4| Vec4::new(rows[0].dot(c), rows[1].dot(c), rows[2].dot(c), rows[3].dot(c));
        Self::from_cols(
            col(rhs.cols[0]),
            col(rhs.cols[1]),
            col(rhs.cols[2]),
            col(rhs.cols[3]),
        )
    }
}

impl Mul<Vec4> for Mat4 {
    type Output = Vec4;
    #[inline]
    fn mul(self, rhs: Vec4) -> Self::Output {
        self.cols[0] * rhs.x + self.cols[1] * rhs.y + self.cols[2] * rhs.z + self.cols[3] * rhs.w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq_eps, FRAC_PI_4};

    fn mat4_approx_eq(a: &Mat4, b: &Mat4, eps: f32) -> bool {
        (0..4).all(|c| (0..4).all(|r| approx_eq_eps(a.cols[c].get(r), b.cols[c].get(r), eps)))
    }

    #[test]
    fn test_perspective_inverse_is_inverse() {
        let proj = Mat4::perspective_rh_zo(FRAC_PI_4, 16.0 / 9.0, 0.1, 50.0);
        let inv = Mat4::perspective_rh_zo_inverse(FRAC_PI_4, 16.0 / 9.0, 0.1, 50.0);
        assert!(mat4_approx_eq(&(proj * inv), &Mat4::IDENTITY, 1e-4));
        assert!(mat4_approx_eq(&(inv * proj), &Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_perspective_maps_near_and_far_to_zero_one() {
        let proj = Mat4::perspective_rh_zo(FRAC_PI_4, 1.0, 0.5, 20.0);
        let near = proj * Vec4::new(0.0, 0.0, -0.5, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -20.0, 1.0);
        assert!(approx_eq_eps(near.z / near.w, 0.0, 1e-5));
        assert!(approx_eq_eps(far.z / far.w, 1.0, 1e-5));
    }

    #[test]
    fn test_look_at_places_target_on_negative_z() {
        let view = Mat4::look_at_rh(Vec3::new(-7.0, 2.0, 0.0), Vec3::new(-6.0, 2.0, 0.0), Vec3::Y)
            .unwrap();
        let p = view.transform_point3(Vec3::new(-4.0, 2.0, 0.0));
        assert!(approx_eq_eps(p.x, 0.0, 1e-5));
        assert!(approx_eq_eps(p.y, 0.0, 1e-5));
        assert!(approx_eq_eps(p.z, -3.0, 1e-5));

        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::ZERO, Vec3::Y).is_none());
        assert!(Mat4::look_at_rh(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
    }

    #[test]
    fn test_affine_inverse() {
        let m = Mat4::from_translation(Vec3::new(3.0, -1.0, 2.0)) * Mat4::from_rotation_y(0.7);
        let inv = m.affine_inverse().unwrap();
        assert!(mat4_approx_eq(&(m * inv), &Mat4::IDENTITY, 1e-5));

        let singular = Mat4::from_cols(Vec4::ZERO, Vec4::Y, Vec4::Z, Vec4::W);
        assert!(singular.affine_inverse().is_none());
    }

    #[test]
    fn test_is_rigid() {
        let view = Mat4::look_at_rh(Vec3::new(3.0, 1.0, 4.0), Vec3::ZERO, Vec3::Y).unwrap();
        assert!(view.is_rigid(1e-4));
        assert!(Mat4::from_rotation_y(1.2).is_rigid(1e-4));

        let scaled = Mat4::from_cols(
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 2.0, 0.0),
            Vec4::W,
        );
        assert!(!scaled.is_rigid(1e-4));

        let mirrored = Mat4::from_cols(Vec4::new(-1.0, 0.0, 0.0, 0.0), Vec4::Y, Vec4::Z, Vec4::W);
        assert!(!mirrored.is_rigid(1e-4));

        let sheared = Mat4::from_cols(Vec4::X, Vec4::new(0.5, 1.0, 0.0, 0.0), Vec4::Z, Vec4::W);
        assert!(!sheared.is_rigid(1e-4));
    }

    #[test]
    fn test_cols_array_is_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.to_cols_array_2d()[3], [1.0, 2.0, 3.0, 1.0]);
    }
}
