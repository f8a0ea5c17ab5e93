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

//! Axis-aligned bounding boxes and the sphere test used by light culling.

use super::Vec3;

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Defined by its minimum and maximum corners. Cluster cells are stored as AABBs in
/// view space, so the sphere test below only has to clamp per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// An empty box (`min = +inf`, `max = -inf`), the identity for [`Aabb::merged_with_point`].
    pub const INVALID: Self = Self {
        min: Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
        max: Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
    };

    /// Creates a new `Aabb` from two corner points in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates an `Aabb` that tightly encloses a set of points.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(
            points
                .iter()
                .fold(Self::INVALID, |acc, p| acc.merged_with_point(*p)),
        )
    }

    /// Calculates the center point of the `Aabb`.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Checks that `min <= max` on every axis. Degenerate boxes are valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Checks if a point lies inside or on the boundary of the box.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Returns the point of the box closest to `point` (per-axis clamp).
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Squared distance from `point` to the box; zero when the point is inside.
    #[inline]
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        self.closest_point(point).distance_squared(point)
    }

    /// Sphere-vs-box overlap test.
    ///
    /// Touching counts as intersecting: the test is `distance^2 <= radius^2`.
    #[inline]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.distance_squared_to_point(center) <= radius * radius
    }

    /// Returns a box that also encloses `point`.
    #[inline]
    pub fn merged_with_point(&self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }
}

impl Default for Aabb {
    /// Returns [`Aabb::INVALID`].
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::from_min_max(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_from_min_max_orders_corners() {
        let aabb = Aabb::from_min_max(Vec3::new(4.0, 5.0, 6.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.min, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_aabb_from_points() {
        assert!(Aabb::from_points(&[]).is_none());

        let points = [
            Vec3::new(1.0, 5.0, -1.0),
            Vec3::new(0.0, 2.0, 3.0),
            Vec3::new(4.0, 8.0, 0.0),
        ];
        let aabb = Aabb::from_points(&points).unwrap();
        assert_eq!(aabb.min, Vec3::new(0.0, 2.0, -1.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 8.0, 3.0));
        assert!(aabb.is_valid());
        assert!(!Aabb::INVALID.is_valid());
    }

    #[test]
    fn test_closest_point_and_distance() {
        let aabb = unit_box();
        // Inside: the point itself, distance zero.
        assert_eq!(aabb.closest_point(Vec3::new(0.5, 0.5, 0.5)), Vec3::new(0.5, 0.5, 0.5));
        assert_eq!(aabb.distance_squared_to_point(Vec3::new(0.5, 0.5, 0.5)), 0.0);
        // Face region.
        assert_eq!(aabb.distance_squared_to_point(Vec3::new(3.0, 0.5, 0.5)), 4.0);
        // Corner region.
        assert_eq!(aabb.distance_squared_to_point(Vec3::new(2.0, 2.0, 2.0)), 3.0);
    }

    #[test]
    fn test_intersects_sphere() {
        let aabb = unit_box();
        assert!(aabb.intersects_sphere(Vec3::new(0.5, 0.5, 0.5), 0.01));
        // Exactly touching a face.
        assert!(aabb.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 1.0));
        assert!(!aabb.intersects_sphere(Vec3::new(2.0, 0.5, 0.5), 0.99));
        // Corner region: distance sqrt(3) ~ 1.732.
        assert!(aabb.intersects_sphere(Vec3::new(2.0, 2.0, 2.0), 1.75));
        assert!(!aabb.intersects_sphere(Vec3::new(2.0, 2.0, 2.0), 1.7));
    }

    #[test]
    fn test_contains_point() {
        let aabb = unit_box();
        assert!(aabb.contains_point(Vec3::new(0.0, 1.0, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(1.1, 0.5, 0.5)));
    }
}
