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

//! Defines the error types for the clustering pipeline and its device uploads.

use std::fmt;

use super::camera::CameraProjection;

/// An error related to the creation or use of a GPU buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// No buffer is registered under the given ID.
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// A write went past the end of the buffer.
    OutOfBounds,
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound => write!(f, "Resource not found with ID."),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::OutOfBounds => write!(f, "Resource access out of bounds."),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Errors raised at the boundaries of the clustering pipeline.
///
/// All of these are synchronous and local. Capacity truncation inside a cluster is
/// deliberately *not* represented here: it is a documented policy, not a failure.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Near/far planes, field of view or aspect ratio are unusable.
    #[error("invalid camera projection: {0}")]
    InvalidProjection(String),
    /// Screen size or view matrix are unusable.
    #[error("invalid camera state: {0}")]
    InvalidCamera(String),
    /// Grid dimensions or the per-cluster light cap are unusable.
    #[error("invalid cluster grid: {0}")]
    InvalidGrid(String),
    /// A light violates the store contract.
    #[error("light {index} rejected: {reason}")]
    InvalidLight {
        /// Index of the offending light in the submitted set.
        index: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
    /// More lights than the store was sized for.
    #[error("light store capacity exceeded: {requested} lights requested, capacity is {capacity}")]
    CapacityExceeded {
        /// Number of lights the caller tried to hold.
        requested: usize,
        /// The configured `max_lights`.
        capacity: usize,
    },
    /// Cluster bounds were built for a different projection than the current camera.
    #[error("cluster bounds are stale: built for {built:?}, camera uses {current:?}")]
    StaleBounds {
        /// Projection the bounds were derived from.
        built: CameraProjection,
        /// Projection of the camera being clustered.
        current: CameraProjection,
    },
    /// Pushing cluster data to the device failed.
    #[error("cluster data upload failed: {0}")]
    Upload(#[from] ResourceError),
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn resource_error_display() {
        assert_eq!(
            format!("{}", ResourceError::BackendError("lost".to_string())),
            "Backend-specific resource error: lost"
        );
        assert_eq!(
            format!("{}", ResourceError::OutOfBounds),
            "Resource access out of bounds."
        );
    }

    #[test]
    fn cluster_error_wraps_resource_error() {
        let err: ClusterError = ResourceError::NotFound.into();
        assert_eq!(
            format!("{err}"),
            "cluster data upload failed: Resource not found with ID."
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn light_error_display() {
        let err = ClusterError::InvalidLight {
            index: 7,
            reason: "radius must be positive",
        };
        assert_eq!(format!("{err}"), "light 7 rejected: radius must be positive");
    }
}
