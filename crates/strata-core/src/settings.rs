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

//! Loading of the clustering configuration from RON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::renderer::{CameraProjection, ClusterError, ClusterGridConfig};

/// Errors raised while loading [`ClusterSettings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings file could not be read or written.
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings text is not valid RON for [`ClusterSettings`].
    #[error("failed to parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
    /// The settings parsed but describe an unusable configuration.
    #[error("invalid settings: {0}")]
    Invalid(#[from] ClusterError),
}

/// Everything needed to stand up a clustering lane. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Grid dimensions and per-cluster cap.
    pub grid: ClusterGridConfig,
    /// Initial camera projection. The aspect ratio is replaced by the screen's.
    pub projection: CameraProjection,
    /// Capacity of the light store.
    pub max_lights: usize,
    /// Initial screen width in pixels.
    pub screen_width: u32,
    /// Initial screen height in pixels.
    pub screen_height: u32,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            grid: ClusterGridConfig::default(),
            projection: CameraProjection::default(),
            max_lights: 1024,
            screen_width: 1280,
            screen_height: 720,
        }
    }
}

impl ClusterSettings {
    /// Parses and validates settings from a RON string.
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates settings from a RON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_ron(&text)?;
        log::info!(
            "Loaded cluster settings from {}: {}x{}x{} grid, {} lights per cluster",
            path.as_ref().display(),
            settings.grid.dims.x,
            settings.grid.dims.y,
            settings.grid.dims.z,
            settings.grid.max_lights_per_cluster
        );
        Ok(settings)
    }

    /// Serializes the settings as pretty RON.
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Writes the settings to a RON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    /// The projection with its aspect ratio taken from the configured screen.
    pub fn screen_projection(&self) -> CameraProjection {
        CameraProjection {
            aspect_ratio: self.screen_width as f32 / self.screen_height.max(1) as f32,
            ..self.projection
        }
    }

    /// Runs the same checks as the runtime constructors.
    pub fn validate(&self) -> Result<(), ClusterError> {
        self.grid.validate()?;
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(ClusterError::InvalidCamera(format!(
                "screen size must be non-zero, got {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        self.screen_projection().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::ClusterDims;

    #[test]
    fn test_empty_ron_gives_defaults() {
        let settings = ClusterSettings::from_ron("()").unwrap();
        assert_eq!(settings, ClusterSettings::default());
    }

    #[test]
    fn test_partial_ron() {
        let text = r#"(
            grid: (dims: (x: 8, y: 4, z: 16), max_lights_per_cluster: 32),
            projection: (near: 0.5, far: 200.0),
            max_lights: 64,
        )"#;
        let settings = ClusterSettings::from_ron(text).unwrap();
        assert_eq!(settings.grid.dims, ClusterDims::new(8, 4, 16));
        assert_eq!(settings.grid.max_lights_per_cluster, 32);
        assert_eq!(settings.projection.near, 0.5);
        assert_eq!(settings.projection.far, 200.0);
        assert_eq!(
            settings.projection.fov_y_radians,
            CameraProjection::default().fov_y_radians
        );
        assert_eq!(settings.max_lights, 64);
        assert_eq!(settings.screen_width, 1280);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClusterSettings::from_ron("(projection: (near: 10.0, far: 1.0))").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid(ClusterError::InvalidProjection(_))
        ));

        let err = ClusterSettings::from_ron("(grid: (max_lights_per_cluster: 0))").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(ClusterError::InvalidGrid(_))));

        let err = ClusterSettings::from_ron("(screen_width: 0)").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(ClusterError::InvalidCamera(_))));
    }

    #[test]
    fn test_parse_error() {
        let err = ClusterSettings::from_ron("(grid: nope)").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_screen_projection_aspect() {
        let settings = ClusterSettings {
            screen_width: 1000,
            screen_height: 500,
            ..Default::default()
        };
        assert_eq!(settings.screen_projection().aspect_ratio, 2.0);
    }

    #[test]
    fn test_ron_roundtrip_through_text() {
        let settings = ClusterSettings::default();
        let text = settings.to_ron().unwrap();
        assert_eq!(ClusterSettings::from_ron(&text).unwrap(), settings);
    }
}
