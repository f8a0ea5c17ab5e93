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

//! WGSL for the consumer side of the cluster buffer.
//!
//! [`CLUSTER_LOOKUP_WGSL`] implements the cluster addressing and record reads. It needs
//! the constants emitted by [`cluster_constants_wgsl`] prepended, which
//! [`cluster_lookup_module`] does.

use std::fmt::Write;

use strata_core::renderer::ClusterGridConfig;

/// Cluster addressing, record access and light accumulation helpers.
pub const CLUSTER_LOOKUP_WGSL: &str = include_str!("cluster_lookup.wgsl");

/// Emits the grid constants as WGSL `const` declarations.
pub fn cluster_constants_wgsl(config: &ClusterGridConfig) -> String {
    let mut out = String::new();
    let constants = [
        ("CLUSTER_DIM_X", config.dims.x),
        ("CLUSTER_DIM_Y", config.dims.y),
        ("CLUSTER_DIM_Z", config.dims.z),
        ("MAX_LIGHTS_PER_CLUSTER", config.max_lights_per_cluster),
        ("CLUSTER_RECORD_STRIDE", config.record_stride_words() as u32),
    ];
    for (name, value) in constants {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "const {name}: u32 = {value}u;");
    }
    out
}

/// The constants prelude followed by [`CLUSTER_LOOKUP_WGSL`].
pub fn cluster_lookup_module(config: &ClusterGridConfig) -> String {
    let mut module = cluster_constants_wgsl(config);
    module.push('\n');
    module.push_str(CLUSTER_LOOKUP_WGSL);
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::ClusterDims;

    #[test]
    fn test_lookup_shader_has_entry_helpers() {
        assert!(CLUSTER_LOOKUP_WGSL.contains("fn cluster_coords"));
        assert!(CLUSTER_LOOKUP_WGSL.contains("fn cluster_index"));
        assert!(CLUSTER_LOOKUP_WGSL.contains("fn cluster_light_count"));
        assert!(CLUSTER_LOOKUP_WGSL.contains("var<storage, read> clusters"));
    }

    #[test]
    fn test_depth_slicing_reads_grid_uniforms() {
        assert!(CLUSTER_LOOKUP_WGSL.contains("@binding(3) var<uniform> grid: ClusterGrid"));
        assert!(CLUSTER_LOOKUP_WGSL.contains("grid.log_far_over_near"));
        assert!(CLUSTER_LOOKUP_WGSL.contains("grid.near"));
    }

    #[test]
    fn test_constants_follow_config() {
        let config = ClusterGridConfig::new(ClusterDims::new(8, 4, 12), 64).unwrap();
        let prelude = cluster_constants_wgsl(&config);
        assert!(prelude.contains("const CLUSTER_DIM_X: u32 = 8u;"));
        assert!(prelude.contains("const CLUSTER_DIM_Y: u32 = 4u;"));
        assert!(prelude.contains("const CLUSTER_DIM_Z: u32 = 12u;"));
        assert!(prelude.contains("const MAX_LIGHTS_PER_CLUSTER: u32 = 64u;"));
        assert!(prelude.contains("const CLUSTER_RECORD_STRIDE: u32 = 65u;"));

        let module = cluster_lookup_module(&config);
        assert!(module.starts_with(&prelude));
        assert!(module.ends_with(CLUSTER_LOOKUP_WGSL));
    }
}
