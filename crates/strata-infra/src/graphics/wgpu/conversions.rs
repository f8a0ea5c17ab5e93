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

//! Conversions from `strata-core` descriptors to `wgpu` types.

use strata_core::renderer::BufferUsage;

/// Converts a backend-agnostic type into its `wgpu` counterpart.
///
/// A local trait sidesteps the orphan rule while keeping `.into_wgpu()` call syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::BufferUsages> for BufferUsage {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let mut usages = wgpu::BufferUsages::empty();
        if self.contains(BufferUsage::COPY_SRC) {
            usages |= wgpu::BufferUsages::COPY_SRC;
        }
        if self.contains(BufferUsage::COPY_DST) {
            usages |= wgpu::BufferUsages::COPY_DST;
        }
        if self.contains(BufferUsage::UNIFORM) {
            usages |= wgpu::BufferUsages::UNIFORM;
        }
        if self.contains(BufferUsage::STORAGE) {
            usages |= wgpu::BufferUsages::STORAGE;
        }
        usages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_usage_mapping() {
        let storage = (BufferUsage::STORAGE | BufferUsage::COPY_DST).into_wgpu();
        assert_eq!(
            storage,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
        );

        let uniform = (BufferUsage::UNIFORM | BufferUsage::COPY_DST).into_wgpu();
        assert!(uniform.contains(wgpu::BufferUsages::UNIFORM));
        assert!(!uniform.contains(wgpu::BufferUsages::STORAGE));

        assert_eq!(
            BufferUsage::COPY_SRC.into_wgpu(),
            wgpu::BufferUsages::COPY_SRC
        );
        assert!(BufferUsage::empty().into_wgpu().is_empty());
    }
}
