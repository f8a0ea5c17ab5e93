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

//! Surface-less `wgpu` device creation.

use anyhow::{anyhow, Result};

/// A logical device and queue without a window surface.
///
/// Enough to host the cluster buffers for compute or offscreen shading, and what the
/// headless sandbox runs on.
#[derive(Debug)]
pub struct WgpuHeadlessContext {
    /// The logical device.
    pub device: wgpu::Device,
    /// The command queue used for buffer writes and submissions.
    pub queue: wgpu::Queue,
    /// Name of the selected adapter.
    pub adapter_name: String,
    /// Backend API of the selected adapter.
    pub adapter_backend: wgpu::Backend,
}

impl WgpuHeadlessContext {
    /// Picks a high-performance adapter and opens a device on it.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("Failed to find a suitable adapter: {}", e))?;

        let info = adapter.get_info();
        log::info!(
            "Using graphics adapter \"{}\" (Backend: {:?})",
            info.name,
            info.backend
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Strata Headless Device"),
                ..Default::default()
            })
            .await
            .map_err(|e| anyhow!("Failed to create logical device: {}", e))?;

        device.on_uncaptured_error(std::sync::Arc::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
            adapter_backend: info.backend,
        })
    }

    /// Blocking version of [`WgpuHeadlessContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Waits until all submitted work, including queued buffer writes, has completed.
    pub fn flush(&self) -> Result<()> {
        self.queue.submit(std::iter::empty());
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| anyhow!("Failed to wait for the device: {}", e))?;
        Ok(())
    }
}
