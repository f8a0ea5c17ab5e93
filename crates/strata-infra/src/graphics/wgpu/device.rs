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

//! [`BufferDevice`] implementation backed by a `wgpu` device and queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use strata_core::renderer::{BufferDescriptor, BufferDevice, BufferId, ResourceError};

use super::context::WgpuHeadlessContext;
use super::conversions::IntoWgpu;

#[derive(Debug)]
struct WgpuBufferEntry {
    buffer: wgpu::Buffer,
    size: u64,
}

/// Owns `wgpu` buffers behind opaque [`BufferId`]s.
///
/// Writes go through `Queue::write_buffer`, so they are ordered before any command
/// buffer submitted to the same queue afterwards.
#[derive(Debug)]
pub struct WgpuBufferDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: Mutex<HashMap<BufferId, WgpuBufferEntry>>,
    next_buffer_id: AtomicUsize,
    allocated_bytes: AtomicU64,
}

impl WgpuBufferDevice {
    /// Wraps an existing device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Mutex::new(HashMap::new()),
            next_buffer_id: AtomicUsize::new(0),
            allocated_bytes: AtomicU64::new(0),
        }
    }

    /// Shares the device and queue of a headless context.
    pub fn from_context(context: &WgpuHeadlessContext) -> Self {
        Self::new(context.device.clone(), context.queue.clone())
    }

    /// The `wgpu` buffer behind `id`, for building bind groups.
    pub fn buffer(&self, id: BufferId) -> Option<wgpu::Buffer> {
        self.lock_buffers()
            .ok()?
            .get(&id)
            .map(|entry| entry.buffer.clone())
    }

    /// Bytes currently allocated through this device.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Number of live buffers.
    pub fn buffer_count(&self) -> usize {
        self.lock_buffers().map(|b| b.len()).unwrap_or(0)
    }

    fn lock_buffers(&self) -> Result<MutexGuard<'_, HashMap<BufferId, WgpuBufferEntry>>, ResourceError> {
        self.buffers
            .lock()
            .map_err(|_| ResourceError::BackendError("buffer registry lock poisoned".to_string()))
    }

    fn generate_buffer_id(&self) -> BufferId {
        BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl BufferDevice for WgpuBufferDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        if descriptor.size == 0 {
            return Err(ResourceError::BackendError(
                "cannot create a zero-sized buffer".to_string(),
            ));
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: descriptor.label.as_deref(),
            size: descriptor.size,
            usage: descriptor.usage.into_wgpu(),
            mapped_at_creation: descriptor.mapped_at_creation,
        });
        let id = self.generate_buffer_id();
        self.lock_buffers()?.insert(
            id,
            WgpuBufferEntry {
                buffer,
                size: descriptor.size,
            },
        );
        self.allocated_bytes
            .fetch_add(descriptor.size, Ordering::Relaxed);

        log::debug!(
            "WgpuBufferDevice: Created buffer '{}' with ID: {:?}, size: {} bytes",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        let entry = self
            .lock_buffers()?
            .remove(&id)
            .ok_or(ResourceError::NotFound)?;
        entry.buffer.destroy();
        self.allocated_bytes
            .fetch_sub(entry.size, Ordering::Relaxed);
        log::debug!("WgpuBufferDevice: Destroyed buffer with ID: {id:?}");
        Ok(())
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let buffers = self.lock_buffers()?;
        let entry = buffers.get(&id).ok_or(ResourceError::NotFound)?;

        let end_offset = offset + data.len() as u64;
        if end_offset > entry.size {
            return Err(ResourceError::OutOfBounds);
        }
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0
            || data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT != 0
        {
            return Err(ResourceError::BackendError(format!(
                "writes must be {}-byte aligned (offset {}, {} bytes)",
                wgpu::COPY_BUFFER_ALIGNMENT,
                offset,
                data.len()
            )));
        }

        self.queue.write_buffer(&entry.buffer, offset, data);
        log::trace!(
            "WgpuBufferDevice: Wrote {} bytes to buffer ID: {:?} at offset {}",
            data.len(),
            id,
            offset
        );
        Ok(())
    }
}
