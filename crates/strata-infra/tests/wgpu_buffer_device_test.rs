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

//! These tests need a GPU adapter and return early when none is available.

use strata_core::renderer::{BufferDescriptor, BufferDevice, ResourceError};
use strata_infra::{WgpuBufferDevice, WgpuHeadlessContext};

fn device() -> Option<(WgpuHeadlessContext, WgpuBufferDevice)> {
    match WgpuHeadlessContext::new_blocking() {
        Ok(context) => {
            let device = WgpuBufferDevice::from_context(&context);
            Some((context, device))
        }
        Err(e) => {
            eprintln!("skipping: no wgpu adapter ({e})");
            None
        }
    }
}

#[test]
fn test_create_write_destroy() {
    let Some((context, device)) = device() else {
        return;
    };

    let id = device
        .create_buffer(&BufferDescriptor::storage("test_clusters", 64))
        .unwrap();
    assert_eq!(device.buffer_count(), 1);
    assert_eq!(device.allocated_bytes(), 64);
    assert!(device.buffer(id).is_some());

    device.write_buffer(id, 0, &[1u8; 32]).unwrap();
    device.write_buffer(id, 32, &[2u8; 32]).unwrap();
    context.flush().unwrap();

    assert_eq!(
        device.write_buffer(id, 48, &[0u8; 32]),
        Err(ResourceError::OutOfBounds)
    );
    assert!(device.write_buffer(id, 2, &[0u8; 4]).is_err());

    device.destroy_buffer(id).unwrap();
    assert_eq!(device.buffer_count(), 0);
    assert_eq!(device.allocated_bytes(), 0);
    assert_eq!(device.destroy_buffer(id), Err(ResourceError::NotFound));
    assert_eq!(
        device.write_buffer(id, 0, &[0u8; 4]),
        Err(ResourceError::NotFound)
    );
}

#[test]
fn test_zero_sized_buffer_is_rejected() {
    let Some((_context, device)) = device() else {
        return;
    };
    assert!(device
        .create_buffer(&BufferDescriptor::uniform("empty", 0))
        .is_err());
}
