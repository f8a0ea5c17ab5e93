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

use std::borrow::Cow;

bitflags::bitflags! {
    /// Allowed usages of a device buffer.
    ///
    /// The backend uses these to pick a memory placement and to validate bindings.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Can be the source of a copy.
        const COPY_SRC = 1 << 0;
        /// Can be the destination of a copy, including queue writes.
        const COPY_DST = 1 << 1;
        /// Can be bound as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// Can be bound as a read/write storage buffer.
        const STORAGE = 1 << 3;
    }
}

/// Describes a buffer to create on the device.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// How the buffer will be used.
    pub usage: BufferUsage,
    /// If `true`, the buffer is created mapped for immediate CPU writes.
    pub mapped_at_creation: bool,
}

impl<'a> BufferDescriptor<'a> {
    /// A storage buffer that is refreshed from the CPU every frame.
    pub fn storage(label: &'a str, size: u64) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: BufferUsage::STORAGE | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        }
    }

    /// A uniform buffer that is refreshed from the CPU every frame.
    pub fn uniform(label: &'a str, size: u64) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::COPY_DST,
            mapped_at_creation: false,
        }
    }
}

/// An opaque handle to a buffer owned by a [`BufferDevice`](crate::renderer::BufferDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_helpers() {
        let storage = BufferDescriptor::storage("clusters", 64);
        assert_eq!(storage.size, 64);
        assert!(storage.usage.contains(BufferUsage::STORAGE));
        assert!(storage.usage.contains(BufferUsage::COPY_DST));
        assert!(!storage.usage.contains(BufferUsage::UNIFORM));
        assert_eq!(storage.label.as_deref(), Some("clusters"));

        let uniform = BufferDescriptor::uniform("camera", 272);
        assert_eq!(uniform.usage, BufferUsage::UNIFORM | BufferUsage::COPY_DST);
    }
}
