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

//! Serialization of the cluster light lists into the shading-pass buffer.

use rayon::prelude::*;
use strata_core::renderer::{BufferDevice, BufferId, ClusterError, ClusterGridConfig};

use super::assigner::ClusterAssigner;

/// A read view over one cluster record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRecord<'a> {
    /// Number of valid entries in `indices`.
    pub count: u32,
    /// The light indices, exactly `count` long.
    pub indices: &'a [u32],
}

/// Owns the flat `u32` cluster buffer.
///
/// Record `i` starts at word `i * (1 + max_lights_per_cluster)`: one count word followed
/// by the index slots. The record size is constant so the shading pass addresses a
/// cluster in O(1).
#[derive(Debug, Clone)]
pub struct ClusterBufferWriter {
    config: ClusterGridConfig,
    words: Vec<u32>,
}

impl ClusterBufferWriter {
    /// Allocates a zeroed buffer for `config`.
    pub fn new(config: ClusterGridConfig) -> Result<Self, ClusterError> {
        config.validate()?;
        Ok(Self {
            config,
            words: vec![0; config.cluster_count() * config.record_stride_words()],
        })
    }

    /// The grid configuration.
    pub fn config(&self) -> &ClusterGridConfig {
        &self.config
    }

    /// Copies the assigner's lists into the buffer, overwriting every record.
    pub fn write(&mut self, assigner: &ClusterAssigner) -> Result<(), ClusterError> {
        if assigner.config() != &self.config {
            return Err(ClusterError::InvalidGrid(
                "assigner and buffer writer use different grid configurations".to_string(),
            ));
        }
        let stride = self.config.record_stride_words();
        let cap = self.config.max_lights_per_cluster as usize;
        self.words
            .par_chunks_mut(stride)
            .zip(assigner.counts().par_iter())
            .zip(assigner.index_slots().par_chunks(cap))
            .for_each(|((record, &count), slots)| {
                record[0] = count;
                record[1..].copy_from_slice(slots);
            });
        Ok(())
    }

    /// The raw buffer words.
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// The buffer as bytes, ready for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// Byte size of the buffer.
    pub fn size_bytes(&self) -> u64 {
        self.config.buffer_size_bytes()
    }

    /// The record of `cluster`.
    pub fn record(&self, cluster: usize) -> Option<ClusterRecord<'_>> {
        if cluster >= self.config.cluster_count() {
            return None;
        }
        let stride = self.config.record_stride_words();
        let start = cluster * stride;
        let record = self.words.get(start..start + stride)?;
        let count = record[0];
        let visible = (count as usize).min(record.len() - 1);
        Some(ClusterRecord {
            count,
            indices: &record[1..1 + visible],
        })
    }

    /// Writes the whole buffer to `id` on `device`, starting at offset zero.
    pub fn upload(&self, device: &dyn BufferDevice, id: BufferId) -> Result<(), ClusterError> {
        device.write_buffer(id, 0, self.as_bytes())?;
        log::debug!(
            "Uploaded cluster buffer {:?}: {} bytes",
            id,
            self.as_bytes().len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::ClusterDims;

    #[test]
    fn test_new_buffer_is_zeroed() {
        let config = ClusterGridConfig::new(ClusterDims::new(2, 2, 2), 3).unwrap();
        let writer = ClusterBufferWriter::new(config).unwrap();
        assert_eq!(writer.words().len(), 8 * 4);
        assert_eq!(writer.as_bytes().len() as u64, writer.size_bytes());
        assert!(writer.words().iter().all(|w| *w == 0));
        assert_eq!(writer.record(7).unwrap().count, 0);
        assert!(writer.record(8).is_none());
        assert!(writer.record(usize::MAX).is_none());
        assert!(writer.record(usize::MAX / 2).is_none());
    }

    #[test]
    fn test_write_rejects_mismatched_assigner() {
        let a = ClusterGridConfig::new(ClusterDims::new(2, 2, 2), 3).unwrap();
        let b = ClusterGridConfig::new(ClusterDims::new(2, 2, 2), 4).unwrap();
        let assigner = ClusterAssigner::new(b).unwrap();
        let mut writer = ClusterBufferWriter::new(a).unwrap();
        assert!(matches!(
            writer.write(&assigner),
            Err(ClusterError::InvalidGrid(_))
        ));
    }
}
