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

//! The authoritative set of lights for a frame.

use strata_core::math::{Mat4, Vec3};
use strata_core::renderer::{ClusterError, GpuPointLight, LightSetHeader, LightSphere, PointLight};

/// Bounded, validated storage for the frame's point lights.
///
/// Every mutation checks the light contract (finite position, finite positive radius)
/// and the capacity before touching the stored set, so a failed call leaves the store
/// unchanged. Light indices are positions in [`LightStore::lights`] and are what the
/// cluster lists refer to.
#[derive(Debug, Clone)]
pub struct LightStore {
    lights: Vec<PointLight>,
    capacity: usize,
    generation: u64,
}

impl LightStore {
    /// Creates an empty store that can hold up to `capacity` lights.
    pub fn new(capacity: usize) -> Self {
        Self {
            lights: Vec::with_capacity(capacity),
            capacity,
            generation: 0,
        }
    }

    /// Maximum number of lights.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lights currently stored.
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// `true` if the store holds no lights.
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// The light set, read-only.
    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// The light at `index`.
    pub fn get(&self, index: usize) -> Option<&PointLight> {
        self.lights.get(index)
    }

    /// Counter bumped by every successful mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the whole set.
    pub fn set_lights(&mut self, lights: &[PointLight]) -> Result<(), ClusterError> {
        self.check_capacity(lights.len())?;
        for (index, light) in lights.iter().enumerate() {
            light.validate(index)?;
        }
        self.lights.clear();
        self.lights.extend_from_slice(lights);
        self.touch();
        Ok(())
    }

    /// Appends a light and returns its index.
    pub fn spawn(&mut self, light: PointLight) -> Result<usize, ClusterError> {
        let index = self.lights.len();
        self.check_capacity(index + 1)?;
        light.validate(index)?;
        self.lights.push(light);
        self.touch();
        Ok(index)
    }

    /// Replaces the light at `index`.
    pub fn update(&mut self, index: usize, light: PointLight) -> Result<(), ClusterError> {
        light.validate(index)?;
        *self.slot(index)? = light;
        self.touch();
        Ok(())
    }

    /// Moves the light at `index`.
    pub fn set_position(&mut self, index: usize, position: Vec3) -> Result<(), ClusterError> {
        let mut light = *self.slot(index)?;
        light.position = position;
        self.update(index, light)
    }

    /// Applies `f` to every light, then validates the result.
    ///
    /// If any light ends up violating the contract, the whole set is rolled back.
    pub fn update_all<F>(&mut self, mut f: F) -> Result<(), ClusterError>
    where
        F: FnMut(usize, &mut PointLight),
    {
        let previous = self.lights.clone();
        for (index, light) in self.lights.iter_mut().enumerate() {
            f(index, light);
        }
        if let Some(err) = self
            .lights
            .iter()
            .enumerate()
            .find_map(|(index, light)| light.validate(index).err())
        {
            self.lights = previous;
            return Err(err);
        }
        self.touch();
        Ok(())
    }

    /// Removes the light at `index`. Lights after it shift down by one.
    pub fn despawn(&mut self, index: usize) -> Result<PointLight, ClusterError> {
        self.slot(index)?;
        let light = self.lights.remove(index);
        self.touch();
        Ok(light)
    }

    /// Removes every light.
    pub fn clear(&mut self) {
        self.lights.clear();
        self.touch();
    }

    /// Writes the view-space bounding sphere of every light into `out`, in light order.
    pub fn view_spheres(&self, view: &Mat4, out: &mut Vec<LightSphere>) {
        out.clear();
        out.extend(
            self.lights
                .iter()
                .map(|light| LightSphere::new(view.transform_point3(light.position), light.radius)),
        );
    }

    /// Byte size of the light-set storage buffer for a full store.
    pub fn storage_size_bytes(&self) -> u64 {
        (std::mem::size_of::<LightSetHeader>()
            + self.capacity.max(1) * std::mem::size_of::<GpuPointLight>()) as u64
    }

    /// Serializes the light set as `{count, pad, lights[]}` into `out`.
    pub fn write_storage(&self, out: &mut Vec<u8>) {
        out.clear();
        let header = LightSetHeader::new(self.lights.len() as u32);
        out.extend_from_slice(bytemuck::bytes_of(&header));
        for light in &self.lights {
            out.extend_from_slice(bytemuck::bytes_of(&GpuPointLight::from(light)));
        }
    }

    fn check_capacity(&self, requested: usize) -> Result<(), ClusterError> {
        if requested > self.capacity || requested > u32::MAX as usize {
            return Err(ClusterError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn slot(&mut self, index: usize) -> Result<&mut PointLight, ClusterError> {
        self.lights
            .get_mut(index)
            .ok_or(ClusterError::InvalidLight {
                index,
                reason: "no light at this index",
            })
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(x: f32) -> PointLight {
        PointLight::new(Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_set_lights_respects_capacity() {
        let mut store = LightStore::new(2);
        assert!(store.set_lights(&[light(0.0), light(1.0)]).is_ok());
        let err = store
            .set_lights(&[light(0.0), light(1.0), light(2.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            ClusterError::CapacityExceeded {
                requested: 3,
                capacity: 2
            }
        ));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_invalid_light_leaves_store_unchanged() {
        let mut store = LightStore::new(4);
        store.set_lights(&[light(0.0)]).unwrap();
        let generation = store.generation();

        let bad = PointLight::new(Vec3::ZERO, -1.0);
        let err = store.set_lights(&[light(5.0), bad]).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidLight { index: 1, .. }));
        assert_eq!(store.lights(), &[light(0.0)]);
        assert_eq!(store.generation(), generation);

        assert!(store.spawn(bad).is_err());
        assert!(store
            .set_position(0, Vec3::new(f32::NAN, 0.0, 0.0))
            .is_err());
        assert_eq!(store.lights(), &[light(0.0)]);
    }

    #[test]
    fn test_spawn_update_despawn() {
        let mut store = LightStore::new(3);
        assert_eq!(store.spawn(light(0.0)).unwrap(), 0);
        assert_eq!(store.spawn(light(1.0)).unwrap(), 1);
        assert_eq!(store.spawn(light(2.0)).unwrap(), 2);
        assert!(store.spawn(light(3.0)).is_err());

        store.set_position(1, Vec3::new(9.0, 0.0, 0.0)).unwrap();
        assert_eq!(store.get(1).unwrap().position.x, 9.0);

        let removed = store.despawn(0).unwrap();
        assert_eq!(removed, light(0.0));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().position.x, 9.0);
        assert!(store.despawn(5).is_err());
        assert!(store.update(7, light(0.0)).is_err());

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_all_rolls_back() {
        let mut store = LightStore::new(3);
        store.set_lights(&[light(0.0), light(1.0)]).unwrap();
        store
            .update_all(|i, l| l.position.y = i as f32)
            .unwrap();
        assert_eq!(store.get(1).unwrap().position.y, 1.0);

        let err = store.update_all(|i, l| {
            if i == 1 {
                l.radius = 0.0;
            }
            l.position.y = 5.0;
        });
        assert!(err.is_err());
        assert_eq!(store.get(0).unwrap().position.y, 0.0);
        assert_eq!(store.get(1).unwrap().radius, 1.0);
    }

    #[test]
    fn test_view_spheres_use_view_transform() {
        let mut store = LightStore::new(2);
        store.set_lights(&[light(1.0), light(2.0)]).unwrap();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let mut spheres = Vec::new();
        store.view_spheres(&view, &mut spheres);
        assert_eq!(spheres.len(), 2);
        assert_eq!(spheres[0].center, Vec3::new(1.0, 0.0, -5.0));
        assert_eq!(spheres[1].radius, 1.0);
    }

    #[test]
    fn test_storage_layout() {
        let mut store = LightStore::new(4);
        store.set_lights(&[light(1.0), light(2.0)]).unwrap();
        assert_eq!(store.storage_size_bytes(), 16 + 4 * 32);

        let mut bytes = Vec::new();
        store.write_storage(&mut bytes);
        assert_eq!(bytes.len(), 16 + 2 * 32);
        let count: u32 = bytemuck::pod_read_unaligned(&bytes[0..4]);
        assert_eq!(count, 2);
        let second: GpuPointLight = bytemuck::pod_read_unaligned(&bytes[48..80]);
        assert_eq!(second.position, [2.0, 0.0, 0.0]);
    }
}
