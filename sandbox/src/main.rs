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

//! Runs the clustering lane over a scene of orbiting point lights.
//!
//! Usage: `sandbox [settings.ron] [frames]`

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use strata_core::math::{Vec3, PI};
use strata_core::renderer::{CameraState, PointLight};
use strata_core::ClusterSettings;
use strata_infra::{init_logging, WgpuBufferDevice, WgpuHeadlessContext};
use strata_lanes::{ClusterCullingLane, LightStore};

const DEFAULT_FRAMES: u64 = 240;
const STATS_INTERVAL: u64 = 60;
const LIGHT_RADIUS: f32 = 2.0;
const TIME_STEP: f32 = 1.0 / 60.0;

/// Orbit parameters of one light, derived from its index.
struct Orbit {
    center: Vec3,
    radius: f32,
    speed: f32,
    phase: f32,
}

impl Orbit {
    fn for_light(index: usize, count: usize) -> Self {
        let t = index as f32 / count.max(1) as f32;
        Self {
            center: Vec3::new(
                (t * 37.0 * PI).sin() * 12.0,
                (t * 11.0 * PI).cos() * 3.0 + 3.0,
                (t * 23.0 * PI).cos() * 6.0,
            ),
            radius: 0.5 + (t * 7.0 * PI).sin().abs() * 2.0,
            speed: 0.5 + t,
            phase: t * 2.0 * PI,
        }
    }

    fn position(&self, time: f32) -> Vec3 {
        let angle = self.phase + time * self.speed;
        self.center + Vec3::new(angle.cos(), 0.0, angle.sin()) * self.radius
    }

    fn color(&self) -> Vec3 {
        Vec3::new(
            0.5 + 0.5 * self.phase.sin(),
            0.5 + 0.5 * (self.phase + 2.0).sin(),
            0.5 + 0.5 * (self.phase + 4.0).sin(),
        )
    }
}

fn main() -> Result<()> {
    init_logging().context("failed to install the logger")?;

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => ClusterSettings::from_file(&path)
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => ClusterSettings::default(),
    };
    let frames = match args.next() {
        Some(n) => n.parse().context("frame count must be an integer")?,
        None => DEFAULT_FRAMES,
    };

    let mut camera = CameraState::look_at(
        settings.screen_projection(),
        Vec3::new(-7.0, 2.0, 0.0),
        Vec3::ZERO,
        Vec3::Y,
        settings.screen_width,
        settings.screen_height,
    )?;

    let orbits: Vec<Orbit> = (0..settings.max_lights)
        .map(|i| Orbit::for_light(i, settings.max_lights))
        .collect();
    let mut lights = LightStore::new(settings.max_lights);
    for orbit in &orbits {
        lights.spawn(PointLight::new(orbit.position(0.0), LIGHT_RADIUS).with_color(orbit.color()))?;
    }

    let mut lane = ClusterCullingLane::from_settings(&settings)?;
    log::info!(
        "Clustering {} lights into {} clusters, estimated {:.3} ms per frame",
        lights.len(),
        settings.grid.cluster_count(),
        lane.estimate_cost(lights.len())
    );

    let gpu = match WgpuHeadlessContext::new_blocking() {
        Ok(context) => {
            let device = WgpuBufferDevice::from_context(&context);
            Some((context, device))
        }
        Err(e) => {
            log::warn!("No GPU available, running the CPU clustering only: {e}");
            None
        }
    };

    let mut clustering_time = Duration::ZERO;
    for frame in 0..frames {
        let time = frame as f32 * TIME_STEP;
        lights.update_all(|index, light| light.position = orbits[index].position(time))?;

        // Halfway through, widen the viewport to exercise the bounds rebuild.
        if frame == frames / 2 {
            camera.resize(settings.screen_width * 2, settings.screen_height)?;
        }

        let start = Instant::now();
        let stats = lane.prepare_frame(&camera, &lights)?;
        clustering_time += start.elapsed();

        if let Some((context, device)) = &gpu {
            lane.upload(device)?;
            context.flush()?;
        }

        if stats.rebuilt_bounds || frame % STATS_INTERVAL == 0 {
            log::info!(
                "Frame {}: {} non-empty clusters, {} references, max {} per cluster, {} truncated{}",
                stats.frame_index,
                stats.non_empty_clusters,
                stats.total_references,
                stats.max_count,
                stats.truncated_clusters,
                if stats.rebuilt_bounds { " (bounds rebuilt)" } else { "" }
            );
        }
    }

    if let Some((_, device)) = &gpu {
        lane.release(device)?;
    }
    if frames > 0 {
        log::info!(
            "Average clustering time: {:.3} ms over {} frames",
            clustering_time.as_secs_f64() * 1000.0 / frames as f64,
            frames
        );
    }
    Ok(())
}
