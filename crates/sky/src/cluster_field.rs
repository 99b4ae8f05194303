//! Clustered volumetric cloud field.
//!
//! Clusters live in a disc around the player. Each frame every cluster:
//! fades in, starts fading out near the edge of the disc, drifts, refreshes
//! its lighting on a distance-tiered schedule, and is recycled to a new spot
//! once it falls outside the disc. Nothing is allocated or destroyed after
//! construction except when a detailed model replaces the puffs.

use std::f32::consts::TAU;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use engine_core::Transform;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::billboards::{scatter_billboards, FarBillboard};
use crate::cluster::{CloudCluster, FadeState};
use crate::error::{ensure, ensure_positive, ensure_range, Result};
use crate::instance::{BillboardInstance, PuffInstance};
use crate::lighting::{color_from_hex, DirectionalLight, LightingContext};
use crate::model::{CloudModel, ModelEvent, ModelLoader, MODEL_SCALE_RANGE};
use crate::{rand_range, sanitize_delta};

/// Mid-tier clusters refresh lighting at most this often (seconds).
pub const LOD_MID_INTERVAL: f32 = 0.5;
/// Far-tier clusters refresh lighting at most this often (seconds).
pub const LOD_FAR_INTERVAL: f32 = 2.0;
/// Distance past `lod_far` over which far clusters fade to nothing.
pub const LOD_FAR_FADE_SPAN: f32 = 300.0;
/// Drift magnitudes are per frame at this rate; other rates scale by `delta`.
pub const DRIFT_REFERENCE_FPS: f32 = 60.0;
const DRIFT_XZ_GAIN: f32 = 60.0;
const DRIFT_Y_GAIN: f32 = 25.0;

/// Configuration for the clustered field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterFieldConfig {
    pub count: usize,
    /// Radius of the live disc; clusters beyond it are recycled.
    pub spawn_distance: f32,
    /// Inner radius of the initial scatter.
    pub recycle_distance: f32,
    /// Recycled clusters land this far from the player (min, max).
    pub respawn_distance: (f32, f32),
    pub fade_in_duration: f32,
    pub fade_out_duration: f32,
    /// Fade-out starts this far inside `spawn_distance`.
    pub fade_out_distance: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Lateral spread for [`ClusterField::position_ahead`].
    pub spread_x: f32,
    pub sun_color: Vec3,
    pub ambient_color: Vec3,
    pub base_cloud_color: Vec3,
    pub emissive_intensity: f32,
    /// Ambient light weight reported to the renderer.
    pub ambient_intensity: f32,
    pub drift_speed_min: f32,
    pub drift_speed_max: f32,
    pub vertical_drift_scale: f32,
    pub noise_scale: f32,
    /// Start of the near lighting tier. Everything closer than `lod_mid` is
    /// relit every frame, so this only bounds `lod_mid` from below; it is kept
    /// so saved configs carry all three tiers.
    pub lod_near: f32,
    pub lod_mid: f32,
    pub lod_far: f32,
    pub far_billboard_count: usize,
    pub seed: u64,
}

impl Default for ClusterFieldConfig {
    fn default() -> Self {
        Self {
            count: 200,
            spawn_distance: 1000.0,
            recycle_distance: 200.0,
            respawn_distance: (300.0, 600.0),
            fade_in_duration: 2.0,
            fade_out_duration: 1.5,
            fade_out_distance: 150.0,
            min_height: 15.0,
            max_height: 90.0,
            spread_x: 450.0,
            sun_color: color_from_hex(0xffddaa),
            ambient_color: color_from_hex(0x87ceeb),
            base_cloud_color: Vec3::ONE,
            emissive_intensity: 0.2,
            ambient_intensity: 0.3,
            drift_speed_min: 0.2,
            drift_speed_max: 0.6,
            vertical_drift_scale: 0.15,
            noise_scale: 0.0003,
            lod_near: 0.0,
            lod_mid: 550.0,
            lod_far: 850.0,
            far_billboard_count: 120,
            seed: 0x5ca1ab1e,
        }
    }
}

impl ClusterFieldConfig {
    pub fn validate(&self) -> Result<()> {
        ensure(self.count > 0, "count", "cluster count must be at least 1")?;
        ensure_positive(self.spawn_distance, "spawn_distance")?;
        ensure_range(self.recycle_distance, self.spawn_distance, "recycle_distance..spawn_distance")?;
        ensure_range(self.respawn_distance.0, self.respawn_distance.1, "respawn_distance")?;
        ensure(
            self.respawn_distance.0 >= 0.0 && self.respawn_distance.1 <= self.spawn_distance,
            "respawn_distance",
            "recycled clusters must land inside spawn_distance",
        )?;
        ensure_positive(self.fade_in_duration, "fade_in_duration")?;
        ensure_positive(self.fade_out_duration, "fade_out_duration")?;
        ensure(
            self.fade_out_distance.is_finite() && self.fade_out_distance >= 0.0,
            "fade_out_distance",
            "must be finite and >= 0",
        )?;
        ensure_range(self.min_height, self.max_height, "min_height..max_height")?;
        ensure(self.spread_x.is_finite() && self.spread_x >= 0.0, "spread_x", "must be finite and >= 0")?;
        ensure(self.emissive_intensity.is_finite(), "emissive_intensity", "must be finite")?;
        ensure(self.ambient_intensity.is_finite(), "ambient_intensity", "must be finite")?;
        ensure_range(self.drift_speed_min, self.drift_speed_max, "drift_speed_min..drift_speed_max")?;
        ensure(self.vertical_drift_scale.is_finite(), "vertical_drift_scale", "must be finite")?;
        ensure(self.noise_scale.is_finite(), "noise_scale", "must be finite")?;
        ensure(
            self.lod_near <= self.lod_mid && self.lod_mid < self.lod_far && self.lod_far.is_finite(),
            "lod",
            format!(
                "expected lod_near <= lod_mid < lod_far (got {}, {}, {})",
                self.lod_near, self.lod_mid, self.lod_far
            ),
        )
    }
}

/// Per-frame counters for the host's logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Clusters with non-zero opacity after the frame.
    pub visible: usize,
    pub fading_out: usize,
    pub recycled: usize,
    pub lighting_refreshes: usize,
}

/// Volumetric cloud clusters around a moving reference point.
pub struct ClusterField {
    config: ClusterFieldConfig,
    lighting: LightingContext,
    clusters: Vec<CloudCluster>,
    billboards: Vec<FarBillboard>,
    rng: StdRng,
    /// Seconds accumulated from `update` deltas.
    time: f32,
    stats: FieldStats,
    loader: Option<ModelLoader>,
    alive: Arc<AtomicBool>,
}

impl ClusterField {
    /// Build the initial population around the origin, fully faded in.
    ///
    /// Without a light a default sun at (1, 1, 1) is used.
    pub fn new(config: ClusterFieldConfig, light: Option<DirectionalLight>) -> Result<Self> {
        config.validate()?;
        let light = light.unwrap_or_else(|| {
            log::warn!("No directional light given to cloud clusters, using default sun");
            DirectionalLight::default()
        });
        let lighting = LightingContext::new(Some(light), config.sun_color, config.ambient_color);
        let mut rng = StdRng::seed_from_u64(config.seed);

        let clusters = (0..config.count)
            .map(|_| {
                let mut cluster = CloudCluster::procedural(
                    &mut rng,
                    (config.drift_speed_min, config.drift_speed_max),
                    config.emissive_intensity,
                    config.sun_color,
                );
                let angle = rng.gen::<f32>() * TAU;
                let distance = rand_range(&mut rng, config.recycle_distance, config.spawn_distance);
                cluster.transform.position = Vec3::new(
                    angle.cos() * distance,
                    rand_range(&mut rng, config.min_height, config.max_height),
                    angle.sin() * distance,
                );
                cluster.transform.yaw = rng.gen::<f32>() * TAU;
                cluster.fade = FadeState::visible();
                cluster.set_opacity(cluster.target_opacity);
                cluster.apply_lighting(&lighting, config.emissive_intensity);
                cluster
            })
            .collect();

        let billboards = scatter_billboards(
            &mut rng,
            config.far_billboard_count,
            config.spawn_distance,
            config.min_height,
            config.max_height,
        );

        log::info!(
            "Cloud field: {} clusters, {} far billboards, spawn radius {}",
            config.count,
            billboards.len(),
            config.spawn_distance
        );

        Ok(Self {
            config,
            lighting,
            clusters,
            billboards,
            rng,
            time: 0.0,
            stats: FieldStats::default(),
            loader: None,
            alive: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn config(&self) -> &ClusterFieldConfig {
        &self.config
    }

    pub fn clusters(&self) -> &[CloudCluster] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut [CloudCluster] {
        &mut self.clusters
    }

    pub fn billboards(&self) -> &[FarBillboard] {
        &self.billboards
    }

    pub fn lighting(&self) -> &LightingContext {
        &self.lighting
    }

    pub fn stats(&self) -> FieldStats {
        self.stats
    }

    /// Seconds accumulated from `update` deltas.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Ambient term for the renderer's diffuse pass.
    pub fn ambient_light(&self) -> Vec3 {
        self.lighting.ambient_light(self.config.ambient_intensity)
    }

    /// Change the sun and/or ambient color. Takes effect on each cluster's
    /// next lighting refresh.
    pub fn set_atmosphere(&mut self, sun_color: Option<Vec3>, ambient_color: Option<Vec3>) {
        self.lighting.set_atmosphere(sun_color, ambient_color);
    }

    /// Replace or remove the light. With no light, lighting refresh is skipped.
    pub fn set_light(&mut self, light: Option<DirectionalLight>) {
        self.lighting.set_light(light);
    }

    /// Start loading a detailed model in the background. It replaces every
    /// cluster's puffs on the first frame after it arrives.
    pub fn load_detail_model(&mut self, path: PathBuf) {
        log::info!("Loading detailed cloud model from {}", path.display());
        self.loader = Some(ModelLoader::gltf(path, Arc::clone(&self.alive)));
    }

    /// Use a caller-supplied loader (any asset source).
    pub fn attach_model_loader<F>(&mut self, load: F)
    where
        F: FnOnce() -> anyhow::Result<CloudModel> + Send + 'static,
    {
        self.loader = Some(ModelLoader::spawn(Arc::clone(&self.alive), load));
    }

    /// Whether a model load is still outstanding.
    pub fn model_pending(&self) -> bool {
        self.loader.is_some()
    }

    /// Advance every cluster by `delta` seconds around `reference`.
    pub fn update(&mut self, reference: Vec3, delta: f32) {
        let delta = sanitize_delta(delta);
        self.time += delta;
        self.poll_model();

        self.stats = FieldStats::default();
        let time = self.time;
        for i in 0..self.clusters.len() {
            self.update_cluster(i, reference, delta, time);
        }
        self.stats.visible = self.clusters.iter().filter(|c| c.opacity() > 0.0).count();
        self.stats.fading_out = self.clusters.iter().filter(|c| c.fade.fading_out).count();
        if self.stats.recycled > 0 {
            log::debug!(
                "Recycled {} clouds, {} lighting refreshes",
                self.stats.recycled,
                self.stats.lighting_refreshes
            );
        }
    }

    /// One cluster's frame: fade in, fade-out trigger, fade out, drift,
    /// tiered lighting, recycle.
    pub fn update_cluster(&mut self, index: usize, reference: Vec3, delta: f32, time: f32) {
        let Self {
            config,
            lighting,
            clusters,
            rng,
            stats,
            ..
        } = self;
        let Some(cluster) = clusters.get_mut(index) else {
            return;
        };
        let distance = cluster.transform.position.distance(reference);

        if let Some(eased) = cluster.fade.advance_in(delta, config.fade_in_duration) {
            cluster.set_opacity(eased * cluster.target_opacity);
        }

        if distance > config.spawn_distance - config.fade_out_distance {
            cluster.fade.begin_fade_out();
        }
        if let Some(remaining) = cluster.fade.advance_out(delta, config.fade_out_duration) {
            cluster.set_opacity(remaining * cluster.target_opacity);
        }

        let frames = delta * DRIFT_REFERENCE_FPS;
        let drift = cluster.drift_offset(
            time,
            config.noise_scale * DRIFT_XZ_GAIN * frames,
            config.noise_scale * DRIFT_Y_GAIN * config.vertical_drift_scale * frames,
        );
        cluster.transform.translate(drift);

        let since_light = time - cluster.last_light_update;
        let refresh = if distance < config.lod_mid {
            true
        } else if distance < config.lod_far {
            since_light > LOD_MID_INTERVAL
        } else {
            let far_fade = (1.0 - (distance - config.lod_far) / LOD_FAR_FADE_SPAN).clamp(0.0, 1.0);
            let capped = cluster.opacity().min(far_fade * cluster.target_opacity);
            cluster.set_opacity(capped);
            since_light > LOD_FAR_INTERVAL
        };
        if refresh && cluster.apply_lighting(lighting, config.emissive_intensity) {
            cluster.last_light_update = time;
            stats.lighting_refreshes += 1;
        }

        // Recycle on horizontal distance so a player far above the height band
        // does not churn every cluster each frame.
        if cluster.transform.horizontal_distance(reference) > config.spawn_distance {
            let angle = rng.gen::<f32>() * TAU;
            let d = rand_range(rng, config.respawn_distance.0, config.respawn_distance.1);
            cluster.transform.position = Vec3::new(
                reference.x + angle.cos() * d,
                rand_range(rng, config.min_height, config.max_height),
                reference.z + angle.sin() * d,
            );
            cluster.transform.yaw = rng.gen::<f32>() * TAU;
            cluster.fade.reset();
            cluster.set_opacity(0.0);
            if cluster.apply_lighting(lighting, config.emissive_intensity) {
                cluster.last_light_update = time;
                stats.lighting_refreshes += 1;
            }
            stats.recycled += 1;
        }
    }

    /// Put cluster `index` `distance` units behind `forward` from `reference`
    /// (along `-forward`), with random lateral offset and height, faded out.
    pub fn position_ahead(&mut self, index: usize, reference: Vec3, forward: Vec3, distance: f32) {
        let Self { config, clusters, rng, .. } = self;
        let Some(cluster) = clusters.get_mut(index) else {
            return;
        };
        let forward = forward.try_normalize().unwrap_or(-Vec3::Z);
        let mut position = reference - forward * distance;
        position.x += (rng.gen::<f32>() - 0.5) * config.spread_x;
        position.y = rand_range(rng, config.min_height, config.max_height);
        cluster.transform = Transform {
            position,
            yaw: rng.gen::<f32>() * TAU,
            scale: cluster.transform.scale,
        };
        cluster.fade.reset();
        cluster.set_opacity(0.0);
    }

    /// Apply one opacity to every puff of cluster `index`.
    pub fn update_opacity(&mut self, index: usize, opacity: f32) {
        if let Some(cluster) = self.clusters.get_mut(index) {
            cluster.set_opacity(opacity);
        }
    }

    /// Re-shade cluster `index` now. Returns `false` when there is no light.
    pub fn update_lighting(&mut self, index: usize) -> bool {
        let Some(cluster) = self.clusters.get_mut(index) else {
            return false;
        };
        let lit = cluster.apply_lighting(&self.lighting, self.config.emissive_intensity);
        if lit {
            cluster.last_light_update = self.time;
        }
        lit
    }

    fn poll_model(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        match loader.poll() {
            None => {}
            Some(ModelEvent::Ready(model)) => {
                self.loader = None;
                self.apply_model(&model);
            }
            Some(ModelEvent::Failed(e)) => {
                self.loader = None;
                log::warn!("{}; keeping procedural clouds", e);
            }
        }
    }

    /// Replace every cluster's puffs with a randomly scaled copy of `model`,
    /// keeping opacity and fade state, then re-shade.
    pub fn apply_model(&mut self, model: &CloudModel) {
        for cluster in &mut self.clusters {
            let scale = rand_range(&mut self.rng, MODEL_SCALE_RANGE.0, MODEL_SCALE_RANGE.1);
            let puffs = model.instantiate(scale, self.lighting.sun_color, self.config.emissive_intensity);
            cluster.replace_puffs(puffs);
            if cluster.apply_lighting(&self.lighting, self.config.emissive_intensity) {
                cluster.last_light_update = self.time;
            }
        }
        log::info!(
            "Applied detailed cloud model ({} puffs) to {} clusters",
            model.templates().len(),
            self.clusters.len()
        );
    }

    /// World-space puffs of every cluster with non-zero opacity.
    pub fn write_puff_instances(&self, out: &mut Vec<PuffInstance>) {
        out.clear();
        let albedo = self.config.base_cloud_color.to_array();
        for cluster in self.clusters.iter().filter(|c| c.opacity() > 0.0) {
            let t = &cluster.transform;
            out.extend(cluster.puffs().iter().map(|puff| PuffInstance {
                position: t.transform_point(puff.offset).to_array(),
                radius: puff.local_radius() * t.scale,
                albedo,
                opacity: puff.opacity,
                emissive: puff.emissive.to_array(),
                emissive_intensity: puff.emissive_intensity,
            }));
        }
    }

    pub fn write_billboard_instances(&self, out: &mut Vec<BillboardInstance>) {
        out.clear();
        out.extend(self.billboards.iter().map(FarBillboard::instance));
    }
}

impl Drop for ClusterField {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}
