//! Mist particle field.
//!
//! A fixed pool of particles placed on fractal-noise ridges at cloud height.
//! Resting particles breathe (size oscillation) in place; a particle the
//! player flies into is ejected away from them, shrinks, and respawns.
//!
//! **Seed-based determinism:** placement draws only from the field's
//! [`XorShift32`], so the same seed and configuration always produce the
//! same initial layout.

use std::f32::consts::TAU;

use glam::Vec3;
use procgen::{FractalNoise, FractalParams, XorShift32};
use serde::{Deserialize, Serialize};

use crate::error::{ensure, ensure_positive, ensure_range, Result, SkyError};
use crate::instance::ParticleInstance;
use crate::sanitize_delta;

/// Ejected particles at or below this size respawn.
pub const RESPAWN_SIZE_EPSILON: f32 = 0.01;
/// Ejected particles further than this multiple of the render threshold respawn.
pub const RECYCLE_DISTANCE_FACTOR: f32 = 1.5;
/// Axis that earns ejected particles the fastest exit.
pub const EJECT_FORWARD_AXIS: Vec3 = Vec3::Z;
/// Noise range mapped onto [size_min, size_max].
const SIZE_NOISE_DOMAIN: (f64, f64) = (-0.5, 0.5);
/// Ejection speed at zero and full forward alignment.
const EJECT_SPEED: (f32, f32) = (1.3, 2.0);
/// Oscillation speed range for new particles.
const OSC_SPEED: (f32, f32) = (0.15, 0.75);

/// Configuration for the particle field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleFieldConfig {
    /// Pool size; fixed for the life of the field.
    pub count: usize,
    /// Candidate positions drawn per spawn; the noisiest wins.
    pub spawn_iterations: u32,
    pub noise_layers: u32,
    pub lacunarity: f64,
    pub persistence: f64,
    pub noise_scale: f64,
    pub size_min: f32,
    pub size_max: f32,
    pub cloud_height: f32,
    pub height_variance: f32,
    /// Beyond this distance particles stop reacting to the player.
    pub render_threshold: f32,
    pub collision_radius: f32,
    /// Size oscillation amplitude for resting particles.
    pub scale_amplitude: f32,
    /// Size lost per second once ejected.
    pub shrink_speed: f32,
    pub seed: u32,
    /// Side of the square spawn area.
    pub area_size: f32,
    /// Center the spawn area on the reference point instead of the origin.
    pub follow_reference: bool,
}

impl Default for ParticleFieldConfig {
    fn default() -> Self {
        Self {
            count: 2048,
            spawn_iterations: 8,
            noise_layers: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            noise_scale: 1.0,
            size_min: 0.5,
            size_max: 3.0,
            cloud_height: 50.0,
            height_variance: 5.0,
            render_threshold: 200.0,
            collision_radius: 6.0,
            scale_amplitude: 0.25,
            shrink_speed: 0.5,
            seed: 1337,
            area_size: 500.0,
            follow_reference: true,
        }
    }
}

impl ParticleFieldConfig {
    pub fn noise_params(&self) -> FractalParams {
        FractalParams {
            layers: self.noise_layers,
            lacunarity: self.lacunarity,
            persistence: self.persistence,
            scale: self.noise_scale,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure(self.count > 0, "count", "particle count must be at least 1")?;
        ensure(self.spawn_iterations > 0, "spawn_iterations", "need at least one spawn candidate")?;
        self.noise_params().check().map_err(|reason| SkyError::InvalidConfig {
            field: "noise",
            reason: reason.to_string(),
        })?;
        ensure_range(self.size_min, self.size_max, "size_min..size_max")?;
        ensure(self.size_min >= 0.0, "size_min", "sizes cannot be negative")?;
        ensure(self.cloud_height.is_finite(), "cloud_height", "must be finite")?;
        ensure(
            self.height_variance.is_finite() && self.height_variance >= 0.0,
            "height_variance",
            "must be finite and >= 0",
        )?;
        ensure_positive(self.render_threshold, "render_threshold")?;
        ensure(
            self.collision_radius.is_finite() && self.collision_radius >= 0.0,
            "collision_radius",
            "must be finite and >= 0",
        )?;
        ensure(self.scale_amplitude.is_finite(), "scale_amplitude", "must be finite")?;
        ensure(
            self.shrink_speed.is_finite() && self.shrink_speed >= 0.0,
            "shrink_speed",
            "must be finite and >= 0",
        )?;
        ensure_positive(self.area_size, "area_size")
    }
}

/// One mist particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudParticle {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub base_size: f32,
    /// Oscillation phase offset (radians).
    pub phase: f32,
    /// Oscillation speed (radians per second).
    pub osc_speed: f32,
    /// Drifting inside the layer (`true`) or ejected after a collision.
    pub resting: bool,
}

impl CloudParticle {
    fn oscillated_size(&self, time: f32, amplitude: f32) -> f32 {
        (self.base_size + (time * self.osc_speed + self.phase).sin() * amplitude).max(0.0)
    }
}

/// Map `x` onto [0, 1] with a Hermite ramp between `a` and `b`.
pub fn smoothstep(a: f64, b: f64, x: f64) -> f64 {
    if x <= a {
        return 0.0;
    }
    if x >= b {
        return 1.0;
    }
    let t = (x - a) / (b - a);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Mist particle pool.
pub struct ParticleField {
    config: ParticleFieldConfig,
    params: FractalParams,
    noise: FractalNoise,
    rng: XorShift32,
    particles: Vec<CloudParticle>,
    reference: Vec3,
    time: f32,
}

impl ParticleField {
    /// Validate the configuration and spawn the whole pool around the origin.
    pub fn new(config: ParticleFieldConfig) -> Result<Self> {
        config.validate()?;
        let placeholder = CloudParticle {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            size: 0.0,
            base_size: 0.0,
            phase: 0.0,
            osc_speed: 0.0,
            resting: true,
        };
        let mut field = Self {
            params: config.noise_params(),
            noise: FractalNoise::new(config.seed),
            rng: XorShift32::new(config.seed),
            particles: vec![placeholder; config.count],
            reference: Vec3::ZERO,
            time: 0.0,
            config,
        };
        for i in 0..field.particles.len() {
            field.spawn(i);
        }
        log::info!(
            "Particle field: {} particles, {} spawn candidates each, seed {}",
            field.particles.len(),
            field.config.spawn_iterations,
            field.config.seed
        );
        Ok(field)
    }

    pub fn config(&self) -> &ParticleFieldConfig {
        &self.config
    }

    pub fn particles(&self) -> &[CloudParticle] {
        &self.particles
    }

    pub fn reference_point(&self) -> Vec3 {
        self.reference
    }

    pub fn set_reference_point(&mut self, position: Vec3) {
        self.reference = position;
    }

    /// Seconds accumulated from `update` deltas.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn resting_count(&self) -> usize {
        self.particles.iter().filter(|p| p.resting).count()
    }

    /// Restart the random stream, e.g. to replay a spawn.
    pub fn reseed(&mut self, seed: u32) {
        self.rng = XorShift32::new(seed);
    }

    /// Place the spawn area's center: the reference point (on the ground
    /// plane) when following, otherwise the origin.
    fn spawn_center(&self) -> Vec3 {
        if self.config.follow_reference {
            Vec3::new(self.reference.x, 0.0, self.reference.z)
        } else {
            Vec3::ZERO
        }
    }

    /// Overwrite particle `index` with a fresh resting particle on a noise ridge.
    /// Out-of-range indices are ignored.
    pub fn spawn(&mut self, index: usize) {
        if index >= self.particles.len() {
            return;
        }
        let center = self.spawn_center();
        let cfg = &self.config;
        let rng = &mut self.rng;
        let area = f64::from(cfg.area_size);

        let mut best = center;
        let mut best_noise = f64::NEG_INFINITY;
        for _ in 0..cfg.spawn_iterations {
            let x = center.x + ((rng.next_float() - 0.5) * area) as f32;
            let z = center.z + ((rng.next_float() - 0.5) * area) as f32;
            let candidate = Vec3::new(x, 0.0, z);
            let n = self.noise.sample(candidate, &self.params);
            if n > best_noise {
                best_noise = n;
                best = candidate;
            }
        }

        let t = smoothstep(SIZE_NOISE_DOMAIN.0, SIZE_NOISE_DOMAIN.1, best_noise) as f32;
        let size = lerp(cfg.size_min, cfg.size_max, t);
        let y = cfg.cloud_height + rng.next_gaussian() as f32 * (cfg.height_variance * 0.5);
        let velocity = Vec3::new(
            ((rng.next_float() - 0.5) * 0.2) as f32,
            ((rng.next_float() - 0.5) * 0.2) as f32,
            ((rng.next_float() - 0.5) * 0.2) as f32,
        );
        let osc_speed = lerp(OSC_SPEED.0, OSC_SPEED.1, rng.next_float() as f32);
        let phase = rng.next_float() as f32 * TAU;

        self.particles[index] = CloudParticle {
            position: Vec3::new(best.x, y, best.z),
            velocity,
            size,
            base_size: size,
            phase,
            osc_speed,
            resting: true,
        };
    }

    /// Advance every particle by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        let delta = sanitize_delta(delta);
        self.time += delta;
        for i in 0..self.particles.len() {
            if self.step(i, delta) {
                self.spawn(i);
            }
        }
    }

    /// Per-particle state machine. Returns `true` when the particle must respawn.
    fn step(&mut self, index: usize, delta: f32) -> bool {
        let cfg = &self.config;
        let time = self.time;
        let reference = self.reference;
        let p = &mut self.particles[index];
        let away = p.position - reference;
        let distance = away.length();

        if distance < cfg.render_threshold {
            if p.resting {
                if distance < cfg.collision_radius {
                    eject(p, away);
                } else {
                    p.size = p.oscillated_size(time, cfg.scale_amplitude);
                }
                false
            } else {
                p.size = (p.size - cfg.shrink_speed * delta).max(0.0);
                p.position += p.velocity * delta;
                p.size <= RESPAWN_SIZE_EPSILON
                    || p.position.distance(reference) > cfg.render_threshold * RECYCLE_DISTANCE_FACTOR
            }
        } else {
            // Out of range in either state: bring it back near the player.
            true
        }
    }

    /// Copy positions and sizes into a renderer buffer.
    pub fn write_instances(&self, out: &mut Vec<ParticleInstance>) {
        out.clear();
        out.extend(self.particles.iter().map(|p| ParticleInstance {
            position: p.position.to_array(),
            size: p.size,
        }));
    }
}

/// Knock a resting particle away from the reference point. A particle exactly
/// at the reference point leaves along the forward axis.
fn eject(p: &mut CloudParticle, away: Vec3) {
    let dir = away.try_normalize().unwrap_or(EJECT_FORWARD_AXIS);
    let alignment = dir.dot(EJECT_FORWARD_AXIS).max(0.0);
    p.velocity = dir * lerp(EJECT_SPEED.0, EJECT_SPEED.1, alignment);
    p.resting = false;
}
