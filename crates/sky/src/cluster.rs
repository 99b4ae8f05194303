//! Cloud clusters: layered puffs with a fade timeline and drift parameters.

use std::f32::consts::{PI, TAU};

use engine_core::Transform;
use glam::Vec3;
use rand::Rng;

use crate::lighting::LightingContext;
use crate::rand_range;

/// Which shell of the cluster a puff belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PuffLayer {
    /// Large puffs packed around the center.
    Core,
    /// Medium puffs on a ring around the core.
    Mid,
    /// Small scattered puffs forming the wispy edge.
    Outer,
    /// Part of a loaded detailed model.
    Model,
}

impl PuffLayer {
    /// Emissive multiplier at construction; outer shells catch more light.
    pub fn emissive_boost(self) -> f32 {
        match self {
            PuffLayer::Core | PuffLayer::Model => 1.0,
            PuffLayer::Mid => 1.1,
            PuffLayer::Outer => 1.3,
        }
    }
}

/// One sub-shape of a cluster, in cluster-local space.
#[derive(Debug, Clone, PartialEq)]
pub struct Puff {
    pub offset: Vec3,
    /// Euler angles; only affects how the renderer orients the textured sphere.
    pub rotation: Vec3,
    pub radius: f32,
    pub scale: f32,
    pub layer: PuffLayer,
    pub opacity: f32,
    pub emissive: Vec3,
    pub emissive_intensity: f32,
}

impl Puff {
    /// Radius after the puff's own scale, before cluster scale.
    pub fn local_radius(&self) -> f32 {
        self.radius * self.scale
    }
}

/// Fade-in / fade-out timeline. Both progress values stay in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FadeState {
    pub progress: f32,
    pub fading_out: bool,
    pub out_progress: f32,
}

impl FadeState {
    /// Fully faded in.
    pub fn visible() -> Self {
        Self {
            progress: 1.0,
            ..Default::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the fade-in by `dt / duration`. Returns the eased factor if the
    /// fade-in is still running this frame.
    pub fn advance_in(&mut self, dt: f32, duration: f32) -> Option<f32> {
        if self.progress >= 1.0 || self.fading_out {
            return None;
        }
        self.progress = (self.progress + dt / duration).clamp(0.0, 1.0);
        Some(ease_in_out_cubic(self.progress))
    }

    pub fn begin_fade_out(&mut self) {
        if !self.fading_out {
            self.fading_out = true;
            self.out_progress = 0.0;
        }
    }

    /// Advance the fade-out. Returns the remaining visibility factor.
    pub fn advance_out(&mut self, dt: f32, duration: f32) -> Option<f32> {
        if !self.fading_out {
            return None;
        }
        self.out_progress = (self.out_progress + dt / duration).clamp(0.0, 1.0);
        Some(1.0 - ease_in_out_cubic(self.out_progress))
    }
}

/// Cubic ease-in-out on [0, 1].
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Ranges for one procedural puff shell.
struct ShellShape {
    radius: (f32, f32),
    scale: (f32, f32),
}

const CORE: ShellShape = ShellShape { radius: (15.0, 30.0), scale: (0.8, 1.2) };
const MID: ShellShape = ShellShape { radius: (10.0, 20.0), scale: (0.7, 1.4) };
const OUTER: ShellShape = ShellShape { radius: (5.0, 15.0), scale: (0.6, 1.5) };

/// Puff count per cluster (inclusive).
pub const PUFF_COUNT_RANGE: (u32, u32) = (15, 30);

/// A volumetric cloud entity.
#[derive(Debug, Clone)]
pub struct CloudCluster {
    pub transform: Transform,
    pub target_opacity: f32,
    /// Opacity currently applied to every puff, always in [0, target_opacity].
    opacity: f32,
    pub fade: FadeState,
    pub drift_seed: f32,
    pub drift_speed: f32,
    /// Field time of the last lighting refresh.
    pub last_light_update: f32,
    puffs: Vec<Puff>,
}

impl CloudCluster {
    /// Build a procedural cluster: core, mid and outer shells of puffs.
    pub fn procedural<R: Rng>(
        rng: &mut R,
        drift_speed: (f32, f32),
        emissive_intensity: f32,
        sun_color: Vec3,
    ) -> Self {
        let puff_count = rng.gen_range(PUFF_COUNT_RANGE.0..=PUFF_COUNT_RANGE.1) as usize;
        let core_count = (puff_count as f32 * 0.4) as usize;
        let mid_count = (puff_count as f32 * 0.35) as usize;
        let outer_count = puff_count - core_count - mid_count;

        let mut puffs = Vec::with_capacity(puff_count);
        let make = |rng: &mut R, layer: PuffLayer, shape: &ShellShape, offset: Vec3| Puff {
            offset,
            rotation: Vec3::new(rng.gen::<f32>() * PI, rng.gen::<f32>() * PI, rng.gen::<f32>() * PI),
            radius: rand_range(rng, shape.radius.0, shape.radius.1),
            scale: rand_range(rng, shape.scale.0, shape.scale.1),
            layer,
            opacity: 0.0,
            emissive: sun_color,
            emissive_intensity: emissive_intensity * layer.emissive_boost(),
        };

        for _ in 0..core_count {
            let offset = Vec3::new(
                rand_range(rng, -15.0, 15.0),
                rand_range(rng, -12.0, 12.0),
                rand_range(rng, -15.0, 15.0),
            );
            puffs.push(make(rng, PuffLayer::Core, &CORE, offset));
        }
        for i in 0..mid_count {
            let angle = i as f32 / mid_count as f32 * TAU;
            let distance = rand_range(rng, 15.0, 30.0);
            let offset = Vec3::new(
                angle.cos() * distance + rand_range(rng, -10.0, 10.0),
                rand_range(rng, -15.0, 15.0),
                angle.sin() * distance + rand_range(rng, -10.0, 10.0),
            );
            puffs.push(make(rng, PuffLayer::Mid, &MID, offset));
        }
        for _ in 0..outer_count {
            let angle = rng.gen::<f32>() * TAU;
            let distance = rand_range(rng, 25.0, 45.0);
            let offset = Vec3::new(
                angle.cos() * distance + rand_range(rng, -12.0, 12.0),
                rand_range(rng, -18.0, 18.0),
                angle.sin() * distance + rand_range(rng, -12.0, 12.0),
            );
            puffs.push(make(rng, PuffLayer::Outer, &OUTER, offset));
        }

        let target_opacity = rand_range(rng, 0.75, 0.95);
        let base_scale = rand_range(rng, 1.8, 3.5);
        Self {
            transform: Transform {
                scale: base_scale,
                ..Default::default()
            },
            target_opacity,
            opacity: 0.0,
            fade: FadeState::default(),
            drift_seed: rng.gen::<f32>() * 1000.0,
            drift_speed: rand_range(rng, drift_speed.0, drift_speed.1),
            last_light_update: 0.0,
            puffs,
        }
    }

    pub fn puffs(&self) -> &[Puff] {
        &self.puffs
    }

    /// Re-shade every puff against `lighting`. No-op without a light.
    pub fn apply_lighting(&mut self, lighting: &LightingContext, base_intensity: f32) -> bool {
        lighting.shade(&self.transform, &mut self.puffs, base_intensity)
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Apply one opacity to every puff, clamped to [0, target_opacity].
    pub fn set_opacity(&mut self, opacity: f32) {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, self.target_opacity)
        } else {
            0.0
        };
        self.opacity = opacity;
        for puff in &mut self.puffs {
            puff.opacity = opacity;
        }
    }

    /// Swap in a new puff collection in one step, carrying the current opacity
    /// over. Returns the previous collection.
    pub fn replace_puffs(&mut self, mut puffs: Vec<Puff>) -> Vec<Puff> {
        for puff in &mut puffs {
            puff.opacity = self.opacity;
        }
        std::mem::replace(&mut self.puffs, puffs)
    }

    /// Pseudo-noise drift offset for this frame: sums of sines driven by the
    /// cluster's seed and speed. `xz_scale` and `y_scale` are world units per frame.
    pub fn drift_offset(&self, time: f32, xz_scale: f32, y_scale: f32) -> Vec3 {
        let seed = self.drift_seed;
        let t = time * self.drift_speed;
        let phase = seed + t;
        let nx = (phase * 1.1).sin() * 0.5 + (seed * 0.37 + t * 0.7).sin() * 0.5;
        let nz = (phase * 0.9).cos() * 0.5 + (seed * 0.17 + t * 0.4).sin() * 0.5;
        let ny = (phase * 0.6).sin() * 0.5;
        Vec3::new(nx * xz_scale, ny * y_scale, nz * xz_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cluster(seed: u64) -> CloudCluster {
        let mut rng = StdRng::seed_from_u64(seed);
        CloudCluster::procedural(&mut rng, (0.2, 0.6), 0.2, Vec3::ONE)
    }

    #[test]
    fn ease_endpoints_and_midpoint() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert!((ease_in_out_cubic(0.25) - 0.0625).abs() < 1e-6);
    }

    #[test]
    fn shells_split_forty_thirty_five_rest() {
        for seed in 0..20 {
            let c = cluster(seed);
            let n = c.puffs().len();
            assert!((15..=30).contains(&n));
            let core = c.puffs().iter().filter(|p| p.layer == PuffLayer::Core).count();
            let mid = c.puffs().iter().filter(|p| p.layer == PuffLayer::Mid).count();
            let outer = c.puffs().iter().filter(|p| p.layer == PuffLayer::Outer).count();
            assert_eq!(core, n * 4 / 10);
            assert_eq!(mid, (n as f32 * 0.35) as usize);
            assert_eq!(core + mid + outer, n);
        }
    }

    #[test]
    fn outer_puffs_glow_brighter_than_core() {
        let c = cluster(9);
        let core = c.puffs().iter().find(|p| p.layer == PuffLayer::Core).unwrap();
        let outer = c.puffs().iter().find(|p| p.layer == PuffLayer::Outer).unwrap();
        assert!(outer.emissive_intensity > core.emissive_intensity);
    }

    #[test]
    fn procedural_ranges() {
        let c = cluster(4);
        assert!((0.75..0.95).contains(&c.target_opacity));
        assert!((1.8..3.5).contains(&c.transform.scale));
        assert!((0.2..0.6).contains(&c.drift_speed));
        assert_eq!(c.opacity(), 0.0);
    }

    #[test]
    fn opacity_is_clamped_to_target() {
        let mut c = cluster(1);
        c.set_opacity(5.0);
        assert_eq!(c.opacity(), c.target_opacity);
        assert!(c.puffs().iter().all(|p| p.opacity == c.target_opacity));
        c.set_opacity(-1.0);
        assert_eq!(c.opacity(), 0.0);
        c.set_opacity(f32::NAN);
        assert_eq!(c.opacity(), 0.0);
    }

    #[test]
    fn fade_in_then_out_stays_in_unit_range() {
        let mut fade = FadeState::default();
        for _ in 0..100 {
            fade.advance_in(0.1, 2.0);
        }
        assert_eq!(fade.progress, 1.0);
        assert!(fade.advance_in(0.1, 2.0).is_none());
        fade.begin_fade_out();
        let mut last = 1.0;
        for _ in 0..100 {
            last = fade.advance_out(0.1, 1.5).unwrap();
        }
        assert_eq!(fade.out_progress, 1.0);
        assert_eq!(last, 0.0);
    }

    #[test]
    fn fade_out_blocks_fade_in() {
        let mut fade = FadeState::default();
        fade.begin_fade_out();
        assert!(fade.advance_in(0.5, 2.0).is_none());
        assert_eq!(fade.progress, 0.0);
    }

    #[test]
    fn replace_puffs_keeps_opacity() {
        let mut c = cluster(2);
        c.set_opacity(0.5);
        let replacement = vec![Puff {
            offset: Vec3::ZERO,
            rotation: Vec3::ZERO,
            radius: 40.0,
            scale: 1.0,
            layer: PuffLayer::Model,
            opacity: 0.0,
            emissive: Vec3::ONE,
            emissive_intensity: 0.2,
        }];
        let old = c.replace_puffs(replacement);
        assert!(!old.is_empty());
        assert_eq!(c.puffs().len(), 1);
        assert_eq!(c.puffs()[0].opacity, 0.5);
    }

    #[test]
    fn drift_is_bounded_and_deterministic() {
        let c = cluster(3);
        for i in 0..100 {
            let d = c.drift_offset(i as f32 * 0.37, 0.018, 0.001);
            assert!(d.x.abs() <= 0.018 + 1e-6);
            assert!(d.y.abs() <= 0.0005 + 1e-6);
            assert_eq!(d, c.drift_offset(i as f32 * 0.37, 0.018, 0.001));
        }
    }
}
