//! Sun/ambient shading for cloud puffs.
//!
//! The lighting context is owned by the cluster field and passed into every
//! shading call; changing the atmosphere only touches this struct.

use engine_core::Transform;
use glam::Vec3;

use crate::cluster::Puff;

/// Weight of the cluster-level sun term in each puff's blend.
pub const CLUSTER_SUN_WEIGHT: f32 = 0.7;
/// Weight of the puff-level sun term in each puff's blend.
pub const PUFF_SUN_WEIGHT: f32 = 0.3;

/// Convert `0xRRGGBB` to a linear 0..1 color.
pub fn color_from_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Scene sun. Only its position is used for shading; the direction toward the
/// sun is `position.normalize()`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            position: Vec3::ONE,
            color: Vec3::ONE,
            intensity: 2.5,
        }
    }
}

impl DirectionalLight {
    /// Unit vector toward the sun, `None` for a light sitting at the origin.
    pub fn sun_direction(&self) -> Option<Vec3> {
        self.position.try_normalize()
    }
}

/// Light source plus the two colors puffs blend between.
#[derive(Debug, Clone, PartialEq)]
pub struct LightingContext {
    light: Option<DirectionalLight>,
    pub sun_color: Vec3,
    pub ambient_color: Vec3,
}

impl LightingContext {
    pub fn new(light: Option<DirectionalLight>, sun_color: Vec3, ambient_color: Vec3) -> Self {
        Self {
            light,
            sun_color,
            ambient_color,
        }
    }

    pub fn light(&self) -> Option<&DirectionalLight> {
        self.light.as_ref()
    }

    pub fn set_light(&mut self, light: Option<DirectionalLight>) {
        self.light = light;
    }

    /// Replace either color; `None` leaves that color as it is.
    pub fn set_atmosphere(&mut self, sun_color: Option<Vec3>, ambient_color: Option<Vec3>) {
        if let Some(c) = sun_color {
            self.sun_color = c;
        }
        if let Some(c) = ambient_color {
            self.ambient_color = c;
        }
    }

    /// Ambient term for the renderer's diffuse pass.
    pub fn ambient_light(&self, intensity: f32) -> Vec3 {
        self.ambient_color * intensity
    }

    /// Re-shade every puff of a cluster placed at `transform`.
    ///
    /// Returns `false` without touching the puffs when no usable light is set.
    pub fn shade(&self, transform: &Transform, puffs: &mut [Puff], base_intensity: f32) -> bool {
        let Some(sun_dir) = self.light.as_ref().and_then(DirectionalLight::sun_direction) else {
            return false;
        };
        let cluster_facing = facing_sun(sun_dir, transform.position);
        let total = puffs.len().max(1) as f32;

        for (index, puff) in puffs.iter_mut().enumerate() {
            let puff_facing = facing_sun(sun_dir, transform.transform_point(puff.offset));
            let influence = cluster_facing * CLUSTER_SUN_WEIGHT + puff_facing * PUFF_SUN_WEIGHT;
            puff.emissive = self.sun_color.lerp(self.ambient_color, 1.0 - influence);
            let layer_factor = index as f32 / total;
            puff.emissive_intensity = base_intensity * (1.0 + layer_factor * 0.5) * (0.5 + influence * 0.5);
        }
        true
    }
}

/// How much a point faces the sun, in [0, 1].
///
/// Dot of the sun direction with the normalized vector from the point toward
/// the sun direction's tip.
pub fn facing_sun(sun_dir: Vec3, point: Vec3) -> f32 {
    (sun_dir - point).normalize_or_zero().dot(sun_dir).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::PuffLayer;

    fn puff(offset: Vec3) -> Puff {
        Puff {
            offset,
            rotation: Vec3::ZERO,
            radius: 10.0,
            scale: 1.0,
            layer: PuffLayer::Core,
            opacity: 1.0,
            emissive: Vec3::ZERO,
            emissive_intensity: 0.0,
        }
    }

    #[test]
    fn hex_colors_decode() {
        let c = color_from_hex(0xff8000);
        assert!((c - Vec3::new(1.0, 128.0 / 255.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn no_light_is_a_noop() {
        let ctx = LightingContext::new(None, Vec3::ONE, Vec3::ZERO);
        let mut puffs = vec![puff(Vec3::ZERO)];
        assert!(!ctx.shade(&Transform::default(), &mut puffs, 0.2));
        assert_eq!(puffs[0].emissive_intensity, 0.0);
    }

    #[test]
    fn light_at_origin_is_a_noop() {
        let light = DirectionalLight { position: Vec3::ZERO, ..Default::default() };
        let ctx = LightingContext::new(Some(light), Vec3::ONE, Vec3::ZERO);
        let mut puffs = vec![puff(Vec3::ZERO)];
        assert!(!ctx.shade(&Transform::default(), &mut puffs, 0.2));
    }

    #[test]
    fn facing_is_clamped_to_unit_range() {
        let sun = Vec3::Y;
        assert!((facing_sun(sun, Vec3::new(0.0, -10.0, 0.0)) - 1.0).abs() < 1e-6);
        assert_eq!(facing_sun(sun, Vec3::new(0.0, 10.0, 0.0)), 0.0);
    }

    #[test]
    fn fully_lit_puff_takes_sun_color_and_layer_boost() {
        let light = DirectionalLight { position: Vec3::Y * 100.0, ..Default::default() };
        let sun = Vec3::new(1.0, 0.8, 0.6);
        let ctx = LightingContext::new(Some(light), sun, Vec3::new(0.5, 0.8, 0.9));
        // Everything directly below the sun faces it fully.
        let transform = Transform::from_position(Vec3::new(0.0, -50.0, 0.0));
        let mut puffs = vec![puff(Vec3::ZERO), puff(Vec3::new(0.0, -1.0, 0.0))];
        assert!(ctx.shade(&transform, &mut puffs, 0.2));
        assert!((puffs[0].emissive - sun).length() < 1e-5);
        assert!((puffs[0].emissive_intensity - 0.2).abs() < 1e-6);
        // Second of two puffs: layer factor 0.5 -> ×1.25.
        assert!((puffs[1].emissive_intensity - 0.25).abs() < 1e-6);
    }

    #[test]
    fn unlit_puff_takes_ambient_color_at_half_intensity() {
        let light = DirectionalLight { position: Vec3::Y, ..Default::default() };
        let ambient = Vec3::new(0.5, 0.8, 0.9);
        let ctx = LightingContext::new(Some(light), Vec3::ONE, ambient);
        let transform = Transform::from_position(Vec3::new(0.0, 50.0, 0.0));
        let mut puffs = vec![puff(Vec3::ZERO)];
        ctx.shade(&transform, &mut puffs, 0.2);
        assert!((puffs[0].emissive - ambient).length() < 1e-5);
        assert!((puffs[0].emissive_intensity - 0.1).abs() < 1e-6);
    }

    #[test]
    fn set_atmosphere_keeps_unspecified_color() {
        let mut ctx = LightingContext::new(None, Vec3::ONE, Vec3::ZERO);
        ctx.set_atmosphere(None, Some(Vec3::X));
        assert_eq!(ctx.sun_color, Vec3::ONE);
        assert_eq!(ctx.ambient_color, Vec3::X);
    }
}
