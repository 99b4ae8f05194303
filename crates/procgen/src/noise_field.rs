//! Fractal (multi-octave) coherent noise.
//!
//! Wraps the improved-Perlin primitive from the `noise` crate and sums
//! `layers` octaves of it. Same position and parameters always give the same
//! value; the field holds no state besides the permutation table.

use glam::Vec3;
use noise::{NoiseFn, Perlin};

/// Octave parameters for [`FractalNoise::sample`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalParams {
    /// Number of octaves.
    pub layers: u32,
    /// Frequency multiplier per octave.
    pub lacunarity: f64,
    /// Amplitude multiplier per octave.
    pub persistence: f64,
    /// Frequency of the first octave.
    pub scale: f64,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            layers: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            scale: 1.0,
        }
    }
}

impl FractalParams {
    /// Describe the first degenerate parameter, if any.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.layers == 0 {
            return Err("layer count must be at least 1");
        }
        if !self.lacunarity.is_finite() || self.lacunarity <= 0.0 {
            return Err("lacunarity must be finite and positive");
        }
        if !self.persistence.is_finite() || self.persistence < 0.0 {
            return Err("persistence must be finite and non-negative");
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err("scale must be finite and positive");
        }
        Ok(())
    }
}

/// Layered coherent noise evaluator.
#[derive(Debug, Clone)]
pub struct FractalNoise {
    perlin: Perlin,
}

impl FractalNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
        }
    }

    /// Single octave of the underlying primitive, roughly in [-1, 1].
    pub fn primitive(&self, x: f64, y: f64, z: f64) -> f64 {
        self.perlin.get([x, y, z])
    }

    /// Sum `params.layers` octaves at `position`.
    ///
    /// Non-finite results (only possible with absurd inputs) collapse to 0.
    pub fn sample(&self, position: Vec3, params: &FractalParams) -> f64 {
        let p = position.as_dvec3();
        let mut total = 0.0;
        let mut frequency = params.scale;
        let mut amplitude = 1.0;
        for _ in 0..params.layers {
            total += self.primitive(p.x * frequency, p.y * frequency, p.z * frequency) * amplitude;
            amplitude *= params.persistence;
            frequency *= params.lacunarity;
        }
        if total.is_finite() {
            total
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_output() {
        let a = FractalNoise::new(3);
        let b = FractalNoise::new(3);
        let params = FractalParams::default();
        for i in 0..64 {
            let p = Vec3::new(i as f32 * 0.37, 0.0, i as f32 * -1.13);
            assert_eq!(a.sample(p, &params), b.sample(p, &params));
        }
    }

    #[test]
    fn single_layer_equals_primitive() {
        let n = FractalNoise::new(11);
        let params = FractalParams {
            layers: 1,
            scale: 0.5,
            ..Default::default()
        };
        let p = Vec3::new(3.3, 0.0, -7.1);
        let expected = n.primitive(3.3f32 as f64 * 0.5, 0.0, -7.1f32 as f64 * 0.5);
        assert_eq!(n.sample(p, &params), expected);
    }

    #[test]
    fn output_stays_near_unit_range() {
        let n = FractalNoise::new(1337);
        let params = FractalParams::default();
        for i in 0..500 {
            let p = Vec3::new((i as f32 * 1.7).sin() * 250.0, 0.0, (i as f32 * 0.9).cos() * 250.0);
            let v = n.sample(p, &params);
            // Octave amplitudes sum to 1.875 with persistence 0.5.
            assert!(v.abs() < 2.0, "sample {} out of range: {}", i, v);
        }
    }

    #[test]
    fn coherent_between_close_points() {
        let n = FractalNoise::new(5);
        let params = FractalParams {
            layers: 2,
            scale: 0.05,
            ..Default::default()
        };
        let a = n.sample(Vec3::new(10.0, 0.0, 10.0), &params);
        let b = n.sample(Vec3::new(10.01, 0.0, 10.0), &params);
        assert!((a - b).abs() < 0.05);
    }

    #[test]
    fn degenerate_params_are_rejected() {
        assert!(FractalParams { layers: 0, ..Default::default() }.check().is_err());
        assert!(FractalParams { lacunarity: f64::NAN, ..Default::default() }.check().is_err());
        assert!(FractalParams { scale: 0.0, ..Default::default() }.check().is_err());
        assert!(FractalParams::default().check().is_ok());
    }
}
