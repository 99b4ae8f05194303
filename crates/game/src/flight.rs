//! Scripted flight path that stands in for the player.
//!
//! The sky only needs a moving reference point and a heading, so the headless
//! run flies a slow banking circuit with a gentle altitude bob.

use engine_core::Transform;
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Ground speed in world units per second.
    pub speed: f32,
    pub altitude: f32,
    /// Heading change in radians per second.
    pub turn_rate: f32,
    pub bob_amplitude: f32,
    /// Bob cycles per second.
    pub bob_frequency: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            speed: 40.0,
            altitude: 50.0,
            turn_rate: 0.05,
            bob_amplitude: 6.0,
            bob_frequency: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlightPath {
    config: FlightConfig,
    transform: Transform,
    time: f32,
}

impl FlightPath {
    pub fn new(config: FlightConfig) -> Self {
        let transform = Transform::from_position(Vec3::new(0.0, config.altitude, 0.0));
        Self {
            config,
            transform,
            time: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// Unit heading (horizontal).
    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn advance(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        self.time += dt;
        self.transform.yaw += self.config.turn_rate * dt;
        let step = self.forward() * self.config.speed * dt;
        self.transform.translate(step);
        self.transform.position.y = self.config.altitude
            + (self.time * self.config.bob_frequency * std::f32::consts::TAU).sin() * self.config.bob_amplitude;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_flight_covers_speed_times_time() {
        let mut path = FlightPath::new(FlightConfig {
            turn_rate: 0.0,
            bob_amplitude: 0.0,
            ..Default::default()
        });
        for _ in 0..60 {
            path.advance(1.0 / 60.0);
        }
        let p = path.position();
        assert!((p.z + 40.0).abs() < 1e-3, "{:?}", p);
        assert!(p.x.abs() < 1e-4);
        assert_eq!(p.y, 50.0);
    }

    #[test]
    fn altitude_stays_within_bob() {
        let mut path = FlightPath::new(FlightConfig::default());
        for _ in 0..2000 {
            path.advance(0.05);
            assert!((path.position().y - 50.0).abs() <= 6.0 + 1e-4);
            assert!((path.forward().length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn bad_step_is_ignored() {
        let mut path = FlightPath::new(FlightConfig::default());
        path.advance(f32::NAN);
        path.advance(-1.0);
        assert_eq!(path.position(), Vec3::new(0.0, 50.0, 0.0));
    }
}
