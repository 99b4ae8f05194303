//! Procedural sky for the flight game.
//!
//! Two independent systems share the procgen leaves:
//! - [`ParticleField`]: a fixed pool of mist particles placed on noise ridges
//!   that rest, get knocked out of the way by the player, and respawn.
//! - [`ClusterField`]: volumetric cloud clusters built from layered puffs,
//!   with fade in/out, drift, distance-tiered lighting and recycling around
//!   the player.
//!
//! The host calls `update` once per frame with the elapsed seconds and the
//! player position, then copies the instance buffers to the renderer.

pub mod billboards;
pub mod cluster;
pub mod cluster_field;
pub mod error;
pub mod instance;
pub mod lighting;
pub mod model;
pub mod particle_field;

pub use billboards::*;
pub use cluster::*;
pub use cluster_field::*;
pub use error::*;
pub use instance::*;
pub use lighting::*;
pub use model::*;
pub use particle_field::*;

/// Treat negative or non-finite frame deltas as an empty frame.
pub(crate) fn sanitize_delta(delta: f32) -> f32 {
    if delta.is_finite() && delta > 0.0 {
        delta
    } else {
        if !delta.is_finite() {
            log::warn!("Ignoring non-finite frame delta {}", delta);
        }
        0.0
    }
}

/// Uniform float in `[min, max)`. Unlike `gen_range`, an empty range yields `min`.
pub(crate) fn rand_range<R: rand::Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.gen::<f32>() * (max - min)
}
