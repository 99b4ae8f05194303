//! Procedural generation primitives for the sky: a reproducible random
//! stream and a layered coherent-noise field.

pub mod noise_field;
pub mod rng;

pub use noise_field::*;
pub use rng::*;
