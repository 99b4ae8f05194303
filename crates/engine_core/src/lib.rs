//! Core engine types shared by the sky simulation crates.
//!
//! This crate provides the foundational pieces every system needs:
//! - Frame timing (real clock or fixed step)
//! - Yaw/scale transforms for placed sky entities

pub mod time;
pub mod transform;

pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
