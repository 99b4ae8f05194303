//! Far background layer of cheap cloud billboards.
//!
//! Scattered once at startup on a wide ring; never faded, drifted or recycled.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;

use crate::instance::BillboardInstance;
use crate::rand_range;

pub const BILLBOARD_WIDTH: f32 = 120.0;
pub const BILLBOARD_HEIGHT: f32 = 60.0;
pub const BILLBOARD_OPACITY: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarBillboard {
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
}

impl FarBillboard {
    pub fn instance(&self) -> BillboardInstance {
        BillboardInstance {
            position: self.position.to_array(),
            yaw: self.yaw,
            size: [BILLBOARD_WIDTH * self.scale, BILLBOARD_HEIGHT * self.scale],
            opacity: BILLBOARD_OPACITY,
            _pad: 0.0,
        }
    }
}

/// Scatter `count` billboards at 0.9–1.2 × `radius` around the origin, between
/// `min_height + 10` and `max_height + 40`.
pub fn scatter_billboards<R: Rng>(
    rng: &mut R,
    count: usize,
    radius: f32,
    min_height: f32,
    max_height: f32,
) -> Vec<FarBillboard> {
    (0..count)
        .map(|_| {
            let angle = rng.gen::<f32>() * TAU;
            let r = rand_range(rng, radius * 0.9, radius * 1.2);
            FarBillboard {
                position: Vec3::new(
                    angle.cos() * r,
                    rand_range(rng, min_height + 10.0, max_height + 40.0),
                    angle.sin() * r,
                ),
                yaw: rng.gen::<f32>() * TAU,
                scale: rand_range(rng, 0.8, 2.2),
            }
        })
        .collect()
}
