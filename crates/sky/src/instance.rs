//! Per-instance data handed to the renderer each frame.

use bytemuck::{Pod, Zeroable};

/// One mist particle (point sprite).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub size: f32,
}

/// One cloud puff (sphere impostor) in world space.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PuffInstance {
    pub position: [f32; 3],
    /// World-space radius (puff radius × puff scale × cluster scale).
    pub radius: f32,
    pub albedo: [f32; 3],
    pub opacity: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
}

/// One far-layer billboard quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BillboardInstance {
    pub position: [f32; 3],
    pub yaw: f32,
    /// Quad width and height in world units.
    pub size: [f32; 2],
    pub opacity: f32,
    pub _pad: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 16);
        assert_eq!(std::mem::size_of::<PuffInstance>(), 48);
        assert_eq!(std::mem::size_of::<BillboardInstance>(), 32);
    }

    #[test]
    fn instances_cast_to_bytes() {
        let list = [ParticleInstance { position: [1.0, 2.0, 3.0], size: 4.0 }; 2];
        let bytes: &[u8] = bytemuck::cast_slice(&list);
        assert_eq!(bytes.len(), 32);
    }
}
