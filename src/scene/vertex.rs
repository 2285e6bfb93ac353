//! Vertex type handed to the geometry sink

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Floor vertex with world position and texture coordinates
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FloorVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl FloorVertex {
    pub fn new(position: Vec3, u: f32, v: f32) -> Self {
        Self {
            position: position.to_array(),
            uv: [u, v],
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Raw bytes for upload
    pub fn as_bytes(vertices: &[FloorVertex]) -> &[u8] {
        bytemuck::cast_slice(vertices)
    }
}
