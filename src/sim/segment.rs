//! One streamed slice of terrain
//!
//! A segment spans from its own frame (`transform`) to the frame of the
//! segment after it (`end_transform`). The floor is a strip of triangles
//! between the edge loop placed at each of those frames.

use glam::{Mat4, Vec3};

use super::collision::EdgeSide;
use super::geometry::{Plane, point_in_triangle_xz, translation_of};
use super::pool::ObstacleHandle;
use crate::scene::{FloorVertex, ObjectId};
use crate::settings::SlopeConfig;

/// A floating collectible
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balloon {
    pub id: ObjectId,
    pub position: Vec3,
    pub radius: f32,
}

/// Cross-section of the track, left to right, in segment-local space
///
/// Flat in the middle with a raised lip toward both edges.
pub fn edge_loop(config: &SlopeConfig, resolution: usize) -> Vec<Vec3> {
    let resolution = resolution.max(2);
    (0..resolution)
        .map(|k| {
            let t = -1.0 + 2.0 * k as f32 / (resolution - 1) as f32;
            Vec3::new(t * config.half_width, config.bank_height * t.powi(4), 0.0)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Segment {
    /// Monotonic index since the slope was created
    pub index: u64,
    /// Start frame (rigid, no scale)
    pub transform: Mat4,
    /// Start frame of the following segment
    pub end_transform: Mat4,
    inverse: Mat4,
    /// Cross-section at the start frame, local space
    pub edge_loop: Vec<Vec3>,
    /// Cross-section at the end frame, expressed in this segment's local space
    end_loop: Vec<Vec3>,
    /// Floor triangles in local space, two per quad between the loops
    floor: Vec<[Vec3; 3]>,
    pub obstacles: Vec<ObstacleHandle>,
    /// Collectibles by lane slot; `None` once popped
    pub balloons: Vec<Option<Balloon>>,
    /// Side decoration anchors, world space
    pub decorations: Vec<Vec3>,
    /// Texture V at the start frame
    pub v_offset: f32,
    pub cliff: bool,
}

impl Segment {
    pub fn new(index: u64, transform: Mat4, end_transform: Mat4, edge_loop: Vec<Vec3>, v_offset: f32) -> Self {
        let inverse = transform.inverse();
        let end_local = inverse * end_transform;
        let end_loop: Vec<Vec3> = edge_loop.iter().map(|p| end_local.transform_point3(*p)).collect();

        let mut floor = Vec::with_capacity(edge_loop.len().saturating_sub(1) * 2);
        for k in 0..edge_loop.len().saturating_sub(1) {
            let (a, b) = (edge_loop[k], edge_loop[k + 1]);
            let (c, d) = (end_loop[k], end_loop[k + 1]);
            floor.push([a, c, b]);
            floor.push([b, c, d]);
        }

        Self {
            index,
            transform,
            end_transform,
            inverse,
            edge_loop,
            end_loop,
            floor,
            obstacles: Vec::new(),
            balloons: Vec::new(),
            decorations: Vec::new(),
            v_offset,
            cliff: false,
        }
    }

    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.inverse.transform_point3(world)
    }

    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.transform.transform_point3(local)
    }

    pub fn origin(&self) -> Vec3 {
        translation_of(&self.transform)
    }

    /// Local up axis in world space
    pub fn up(&self) -> Vec3 {
        self.transform.transform_vector3(Vec3::Y).normalize()
    }

    /// Local forward axis in world space
    pub fn forward(&self) -> Vec3 {
        self.transform.transform_vector3(Vec3::Z).normalize()
    }

    /// Plane a rider crosses when entering this segment, normal pointing downhill
    pub fn start_plane(&self) -> Plane {
        Plane::from_point_normal(self.origin(), self.forward())
    }

    /// Number of floor triangles
    pub fn triangle_count(&self) -> usize {
        self.floor.len()
    }

    /// Floor triangle whose x/z footprint contains the point, in world space
    pub fn surrounding_triangle(&self, point: Vec3) -> Option<[Vec3; 3]> {
        let local = self.to_local(point);
        self.floor
            .iter()
            .find(|tri| point_in_triangle_xz(local, tri))
            .map(|tri| tri.map(|v| self.to_world(v)))
    }

    /// World point on the floor
    ///
    /// `lateral` runs -1 (left edge) to 1 (right edge), `along` runs 0 (start)
    /// to 1 (end). Follows the track profile, not the triangle facets.
    pub fn floor_point(&self, lateral: f32, along: f32) -> Vec3 {
        let lateral = lateral.clamp(-1.0, 1.0);
        let (Some(left), Some(right)) = (self.edge_loop.first(), self.edge_loop.last()) else {
            return self.origin();
        };
        let half_width = right.x;
        let bank = left.y;
        let start = Vec3::new(lateral * half_width, bank * lateral.powi(4), 0.0);
        let end = self.inverse.mul_mat4(&self.end_transform).transform_point3(start);
        self.to_world(start.lerp(end, along.clamp(0.0, 1.0)))
    }

    /// Edge-loop vertex on the given side at the start frame, world space
    pub fn edge_vertex(&self, side: EdgeSide) -> Vec3 {
        let local = match side {
            EdgeSide::Left => self.edge_loop.first(),
            EdgeSide::Right => self.edge_loop.last(),
        };
        self.to_world(local.copied().unwrap_or(Vec3::ZERO))
    }

    /// Vertex and index buffers for the geometry sink
    pub fn floor_geometry(&self, texture_repeat: f32) -> (Vec<FloorVertex>, Vec<u32>) {
        let n = self.edge_loop.len();
        let length = self.origin().distance(translation_of(&self.end_transform));
        let v_end = self.v_offset + length / texture_repeat;

        let mut vertices = Vec::with_capacity(n * 2);
        for (k, p) in self.edge_loop.iter().enumerate() {
            let u = k as f32 / (n.max(2) - 1) as f32;
            vertices.push(FloorVertex::new(self.to_world(*p), u, self.v_offset));
        }
        for (k, p) in self.end_loop.iter().enumerate() {
            let u = k as f32 / (n.max(2) - 1) as f32;
            vertices.push(FloorVertex::new(self.to_world(*p), u, v_end));
        }

        let n = n as u32;
        let mut indices = Vec::with_capacity(self.floor.len() * 3);
        for k in 0..n.saturating_sub(1) {
            indices.extend_from_slice(&[k, n + k, k + 1, k + 1, n + k, n + k + 1]);
        }
        (vertices, indices)
    }

    /// Balloons not yet popped
    pub fn live_balloons(&self) -> impl Iterator<Item = &Balloon> {
        self.balloons.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn flat_segment() -> Segment {
        let config = SlopeConfig::straight(0.0);
        let start = Mat4::IDENTITY;
        let end = Mat4::from_translation(Vec3::Z * config.segment_length);
        Segment::new(0, start, end, edge_loop(&config, 9), 0.0)
    }

    #[test]
    fn test_edge_loop_profile() {
        let config = SlopeConfig::default();
        let ring = edge_loop(&config, 9);
        assert_eq!(ring.len(), 9);
        assert_eq!(ring[0].x, -config.half_width);
        assert_eq!(ring[8].x, config.half_width);
        assert_eq!(ring[4], Vec3::ZERO);
        assert!((ring[0].y - config.bank_height).abs() < 1e-6);
    }

    #[test]
    fn test_floor_triangles_face_up() {
        let seg = flat_segment();
        assert_eq!(seg.triangle_count(), 16);
        for tri in &seg.floor {
            let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
            assert!(n.y > 0.0);
        }
    }

    #[test]
    fn test_surrounding_triangle_hit_and_miss() {
        let seg = flat_segment();
        let tri = seg.surrounding_triangle(Vec3::new(1.0, 50.0, 5.0)).expect("inside footprint");
        let plane = Plane::from_triangle(&tri, Vec3::Y).expect("non-degenerate");
        // Middle of the track is nearly flat
        assert!(plane.signed_distance(Vec3::new(1.0, 0.0, 5.0)).abs() < 1e-2);

        assert!(seg.surrounding_triangle(Vec3::new(0.0, 0.0, 15.0)).is_none());
        assert!(seg.surrounding_triangle(Vec3::new(25.0, 0.0, 5.0)).is_none());
    }

    #[test]
    fn test_rotated_segment_world_queries() {
        let config = SlopeConfig::default();
        let rotation = Quat::from_rotation_y(0.5) * Quat::from_rotation_x(0.3);
        let start = Mat4::from_rotation_translation(rotation, Vec3::new(5.0, -3.0, 2.0));
        let end = start * Mat4::from_translation(Vec3::Z * config.segment_length);
        let seg = Segment::new(3, start, end, edge_loop(&config, 9), 0.25);

        let mid = seg.floor_point(0.0, 0.5);
        let tri = seg.surrounding_triangle(mid).expect("floor point is on the floor");
        let plane = Plane::from_triangle(&tri, seg.up()).expect("non-degenerate");
        assert!(plane.signed_distance(mid).abs() < 1e-3);
        assert!(seg.start_plane().signed_distance(mid) > 0.0);
        assert!(seg.to_local(seg.to_world(Vec3::ONE)).distance(Vec3::ONE) < 1e-4);
    }

    #[test]
    fn test_floor_geometry_buffers() {
        let seg = flat_segment();
        let (vertices, indices) = seg.floor_geometry(40.0);
        assert_eq!(vertices.len(), 18);
        assert_eq!(indices.len(), 16 * 3);
        assert!(indices.iter().all(|i| (*i as usize) < vertices.len()));
        assert!((vertices[9].uv[1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_edge_vertices() {
        let seg = flat_segment();
        assert_eq!(seg.edge_vertex(EdgeSide::Left).x, -seg.edge_loop[8].x);
        assert!(seg.edge_vertex(EdgeSide::Right).x > 0.0);
    }
}
