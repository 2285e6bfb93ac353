//! Geometry primitives: planes, triangles, segments and rotation helpers
//!
//! Pure functions over glam types. Nothing here holds state.

use glam::{Mat4, Quat, Vec3};

/// Lengths below this are treated as degenerate
pub const EPSILON: f32 = 1e-6;

/// An infinite plane, `normal · p = offset` for points on it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    /// Plane through `point` with the given (unit) normal
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    /// Plane through a triangle, normal flipped to agree with `up`
    ///
    /// Returns `None` for a degenerate triangle.
    pub fn from_triangle(tri: &[Vec3; 3], up: Vec3) -> Option<Self> {
        let normal = triangle_normal(tri)?;
        let normal = if normal.dot(up) < 0.0 { -normal } else { normal };
        Some(Self::from_point_normal(tri[0], normal))
    }

    /// Positive on the side the normal points to
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Closest point on the plane
    #[inline]
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Intersect the line `origin + t * dir` (any t) with the plane
    pub fn intersect_line(&self, origin: Vec3, dir: Vec3) -> Option<Vec3> {
        let denom = self.normal.dot(dir);
        if denom.abs() < EPSILON {
            return None;
        }
        let t = -self.signed_distance(origin) / denom;
        Some(origin + dir * t)
    }
}

/// Unit normal of a triangle (counter-clockwise winding), `None` if degenerate
pub fn triangle_normal(tri: &[Vec3; 3]) -> Option<Vec3> {
    let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]);
    let len = n.length();
    if len < EPSILON { None } else { Some(n / len) }
}

/// 2-D point-in-triangle test on the x/z plane (y is ignored)
///
/// Points on an edge count as inside, so a point on a shared edge resolves to
/// whichever triangle is scanned first.
pub fn point_in_triangle_xz(p: Vec3, tri: &[Vec3; 3]) -> bool {
    fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
        (b.x - a.x) * (p.z - a.z) - (b.z - a.z) * (p.x - a.x)
    }

    let d0 = edge(tri[0], tri[1], p);
    let d1 = edge(tri[1], tri[2], p);
    let d2 = edge(tri[2], tri[0], p);

    let has_neg = d0 < 0.0 || d1 < 0.0 || d2 < 0.0;
    let has_pos = d0 > 0.0 || d1 > 0.0 || d2 > 0.0;
    !(has_neg && has_pos)
}

/// Closest point to `p` on the segment `a..b`
pub fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Rotation taking `from` a `fraction` of the way toward `to`
///
/// Both vectors must be normalized.
pub fn partial_rotation_arc(from: Vec3, to: Vec3, fraction: f32) -> Quat {
    Quat::IDENTITY.slerp(Quat::from_rotation_arc(from, to), fraction.clamp(0.0, 1.0))
}

/// Rotation part of a rigid transform
#[inline]
pub fn rotation_of(transform: &Mat4) -> Quat {
    Quat::from_mat4(transform).normalize()
}

/// Translation part of a rigid transform
#[inline]
pub fn translation_of(transform: &Mat4) -> Vec3 {
    transform.w_axis.truncate()
}
