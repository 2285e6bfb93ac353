//! Collision detection and response for the rider's box and capsule
//!
//! Terrain edges are tested against the corners of an oriented box. Trees and
//! balloons are spheres tested against the rider's capsule.

use glam::{Quat, Vec3};

use super::geometry::{EPSILON, Plane, closest_point_on_segment};
use super::pool::ObstacleHandle;

/// Which side of the track an edge plane bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    Left,
    Right,
}

/// What the rider struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactSource {
    Edge(EdgeSide),
    Obstacle(ObstacleHandle),
}

/// Result of a collision query, valid for the tick that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionContact {
    /// Surface normal, pointing away from the struck surface toward the rider
    pub normal: Vec3,
    /// Penetration depth (for position correction)
    pub depth: f32,
    /// Contact point on the struck surface
    pub point: Vec3,
    pub source: Option<ContactSource>,
}

impl CollisionContact {
    pub fn with_source(mut self, source: ContactSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// An oriented box (rider body for edge tests)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    pub center: Vec3,
    pub rotation: Quat,
    pub half_extents: Vec3,
}

impl OrientedBox {
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// Box-local point to world space
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.center + self.rotation * local
    }

    /// World point to box-local space
    #[inline]
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.center)
    }

    /// The eight corners in world space
    pub fn corners(&self) -> [Vec3; 8] {
        let h = self.half_extents;
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
            let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
            let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
            *corner = self.to_world(Vec3::new(sx * h.x, sy * h.y, sz * h.z));
        }
        corners
    }
}

/// Deepest corner of `a` lying inside `b`
///
/// The normal is the face of `b` nearest to that corner, in world space.
pub fn box_corner_in_box(a: &OrientedBox, b: &OrientedBox) -> Option<CollisionContact> {
    let mut best: Option<CollisionContact> = None;

    for corner in a.corners() {
        let local = b.to_local(corner);
        let gap = b.half_extents - local.abs();
        if gap.min_element() < 0.0 {
            continue;
        }

        // Push out through the face with the least overlap
        let (axis, depth) = if gap.x <= gap.y && gap.x <= gap.z {
            (Vec3::X * local.x.signum(), gap.x)
        } else if gap.y <= gap.z {
            (Vec3::Y * local.y.signum(), gap.y)
        } else {
            (Vec3::Z * local.z.signum(), gap.z)
        };

        if best.is_none_or(|c| depth > c.depth) {
            best = Some(CollisionContact {
                normal: b.rotation * axis,
                depth,
                point: corner,
                source: None,
            });
        }
    }

    best
}

/// Deepest corner of the box behind a plane (negative side)
pub fn box_behind_plane(b: &OrientedBox, plane: &Plane) -> Option<CollisionContact> {
    let mut deepest: Option<(f32, Vec3)> = None;
    for corner in b.corners() {
        let d = plane.signed_distance(corner);
        if d < 0.0 && deepest.is_none_or(|(best, _)| d < best) {
            deepest = Some((d, corner));
        }
    }

    deepest.map(|(d, corner)| CollisionContact {
        normal: plane.normal,
        depth: -d,
        point: plane.project(corner),
        source: None,
    })
}

/// A swept sphere between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    pub a: Vec3,
    pub b: Vec3,
    pub radius: f32,
}

impl Capsule {
    /// Capsule standing on `feet` along `up`, `height` from bottom to top
    pub fn upright(feet: Vec3, up: Vec3, radius: f32, height: f32) -> Self {
        let a = feet + up * radius;
        let b = feet + up * (height - radius).max(radius);
        Self { a, b, radius }
    }
}

/// Sphere vs capsule overlap
///
/// The contact normal points from the sphere toward the capsule axis, so it
/// pushes the capsule out of the sphere.
pub fn sphere_capsule(center: Vec3, radius: f32, capsule: &Capsule) -> Option<CollisionContact> {
    let closest = closest_point_on_segment(center, capsule.a, capsule.b);
    let delta = closest - center;
    let dist_sq = delta.length_squared();
    let reach = radius + capsule.radius;

    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > EPSILON {
        delta / dist
    } else {
        // Sphere center on the axis - push sideways off the axis direction
        (capsule.b - capsule.a).normalize_or(Vec3::Y).any_orthonormal_vector()
    };

    Some(CollisionContact {
        normal,
        depth: reach - dist,
        point: center + normal * radius,
        source: None,
    })
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Bounce response: reflect and scale by restitution
///
/// Only velocity heading into the surface is reflected; a rider already moving
/// away keeps its velocity.
pub fn bounce(velocity: Vec3, normal: Vec3, restitution: f32) -> Vec3 {
    if velocity.dot(normal) >= 0.0 {
        return velocity;
    }
    reflect_velocity(velocity, normal) * restitution
}

/// Spin from an impact
///
/// Angle between incoming and outgoing velocity, scaled by speed and `factor`.
/// The axis is perpendicular to both the incoming direction and the normal; a
/// dead-on hit has no such axis and spins about `fallback_axis`.
pub fn impact_spin(incoming: Vec3, outgoing: Vec3, normal: Vec3, fallback_axis: Vec3, factor: f32) -> Quat {
    let speed = incoming.length();
    if speed < EPSILON || outgoing.length_squared() < EPSILON {
        return Quat::IDENTITY;
    }

    let deflection = incoming.angle_between(outgoing);
    let axis = incoming.cross(normal);
    let axis = if axis.length_squared() > EPSILON {
        axis.normalize()
    } else {
        fallback_axis.normalize_or(Vec3::Y)
    };

    Quat::from_axis_angle(axis, deflection * speed * factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_box_corners_and_projection() {
        let b = OrientedBox::new(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let corners = b.corners();
        assert_eq!(corners.len(), 8);
        for corner in corners {
            assert!(((corner - b.center).length() - Vec3::new(1.0, 2.0, 3.0).length()).abs() < 1e-4);
            let local = b.to_local(corner);
            assert!(b.to_world(local).distance(corner) < 1e-4);
        }
    }

    #[test]
    fn test_box_corner_in_box() {
        let a = OrientedBox::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = OrientedBox::new(Vec3::new(1.8, 0.0, 0.0), Quat::IDENTITY, Vec3::new(1.0, 2.0, 2.0));
        let contact = box_corner_in_box(&a, &b).expect("a's +x corners are inside b");
        assert!((contact.depth - 0.2).abs() < 1e-5);
        assert!(contact.normal.distance(Vec3::NEG_X) < 1e-5);

        let far = OrientedBox::new(Vec3::new(5.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        assert!(box_corner_in_box(&a, &far).is_none());
    }

    #[test]
    fn test_box_behind_plane() {
        let plane = Plane::from_point_normal(Vec3::new(-2.0, 0.0, 0.0), Vec3::X);
        let inside = OrientedBox::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        assert!(box_behind_plane(&inside, &plane).is_none());

        let crossing = OrientedBox::new(Vec3::new(-1.5, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);
        let contact = box_behind_plane(&crossing, &plane).expect("left corners cross");
        assert!((contact.depth - 0.5).abs() < 1e-5);
        assert_eq!(contact.normal, Vec3::X);
        assert!(plane.signed_distance(contact.point).abs() < 1e-5);
    }

    #[test]
    fn test_sphere_capsule() {
        let capsule = Capsule::upright(Vec3::ZERO, Vec3::Y, 1.0, 4.0);
        assert_eq!(capsule.a, Vec3::Y);
        assert_eq!(capsule.b, Vec3::new(0.0, 3.0, 0.0));

        let contact = sphere_capsule(Vec3::new(2.0, 2.0, 0.0), 1.5, &capsule).expect("overlap");
        assert!((contact.depth - 0.5).abs() < 1e-5);
        assert!(contact.normal.distance(Vec3::NEG_X) < 1e-5);

        assert!(sphere_capsule(Vec3::new(3.0, 2.0, 0.0), 1.5, &capsule).is_none());
        // Beyond the top cap
        assert!(sphere_capsule(Vec3::new(0.0, 6.0, 0.0), 1.5, &capsule).is_none());
    }

    #[test]
    fn test_sphere_on_capsule_axis() {
        let capsule = Capsule::upright(Vec3::ZERO, Vec3::Y, 1.0, 4.0);
        let contact = sphere_capsule(Vec3::new(0.0, 2.0, 0.0), 0.5, &capsule).expect("overlap");
        assert!((contact.normal.length() - 1.0).abs() < 1e-5);
        assert!(contact.normal.dot(Vec3::Y).abs() < 1e-5);
        assert!((contact.depth - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec3::new(5.0, 0.0, 1.0), Vec3::NEG_X);
        assert!(reflected.distance(Vec3::new(-5.0, 0.0, 1.0)) < 1e-5);
    }

    #[test]
    fn test_bounce_ignores_separating_velocity() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        assert_eq!(bounce(v, Vec3::X, 0.5), v);
    }

    #[test]
    fn test_impact_spin_grows_with_speed() {
        let n = Vec3::X;
        let slow_in = Vec3::new(-1.0, 0.0, 1.0);
        let fast_in = slow_in * 3.0;
        let slow = impact_spin(slow_in, bounce(slow_in, n, 0.6), n, Vec3::Y, 0.1);
        let fast = impact_spin(fast_in, bounce(fast_in, n, 0.6), n, Vec3::Y, 0.1);
        assert!(fast.to_axis_angle().1 > slow.to_axis_angle().1);
        assert_eq!(impact_spin(Vec3::ZERO, Vec3::ZERO, n, Vec3::Y, 0.1), Quat::IDENTITY);
    }

    proptest! {
        #[test]
        fn prop_bounce_never_gains_energy(
            vx in -50.0f32..50.0,
            vy in -50.0f32..50.0,
            vz in -50.0f32..50.0,
            nx in -1.0f32..1.0,
            ny in -1.0f32..1.0,
            nz in -1.0f32..1.0,
            restitution in 0.0f32..=1.0,
        ) {
            let n = Vec3::new(nx, ny, nz);
            prop_assume!(n.length() > 0.1);
            let n = n.normalize();
            let v = Vec3::new(vx, vy, vz);
            prop_assume!(v.dot(n) < 0.0);

            let out = bounce(v, n, restitution);
            prop_assert!(out.length() <= v.length() * restitution + 1e-3);
            prop_assert!(out.dot(n) >= -1e-4);
        }
    }
}
