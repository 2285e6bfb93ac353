//! Rider body, motion state and the per-step helpers the tick pipeline uses

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::collision::{Capsule, OrientedBox};
use super::geometry::{Plane, partial_rotation_arc};
use super::slope::Slope;
use crate::scene::SceneRegistry;
use crate::settings::RiderConfig;

/// Motion state machine
///
/// Ground is the only state with friction and plane clamping. Jump and Air
/// differ only in how they are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Ground,
    Jump,
    Air,
}

/// Floor data under the rider, refreshed every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceContact {
    /// Point on the floor straight below the rider (along the segment down axis)
    pub point: Vec3,
    /// Floor normal, oriented with the segment up axis
    pub normal: Vec3,
    pub distance_sq: f32,
}

#[derive(Debug, Clone)]
pub struct Rider {
    /// Feet position, world space
    pub position: Vec3,
    pub rotation: Quat,
    /// Rotation accumulated during the current tick, applied at its end
    pub angular_velocity: Quat,
    /// World units per tick
    pub velocity: Vec3,
    /// Velocity in the rider frame as of the last friction pass
    pub local_velocity: Vec3,
    pub local_up: Vec3,
    /// Window position of the segment the rider is in
    pub segment_index: usize,
    pub state: MotionState,
    /// Per-axis friction in use this tick (rider frame)
    pub friction: Vec3,
    /// Last floor triangle found; kept when a lookup misses
    pub last_triangle: Option<[Vec3; 3]>,
    pub surface: Option<SurfaceContact>,
    pub config: RiderConfig,
}

impl Rider {
    /// Rider at rest on the oldest segment of the slope
    pub fn spawn<S: SceneRegistry>(slope: &Slope<S>, config: RiderConfig) -> Self {
        let (position, rotation) = slope.spawn_point();
        log::info!("Rider spawned at {position}");
        Self {
            position,
            rotation,
            angular_velocity: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            local_velocity: Vec3::ZERO,
            local_up: rotation * Vec3::Y,
            segment_index: 0,
            state: MotionState::Ground,
            friction: config.friction,
            last_triangle: None,
            surface: None,
            config,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn is_grounded(&self) -> bool {
        self.state == MotionState::Ground
    }

    /// Body capsule standing on the rider's feet
    pub fn capsule(&self) -> Capsule {
        Capsule::upright(
            self.position,
            self.local_up,
            self.config.capsule_radius,
            self.config.capsule_height,
        )
    }

    /// Body box used against the track edges, resting on the feet
    pub fn body_box(&self) -> OrientedBox {
        let half = self.config.box_half_extents;
        OrientedBox::new(self.position + self.local_up * half.y, self.rotation, half)
    }

    /// Lift the rider back onto the last known floor triangle if it sank below
    ///
    /// Moves along `up` (the segment up axis). Returns whether it moved.
    pub fn snap_to_surface(&mut self, up: Vec3) -> bool {
        let Some(plane) = self.last_triangle.and_then(|tri| Plane::from_triangle(&tri, up)) else {
            return false;
        };
        if plane.signed_distance(self.position) >= 0.0 {
            return false;
        }
        match plane.intersect_line(self.position, up) {
            Some(hit) => {
                self.position = hit;
                true
            }
            None => false,
        }
    }

    /// Update the floor triangle and the surface data derived from it
    ///
    /// A miss keeps the previous triangle. Nothing is known until a first
    /// triangle has been found.
    pub fn refresh_surface(&mut self, triangle: Option<[Vec3; 3]>, up: Vec3) {
        if triangle.is_some() {
            self.last_triangle = triangle;
        }
        let Some(plane) = self.last_triangle.and_then(|tri| Plane::from_triangle(&tri, up)) else {
            self.surface = None;
            return;
        };
        let point = plane
            .intersect_line(self.position, -up)
            .unwrap_or_else(|| plane.project(self.position));
        self.surface = Some(SurfaceContact {
            point,
            normal: plane.normal,
            distance_sq: self.position.distance_squared(point),
        });
    }

    /// Yaw about the local up axis
    pub fn steer(&mut self, angle: f32) {
        if angle != 0.0 {
            self.angular_velocity = Quat::from_axis_angle(self.local_up, angle) * self.angular_velocity;
        }
    }

    /// Queue a damped rotation of local up toward `target`
    pub fn align_toward(&mut self, target: Vec3, divisor: f32) {
        let target = target.normalize_or_zero();
        if target == Vec3::ZERO || divisor <= 0.0 {
            return;
        }
        let arc = partial_rotation_arc(self.local_up, target, 1.0 / divisor);
        self.angular_velocity = arc * self.angular_velocity;
    }

    /// Remove the velocity component heading into the floor
    pub fn clamp_to_plane(&mut self, normal: Vec3) {
        let into = self.velocity.dot(normal);
        if into < 0.0 {
            self.velocity -= normal * into;
        }
    }

    /// Linear per-axis drag in the rider frame
    pub fn apply_friction(&mut self) {
        let local = self.rotation.inverse() * self.velocity;
        self.local_velocity = apply_friction(local, self.friction);
        self.velocity = self.rotation * self.local_velocity;
    }

    /// Kick off a jump along a blend of forward and local up
    pub fn launch(&mut self) {
        let blend = self.config.jump_forward_blend.clamp(0.0, 1.0);
        let dir = (self.forward() * blend + self.local_up * (1.0 - blend)).normalize_or(self.local_up);
        self.velocity += dir * self.config.jump_impulse;
    }

    /// Add impact spin to this tick's pending rotation
    pub fn add_spin(&mut self, spin: Quat) {
        self.angular_velocity = (spin * self.angular_velocity).normalize();
    }

    /// Fold this tick's rotation into the orientation
    pub fn apply_rotation(&mut self) {
        self.rotation = (self.angular_velocity * self.rotation).normalize();
        self.angular_velocity = Quat::IDENTITY;
        self.local_up = self.rotation * Vec3::Y;
    }
}

/// Decay each component toward zero by the matching friction amount
///
/// A component no larger than its friction stops dead; friction never
/// flips the sign of a component.
pub fn apply_friction(velocity: Vec3, friction: Vec3) -> Vec3 {
    fn axis(v: f32, f: f32) -> f32 {
        let f = f.abs();
        if v.abs() <= f { 0.0 } else { v - f * v.signum() }
    }
    Vec3::new(
        axis(velocity.x, friction.x),
        axis(velocity.y, friction.y),
        axis(velocity.z, friction.z),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SlopeConfig;
    use proptest::prelude::*;

    fn flat() -> (Slope, Rider) {
        let slope = Slope::headless(SlopeConfig::straight(0.0), 1);
        let rider = Rider::spawn(&slope, RiderConfig::default());
        (slope, rider)
    }

    #[test]
    fn test_spawn_on_floor() {
        let (slope, rider) = flat();
        assert_eq!(rider.state, MotionState::Ground);
        assert_eq!(rider.segment_index, 0);
        assert!(rider.local_up.distance(Vec3::Y) < 1e-5);
        assert!(slope.surrounding_triangle(rider.position, 0).is_some());
        assert!(rider.surface.is_none());
    }

    #[test]
    fn test_friction_is_linear_and_stops() {
        let v = apply_friction(Vec3::new(1.0, -0.5, 0.01), Vec3::new(0.1, 0.1, 0.05));
        assert!((v.x - 0.9).abs() < 1e-6);
        assert!((v.y + 0.4).abs() < 1e-6);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_snap_lifts_and_is_idempotent() {
        let (slope, mut rider) = flat();
        let up = slope.segment(0).up();
        rider.refresh_surface(slope.surrounding_triangle(rider.position, 0), up);
        rider.position -= Vec3::Y * 0.7;

        assert!(rider.snap_to_surface(up));
        let once = rider.position;
        rider.snap_to_surface(up);
        assert!(rider.position.distance(once) < 1e-5);
        assert!(once.y.abs() < 1e-4);

        // Above the floor nothing happens
        rider.position += Vec3::Y;
        assert!(!rider.snap_to_surface(up));
    }

    #[test]
    fn test_surface_kept_on_miss() {
        let (slope, mut rider) = flat();
        let up = slope.segment(0).up();
        rider.refresh_surface(None, up);
        assert!(rider.surface.is_none());

        rider.refresh_surface(slope.surrounding_triangle(rider.position, 0), up);
        rider.position += Vec3::Y * 2.0;
        rider.refresh_surface(None, up);
        let surface = rider.surface.expect("previous triangle is kept");
        assert!((surface.distance_sq - 4.0).abs() < 1e-3);
        assert!(surface.normal.dot(Vec3::Y) > 0.99);
    }

    #[test]
    fn test_alignment_is_damped() {
        let (_, mut rider) = flat();
        let target = Vec3::new(1.0, 1.0, 0.0).normalize();
        rider.align_toward(target, 4.0);
        rider.apply_rotation();

        let full = Vec3::Y.angle_between(target);
        let moved = Vec3::Y.angle_between(rider.local_up);
        assert!(moved > 0.0);
        assert!((moved - full / 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_steer_yaws_toward_right_edge() {
        let (_, mut rider) = flat();
        rider.steer(0.1);
        rider.apply_rotation();
        assert!(rider.forward().x > 0.0);
        assert!(rider.local_up.distance(Vec3::Y) < 1e-5);
    }

    #[test]
    fn test_impact_spin_applied_once() {
        let (_, mut rider) = flat();
        let start = rider.rotation;
        rider.add_spin(Quat::from_rotation_z(0.2));
        rider.apply_rotation();
        let after_hit = rider.rotation;
        assert!((after_hit.angle_between(start) - 0.2).abs() < 1e-4);

        // Nothing carries over into the next tick
        rider.apply_rotation();
        assert!(rider.rotation.angle_between(after_hit) < 1e-5);
    }

    #[test]
    fn test_clamp_only_removes_motion_into_floor() {
        let (_, mut rider) = flat();
        rider.velocity = Vec3::new(1.0, -2.0, 0.0);
        rider.clamp_to_plane(Vec3::Y);
        assert_eq!(rider.velocity, Vec3::new(1.0, 0.0, 0.0));

        rider.velocity = Vec3::new(0.0, 1.0, 0.0);
        rider.clamp_to_plane(Vec3::Y);
        assert_eq!(rider.velocity, Vec3::Y);
    }

    proptest! {
        #[test]
        fn prop_friction_never_flips_sign(
            vx in -10.0f32..10.0,
            vy in -10.0f32..10.0,
            vz in -10.0f32..10.0,
            fx in 0.0f32..1.0,
            fy in 0.0f32..1.0,
            fz in 0.0f32..1.0,
        ) {
            let before = Vec3::new(vx, vy, vz);
            let after = apply_friction(before, Vec3::new(fx, fy, fz));
            for (b, a) in before.to_array().into_iter().zip(after.to_array()) {
                prop_assert!(a == 0.0 || a.signum() == b.signum());
                prop_assert!(a.abs() <= b.abs());
            }
        }

        #[test]
        fn prop_snap_is_idempotent(lateral in -0.9f32..0.9, along in 0.05f32..0.95, depth in 0.0f32..3.0) {
            let slope = Slope::headless(SlopeConfig::default(), 3);
            let mut rider = Rider::spawn(&slope, RiderConfig::default());
            let segment = slope.segment(0);
            let up = segment.up();
            rider.position = segment.floor_point(lateral, along) - up * depth;
            rider.refresh_surface(slope.surrounding_triangle(rider.position, 0), up);

            rider.snap_to_surface(up);
            let once = rider.position;
            rider.snap_to_surface(up);
            prop_assert!(rider.position.distance(once) < 1e-4);
        }
    }
}
