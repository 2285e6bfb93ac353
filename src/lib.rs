//! Slope Rider - streaming downhill terrain and rider physics
//!
//! Core modules:
//! - `sim`: Segment streaming, collision queries and the per-tick rider pipeline
//! - `scene`: Boundary traits for geometry, objects, HUD and input collaborators
//! - `audio`: Sound cue boundary and volume shaping
//! - `settings`: Data-driven tuning loaded from JSON
//! - `stats`: Run statistics (a HUD sink usable headless)

pub mod audio;
pub mod scene;
pub mod settings;
pub mod sim;
pub mod stats;

pub use settings::{RiderConfig, Settings, SettingsError, SlopeConfig};
pub use stats::RunStats;

/// Game configuration constants
///
/// Velocities are in world units per tick; the simulation has no `dt`.
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Segments kept ahead of the rider
    pub const FORWARD_BUFFER: usize = 30;
    /// Segments kept behind the rider
    pub const BACK_BUFFER: usize = 15;

    /// Length of one segment along its local forward axis
    pub const SEGMENT_LENGTH: f32 = 10.0;
    /// Half the track width
    pub const TRACK_HALF_WIDTH: f32 = 20.0;
    /// Height of the raised lip at the track edges
    pub const BANK_HEIGHT: f32 = 3.0;
    /// Vertices across one edge loop
    pub const EDGE_LOOP_RESOLUTION: usize = 9;
    /// World units covered by one repeat of the floor texture
    pub const TEXTURE_REPEAT_LENGTH: f32 = 40.0;

    /// Resting downhill pitch (radians, positive tilts forward downward)
    pub const BASE_PITCH: f32 = 0.22;
    /// Pitch forced onto a cliff segment
    pub const CLIFF_PITCH: f32 = 0.9;

    /// Tree collider radius
    pub const TREE_RADIUS: f32 = 1.5;
    /// Balloon collider radius
    pub const BALLOON_RADIUS: f32 = 1.2;
    /// Balloon float height above the floor
    pub const BALLOON_HEIGHT: f32 = 2.5;

    /// Rider capsule radius
    pub const CAPSULE_RADIUS: f32 = 1.0;
    /// Rider capsule height (feet to head)
    pub const CAPSULE_HEIGHT: f32 = 3.2;
    /// Per-tick fall speed added to vertical velocity
    pub const FALL_SPEED: f32 = 0.02;
    /// Bounce energy retained after an edge or tree hit
    pub const RESTITUTION: f32 = 0.6;
    /// Steering rate (radians per tick)
    pub const STEER_RATE: f32 = 0.045;
    /// Jump impulse magnitude (units per tick)
    pub const JUMP_IMPULSE: f32 = 0.6;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}
