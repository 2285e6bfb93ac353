//! Tuning settings for the slope generator and rider
//!
//! Loaded from a JSON file on native builds. Every field has a default, so a
//! partial file only overrides what it names.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Terrain generation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeConfig {
    /// Segments kept ahead of the rider
    pub forward_buffer: usize,
    /// Segments kept behind the rider (also the advance safety margin)
    pub back_buffer: usize,
    pub segment_length: f32,
    pub half_width: f32,
    pub bank_height: f32,
    /// Resting downhill pitch (radians)
    pub base_pitch: f32,

    // === Turning ===
    /// Minimum segments between turn-mode re-rolls
    pub turn_switch_min_segments: u32,
    /// Chance per segment of re-rolling once the minimum has elapsed
    pub turn_switch_chance: f32,
    /// Relative weights of None / Gradual / Sharp when re-rolling
    pub turn_weights: [f32; 3],
    /// Target yaw per segment for a gradual turn (radians)
    pub gradual_yaw: f32,
    /// Target yaw per segment for a sharp turn (radians)
    pub sharp_yaw: f32,
    /// Extra pitch while turning (radians, scaled by turn sharpness)
    pub turn_pitch_bias: f32,
    /// Amplitude of the random yaw wobble on straight stretches
    pub wobble: f32,

    // === Cliffs ===
    pub cliff_chance: f32,
    pub cliff_pitch: f32,

    // === Obstacles ===
    /// Chance a segment carries trees at all
    pub obstacle_chance: f32,
    /// Trees per populated segment (upper bound)
    pub max_obstacles_per_segment: usize,
    /// Leading segments that never carry trees
    pub safe_start_segments: u64,
    pub tree_radius: f32,

    // === Collectibles ===
    pub balloon_chance: f32,
    /// Balloons across the track width (upper bound per segment)
    pub max_balloons_across: usize,
    pub balloon_radius: f32,
    pub balloon_height: f32,
}

impl Default for SlopeConfig {
    fn default() -> Self {
        Self {
            forward_buffer: FORWARD_BUFFER,
            back_buffer: BACK_BUFFER,
            segment_length: SEGMENT_LENGTH,
            half_width: TRACK_HALF_WIDTH,
            bank_height: BANK_HEIGHT,
            base_pitch: BASE_PITCH,

            turn_switch_min_segments: 6,
            turn_switch_chance: 0.25,
            turn_weights: [0.5, 0.35, 0.15],
            gradual_yaw: 0.035,
            sharp_yaw: 0.09,
            turn_pitch_bias: 0.08,
            wobble: 0.01,

            cliff_chance: 0.02,
            cliff_pitch: CLIFF_PITCH,

            obstacle_chance: 0.45,
            max_obstacles_per_segment: 3,
            safe_start_segments: 20,
            tree_radius: TREE_RADIUS,

            balloon_chance: 0.2,
            max_balloons_across: 3,
            balloon_radius: BALLOON_RADIUS,
            balloon_height: BALLOON_HEIGHT,
        }
    }
}

impl SlopeConfig {
    /// Total live window length
    pub fn window_len(&self) -> usize {
        self.forward_buffer + self.back_buffer
    }

    /// A straight, empty track at constant pitch. Handy for tests and demos.
    pub fn straight(pitch: f32) -> Self {
        Self {
            base_pitch: pitch,
            turn_weights: [1.0, 0.0, 0.0],
            wobble: 0.0,
            cliff_chance: 0.0,
            obstacle_chance: 0.0,
            balloon_chance: 0.0,
            ..Self::default()
        }
    }
}

/// Rider physics tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderConfig {
    pub capsule_radius: f32,
    pub capsule_height: f32,
    /// Half extents of the edge-test box (lateral, vertical, forward)
    pub box_half_extents: Vec3,
    pub restitution: f32,
    pub fall_speed: f32,
    pub steer_rate: f32,
    pub jump_impulse: f32,
    /// Share of the jump impulse along local forward (rest goes along local up)
    pub jump_forward_blend: f32,
    /// Squared surface distance past which a grounded rider goes airborne
    pub leave_ground_distance_sq: f32,
    /// Per-tick linear drag on each local velocity axis
    pub friction: Vec3,
    /// Drag used while braking
    pub brake_friction: Vec3,
    /// Plane alignment divisor on the ground (higher = softer)
    pub ground_align_divisor: f32,
    /// World-up alignment divisor in the air
    pub air_align_divisor: f32,
    /// Spin added per radian of deflection per unit of speed
    pub impact_spin: f32,
    /// Speed that maps to full audio volume
    pub loud_speed: f32,
}

impl Default for RiderConfig {
    fn default() -> Self {
        Self {
            capsule_radius: CAPSULE_RADIUS,
            capsule_height: CAPSULE_HEIGHT,
            box_half_extents: Vec3::new(0.6, 1.6, 1.8),
            restitution: RESTITUTION,
            fall_speed: FALL_SPEED,
            steer_rate: STEER_RATE,
            jump_impulse: JUMP_IMPULSE,
            jump_forward_blend: 0.3,
            leave_ground_distance_sq: 1.5,
            friction: Vec3::new(0.05, 0.0, 0.002),
            brake_friction: Vec3::new(0.08, 0.0, 0.02),
            ground_align_divisor: 4.0,
            air_align_divisor: 24.0,
            impact_spin: 0.01,
            loud_speed: 2.0,
        }
    }
}

/// Complete tuning for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the terrain RNG stream
    pub seed: u64,
    pub slope: SlopeConfig,
    pub rider: RiderConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            slope: SlopeConfig::default(),
            rider: RiderConfig::default(),
        }
    }
}

impl Settings {
    /// Parse settings from a JSON string and validate them
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let slope = &self.slope;
        let rider = &self.rider;

        if slope.back_buffer == 0 {
            return Err(invalid("slope.back_buffer", "must be at least 1"));
        }
        if slope.forward_buffer < 2 {
            return Err(invalid("slope.forward_buffer", "must be at least 2"));
        }
        positive("slope.segment_length", slope.segment_length)?;
        positive("slope.half_width", slope.half_width)?;
        positive("rider.capsule_radius", rider.capsule_radius)?;
        if rider.capsule_height < 2.0 * rider.capsule_radius {
            return Err(invalid(
                "rider.capsule_height",
                "must be at least twice the capsule radius",
            ));
        }
        positive("rider.ground_align_divisor", rider.ground_align_divisor)?;
        positive("rider.air_align_divisor", rider.air_align_divisor)?;

        for (field, p) in [
            ("slope.turn_switch_chance", slope.turn_switch_chance),
            ("slope.cliff_chance", slope.cliff_chance),
            ("slope.obstacle_chance", slope.obstacle_chance),
            ("slope.balloon_chance", slope.balloon_chance),
            ("rider.restitution", rider.restitution),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(invalid(field, format!("{p} is not a probability")));
            }
        }
        if slope.turn_weights.iter().any(|w| *w < 0.0) || slope.turn_weights.iter().sum::<f32>() <= 0.0 {
            return Err(invalid("slope.turn_weights", "weights must be non-negative with a positive sum"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} must be positive")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Settings::default().validate().is_ok());
        assert_eq!(SlopeConfig::default().window_len(), 45);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "seed": 7, "slope": { "back_buffer": 5 } }"#)
            .expect("partial settings should parse");
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.slope.back_buffer, 5);
        assert_eq!(settings.slope.forward_buffer, FORWARD_BUFFER);
        assert_eq!(settings.rider.capsule_radius, CAPSULE_RADIUS);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Settings::from_json(r#"{ "slope": { "cliff_chance": 1.5 } }"#).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "slope.cliff_chance",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Settings::from_json("{ seed: ").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("slope_rider_settings_{}.json", std::process::id()));
        let mut settings = Settings::default();
        settings.seed = 4242;
        settings.save_to(&path).expect("save");
        let loaded = Settings::load_from(&path).expect("load");
        assert_eq!(loaded.seed, 4242);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("slope_rider_invalid_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "slope": { "segment_length": 0.0 } }"#).expect("write");
        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid {
                field: "slope.segment_length",
                ..
            }
        ));
        let _ = std::fs::remove_file(&path);
    }
}
