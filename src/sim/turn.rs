//! Random turn state machine driving segment curvature
//!
//! The mode only changes after a minimum run of segments, and then only on a
//! per-segment roll, so bends have a chance to develop before the next one.

use glam::Quat;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::normalize_angle;
use crate::settings::SlopeConfig;

/// How hard the slope is currently bending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnMode {
    None,
    Gradual,
    Sharp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Yaw sign (positive yaw swings forward toward +X, the right edge)
    pub fn sign(self) -> f32 {
        match self {
            TurnDirection::Left => -1.0,
            TurnDirection::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }
}

/// Orientation rolled for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentTurn {
    /// Absolute orientation of the segment's end frame
    pub rotation: Quat,
    pub heading: f32,
    pub pitch: f32,
    pub cliff: bool,
}

/// Persistent turn state carried across segments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub mode: TurnMode,
    pub direction: TurnDirection,
    segments_since_switch: u32,
    /// World yaw of the frontier (radians)
    heading: f32,
    /// Yaw added per segment
    yaw_rate: f32,
    /// Pitch without cliff overrides
    pitch: f32,
}

/// Share of the gap to the target yaw rate closed per segment
const YAW_RESPONSE: f32 = 0.35;
/// Straight-stretch decay of leftover yaw rate
const YAW_DECAY: f32 = 0.7;
/// Share of the gap to the target pitch closed per segment
const PITCH_RESPONSE: f32 = 0.3;

impl TurnState {
    pub fn new(config: &SlopeConfig) -> Self {
        Self {
            mode: TurnMode::None,
            direction: TurnDirection::Right,
            segments_since_switch: 0,
            heading: 0.0,
            yaw_rate: 0.0,
            pitch: config.base_pitch,
        }
    }

    /// Orientation of the frontier before any segment is rolled
    pub fn initial_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.heading) * Quat::from_rotation_x(self.pitch)
    }

    pub fn yaw_rate(&self) -> f32 {
        self.yaw_rate
    }

    /// Roll the orientation of the next segment's end frame
    pub fn advance(&mut self, rng: &mut impl Rng, config: &SlopeConfig) -> SegmentTurn {
        self.segments_since_switch += 1;
        if self.segments_since_switch >= config.turn_switch_min_segments
            && rng.random::<f32>() < config.turn_switch_chance
        {
            self.reroll(rng, config);
        }

        let pitch_target = match self.mode {
            TurnMode::None => {
                let wobble = if config.wobble > 0.0 {
                    rng.random_range(-config.wobble..=config.wobble)
                } else {
                    0.0
                };
                self.yaw_rate = self.yaw_rate * YAW_DECAY + wobble * (1.0 - YAW_DECAY);
                config.base_pitch
            }
            TurnMode::Gradual | TurnMode::Sharp => {
                let max_yaw = if self.mode == TurnMode::Sharp {
                    config.sharp_yaw
                } else {
                    config.gradual_yaw
                };
                let target = self.direction.sign() * max_yaw;
                self.yaw_rate += (target - self.yaw_rate) * YAW_RESPONSE;

                let sharpness = if config.sharp_yaw > 0.0 {
                    (self.yaw_rate.abs() / config.sharp_yaw).min(1.0)
                } else {
                    0.0
                };
                config.base_pitch + config.turn_pitch_bias * sharpness
            }
        };

        self.pitch += (pitch_target - self.pitch) * PITCH_RESPONSE;
        self.heading = normalize_angle(self.heading + self.yaw_rate);

        let cliff = rng.random::<f32>() < config.cliff_chance;
        let pitch = if cliff { config.cliff_pitch } else { self.pitch };

        SegmentTurn {
            rotation: Quat::from_rotation_y(self.heading) * Quat::from_rotation_x(pitch),
            heading: self.heading,
            pitch,
            cliff,
        }
    }

    fn reroll(&mut self, rng: &mut impl Rng, config: &SlopeConfig) {
        let [none, gradual, sharp] = config.turn_weights;
        let total = none + gradual + sharp;
        let roll = rng.random::<f32>() * total;

        self.mode = if roll < none {
            TurnMode::None
        } else if roll < none + gradual {
            TurnMode::Gradual
        } else {
            TurnMode::Sharp
        };
        if rng.random::<f32>() < 0.5 {
            self.direction = self.direction.flipped();
        }
        self.segments_since_switch = 0;

        log::debug!("Turn mode -> {:?} {:?}", self.mode, self.direction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_straight_config_never_turns() {
        let config = SlopeConfig::straight(0.2);
        let mut rng = Pcg32::seed_from_u64(1);
        let mut turn = TurnState::new(&config);
        for _ in 0..200 {
            let seg = turn.advance(&mut rng, &config);
            assert_eq!(seg.heading, 0.0);
            assert!((seg.pitch - 0.2).abs() < 1e-6);
            assert!(!seg.cliff);
        }
        assert_eq!(turn.mode, TurnMode::None);
    }

    #[test]
    fn test_no_reroll_before_minimum_run() {
        let config = SlopeConfig {
            turn_switch_min_segments: 10,
            turn_switch_chance: 1.0,
            turn_weights: [0.0, 0.0, 1.0],
            ..SlopeConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(2);
        let mut turn = TurnState::new(&config);
        for _ in 0..9 {
            turn.advance(&mut rng, &config);
            assert_eq!(turn.mode, TurnMode::None);
        }
        turn.advance(&mut rng, &config);
        assert_eq!(turn.mode, TurnMode::Sharp);
    }

    #[test]
    fn test_sharp_turn_bends_heading() {
        let config = SlopeConfig {
            turn_switch_min_segments: 1,
            turn_switch_chance: 1.0,
            turn_weights: [0.0, 0.0, 1.0],
            cliff_chance: 0.0,
            ..SlopeConfig::default()
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let mut turn = TurnState::new(&config);
        turn.advance(&mut rng, &config);
        // Pin direction so we can check the sign
        turn.direction = TurnDirection::Left;
        let config = SlopeConfig {
            turn_switch_chance: 0.0,
            ..config
        };
        let start = turn.heading;
        for _ in 0..10 {
            turn.advance(&mut rng, &config);
        }
        assert!(turn.heading < start);
        assert!(turn.yaw_rate() < 0.0);
        assert!(turn.yaw_rate().abs() <= config.sharp_yaw + 1e-6);
    }

    #[test]
    fn test_cliff_overrides_pitch_once() {
        let config = SlopeConfig {
            cliff_chance: 1.0,
            ..SlopeConfig::straight(0.2)
        };
        let mut rng = Pcg32::seed_from_u64(4);
        let mut turn = TurnState::new(&config);
        let seg = turn.advance(&mut rng, &config);
        assert!(seg.cliff);
        assert_eq!(seg.pitch, config.cliff_pitch);

        let calm = SlopeConfig::straight(0.2);
        let seg = turn.advance(&mut rng, &calm);
        assert!(!seg.cliff);
        assert!((seg.pitch - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_same_seed_same_turns() {
        let config = SlopeConfig::default();
        let mut a = (Pcg32::seed_from_u64(9), TurnState::new(&config));
        let mut b = (Pcg32::seed_from_u64(9), TurnState::new(&config));
        for _ in 0..100 {
            let sa = a.1.advance(&mut a.0, &config);
            let sb = b.1.advance(&mut b.0, &config);
            assert_eq!(sa, sb);
        }
    }
}
