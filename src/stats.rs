//! Run statistics
//!
//! A `Hud` sink that keeps score and speed numbers instead of drawing them.

use serde::{Deserialize, Serialize};

use crate::scene::Hud;

/// Totals for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Balloons popped
    pub balloons: u32,
    /// Highest speed seen (units per tick)
    pub top_speed: f32,
    /// Speed reported by the most recent tick
    pub last_speed: f32,
    /// Ticks reported so far
    pub ticks: u64,
    /// Path length covered, summed from per-tick speeds
    pub distance: f32,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean speed over the run
    pub fn average_speed(&self) -> f32 {
        if self.ticks == 0 {
            0.0
        } else {
            self.distance / self.ticks as f32
        }
    }

    /// Compact one-line JSON summary
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Hud for RunStats {
    fn add_balloons(&mut self, count: u32) {
        self.balloons += count;
    }

    fn set_speed(&mut self, speed: f32) {
        self.last_speed = speed;
        self.top_speed = self.top_speed.max(speed);
        self.distance += speed;
        self.ticks += 1;
    }
}
