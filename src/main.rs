//! Slope Rider headless driver
//!
//! Runs the simulation on a fixed timestep with scripted controls and logs
//! progress. `RUST_LOG=debug` shows segment streaming, `trace` shows every
//! state transition.
//!
//! Usage: `slope-rider [settings.json]`

use slope_rider::audio::{AudioMixer, NullAudio};
use slope_rider::consts::{MAX_SUBSTEPS, SIM_DT};
use slope_rider::scene::{InputSource, RecordingScene, RiderInput};
use slope_rider::sim::{Rider, SegmentAdvance, Slope, tick};
use slope_rider::{RunStats, Settings};

/// Simulated run length
const RUN_SECONDS: f32 = 120.0;
/// Simulated frame time; deliberately off the tick rate so the accumulator works
const FRAME_DT: f32 = 1.0 / 45.0;

/// Weaves left and right and hops now and then
struct ScriptedInput {
    tick: u64,
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> RiderInput {
        let phase = self.tick % 240;
        self.tick += 1;
        RiderInput {
            steer_left: phase < 50,
            steer_right: (120..170).contains(&phase),
            brake: false,
            jump: self.tick % 600 == 300,
        }
    }
}

fn load_settings() -> Settings {
    let Some(path) = std::env::args().nth(1) else {
        log::info!("No settings file given, using defaults");
        return Settings::default();
    };

    match Settings::load_from(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Failed to load settings from {path}: {e}, using defaults");
            Settings::default()
        }
    }
}

fn main() {
    env_logger::init();
    log::info!("Slope Rider (headless) starting...");

    let settings = load_settings();
    let mut slope = Slope::new(settings.slope.clone(), settings.seed, RecordingScene::default());
    let mut rider = Rider::spawn(&slope, settings.rider.clone());
    let mut input = ScriptedInput { tick: 0 };
    let mut stats = RunStats::new();
    let mut audio = AudioMixer::new(NullAudio);

    let frames = (RUN_SECONDS / FRAME_DT) as u32;
    let ticks_per_log = (1.0 / SIM_DT).round() as u64;
    let mut accumulator = 0.0;
    let mut advanced = 0u64;

    for _ in 0..frames {
        accumulator += FRAME_DT;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let controls = input.poll();
            let report = tick(&mut rider, &mut slope, &controls, &mut stats, &mut audio);
            if report.advance == Some(SegmentAdvance::Accepted) {
                advanced += 1;
            }
            accumulator -= SIM_DT;
            substeps += 1;

            if stats.ticks % ticks_per_log == 0 {
                log::info!(
                    "t={:>5.1}s segment {:>5} speed {:>5.2} balloons {:>3} {:?}",
                    stats.ticks as f32 * SIM_DT,
                    slope.segment(rider.segment_index).index,
                    rider.speed(),
                    stats.balloons,
                    rider.state
                );
            }
        }
    }

    log::info!(
        "Run finished: {:.0} units, top speed {:.2}, {} balloons, {} window advances, {} trees live",
        stats.distance,
        stats.top_speed,
        stats.balloons,
        advanced,
        slope.live_obstacles()
    );
    match stats.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize run stats: {e}"),
    }
}
