//! Fixed timestep rider tick
//!
//! One call advances the rider by one step against the live slope. The steps
//! run in a fixed order and each one reads what the previous one wrote.

use glam::Vec3;

use super::collision::{ContactSource, bounce, impact_spin};
use super::rider::{MotionState, Rider};
use super::slope::{SegmentAdvance, Slope};
use crate::audio::{AudioSink, SoundCue, impact_volume, slide_volume};
use crate::scene::{Hud, RiderInput, SceneRegistry};

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    /// State before and after, when it changed
    pub transition: Option<(MotionState, MotionState)>,
    /// Edge or tree struck this tick
    pub contact: Option<ContactSource>,
    /// Balloons popped this tick
    pub balloons: u32,
    /// Outcome of a forward segment crossing
    pub advance: Option<SegmentAdvance>,
}

/// Advance the rider by one fixed timestep
pub fn tick<S: SceneRegistry>(
    rider: &mut Rider,
    slope: &mut Slope<S>,
    input: &RiderInput,
    hud: &mut impl Hud,
    audio: &mut impl AudioSink,
) -> TickReport {
    let mut report = TickReport::default();
    let state_before = rider.state;

    // 1. Surface snap against last tick's triangle
    let up = slope.segment_up(rider.segment_index);
    rider.snap_to_surface(up);

    // 2. Surface data
    let triangle = slope.surrounding_triangle(rider.position, rider.segment_index);
    rider.refresh_surface(triangle, up);

    // 3. Segment index
    report.advance = update_segment_index(rider, slope);
    assert!(
        rider.segment_index + 1 < slope.len(),
        "rider segment position {} leaves no lookahead in window of {}",
        rider.segment_index,
        slope.len()
    );

    // 4. Local up
    rider.local_up = rider.rotation * Vec3::Y;

    // 5. Steering and braking
    rider.friction = if input.brake {
        rider.config.brake_friction
    } else {
        rider.config.friction
    };
    rider.steer(input.steer_axis() * rider.config.steer_rate);

    // 6. State-specific integration
    integrate(rider, input, audio);

    // 7. Gravity
    rider.velocity.y -= rider.config.fall_speed;

    // 8. Collisions
    resolve_collisions(rider, slope, hud, audio, &mut report);

    // 9. Orientation and position
    rider.apply_rotation();
    rider.position += rider.velocity;

    let speed = rider.speed();
    hud.set_speed(speed);
    audio.set_loop(
        SoundCue::Slide,
        slide_volume(speed, rider.config.loud_speed, rider.is_grounded()),
    );

    if rider.state != state_before {
        log::trace!("Rider {:?} -> {:?}", state_before, rider.state);
        report.transition = Some((state_before, rider.state));
    }
    report
}

/// Move the held window position across a segment boundary
///
/// Uses the position the rider will have after this tick's velocity. An
/// accepted advance slides the window, so the held position stays the same
/// number while now naming the next segment.
fn update_segment_index<S: SceneRegistry>(rider: &mut Rider, slope: &mut Slope<S>) -> Option<SegmentAdvance> {
    let projected = rider.position + rider.velocity;
    let index = rider.segment_index;

    if index + 1 < slope.len() && slope.start_plane(index + 1).signed_distance(projected) >= 0.0 {
        let outcome = slope.notify_of_segment_advance(index + 1);
        if outcome == SegmentAdvance::Rejected {
            rider.segment_index = index + 1;
        }
        log::trace!(
            "Rider crossed into segment {} ({outcome:?})",
            slope.segment(rider.segment_index).index
        );
        return Some(outcome);
    }

    if index > 0 && slope.start_plane(index).signed_distance(projected) < 0.0 {
        rider.segment_index = index - 1;
        log::trace!("Rider backed into segment {}", slope.segment(index - 1).index);
    }
    None
}

fn integrate(rider: &mut Rider, input: &RiderInput, audio: &mut impl AudioSink) {
    let config = rider.config.clone();

    match rider.state {
        MotionState::Ground => {
            let Some(surface) = rider.surface else {
                return;
            };
            if input.jump {
                rider.launch();
                rider.state = MotionState::Jump;
                audio.play(SoundCue::Jump, 1.0);
                return;
            }
            if surface.distance_sq > config.leave_ground_distance_sq {
                rider.state = MotionState::Air;
                rider.align_toward(Vec3::Y, config.air_align_divisor);
                return;
            }
            rider.align_toward(surface.normal, config.ground_align_divisor);
            rider.clamp_to_plane(surface.normal);
            rider.apply_friction();
        }
        MotionState::Jump | MotionState::Air => {
            if rider.state == MotionState::Jump && rider.velocity.dot(rider.local_up) <= 0.0 {
                rider.state = MotionState::Air;
            }
            let landed = rider.state == MotionState::Air
                && rider
                    .surface
                    .is_some_and(|s| s.distance_sq <= config.capsule_radius * config.capsule_radius);
            if landed {
                rider.state = MotionState::Ground;
                audio.play(SoundCue::Land, impact_volume(rider.speed(), config.loud_speed));
            }
            rider.align_toward(Vec3::Y, config.air_align_divisor);
        }
    }
}

fn resolve_collisions<S: SceneRegistry>(
    rider: &mut Rider,
    slope: &mut Slope<S>,
    hud: &mut impl Hud,
    audio: &mut impl AudioSink,
    report: &mut TickReport,
) {
    let index = rider.segment_index;
    let capsule = rider.capsule();

    let popped = slope.capsule_collides_with_balloons(&capsule, index);
    for _ in 0..popped {
        hud.add_balloons(1);
        audio.play(SoundCue::BalloonPop, 1.0);
    }
    report.balloons = popped;

    // Edge hits win over trees
    let contact = slope
        .box_is_beyond_edge(&rider.body_box(), index)
        .or_else(|| slope.capsule_collides_with_obstacle(&capsule, index));
    let Some(contact) = contact else {
        return;
    };

    let incoming = rider.velocity;
    rider.velocity = bounce(incoming, contact.normal, rider.config.restitution);
    rider.position += contact.normal * contact.depth;
    report.contact = contact.source;

    if incoming.dot(contact.normal) < 0.0 {
        rider.add_spin(impact_spin(
            incoming,
            rider.velocity,
            contact.normal,
            rider.local_up,
            rider.config.impact_spin,
        ));
        let cue = match contact.source {
            Some(ContactSource::Obstacle(_)) => SoundCue::TreeHit,
            _ => SoundCue::EdgeHit,
        };
        audio.play(cue, impact_volume(incoming.length(), rider.config.loud_speed));
        log::debug!("Rider hit {:?} at {:.2} units/tick", contact.source, incoming.length());
    }
}
