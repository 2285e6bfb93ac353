//! Streaming slope generator
//!
//! Owns the live window of segments. Window position 0 is always the oldest
//! live segment; when the window slides, every position held elsewhere must be
//! decremented by one.

use std::collections::VecDeque;

use glam::{Mat4, Quat, Vec3};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{
    Capsule, CollisionContact, ContactSource, EdgeSide, OrientedBox, box_behind_plane, sphere_capsule,
};
use super::geometry::{Plane, rotation_of};
use super::pool::ObstaclePool;
use super::segment::{Balloon, Segment, edge_loop};
use super::turn::TurnState;
use crate::consts::{EDGE_LOOP_RESOLUTION, TEXTURE_REPEAT_LENGTH};
use crate::scene::{NullScene, ObjectId, SceneRegistry};
use crate::settings::SlopeConfig;

/// Outcome of a segment-advance notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentAdvance {
    /// The window slid by one; held positions must be decremented
    Accepted,
    /// Still inside the back-buffer margin; the window did not move
    Rejected,
}

/// Side decorations per track edge
const DECORATIONS_PER_SIDE: usize = 2;
/// Trees stay off the outer part of the floor
const OBSTACLE_LATERAL_LIMIT: f32 = 0.85;
/// Balloon lanes span this share of the half width
const BALLOON_LATERAL_SPAN: f32 = 0.7;

pub struct Slope<S: SceneRegistry = NullScene> {
    config: SlopeConfig,
    segments: VecDeque<Segment>,
    pool: ObstaclePool,
    turn: TurnState,
    rng: Pcg32,
    profile: Vec<Vec3>,
    /// Frame the next generated segment starts at
    frontier_rotation: Quat,
    frontier_position: Vec3,
    next_index: u64,
    next_v: f32,
    balloon_serial: u64,
    scene: S,
}

impl Slope<NullScene> {
    /// Slope with no scene attached
    pub fn headless(config: SlopeConfig, seed: u64) -> Self {
        Self::new(config, seed, NullScene)
    }
}

impl<S: SceneRegistry> Slope<S> {
    /// Create a slope and fill its whole window
    ///
    /// Panics on a config `Settings::validate` would reject.
    pub fn new(config: SlopeConfig, seed: u64, scene: S) -> Self {
        assert!(config.back_buffer >= 1, "back_buffer must be at least 1");
        assert!(config.forward_buffer >= 2, "forward_buffer must be at least 2");
        assert!(config.segment_length > 0.0, "segment_length must be positive");
        assert!(config.half_width > 0.0, "half_width must be positive");
        assert!(
            config.turn_weights.iter().all(|w| *w >= 0.0) && config.turn_weights.iter().sum::<f32>() > 0.0,
            "turn_weights must be non-negative with a positive sum"
        );

        let window_len = config.window_len();
        let turn = TurnState::new(&config);
        let frontier_rotation = turn.initial_rotation();
        // Generation runs one segment ahead of retirement during an advance
        let capacity = (window_len + 1) * config.max_obstacles_per_segment.max(1);

        let mut slope = Self {
            profile: edge_loop(&config, EDGE_LOOP_RESOLUTION),
            segments: VecDeque::with_capacity(window_len + 1),
            pool: ObstaclePool::with_capacity(capacity),
            turn,
            rng: Pcg32::seed_from_u64(seed),
            frontier_rotation,
            frontier_position: Vec3::ZERO,
            next_index: 0,
            next_v: 0.0,
            balloon_serial: 0,
            scene,
            config,
        };

        for _ in 0..window_len {
            slope.generate_segment();
        }

        log::info!(
            "Slope ready: {} segments, obstacle pool of {}, seed {}",
            slope.segments.len(),
            capacity,
            seed
        );
        slope
    }

    pub fn config(&self) -> &SlopeConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn pool(&self) -> &ObstaclePool {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Segment at a window position
    ///
    /// Panics when the position is outside the window: a stale position
    /// would corrupt every later spatial query.
    pub fn segment(&self, index: usize) -> &Segment {
        assert!(
            index < self.segments.len(),
            "segment position {index} outside window of {}",
            self.segments.len()
        );
        &self.segments[index]
    }

    /// Segment and its successor; panics without a successor
    fn neighbors(&self, index: usize) -> (&Segment, &Segment) {
        assert!(
            index + 1 < self.segments.len(),
            "segment position {index} has no lookahead in window of {}",
            self.segments.len()
        );
        (&self.segments[index], &self.segments[index + 1])
    }

    /// Floor point in the middle of the oldest segment, with its orientation
    pub fn spawn_point(&self) -> (Vec3, Quat) {
        let segment = self.segment(0);
        (segment.floor_point(0.0, 0.5), rotation_of(&segment.transform))
    }

    /// Append one segment at the frontier
    pub fn generate_segment(&mut self) {
        let turn = self.turn.advance(&mut self.rng, &self.config);

        let start = Mat4::from_rotation_translation(self.frontier_rotation, self.frontier_position);
        let delta = self.frontier_rotation.inverse() * turn.rotation;
        let end_rotation = (self.frontier_rotation * delta).normalize();
        let end_position = self.frontier_position + end_rotation * (Vec3::Z * self.config.segment_length);
        let end = Mat4::from_rotation_translation(end_rotation, end_position);

        let mut segment = Segment::new(self.next_index, start, end, self.profile.clone(), self.next_v);
        segment.cliff = turn.cliff;
        segment.decorations = self.roll_decorations(&segment);
        self.spawn_obstacles(&mut segment);
        self.spawn_balloons(&mut segment);

        let (vertices, indices) = segment.floor_geometry(TEXTURE_REPEAT_LENGTH);
        self.scene
            .add_floor(self.segments.len(), segment.index, &vertices, &indices);
        self.scene.add_decorations(segment.index, &segment.decorations);

        log::debug!(
            "Generated segment {} ({:?}{}), {} trees, {} balloons",
            segment.index,
            self.turn.mode,
            if segment.cliff { ", cliff" } else { "" },
            segment.obstacles.len(),
            segment.balloons.len()
        );

        self.frontier_rotation = end_rotation;
        self.frontier_position = end_position;
        self.next_index += 1;
        self.next_v = (self.next_v + self.config.segment_length / TEXTURE_REPEAT_LENGTH).fract();
        self.segments.push_back(segment);
    }

    /// Retire the oldest segment and everything spawned on it
    pub fn delete_segment(&mut self) {
        let Some(segment) = self.segments.pop_front() else {
            log::warn!("delete_segment on an empty window");
            return;
        };

        self.scene.remove_floor(0);
        self.scene.remove_decorations(segment.index);
        for handle in &segment.obstacles {
            if let Some(obstacle) = self.pool.release(*handle) {
                self.scene.unregister_object(obstacle.id);
            }
        }
        for balloon in segment.live_balloons() {
            self.scene.unregister_object(balloon.id);
        }

        log::debug!("Retired segment {}", segment.index);
    }

    /// The rider has crossed into window position `new_index`
    ///
    /// Inside the back-buffer margin the window holds still. Past it, exactly
    /// one segment is generated and one retired.
    pub fn notify_of_segment_advance(&mut self, new_index: usize) -> SegmentAdvance {
        assert!(
            new_index < self.segments.len(),
            "advance to position {new_index} outside window of {}",
            self.segments.len()
        );

        if new_index <= self.config.back_buffer {
            return SegmentAdvance::Rejected;
        }

        self.generate_segment();
        self.delete_segment();
        debug_assert_eq!(self.segments.len(), self.config.window_len());
        SegmentAdvance::Accepted
    }

    /// World-space floor triangle under `point` in the segment at `index`
    pub fn surrounding_triangle(&self, point: Vec3, index: usize) -> Option<[Vec3; 3]> {
        let triangle = self.segment(index).surrounding_triangle(point);
        if triangle.is_none() {
            log::trace!("No floor triangle under {point} in segment position {index}");
        }
        triangle
    }

    /// Edge plane on one side between the segment at `index` and its successor
    ///
    /// The normal points toward the middle of the track.
    pub fn edge_plane(&self, index: usize, side: EdgeSide) -> Plane {
        let (current, next) = self.neighbors(index);
        let up = current.up();
        let a = current.edge_vertex(side);
        let b = next.edge_vertex(side);
        let edge = (b - a).normalize_or(current.forward());
        let inward = match side {
            EdgeSide::Left => up.cross(edge),
            EdgeSide::Right => edge.cross(up),
        };
        Plane::from_point_normal(a, inward.normalize_or_zero())
    }

    /// Has any corner of the box crossed an edge of the segment at `index`?
    ///
    /// Left is checked before right; the first hit wins.
    pub fn box_is_beyond_edge(&self, body: &OrientedBox, index: usize) -> Option<CollisionContact> {
        [EdgeSide::Left, EdgeSide::Right].into_iter().find_map(|side| {
            box_behind_plane(body, &self.edge_plane(index, side)).map(|c| c.with_source(ContactSource::Edge(side)))
        })
    }

    /// First tree overlapping the capsule in the segment at `index` or the next one
    pub fn capsule_collides_with_obstacle(&self, capsule: &Capsule, index: usize) -> Option<CollisionContact> {
        let (current, next) = self.neighbors(index);
        current
            .obstacles
            .iter()
            .chain(next.obstacles.iter())
            .find_map(|handle| {
                let obstacle = self.pool.get(*handle)?;
                sphere_capsule(obstacle.position, obstacle.radius, capsule)
                    .map(|c| c.with_source(ContactSource::Obstacle(*handle)))
            })
    }

    /// Pop every balloon the capsule touches in the segment at `index`
    ///
    /// Returns how many were popped by this call. Popped slots stay empty, so
    /// a balloon is only ever counted once.
    pub fn capsule_collides_with_balloons(&mut self, capsule: &Capsule, index: usize) -> u32 {
        assert!(
            index < self.segments.len(),
            "segment position {index} outside window of {}",
            self.segments.len()
        );

        let mut popped = 0;
        for slot in self.segments[index].balloons.iter_mut() {
            let Some(balloon) = slot else { continue };
            if sphere_capsule(balloon.position, balloon.radius, capsule).is_some() {
                self.scene.unregister_object(balloon.id);
                *slot = None;
                popped += 1;
            }
        }
        popped
    }

    /// Balloons still floating in the segment at `index`
    pub fn balloons_in(&self, index: usize) -> Vec<Balloon> {
        self.segment(index).live_balloons().copied().collect()
    }

    pub fn start_plane(&self, index: usize) -> Plane {
        self.segment(index).start_plane()
    }

    pub fn segment_up(&self, index: usize) -> Vec3 {
        self.segment(index).up()
    }

    /// Trees currently drawn from the pool
    pub fn live_obstacles(&self) -> usize {
        self.pool.live()
    }

    fn roll_decorations(&mut self, segment: &Segment) -> Vec<Vec3> {
        let config = &self.config;
        let mut anchors = Vec::with_capacity(DECORATIONS_PER_SIDE * 2);
        for side in [-1.0f32, 1.0] {
            for _ in 0..DECORATIONS_PER_SIDE {
                let out = config.half_width + self.rng.random_range(2.0..8.0);
                let local = Vec3::new(
                    side * out,
                    config.bank_height + self.rng.random_range(0.0..1.0),
                    self.rng.random_range(0.0..config.segment_length),
                );
                anchors.push(segment.to_world(local));
            }
        }
        anchors
    }

    fn spawn_obstacles(&mut self, segment: &mut Segment) {
        let config = &self.config;
        if segment.index < config.safe_start_segments
            || config.max_obstacles_per_segment == 0
            || self.rng.random::<f32>() >= config.obstacle_chance
        {
            return;
        }

        let count = self.rng.random_range(1..=config.max_obstacles_per_segment);
        for _ in 0..count {
            let lateral = self.rng.random_range(-OBSTACLE_LATERAL_LIMIT..OBSTACLE_LATERAL_LIMIT);
            let along = self.rng.random_range(0.0..1.0);
            let position = segment.floor_point(lateral, along);

            let Some((handle, obstacle)) = self.pool.acquire(position, config.tree_radius) else {
                log::warn!("Obstacle pool exhausted at segment {}", segment.index);
                break;
            };
            self.scene.register_object(obstacle.id, obstacle.position);
            segment.obstacles.push(handle);
        }
    }

    fn spawn_balloons(&mut self, segment: &mut Segment) {
        let config = &self.config;
        if config.max_balloons_across == 0 || self.rng.random::<f32>() >= config.balloon_chance {
            return;
        }

        let lanes = config.max_balloons_across;
        let mut lane_order: Vec<usize> = (0..lanes).collect();
        lane_order.shuffle(&mut self.rng);
        let count = self.rng.random_range(1..=lanes);

        let up = segment.up();
        for &lane in lane_order.iter().take(count) {
            let lateral = -BALLOON_LATERAL_SPAN + 2.0 * BALLOON_LATERAL_SPAN * (lane as f32 + 0.5) / lanes as f32;
            let along = self.rng.random_range(0.0..1.0);
            let position = segment.floor_point(lateral, along) + up * config.balloon_height;

            let id = ObjectId::Balloon(self.balloon_serial);
            self.balloon_serial += 1;
            self.scene.register_object(id, position);
            segment.balloons.push(Some(Balloon {
                id,
                position,
                radius: config.balloon_radius,
            }));
        }
    }
}
