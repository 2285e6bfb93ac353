//! Boundary with the collaborators around the simulation
//!
//! The simulation only talks to rendering, object bookkeeping, the HUD and
//! input through these traits:
//! - `SceneRegistry`: floor strips, side decorations, spawned objects
//! - `Hud`: balloon score and speed readout
//! - `InputSource`: steer/brake/jump state
//!
//! Audio lives in `crate::audio`.

pub mod vertex;

use std::collections::HashMap;

use glam::Vec3;

pub use vertex::FloorVertex;

/// Identifier of a spawned object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectId {
    /// Pool creation counter of a tree
    Tree(u64),
    /// Spawn counter of a balloon
    Balloon(u64),
}

/// Scene-side bookkeeping for generated terrain
///
/// Injected into the slope at construction. Floor strips are keyed by their
/// position in the live window at the time of the call: new strips are always
/// appended at the back, retired strips always leave slot 0.
pub trait SceneRegistry {
    fn add_floor(&mut self, slot: usize, segment: u64, vertices: &[FloorVertex], indices: &[u32]);
    fn remove_floor(&mut self, slot: usize);
    fn add_decorations(&mut self, segment: u64, positions: &[Vec3]);
    fn remove_decorations(&mut self, segment: u64);
    fn register_object(&mut self, id: ObjectId, position: Vec3);
    fn unregister_object(&mut self, id: ObjectId);
}

/// Score and telemetry readout
pub trait Hud {
    /// Called once per balloon popped, with a count of one
    fn add_balloons(&mut self, count: u32);
    /// Current speed, reported every tick
    fn set_speed(&mut self, speed: f32);
}

/// Rider controls for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiderInput {
    pub steer_left: bool,
    pub steer_right: bool,
    pub brake: bool,
    pub jump: bool,
}

impl RiderInput {
    /// -1 for left, 1 for right, 0 for none or both
    pub fn steer_axis(&self) -> f32 {
        match (self.steer_left, self.steer_right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Where controls come from
pub trait InputSource {
    fn poll(&mut self) -> RiderInput;
}

impl InputSource for RiderInput {
    fn poll(&mut self) -> RiderInput {
        *self
    }
}

/// Scene that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScene;

impl SceneRegistry for NullScene {
    fn add_floor(&mut self, _: usize, _: u64, _: &[FloorVertex], _: &[u32]) {}
    fn remove_floor(&mut self, _: usize) {}
    fn add_decorations(&mut self, _: u64, _: &[Vec3]) {}
    fn remove_decorations(&mut self, _: u64) {}
    fn register_object(&mut self, _: ObjectId, _: Vec3) {}
    fn unregister_object(&mut self, _: ObjectId) {}
}

/// Scene that keeps track of what is live, for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct RecordingScene {
    /// Segment index per floor slot, oldest first
    pub floors: Vec<u64>,
    pub floor_triangles: usize,
    pub decorations: HashMap<u64, usize>,
    pub objects: HashMap<ObjectId, Vec3>,
}

impl RecordingScene {
    pub fn trees(&self) -> usize {
        self.objects.keys().filter(|id| matches!(id, ObjectId::Tree(_))).count()
    }

    pub fn balloons(&self) -> usize {
        self.objects.keys().filter(|id| matches!(id, ObjectId::Balloon(_))).count()
    }
}

impl SceneRegistry for RecordingScene {
    fn add_floor(&mut self, slot: usize, segment: u64, _vertices: &[FloorVertex], indices: &[u32]) {
        assert_eq!(slot, self.floors.len(), "floor strips must be appended at the back");
        self.floors.push(segment);
        self.floor_triangles += indices.len() / 3;
    }

    fn remove_floor(&mut self, slot: usize) {
        assert!(slot < self.floors.len(), "no floor strip in slot {slot}");
        self.floors.remove(slot);
    }

    fn add_decorations(&mut self, segment: u64, positions: &[Vec3]) {
        self.decorations.insert(segment, positions.len());
    }

    fn remove_decorations(&mut self, segment: u64) {
        self.decorations.remove(&segment);
    }

    fn register_object(&mut self, id: ObjectId, position: Vec3) {
        let previous = self.objects.insert(id, position);
        debug_assert!(previous.is_none(), "{id:?} registered twice");
    }

    fn unregister_object(&mut self, id: ObjectId) {
        self.objects.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steer_axis() {
        let mut input = RiderInput::default();
        assert_eq!(input.steer_axis(), 0.0);
        input.steer_left = true;
        assert_eq!(input.steer_axis(), -1.0);
        input.steer_right = true;
        assert_eq!(input.steer_axis(), 0.0);
        input.steer_left = false;
        assert_eq!(input.poll().steer_axis(), 1.0);
    }

    #[test]
    fn test_recording_scene_counts_objects() {
        let mut scene = RecordingScene::default();
        scene.register_object(ObjectId::Tree(0), Vec3::ZERO);
        scene.register_object(ObjectId::Balloon(0), Vec3::ONE);
        scene.register_object(ObjectId::Balloon(1), Vec3::ONE);
        assert_eq!(scene.trees(), 1);
        assert_eq!(scene.balloons(), 2);
        scene.unregister_object(ObjectId::Balloon(0));
        assert_eq!(scene.balloons(), 1);
    }
}
