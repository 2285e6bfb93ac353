//! Deterministic simulation module
//!
//! All terrain and rider logic lives here. This module must be pure and
//! deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (window position, then spawn order)
//! - No rendering or platform dependencies; collaborators come in as traits

pub mod collision;
pub mod geometry;
pub mod pool;
pub mod rider;
pub mod segment;
pub mod slope;
pub mod tick;
pub mod turn;

pub use collision::{Capsule, CollisionContact, ContactSource, EdgeSide, OrientedBox};
pub use geometry::Plane;
pub use pool::{Obstacle, ObstacleHandle, ObstaclePool};
pub use rider::{MotionState, Rider, SurfaceContact};
pub use segment::{Balloon, Segment};
pub use slope::{SegmentAdvance, Slope};
pub use tick::{TickReport, tick};
pub use turn::{TurnDirection, TurnMode, TurnState};
