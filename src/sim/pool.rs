//! Fixed-capacity obstacle arena
//!
//! Trees are acquired into recycled slots and released when their segment is
//! retired, so an endless run never grows the allocation.

use glam::Vec3;

use crate::scene::ObjectId;

/// Stable reference to a pooled obstacle
///
/// The generation changes every time a slot is reused, so a stale handle can
/// never reach the slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleHandle {
    index: u32,
    generation: u32,
}

impl ObstacleHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// A tree collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    /// Registry identifier (the pool's creation counter at acquire time)
    pub id: ObjectId,
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    obstacle: Option<Obstacle>,
}

/// Arena of obstacle slots with a free-index stack
#[derive(Debug, Clone)]
pub struct ObstaclePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Rolling creation counter, also used as the registry id
    created: u64,
}

impl ObstaclePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Slot::default(); capacity],
            // Reversed so slot 0 is handed out first
            free: (0..capacity as u32).rev().collect(),
            created: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Obstacles currently checked out
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total acquisitions since creation
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Take a free slot. `None` when the pool is exhausted.
    pub fn acquire(&mut self, position: Vec3, radius: f32) -> Option<(ObstacleHandle, Obstacle)> {
        let index = self.free.pop()?;
        let id = ObjectId::Tree(self.created);
        self.created += 1;

        let slot = &mut self.slots[index as usize];
        let obstacle = Obstacle {
            id,
            position,
            radius,
        };
        slot.obstacle = Some(obstacle);

        let handle = ObstacleHandle {
            index,
            generation: slot.generation,
        };
        Some((handle, obstacle))
    }

    /// Return a slot to the pool. Stale or already-released handles are ignored.
    pub fn release(&mut self, handle: ObstacleHandle) -> Option<Obstacle> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let obstacle = slot.obstacle.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(obstacle)
    }

    pub fn get(&self, handle: ObstacleHandle) -> Option<&Obstacle> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.obstacle.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_until_exhausted() {
        let mut pool = ObstaclePool::with_capacity(2);
        let (a, _) = pool.acquire(Vec3::ZERO, 1.0).expect("slot 0");
        let (b, _) = pool.acquire(Vec3::X, 1.0).expect("slot 1");
        assert_ne!(a, b);
        assert_eq!(pool.live(), 2);
        assert!(pool.acquire(Vec3::Y, 1.0).is_none());
        assert_eq!(pool.created(), 2);
    }

    #[test]
    fn test_release_reuses_slot_with_new_generation() {
        let mut pool = ObstaclePool::with_capacity(1);
        let (first, obstacle) = pool.acquire(Vec3::ZERO, 1.0).expect("slot");
        assert_eq!(obstacle.id, ObjectId::Tree(0));

        assert!(pool.release(first).is_some());
        assert_eq!(pool.live(), 0);

        let (second, obstacle) = pool.acquire(Vec3::X, 2.0).expect("recycled slot");
        assert_eq!(second.index(), first.index());
        assert_eq!(obstacle.id, ObjectId::Tree(1));

        // The old handle no longer reaches the slot
        assert!(pool.get(first).is_none());
        assert!(pool.release(first).is_none());
        assert_eq!(pool.get(second).map(|o| o.radius), Some(2.0));
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut pool = ObstaclePool::with_capacity(4);
        let (handle, _) = pool.acquire(Vec3::ZERO, 1.0).expect("slot");
        assert!(pool.release(handle).is_some());
        assert!(pool.release(handle).is_none());
        assert_eq!(pool.live(), 0);
        assert_eq!(pool.capacity(), 4);
    }
}
