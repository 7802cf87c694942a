//! Entity handles and id allocation.
//!
//! An [`Entity`] packs a 32-bit id and a 32-bit version into one `u64`. The id
//! names a slot in the entity location table; the version distinguishes the
//! successive lives of that id so a handle held across a removal goes stale
//! instead of silently aliasing the entity that later reuses the id.

use serde::{Deserialize, Serialize};

/// Raw 32-bit entity id, the key of the entity location table.
pub type EntityId = u32;

const VERSION_BITS: u32 = 32;
const VERSION_MASK: u64 = 0xFFFF_FFFF;

/// A versioned entity handle: `id (high 32 bits) | version (low 32 bits)`.
///
/// [`Entity::NULL`] (the zero value) is never handed out and is always
/// invalid. Ids start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(u64);

impl Entity {
    /// The null entity. Never valid in any world.
    pub const NULL: Entity = Entity(0);

    /// Builds a handle from an id and a version.
    #[must_use]
    pub const fn new(id: EntityId, version: u32) -> Self {
        Self(((id as u64) << VERSION_BITS) | version as u64)
    }

    /// Reinterprets a raw packed value as a handle.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the packed `u64`.
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Returns the id half of the handle.
    #[must_use]
    pub const fn id(self) -> EntityId {
        (self.0 >> VERSION_BITS) as EntityId
    }

    /// Returns the version half of the handle.
    #[must_use]
    pub const fn version(self) -> u32 {
        (self.0 & VERSION_MASK) as u32
    }

    /// Returns the handle the same id will carry in its next life, or `None`
    /// once the version space is used up. An exhausted id is retired rather
    /// than wrapped back to version 0, where it could alias an old handle.
    #[must_use]
    pub const fn next_version(self) -> Option<Self> {
        match self.version().checked_add(1) {
            Some(version) => Some(Self::new(self.id(), version)),
            None => None,
        }
    }

    /// Returns `true` unless this is [`Entity::NULL`].
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.id(), self.version())
    }
}

/// In-process entity allocator.
///
/// Fresh ids grow monotonically from 1. Destroyed handles are pushed onto a
/// free list already carrying their bumped version, so the next allocation
/// of that id is distinguishable from every earlier one.
#[derive(Debug, Default, Clone)]
pub struct EntityAllocator {
    next_id: EntityId,
    free: Vec<Entity>,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a recycled handle if one is available, otherwise a fresh id
    /// at version 0.
    pub fn allocate(&mut self) -> Entity {
        if let Some(recycled) = self.free.pop() {
            return recycled;
        }
        self.next_id += 1;
        Entity::new(self.next_id, 0)
    }

    /// Makes `entity` available for reuse. Callers pass the handle with its
    /// version already bumped (see [`Entity::next_version`]).
    pub fn recycle(&mut self, entity: Entity) {
        self.free.push(entity);
    }

    /// Number of distinct ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> EntityId {
        self.next_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_packs_id_and_version() {
        let e = Entity::new(42, 7);
        assert_eq!(e.id(), 42);
        assert_eq!(e.version(), 7);
        assert_eq!(Entity::from_raw(e.to_raw()), e);
    }

    #[test]
    fn test_null_entity() {
        assert!(Entity::NULL.is_null());
        assert_eq!(Entity::NULL.id(), 0);
        assert!(!Entity::new(1, 0).is_null());
    }

    #[test]
    fn test_stale_handle_differs_from_next_life() {
        let old = Entity::new(3, 0);
        let new = old.next_version().unwrap();
        assert_eq!(old.id(), new.id());
        assert_ne!(old, new);
        assert!(new.version() > old.version());
    }

    #[test]
    fn test_exhausted_version_retires_id() {
        let last = Entity::new(5, u32::MAX);
        assert_eq!(last.next_version(), None);
        assert_eq!(
            Entity::new(5, u32::MAX - 1).next_version(),
            Some(last)
        );
    }

    #[test]
    fn test_allocator_recycles_with_bumped_version() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!((a.id(), b.id()), (1, 2));

        alloc.recycle(a.next_version().unwrap());
        let c = alloc.allocate();
        assert_eq!(c.id(), a.id());
        assert_eq!(c.version(), 1);

        let d = alloc.allocate();
        assert_eq!(d.id(), 3);
        assert_eq!(alloc.issued(), 3);
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = Entity::new(999, 4);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: Entity = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}
