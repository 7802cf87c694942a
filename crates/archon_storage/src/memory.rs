//! In-process backend.
//!
//! Plain vectors and maps, owned by one world. Nothing here is shared across
//! worlds and nothing is locked.

use std::collections::HashMap;

use archon_component::{
    ArchetypeId, ComponentTypeId, Entity, EntityAllocator, EntityId, SlotIndex,
};

use crate::error::StorageError;
use crate::store::{
    ComponentIndexStore, ComponentStore, Entry, EntityManager, EntryStore, Location,
    LocationStore, StateKey, StateStore,
};

// ── Components ──────────────────────────────────────────────────────────────

/// Component tables as `component → archetype index → slot → bytes`.
#[derive(Debug, Default)]
pub struct MemoryComponentStore {
    tables: HashMap<ComponentTypeId, Vec<Vec<Vec<u8>>>>,
}

impl MemoryComponentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, component: ComponentTypeId, archetype: ArchetypeId) -> Option<&Vec<Vec<u8>>> {
        self.tables
            .get(&component)
            .and_then(|per_arch| per_arch.get(archetype.index()))
    }

    fn table_mut(&mut self, component: ComponentTypeId, archetype: ArchetypeId) -> &mut Vec<Vec<u8>> {
        let per_arch = self.tables.entry(component).or_default();
        if per_arch.len() <= archetype.index() {
            per_arch.resize_with(archetype.index() + 1, Vec::new);
        }
        &mut per_arch[archetype.index()]
    }
}

impl ComponentStore for MemoryComponentStore {
    fn push_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        bytes: &[u8],
    ) -> Result<SlotIndex, StorageError> {
        let table = self.table_mut(component, archetype);
        table.push(bytes.to_vec());
        Ok(table.len() - 1)
    }

    fn component(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError> {
        self.table(component, archetype)
            .and_then(|table| table.get(slot))
            .cloned()
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            })
    }

    fn set_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let value = self
            .table_mut(component, archetype)
            .get_mut(slot)
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            })?;
        *value = bytes.to_vec();
        Ok(())
    }

    fn move_component(
        &mut self,
        component: ComponentTypeId,
        from: ArchetypeId,
        slot: SlotIndex,
        to: ArchetypeId,
    ) -> Result<SlotIndex, StorageError> {
        let bytes = self.swap_remove(component, from, slot)?;
        let table = self.table_mut(component, to);
        table.push(bytes);
        Ok(table.len() - 1)
    }

    fn swap_remove(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError> {
        let table = self.table_mut(component, archetype);
        if slot >= table.len() {
            return Err(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            });
        }
        Ok(table.swap_remove(slot))
    }

    fn contains(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<bool, StorageError> {
        Ok(self
            .table(component, archetype)
            .is_some_and(|table| slot < table.len()))
    }

    fn len(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
    ) -> Result<usize, StorageError> {
        Ok(self.table(component, archetype).map_or(0, Vec::len))
    }
}

/// Per-archetype slot counters.
#[derive(Debug, Default)]
pub struct MemoryComponentIndex {
    counts: HashMap<ArchetypeId, usize>,
}

impl MemoryComponentIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComponentIndexStore for MemoryComponentIndex {
    fn count(&self, archetype: ArchetypeId) -> Result<usize, StorageError> {
        Ok(self.counts.get(&archetype).copied().unwrap_or(0))
    }

    fn increment(&mut self, archetype: ArchetypeId) -> Result<SlotIndex, StorageError> {
        let count = self.counts.entry(archetype).or_insert(0);
        *count += 1;
        Ok(*count - 1)
    }

    fn decrement(&mut self, archetype: ArchetypeId) -> Result<(), StorageError> {
        let count = self.counts.entry(archetype).or_insert(0);
        *count = count.saturating_sub(1);
        Ok(())
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

/// Locations in a vector indexed by entity id, with a live counter so
/// [`LocationStore::len`] never scans.
#[derive(Debug, Default)]
pub struct MemoryLocationStore {
    locations: Vec<Option<Location>>,
    live: usize,
}

impl MemoryLocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, id: EntityId) -> &mut Option<Location> {
        let idx = id as usize;
        if self.locations.len() <= idx {
            self.locations.resize(idx + 1, None);
        }
        &mut self.locations[idx]
    }
}

impl LocationStore for MemoryLocationStore {
    fn insert(
        &mut self,
        id: EntityId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<(), StorageError> {
        let entry = self.slot_mut(id);
        let was_live = entry.is_some_and(|loc| loc.valid);
        *entry = Some(Location::new(archetype, slot));
        if !was_live {
            self.live += 1;
        }
        Ok(())
    }

    fn set(&mut self, id: EntityId, location: Location) -> Result<(), StorageError> {
        *self.slot_mut(id) = Some(location);
        Ok(())
    }

    fn commit(
        &mut self,
        updates: &[(EntityId, Location)],
        live_delta: i64,
    ) -> Result<(), StorageError> {
        let live = i64::try_from(self.live)
            .ok()
            .and_then(|live| live.checked_add(live_delta))
            .and_then(|live| usize::try_from(live).ok())
            .ok_or_else(|| {
                StorageError::UnexpectedReply(format!(
                    "live count {} cannot shift by {live_delta}",
                    self.live
                ))
            })?;
        for (id, location) in updates {
            *self.slot_mut(*id) = Some(*location);
        }
        self.live = live;
        Ok(())
    }

    fn location(&self, id: EntityId) -> Result<Option<Location>, StorageError> {
        Ok(self.locations.get(id as usize).copied().flatten())
    }

    fn remove(&mut self, id: EntityId) -> Result<(), StorageError> {
        let loc = self
            .locations
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(StorageError::MissingLocation(id))?;
        if loc.valid {
            loc.valid = false;
            self.live -= 1;
        }
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.live)
    }
}

/// Entry records in a map.
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    entries: HashMap<EntityId, Entry>,
}

impl MemoryEntryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryStore for MemoryEntryStore {
    fn set_entry(&mut self, entry: &Entry) -> Result<(), StorageError> {
        self.entries.insert(entry.id, *entry);
        Ok(())
    }

    fn entry(&self, id: EntityId) -> Result<Option<Entry>, StorageError> {
        Ok(self.entries.get(&id).copied())
    }

    fn remove_entry(&mut self, id: EntityId) -> Result<(), StorageError> {
        self.entries.remove(&id);
        Ok(())
    }
}

/// [`EntityAllocator`] behind the [`EntityManager`] contract.
#[derive(Debug, Default)]
pub struct MemoryEntityManager {
    allocator: EntityAllocator,
}

impl MemoryEntityManager {
    /// Creates a manager whose first handle has id 1.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityManager for MemoryEntityManager {
    fn new_entity(&mut self) -> Result<Entity, StorageError> {
        Ok(self.allocator.allocate())
    }

    fn destroy(&mut self, next: Entity) -> Result<(), StorageError> {
        self.allocator.recycle(next);
        Ok(())
    }
}

/// Saved blobs in a map. Lives as long as the world, so a fresh world
/// never sees saved state.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    blobs: HashMap<StateKey, Vec<u8>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&mut self, key: StateKey, bytes: &[u8]) -> Result<(), StorageError> {
        self.blobs.insert(key, bytes.to_vec());
        Ok(())
    }

    fn load(&self, key: StateKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.blobs.get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ComponentOp;

    const ENERGY: ComponentTypeId = ComponentTypeId(1);
    const A0: ArchetypeId = ArchetypeId(0);
    const A1: ArchetypeId = ArchetypeId(1);

    #[test]
    fn test_push_and_read_back() {
        let mut store = MemoryComponentStore::new();
        assert_eq!(store.push_component(ENERGY, A1, b"a").unwrap(), 0);
        assert_eq!(store.push_component(ENERGY, A1, b"b").unwrap(), 1);
        assert_eq!(store.component(ENERGY, A1, 1).unwrap(), b"b");
        assert_eq!(store.len(ENERGY, A1).unwrap(), 2);
        assert_eq!(store.len(ENERGY, A0).unwrap(), 0);
    }

    #[test]
    fn test_swap_remove_compacts() {
        let mut store = MemoryComponentStore::new();
        for bytes in [b"a", b"b", b"c"] {
            store.push_component(ENERGY, A0, bytes).unwrap();
        }
        assert_eq!(store.swap_remove(ENERGY, A0, 0).unwrap(), b"a");
        assert_eq!(store.component(ENERGY, A0, 0).unwrap(), b"c");
        assert_eq!(store.component(ENERGY, A0, 1).unwrap(), b"b");
        assert!(!store.contains(ENERGY, A0, 2).unwrap());
    }

    #[test]
    fn test_move_relocates_and_compacts_source() {
        let mut store = MemoryComponentStore::new();
        store.push_component(ENERGY, A0, b"a").unwrap();
        store.push_component(ENERGY, A0, b"b").unwrap();
        store.push_component(ENERGY, A1, b"x").unwrap();

        let slot = store.move_component(ENERGY, A0, 0, A1).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(store.component(ENERGY, A1, 1).unwrap(), b"a");
        assert_eq!(store.component(ENERGY, A0, 0).unwrap(), b"b");
        assert_eq!(store.len(ENERGY, A0).unwrap(), 1);
    }

    #[test]
    fn test_out_of_range_slots_error() {
        let mut store = MemoryComponentStore::new();
        assert!(matches!(
            store.component(ENERGY, A0, 0),
            Err(StorageError::SlotOutOfRange { slot: 0, .. })
        ));
        assert!(store.set_component(ENERGY, A0, 3, b"z").is_err());
        assert!(store.swap_remove(ENERGY, A0, 0).is_err());
    }

    #[test]
    fn test_apply_runs_ops_in_order() {
        let mut store = MemoryComponentStore::new();
        store.push_component(ENERGY, A0, b"a").unwrap();
        store
            .apply(&[
                ComponentOp::Push {
                    component: ENERGY,
                    archetype: A0,
                    bytes: b"b".to_vec(),
                },
                ComponentOp::Move {
                    component: ENERGY,
                    from: A0,
                    slot: 0,
                    to: A1,
                },
            ])
            .unwrap();
        assert_eq!(store.component(ENERGY, A0, 0).unwrap(), b"b");
        assert_eq!(store.component(ENERGY, A1, 0).unwrap(), b"a");
    }

    #[test]
    fn test_component_index_counts_slots() {
        let mut index = MemoryComponentIndex::new();
        assert_eq!(index.increment(A0).unwrap(), 0);
        assert_eq!(index.increment(A0).unwrap(), 1);
        index.decrement(A0).unwrap();
        assert_eq!(index.count(A0).unwrap(), 1);
        assert_eq!(index.count(A1).unwrap(), 0);
    }

    #[test]
    fn test_locations_track_live_count() {
        let mut locs = MemoryLocationStore::new();
        locs.insert(1, A0, 0).unwrap();
        locs.insert(2, A0, 1).unwrap();
        assert_eq!(locs.len().unwrap(), 2);
        assert!(locs.contains_entity(1).unwrap());

        locs.remove(1).unwrap();
        locs.remove(1).unwrap();
        assert_eq!(locs.len().unwrap(), 1);
        assert!(!locs.contains_entity(1).unwrap());
        assert_eq!(locs.location(1).unwrap().map(|l| l.valid), Some(false));

        locs.set(2, Location::new(A1, 0)).unwrap();
        assert_eq!(locs.location(2).unwrap(), Some(Location::new(A1, 0)));
        assert!(matches!(locs.remove(9), Err(StorageError::MissingLocation(9))));
    }

    #[test]
    fn test_location_commit_shifts_live_count() {
        let mut locs = MemoryLocationStore::new();
        locs.insert(1, A0, 0).unwrap();
        locs.insert(2, A0, 1).unwrap();

        let dead = Location {
            valid: false,
            ..Location::new(A0, 0)
        };
        locs.commit(&[(1, dead), (2, Location::new(A0, 0))], -1).unwrap();
        assert_eq!(locs.len().unwrap(), 1);
        assert!(!locs.contains_entity(1).unwrap());
        assert_eq!(locs.location(2).unwrap(), Some(Location::new(A0, 0)));

        assert!(locs.commit(&[(2, dead)], -2).is_err());
        assert_eq!(locs.location(2).unwrap(), Some(Location::new(A0, 0)));
        assert_eq!(locs.len().unwrap(), 1);
    }

    #[test]
    fn test_entity_manager_reuses_bumped_handles() {
        let mut manager = MemoryEntityManager::new();
        let e = manager.new_entity().unwrap();
        manager.destroy(e.next_version().unwrap()).unwrap();
        let again = manager.new_entity().unwrap();
        assert_eq!(again.id(), e.id());
        assert!(again.version() > e.version());
    }
}
