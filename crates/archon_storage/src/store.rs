//! Storage contracts shared by every backend.
//!
//! A world talks to its backing store only through these traits. Reads take
//! `&self`; anything that changes stored state takes `&mut self`.

use archon_component::{ArchetypeId, ComponentTypeId, Entity, EntityId, SlotIndex};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

// ── Records ─────────────────────────────────────────────────────────────────

/// Where an entity id currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Archetype holding the entity.
    pub archetype: ArchetypeId,
    /// Slot within that archetype.
    pub slot: SlotIndex,
    /// `false` once the entity has been removed.
    pub valid: bool,
}

impl Location {
    /// A live location.
    #[must_use]
    pub const fn new(archetype: ArchetypeId, slot: SlotIndex) -> Self {
        Self {
            archetype,
            slot,
            valid: true,
        }
    }
}

/// Persisted per-entity record: the live handle and where it lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// The entity id.
    pub id: EntityId,
    /// The live handle, including its version.
    pub entity: Entity,
    /// The entity's location when the record was written.
    pub location: Location,
}

/// One step of a batched component mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentOp {
    /// Append `bytes` to the table of `component` in `archetype`.
    Push {
        component: ComponentTypeId,
        archetype: ArchetypeId,
        bytes: Vec<u8>,
    },
    /// Move the value at `slot` of `from` to the end of `to`, compacting `from`.
    Move {
        component: ComponentTypeId,
        from: ArchetypeId,
        slot: SlotIndex,
        to: ArchetypeId,
    },
    /// Remove the value at `slot`, moving the table's last value into it.
    SwapRemove {
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    },
}

/// Blobs a world persists next to its tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Archetype table snapshot.
    Archetypes,
    /// Component schema snapshot.
    Schema,
}

// ── Contracts ───────────────────────────────────────────────────────────────

/// Per-component-type tables addressed by `(archetype, slot)`.
///
/// Slots are dense: a table with `n` values occupies slots `0..n`.
pub trait ComponentStore: Send + Sync {
    /// Appends a value and returns the slot it landed in.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn push_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        bytes: &[u8],
    ) -> Result<SlotIndex, StorageError>;

    /// Returns the value at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotOutOfRange`] if the slot is empty.
    fn component(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError>;

    /// Overwrites the value at `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotOutOfRange`] if the slot is empty.
    fn set_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
        bytes: &[u8],
    ) -> Result<(), StorageError>;

    /// Moves the value at `slot` of `from` to the end of `to`, compacting
    /// `from`, and returns its new slot in `to`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotOutOfRange`] if the source slot is empty.
    fn move_component(
        &mut self,
        component: ComponentTypeId,
        from: ArchetypeId,
        slot: SlotIndex,
        to: ArchetypeId,
    ) -> Result<SlotIndex, StorageError>;

    /// Removes the value at `slot`, moving the last value into its place,
    /// and returns the removed bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SlotOutOfRange`] if the slot is empty.
    fn swap_remove(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError>;

    /// Returns `true` if the table holds a value at `slot`.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn contains(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<bool, StorageError>;

    /// Number of values in the table.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn len(&self, component: ComponentTypeId, archetype: ArchetypeId)
    -> Result<usize, StorageError>;

    /// Applies `ops` in order. Backends that can commit a batch in one step
    /// override this.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing step.
    fn apply(&mut self, ops: &[ComponentOp]) -> Result<(), StorageError> {
        for op in ops {
            match op {
                ComponentOp::Push {
                    component,
                    archetype,
                    bytes,
                } => {
                    self.push_component(*component, *archetype, bytes)?;
                }
                ComponentOp::Move {
                    component,
                    from,
                    slot,
                    to,
                } => {
                    self.move_component(*component, *from, *slot, *to)?;
                }
                ComponentOp::SwapRemove {
                    component,
                    archetype,
                    slot,
                } => {
                    self.swap_remove(*component, *archetype, *slot)?;
                }
            }
        }
        Ok(())
    }
}

/// Live slot count per archetype, shared by all of the archetype's tables.
pub trait ComponentIndexStore: Send + Sync {
    /// Current slot count.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn count(&self, archetype: ArchetypeId) -> Result<usize, StorageError>;

    /// Reserves the next slot and returns it.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn increment(&mut self, archetype: ArchetypeId) -> Result<SlotIndex, StorageError>;

    /// Releases one slot.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn decrement(&mut self, archetype: ArchetypeId) -> Result<(), StorageError>;
}

/// Entity id → [`Location`], plus a live count.
///
/// `insert` and `remove` change liveness and keep the count; `set` only
/// moves an already-live entity.
pub trait LocationStore: Send + Sync {
    /// Records a new live entity.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn insert(
        &mut self,
        id: EntityId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<(), StorageError>;

    /// Overwrites an entity's location.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn set(&mut self, id: EntityId, location: Location) -> Result<(), StorageError>;

    /// Overwrites several locations without changing the live count.
    ///
    /// # Errors
    ///
    /// As [`LocationStore::commit`].
    fn set_many(&mut self, updates: &[(EntityId, Location)]) -> Result<(), StorageError> {
        self.commit(updates, 0)
    }

    /// Overwrites several locations and shifts the live count by
    /// `live_delta` as one step. A removal commits the invalidated location
    /// and the fix-up of the entity swapped into its slot together, with a
    /// delta of -1.
    ///
    /// # Errors
    ///
    /// Returns a backend error; on Redis nothing is written in that case.
    fn commit(
        &mut self,
        updates: &[(EntityId, Location)],
        live_delta: i64,
    ) -> Result<(), StorageError>;

    /// The recorded location, valid or not.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn location(&self, id: EntityId) -> Result<Option<Location>, StorageError>;

    /// Returns `true` if a valid location is recorded for `id`.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn contains_entity(&self, id: EntityId) -> Result<bool, StorageError> {
        Ok(self.location(id)?.is_some_and(|loc| loc.valid))
    }

    /// Marks the location invalid and drops the live count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingLocation`] if nothing is recorded.
    fn remove(&mut self, id: EntityId) -> Result<(), StorageError>;

    /// Number of live entities.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn len(&self) -> Result<usize, StorageError>;

    /// Returns `true` if no entity is live.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Persisted [`Entry`] records keyed by entity id.
pub trait EntryStore: Send + Sync {
    /// Writes or replaces a record.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn set_entry(&mut self, entry: &Entry) -> Result<(), StorageError>;

    /// Writes several records. Backends that can commit a batch in one step
    /// override this.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing write.
    fn set_entries(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        for entry in entries {
            self.set_entry(entry)?;
        }
        Ok(())
    }

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn entry(&self, id: EntityId) -> Result<Option<Entry>, StorageError>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn remove_entry(&mut self, id: EntityId) -> Result<(), StorageError>;
}

/// Hands out entity handles.
///
/// Every backend follows the same scheme: recycled handles first, otherwise a
/// fresh id (monotonically increasing from 1) at version 0.
pub trait EntityManager: Send + Sync {
    /// Allocates a handle.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn new_entity(&mut self) -> Result<Entity, StorageError>;

    /// Makes an id reusable. `next` is the removed handle with its version
    /// already bumped.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn destroy(&mut self, next: Entity) -> Result<(), StorageError>;
}

/// Opaque blobs saved alongside the tables.
pub trait StateStore: Send + Sync {
    /// Stores a blob.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn save(&mut self, key: StateKey, bytes: &[u8]) -> Result<(), StorageError>;

    /// Loads a blob, if one was saved.
    ///
    /// # Errors
    ///
    /// Returns a backend error.
    fn load(&self, key: StateKey) -> Result<Option<Vec<u8>>, StorageError>;
}
