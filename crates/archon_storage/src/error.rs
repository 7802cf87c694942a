//! Storage-layer error types.

use archon_component::{ArchetypeId, CodecError, ComponentTypeId, EntityId, SlotIndex};

/// Errors raised by a storage backend.
///
/// These are infrastructure failures or violated bookkeeping, never ordinary
/// "entity not found" conditions; callers decide whether they are fatal.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Redis connection, command or script error.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored value could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A component table has no value at the requested slot.
    #[error("component {component} has no slot {slot} in archetype {archetype}")]
    SlotOutOfRange {
        /// Component table.
        component: ComponentTypeId,
        /// Archetype within the table.
        archetype: ArchetypeId,
        /// The missing slot.
        slot: SlotIndex,
    },

    /// An entity id that was expected to have a location record has none.
    #[error("no location recorded for entity id {0}")]
    MissingLocation(EntityId),

    /// A backend reply that does not fit the expected shape.
    #[error("unexpected backend reply: {0}")]
    UnexpectedReply(String),

    /// A previous panic while holding the connection lock.
    #[error("storage connection lock poisoned")]
    Poisoned,
}
