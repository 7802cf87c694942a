//! World-level error types.

use archon_component::{ArchetypeId, CodecError, ConfigError, Entity};
use archon_storage::StorageError;

/// Errors returned by [`World`](crate::World) and searches.
///
/// The first group are data conditions a caller is expected to handle. The
/// wrapped [`ConfigError`] means the world or a search was set up wrongly,
/// and [`StorageError`] means the backend failed.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The handle is null, removed, or from an earlier life of its id.
    #[error("{0} is not a live entity")]
    InvalidEntity(Entity),

    /// The entity already has the component being added.
    #[error("{entity} already has component '{component}'")]
    ComponentAlreadyOnEntity {
        /// The entity.
        entity: Entity,
        /// Component name.
        component: String,
    },

    /// The entity lacks the component being read, written or removed.
    #[error("{entity} does not have component '{component}'")]
    ComponentNotOnEntity {
        /// The entity.
        entity: Entity,
        /// Component name.
        component: String,
    },

    /// An entity must always have at least one component.
    #[error("an entity must have at least one component")]
    NoComponents,

    /// Saved state was written with a different component definition.
    #[error("component '{0}' does not match the saved state")]
    ComponentMismatchWithSavedState(String),

    /// An archetype id this world never created.
    #[error("archetype {0} does not exist")]
    UnknownArchetype(ArchetypeId),

    /// A search that had to find something found nothing.
    #[error("search matched no entity")]
    NoMatch,

    /// Archetype lists, locations and tables disagree.
    #[error("inconsistent world state: {0}")]
    Inconsistent(String),

    /// Components, layouts or filters set up wrongly.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A component value failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The saved schema snapshot is not valid JSON.
    #[error("malformed schema snapshot: {0}")]
    Schema(#[from] serde_json::Error),
}

impl WorldError {
    /// Returns `true` for setup mistakes rather than runtime conditions.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, WorldError::Config(_))
    }
}
