//! Configuration and codec error types.

use crate::component::ComponentTypeId;

/// Mistakes in how components, layouts or filters were set up.
///
/// These are surfaced at registration, world-setup or search-construction
/// time and indicate a programming or configuration error rather than a
/// runtime data condition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Two component types were registered under the same name.
    #[error("component with name '{0}' is already registered")]
    DuplicateComponentName(String),

    /// A component type was used without being registered first.
    #[error("component '{0}' is not registered")]
    UnregisteredComponent(String),

    /// A component type id that the registry never assigned.
    #[error("component type id {0} is not registered")]
    UnknownComponentId(ComponentTypeId),

    /// The same component type appeared twice in a requested component set.
    #[error("duplicate component type {0} in component set")]
    DuplicateComponentInLayout(ComponentTypeId),

    /// A filter that can never be evaluated meaningfully.
    #[error("malformed filter: {0}")]
    MalformedFilter(&'static str),

    /// The registered default value could not be encoded.
    #[error("default value of component '{name}' cannot be encoded: {reason}")]
    InvalidDefault {
        /// Component name.
        name: String,
        /// Encoder message.
        reason: String,
    },
}

/// Errors raised while converting component values to and from bytes.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a value to MessagePack.
    #[error("failed to encode value: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a value from MessagePack.
    #[error("failed to decode value: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
