//! Component type registry.
//!
//! The registry is built once at startup and then shared (behind an `Arc`)
//! with every world that stores these components. It owns the id counter, so
//! several registries in one process never race on a global.

use std::collections::HashMap;

use tracing::debug;

use crate::codec;
use crate::component::{Component, ComponentMeta, ComponentSchema, ComponentTypeId};
use crate::error::{CodecError, ConfigError};

/// Maps component names to ids and holds each type's default value.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    /// Indexed by `id - 1`.
    metas: Vec<ComponentMeta>,
    by_name: HashMap<String, ComponentTypeId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` with `T::default()` as its default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateComponentName`] if a component with the
    /// same name is already registered.
    pub fn register<T: Component + Default>(&mut self) -> Result<ComponentTypeId, ConfigError> {
        self.register_with_default(T::default())
    }

    /// Registers `T` with an explicit default value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateComponentName`] on a name clash and
    /// [`ConfigError::InvalidDefault`] if the default cannot be encoded.
    pub fn register_with_default<T: Component>(
        &mut self,
        default: T,
    ) -> Result<ComponentTypeId, ConfigError> {
        let name = T::type_name();
        if self.by_name.contains_key(name) {
            return Err(ConfigError::DuplicateComponentName(name.to_owned()));
        }
        let default_bytes = codec::encode(&default).map_err(|e| ConfigError::InvalidDefault {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;

        let id = ComponentTypeId(self.metas.len() as u32 + 1);
        self.metas.push(ComponentMeta {
            id,
            name: name.to_owned(),
            default_bytes,
        });
        self.by_name.insert(name.to_owned(), id);
        debug!(component = name, id = id.0, "registered component");
        Ok(id)
    }

    /// Returns the id registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnregisteredComponent`] if `T` was never
    /// registered.
    pub fn id_of<T: Component>(&self) -> Result<ComponentTypeId, ConfigError> {
        self.id_by_name(T::type_name())
            .ok_or_else(|| ConfigError::UnregisteredComponent(T::type_name().to_owned()))
    }

    /// Looks up an id by component name.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the metadata for a registered id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownComponentId`] if the id was not assigned
    /// by this registry.
    pub fn meta(&self, id: ComponentTypeId) -> Result<&ComponentMeta, ConfigError> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|idx| self.metas.get(idx))
            .ok_or(ConfigError::UnknownComponentId(id))
    }

    /// Returns the name registered for an id, or `"?"` for unknown ids.
    #[must_use]
    pub fn name_of(&self, id: ComponentTypeId) -> &str {
        self.meta(id).map_or("?", |m| m.name.as_str())
    }

    /// Returns `true` if `id` was assigned by this registry.
    #[must_use]
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        self.meta(id).is_ok()
    }

    /// Encodes a component value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] on serialisation failure.
    pub fn encode<T: Component>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        codec::encode(value)
    }

    /// Decodes a component value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] on corrupt or mismatched bytes.
    pub fn decode<T: Component>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        codec::decode(bytes)
    }

    /// Schemas of every registered component, in id order.
    #[must_use]
    pub fn schemas(&self) -> Vec<ComponentSchema> {
        self.metas.iter().map(ComponentMeta::schema).collect()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Iterates over all registered component metadata in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }
}
