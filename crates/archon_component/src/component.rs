//! Core [`Component`] trait and component type metadata.
//!
//! A component type is identified by a small [`ComponentTypeId`] handed out by
//! a [`ComponentRegistry`](crate::registry::ComponentRegistry) at registration
//! time. Ids are never derived from the Rust type itself; the registry maps a
//! component's [`Component::type_name`] to its id.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A registry-assigned component type identifier. Ids start at 1 and are
/// never reused by the registry that assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentTypeId(pub u32);

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The core component trait.
///
/// Component values are stored as opaque MessagePack blobs, so the only
/// requirements are serde support and a unique, stable name.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use archon_component::Component;
///
/// #[derive(Debug, Default, Clone, Serialize, Deserialize)]
/// struct Energy {
///     amt: i64,
///     cap: i64,
/// }
///
/// impl Component for Energy {
///     fn type_name() -> &'static str { "Energy" }
/// }
/// ```
pub trait Component: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// A human-readable name for this component type. Must be unique within
    /// a registry.
    fn type_name() -> &'static str;
}

/// Everything the engine knows about one registered component type.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    /// The registry-assigned id.
    pub id: ComponentTypeId,
    /// The unique component name.
    pub name: String,
    /// Encoded default value, pushed into a fresh slot when an entity gains
    /// this component.
    pub default_bytes: Vec<u8>,
}

impl ComponentMeta {
    /// Builds the persisted schema record for this component.
    #[must_use]
    pub fn schema(&self) -> ComponentSchema {
        ComponentSchema {
            id: self.id,
            name: self.name.clone(),
            shape: shape_of_encoded(&self.default_bytes),
        }
    }
}

/// A component's identity and value shape, saved alongside persisted state
/// so a restart can detect that a component changed under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSchema {
    /// Registry id at the time the schema was recorded.
    pub id: ComponentTypeId,
    /// Component name.
    pub name: String,
    /// Field names and value kinds of the encoded default value.
    pub shape: Value,
}

/// Describes the shape of a named-MessagePack blob: maps keep their keys,
/// leaves collapse to a kind string.
#[must_use]
pub fn shape_of_encoded(bytes: &[u8]) -> Value {
    match rmp_serde::from_slice::<Value>(bytes) {
        Ok(value) => shape_of(&value),
        Err(_) => Value::String("opaque".to_owned()),
    }
}

fn shape_of(value: &Value) -> Value {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(fields) => {
            return Value::Object(
                fields
                    .iter()
                    .map(|(key, field)| (key.clone(), shape_of(field)))
                    .collect(),
            );
        }
    };
    Value::String(kind.to_owned())
}
