//! # archon_component
//!
//! The vocabulary of the archon storage engine: what an entity is, how
//! component types are registered and encoded, and how archetypes and the
//! filters that select them are shaped.
//!
//! This crate provides:
//!
//! - [`Entity`]: versioned `u64` entity handles, and [`EntityAllocator`].
//! - [`Component`] / [`ComponentRegistry`]: explicit component registration.
//! - [`Layout`] / [`Archetype`]: component sets and the entities sharing one.
//! - [`Filter`]: boolean predicates over layouts.
//! - [`codec`]: MessagePack helpers used for every stored value.

pub mod archetype;
pub mod codec;
pub mod component;
pub mod entity;
pub mod error;
pub mod filter;
pub mod registry;

pub use archetype::{Archetype, ArchetypeId, Layout, SlotIndex};
pub use component::{Component, ComponentMeta, ComponentSchema, ComponentTypeId};
pub use entity::{Entity, EntityAllocator, EntityId};
pub use error::{CodecError, ConfigError};
pub use filter::Filter;
pub use registry::ComponentRegistry;
