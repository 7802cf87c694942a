//! # archon_world
//!
//! The orchestration layer of the archon storage engine.
//!
//! This crate provides:
//!
//! - [`World`]: entity create/remove, component add/remove through archetype
//!   transfer, validity checks, entry records and saved state.
//! - [`Search`] and the [`Searchable`] trait: cached archetype searches with
//!   `each`/`count`/`first`/`collect`, plus [`AndSearch`], [`OrSearch`] and
//!   [`NotSearch`] over whole searches.
//! - [`WorldError`]: the error taxonomy callers see.

pub mod error;
pub mod search;
pub mod world;

pub use error::WorldError;
pub use search::{AndSearch, NotSearch, OrSearch, Search, Searchable};
pub use world::{World, WorldId};
