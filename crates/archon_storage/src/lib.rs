//! # archon_storage
//!
//! Where a world's data lives.
//!
//! This crate provides:
//!
//! - [`store`]: the storage contracts every backend implements.
//! - [`memory`]: the in-process backend.
//! - [`redis_backend`]: the Redis backend and its atomic list scripts.
//! - [`keys`]: the Redis key layout.
//! - [`connection`] / [`config`]: Redis connection management.
//! - [`index`]: the archetype search index.
//! - [`error`]: storage-layer error types.

pub mod config;
pub mod connection;
pub mod error;
pub mod index;
pub mod keys;
pub mod memory;
pub mod redis_backend;
pub mod store;

use std::sync::Arc;

pub use config::RedisConfig;
pub use connection::RedisConnection;
pub use error::StorageError;
pub use index::SearchIndex;
pub use store::{
    ComponentIndexStore, ComponentOp, ComponentStore, Entry, EntityManager, EntryStore, Location,
    LocationStore, StateKey, StateStore,
};

/// Every store a world needs, from one backend.
pub struct WorldStorage {
    /// Component tables.
    pub components: Box<dyn ComponentStore>,
    /// Per-archetype slot counters.
    pub component_index: Box<dyn ComponentIndexStore>,
    /// Entity locations.
    pub locations: Box<dyn LocationStore>,
    /// Entry records.
    pub entries: Box<dyn EntryStore>,
    /// Entity handle allocation.
    pub entities: Box<dyn EntityManager>,
    /// Saved archetype table and schemas.
    pub state: Box<dyn StateStore>,
    backend: &'static str,
}

impl WorldStorage {
    /// Fresh in-process storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            components: Box::new(memory::MemoryComponentStore::new()),
            component_index: Box::new(memory::MemoryComponentIndex::new()),
            locations: Box::new(memory::MemoryLocationStore::new()),
            entries: Box::new(memory::MemoryEntryStore::new()),
            entities: Box::new(memory::MemoryEntityManager::new()),
            state: Box::new(memory::MemoryStateStore::new()),
            backend: "memory",
        }
    }

    /// Redis storage sharing one connection.
    #[must_use]
    pub fn redis(conn: Arc<RedisConnection>) -> Self {
        Self {
            components: Box::new(redis_backend::RedisComponentStore::new(Arc::clone(&conn))),
            component_index: Box::new(redis_backend::RedisComponentIndex::new(Arc::clone(&conn))),
            locations: Box::new(redis_backend::RedisLocationStore::new(Arc::clone(&conn))),
            entries: Box::new(redis_backend::RedisEntryStore::new(Arc::clone(&conn))),
            entities: Box::new(redis_backend::RedisEntityManager::new(Arc::clone(&conn))),
            state: Box::new(redis_backend::RedisStateStore::new(conn)),
            backend: "redis",
        }
    }

    /// `"memory"` or `"redis"`.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

impl std::fmt::Debug for WorldStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldStorage")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
