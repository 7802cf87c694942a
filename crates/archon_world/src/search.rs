//! Searches over a world's entities.
//!
//! A [`Search`] pairs a [`Filter`] with a cache of the archetypes it has
//! matched so far, one cache per world. Each evaluation only asks the index
//! about archetypes created since the previous one, so a long-lived search
//! stays cheap as a world grows. The cache is keyed by [`WorldId`], which is
//! what makes sharing one search across several worlds safe. An entry filled
//! by a different [`World`] instance under the same id is rebuilt.
//!
//! [`AndSearch`], [`OrSearch`] and [`NotSearch`] combine whole searches
//! rather than filters. Their results are deduplicated and sorted by entity.

use std::collections::BTreeSet;

use archon_component::{ArchetypeId, Component, ConfigError, Entity, Filter};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::WorldError;
use crate::world::{World, WorldId};

type Predicate = Box<dyn Fn(&World, Entity) -> Result<bool, WorldError> + Send + Sync>;

/// Anything that can enumerate matching entities of a world.
///
/// Only [`Searchable::each`] is required; the rest are built on it.
pub trait Searchable: Send + Sync {
    /// Calls `f` for every match in order until it returns `false`.
    ///
    /// # Errors
    ///
    /// Returns a storage or decode error raised while evaluating.
    fn each(&self, world: &World, f: &mut dyn FnMut(Entity) -> bool) -> Result<(), WorldError>;

    /// Number of matches.
    ///
    /// # Errors
    ///
    /// As [`Searchable::each`].
    fn count(&self, world: &World) -> Result<usize, WorldError> {
        let mut count = 0;
        self.each(world, &mut |_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// The first match, if any.
    ///
    /// # Errors
    ///
    /// As [`Searchable::each`].
    fn first(&self, world: &World) -> Result<Option<Entity>, WorldError> {
        let mut found = None;
        self.each(world, &mut |entity| {
            found = Some(entity);
            false
        })?;
        Ok(found)
    }

    /// The first match.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoMatch`] when nothing matches.
    fn must_first(&self, world: &World) -> Result<Entity, WorldError> {
        self.first(world)?.ok_or(WorldError::NoMatch)
    }

    /// Every match, in evaluation order.
    ///
    /// # Errors
    ///
    /// As [`Searchable::each`].
    fn collect(&self, world: &World) -> Result<Vec<Entity>, WorldError> {
        let mut out = Vec::new();
        self.each(world, &mut |entity| {
            out.push(entity);
            true
        })?;
        Ok(out)
    }
}

#[derive(Debug, Default)]
struct ArchetypeCache {
    /// The [`World`] instance that filled this entry. Two live worlds may
    /// share a [`WorldId`]; their archetype tables still differ.
    instance: Option<Uuid>,
    archetypes: Vec<ArchetypeId>,
    /// Number of archetypes the world had at the last scan.
    seen: usize,
}

/// A filter plus per-world archetype caches.
///
/// Matches are visited in archetype order, then slot order.
pub struct Search {
    filter: Filter,
    predicates: Vec<Predicate>,
    cache: DashMap<WorldId, ArchetypeCache>,
}

impl std::fmt::Debug for Search {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Search")
            .field("filter", &self.filter)
            .field("predicates", &self.predicates.len())
            .field("cached_worlds", &self.cache.len())
            .finish()
    }
}

impl Search {
    /// Builds a search, rejecting malformed filters up front.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedFilter`].
    pub fn new(filter: Filter) -> Result<Self, ConfigError> {
        filter.validate()?;
        Ok(Self {
            filter,
            predicates: Vec::new(),
            cache: DashMap::new(),
        })
    }

    /// Keeps only entities whose `T` value satisfies `pred`. Entities in a
    /// matching archetype that lack `T` are skipped.
    #[must_use]
    pub fn filter_component<T, F>(mut self, pred: F) -> Self
    where
        T: Component,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Box::new(move |world: &World, entity: Entity| {
            match world.get_component::<T>(entity) {
                Ok(value) => Ok(pred(&value)),
                Err(WorldError::ComponentNotOnEntity { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
        self
    }

    /// The filter this search evaluates.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Drops the cache for `world`.
    pub fn forget(&self, world: &WorldId) {
        self.cache.remove(world);
    }

    /// Matching archetypes, refreshed with any created since the last call.
    fn archetypes(&self, world: &World) -> Vec<ArchetypeId> {
        let total = world.archetype_count();
        let mut cache = self.cache.entry(world.id().clone()).or_default();
        if cache.instance != Some(world.instance()) || cache.seen > total {
            *cache = ArchetypeCache {
                instance: Some(world.instance()),
                ..ArchetypeCache::default()
            };
        }
        if cache.seen < total {
            let fresh: Vec<ArchetypeId> = world.index().search_from(&self.filter, cache.seen).collect();
            cache.archetypes.extend(fresh);
            cache.seen = total;
        }
        // Cloned so the shard lock is released before callbacks run.
        cache.archetypes.clone()
    }

    fn accepts(&self, world: &World, entity: Entity) -> Result<bool, WorldError> {
        for pred in &self.predicates {
            if !pred(world, entity)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Searchable for Search {
    fn each(&self, world: &World, f: &mut dyn FnMut(Entity) -> bool) -> Result<(), WorldError> {
        for id in self.archetypes(world) {
            let archetype = world.archetype(id).ok_or(WorldError::UnknownArchetype(id))?;
            for &entity in archetype.entities() {
                if self.accepts(world, entity)? && !f(entity) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn count(&self, world: &World) -> Result<usize, WorldError> {
        if !self.predicates.is_empty() {
            let mut count = 0;
            self.each(world, &mut |_| {
                count += 1;
                true
            })?;
            return Ok(count);
        }
        Ok(self
            .archetypes(world)
            .into_iter()
            .filter_map(|id| world.archetype(id))
            .map(|a| a.len())
            .sum())
    }
}

// ── Composite searches ──────────────────────────────────────────────────────

fn matched(search: &dyn Searchable, world: &World) -> Result<BTreeSet<Entity>, WorldError> {
    let mut set = BTreeSet::new();
    search.each(world, &mut |entity| {
        set.insert(entity);
        true
    })?;
    Ok(set)
}

fn visit(set: BTreeSet<Entity>, f: &mut dyn FnMut(Entity) -> bool) {
    for entity in set {
        if !f(entity) {
            break;
        }
    }
}

/// Entities matched by every inner search.
pub struct AndSearch {
    searches: Vec<Box<dyn Searchable>>,
}

impl AndSearch {
    /// Intersects `searches`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedFilter`] if `searches` is empty.
    pub fn new(searches: Vec<Box<dyn Searchable>>) -> Result<Self, ConfigError> {
        if searches.is_empty() {
            return Err(ConfigError::MalformedFilter("And needs at least one search"));
        }
        Ok(Self { searches })
    }
}

impl Searchable for AndSearch {
    fn each(&self, world: &World, f: &mut dyn FnMut(Entity) -> bool) -> Result<(), WorldError> {
        let mut inner = self.searches.iter();
        let mut result = match inner.next() {
            Some(first) => matched(first.as_ref(), world)?,
            None => BTreeSet::new(),
        };
        for search in inner {
            if result.is_empty() {
                break;
            }
            let other = matched(search.as_ref(), world)?;
            result.retain(|e| other.contains(e));
        }
        visit(result, f);
        Ok(())
    }
}

/// Entities matched by at least one inner search.
pub struct OrSearch {
    searches: Vec<Box<dyn Searchable>>,
}

impl OrSearch {
    /// Unions `searches`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedFilter`] if `searches` is empty.
    pub fn new(searches: Vec<Box<dyn Searchable>>) -> Result<Self, ConfigError> {
        if searches.is_empty() {
            return Err(ConfigError::MalformedFilter("Or needs at least one search"));
        }
        Ok(Self { searches })
    }
}

impl Searchable for OrSearch {
    fn each(&self, world: &World, f: &mut dyn FnMut(Entity) -> bool) -> Result<(), WorldError> {
        let mut result = BTreeSet::new();
        for search in &self.searches {
            result.extend(matched(search.as_ref(), world)?);
        }
        visit(result, f);
        Ok(())
    }
}

/// Every live entity the inner search does not match.
pub struct NotSearch {
    inner: Box<dyn Searchable>,
    all: Search,
}

impl NotSearch {
    /// Complements `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Searchable>) -> Self {
        Self {
            inner,
            all: Search {
                filter: Filter::All,
                predicates: Vec::new(),
                cache: DashMap::new(),
            },
        }
    }
}

impl Searchable for NotSearch {
    fn each(&self, world: &World, f: &mut dyn FnMut(Entity) -> bool) -> Result<(), WorldError> {
        let excluded = matched(self.inner.as_ref(), world)?;
        let mut result = matched(&self.all, world)?;
        result.retain(|e| !excluded.contains(e));
        visit(result, f);
        Ok(())
    }
}
