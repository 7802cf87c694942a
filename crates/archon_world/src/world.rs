//! The world orchestrator.
//!
//! A [`World`] keeps three structures in step: the in-memory archetype entity
//! lists, the component tables and the entity location store. Every
//! structural change goes through the same staged sequence: validate and
//! build the component ops first, commit them with one
//! [`ComponentStore::apply`](archon_storage::ComponentStore::apply), then
//! update the archetype lists and commit the location changes together.

use std::sync::Arc;

use archon_component::{
    Archetype, ArchetypeId, Component, ComponentRegistry, ComponentSchema, ComponentTypeId,
    Entity, EntityId, Layout, SlotIndex, codec,
};
use archon_storage::{
    ComponentOp, Entry, Location, RedisConfig, RedisConnection, SearchIndex, StateKey,
    WorldStorage,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::WorldError;

/// Opaque world identifier. Doubles as the Redis key namespace and as the
/// key of every search's per-world cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(String);

impl WorldId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh, globally unique identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One archetype as written by [`World::save_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedArchetype {
    id: ArchetypeId,
    components: Vec<ComponentTypeId>,
    entities: Vec<Entity>,
}

/// Entities, their archetypes and their component values.
///
/// Not internally synchronised: one logical writer at a time.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    /// Distinguishes this instance from any other opened under the same id.
    instance: Uuid,
    registry: Arc<ComponentRegistry>,
    /// Indexed by [`ArchetypeId`].
    archetypes: Vec<Archetype>,
    index: SearchIndex,
    storage: WorldStorage,
}

impl World {
    /// Opens a world over `storage`, restoring any saved archetype table.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ComponentMismatchWithSavedState`] if a saved
    /// component schema disagrees with `registry`, or a storage error.
    pub fn new(
        id: WorldId,
        registry: Arc<ComponentRegistry>,
        storage: WorldStorage,
    ) -> Result<Self, WorldError> {
        let mut world = Self {
            id,
            instance: Uuid::new_v4(),
            registry,
            archetypes: Vec::new(),
            index: SearchIndex::new(),
            storage,
        };
        world.load_state()?;
        Ok(world)
    }

    /// A fresh in-memory world with a random id.
    #[must_use]
    pub fn in_memory(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            id: WorldId::random(),
            instance: Uuid::new_v4(),
            registry,
            archetypes: Vec::new(),
            index: SearchIndex::new(),
            storage: WorldStorage::in_memory(),
        }
    }

    /// Connects to Redis and opens the world named by `config.namespace`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the connection fails, or any error of
    /// [`World::new`].
    pub fn with_redis(
        registry: Arc<ComponentRegistry>,
        config: RedisConfig,
    ) -> Result<Self, WorldError> {
        let id = WorldId::new(config.namespace.clone());
        let conn = Arc::new(RedisConnection::connect(config)?);
        Self::new(id, registry, WorldStorage::redis(conn))
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// The world id.
    #[must_use]
    pub fn id(&self) -> &WorldId {
        &self.id
    }

    pub(crate) fn instance(&self) -> Uuid {
        self.instance
    }

    /// The component registry this world was opened with.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The archetype search index.
    #[must_use]
    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// The archetype with the given id.
    #[must_use]
    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// All archetypes, in id order.
    #[must_use]
    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Number of archetypes created so far.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Name of the storage backend.
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.storage.backend()
    }

    /// Number of live entities.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn len(&self) -> Result<usize, WorldError> {
        Ok(self.storage.locations.len()?)
    }

    /// Returns `true` if no entity is live.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn is_empty(&self) -> Result<bool, WorldError> {
        Ok(self.len()? == 0)
    }

    /// The registry id of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if `T` is not registered.
    pub fn component_id<T: Component>(&self) -> Result<ComponentTypeId, WorldError> {
        Ok(self.registry.id_of::<T>()?)
    }

    // ── Entity lifecycle ────────────────────────────────────────────────────

    /// Creates an entity holding default values of `components`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NoComponents`] for an empty set and
    /// [`WorldError::Config`] for repeated or unregistered component types.
    pub fn create(&mut self, components: &[ComponentTypeId]) -> Result<Entity, WorldError> {
        let archetype = self.archetype_for(components)?;
        self.create_in(archetype)
    }

    /// Creates `count` entities holding default values of `components`.
    ///
    /// # Errors
    ///
    /// As [`World::create`]; entities created before a failure remain.
    pub fn create_many(
        &mut self,
        count: usize,
        components: &[ComponentTypeId],
    ) -> Result<Vec<Entity>, WorldError> {
        let archetype = self.archetype_for(components)?;
        (0..count).map(|_| self.create_in(archetype)).collect()
    }

    /// Removes an entity, compacting its archetype and every component table
    /// it occupied. The handle goes stale; its id is recycled with a bumped
    /// version.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`] for a handle that is not live.
    pub fn remove(&mut self, entity: Entity) -> Result<(), WorldError> {
        let location = self.location_of(entity)?;
        let (arch, slot) = (location.archetype, location.slot);
        let archetype = &self.archetypes[arch.index()];
        let ops: Vec<ComponentOp> = archetype
            .layout()
            .components()
            .iter()
            .map(|&component| ComponentOp::SwapRemove {
                component,
                archetype: arch,
                slot,
            })
            .collect();

        self.storage.components.apply(&ops)?;
        let swapped = swap_out(&mut self.archetypes[arch.index()], slot);

        let mut updates = vec![(
            entity,
            Location {
                valid: false,
                ..location
            },
        )];
        if let Some(moved) = swapped {
            updates.push((moved, Location::new(arch, slot)));
        }
        self.commit_locations(&updates, -1)?;
        self.storage.entries.remove_entry(entity.id())?;
        self.storage.component_index.decrement(arch)?;
        match entity.next_version() {
            Some(next) => self.storage.entities.destroy(next)?,
            None => debug!(%entity, "entity id retired"),
        }
        debug!(%entity, archetype = %arch, slot, "removed entity");
        Ok(())
    }

    /// Returns `true` if `entity` is live: not null, located, and the exact
    /// handle (version included) sits at its recorded slot.
    ///
    /// # Errors
    ///
    /// Returns a storage error; a stale handle is `Ok(false)`.
    pub fn valid(&self, entity: Entity) -> Result<bool, WorldError> {
        match self.location_of(entity) {
            Ok(_) => Ok(true),
            Err(WorldError::InvalidEntity(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The entity's current record. The persisted copy is refreshed too.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`] for a handle that is not live.
    pub fn entry(&mut self, entity: Entity) -> Result<Entry, WorldError> {
        let location = self.location_of(entity)?;
        let entry = Entry {
            id: entity.id(),
            entity,
            location,
        };
        self.storage.entries.set_entry(&entry)?;
        Ok(entry)
    }

    /// The current location of a live entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`] for a handle that is not live.
    pub fn location_of(&self, entity: Entity) -> Result<Location, WorldError> {
        if entity.is_null() {
            return Err(WorldError::InvalidEntity(entity));
        }
        let location = self
            .storage
            .locations
            .location(entity.id())?
            .filter(|loc| loc.valid)
            .ok_or(WorldError::InvalidEntity(entity))?;
        let occupant = self
            .archetype(location.archetype)
            .and_then(|a| a.entity_at(location.slot));
        if occupant != Some(entity) {
            return Err(WorldError::InvalidEntity(entity));
        }
        Ok(location)
    }

    // ── Components ──────────────────────────────────────────────────────────

    /// Reads a component value.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`], [`WorldError::ComponentNotOnEntity`]
    /// or a decode error.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<T, WorldError> {
        let component = self.component_id::<T>()?;
        let bytes = self.component_bytes(entity, component)?;
        Ok(self.registry.decode(&bytes)?)
    }

    /// Overwrites a component value.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`], [`WorldError::ComponentNotOnEntity`]
    /// or an encode error.
    pub fn set_component<T: Component>(
        &mut self,
        entity: Entity,
        value: &T,
    ) -> Result<(), WorldError> {
        let component = self.component_id::<T>()?;
        let bytes = self.registry.encode(value)?;
        self.set_component_bytes(entity, component, &bytes)
    }

    /// Adds `T` with its default value, moving the entity to the archetype
    /// with `T` added.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ComponentAlreadyOnEntity`] if `T` is present.
    pub fn add_component<T: Component>(&mut self, entity: Entity) -> Result<(), WorldError> {
        let component = self.component_id::<T>()?;
        self.add_component_by_id(entity, component)
    }

    /// Adds `T` and sets it to `value`.
    ///
    /// # Errors
    ///
    /// As [`World::add_component`] and [`World::set_component`].
    pub fn add_component_with<T: Component>(
        &mut self,
        entity: Entity,
        value: &T,
    ) -> Result<(), WorldError> {
        self.add_component::<T>(entity)?;
        self.set_component(entity, value)
    }

    /// Removes `T`, moving the entity to the archetype without it.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ComponentNotOnEntity`] if `T` is absent and
    /// [`WorldError::NoComponents`] if `T` is the entity's last component.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), WorldError> {
        let component = self.component_id::<T>()?;
        self.remove_component_by_id(entity, component)
    }

    /// Reads the encoded value of `component`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`] or
    /// [`WorldError::ComponentNotOnEntity`].
    pub fn component_bytes(
        &self,
        entity: Entity,
        component: ComponentTypeId,
    ) -> Result<Vec<u8>, WorldError> {
        let location = self.location_with(entity, component)?;
        Ok(self
            .storage
            .components
            .component(component, location.archetype, location.slot)?)
    }

    /// Overwrites the encoded value of `component`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidEntity`] or
    /// [`WorldError::ComponentNotOnEntity`].
    pub fn set_component_bytes(
        &mut self,
        entity: Entity,
        component: ComponentTypeId,
        bytes: &[u8],
    ) -> Result<(), WorldError> {
        let location = self.location_with(entity, component)?;
        self.storage
            .components
            .set_component(component, location.archetype, location.slot, bytes)?;
        Ok(())
    }

    /// [`World::add_component`] by registry id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ComponentAlreadyOnEntity`] if it is present.
    pub fn add_component_by_id(
        &mut self,
        entity: Entity,
        component: ComponentTypeId,
    ) -> Result<(), WorldError> {
        self.registry.meta(component)?;
        let location = self.location_of(entity)?;
        let layout = self.archetypes[location.archetype.index()].layout();
        if layout.has_component(component) {
            return Err(WorldError::ComponentAlreadyOnEntity {
                entity,
                component: self.registry.name_of(component).to_owned(),
            });
        }
        let extended = layout.with(component);
        let target = self.get_or_create_archetype(extended);
        self.transfer_archetype(location.archetype, target, location.slot)?;
        Ok(())
    }

    /// [`World::remove_component`] by registry id.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ComponentNotOnEntity`] if it is absent and
    /// [`WorldError::NoComponents`] if it is the entity's last component.
    pub fn remove_component_by_id(
        &mut self,
        entity: Entity,
        component: ComponentTypeId,
    ) -> Result<(), WorldError> {
        let location = self.location_with(entity, component)?;
        let remaining = self.archetypes[location.archetype.index()]
            .layout()
            .without(component);
        if remaining.is_empty() {
            return Err(WorldError::NoComponents);
        }
        let target = self.get_or_create_archetype(remaining);
        self.transfer_archetype(location.archetype, target, location.slot)?;
        Ok(())
    }

    // ── Archetype transfer ──────────────────────────────────────────────────

    /// Moves the entity at `slot` of `from` into `to` and returns its new slot.
    ///
    /// Components only `to` has get default values, components both have are
    /// moved, components only `from` has are dropped. The entity that fills
    /// the vacated slot of `from` has its location fixed up in the same
    /// location commit as the moved entity.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::UnknownArchetype`] or
    /// [`WorldError::Inconsistent`] before anything is changed, or a storage
    /// error from the commit.
    pub fn transfer_archetype(
        &mut self,
        from: ArchetypeId,
        to: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<SlotIndex, WorldError> {
        if from == to {
            return Ok(slot);
        }
        let source = self.archetype(from).ok_or(WorldError::UnknownArchetype(from))?;
        let target = self.archetype(to).ok_or(WorldError::UnknownArchetype(to))?;
        let entity = source.entity_at(slot).ok_or_else(|| {
            WorldError::Inconsistent(format!("archetype {from} has no slot {slot}"))
        })?;
        let new_slot = target.len();

        let mut ops = Vec::new();
        for &component in target.layout().components() {
            if !source.layout().has_component(component) {
                ops.push(ComponentOp::Push {
                    component,
                    archetype: to,
                    bytes: self.registry.meta(component)?.default_bytes.clone(),
                });
            }
        }
        for &component in source.layout().components() {
            if target.layout().has_component(component) {
                ops.push(ComponentOp::Move {
                    component,
                    from,
                    slot,
                    to,
                });
            } else {
                ops.push(ComponentOp::SwapRemove {
                    component,
                    archetype: from,
                    slot,
                });
            }
        }

        self.storage.components.apply(&ops)?;
        let swapped = swap_out(&mut self.archetypes[from.index()], slot);
        self.archetypes[to.index()].push_entity(entity);

        let mut updates = vec![(entity, Location::new(to, new_slot))];
        if let Some(moved) = swapped {
            updates.push((moved, Location::new(from, slot)));
        }
        self.commit_locations(&updates, 0)?;
        self.storage.component_index.decrement(from)?;
        self.storage.component_index.increment(to)?;

        debug!(%entity, %from, %to, slot, new_slot, "transferred entity");
        Ok(new_slot)
    }

    // ── Saved state ─────────────────────────────────────────────────────────

    /// Persists the archetype table and the component schemas so a later
    /// [`World::new`] over the same storage can restore them.
    ///
    /// # Errors
    ///
    /// Returns an encode or storage error.
    pub fn save_state(&mut self) -> Result<(), WorldError> {
        let saved: Vec<SavedArchetype> = self
            .archetypes
            .iter()
            .map(|a| SavedArchetype {
                id: a.id(),
                components: a.layout().components().to_vec(),
                entities: a.entities().to_vec(),
            })
            .collect();
        let schemas = serde_json::to_vec(&self.registry.schemas())?;
        self.storage
            .state
            .save(StateKey::Archetypes, &codec::encode(&saved)?)?;
        self.storage.state.save(StateKey::Schema, &schemas)?;
        info!(world = %self.id, archetypes = saved.len(), "saved world state");
        Ok(())
    }

    fn load_state(&mut self) -> Result<(), WorldError> {
        if let Some(bytes) = self.storage.state.load(StateKey::Schema)? {
            let saved: Vec<ComponentSchema> = serde_json::from_slice(&bytes)?;
            for schema in &saved {
                let current = self.registry.meta(schema.id).map(|m| m.schema());
                if current.as_ref().ok() != Some(schema) {
                    warn!(world = %self.id, component = %schema.name, "saved component schema does not match registry");
                    return Err(WorldError::ComponentMismatchWithSavedState(schema.name.clone()));
                }
            }
        }

        let Some(bytes) = self.storage.state.load(StateKey::Archetypes)? else {
            return Ok(());
        };
        let saved: Vec<SavedArchetype> = codec::decode(&bytes)?;
        for (position, archetype) in saved.into_iter().enumerate() {
            if archetype.id.index() != position {
                return Err(WorldError::Inconsistent(format!(
                    "saved archetype {} stored at position {position}",
                    archetype.id
                )));
            }
            for &component in &archetype.components {
                self.registry.meta(component).map_err(|_| {
                    WorldError::ComponentMismatchWithSavedState(component.to_string())
                })?;
            }
            let layout = Layout::from_unique(&archetype.components)?;
            self.index.push(layout.clone());
            self.archetypes.push(Archetype::with_entities(
                archetype.id,
                layout,
                archetype.entities,
            ));
        }
        info!(world = %self.id, archetypes = self.archetypes.len(), "loaded saved world state");
        Ok(())
    }

    // ── Consistency ─────────────────────────────────────────────────────────

    /// Verifies that every live entity's location and entry record point
    /// back at it, that
    /// every component table of every archetype is exactly as long as the
    /// archetype, and that the live count matches.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Inconsistent`] describing the first violation.
    pub fn check_consistency(&self) -> Result<(), WorldError> {
        let mut total = 0;
        for archetype in &self.archetypes {
            let id = archetype.id();
            let len = archetype.len();
            total += len;

            let counted = self.storage.component_index.count(id)?;
            if counted != len {
                return Err(WorldError::Inconsistent(format!(
                    "archetype {id} has {len} entities but a slot count of {counted}"
                )));
            }
            for &component in archetype.layout().components() {
                let stored = self.storage.components.len(component, id)?;
                if stored != len {
                    return Err(WorldError::Inconsistent(format!(
                        "archetype {id} has {len} entities but {stored} values of component {component}"
                    )));
                }
            }
            for (slot, &entity) in archetype.entities().iter().enumerate() {
                let location = self.storage.locations.location(entity.id())?;
                if location != Some(Location::new(id, slot)) {
                    return Err(WorldError::Inconsistent(format!(
                        "{entity} sits at ({id}, {slot}) but is recorded at {location:?}"
                    )));
                }
                let entry = self.storage.entries.entry(entity.id())?;
                let expected = Entry {
                    id: entity.id(),
                    entity,
                    location: Location::new(id, slot),
                };
                if entry != Some(expected) {
                    return Err(WorldError::Inconsistent(format!(
                        "{entity} sits at ({id}, {slot}) but its entry is {entry:?}"
                    )));
                }
            }
        }
        let live = self.len()?;
        if live != total {
            return Err(WorldError::Inconsistent(format!(
                "{total} entities in archetypes but a live count of {live}"
            )));
        }
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn archetype_for(&mut self, components: &[ComponentTypeId]) -> Result<ArchetypeId, WorldError> {
        if components.is_empty() {
            return Err(WorldError::NoComponents);
        }
        let layout = Layout::from_unique(components)?;
        for &component in layout.components() {
            self.registry.meta(component)?;
        }
        Ok(self.get_or_create_archetype(layout))
    }

    fn get_or_create_archetype(&mut self, layout: Layout) -> ArchetypeId {
        if let Some(id) = self.index.find(&layout) {
            return id;
        }
        let id = self.index.push(layout.clone());
        debug!(world = %self.id, archetype = %id, %layout, "created archetype");
        self.archetypes.push(Archetype::new(id, layout));
        id
    }

    fn create_in(&mut self, arch: ArchetypeId) -> Result<Entity, WorldError> {
        let slot = self.archetypes[arch.index()].len();
        let reserved = self.storage.component_index.count(arch)?;
        if reserved != slot {
            return Err(WorldError::Inconsistent(format!(
                "archetype {arch} has {slot} entities but a slot count of {reserved}"
            )));
        }
        let ops = self.archetypes[arch.index()]
            .layout()
            .components()
            .iter()
            .map(|&component| {
                Ok(ComponentOp::Push {
                    component,
                    archetype: arch,
                    bytes: self.registry.meta(component)?.default_bytes.clone(),
                })
            })
            .collect::<Result<Vec<_>, WorldError>>()?;

        // Components first: nothing else has changed if this fails.
        if let Err(err) = self.storage.components.apply(&ops) {
            self.discard_create(arch, slot, None);
            return Err(err.into());
        }
        let entity = match self.storage.entities.new_entity() {
            Ok(entity) => entity,
            Err(err) => {
                self.discard_create(arch, slot, None);
                return Err(err.into());
            }
        };
        if let Err(err) = self.commit_create(arch, slot, entity) {
            self.discard_create(arch, slot, Some(entity));
            return Err(err);
        }
        self.archetypes[arch.index()].push_entity(entity);
        debug!(%entity, archetype = %arch, slot, "created entity");
        Ok(entity)
    }

    fn commit_create(
        &mut self,
        arch: ArchetypeId,
        slot: SlotIndex,
        entity: Entity,
    ) -> Result<(), WorldError> {
        self.storage.component_index.increment(arch)?;
        self.commit_locations(&[(entity, Location::new(arch, slot))], 1)
    }

    /// Undoes a create that failed partway: the archetype's tables and slot
    /// counter go back to `slot` entries and an allocated handle is returned
    /// unused. Failures here are logged, not raised, so the caller sees the
    /// original error.
    fn discard_create(&mut self, arch: ArchetypeId, slot: SlotIndex, entity: Option<Entity>) {
        if let Err(err) = self.try_discard_create(arch, slot, entity) {
            warn!(world = %self.id, archetype = %arch, error = %err, "could not undo failed create");
        }
    }

    fn try_discard_create(
        &mut self,
        arch: ArchetypeId,
        slot: SlotIndex,
        entity: Option<Entity>,
    ) -> Result<(), WorldError> {
        let layout = self.archetypes[arch.index()].layout().clone();
        for &component in layout.components() {
            let mut len = self.storage.components.len(component, arch)?;
            while len > slot {
                self.storage.components.swap_remove(component, arch, len - 1)?;
                len -= 1;
            }
        }
        let Some(entity) = entity else {
            return Ok(());
        };
        if self.storage.component_index.count(arch)? > slot {
            self.storage.component_index.decrement(arch)?;
        }
        if self.storage.locations.contains_entity(entity.id())? {
            let dead = Location {
                valid: false,
                ..Location::new(arch, slot)
            };
            self.storage.locations.commit(&[(entity.id(), dead)], -1)?;
        }
        self.storage.entries.remove_entry(entity.id())?;
        self.storage.entities.destroy(entity)?;
        Ok(())
    }

    /// Commits location changes as one step, then refreshes the entry records
    /// of the entities that are still live.
    fn commit_locations(
        &mut self,
        updates: &[(Entity, Location)],
        live_delta: i64,
    ) -> Result<(), WorldError> {
        let by_id: Vec<(EntityId, Location)> = updates
            .iter()
            .map(|&(entity, location)| (entity.id(), location))
            .collect();
        self.storage.locations.commit(&by_id, live_delta)?;
        let entries: Vec<Entry> = updates
            .iter()
            .filter(|(_, location)| location.valid)
            .map(|&(entity, location)| Entry {
                id: entity.id(),
                entity,
                location,
            })
            .collect();
        self.storage.entries.set_entries(&entries)?;
        Ok(())
    }

    /// Location of a live entity that must have `component`.
    fn location_with(
        &self,
        entity: Entity,
        component: ComponentTypeId,
    ) -> Result<Location, WorldError> {
        let location = self.location_of(entity)?;
        if !self.archetypes[location.archetype.index()]
            .layout()
            .has_component(component)
        {
            return Err(WorldError::ComponentNotOnEntity {
                entity,
                component: self.registry.name_of(component).to_owned(),
            });
        }
        Ok(location)
    }
}

/// Swap-removes `slot` and returns the entity that now fills it, if any.
fn swap_out(archetype: &mut Archetype, slot: SlotIndex) -> Option<Entity> {
    archetype.swap_remove(slot);
    archetype.entity_at(slot)
}
