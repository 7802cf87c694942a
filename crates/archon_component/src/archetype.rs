//! Layouts and archetypes.
//!
//! A [`Layout`] is the set of component types that defines an archetype's
//! shape. An [`Archetype`] pairs a layout with the dense list of entities that
//! currently have exactly that shape; an entity's position in that list is
//! its slot in every component table of the archetype.

use serde::{Deserialize, Serialize};

use crate::component::ComponentTypeId;
use crate::entity::Entity;
use crate::error::ConfigError;

/// Position of an archetype in its world. Archetypes are append-only, so the
/// id doubles as the index into the world's archetype list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// The id as a list index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dense index of an entity within an archetype, and of its values within
/// the archetype's component tables.
pub type SlotIndex = usize;

/// An order-stable, duplicate-free set of component types.
///
/// Insertion order is kept only for deterministic iteration; equality and
/// matching are set-based.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    components: Vec<ComponentTypeId>,
}

impl Layout {
    /// Builds a layout, silently dropping repeated component types.
    #[must_use]
    pub fn new(components: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        let mut layout = Self::default();
        for id in components {
            if !layout.has_component(id) {
                layout.components.push(id);
            }
        }
        layout
    }

    /// Builds a layout, rejecting repeated component types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DuplicateComponentInLayout`] naming the first
    /// repeated type.
    pub fn from_unique(components: &[ComponentTypeId]) -> Result<Self, ConfigError> {
        for (i, id) in components.iter().enumerate() {
            if components[i + 1..].contains(id) {
                return Err(ConfigError::DuplicateComponentInLayout(*id));
            }
        }
        Ok(Self {
            components: components.to_vec(),
        })
    }

    /// The component types, in insertion order.
    #[must_use]
    pub fn components(&self) -> &[ComponentTypeId] {
        &self.components
    }

    /// Linear membership test. Layouts hold a handful of types, so a scan
    /// beats hashing here.
    #[must_use]
    pub fn has_component(&self, id: ComponentTypeId) -> bool {
        self.components.contains(&id)
    }

    /// Returns `true` if every type in `ids` is in this layout.
    #[must_use]
    pub fn contains_all(&self, ids: &[ComponentTypeId]) -> bool {
        ids.iter().all(|id| self.has_component(*id))
    }

    /// Set equality against a list of types, ignoring order.
    #[must_use]
    pub fn matches_exactly(&self, ids: &[ComponentTypeId]) -> bool {
        let unique = Layout::new(ids.iter().copied());
        unique.len() == self.len() && self.contains_all(unique.components())
    }

    /// A copy of this layout with `id` appended.
    #[must_use]
    pub fn with(&self, id: ComponentTypeId) -> Self {
        Self::new(self.components.iter().copied().chain(std::iter::once(id)))
    }

    /// A copy of this layout without `id`.
    #[must_use]
    pub fn without(&self, id: ComponentTypeId) -> Self {
        Self {
            components: self.components.iter().copied().filter(|c| *c != id).collect(),
        }
    }

    /// Number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the layout has no component types.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.matches_exactly(other.components())
    }
}

impl Eq for Layout {}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Layout{{")?;
        for (i, id) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, "}}")
    }
}

/// A layout plus the entities that currently have exactly that layout.
///
/// `entities[slot]` must always agree with the location table entry that
/// points at `(id, slot)`.
#[derive(Debug, Clone)]
pub struct Archetype {
    id: ArchetypeId,
    layout: Layout,
    entities: Vec<Entity>,
}

impl Archetype {
    /// Creates an empty archetype.
    #[must_use]
    pub fn new(id: ArchetypeId, layout: Layout) -> Self {
        Self {
            id,
            layout,
            entities: Vec::new(),
        }
    }

    /// Rebuilds an archetype from saved state.
    #[must_use]
    pub fn with_entities(id: ArchetypeId, layout: Layout, entities: Vec<Entity>) -> Self {
        Self {
            id,
            layout,
            entities,
        }
    }

    /// The archetype id.
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The archetype's layout.
    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The live entities, in slot order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The entity at `slot`, if any.
    #[must_use]
    pub fn entity_at(&self, slot: SlotIndex) -> Option<Entity> {
        self.entities.get(slot).copied()
    }

    /// Appends an entity and returns its slot.
    pub fn push_entity(&mut self, entity: Entity) -> SlotIndex {
        self.entities.push(entity);
        self.entities.len() - 1
    }

    /// Removes the entity at `slot` by moving the last entity into its place.
    ///
    /// Returns the removed entity. Afterwards, if `slot < self.len()`, the
    /// entity now at `slot` has moved and its location must be updated.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of bounds; callers validate the slot first.
    pub fn swap_remove(&mut self, slot: SlotIndex) -> Entity {
        self.entities.swap_remove(slot)
    }

    /// Returns `true` if the layout has exactly the given types.
    #[must_use]
    pub fn layout_matches(&self, ids: &[ComponentTypeId]) -> bool {
        self.layout.matches_exactly(ids)
    }

    /// Number of entities in the archetype.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if no entity has this layout right now.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ComponentTypeId = ComponentTypeId(1);
    const B: ComponentTypeId = ComponentTypeId(2);
    const C: ComponentTypeId = ComponentTypeId(3);

    #[test]
    fn test_layout_deduplicates_and_keeps_order() {
        let layout = Layout::new([B, A, B]);
        assert_eq!(layout.components(), &[B, A]);
    }

    #[test]
    fn test_layout_from_unique_rejects_duplicates() {
        assert_eq!(
            Layout::from_unique(&[A, B, A]).unwrap_err(),
            ConfigError::DuplicateComponentInLayout(A)
        );
        assert!(Layout::from_unique(&[A, B]).is_ok());
    }

    #[test]
    fn test_layout_equality_is_order_independent() {
        assert_eq!(Layout::new([A, B]), Layout::new([B, A]));
        assert_ne!(Layout::new([A, B]), Layout::new([A, B, C]));
        assert!(Layout::new([A, B]).matches_exactly(&[B, A]));
        assert!(!Layout::new([A, B]).matches_exactly(&[A]));
    }

    #[test]
    fn test_layout_with_and_without() {
        let base = Layout::new([A, B]);
        assert_eq!(base.with(C), Layout::new([A, B, C]));
        assert_eq!(base.with(A), base);
        assert_eq!(base.without(A), Layout::new([B]));
        assert!(base.without(C) == base);
    }

    #[test]
    fn test_archetype_swap_remove_moves_last_into_slot() {
        let mut arch = Archetype::new(ArchetypeId(0), Layout::new([A]));
        let e1 = Entity::new(1, 0);
        let e2 = Entity::new(2, 0);
        let e3 = Entity::new(3, 0);
        assert_eq!(arch.push_entity(e1), 0);
        arch.push_entity(e2);
        arch.push_entity(e3);

        assert_eq!(arch.swap_remove(0), e1);
        assert_eq!(arch.entities(), &[e3, e2]);
        assert_eq!(arch.swap_remove(1), e2);
        assert_eq!(arch.entities(), &[e3]);
    }

    #[test]
    fn test_layout_display() {
        assert_eq!(Layout::new([A, C]).to_string(), "Layout{1, 3}");
    }
}
