//! Archetype search index.
//!
//! Layouts are appended once and never removed, so an archetype's id is its
//! position here. [`SearchIndex::search_from`] lets a cached search look only
//! at archetypes created since its previous scan.

use std::collections::{BTreeSet, HashMap};

use archon_component::{ArchetypeId, ComponentTypeId, Filter, Layout};

/// Every known layout, searchable by [`Filter`].
#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    layouts: Vec<Layout>,
    /// Maps component type sets to archetype ids, for exact lookup.
    by_type_set: HashMap<BTreeSet<ComponentTypeId>, ArchetypeId>,
}

impl SearchIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new archetype's layout and returns the id it was given.
    /// Callers check [`SearchIndex::find`] first; pushing an already-known
    /// layout gives a second archetype with the same shape.
    pub fn push(&mut self, layout: Layout) -> ArchetypeId {
        let id = ArchetypeId(self.layouts.len() as u32);
        self.by_type_set
            .entry(layout.components().iter().copied().collect())
            .or_insert(id);
        self.layouts.push(layout);
        id
    }

    /// The archetype whose layout is exactly `layout`, if one exists.
    #[must_use]
    pub fn find(&self, layout: &Layout) -> Option<ArchetypeId> {
        let key: BTreeSet<ComponentTypeId> = layout.components().iter().copied().collect();
        self.by_type_set.get(&key).copied()
    }

    /// The layout registered under `id`.
    #[must_use]
    pub fn layout(&self, id: ArchetypeId) -> Option<&Layout> {
        self.layouts.get(id.index())
    }

    /// All archetypes whose layout matches `filter`, in id order.
    pub fn search<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = ArchetypeId> + 'a {
        self.search_from(filter, 0)
    }

    /// Like [`SearchIndex::search`], skipping archetypes with an id below
    /// `start`.
    pub fn search_from<'a>(
        &'a self,
        filter: &'a Filter,
        start: usize,
    ) -> impl Iterator<Item = ArchetypeId> + 'a {
        self.layouts
            .iter()
            .enumerate()
            .skip(start)
            .filter(move |(_, layout)| filter.matches(layout))
            .map(|(i, _)| ArchetypeId(i as u32))
    }

    /// Number of registered archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    /// Returns `true` if no archetype is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENERGY: ComponentTypeId = ComponentTypeId(1);
    const OWNABLE: ComponentTypeId = ComponentTypeId(2);

    fn index() -> SearchIndex {
        let mut index = SearchIndex::new();
        index.push(Layout::new([ENERGY]));
        index.push(Layout::new([ENERGY, OWNABLE]));
        index.push(Layout::new([OWNABLE]));
        index
    }

    #[test]
    fn test_ids_are_positions() {
        let mut index = SearchIndex::new();
        assert_eq!(index.push(Layout::new([ENERGY])), ArchetypeId(0));
        assert_eq!(index.push(Layout::new([OWNABLE])), ArchetypeId(1));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_find_is_order_independent() {
        let index = index();
        assert_eq!(index.find(&Layout::new([OWNABLE, ENERGY])), Some(ArchetypeId(1)));
        assert_eq!(index.find(&Layout::new([ComponentTypeId(9)])), None);
    }

    #[test]
    fn test_search_applies_filter() {
        let index = index();
        let found: Vec<_> = index.search(&Filter::contains([OWNABLE])).collect();
        assert_eq!(found, vec![ArchetypeId(1), ArchetypeId(2)]);
    }

    #[test]
    fn test_search_from_skips_earlier_archetypes() {
        let mut index = index();
        let filter = Filter::contains([ENERGY]);
        let seen = index.len();
        index.push(Layout::new([ENERGY, ComponentTypeId(3)]));

        let fresh: Vec<_> = index.search_from(&filter, seen).collect();
        assert_eq!(fresh, vec![ArchetypeId(3)]);
        assert_eq!(index.search_from(&filter, 99).count(), 0);
    }
}
