//! Layout filters.
//!
//! A [`Filter`] is a boolean predicate over an archetype's [`Layout`]. Filters
//! select archetypes, never individual entities; ordering of the matched
//! entities is imposed later by the search layer.

use serde::{Deserialize, Serialize};

use crate::archetype::Layout;
use crate::component::ComponentTypeId;
use crate::error::ConfigError;

/// A predicate over component layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    /// Matches every layout.
    All,
    /// Matches layouts that are a superset of these types.
    Contains(Vec<ComponentTypeId>),
    /// Matches the layout made of exactly these types, in any order.
    Exact(Vec<ComponentTypeId>),
    /// Matches what the inner filter does not.
    Not(Box<Filter>),
    /// Matches layouts every sub-filter matches.
    And(Vec<Filter>),
    /// Matches layouts at least one sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// [`Filter::All`].
    #[must_use]
    pub fn all() -> Self {
        Self::All
    }

    /// [`Filter::Contains`] over `ids`.
    #[must_use]
    pub fn contains(ids: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        Self::Contains(ids.into_iter().collect())
    }

    /// [`Filter::Exact`] over `ids`.
    #[must_use]
    pub fn exact(ids: impl IntoIterator<Item = ComponentTypeId>) -> Self {
        Self::Exact(ids.into_iter().collect())
    }

    /// Negates `filter`.
    #[must_use]
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// Conjunction of `filters`.
    #[must_use]
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Disjunction of `filters`.
    #[must_use]
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Evaluates the predicate against a layout.
    #[must_use]
    pub fn matches(&self, layout: &Layout) -> bool {
        match self {
            Filter::All => true,
            Filter::Contains(ids) => layout.contains_all(ids),
            Filter::Exact(ids) => layout.matches_exactly(ids),
            Filter::Not(inner) => !inner.matches(layout),
            Filter::And(filters) => filters.iter().all(|f| f.matches(layout)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(layout)),
        }
    }

    /// Rejects filters that are structurally meaningless: empty component
    /// lists and empty `And`/`Or`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedFilter`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Filter::All => Ok(()),
            Filter::Contains(ids) if ids.is_empty() => {
                Err(ConfigError::MalformedFilter("Contains needs at least one component"))
            }
            Filter::Exact(ids) if ids.is_empty() => {
                Err(ConfigError::MalformedFilter("Exact needs at least one component"))
            }
            Filter::Contains(_) | Filter::Exact(_) => Ok(()),
            Filter::Not(inner) => inner.validate(),
            Filter::And(filters) | Filter::Or(filters) if filters.is_empty() => {
                Err(ConfigError::MalformedFilter("And/Or need at least one sub-filter"))
            }
            Filter::And(filters) | Filter::Or(filters) => {
                filters.iter().try_for_each(Filter::validate)
            }
        }
    }

    /// Every component type the filter mentions, for registration checks.
    #[must_use]
    pub fn component_ids(&self) -> Vec<ComponentTypeId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ComponentTypeId>) {
        match self {
            Filter::All => {}
            Filter::Contains(ids) | Filter::Exact(ids) => out.extend_from_slice(ids),
            Filter::Not(inner) => inner.collect_ids(out),
            Filter::And(filters) | Filter::Or(filters) => {
                for f in filters {
                    f.collect_ids(out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENERGY: ComponentTypeId = ComponentTypeId(1);
    const OWNABLE: ComponentTypeId = ComponentTypeId(2);
    const HEALTH: ComponentTypeId = ComponentTypeId(3);

    fn layouts() -> Vec<Layout> {
        vec![
            Layout::new([ENERGY]),
            Layout::new([ENERGY, OWNABLE]),
            Layout::new([OWNABLE]),
            Layout::new([ENERGY, OWNABLE, HEALTH]),
        ]
    }

    fn matching(filter: &Filter) -> Vec<usize> {
        layouts()
            .iter()
            .enumerate()
            .filter(|(_, l)| filter.matches(l))
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_contains_matches_supersets() {
        assert_eq!(matching(&Filter::contains([ENERGY])), vec![0, 1, 3]);
        assert_eq!(matching(&Filter::contains([ENERGY, OWNABLE])), vec![1, 3]);
    }

    #[test]
    fn test_exact_ignores_order() {
        assert_eq!(matching(&Filter::exact([OWNABLE, ENERGY])), vec![1]);
        assert_eq!(matching(&Filter::exact([ENERGY])), vec![0]);
    }

    #[test]
    fn test_not_is_complement() {
        assert_eq!(matching(&Filter::not(Filter::contains([ENERGY]))), vec![2]);
    }

    #[test]
    fn test_and_or_are_intersection_and_union() {
        let energy_not_health = Filter::and([
            Filter::contains([ENERGY]),
            Filter::not(Filter::contains([HEALTH])),
        ]);
        assert_eq!(matching(&energy_not_health), vec![0, 1]);

        let either = Filter::or([Filter::exact([ENERGY]), Filter::exact([OWNABLE])]);
        assert_eq!(matching(&either), vec![0, 2]);
    }

    #[test]
    fn test_all_matches_everything() {
        assert_eq!(matching(&Filter::all()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_validate_rejects_empty_parts() {
        assert!(Filter::contains([]).validate().is_err());
        assert!(Filter::exact([]).validate().is_err());
        assert!(Filter::and([]).validate().is_err());
        assert!(Filter::not(Filter::or([])).validate().is_err());
        assert!(Filter::and([Filter::all(), Filter::contains([ENERGY])]).validate().is_ok());
    }

    #[test]
    fn test_component_ids_walks_tree() {
        let f = Filter::or([
            Filter::contains([ENERGY]),
            Filter::not(Filter::exact([OWNABLE, HEALTH])),
        ]);
        assert_eq!(f.component_ids(), vec![ENERGY, OWNABLE, HEALTH]);
    }
}
