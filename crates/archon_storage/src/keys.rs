//! Redis key layout.
//!
//! Every key carries the world namespace as `WORLD-{W}` so several worlds can
//! share one Redis database.

use archon_component::{ArchetypeId, ComponentTypeId, EntityId};

// ── Component tables ────────────────────────────────────────────────────────

/// List of encoded values of one component type in one archetype.
///
/// `COMPD:WORLD-{W}:CID-{C}:A-{A}`
#[must_use]
pub fn component_data(world: &str, component: ComponentTypeId, archetype: ArchetypeId) -> String {
    format!("COMPD:WORLD-{world}:CID-{component}:A-{archetype}")
}

/// Highest occupied slot of one component table.
///
/// `CIDX:WORLD-{W}:CID-{C}:A-{A}`
#[must_use]
pub fn component_slot(world: &str, component: ComponentTypeId, archetype: ArchetypeId) -> String {
    format!("CIDX:WORLD-{world}:CID-{component}:A-{archetype}")
}

/// Live slot count of one archetype.
///
/// `CIDX:WORLD-{W}:A-{A}`
#[must_use]
pub fn archetype_slots(world: &str, archetype: ArchetypeId) -> String {
    format!("CIDX:WORLD-{world}:A-{archetype}")
}

// ── Entities ────────────────────────────────────────────────────────────────

/// Encoded location of one entity id.
///
/// `LOC:WORLD-{W}:E-{E}`
#[must_use]
pub fn location(world: &str, id: EntityId) -> String {
    format!("LOC:WORLD-{world}:E-{id}")
}

/// Live entity count.
///
/// `LOCL:WORLD-{W}`
#[must_use]
pub fn location_count(world: &str) -> String {
    format!("LOCL:WORLD-{world}")
}

/// Encoded entry record of one entity id.
///
/// `ENTRY:WORLD-{W}:{E}`
#[must_use]
pub fn entry(world: &str, id: EntityId) -> String {
    format!("ENTRY:WORLD-{world}:{id}")
}

/// Last entity id handed out.
///
/// `ENTITY:WORLD-{W}:NEXTID`
#[must_use]
pub fn next_entity_id(world: &str) -> String {
    format!("ENTITY:WORLD-{world}:NEXTID")
}

/// List of recycled, version-bumped entity handles.
///
/// `ENTITY:WORLD-{W}:FREE`
#[must_use]
pub fn free_entities(world: &str) -> String {
    format!("ENTITY:WORLD-{world}:FREE")
}

// ── Saved state ─────────────────────────────────────────────────────────────

/// Archetype table snapshot.
///
/// `ARCH:WORLD-{W}`
#[must_use]
pub fn archetypes(world: &str) -> String {
    format!("ARCH:WORLD-{world}")
}

/// Component schema snapshot.
///
/// `SCHEMA:WORLD-{W}`
#[must_use]
pub fn schema(world: &str) -> String {
    format!("SCHEMA:WORLD-{world}")
}

/// `SCAN` patterns covering every key of a world.
#[must_use]
pub fn world_patterns(world: &str) -> [String; 2] {
    [format!("*:WORLD-{world}:*"), format!("*:WORLD-{world}")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_keys() {
        assert_eq!(
            component_data("w1", ComponentTypeId(3), ArchetypeId(0)),
            "COMPD:WORLD-w1:CID-3:A-0"
        );
        assert_eq!(
            component_slot("w1", ComponentTypeId(3), ArchetypeId(2)),
            "CIDX:WORLD-w1:CID-3:A-2"
        );
        assert_eq!(archetype_slots("w1", ArchetypeId(2)), "CIDX:WORLD-w1:A-2");
    }

    #[test]
    fn test_entity_keys() {
        assert_eq!(location("w1", 9), "LOC:WORLD-w1:E-9");
        assert_eq!(location_count("w1"), "LOCL:WORLD-w1");
        assert_eq!(entry("w1", 9), "ENTRY:WORLD-w1:9");
        assert_eq!(next_entity_id("w1"), "ENTITY:WORLD-w1:NEXTID");
        assert_eq!(free_entities("w1"), "ENTITY:WORLD-w1:FREE");
    }

    #[test]
    fn test_world_patterns_cover_both_key_shapes() {
        let [nested, flat] = world_patterns("w1");
        assert_eq!(nested, "*:WORLD-w1:*");
        assert_eq!(flat, "*:WORLD-w1");
    }
}
