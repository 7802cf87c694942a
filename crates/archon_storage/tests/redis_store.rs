//! Redis backend against a live server. Skipped unless `REDIS_URL` is set.

use std::sync::Arc;

use archon_component::{ArchetypeId, ComponentTypeId};
use archon_storage::redis_backend::{RedisComponentStore, RedisLocationStore};
use archon_storage::{
    ComponentOp, ComponentStore, Location, LocationStore, RedisConfig, RedisConnection,
    StorageError,
};

const ENERGY: ComponentTypeId = ComponentTypeId(1);
const A0: ArchetypeId = ArchetypeId(0);
const A1: ArchetypeId = ArchetypeId(1);

fn connect(namespace: &str, pipelined: bool) -> Option<Arc<RedisConnection>> {
    std::env::var("REDIS_URL").ok()?;
    let config = RedisConfig::from_env(namespace).with_pipelining(pipelined);
    let conn = Arc::new(RedisConnection::connect(config).unwrap());
    conn.clear_namespace().unwrap();
    Some(conn)
}

#[test]
fn test_swap_remove_and_move_scripts() {
    let Some(conn) = connect("archon-test-scripts", true) else {
        return;
    };
    let mut store = RedisComponentStore::new(Arc::clone(&conn));
    for bytes in [b"a", b"b", b"c"] {
        store.push_component(ENERGY, A0, bytes).unwrap();
    }

    assert_eq!(store.swap_remove(ENERGY, A0, 0).unwrap(), b"a");
    assert_eq!(store.component(ENERGY, A0, 0).unwrap(), b"c");
    assert_eq!(store.len(ENERGY, A0).unwrap(), 2);

    assert_eq!(store.move_component(ENERGY, A0, 1, A1).unwrap(), 0);
    assert_eq!(store.component(ENERGY, A1, 0).unwrap(), b"b");
    assert_eq!(store.len(ENERGY, A0).unwrap(), 1);

    assert!(matches!(
        store.swap_remove(ENERGY, A0, 5),
        Err(StorageError::SlotOutOfRange { slot: 5, .. })
    ));
    assert!(store.set_component(ENERGY, A1, 3, b"z").is_err());
    conn.clear_namespace().unwrap();
}

#[test]
fn test_pipelined_batch_applies_in_order() {
    let Some(conn) = connect("archon-test-batch", true) else {
        return;
    };
    let mut store = RedisComponentStore::new(Arc::clone(&conn));
    store.push_component(ENERGY, A0, b"x").unwrap();
    store
        .apply(&[
            ComponentOp::Push {
                component: ENERGY,
                archetype: A1,
                bytes: b"fresh".to_vec(),
            },
            ComponentOp::Move {
                component: ENERGY,
                from: A0,
                slot: 0,
                to: A1,
            },
        ])
        .unwrap();
    assert_eq!(store.component(ENERGY, A1, 0).unwrap(), b"fresh");
    assert_eq!(store.component(ENERGY, A1, 1).unwrap(), b"x");
    assert_eq!(store.len(ENERGY, A0).unwrap(), 0);

    let err = store
        .apply(&[ComponentOp::SwapRemove {
            component: ENERGY,
            archetype: A0,
            slot: 0,
        }])
        .unwrap_err();
    assert!(matches!(err, StorageError::SlotOutOfRange { .. }));
    conn.clear_namespace().unwrap();
}

#[test]
fn test_locations_keep_live_count() {
    let Some(conn) = connect("archon-test-locations", false) else {
        return;
    };
    let mut locs = RedisLocationStore::new(Arc::clone(&conn));
    locs.insert(1, A0, 0).unwrap();
    locs.insert(2, A0, 1).unwrap();
    locs.set_many(&[(2, Location::new(A1, 0))]).unwrap();
    locs.remove(1).unwrap();

    assert_eq!(locs.len().unwrap(), 1);
    assert!(!locs.contains_entity(1).unwrap());
    assert_eq!(locs.location(2).unwrap(), Some(Location::new(A1, 0)));
    conn.clear_namespace().unwrap();
}
