//! Scenarios against a live Redis. Skipped unless `REDIS_URL` is set.

use std::sync::Arc;

use archon_component::{Component, ComponentRegistry, Filter};
use archon_storage::{RedisConfig, RedisConnection, WorldStorage};
use archon_world::{Search, Searchable, World, WorldError, WorldId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Energy {
    amt: i64,
    cap: i64,
}

impl Component for Energy {
    fn type_name() -> &'static str {
        "Energy"
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Ownable {
    owner: String,
}

impl Component for Ownable {
    fn type_name() -> &'static str {
        "Ownable"
    }
}

fn registry() -> Arc<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    registry.register::<Energy>().unwrap();
    registry.register::<Ownable>().unwrap();
    Arc::new(registry)
}

/// A connection to a fresh namespace, or `None` when no server is configured.
fn connect(pipelined: bool) -> Option<Arc<RedisConnection>> {
    std::env::var("REDIS_URL").ok()?;
    let namespace = WorldId::random().to_string();
    let config = RedisConfig::from_env(namespace).with_pipelining(pipelined);
    Some(Arc::new(RedisConnection::connect(config).unwrap()))
}

fn open(conn: &Arc<RedisConnection>, registry: Arc<ComponentRegistry>) -> Result<World, WorldError> {
    World::new(
        WorldId::new(conn.namespace()),
        registry,
        WorldStorage::redis(Arc::clone(conn)),
    )
}

fn run_lifecycle(pipelined: bool) {
    let Some(conn) = connect(pipelined) else {
        return;
    };
    let registry = registry();
    let mut world = open(&conn, Arc::clone(&registry)).unwrap();
    let energy = world.component_id::<Energy>().unwrap();
    let ownable = world.component_id::<Ownable>().unwrap();

    world.create_many(5, &[energy, ownable]).unwrap();
    let plain = world.create_many(10, &[energy]).unwrap();
    let either = Search::new(Filter::or([
        Filter::contains([energy]),
        Filter::contains([ownable]),
    ]))
    .unwrap();
    assert_eq!(either.count(&world).unwrap(), 15);

    world.set_component(plain[0], &Energy { amt: 4, cap: 8 }).unwrap();
    world.add_component::<Ownable>(plain[0]).unwrap();
    world.remove_component::<Ownable>(plain[0]).unwrap();
    assert_eq!(world.get_component::<Energy>(plain[0]).unwrap(), Energy { amt: 4, cap: 8 });

    world.remove(plain[3]).unwrap();
    assert!(!world.valid(plain[3]).unwrap());
    let recycled = world.create(&[energy]).unwrap();
    assert_eq!(recycled.id(), plain[3].id());
    assert!(recycled.version() > plain[3].version());

    assert_eq!(world.len().unwrap(), 15);
    world.check_consistency().unwrap();
    conn.clear_namespace().unwrap();
}

#[test]
fn test_redis_lifecycle_pipelined() {
    run_lifecycle(true);
}

#[test]
fn test_redis_lifecycle_unpipelined() {
    run_lifecycle(false);
}

fn run_middle_removal(pipelined: bool) {
    let Some(conn) = connect(pipelined) else {
        return;
    };
    let mut world = open(&conn, registry()).unwrap();
    let energy = world.component_id::<Energy>().unwrap();
    let [a, b, c] = [(); 3].map(|()| world.create(&[energy]).unwrap());

    world.remove(b).unwrap();
    assert!(!world.valid(b).unwrap());
    assert_eq!(world.location_of(c).unwrap().slot, 1);
    assert_eq!(world.location_of(a).unwrap().slot, 0);
    assert_eq!(world.len().unwrap(), 2);
    world.check_consistency().unwrap();
    conn.clear_namespace().unwrap();
}

#[test]
fn test_redis_middle_removal_pipelined() {
    run_middle_removal(true);
}

#[test]
fn test_redis_middle_removal_unpipelined() {
    run_middle_removal(false);
}

#[test]
fn test_redis_saved_state_survives_reopen() {
    let Some(conn) = connect(true) else {
        return;
    };
    let registry = registry();
    let mut world = open(&conn, Arc::clone(&registry)).unwrap();
    let energy = world.component_id::<Energy>().unwrap();
    let e = world.create(&[energy]).unwrap();
    world.set_component(e, &Energy { amt: 1, cap: 1 }).unwrap();
    world.save_state().unwrap();
    drop(world);

    let reopened = open(&conn, registry).unwrap();
    assert!(reopened.valid(e).unwrap());
    assert_eq!(reopened.get_component::<Energy>(e).unwrap(), Energy { amt: 1, cap: 1 });
    reopened.check_consistency().unwrap();

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct EnergyV2 {
        amt: f64,
        cap: f64,
    }

    impl Component for EnergyV2 {
        fn type_name() -> &'static str {
            "Energy"
        }
    }

    let mut changed = ComponentRegistry::new();
    changed.register::<EnergyV2>().unwrap();
    changed.register::<Ownable>().unwrap();
    assert!(matches!(
        open(&conn, Arc::new(changed)),
        Err(WorldError::ComponentMismatchWithSavedState(_))
    ));
    conn.clear_namespace().unwrap();
}
