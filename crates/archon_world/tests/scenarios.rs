//! End-to-end scenarios against the in-memory backend.

use std::sync::Arc;

use archon_component::{Component, ComponentRegistry, ComponentTypeId, Filter};
use archon_world::{OrSearch, Search, Searchable, World, WorldError};
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

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Alpha {
    a: u32,
}

impl Component for Alpha {
    fn type_name() -> &'static str {
        "Alpha"
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Beta {
    b: String,
}

impl Component for Beta {
    fn type_name() -> &'static str {
        "Beta"
    }
}

struct Ids {
    energy: ComponentTypeId,
    ownable: ComponentTypeId,
    alpha: ComponentTypeId,
    beta: ComponentTypeId,
}

fn setup() -> (World, Ids) {
    let mut registry = ComponentRegistry::new();
    let ids = Ids {
        energy: registry.register::<Energy>().unwrap(),
        ownable: registry.register::<Ownable>().unwrap(),
        alpha: registry.register::<Alpha>().unwrap(),
        beta: registry.register::<Beta>().unwrap(),
    };
    (World::in_memory(Arc::new(registry)), ids)
}

#[test]
fn test_energy_ownable_counts() {
    let (mut world, ids) = setup();
    world.create_many(5, &[ids.energy, ids.ownable]).unwrap();
    world.create_many(10, &[ids.energy]).unwrap();

    let either = Search::new(Filter::or([
        Filter::contains([ids.energy]),
        Filter::contains([ids.ownable]),
    ]))
    .unwrap();
    assert_eq!(either.count(&world).unwrap(), 15);

    let energy_only = Search::new(Filter::exact([ids.energy])).unwrap();
    assert_eq!(energy_only.count(&world).unwrap(), 10);

    let composite = OrSearch::new(vec![
        Box::new(Search::new(Filter::contains([ids.energy])).unwrap()) as Box<dyn Searchable>,
        Box::new(Search::new(Filter::contains([ids.ownable])).unwrap()),
    ])
    .unwrap();
    assert_eq!(composite.count(&world).unwrap(), 15);
    world.check_consistency().unwrap();
}

#[test]
fn test_remove_alpha_moves_entity_to_beta_only() {
    let (mut world, ids) = setup();
    world.create_many(3, &[ids.alpha, ids.beta]).unwrap();
    let e = world.create(&[ids.alpha, ids.beta]).unwrap();
    world.set_component(e, &Beta { b: "kept".into() }).unwrap();

    let with_alpha = Search::new(Filter::contains([ids.alpha])).unwrap();
    let beta_only = Search::new(Filter::exact([ids.beta])).unwrap();
    let alpha_before = with_alpha.count(&world).unwrap();
    let beta_before = beta_only.count(&world).unwrap();

    world.remove_component::<Alpha>(e).unwrap();

    assert_eq!(with_alpha.count(&world).unwrap(), alpha_before - 1);
    assert_eq!(beta_only.count(&world).unwrap(), beta_before + 1);
    assert_eq!(world.get_component::<Beta>(e).unwrap(), Beta { b: "kept".into() });
    world.check_consistency().unwrap();
}

#[test]
fn test_remove_from_middle_updates_last_entity() {
    let (mut world, ids) = setup();
    let entities = world.create_many(4, &[ids.energy]).unwrap();
    let search = Search::new(Filter::contains([ids.energy])).unwrap();
    let before = search.count(&world).unwrap();

    world.remove(entities[1]).unwrap();

    let last = entities[3];
    assert_eq!(world.location_of(last).unwrap().slot, 1);
    assert_eq!(search.count(&world).unwrap(), before - 1);
    world.check_consistency().unwrap();
}

#[test]
fn test_churn_keeps_world_consistent() {
    let (mut world, ids) = setup();
    let mut live = world.create_many(20, &[ids.energy]).unwrap();

    for (i, &e) in live.iter().enumerate() {
        world.set_component(e, &Energy { amt: i as i64, cap: 100 }).unwrap();
        if i % 2 == 0 {
            world.add_component::<Ownable>(e).unwrap();
        }
        if i % 3 == 0 {
            world.add_component::<Alpha>(e).unwrap();
        }
    }
    world.check_consistency().unwrap();

    let removed: Vec<_> = live.iter().copied().filter(|e| e.id() % 4 == 0).collect();
    for e in &removed {
        world.remove(*e).unwrap();
    }
    live.retain(|e| !removed.contains(e));
    world.check_consistency().unwrap();

    for &e in &live {
        let energy = world.get_component::<Energy>(e).unwrap();
        assert_eq!(energy.cap, 100);
        assert!(world.valid(e).unwrap());
    }
    for &e in &removed {
        assert!(!world.valid(e).unwrap());
    }
    assert_eq!(world.len().unwrap(), live.len());

    let recycled = world.create(&[ids.beta]).unwrap();
    assert!(removed.iter().any(|e| e.id() == recycled.id() && e.version() < recycled.version()));
    world.check_consistency().unwrap();
}

#[test]
fn test_add_component_with_sets_value() {
    let (mut world, ids) = setup();
    let e = world.create(&[ids.energy]).unwrap();
    world
        .add_component_with(e, &Ownable { owner: "kim".into() })
        .unwrap();
    assert_eq!(
        world.get_component::<Ownable>(e).unwrap(),
        Ownable { owner: "kim".into() }
    );
    assert!(matches!(
        world.add_component_with(e, &Ownable::default()),
        Err(WorldError::ComponentAlreadyOnEntity { .. })
    ));
}

#[test]
fn test_filter_algebra_matches_expected_archetypes() {
    let (mut world, ids) = setup();
    let ab = world.create(&[ids.alpha, ids.beta]).unwrap();
    let a = world.create(&[ids.alpha]).unwrap();
    let b = world.create(&[ids.beta]).unwrap();

    let collect = |filter: Filter| Search::new(filter).unwrap().collect(&world).unwrap();

    assert_eq!(collect(Filter::contains([ids.alpha, ids.beta])), vec![ab]);
    assert_eq!(collect(Filter::exact([ids.beta, ids.alpha])), vec![ab]);
    assert_eq!(collect(Filter::not(Filter::contains([ids.alpha]))), vec![b]);
    assert_eq!(
        collect(Filter::and([
            Filter::contains([ids.alpha]),
            Filter::not(Filter::contains([ids.beta])),
        ])),
        vec![a]
    );
    assert_eq!(collect(Filter::all()).len(), 3);
}
