//! Energy demo: the Energy/Ownable scenario end to end.
//!
//! Creates entities with `Energy` and `Ownable`, runs a few recharge ticks
//! over them through a cached search, removes the ownerless ones that are
//! fully charged and checks the world is still consistent. Works against
//! either backend:
//!
//! ```text
//! energy_demo --backend memory
//! energy_demo --backend redis --redis-url redis://127.0.0.1:6379 --namespace demo
//! ```

use std::sync::Arc;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use archon_component::{Component, ComponentRegistry, Filter};
use archon_storage::{RedisConfig, RedisConnection, WorldStorage};
use archon_world::{Search, Searchable, World, WorldId};

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Memory,
    Redis,
}

#[derive(Debug, Parser)]
#[command(name = "energy_demo", about = "Archetype storage demo")]
struct Args {
    /// Storage backend.
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    /// Redis server URL; defaults to `REDIS_URL` or localhost.
    #[arg(long)]
    redis_url: Option<String>,

    /// World namespace; random when omitted.
    #[arg(long)]
    namespace: Option<String>,

    /// Entities created with both Energy and Ownable.
    #[arg(long, default_value_t = 5)]
    owned: usize,

    /// Entities created with Energy only.
    #[arg(long, default_value_t = 10)]
    unowned: usize,

    /// Recharge ticks to run.
    #[arg(long, default_value_t = 3)]
    ticks: u32,

    /// Delete the namespace's Redis keys before exiting.
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("energy_demo=info".parse()?))
        .init();

    let args = Args::parse();

    let mut registry = ComponentRegistry::new();
    let energy = registry.register_with_default(Energy { amt: 0, cap: 3 })?;
    let ownable = registry.register::<Ownable>()?;
    let registry = Arc::new(registry);

    let namespace = args
        .namespace
        .clone()
        .unwrap_or_else(|| WorldId::random().to_string());
    let (mut world, conn) = match args.backend {
        Backend::Memory => {
            let storage = WorldStorage::in_memory();
            let world = World::new(WorldId::new(namespace), Arc::clone(&registry), storage)?;
            (world, None)
        }
        Backend::Redis => {
            let mut config = RedisConfig::from_env(namespace.clone());
            if let Some(url) = &args.redis_url {
                config = config.with_url(url.clone());
            }
            let conn = Arc::new(RedisConnection::connect(config)?);
            let storage = WorldStorage::redis(Arc::clone(&conn));
            let world = World::new(WorldId::new(namespace), Arc::clone(&registry), storage)?;
            (world, Some(conn))
        }
    };
    info!(world = %world.id(), backend = world.backend(), "world opened");

    let owned = world.create_many(args.owned, &[energy, ownable])?;
    world.create_many(args.unowned, &[energy])?;
    for (i, &e) in owned.iter().enumerate() {
        world.set_component(e, &Ownable { owner: format!("player-{i}") })?;
    }

    let any = Search::new(Filter::or([
        Filter::contains([energy]),
        Filter::contains([ownable]),
    ]))?;
    let unowned = Search::new(Filter::exact([energy]))?;
    info!(
        total = any.count(&world)?,
        unowned = unowned.count(&world)?,
        "entities created"
    );

    let charging = Search::new(Filter::contains([energy]))?
        .filter_component::<Energy, _>(|e| e.amt < e.cap);
    for tick in 1..=args.ticks {
        let targets = charging.collect(&world)?;
        for &e in &targets {
            let mut value: Energy = world.get_component(e)?;
            value.amt += 1;
            world.set_component(e, &value)?;
        }
        info!(tick, recharged = targets.len(), "tick complete");
    }

    let full_unowned = Search::new(Filter::exact([energy]))?
        .filter_component::<Energy, _>(|e| e.amt >= e.cap)
        .collect(&world)?;
    for &e in &full_unowned {
        world.remove(e)?;
    }
    info!(removed = full_unowned.len(), remaining = world.len()?, "removed charged entities");

    if let Some(&first) = owned.first() {
        world.remove_component::<Ownable>(first)?;
        info!(entity = %first, unowned = unowned.count(&world)?, "released ownership");
    }

    world.check_consistency()?;
    world.save_state()?;

    if world.len()? != any.count(&world)? {
        bail!("live count disagrees with search count");
    }
    info!(live = world.len()?, "world consistent");

    if args.clear
        && let Some(conn) = conn
    {
        conn.clear_namespace()?;
    }
    Ok(())
}
