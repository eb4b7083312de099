mod scene;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use worldpart_ai::{ActiveTask, Behavior, Status, TaskRater, Tick};
use worldpart_collision::{
    BlockCheck, RelationFilter, hit_test, is_blocked, is_sight_blocked, living_hit_test,
    nearest_living_target,
};
use worldpart_common::{
    BlockCoord, BlockTypeId, BlockTypeTable, Circle, HitableObject, ObjectId, ObjectRef, Rect,
    Relation, WorldConfig, WorldPosition,
};
use worldpart_persist::{PartStore, StoredChunks, StoredInteriors};
use worldpart_stream::{FlatTerrain, GeneratedChunks, InteriorCatalog, World};

use scene::{Creature, Obstacle};

const GRASS: BlockTypeId = BlockTypeId(1);
const WATER: BlockTypeId = BlockTypeId(2);

#[derive(Parser)]
#[command(name = "worldpart-cli", about = "CLI tool for worldpart operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// World configuration (JSON); defaults are used when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Part store directory; terrain is generated and discarded when absent
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and configuration summary
    Info,
    /// Print the effective configuration and block type table as JSON
    Config,
    /// Walk an observer across the world and report streaming activity
    Stream {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "200")]
        ticks: u64,
        /// Observer speed in pixels per tick
        #[arg(long, default_value = "64")]
        speed: f32,
        /// Preload radius in chunks
        #[arg(short, long)]
        radius: Option<i32>,
        /// Simulated milliseconds per tick
        #[arg(long, default_value = "100")]
        tick_ms: u64,
    },
    /// Build a small scene and run the collision queries and AI rating on it
    Query,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Info => {
            let metrics = config.metrics();
            println!("worldpart-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "grid: block={}px chunk={} blocks ({}px)",
                metrics.block_size,
                metrics.chunk_span,
                metrics.chunk_pixel_size()
            );
            println!(
                "streaming: gc every {:?}, {} io workers, preload radius {}",
                config.gc_interval(),
                config.io_workers,
                config.default_preload_radius
            );
            match &cli.store {
                Some(dir) => {
                    let store = PartStore::open(dir, metrics.chunk_span)
                        .with_context(|| format!("opening store {}", dir.display()))?;
                    println!(
                        "store: {} ({} chunks, {} interiors, {} parts verified)",
                        dir.display(),
                        store.chunk_keys()?.len(),
                        store.interior_ids()?.len(),
                        store.verify_integrity()?
                    );
                }
                None => println!("store: none (generated terrain)"),
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("{}", serde_json::to_string_pretty(&BlockTypeTable::default())?);
        }
        Commands::Stream {
            ticks,
            speed,
            radius,
            tick_ms,
        } => stream(open_world(config, cli.store.as_deref())?, ticks, speed, radius, tick_ms),
        Commands::Query => query(open_world(config, cli.store.as_deref())?)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<WorldConfig> {
    match path {
        Some(path) => WorldConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(WorldConfig::default()),
    }
}

fn open_world(config: WorldConfig, store: Option<&Path>) -> anyhow::Result<World> {
    let table = Arc::new(BlockTypeTable::default());
    let terrain = FlatTerrain { fill: GRASS };
    let world = match store {
        Some(dir) => {
            let store = Arc::new(
                PartStore::open(dir, config.chunk_span)
                    .with_context(|| format!("opening store {}", dir.display()))?,
            );
            let chunks = Arc::new(StoredChunks::new(Arc::clone(&store), terrain));
            World::new(config, table, chunks, Arc::new(StoredInteriors::new(store)))?
        }
        None => {
            let chunks = Arc::new(GeneratedChunks::new(config.chunk_span, terrain));
            World::new(config, table, chunks, Arc::new(InteriorCatalog::new()))?
        }
    };
    Ok(world)
}

fn stream(mut world: World, ticks: u64, speed: f32, radius: Option<i32>, tick_ms: u64) {
    println!("Streaming demo: {ticks} ticks at {speed}px/tick");

    let player = ObjectId::new();
    let elapsed = Duration::from_millis(tick_ms);
    let mut requested = 0;
    let mut evicted = 0;
    let mut peak = 0;

    for i in 0..ticks {
        let x = i as f32 * speed;
        world.track_observer(player, WorldPosition::outside(x, x / 2.0), radius);
        let report = world.tick(elapsed);
        requested += report.preload_requests;
        peak = peak.max(report.loaded_chunks);
        if let Some(gc) = report.chunk_gc {
            evicted += gc.evicted;
            println!(
                "  tick {:>5}: gc evicted {} chunks in {:?}, {} remain",
                report.tick, gc.evicted, gc.elapsed, gc.remaining
            );
        }
    }

    let saved = world.save_all();
    println!(
        "Done: {requested} preloads, {evicted} evictions, peak {peak} chunks resident, {} resident now, {saved} saved",
        world.chunks().count_loaded()
    );
}

/// Demo behavior: runs for a fixed number of ticks.
struct Plan {
    label: String,
    remaining: u32,
}

impl Behavior for Plan {
    fn update(&mut self, tick: &Tick) -> Status {
        tracing::debug!(plan = %self.label, tick = tick.number, remaining = self.remaining, "plan step");
        if self.remaining == 0 {
            return Status::Success;
        }
        self.remaining -= 1;
        Status::Running
    }
}

fn query(mut world: World) -> anyhow::Result<()> {
    let block_size = world.metrics().block_size;
    let wolf = Creature::new("wolf", 260.0, 100.0);
    let boar = Creature::new("boar", 100.0, 320.0);
    let deer = Creature::new("deer", 160.0, 180.0);
    let hunter = Creature::new("hunter", 100.0, 100.0)
        .hostile_to(wolf.id)
        .hostile_to(boar.id);
    let wall = Obstacle::new(Rect::new(170, 40, 16, 120));

    let mut names: HashMap<ObjectId, &'static str> = HashMap::new();
    names.insert(wall.id, "wall");
    let mut refs: HashMap<&'static str, ObjectRef> = HashMap::new();
    for creature in [wolf, boar, deer, hunter] {
        names.insert(creature.id, creature.name);
        let object: ObjectRef = Arc::new(creature.clone());
        world.add_object(Arc::clone(&object))?;
        refs.insert(creature.name, object);
    }
    world.add_object(Arc::new(wall))?;
    let pond = BlockCoord::from_real(100, 220, block_size);
    world.set_block_type(pond, None, WATER);

    let name = |object: &ObjectRef| names.get(&object.id()).copied().unwrap_or("?");
    let hunter = refs.get("hunter").context("hunter missing from scene")?;
    let hunter = hunter.as_ref();

    let area = Circle::new(100, 100, 300);
    let hits = hit_test(&mut world, area, None, Some(hunter));
    println!("hit test around hunter: {:?}", hits.iter().map(name).collect::<Vec<_>>());

    let hostile = RelationFilter::Relation(Relation::Hostile);
    let nearest = nearest_living_target(&mut world, area, None, hunter, hostile);
    println!("nearest hostile: {}", nearest.as_ref().map_or("none", name));

    for target in ["wolf", "boar", "deer"] {
        let object = refs.get(target).context("target missing from scene")?;
        let blocked = is_sight_blocked(&mut world, hunter, object.as_ref(), 0.0);
        println!("sight hunter -> {target}: {}", if blocked { "blocked" } else { "clear" });
    }

    let step = Rect::new(165, 90, 10, 10);
    println!(
        "step into wall: fast={} precise={}",
        is_blocked(&mut world, hunter, &step, BlockCheck::Fast),
        is_blocked(&mut world, hunter, &step, BlockCheck::Precise)
    );
    let pond_rect = pond.real_bounds(block_size);
    println!(
        "step into pond: fast={} precise={}",
        is_blocked(&mut world, hunter, &pond_rect, BlockCheck::Fast),
        is_blocked(&mut world, hunter, &pond_rect, BlockCheck::Precise)
    );

    let mut active: ActiveTask<Box<dyn Behavior>> = ActiveTask::new();
    for number in 1..=4 {
        let tick = Tick::new(number, Duration::from_millis(100));
        let mut rater: TaskRater<Box<dyn Behavior>> = TaskRater::new();
        for enemy in living_hit_test(&mut world, area, None, Some(hunter), hostile) {
            let enemy_name = name(&enemy);
            let distance = enemy.position().distance_to(&hunter.position()) / block_size as f32;
            let in_sight = !is_sight_blocked(&mut world, hunter, enemy.as_ref(), 0.0);
            let (verb, score) = if in_sight {
                ("shoot", 100.0 - distance)
            } else {
                ("approach", 50.0 - distance)
            };
            let label = format!("{verb}:{enemy_name}");
            let plan_label = label.clone();
            rater.add_candidate(
                label,
                move |_tick: &Tick| -> Box<dyn Behavior> {
                    Box::new(Plan {
                        label: plan_label,
                        remaining: 2,
                    })
                },
                f64::from(score),
            );
        }
        let status = active.select(rater, &tick);
        println!(
            "ai tick {number}: task={} status={status:?}",
            active.identifier().unwrap_or("none")
        );
    }

    Ok(())
}
