//! Burning forest — headless simulation demo.
//!
//! Trees grow, catch fire, burn out and disappear. The player wanders until
//! the autopilot spots a fire, then walks over to put it out, splashing water
//! all around. Foxes and frogs drift aimlessly across the arena.
//!
//! Run with: `cargo run -p ember --example forest -- --seconds 30`
//!
//! Watch it live by starting `cargo run -p ember-telemetry` in another
//! terminal first.

use std::cell::Cell;
use std::f32::consts::TAU;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use ember::math::{polar, wrap_centered};
use ember::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

// ── Components ──────────────────────────────────────────────────────────

const TYPE: &str = "type"; // Kind
const POSITION: &str = "position"; // Vec2
const SPEED: &str = "speed"; // f32, px per second
const GOAL: &str = "goal"; // Option<Vec2>
const DRIFT: &str = "drift"; // Drift
const SHAPE: &str = "shape"; // Shape
const FIRE: &str = "fire"; // Fire
const REMAINS: &str = "remains"; // (), counts burnt trees on removal

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Player,
    Splash,
    Tree,
    Fox,
    Frog,
}

/// Random walk: head in one direction until `ttl` runs out, then pick another.
#[derive(Debug, Clone, Copy)]
struct Drift {
    speed: f32,
    angle: f32,
    ttl: f64,
}

impl Drift {
    fn player(rng: &mut impl Rng) -> Self {
        Self {
            speed: rng.gen_range(15.0..25.0),
            angle: rng.gen_range(0.0..TAU),
            ttl: rng.gen_range(1.0..2.0),
        }
    }

    fn fox(rng: &mut impl Rng) -> Self {
        Self {
            speed: 50.0,
            angle: rng.gen_range(0.0..TAU),
            ttl: rng.gen_range(2.0..3.0),
        }
    }

    fn frog(rng: &mut impl Rng) -> Self {
        Self {
            speed: 10.0,
            angle: rng.gen_range(0.0..TAU),
            ttl: rng.gen_range(0.5..1.0),
        }
    }

    fn for_kind(kind: Kind, rng: &mut impl Rng) -> Option<Self> {
        match kind {
            Kind::Player => Some(Self::player(rng)),
            Kind::Fox => Some(Self::fox(rng)),
            Kind::Frog => Some(Self::frog(rng)),
            Kind::Splash | Kind::Tree => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FireStatus {
    Idle,
    Burning,
    Dead,
}

#[derive(Debug, Clone, Copy)]
struct Fire {
    status: FireStatus,
    ttl: f64,
}

// ── Tuning ──────────────────────────────────────────────────────────────

const INITIAL_TREES: usize = 292;
const TREES_RATE: f64 = 1.0; // new trees per second
const BURN_TTL: f64 = 10.0;
const ASHES_TTL: f64 = 2.0;
const ANIMALS: usize = 100; // of each species
const PLAYER_SPEED: f32 = 200.0;
const EXTINGUISH_RADIUS: f32 = 20.0;
const SPLASHES: usize = 30;
const RETARGET_INTERVAL: f64 = 0.5;

/// The playing field, centred on the origin.
#[derive(Debug, Clone, Copy)]
struct Arena {
    size: Vec2,
}

impl Arena {
    /// Anywhere within one arena size of the origin; the clipper wraps it in.
    fn random_point(&self, rng: &mut impl Rng) -> Vec2 {
        Vec2::new(
            rng.gen_range(-self.size.x..self.size.x),
            rng.gen_range(-self.size.y..self.size.y),
        )
    }
}

// ── Systems ─────────────────────────────────────────────────────────────

struct TreeSpawner {
    arena: Arena,
    rng: StdRng,
    burnt: Rc<Cell<u32>>,
}

impl TreeSpawner {
    fn spawn_tree(&mut self, world: &mut World) {
        let burnt = Rc::clone(&self.burnt);
        let remains = ComponentValue::new(()).on_remove(move || {
            burnt.set(burnt.get() + 1);
            Ok(())
        });
        world
            .spawn()
            .with(TYPE, Kind::Tree)
            .with(POSITION, self.arena.random_point(&mut self.rng))
            .with(SHAPE, Shape { radius: self.rng.gen_range(18.0..24.0) })
            .with(
                FIRE,
                Fire {
                    status: FireStatus::Idle,
                    ttl: self.rng.gen_range(1.0..400.0),
                },
            )
            .with_value(REMAINS, remains)
            .id();
    }
}

impl System for TreeSpawner {
    fn init(&mut self, world: &mut World) -> SystemResult {
        for _ in 0..INITIAL_TREES {
            self.spawn_tree(world);
        }
        Ok(())
    }

    fn tick_before(&mut self, world: &mut World, delta: f64) -> SystemResult {
        if self.rng.gen_range(0.0..1.0) < delta * TREES_RATE {
            self.spawn_tree(world);
        }
        Ok(())
    }

    fn log(&self, world: &World) -> Option<serde_json::Value> {
        let (mut idle, mut burning, mut dead) = (0, 0, 0);
        for (_, value) in world.table(FIRE)?.iter() {
            match value.downcast_ref::<Fire>().map(|fire| fire.status) {
                Some(FireStatus::Idle) => idle += 1,
                Some(FireStatus::Burning) => burning += 1,
                Some(FireStatus::Dead) => dead += 1,
                None => {}
            }
        }
        Some(json!({ "idle": idle, "fire": burning, "dead": dead, "total": idle + burning + dead }))
    }
}

/// Idle trees eventually catch fire, burn for a while, then crumble away.
struct Firer;

impl System for Firer {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, delta: f64) -> SystemResult {
        let Some(&fire) = world.get::<Fire>(entity, FIRE) else {
            return Ok(());
        };
        if !world.has(entity, SHAPE) {
            return Ok(());
        }

        let ttl = fire.ttl - delta;
        if ttl >= 0.0 {
            world.set(entity, FIRE, Fire { ttl, ..fire });
            return Ok(());
        }
        match fire.status {
            FireStatus::Idle => world.set(
                entity,
                FIRE,
                Fire {
                    status: FireStatus::Burning,
                    ttl: BURN_TTL,
                },
            ),
            FireStatus::Burning => world.set(
                entity,
                FIRE,
                Fire {
                    status: FireStatus::Dead,
                    ttl: ASHES_TTL,
                },
            ),
            FireStatus::Dead => {
                world.remove_entity(entity)?;
            }
        }
        Ok(())
    }
}

/// Stands in for the mouse: sends every walker to the nearest burning tree.
struct AutoPilot {
    player: Entity,
    cooldown: f64,
    orders: u32,
}

impl AutoPilot {
    fn nearest_fire(world: &World, from: Vec2) -> Option<Vec2> {
        world
            .table(FIRE)?
            .iter()
            .filter(|(_, value)| {
                value
                    .downcast_ref::<Fire>()
                    .is_some_and(|fire| fire.status == FireStatus::Burning)
            })
            .filter_map(|(entity, _)| world.get::<Vec2>(entity, POSITION).copied())
            .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
    }
}

impl System for AutoPilot {
    fn tick_before(&mut self, world: &mut World, delta: f64) -> SystemResult {
        self.cooldown -= delta;
        if self.cooldown > 0.0 {
            return Ok(());
        }
        self.cooldown = RETARGET_INTERVAL;

        let Some(&from) = world.get::<Vec2>(self.player, POSITION) else {
            return Ok(());
        };
        if matches!(world.get::<Option<Vec2>>(self.player, GOAL), Some(Some(_))) {
            return Ok(());
        }
        let Some(target) = Self::nearest_fire(world, from) else {
            return Ok(());
        };

        let walkers: Vec<Entity> = world
            .table(GOAL)
            .map(|table| table.entities().collect())
            .unwrap_or_default();
        for walker in walkers {
            world.set(walker, GOAL, Some(target));
            world.remove_component(walker, DRIFT)?;
        }
        self.orders += 1;
        Ok(())
    }

    fn log(&self, _world: &World) -> Option<serde_json::Value> {
        Some(json!({ "orders": self.orders }))
    }
}

/// Walks entities with a goal straight to it, then lets them drift again.
struct Mover {
    rng: StdRng,
}

impl System for Mover {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, delta: f64) -> SystemResult {
        let (Some(&position), Some(&speed), Some(&Some(goal))) = (
            world.get::<Vec2>(entity, POSITION),
            world.get::<f32>(entity, SPEED),
            world.get::<Option<Vec2>>(entity, GOAL),
        ) else {
            return Ok(());
        };

        let step = speed * delta as f32;
        let next = position + (goal - position).normalize_or_zero() * step;
        if next.distance(goal) < step {
            world.set(entity, POSITION, goal);
            world.set(entity, GOAL, None::<Vec2>);
            world.set(entity, DRIFT, Drift::player(&mut self.rng));
        } else {
            world.set(entity, POSITION, next);
        }
        Ok(())
    }
}

struct Drifter {
    rng: StdRng,
}

impl System for Drifter {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, delta: f64) -> SystemResult {
        let (Some(&position), Some(&drift)) = (
            world.get::<Vec2>(entity, POSITION),
            world.get::<Drift>(entity, DRIFT),
        ) else {
            return Ok(());
        };

        let velocity = polar(drift.speed * delta as f32, drift.angle);
        world.set(entity, POSITION, position + velocity);

        let ttl = drift.ttl - delta;
        if ttl >= 0.0 {
            world.set(entity, DRIFT, Drift { ttl, ..drift });
            return Ok(());
        }
        let kind = world.get::<Kind>(entity, TYPE).copied();
        match kind.and_then(|kind| Drift::for_kind(kind, &mut self.rng)) {
            Some(next) => world.set(entity, DRIFT, next),
            None => {
                world.remove_component(entity, DRIFT)?;
            }
        }
        Ok(())
    }
}

/// Wraps positions around the arena edges.
struct ArenaClipper {
    arena: Arena,
}

impl System for ArenaClipper {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        if let Some(&position) = world.get::<Vec2>(entity, POSITION) {
            world.set(entity, POSITION, wrap_centered(position, self.arena.size));
        }
        Ok(())
    }
}

/// Puts out burning trees near the player. Saved trees regrow faster and
/// faster until the countdown bottoms out.
struct Extinguisher {
    player: Entity,
    countdown: i32,
    saved: u32,
    rng: StdRng,
}

impl System for Extinguisher {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        let Some(&player) = world.get::<Vec2>(self.player, POSITION) else {
            return Ok(());
        };
        let (Some(&position), Some(&fire)) = (
            world.get::<Vec2>(entity, POSITION),
            world.get::<Fire>(entity, FIRE),
        ) else {
            return Ok(());
        };
        if fire.status != FireStatus::Burning || position.distance(player) >= EXTINGUISH_RADIUS {
            return Ok(());
        }

        let ttl = self.rng.gen_range(5.0..f64::from(self.countdown.max(10)));
        self.countdown -= 1;
        world.set(
            entity,
            FIRE,
            Fire {
                status: FireStatus::Idle,
                ttl,
            },
        );
        self.saved += 1;

        for _ in 0..SPLASHES {
            let offset = polar(self.rng.gen_range(5.0..20.0), self.rng.gen_range(0.0..TAU));
            world
                .spawn()
                .with(TYPE, Kind::Splash)
                .with(POSITION, position + offset)
                .with(SHAPE, Shape { radius: self.rng.gen_range(2.0..8.0) })
                .id();
        }
        Ok(())
    }

    fn log(&self, _world: &World) -> Option<serde_json::Value> {
        Some(json!({ "countdown": self.countdown, "saved": self.saved }))
    }
}

// ── Host ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Burning forest simulation (headless)")]
struct Args {
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
    /// Stop after this many seconds.
    #[arg(long)]
    seconds: Option<f64>,
    /// Frames per second to pace to (0 = uncapped).
    #[arg(long, default_value_t = 60.0)]
    fps: f64,
    #[arg(long, default_value_t = 800.0)]
    width: f32,
    #[arg(long, default_value_t = 600.0)]
    height: f32,
    /// Random seed; picked at random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds between logged reports (0 = never).
    #[arg(long, default_value_t = 1.0)]
    log_every: f64,
    /// Don't ship frames to ember-telemetry.
    #[arg(long)]
    no_diagnostics: bool,
}

impl Args {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            target_fps: (self.fps > 0.0).then_some(self.fps),
            max_frames: self.frames,
            max_duration: self
                .seconds
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok()),
            diagnostics: !self.no_diagnostics,
        }
    }

    fn logger(&self) -> Logger {
        match Duration::try_from_secs_f64(self.log_every) {
            Ok(interval) if !interval.is_zero() => Logger::every(interval),
            _ => Logger::silent(),
        }
    }
}

fn main() -> Result<(), BoxError> {
    init_logger();
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let rng = |stream: u64| StdRng::seed_from_u64(seed.wrapping_add(stream));
    let arena = Arena {
        size: Vec2::new(args.width, args.height),
    };
    log::info!("forest: seed {seed}, arena {}x{}", args.width, args.height);

    let mut world = World::new();
    let mut spawn_rng = rng(0);
    let player = world
        .spawn()
        .with(TYPE, Kind::Player)
        .with(POSITION, Vec2::ZERO)
        .with(SPEED, PLAYER_SPEED)
        .with(GOAL, None::<Vec2>)
        .with(DRIFT, Drift::player(&mut spawn_rng))
        .with(SHAPE, Shape { radius: 10.0 })
        .id();
    for _ in 0..ANIMALS {
        world
            .spawn()
            .with(TYPE, Kind::Fox)
            .with(POSITION, arena.random_point(&mut spawn_rng))
            .with(DRIFT, Drift::fox(&mut spawn_rng))
            .with(SHAPE, Shape { radius: 6.0 })
            .id();
        world
            .spawn()
            .with(TYPE, Kind::Frog)
            .with(POSITION, arena.random_point(&mut spawn_rng))
            .with(DRIFT, Drift::frog(&mut spawn_rng))
            .with(SHAPE, Shape { radius: 6.0 })
            .id();
    }

    let burnt = Rc::new(Cell::new(0));
    let mut schedule = Schedule::new();
    schedule.declare_system(TreeSpawner {
        arena,
        rng: rng(1),
        burnt: Rc::clone(&burnt),
    });
    schedule.declare_system(Firer);
    schedule.declare_system(AutoPilot {
        player,
        cooldown: 0.0,
        orders: 0,
    });
    schedule.declare_system(Mover { rng: rng(2) });
    schedule.declare_system(Drifter { rng: rng(3) });
    schedule.declare_system(ArenaClipper { arena });
    let extinguisher = schedule.declare_system(Extinguisher {
        player,
        countdown: 100,
        saved: 0,
        rng: rng(4),
    });
    let logger = schedule.declare_system(args.logger());

    let mut runner = Runner::new(world, schedule).with_config(args.run_config());
    let summary = runner.run()?;

    let (world, schedule) = runner.into_parts();
    if let Some(report) = schedule.get(logger).and_then(Logger::report) {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    let saved = schedule.get(extinguisher).map_or(0, |e| e.saved);
    println!(
        "{} frames in {:.1?}: {} fires put out, {} trees burnt down, {} entities left",
        summary.frames,
        summary.elapsed,
        saved,
        burnt.get(),
        world.entity_count()
    );
    Ok(())
}
