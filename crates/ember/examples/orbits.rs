//! Orbits — headless solar system demo.
//!
//! A sun, two planets, a moon and an asteroid belt. Every body orbits its
//! parent; the moon's parent is the earth, so it follows it around the sun.
//!
//! The host drives the runner frame by frame and talks to the `Orbiter`
//! through its handle: `--speed` sets the time coefficient (1.5^speed) and
//! `--pause-every` toggles the pause flag periodically.
//!
//! Run with: `cargo run -p ember --example orbits -- --seconds 10 --inspect 2`

use std::f32::consts::{PI, TAU};
use std::time::{Duration, Instant};

use clap::Parser;
use ember::math::polar;
use ember::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

// ── Components ──────────────────────────────────────────────────────────

const POSITION: &str = "position"; // Vec2
const ORBIT: &str = "orbit"; // Orbit
const SHAPE: &str = "shape"; // Shape

#[derive(Debug, Clone, Copy)]
struct Orbit {
    parent: Entity,
    radius: f32,
    /// Radians.
    angle: f32,
    /// Radians per second at coefficient 1.
    speed: f32,
}

#[derive(Debug, Clone, Copy)]
struct Shape {
    radius: f32,
    color: &'static str,
}

const ASTEROIDS: usize = 2000;

// ── Systems ─────────────────────────────────────────────────────────────

struct Orbiter {
    coef: f32,
    pause: bool,
}

impl System for Orbiter {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, delta: f64) -> SystemResult {
        if self.pause {
            return Ok(());
        }
        let Some(&orbit) = world.get::<Orbit>(entity, ORBIT) else {
            return Ok(());
        };

        let angle = (orbit.angle + self.coef * delta as f32 * orbit.speed).rem_euclid(TAU);
        world.set(entity, ORBIT, Orbit { angle, ..orbit });

        let Some(&parent) = world.get::<Vec2>(orbit.parent, POSITION) else {
            return Ok(());
        };
        world.set(entity, POSITION, parent + polar(orbit.radius, angle));
        Ok(())
    }

    fn log(&self, _world: &World) -> Option<serde_json::Value> {
        Some(json!({ "coef": self.coef, "pause": self.pause }))
    }
}

/// Reports on one selected body.
struct Inspector {
    selected: Option<Entity>,
    info: Option<serde_json::Value>,
}

impl System for Inspector {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        if self.selected != Some(entity) {
            return Ok(());
        }
        let mut info = json!({ "entity": entity });
        if let Some(position) = world.get::<Vec2>(entity, POSITION) {
            info["position"] = json!({ "x": position.x.round(), "y": position.y.round() });
        }
        if let Some(orbit) = world.get::<Orbit>(entity, ORBIT) {
            info["orbit"] = json!({
                "parent": orbit.parent,
                "radius": orbit.radius,
                "angle": (orbit.angle * 100.0).round() / 100.0,
                "speed": orbit.speed,
            });
        }
        if let Some(shape) = world.get::<Shape>(entity, SHAPE) {
            info["shape"] = json!({ "radius": shape.radius, "color": shape.color });
        }
        self.info = Some(info);
        Ok(())
    }

    fn log(&self, _world: &World) -> Option<serde_json::Value> {
        Some(json!({ "selected": self.selected, "info": self.info }))
    }
}

// ── Host ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Orbiting bodies simulation (headless)")]
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
    /// Time coefficient exponent: bodies move 1.5^speed times as fast.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    speed: f32,
    /// Toggle the pause flag every this many seconds.
    #[arg(long)]
    pause_every: Option<f64>,
    /// Entity id to report on.
    #[arg(long)]
    inspect: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds between logged reports (0 = never).
    #[arg(long, default_value_t = 1.0)]
    log_every: f64,
    /// Don't ship frames to ember-telemetry.
    #[arg(long)]
    no_diagnostics: bool,
}

fn build_world(rng: &mut impl Rng) -> World {
    let mut world = World::new();
    let sun = world
        .spawn()
        .with(POSITION, Vec2::ZERO)
        .with(SHAPE, Shape { radius: 50.0, color: "yellow" })
        .id();
    let earth = world
        .spawn()
        .with(ORBIT, Orbit { parent: sun, radius: 100.0, angle: 0.0, speed: 0.5 })
        .with(SHAPE, Shape { radius: 10.0, color: "blue" })
        .id();
    world
        .spawn()
        .with(ORBIT, Orbit { parent: earth, radius: 10.0, angle: 0.0, speed: 2.0 })
        .with(SHAPE, Shape { radius: 4.0, color: "grey" })
        .id();
    world
        .spawn()
        .with(ORBIT, Orbit { parent: sun, radius: 150.0, angle: PI, speed: 1.0 })
        .with(SHAPE, Shape { radius: 8.0, color: "red" })
        .id();
    for _ in 0..ASTEROIDS {
        let orbit = Orbit {
            parent: sun,
            radius: rng.gen_range(300.0..350.0),
            angle: rng.gen_range(0.0..TAU),
            speed: rng.gen_range(0.1..0.15),
        };
        world
            .spawn()
            .with(ORBIT, orbit)
            .with(SHAPE, Shape { radius: rng.gen_range(1.0..2.0), color: "black" })
            .id();
    }
    world
}

fn main() -> Result<(), BoxError> {
    init_logger();
    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);
    let world = build_world(&mut StdRng::seed_from_u64(seed));

    let selected = args
        .inspect
        .and_then(|id| world.entities().iter().copied().find(|e| e.id() == id));
    if args.inspect.is_some() && selected.is_none() {
        log::warn!("no entity with id {:?}, inspector idle", args.inspect);
    }

    let mut schedule = Schedule::new();
    let orbiter = schedule.declare_system(Orbiter {
        coef: 1.5f32.powf(args.speed),
        pause: false,
    });
    let inspector = schedule.declare_system(Inspector { selected, info: None });
    let logger = if args.log_every > 0.0 {
        Logger::every(Duration::from_secs_f64(args.log_every))
    } else {
        Logger::silent()
    };
    let logger = schedule.declare_system(logger);

    let mut runner = Runner::new(world, schedule)
        .target_fps(args.fps)
        .diagnostics(!args.no_diagnostics);
    let frame = (args.fps > 0.0).then(|| Duration::from_secs_f64(1.0 / args.fps));
    let max_duration = args
        .seconds
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    let mut since_toggle = 0.0;

    loop {
        let time = runner.time();
        if args.frames.is_some_and(|max| time.frame_count() >= max)
            || max_duration.is_some_and(|max| time.elapsed() >= max)
        {
            break;
        }

        since_toggle += runner.step()?;
        if args.pause_every.is_some_and(|every| since_toggle >= every) {
            since_toggle = 0.0;
            if let Some(orbiter) = runner.schedule_mut().get_mut(orbiter) {
                orbiter.pause = !orbiter.pause;
                log::info!("orbiter {}", if orbiter.pause { "paused" } else { "resumed" });
            }
        }

        if let Some(frame) = frame {
            let deadline = runner.time().frame_start() + frame;
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
        }
    }

    let schedule = runner.schedule();
    if let Some(info) = schedule.get(inspector).and_then(|i| i.info.as_ref()) {
        println!("{}", serde_json::to_string_pretty(info)?);
    }
    if let Some(report) = schedule.get(logger).and_then(Logger::report) {
        println!("{}", serde_json::to_string_pretty(report)?);
    }
    Ok(())
}
