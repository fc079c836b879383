use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember::error::Phase;
use ember::prelude::*;

fn ids(world: &World) -> Vec<u64> {
    world.entities().iter().map(|e| e.id()).collect()
}

fn counting_hook(count: &Rc<Cell<u32>>) -> impl FnOnce() -> Result<(), BoxError> + 'static {
    let count = Rc::clone(count);
    move || {
        count.set(count.get() + 1);
        Ok(())
    }
}

// ── Entities and components ─────────────────────────────────────────────

#[test]
fn removed_entity_leaves_gap_in_live_sequence() {
    let mut world = World::new();
    let e0 = world.create_entity();
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    assert_eq!([e0.id(), e1.id(), e2.id()], [0, 1, 2]);

    assert!(world.remove_entity(e1).unwrap());
    assert_eq!(ids(&world), vec![0, 2]);
}

#[test]
fn ids_keep_counting_across_removals() {
    let mut world = World::new();
    let mut created = Vec::new();
    for round in 0..4 {
        let e = world.create_entity();
        created.push(e.id());
        if round % 2 == 0 {
            world.remove_entity(e).unwrap();
        }
    }
    assert_eq!(created, vec![0, 1, 2, 3]);
    assert_eq!(ids(&world), vec![1, 3]);
}

#[test]
fn set_then_get_and_absent_names() {
    let mut world = World::new();
    let e = world.create_entity();
    world.set(e, "hp", 10);

    assert_eq!(world.get::<i32>(e, "hp"), Some(&10));
    assert_eq!(world.get::<i32>(e, "mana"), None);
}

#[test]
fn remove_component_fires_hook_once() {
    let mut world = World::new();
    let e = world.create_entity();
    let fired = Rc::new(Cell::new(0));
    world.set_value(e, "view", ComponentValue::new("div").on_remove(counting_hook(&fired)));

    assert!(world.remove_component(e, "view").unwrap());
    assert_eq!(fired.get(), 1);
    assert!(world.get_value(e, "view").is_none());

    assert!(!world.remove_component(e, "view").unwrap());
    assert_eq!(fired.get(), 1);
}

#[test]
fn overwrite_does_not_fire_hook() {
    let mut world = World::new();
    let e = world.create_entity();
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    world.set_value(e, "view", ComponentValue::new(1).on_remove(counting_hook(&first)));
    world.set_value(e, "view", ComponentValue::new(2).on_remove(counting_hook(&second)));
    assert_eq!(first.get(), 0);

    world.remove_entity(e).unwrap();
    assert_eq!(first.get(), 0);
    assert_eq!(second.get(), 1);
}

#[test]
fn remove_entity_strips_every_table() {
    let mut world = World::new();
    let e = world.create_entity();
    let other = world.create_entity();
    let fired = Rc::new(Cell::new(0));
    world.set(e, "hp", 3);
    world.set(e, "name", String::from("fox"));
    world.set_value(e, "view", ComponentValue::new(()).on_remove(counting_hook(&fired)));
    world.set(other, "hp", 7);
    world.declare_component("unused");

    assert!(world.remove_entity(e).unwrap());
    assert!(!world.is_alive(e));
    let names: Vec<String> = world.component_names().map(String::from).collect();
    for name in &names {
        assert!(world.get_value(e, name).is_none(), "{name} still holds {e}");
    }
    assert_eq!(fired.get(), 1);
    assert_eq!(world.get::<i32>(other, "hp"), Some(&7));

    // Second removal is a no-op.
    assert!(!world.remove_entity(e).unwrap());
    assert_eq!(fired.get(), 1);
}

#[test]
fn failing_hook_does_not_stop_entity_cleanup() {
    let mut world = World::new();
    let e = world.create_entity();
    let fired = Rc::new(Cell::new(0));
    world.set_value(
        e,
        "broken",
        ComponentValue::new(0).on_remove(|| Err("device lost".into())),
    );
    world.set_value(e, "view", ComponentValue::new(1).on_remove(counting_hook(&fired)));

    match world.remove_entity(e) {
        Err(EcsError::Teardown { entity, failures }) => {
            assert_eq!(entity, e);
            assert_eq!(failures.len(), 1);
            assert!(failures[0].to_string().contains("device lost"));
        }
        other => panic!("expected teardown error, got {other:?}"),
    }
    assert!(!world.is_alive(e));
    assert!(!world.has(e, "broken"));
    assert!(!world.has(e, "view"));
    assert_eq!(fired.get(), 1);
}

// ── Scheduling ──────────────────────────────────────────────────────────

/// Spawns one entity the first time it visits anything.
#[derive(Default)]
struct Breeder {
    visits: Vec<u64>,
    spawned: bool,
}

impl System for Breeder {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        self.visits.push(entity.id());
        if !self.spawned {
            self.spawned = true;
            world.create_entity();
        }
        Ok(())
    }
}

#[test]
fn entity_appended_mid_pass_is_visited() {
    let mut world = World::new();
    world.create_entity();
    let mut schedule = Schedule::new();
    let breeder = schedule.declare_system(Breeder::default());
    schedule.init(&mut world).unwrap();

    schedule.tick(&mut world, 0.016).unwrap();
    assert_eq!(schedule.get(breeder).unwrap().visits, vec![0, 1]);
}

type Trace = Rc<RefCell<Vec<String>>>;

struct Tracer {
    name: &'static str,
    trace: Trace,
}

impl Tracer {
    fn push(&self, event: String) {
        self.trace.borrow_mut().push(format!("{}:{event}", self.name));
    }
}

impl System for Tracer {
    fn tick_before(&mut self, _world: &mut World, delta: f64) -> SystemResult {
        self.push(format!("before({delta})"));
        Ok(())
    }

    fn tick_entity(&mut self, _world: &mut World, entity: Entity, delta: f64) -> SystemResult {
        self.push(format!("entity({entity},{delta})"));
        Ok(())
    }

    fn tick_after(&mut self, _world: &mut World, delta: f64) -> SystemResult {
        self.push(format!("after({delta})"));
        Ok(())
    }
}

fn traced(names: &[&'static str]) -> (World, Schedule, Trace) {
    let trace = Trace::default();
    let mut world = World::new();
    world.create_entity();
    world.create_entity();
    let mut schedule = Schedule::new();
    for &name in names {
        schedule.declare_system(Tracer {
            name,
            trace: Rc::clone(&trace),
        });
    }
    schedule.init(&mut world).unwrap();
    (world, schedule, trace)
}

#[test]
fn systems_run_whole_in_registration_order() {
    let (mut world, mut schedule, trace) = traced(&["a", "b"]);
    schedule.tick(&mut world, 0.5).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec![
            "a:before(0.5)",
            "a:entity(0,0.5)",
            "a:entity(1,0.5)",
            "a:after(0.5)",
            "b:before(0.5)",
            "b:entity(0,0.5)",
            "b:entity(1,0.5)",
            "b:after(0.5)",
        ]
    );
}

#[test]
fn negative_delta_is_forwarded_unchanged() {
    let (mut world, mut schedule, trace) = traced(&["a"]);
    schedule.tick(&mut world, -1.0).unwrap();

    assert_eq!(
        *trace.borrow(),
        vec!["a:before(-1)", "a:entity(0,-1)", "a:entity(1,-1)", "a:after(-1)"]
    );
}

/// Removes every entity it visits.
struct Reaper;

impl System for Reaper {
    fn tick_entity(&mut self, world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        world.remove_entity(entity)?;
        Ok(())
    }
}

#[test]
fn removing_the_visited_entity_skips_nobody() {
    let trace = Trace::default();
    let mut world = World::new();
    for _ in 0..3 {
        world.create_entity();
    }
    let mut schedule = Schedule::new();
    schedule.declare_system(Tracer {
        name: "t",
        trace: Rc::clone(&trace),
    });
    schedule.declare_system(Reaper);
    schedule.init(&mut world).unwrap();

    schedule.tick(&mut world, 1.0).unwrap();
    assert_eq!(world.entity_count(), 0);
    assert_eq!(trace.borrow().len(), 5);
}

struct Explodes;

impl System for Explodes {
    fn tick_entity(&mut self, _world: &mut World, entity: Entity, _delta: f64) -> SystemResult {
        if entity.id() == 1 {
            return Err("boom".into());
        }
        Ok(())
    }
}

#[test]
fn failure_aborts_rest_of_tick() {
    let trace = Trace::default();
    let mut world = World::new();
    world.create_entity();
    world.create_entity();
    let mut schedule = Schedule::new();
    schedule.declare_system(Explodes);
    schedule.declare_system(Tracer {
        name: "late",
        trace: Rc::clone(&trace),
    });
    schedule.init(&mut world).unwrap();

    let err = schedule.tick(&mut world, 0.1).unwrap_err();
    match &err {
        EcsError::System { system, phase, .. } => {
            assert_eq!(system, "Explodes");
            assert_eq!(*phase, Phase::Entity(world.entities()[1]));
        }
        other => panic!("expected system error, got {other:?}"),
    }
    assert!(trace.borrow().is_empty());

    // The next tick starts a fresh pass.
    assert!(schedule.tick(&mut world, 0.1).is_err());
}

// ── Host loop ───────────────────────────────────────────────────────────

#[test]
fn runner_feeds_logger_report() {
    let mut world = World::new();
    world.spawn().with("hp", 1).id();
    let mut schedule = Schedule::new();
    schedule.declare_system(Breeder::default());
    let logger = schedule.declare_system(Logger::silent());

    let mut runner = Runner::new(world, schedule)
        .uncapped()
        .max_frames(3)
        .diagnostics(false);
    let summary = runner.run().unwrap();
    assert_eq!(summary.frames, 3);

    let report = runner.schedule().get(logger).unwrap().report().unwrap();
    assert_eq!(report.entity_count, 2);
    assert_eq!(
        report.system_names().collect::<Vec<_>>(),
        vec!["Breeder", "Logger"]
    );
    assert!(report.time_ms("Breeder").is_some());
}

#[test]
fn diagnostics_follow_registration_order() {
    let mut world = World::new();
    world.create_entity();
    let mut schedule = Schedule::new();
    schedule.declare_system(Tracer {
        name: "t",
        trace: Trace::default(),
    });
    schedule.declare_system(Reaper);
    schedule.declare_system(Breeder::default());
    let logger = schedule.declare_system(Logger::silent());
    schedule.init(&mut world).unwrap();
    schedule.tick(&mut world, 0.1).unwrap();

    let expected = vec!["Tracer", "Reaper", "Breeder", "Logger"];
    assert_eq!(schedule.names().collect::<Vec<_>>(), expected);
    let timed: Vec<&str> = world.timings().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(timed, expected);
    let report = schedule.get(logger).unwrap().report().unwrap();
    assert_eq!(report.system_names().collect::<Vec<_>>(), expected);
}
