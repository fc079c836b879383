//! # System — Stateful Units of Behaviour
//!
//! A system is a struct implementing [`System`]. It owns whatever state it
//! needs between ticks and gets `&mut World` on every hook, so it can read and
//! write components and create or remove entities.
//!
//! ## Lifecycle
//!
//! Each tick, for every system in registration order:
//!
//! ```text
//! start stopwatch
//! tick_before(delta)
//! for entity in live sequence:  tick_entity(entity, delta)
//! tick_after(delta)
//! stop stopwatch → Timings
//! ```
//!
//! `init` runs once per system, in registration order, before the first tick.
//! Every hook defaults to a no-op, so a system only implements what it uses.
//!
//! ## Live Traversal
//!
//! The per-entity loop reads through to the world's live sequence instead of
//! copying it first. Entities created earlier in the same tick (by this system
//! or an earlier one) are visited if they were appended before the loop ends;
//! entities removed before the loop reaches them are not visited. See
//! [`entity`](super::entity) for how the cursor survives removals.
//!
//! ## Failures
//!
//! Hooks return [`SystemResult`]. The first failure aborts the rest of the
//! tick (including later systems) and comes back from [`Schedule::tick`] as
//! [`EcsError::System`]. The failing system's timing is not recorded.

use std::any::Any;
use std::marker::PhantomData;

use super::entity::Entity;
use super::timing::Stopwatch;
use super::world::World;
use crate::error::{BoxError, EcsError, EcsResult, Phase};

/// Result of a system hook.
pub type SystemResult = Result<(), BoxError>;

/// A unit of behaviour run once per tick over every live entity.
///
/// `delta` is the elapsed time in seconds supplied by the host. It is passed
/// through untouched: zero and negative values reach the hooks as-is.
pub trait System {
    /// One-time setup, before the first tick.
    fn init(&mut self, _world: &mut World) -> SystemResult {
        Ok(())
    }

    /// Called once at the start of this system's tick.
    fn tick_before(&mut self, _world: &mut World, _delta: f64) -> SystemResult {
        Ok(())
    }

    /// Called once per live entity.
    fn tick_entity(&mut self, _world: &mut World, _entity: Entity, _delta: f64) -> SystemResult {
        Ok(())
    }

    /// Called once at the end of this system's tick.
    fn tick_after(&mut self, _world: &mut World, _delta: f64) -> SystemResult {
        Ok(())
    }

    /// Optional summary of the system's internal counters, collected after
    /// every tick for diagnostics.
    fn log(&self, _world: &World) -> Option<serde_json::Value> {
        None
    }
}

/// Object-safe view of a registered system that can also be downcast back to
/// its concrete type.
trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System + 'static> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Typed reference to a system registered with [`Schedule::declare_system`].
pub struct SystemHandle<S> {
    index: usize,
    marker: PhantomData<fn() -> S>,
}

impl<S> SystemHandle<S> {
    /// Registration index. Also the index into [`Timings`](super::timing::Timings).
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<S> Clone for SystemHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SystemHandle<S> {}

/// A registered system with a short name for diagnostics.
struct NamedSystem {
    name: String,
    system: Box<dyn AnySystem>,
}

/// An ordered list of systems, fixed once [`Schedule::init`] has run.
pub struct Schedule {
    systems: Vec<NamedSystem>,
    initialized: bool,
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            systems: Vec::new(),
            initialized: false,
        }
    }

    /// Register a system at the end of the schedule. The returned handle gives
    /// the host typed access to it later.
    ///
    /// # Panics
    ///
    /// Panics if called after [`Schedule::init`].
    pub fn declare_system<S: System + 'static>(&mut self, system: S) -> SystemHandle<S> {
        let name = short_system_name(std::any::type_name::<S>());
        assert!(
            !self.initialized,
            "Cannot declare system `{}` after the schedule was initialized",
            name
        );
        let index = self.systems.len();
        log::debug!("declared system #{} `{}`", index, name);
        self.systems.push(NamedSystem {
            name,
            system: Box::new(system),
        });
        SystemHandle {
            index,
            marker: PhantomData,
        }
    }

    /// Shared access to a registered system.
    pub fn get<S: System + 'static>(&self, handle: SystemHandle<S>) -> Option<&S> {
        self.systems
            .get(handle.index)?
            .system
            .as_any()
            .downcast_ref::<S>()
    }

    /// Mutable access to a registered system, e.g. to flip a setting between
    /// ticks.
    pub fn get_mut<S: System + 'static>(&mut self, handle: SystemHandle<S>) -> Option<&mut S> {
        self.systems
            .get_mut(handle.index)?
            .system
            .as_any_mut()
            .downcast_mut::<S>()
    }

    /// Run every system's `init`, in registration order. Call once, after all
    /// systems are declared.
    pub fn init(&mut self, world: &mut World) -> EcsResult<()> {
        if self.initialized {
            log::warn!("schedule already initialized, skipping init");
            return Ok(());
        }
        self.initialized = true;
        for (index, ns) in self.systems.iter_mut().enumerate() {
            world.timings_mut().register(index, &ns.name);
            ns.system.init(world).map_err(|source| EcsError::System {
                system: ns.name.clone(),
                phase: Phase::Init,
                source,
            })?;
        }
        log::debug!("schedule initialized with {} system(s)", self.systems.len());
        Ok(())
    }

    /// Run one tick of every system, strictly in registration order.
    pub fn tick(&mut self, world: &mut World, delta: f64) -> EcsResult<()> {
        for (index, ns) in self.systems.iter_mut().enumerate() {
            let stopwatch = Stopwatch::start();
            run_system(ns, world, delta)?;
            let elapsed = stopwatch.elapsed();
            let log = ns.system.log(world);
            world.timings_mut().record(index, &ns.name, elapsed, log);
        }
        Ok(())
    }

    /// Number of registered systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// System names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|ns| ns.name.as_str())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

/// The before → per-entity → after sequence for one system.
fn run_system(ns: &mut NamedSystem, world: &mut World, delta: f64) -> EcsResult<()> {
    let fail = |phase: Phase| {
        let system = ns.name.clone();
        move |source| EcsError::System {
            system,
            phase,
            source,
        }
    };

    ns.system
        .tick_before(world, delta)
        .map_err(fail(Phase::Before))?;

    world.begin_pass();
    let mut outcome = Ok(());
    while let Some(entity) = world.next_in_pass() {
        if let Err(source) = ns.system.tick_entity(world, entity, delta) {
            outcome = Err(fail(Phase::Entity(entity))(source));
            break;
        }
    }
    world.end_pass();
    outcome?;

    ns.system
        .tick_after(world, delta)
        .map_err(fail(Phase::After))
}

/// Strip the module path from a fully-qualified type name, keeping only the
/// last meaningful segment (e.g. `forest::TreeSpawner` → `TreeSpawner`,
/// `ember::diag::Logger` → `Logger`). Generic arguments are dropped.
fn short_system_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
