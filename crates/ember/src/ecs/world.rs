//! # World — The Central Container
//!
//! The [`World`] owns the live entity sequence, every component table, and the
//! per-system timing record. Systems receive `&mut World` on every hook; there
//! is no global state anywhere else.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │ World                                                │
//! │                                                      │
//! │  EntityStore: live ids (ascending) + next id         │
//! │               + cursor of the running pass           │
//! │                                                      │
//! │  Components: name → ComponentTable                   │
//! │              table = BTreeMap<Entity, ComponentValue> │
//! │                                                      │
//! │  Timings: last tick duration + log per system        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reads, Writes, Removals
//!
//! - Reading a component that isn't there returns `None`. That is the normal
//!   case, not an error.
//! - Writing replaces the whole value; there is no in-place mutation.
//! - Removing something that isn't there does nothing.
//! - Values may be written for any id, live or not; removing an entity strips
//!   its id from every table regardless.

use std::any::Any;
use std::fmt;

use super::component::{ComponentTable, ComponentValue, Components};
use super::entity::{Entity, EntityStore};
use super::snapshot::WorldSnapshot;
use super::timing::Timings;
use crate::error::{EcsError, EcsResult};

/// Entity churn since the last call to [`World::take_entity_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityStats {
    pub allocated: u64,
    pub live: usize,
    pub created: u32,
    pub removed: u32,
}

/// The central container for all simulation state.
pub struct World {
    entities: EntityStore,
    components: Components,
    timings: Timings,
    created_since_stats: u32,
    removed_since_stats: u32,
}

impl World {
    pub fn new() -> Self {
        Self {
            entities: EntityStore::new(),
            components: Components::new(),
            timings: Timings::new(),
            created_since_stats: 0,
            removed_since_stats: 0,
        }
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Create an entity with no components and append it to the live
    /// sequence.
    pub fn create_entity(&mut self) -> Entity {
        self.created_since_stats += 1;
        self.entities.create()
    }

    /// Create an entity and attach its initial components through a builder.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let tree = world
    ///     .spawn()
    ///     .with("type", Kind::Tree)
    ///     .with("shape", Shape { radius: 20.0 })
    ///     .id();
    /// ```
    pub fn spawn(&mut self) -> EntityBuilder<'_> {
        let entity = self.create_entity();
        EntityBuilder {
            world: self,
            entity,
        }
    }

    /// Remove an entity: strip it from every declared component table (running
    /// teardown actions) and drop it from the live sequence.
    ///
    /// Returns `Ok(true)` if the entity was live, `Ok(false)` if it was not.
    /// Teardown failures don't interrupt the cleanup; they are logged and
    /// returned together as [`EcsError::Teardown`] once every table has been
    /// visited.
    pub fn remove_entity(&mut self, entity: Entity) -> EcsResult<bool> {
        let was_live = self.entities.remove(entity);
        if was_live {
            self.removed_since_stats += 1;
        }
        let failures = self.components.remove_all(entity);
        if failures.is_empty() {
            return Ok(was_live);
        }
        for failure in &failures {
            log::error!("{}", failure);
        }
        Err(EcsError::Teardown { entity, failures })
    }

    /// Live entities, in creation order.
    pub fn entities(&self) -> &[Entity] {
        self.entities.live()
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entity counters, resetting the created/removed tallies.
    pub fn take_entity_stats(&mut self) -> EntityStats {
        let stats = EntityStats {
            allocated: self.entities.allocated(),
            live: self.entities.len(),
            created: self.created_since_stats,
            removed: self.removed_since_stats,
        };
        self.created_since_stats = 0;
        self.removed_since_stats = 0;
        stats
    }

    // ── Scheduler pass ───────────────────────────────────────────────

    pub(crate) fn begin_pass(&mut self) {
        self.entities.begin_pass();
    }

    pub(crate) fn next_in_pass(&mut self) -> Option<Entity> {
        self.entities.next_in_pass()
    }

    pub(crate) fn end_pass(&mut self) {
        self.entities.end_pass();
    }

    // ── Components ───────────────────────────────────────────────────

    /// Ensure a table exists for `name`. Idempotent.
    pub fn declare_component(&mut self, name: &str) {
        self.components.declare(name);
    }

    /// Get a component value, downcast to `T`.
    ///
    /// Returns `None` if the entity has no `name` component. Reading never
    /// creates a table, so a name that was only ever read stays out of
    /// [`World::component_names`] and snapshots.
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not a `T`. Use [`World::try_get`] to
    /// handle that case.
    pub fn get<T: Any>(&self, entity: Entity, name: &str) -> Option<&T> {
        self.try_get(entity, name)
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Like [`World::get`], but reports a type mismatch as an error. Does not
    /// declare the table either.
    pub fn try_get<T: Any>(&self, entity: Entity, name: &str) -> EcsResult<Option<&T>> {
        let Some(value) = self.components.get(entity, name) else {
            return Ok(None);
        };
        match value.downcast_ref::<T>() {
            Some(typed) => Ok(Some(typed)),
            None => Err(EcsError::TypeMismatch {
                entity,
                component: name.to_string(),
                expected: std::any::type_name::<T>(),
                found: value.type_name(),
            }),
        }
    }

    /// Get the stored value without downcasting.
    pub fn get_value(&self, entity: Entity, name: &str) -> Option<&ComponentValue> {
        self.components.get(entity, name)
    }

    /// Returns `true` if the entity has a `name` component (even one holding
    /// `None`).
    pub fn has(&self, entity: Entity, name: &str) -> bool {
        self.components.get(entity, name).is_some()
    }

    /// Store a component value, replacing any previous one. The replaced value
    /// is dropped without running its teardown action.
    pub fn set<T: Any + fmt::Debug>(&mut self, entity: Entity, name: &str, value: T) {
        self.components.set(entity, name, ComponentValue::new(value));
    }

    /// Store a prepared [`ComponentValue`], e.g. one carrying a teardown
    /// action.
    pub fn set_value(&mut self, entity: Entity, name: &str, value: ComponentValue) {
        self.components.set(entity, name, value);
    }

    /// Remove a component, running its teardown action if it has one.
    ///
    /// Returns `Ok(false)` if there was nothing to remove. If the teardown
    /// action fails the entry is still removed and the failure is returned.
    pub fn remove_component(&mut self, entity: Entity, name: &str) -> EcsResult<bool> {
        self.components.remove(entity, name)
    }

    /// Names of every declared component table, in declaration order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.tables().iter().map(ComponentTable::name)
    }

    /// The whole table for one component name, for systems that want to scan
    /// it directly.
    pub fn table(&self, name: &str) -> Option<&ComponentTable> {
        self.components.table(name)
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    /// Last tick duration and log of every registered system.
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub(crate) fn timings_mut(&mut self) -> &mut Timings {
        &mut self.timings
    }

    /// Project the live entities and every component table into a
    /// serializable snapshot.
    pub fn snapshot(&self) -> WorldSnapshot {
        let components = self
            .components
            .tables()
            .iter()
            .map(|table| {
                let entries = table
                    .iter()
                    .map(|(entity, value)| (entity, value.describe()))
                    .collect();
                (table.name().to_string(), entries)
            })
            .collect();
        WorldSnapshot {
            entities: self.entities.live().to_vec(),
            components,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder returned by [`World::spawn`]. The entity already exists; each call
/// attaches one more component.
pub struct EntityBuilder<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl EntityBuilder<'_> {
    /// Attach a component.
    pub fn with<T: Any + fmt::Debug>(self, name: &str, value: T) -> Self {
        self.world.set(self.entity, name, value);
        self
    }

    /// Attach a prepared [`ComponentValue`].
    pub fn with_value(self, name: &str, value: ComponentValue) -> Self {
        self.world.set_value(self.entity, name, value);
        self
    }

    /// Finish building and return the entity.
    pub fn id(self) -> Entity {
        self.entity
    }
}
