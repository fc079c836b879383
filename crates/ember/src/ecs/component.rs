//! # Component — Named Tables of Opaque Values
//!
//! Components live in a "table of tables": one [`ComponentTable`] per
//! component name, each mapping entity → value. A system that cares about
//! every entity with a `fire` component scans the `fire` table alone instead
//! of filtering all entities.
//!
//! ```text
//! "position" ─► { 0: Vec2(0, 0), 2: Vec2(4, 1) }
//! "fire"     ─► { 2: Fire { status: Idle, ttl: 12.0 } }
//! "view"     ─► { 0: Handle(7) + on-remove }
//! ```
//!
//! ## Why `Box<dyn Any>`?
//!
//! The runtime never interprets component payloads, only systems do. A value
//! is stored type-erased and read back with a downcast. Alongside the payload
//! we keep a debug formatter (so snapshots can print it) and, optionally, a
//! teardown action.
//!
//! ## Teardown Actions
//!
//! A value either carries an on-remove action or it doesn't; the table checks
//! [`ComponentValue::has_teardown`] explicitly. The action is a `FnOnce`, so it
//! can fire at most once. It fires when the entry is removed, never when the
//! entry is overwritten.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::entity::Entity;
use crate::error::{BoxError, EcsError};

/// Teardown action attached to a component value.
pub type OnRemove = Box<dyn FnOnce() -> Result<(), BoxError>>;

/// A type-erased component payload plus its optional teardown action.
pub struct ComponentValue {
    data: Box<dyn Any>,
    type_name: &'static str,
    describe: fn(&dyn Any) -> String,
    on_remove: Option<OnRemove>,
}

impl ComponentValue {
    /// Wrap a plain value with no teardown action.
    pub fn new<T: Any + fmt::Debug>(value: T) -> Self {
        Self {
            data: Box::new(value),
            type_name: std::any::type_name::<T>(),
            describe: describe_as::<T>,
            on_remove: None,
        }
    }

    /// Attach a teardown action, run once when this value is removed from its
    /// table.
    pub fn on_remove<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + 'static,
    {
        self.on_remove = Some(Box::new(hook));
        self
    }

    /// Returns `true` if this value still carries a teardown action.
    pub fn has_teardown(&self) -> bool {
        self.on_remove.is_some()
    }

    /// Downcast to the concrete payload type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Returns `true` if the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.data.is::<T>()
    }

    /// Full type name of the payload.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `Debug` rendering of the payload.
    pub fn describe(&self) -> String {
        (self.describe)(&*self.data)
    }

    /// Take the teardown action out and run it. `None` if there was none.
    fn teardown(&mut self) -> Option<Result<(), BoxError>> {
        self.on_remove.take().map(|hook| hook())
    }
}

impl fmt::Debug for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())?;
        if self.has_teardown() {
            f.write_str(" +on_remove")?;
        }
        Ok(())
    }
}

fn describe_as<T: Any + fmt::Debug>(any: &dyn Any) -> String {
    match any.downcast_ref::<T>() {
        Some(value) => format!("{:?}", value),
        None => "<opaque>".to_string(),
    }
}

// ── ComponentTable ───────────────────────────────────────────────────

/// All values stored under one component name, keyed by entity.
///
/// Entries iterate in ascending entity order, which is also creation order.
pub struct ComponentTable {
    name: String,
    entries: BTreeMap<Entity, ComponentValue>,
}

impl ComponentTable {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&ComponentValue> {
        self.entries.get(&entity)
    }

    /// Iterate `(entity, value)` pairs in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &ComponentValue)> {
        self.entries.iter().map(|(&entity, value)| (entity, value))
    }

    /// Entities that currently have an entry in this table.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.keys().copied()
    }

    /// Store or overwrite. The replaced value is dropped without running its
    /// teardown action.
    fn insert(&mut self, entity: Entity, value: ComponentValue) {
        self.entries.insert(entity, value);
    }

    /// Delete the entry for `entity`, running its teardown action first.
    ///
    /// The entry is gone afterwards even if the action fails. Returns whether
    /// an entry existed.
    fn remove(&mut self, entity: Entity) -> Result<bool, EcsError> {
        let Some(mut value) = self.entries.remove(&entity) else {
            return Ok(false);
        };
        if value.has_teardown() {
            if let Some(Err(source)) = value.teardown() {
                return Err(EcsError::Hook {
                    entity,
                    component: self.name.clone(),
                    source,
                });
            }
        }
        Ok(true)
    }
}

// ── Components ───────────────────────────────────────────────────────

/// The table of tables. Tables are created lazily and never dropped; they
/// keep their declaration order.
pub(crate) struct Components {
    tables: Vec<ComponentTable>,
    index: HashMap<String, usize>,
}

impl Components {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Ensure a table exists for `name` and return it.
    pub fn declare(&mut self, name: &str) -> &mut ComponentTable {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.tables.len();
                self.tables.push(ComponentTable::new(name));
                self.index.insert(name.to_string(), idx);
                log::debug!("declared component table `{}`", name);
                idx
            }
        };
        &mut self.tables[idx]
    }

    pub fn table(&self, name: &str) -> Option<&ComponentTable> {
        self.index.get(name).map(|&idx| &self.tables[idx])
    }

    pub fn get(&self, entity: Entity, name: &str) -> Option<&ComponentValue> {
        self.table(name)?.get(entity)
    }

    pub fn set(&mut self, entity: Entity, name: &str, value: ComponentValue) {
        self.declare(name).insert(entity, value);
    }

    pub fn remove(&mut self, entity: Entity, name: &str) -> Result<bool, EcsError> {
        self.declare(name).remove(entity)
    }

    /// Strip `entity` from every declared table, in declaration order.
    ///
    /// A failing teardown action does not stop the sweep; every failure is
    /// collected and returned.
    pub fn remove_all(&mut self, entity: Entity) -> Vec<EcsError> {
        let mut failures = Vec::new();
        for table in &mut self.tables {
            if let Err(err) = table.remove(entity) {
                failures.push(err);
            }
        }
        failures
    }

    pub fn tables(&self) -> &[ComponentTable] {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    fn counting_hook(counter: &Rc<Cell<u32>>) -> impl FnOnce() -> Result<(), BoxError> + 'static {
        let counter = Rc::clone(counter);
        move || {
            counter.set(counter.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn value_downcast_and_describe() {
        let value = ComponentValue::new(10u32);
        assert_eq!(value.downcast_ref::<u32>(), Some(&10));
        assert!(value.downcast_ref::<i64>().is_none());
        assert!(value.is::<u32>());
        assert_eq!(value.describe(), "10");
        assert_eq!(value.type_name(), "u32");
    }

    #[test]
    fn stored_none_is_a_value() {
        let mut components = Components::new();
        components.set(Entity(0), "goal", ComponentValue::new(None::<(f32, f32)>));
        let stored = components.get(Entity(0), "goal").unwrap();
        assert_eq!(stored.downcast_ref::<Option<(f32, f32)>>(), Some(&None));
    }

    #[test]
    fn declare_is_idempotent() {
        let mut components = Components::new();
        components.declare("hp");
        components.set(Entity(0), "hp", ComponentValue::new(3));
        components.declare("hp");
        assert_eq!(components.tables().len(), 1);
        assert_eq!(components.table("hp").unwrap().len(), 1);
    }

    #[test]
    fn remove_runs_teardown_once() {
        let fired = Rc::new(Cell::new(0));
        let mut components = Components::new();
        components.set(
            Entity(0),
            "view",
            ComponentValue::new("div").on_remove(counting_hook(&fired)),
        );

        assert!(components.remove(Entity(0), "view").unwrap());
        assert_eq!(fired.get(), 1);
        assert!(components.get(Entity(0), "view").is_none());

        assert!(!components.remove(Entity(0), "view").unwrap());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn overwrite_skips_teardown() {
        let fired = Rc::new(Cell::new(0));
        let mut components = Components::new();
        components.set(
            Entity(0),
            "view",
            ComponentValue::new(1).on_remove(counting_hook(&fired)),
        );
        components.set(Entity(0), "view", ComponentValue::new(2));
        assert_eq!(fired.get(), 0);
        assert_eq!(
            components.get(Entity(0), "view").unwrap().downcast_ref::<i32>(),
            Some(&2)
        );
    }

    #[test]
    fn failing_teardown_still_deletes_entry() {
        let mut components = Components::new();
        components.set(
            Entity(5),
            "view",
            ComponentValue::new(()).on_remove(|| Err("element already detached".into())),
        );
        let err = components.remove(Entity(5), "view").unwrap_err();
        assert!(matches!(err, EcsError::Hook { entity: Entity(5), .. }));
        assert!(components.get(Entity(5), "view").is_none());
    }

    #[test]
    fn remove_all_continues_past_failures() {
        let fired = Rc::new(Cell::new(0));
        let mut components = Components::new();
        components.set(
            Entity(1),
            "a",
            ComponentValue::new(()).on_remove(|| Err("first".into())),
        );
        components.set(
            Entity(1),
            "b",
            ComponentValue::new(()).on_remove(counting_hook(&fired)),
        );
        components.set(Entity(2), "b", ComponentValue::new(()));

        let failures = components.remove_all(Entity(1));
        assert_eq!(failures.len(), 1);
        assert_eq!(fired.get(), 1);
        assert!(components.get(Entity(1), "a").is_none());
        assert!(components.get(Entity(1), "b").is_none());
        assert!(components.get(Entity(2), "b").is_some());
    }

    #[test]
    fn table_iterates_in_entity_order() {
        let mut components = Components::new();
        components.set(Entity(9), "hp", ComponentValue::new(9));
        components.set(Entity(2), "hp", ComponentValue::new(2));
        components.set(Entity(4), "hp", ComponentValue::new(4));
        let order: Vec<u64> = components
            .table("hp")
            .unwrap()
            .entities()
            .map(|e| e.id())
            .collect();
        assert_eq!(order, vec![2, 4, 9]);
    }

    #[test]
    fn debug_marks_teardown() {
        let value = ComponentValue::new(7u8).on_remove(|| Ok(()));
        assert_eq!(format!("{:?}", value), "7 +on_remove");
    }
}
