//! # Entity — Monotonic Identifiers and the Live Sequence
//!
//! An [`Entity`] is just a number; it doesn't "contain" anything. Instead, the
//! [`World`](super::world::World) maps entities to their components, one table
//! per component name.
//!
//! ## Design: Never Reuse an Id
//!
//! Ids come from a counter that starts at 0 and only ever goes up. A removed
//! id is gone for good, so a stale `Entity` held by a system can never alias a
//! newer entity:
//!
//! ```text
//! create → 0, create → 1, create → 2
//! remove 1
//! create → 3          (1 is never handed out again)
//! live:  [0, 2, 3]
//! ```
//!
//! Because ids are strictly increasing and removal never reorders survivors,
//! the live sequence is always sorted. Membership checks are a binary search.
//!
//! ## Read-Through Passes
//!
//! The scheduler walks the live sequence while systems are free to create and
//! remove entities. [`EntityStore`] keeps the position of that walk (the pass
//! cursor) next to the sequence itself, so mutations stay visible to the walk:
//!
//! - entities appended during the pass are visited when the cursor reaches them;
//! - entities removed before the cursor reaches them are never visited;
//! - removing an already-visited entity shifts the cursor back by one, so the
//!   next survivor is not skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A lightweight handle to an entity in the [`World`](super::world::World).
///
/// Entities are created via [`World::create_entity`](super::world::World::create_entity)
/// and destroyed via [`World::remove_entity`](super::world::World::remove_entity).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub(crate) u64);

impl Entity {
    /// Returns the raw id.
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the ordered set of live entities and the id counter.
///
/// ## Memory Layout
///
/// ```text
/// live:    [0, 2, 3]   ← ascending, creation order among survivors
/// next_id: 4           ← never decreases
/// cursor:  Some(1)     ← index of the next entity a pass will visit
/// ```
pub(crate) struct EntityStore {
    live: Vec<Entity>,
    next_id: u64,
    /// Position of the in-progress scheduler pass, if any.
    cursor: Option<usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            live: Vec::new(),
            next_id: 0,
            cursor: None,
        }
    }

    /// Allocate the next id and append it to the live sequence.
    pub fn create(&mut self) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        self.live.push(entity);
        entity
    }

    /// Remove an entity from the live sequence.
    ///
    /// Returns `true` if the entity was live, `false` if it was already gone
    /// (or never existed).
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Ok(index) = self.live.binary_search(&entity) else {
            return false;
        };
        self.live.remove(index);
        if let Some(cursor) = self.cursor.as_mut() {
            if index < *cursor {
                *cursor -= 1;
            }
        }
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.live.binary_search(&entity).is_ok()
    }

    pub fn live(&self) -> &[Entity] {
        &self.live
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Total number of ids ever handed out. Also the next id.
    pub fn allocated(&self) -> u64 {
        self.next_id
    }

    // ── Pass cursor ──────────────────────────────────────────────────

    /// Start walking the live sequence from the front.
    pub fn begin_pass(&mut self) {
        self.cursor = Some(0);
    }

    /// Return the entity at the cursor and advance, or `None` when the walk
    /// has reached the end of the (current) live sequence.
    pub fn next_in_pass(&mut self) -> Option<Entity> {
        let cursor = self.cursor.as_mut()?;
        let entity = self.live.get(*cursor).copied()?;
        *cursor += 1;
        Some(entity)
    }

    pub fn end_pass(&mut self) {
        self.cursor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(store: &EntityStore) -> Vec<u64> {
        store.live().iter().map(|e| e.id()).collect()
    }

    #[test]
    fn create_sequential() {
        let mut store = EntityStore::new();
        let e0 = store.create();
        let e1 = store.create();
        let e2 = store.create();
        assert_eq!((e0.id(), e1.id(), e2.id()), (0, 1, 2));
        assert_eq!(ids(&store), vec![0, 1, 2]);
    }

    #[test]
    fn ids_never_reused() {
        let mut store = EntityStore::new();
        let e0 = store.create();
        assert!(store.remove(e0));
        let e1 = store.create();
        assert_eq!(e1.id(), 1);
        assert_eq!(store.allocated(), 2);
    }

    #[test]
    fn remove_preserves_order() {
        let mut store = EntityStore::new();
        for _ in 0..5 {
            store.create();
        }
        store.remove(Entity(1));
        store.remove(Entity(3));
        assert_eq!(ids(&store), vec![0, 2, 4]);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut store = EntityStore::new();
        store.create();
        assert!(!store.remove(Entity(7)));
        assert!(store.remove(Entity(0)));
        assert!(!store.remove(Entity(0)));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn pass_sees_appended_entities() {
        let mut store = EntityStore::new();
        store.create();
        store.begin_pass();
        let mut seen = Vec::new();
        while let Some(e) = store.next_in_pass() {
            seen.push(e.id());
            if e.id() == 0 {
                store.create();
            }
        }
        store.end_pass();
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn pass_skips_entities_removed_ahead() {
        let mut store = EntityStore::new();
        for _ in 0..4 {
            store.create();
        }
        store.begin_pass();
        let mut seen = Vec::new();
        while let Some(e) = store.next_in_pass() {
            seen.push(e.id());
            if e.id() == 0 {
                store.remove(Entity(2));
            }
        }
        assert_eq!(seen, vec![0, 1, 3]);
    }

    #[test]
    fn removing_current_entity_does_not_skip_next() {
        let mut store = EntityStore::new();
        for _ in 0..4 {
            store.create();
        }
        store.begin_pass();
        let mut seen = Vec::new();
        while let Some(e) = store.next_in_pass() {
            seen.push(e.id());
            store.remove(e);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn no_pass_means_no_entities() {
        let mut store = EntityStore::new();
        store.create();
        assert_eq!(store.next_in_pass(), None);
    }
}
