//! Read-only debug projection of a [`World`](super::world::World).
//!
//! The snapshot lists the live entities and every component table, with each
//! value rendered through its `Debug` formatter. It is meant for inspection
//! (dumping as text, shipping to the telemetry dashboard); there is no way to
//! load one back and the layout carries no stability promise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::named;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Live entities in creation order.
    pub entities: Vec<Entity>,
    /// Component name → entity → `Debug` rendering of the value, tables in
    /// declaration order.
    #[serde(with = "named")]
    pub components: Vec<(String, BTreeMap<Entity, String>)>,
}

impl WorldSnapshot {
    /// Render as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Rendered entries of one table.
    pub fn table(&self, name: &str) -> Option<&BTreeMap<Entity, String>> {
        named::lookup(&self.components, name)
    }

    /// Number of entries across all tables.
    pub fn entry_count(&self) -> usize {
        self.components.iter().map(|(_, entries)| entries.len()).sum()
    }

    /// A window of at most `limit` live entities starting at `offset`, with
    /// only their component entries. Tables stay listed even when empty.
    pub fn page(&self, offset: usize, limit: usize) -> WorldSnapshot {
        let entities: Vec<Entity> = self
            .entities
            .iter()
            .skip(offset)
            .take(limit)
            .copied()
            .collect();
        let components = self
            .components
            .iter()
            .map(|(name, entries)| {
                let kept = entities
                    .iter()
                    .filter_map(|e| entries.get(e).map(|v| (*e, v.clone())))
                    .collect();
                (name.clone(), kept)
            })
            .collect();
        WorldSnapshot {
            entities,
            components,
        }
    }
}
