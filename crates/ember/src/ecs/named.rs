//! Serde adapter for `(name, value)` lists that travel as JSON objects.
//!
//! Component tables and systems have a meaningful order (declaration and
//! registration), but a `BTreeMap` sorts by name. Per-name data that must keep
//! its order is stored as `Vec<(String, V)>` and tagged with
//! `#[serde(with = "named")]`, which writes the entries as one object in list
//! order and reads them back in document order.
//!
//! Going through `serde_json::Value` re-sorts the keys; serialize straight to
//! a string or writer to keep the order on the wire.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, Serializer};

#[allow(clippy::ptr_arg)]
pub fn serialize<V, S>(entries: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
where
    V: Serialize,
    S: Serializer,
{
    serializer.collect_map(entries.iter().map(|(name, value)| (name, value)))
}

pub fn deserialize<'de, V, D>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    deserializer.deserialize_map(InOrder(PhantomData))
}

struct InOrder<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for InOrder<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object keyed by name")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Value stored under `name`, if any.
pub fn lookup<'a, V>(entries: &'a [(String, V)], name: &str) -> Option<&'a V> {
    entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}
