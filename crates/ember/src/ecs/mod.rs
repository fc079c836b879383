//! # Name-Keyed ECS Runtime
//!
//! A deliberately small Entity Component System. Entities are plain ids,
//! components are opaque values stored in one table per component *name*, and
//! systems are stateful structs ticked in a fixed order over every live entity.
//!
//! ## Module Overview
//!
//! - [`entity`]: Monotonic ids and the live sequence
//! - [`component`]: Type-erased values with optional teardown, per-name tables
//! - [`world`]: Central container (entities + components + timings)
//! - [`system`]: System trait and the ordered schedule
//! - [`timing`]: Last-tick duration and log per system
//! - [`snapshot`]: Read-only debug projection of the world
//! - [`named`]: Ordered `(name, value)` lists as JSON objects
//!
//! ## Comparison
//!
//! - **hecs / bevy_ecs**: components are keyed by Rust type and grouped into
//!   archetypes. Queries are typed and the scheduler may run systems in
//!   parallel.
//! - **ember**: components are keyed by string name, every system visits every
//!   live entity, and everything runs on one thread in registration order.

pub(crate) mod component;
pub mod entity;
pub mod named;
pub mod snapshot;
pub mod system;
pub mod timing;
pub mod world;

pub use component::{ComponentTable, ComponentValue, OnRemove};
pub use entity::Entity;
pub use snapshot::WorldSnapshot;
pub use system::{Schedule, System, SystemHandle, SystemResult};
pub use timing::{SystemTiming, Timings};
pub use world::{EntityBuilder, EntityStats, World};
