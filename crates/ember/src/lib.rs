//! # Ember — Minimal Name-Keyed ECS Runtime
//!
//! A small, single-threaded Entity Component System for simulations:
//! monotonic entity ids, components stored in tables keyed by name, and
//! stateful systems ticked in registration order over every live entity.
//!
//! Start with `use ember::prelude::*`, declare systems on a
//! [`Schedule`](ecs::Schedule), and hand both to a [`Runner`](runner::Runner).

pub mod diag;
pub mod ecs;
pub mod error;
pub mod math;
pub mod prelude;
pub mod runner;
pub mod time;
