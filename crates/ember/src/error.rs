//! # Error Types
//!
//! Absent components and removals of things that are already gone are not
//! errors: they come back as `None` / `false`. What remains are failures that
//! user code raised (an on-remove hook, a system hook) and type confusion when
//! reading a component back.

use std::fmt;

use thiserror::Error;

use crate::ecs::Entity;

/// Boxed error returned by system hooks and on-remove hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for runtime operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Which lifecycle hook of a system was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Before,
    Entity(Entity),
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Before => write!(f, "tick_before"),
            Phase::Entity(entity) => write!(f, "tick_entity({})", entity),
            Phase::After => write!(f, "tick_after"),
        }
    }
}

/// Errors surfaced by the world and the scheduler.
#[derive(Error, Debug)]
pub enum EcsError {
    /// An on-remove hook failed. The component entry was still deleted.
    #[error("on-remove hook of `{component}` on entity {entity} failed: {source}")]
    Hook {
        entity: Entity,
        component: String,
        #[source]
        source: BoxError,
    },

    /// One or more on-remove hooks failed while removing an entity. Every
    /// table was still cleaned and the entity is no longer live.
    #[error("{} on-remove hook(s) failed while removing entity {entity}", failures.len())]
    Teardown {
        entity: Entity,
        failures: Vec<EcsError>,
    },

    /// A system hook failed. The rest of the tick was abandoned.
    #[error("system `{system}` failed in {phase}: {source}")]
    System {
        system: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },

    /// A component was read back as a different type than it was stored as.
    #[error("component `{component}` on entity {entity} holds `{found}`, not `{expected}`")]
    TypeMismatch {
        entity: Entity,
        component: String,
        expected: &'static str,
        found: &'static str,
    },
}
