//! Convenience re-exports — `use ember::prelude::*` for the common items.

pub use crate::diag::{Logger, LoggerReport, init_logger};
pub use crate::ecs::{
    ComponentValue, Entity, Schedule, System, SystemHandle, SystemResult, World, WorldSnapshot,
};
pub use crate::error::{BoxError, EcsError, EcsResult};
pub use crate::math::Vec2;
pub use crate::runner::{RunConfig, RunSummary, Runner};
pub use crate::time::Time;
#[cfg(feature = "diagnostics")]
pub use crate::diag::DiagSender;
