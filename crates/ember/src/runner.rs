//! Host loop.
//!
//! The [`Runner`] owns the [`World`], the [`Schedule`] and the frame clock.
//! Configure it with builder methods, then call [`run()`](Runner::run) or
//! drive it yourself with [`step()`](Runner::step).
//!
//! ## Example
//!
//! ```ignore
//! use ember::prelude::*;
//!
//! let mut schedule = Schedule::new();
//! schedule.declare_system(Logger::new());
//!
//! Runner::new(World::new(), schedule)
//!     .target_fps(30.0)
//!     .max_frames(300)
//!     .run()?;
//! ```

use std::time::{Duration, Instant};

use crate::ecs::{Schedule, World};
use crate::error::EcsResult;
use crate::time::Time;

/// How the runner paces and bounds the simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Frames per second to pace to by sleeping. `None` runs flat out.
    pub target_fps: Option<f64>,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// Stop once this much time has passed since the runner was created.
    pub max_duration: Option<Duration>,
    /// Ship frames to `ember-telemetry`. Only effective with the
    /// `diagnostics` feature.
    pub diagnostics: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_fps: Some(60.0),
            max_frames: None,
            max_duration: None,
            diagnostics: true,
        }
    }
}

/// What a finished [`Runner::run`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
}

/// Drives a schedule over a world, frame after frame.
pub struct Runner {
    world: World,
    schedule: Schedule,
    time: Time,
    config: RunConfig,
    #[cfg(feature = "diagnostics")]
    sender: Option<crate::diag::DiagSender>,
}

impl Runner {
    /// The clock starts now, so the first delta covers everything up to the
    /// first frame, including system init.
    pub fn new(world: World, schedule: Schedule) -> Self {
        Self {
            world,
            schedule,
            time: Time::new(),
            config: RunConfig::default(),
            #[cfg(feature = "diagnostics")]
            sender: None,
        }
    }

    /// Replace the whole config. A non-positive or non-finite `target_fps`
    /// is treated as uncapped, same as [`target_fps`](Self::target_fps).
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = RunConfig {
            target_fps: config.target_fps.filter(|&fps| frame_budget(fps).is_some()),
            ..config
        };
        self
    }

    /// Pace to `fps` frames per second. Non-positive values mean uncapped.
    pub fn target_fps(mut self, fps: f64) -> Self {
        self.config.target_fps = Some(fps).filter(|&fps| frame_budget(fps).is_some());
        self
    }

    pub fn uncapped(mut self) -> Self {
        self.config.target_fps = None;
        self
    }

    pub fn max_frames(mut self, frames: u64) -> Self {
        self.config.max_frames = Some(frames);
        self
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.config.max_duration = Some(duration);
        self
    }

    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.config.diagnostics = enabled;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.schedule
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    /// Give back the world and schedule.
    pub fn into_parts(self) -> (World, Schedule) {
        (self.world, self.schedule)
    }

    /// Initialize systems once. Called implicitly by [`step`](Self::step)
    /// and [`run`](Self::run).
    pub fn start(&mut self) -> EcsResult<()> {
        if self.schedule.is_initialized() {
            return Ok(());
        }
        log::debug!(
            "starting {} system(s) over {} entities",
            self.schedule.len(),
            self.world.entity_count()
        );
        self.schedule.init(&mut self.world)?;
        self.connect_diagnostics();
        Ok(())
    }

    #[cfg(feature = "diagnostics")]
    fn connect_diagnostics(&mut self) {
        if !self.config.diagnostics || self.sender.is_some() {
            return;
        }
        self.sender = crate::diag::DiagSender::new();
        if self.sender.is_none() {
            log::warn!("diagnostics ports unavailable, telemetry disabled");
        }
    }

    #[cfg(not(feature = "diagnostics"))]
    fn connect_diagnostics(&mut self) {
        if self.config.diagnostics {
            log::debug!("built without the `diagnostics` feature, telemetry disabled");
        }
    }

    /// Run a single frame: advance the clock, tick every system, ship
    /// diagnostics. Returns the delta in seconds handed to the systems.
    pub fn step(&mut self) -> EcsResult<f64> {
        self.start()?;
        self.time.update();
        let delta = self.time.delta_secs();
        self.schedule.tick(&mut self.world, delta)?;

        #[cfg(feature = "diagnostics")]
        if let Some(sender) = self.sender.as_mut() {
            sender.send(&mut self.world, &self.time);
        }
        Ok(delta)
    }

    /// Loop until a limit from the config is reached or a tick fails.
    ///
    /// Without `max_frames` or `max_duration` this only returns on error.
    pub fn run(&mut self) -> EcsResult<RunSummary> {
        self.start()?;
        let started = Instant::now();
        let mut frames = 0;
        while !self.finished(frames) {
            self.step()?;
            frames += 1;
            self.pace();
        }
        log::debug!("runner stopped after {frames} frame(s)");
        Ok(RunSummary {
            frames,
            elapsed: started.elapsed(),
        })
    }

    fn finished(&self, frames: u64) -> bool {
        if self.config.max_frames.is_some_and(|max| frames >= max) {
            return true;
        }
        self.config
            .max_duration
            .is_some_and(|max| self.time.elapsed() >= max)
    }

    fn pace(&self) {
        let Some(frame) = self.config.target_fps.and_then(frame_budget) else {
            return;
        };
        let deadline = self.time.frame_start() + frame;
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// Wall time one frame may take at `fps`, or `None` if `fps` can't pace.
fn frame_budget(fps: f64) -> Option<Duration> {
    if fps > 0.0 {
        Duration::try_from_secs_f64(1.0 / fps).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Entity, System, SystemResult};

    #[derive(Default)]
    struct Counter {
        inits: u32,
        ticks: u32,
        visits: u32,
        last_delta: f64,
    }

    impl System for Counter {
        fn init(&mut self, _world: &mut World) -> SystemResult {
            self.inits += 1;
            Ok(())
        }

        fn tick_before(&mut self, _world: &mut World, delta: f64) -> SystemResult {
            self.ticks += 1;
            self.last_delta = delta;
            Ok(())
        }

        fn tick_entity(&mut self, _world: &mut World, _entity: Entity, _delta: f64) -> SystemResult {
            self.visits += 1;
            Ok(())
        }
    }

    struct FailOnThird(u32);

    impl System for FailOnThird {
        fn tick_after(&mut self, _world: &mut World, _delta: f64) -> SystemResult {
            self.0 += 1;
            if self.0 == 3 {
                return Err("third tick".into());
            }
            Ok(())
        }
    }

    fn runner_with<S: System + 'static>(system: S) -> (Runner, crate::ecs::SystemHandle<S>) {
        let mut world = World::new();
        world.create_entity();
        world.create_entity();
        let mut schedule = Schedule::new();
        let handle = schedule.declare_system(system);
        let runner = Runner::new(world, schedule).uncapped().diagnostics(false);
        (runner, handle)
    }

    #[test]
    fn run_stops_at_max_frames() {
        let (runner, handle) = runner_with(Counter::default());
        let mut runner = runner.max_frames(5);
        let summary = runner.run().unwrap();

        assert_eq!(summary.frames, 5);
        let counter = runner.schedule().get(handle).unwrap();
        assert_eq!(counter.inits, 1);
        assert_eq!(counter.ticks, 5);
        assert_eq!(counter.visits, 10);
        assert_eq!(runner.time().frame_count(), 5);
    }

    #[test]
    fn step_initializes_once() {
        let (mut runner, handle) = runner_with(Counter::default());
        let delta = runner.step().unwrap();
        runner.step().unwrap();

        let counter = runner.schedule().get(handle).unwrap();
        assert_eq!(counter.inits, 1);
        assert_eq!(counter.ticks, 2);
        assert!(delta >= 0.0);
        assert!(counter.last_delta >= 0.0);
    }

    #[test]
    fn tick_failure_stops_run() {
        let (runner, _) = runner_with(FailOnThird(0));
        let mut runner = runner.max_frames(10);
        let err = runner.run().unwrap_err().to_string();
        assert!(err.contains("FailOnThird"), "{err}");
        assert!(err.contains("third tick"), "{err}");
        assert_eq!(runner.time().frame_count(), 3);
    }

    #[test]
    fn max_duration_bounds_run() {
        let (runner, _) = runner_with(Counter::default());
        let mut runner = runner.target_fps(200.0).max_duration(Duration::from_millis(30));
        let summary = runner.run().unwrap();
        assert!(summary.frames >= 1);
        assert!(runner.time().elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn builder_methods_fill_config() {
        let runner = Runner::new(World::new(), Schedule::new())
            .target_fps(0.0)
            .max_frames(3)
            .diagnostics(false);
        assert_eq!(
            runner.config(),
            &RunConfig {
                target_fps: None,
                max_frames: Some(3),
                max_duration: None,
                diagnostics: false,
            }
        );
    }

    #[test]
    fn bad_fps_in_config_runs_uncapped() {
        for fps in [-30.0, 0.0, f64::NAN] {
            let (runner, handle) = runner_with(Counter::default());
            let mut runner = runner.with_config(RunConfig {
                target_fps: Some(fps),
                max_frames: Some(2),
                max_duration: None,
                diagnostics: false,
            });
            assert_eq!(runner.config().target_fps, None);

            let summary = runner.run().unwrap();
            assert_eq!(summary.frames, 2);
            assert_eq!(runner.schedule().get(handle).unwrap().ticks, 2);
        }
    }

    #[test]
    fn frame_budget_rejects_unpaceable_rates() {
        assert_eq!(frame_budget(4.0), Some(Duration::from_millis(250)));
        assert_eq!(frame_budget(-1.0), None);
        assert_eq!(frame_budget(f64::NAN), None);
        // 1 / tiny overflows Duration
        assert_eq!(frame_budget(f64::MIN_POSITIVE), None);
    }
}
