//! Diagnostics: the [`Logger`] system, log capture, and the telemetry sender.
//!
//! [`Logger`] is an ordinary system, usually registered last. After every
//! tick it summarizes the frame (rolling delta, entity count, every system's
//! last tick time and log) into a [`LoggerReport`] and periodically writes it
//! out through `log::info!`.
//!
//! With the `diagnostics` feature, [`init_logger`] also captures log records
//! into a ring buffer and [`DiagSender`] ships a JSON snapshot over UDP to
//! `ember-telemetry` on `127.0.0.1:9200`, throttled to 10 Hz. A second socket
//! on port 9201 receives inspection requests from the dashboard, asking for a
//! page of the [`WorldSnapshot`](crate::ecs::WorldSnapshot) to ride along.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use crate::ecs::{System, SystemResult, World, named};

/// Number of frame deltas averaged by [`Logger`].
pub const DELTA_WINDOW: usize = 20;

// ── Logger system ────────────────────────────────────────────────────────

/// Frame summary built by [`Logger`] after each tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggerReport {
    /// Mean of the last [`DELTA_WINDOW`] deltas, in whole milliseconds. The
    /// sum is always divided by the full window, so it ramps up over the first
    /// frames.
    pub delta_ms: i64,
    /// Instantaneous frames per second, rounded to two decimals.
    pub fps: f64,
    pub entity_count: usize,
    /// System name → last tick duration in ms, in registration order.
    #[serde(with = "named")]
    pub times: Vec<(String, f64)>,
    /// System name → the system's own log object, if any, in registration
    /// order.
    #[serde(with = "named")]
    pub systems: Vec<(String, Option<serde_json::Value>)>,
}

impl LoggerReport {
    /// Last tick time of the first system registered as `name`.
    pub fn time_ms(&self, name: &str) -> Option<f64> {
        named::lookup(&self.times, name).copied()
    }

    /// Log object of the first system registered as `name`.
    pub fn system_log(&self, name: &str) -> Option<&serde_json::Value> {
        named::lookup(&self.systems, name).and_then(Option::as_ref)
    }

    /// System names as they were registered.
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.times.iter().map(|(name, _)| name.as_str())
    }
}

/// Summarizes every frame and logs the summary at a fixed interval.
pub struct Logger {
    deltas: VecDeque<f64>,
    interval: Option<Duration>,
    since_emit: f64,
    report: Option<LoggerReport>,
}

impl Logger {
    /// A logger that emits its report once per second.
    pub fn new() -> Self {
        Self::every(Duration::from_secs(1))
    }

    /// A logger that emits its report every `interval` of simulated time.
    pub fn every(interval: Duration) -> Self {
        Self {
            deltas: VecDeque::with_capacity(DELTA_WINDOW),
            interval: Some(interval),
            since_emit: 0.0,
            report: None,
        }
    }

    /// A logger that only keeps its report for [`Logger::report`].
    pub fn silent() -> Self {
        Self {
            interval: None,
            ..Self::new()
        }
    }

    /// The summary built at the end of the most recent tick.
    pub fn report(&self) -> Option<&LoggerReport> {
        self.report.as_ref()
    }

    fn build_report(&self, world: &World, delta: f64) -> LoggerReport {
        let sum: f64 = self.deltas.iter().sum();
        let fps = if delta > 0.0 {
            (100.0 / delta).round() / 100.0
        } else {
            0.0
        };
        let timings = world.timings();
        let times = timings.iter().map(|t| (t.name.clone(), t.time_ms)).collect();
        let systems = timings.iter().map(|t| (t.name.clone(), t.log.clone())).collect();
        LoggerReport {
            delta_ms: (sum / DELTA_WINDOW as f64 * 1000.0).round() as i64,
            fps,
            entity_count: world.entity_count(),
            times,
            systems,
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl System for Logger {
    fn tick_after(&mut self, world: &mut World, delta: f64) -> SystemResult {
        if self.deltas.len() >= DELTA_WINDOW {
            self.deltas.pop_front();
        }
        self.deltas.push_back(delta);
        let report = self.build_report(world, delta);

        if let Some(interval) = self.interval {
            self.since_emit += delta;
            if self.since_emit >= interval.as_secs_f64() {
                self.since_emit = 0.0;
                log::info!(target: "ember::diag", "{}", serde_json::to_string(&report)?);
            }
        }
        self.report = Some(report);
        Ok(())
    }
}

// ── Logging setup ────────────────────────────────────────────────────────

/// Initialize logging: env_logger on stderr, filtered by `RUST_LOG`.
///
/// Call this early (before any log messages) to capture everything.
#[cfg(not(feature = "diagnostics"))]
pub fn init_logger() {
    if env_logger::Builder::from_default_env().try_init().is_err() {
        eprintln!("[ember] Warning: a logger is already set.");
    }
}

#[cfg(feature = "diagnostics")]
pub use capture::{DiagSender, init_logger};

#[cfg(feature = "diagnostics")]
mod capture {
    use std::net::UdpSocket;
    use std::sync::Mutex;
    use std::time::Instant;

    use serde::{Deserialize, Serialize};

    use crate::ecs::{SystemTiming, World, WorldSnapshot};
    use crate::time::Time;

    /// Telemetry datagrams go here (game → dashboard).
    pub const TELEMETRY_ADDR: &str = "127.0.0.1:9200";
    /// Inspection requests arrive here (dashboard → game).
    pub const REQUEST_ADDR: &str = "127.0.0.1:9201";

    const LOG_RING_CAP: usize = 500;
    const LOGS_PER_SEND: usize = 50;
    /// Entities per world page shipped to the dashboard.
    const WORLD_PAGE: usize = 100;
    /// Largest datagram we try to send; bigger frames lose their world page.
    const MAX_DATAGRAM: usize = 60_000;

    // ── Log capture ──────────────────────────────────────────────────

    /// A captured log message.
    #[derive(Debug, Clone, Serialize)]
    pub(crate) struct CapturedLog {
        pub level: String,
        pub target: String,
        pub message: String,
        pub timestamp_secs: f32,
    }

    /// Ring buffer for captured logs.
    pub(crate) struct LogRing {
        entries: Vec<CapturedLog>,
    }

    impl LogRing {
        fn new() -> Self {
            Self {
                entries: Vec::new(),
            }
        }

        pub(crate) fn push(&mut self, entry: CapturedLog) {
            if self.entries.len() >= LOG_RING_CAP {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        pub(crate) fn drain(&mut self, max: usize) -> Vec<CapturedLog> {
            let n = self.entries.len().min(max);
            self.entries.drain(..n).collect()
        }
    }

    static LOG_RING: Mutex<Option<LogRing>> = Mutex::new(None);
    static LOG_START: Mutex<Option<Instant>> = Mutex::new(None);

    /// A logger that captures messages to the ring buffer and delegates to
    /// env_logger for stderr output.
    struct DiagLogger {
        inner: env_logger::Logger,
    }

    impl log::Log for DiagLogger {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            log::Log::enabled(&self.inner, metadata) || metadata.level() <= log::Level::Info
        }

        fn log(&self, record: &log::Record) {
            if log::Log::enabled(&self.inner, record.metadata()) {
                log::Log::log(&self.inner, record);
            }

            let timestamp_secs = LOG_START
                .lock()
                .ok()
                .and_then(|g| g.map(|s| s.elapsed().as_secs_f32()))
                .unwrap_or(0.0);
            let entry = CapturedLog {
                level: record.level().to_string(),
                target: record.target().to_string(),
                message: format!("{}", record.args()),
                timestamp_secs,
            };
            if let Ok(mut guard) = LOG_RING.lock() {
                if let Some(ring) = guard.as_mut() {
                    ring.push(entry);
                }
            }
        }

        fn flush(&self) {
            log::Log::flush(&self.inner);
        }
    }

    static DIAG_LOGGER: std::sync::OnceLock<DiagLogger> = std::sync::OnceLock::new();

    /// Initialize logging: env_logger on stderr (filtered by `RUST_LOG`), plus
    /// capture of everything at `Info` and above for the telemetry dashboard.
    ///
    /// Call this early (before any log messages) to capture everything.
    pub fn init_logger() {
        if let Ok(mut ring) = LOG_RING.lock() {
            *ring = Some(LogRing::new());
        }
        if let Ok(mut start) = LOG_START.lock() {
            *start = Some(Instant::now());
        }

        let inner = env_logger::Builder::new().parse_default_env().build();
        let max_level = inner.filter();

        let logger = DIAG_LOGGER.get_or_init(|| DiagLogger { inner });

        if log::set_logger(logger).is_err() {
            eprintln!("[ember] Warning: a logger is already set. Log capture disabled.");
            return;
        }
        log::set_max_level(max_level.max(log::LevelFilter::Info));
    }

    fn drain_captured_logs(max: usize) -> Vec<CapturedLog> {
        let Ok(mut guard) = LOG_RING.lock() else {
            return Vec::new();
        };
        match guard.as_mut() {
            Some(ring) => ring.drain(max),
            None => Vec::new(),
        }
    }

    // ── Wire format ──────────────────────────────────────────────────

    #[derive(Serialize)]
    pub(crate) struct DiagSnapshot {
        pub frame_count: u64,
        pub fps: f64,
        pub delta_ms: f64,
        pub elapsed_secs: f64,
        pub entity_count: usize,
        pub entity_pool: EntityPoolSnapshot,
        pub systems: Vec<SystemTiming>,
        pub systems_total_ms: f64,
        pub tables: Vec<TableSummary>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub world: Option<WorldPage>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        pub logs: Vec<CapturedLog>,
    }

    #[derive(Serialize)]
    pub(crate) struct EntityPoolSnapshot {
        pub allocated: u64,
        pub live: usize,
        pub created: u32,
        pub removed: u32,
    }

    #[derive(Serialize)]
    pub(crate) struct TableSummary {
        pub name: String,
        pub entries: usize,
    }

    #[derive(Serialize)]
    pub(crate) struct WorldPage {
        pub offset: usize,
        pub total: usize,
        #[serde(flatten)]
        pub snapshot: WorldSnapshot,
    }

    /// An inspection request from the dashboard.
    #[derive(Deserialize)]
    struct InspectRequest {
        include_world: bool,
        #[serde(default)]
        offset: usize,
    }

    /// Gather everything the dashboard shows. `world_offset` selects the page
    /// of entities to include, if any. Resets the world's entity counters.
    pub(crate) fn build_snapshot(
        world: &mut World,
        time: &Time,
        world_offset: Option<usize>,
        logs: Vec<CapturedLog>,
    ) -> DiagSnapshot {
        let stats = world.take_entity_stats();
        let tables = world
            .component_names()
            .map(|name| TableSummary {
                name: name.to_string(),
                entries: world.table(name).map_or(0, |t| t.len()),
            })
            .collect();
        let page = world_offset.map(|offset| {
            let offset = offset.min(world.entity_count().saturating_sub(1));
            WorldPage {
                offset,
                total: world.entity_count(),
                snapshot: world.snapshot().page(offset, WORLD_PAGE),
            }
        });
        DiagSnapshot {
            frame_count: time.frame_count(),
            fps: time.fps(),
            delta_ms: time.delta_secs() * 1000.0,
            elapsed_secs: time.elapsed_secs(),
            entity_count: world.entity_count(),
            entity_pool: EntityPoolSnapshot {
                allocated: stats.allocated,
                live: stats.live,
                created: stats.created,
                removed: stats.removed,
            },
            systems: world.timings().iter().cloned().collect(),
            systems_total_ms: world.timings().total_ms(),
            tables,
            world: page,
            logs,
        }
    }

    // ── DiagSender ───────────────────────────────────────────────────

    /// Owns the outbound UDP socket and throttling state.
    pub struct DiagSender {
        /// Socket for sending datagrams (game → dashboard).
        socket: UdpSocket,
        /// Socket for receiving inspection requests (dashboard → game).
        request_socket: UdpSocket,
        /// Last time a datagram was sent (for the 10 Hz throttle).
        last_send: Instant,
        /// Requested world page, while the dashboard is inspecting.
        world_offset: Option<usize>,
    }

    impl DiagSender {
        /// Bind the sockets. Returns `None` if either port is unavailable
        /// (e.g. another instance is already running).
        pub fn new() -> Option<Self> {
            let socket = UdpSocket::bind("127.0.0.1:0").ok()?;
            socket.connect(TELEMETRY_ADDR).ok()?;
            socket.set_nonblocking(true).ok()?;

            let request_socket = UdpSocket::bind(REQUEST_ADDR).ok()?;
            request_socket.set_nonblocking(true).ok()?;

            Some(Self {
                socket,
                request_socket,
                last_send: Instant::now() - std::time::Duration::from_secs(1),
                world_offset: None,
            })
        }

        /// Check for incoming inspection requests (non-blocking).
        fn process_requests(&mut self) {
            let mut buf = [0u8; 1024];
            while let Ok(n) = self.request_socket.recv(&mut buf) {
                if let Ok(req) = serde_json::from_slice::<InspectRequest>(&buf[..n]) {
                    self.world_offset = req.include_world.then_some(req.offset);
                }
            }
        }

        /// Called once per frame. Throttled to 10 Hz internally.
        pub fn send(&mut self, world: &mut World, time: &Time) {
            self.process_requests();

            let now = Instant::now();
            if now.duration_since(self.last_send).as_millis() < 100 {
                return;
            }
            self.last_send = now;

            let logs = drain_captured_logs(LOGS_PER_SEND);
            let mut snapshot = build_snapshot(world, time, self.world_offset, logs);

            let Ok(mut json) = serde_json::to_vec(&snapshot) else {
                return;
            };
            if json.len() > MAX_DATAGRAM && snapshot.world.take().is_some() {
                log::debug!("world page too large for one datagram, dropped");
                let Ok(smaller) = serde_json::to_vec(&snapshot) else {
                    return;
                };
                json = smaller;
            }
            // Fire-and-forget: nobody may be listening.
            let _ = self.socket.send(&json);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn captured(message: &str) -> CapturedLog {
            CapturedLog {
                level: "INFO".to_string(),
                target: "test".to_string(),
                message: message.to_string(),
                timestamp_secs: 0.0,
            }
        }

        #[test]
        fn ring_drops_oldest_when_full() {
            let mut ring = LogRing::new();
            for i in 0..(LOG_RING_CAP + 5) {
                ring.push(captured(&i.to_string()));
            }
            let drained = ring.drain(usize::MAX);
            assert_eq!(drained.len(), LOG_RING_CAP);
            assert_eq!(drained[0].message, "5");
        }

        #[test]
        fn drain_takes_at_most_max() {
            let mut ring = LogRing::new();
            for i in 0..10 {
                ring.push(captured(&i.to_string()));
            }
            assert_eq!(ring.drain(4).len(), 4);
            assert_eq!(ring.drain(100).len(), 6);
        }

        #[test]
        fn snapshot_includes_world_on_request() {
            let mut world = World::new();
            world.spawn().with("hp", 3).id();
            let time = Time::new();

            let without = build_snapshot(&mut world, &time, None, Vec::new());
            let json = serde_json::to_value(&without).unwrap();
            assert!(json.get("world").is_none());
            assert!(json.get("logs").is_none());
            assert_eq!(json["entity_pool"]["created"], 1);
            assert_eq!(json["tables"][0]["name"], "hp");
            assert_eq!(json["tables"][0]["entries"], 1);

            let with = build_snapshot(&mut world, &time, Some(0), vec![captured("hi")]);
            let json = serde_json::to_value(&with).unwrap();
            assert_eq!(json["world"]["entities"], serde_json::json!([0]));
            assert_eq!(json["world"]["total"], 1);
            assert_eq!(json["world"]["components"]["hp"]["0"], "3");
            assert_eq!(json["logs"][0]["message"], "hi");
            assert_eq!(json["entity_pool"]["created"], 0);
        }

        #[test]
        fn world_page_offset_is_clamped() {
            let mut world = World::new();
            for _ in 0..(WORLD_PAGE + 20) {
                world.create_entity();
            }
            let time = Time::new();

            let page = build_snapshot(&mut world, &time, Some(WORLD_PAGE), Vec::new());
            let page = page.world.unwrap();
            assert_eq!(page.offset, WORLD_PAGE);
            assert_eq!(page.snapshot.entities.len(), 20);

            let past_end = build_snapshot(&mut world, &time, Some(10_000), Vec::new());
            assert_eq!(past_end.world.unwrap().snapshot.entities.len(), 1);
        }
    }
}
