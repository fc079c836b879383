//! ember-telemetry — TUI diagnostics tool for ember simulations.
//!
//! Listens for the runtime's UDP datagrams and displays live metrics in a
//! terminal dashboard using ratatui: per-system tick times and logs, the
//! component tables (with an entity inspector), and captured log lines.
//!
//! Start this first, then run a simulation built with the `diagnostics`
//! feature (on by default), e.g. `cargo run -p ember --example forest`.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{Level, LevelFilter};
use ratatui::DefaultTerminal;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline, Tabs};
use serde::{Deserialize, Serialize};

/// Where the runtime sends its frames.
const LISTEN_ADDR: &str = "127.0.0.1:9200";
/// Where the runtime listens for inspection requests.
const REQUEST_ADDR: &str = "127.0.0.1:9201";
/// Entities per world page; must match the runtime.
const WORLD_PAGE: usize = 100;

// ── Wire types (must match ember's JSON format) ─────────────────────────

#[derive(Deserialize, Clone, Default)]
struct DiagSnapshot {
    frame_count: u64,
    fps: f64,
    delta_ms: f64,
    elapsed_secs: f64,
    entity_count: usize,
    #[serde(default)]
    entity_pool: Option<EntityPoolInfo>,
    #[serde(default)]
    systems: Vec<SystemTimingInfo>,
    #[serde(default)]
    systems_total_ms: f64,
    #[serde(default)]
    tables: Vec<TableInfo>,
    #[serde(default)]
    world: Option<WorldPage>,
    #[serde(default)]
    logs: Vec<LogEntryInfo>,
}

#[derive(Deserialize, Clone, Default)]
struct EntityPoolInfo {
    allocated: u64,
    live: usize,
    created: u32,
    removed: u32,
}

#[derive(Deserialize, Clone, Default)]
struct SystemTimingInfo {
    name: String,
    time_ms: f64,
    #[serde(default)]
    log: Option<serde_json::Value>,
}

#[derive(Deserialize, Clone, Default)]
struct TableInfo {
    name: String,
    entries: usize,
}

#[derive(Deserialize, Clone, Default)]
struct WorldPage {
    offset: usize,
    total: usize,
    entities: Vec<u64>,
    /// Component name → entity id → `Debug` rendering.
    components: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Deserialize, Clone, Default)]
struct LogEntryInfo {
    level: String,
    target: String,
    message: String,
    timestamp_secs: f32,
}

// ── Inspect request (sent to the runtime) ───────────────────────────────

#[derive(Serialize)]
struct InspectRequest {
    include_world: bool,
    offset: usize,
}

// ── Tabs ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tab {
    Systems,
    World,
    Logs,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Systems, Tab::World, Tab::Logs];

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Self {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Systems => "Systems",
            Tab::World => "World",
            Tab::Logs => "Logs",
        }
    }
}

// ── Captured logs ───────────────────────────────────────────────────────

const LOG_CAP: usize = 2000;

/// A log line as the dashboard keeps it. `level` is `None` for anything
/// `log` can't parse; such lines pass every filter.
struct LogLine {
    level: Option<Level>,
    target: String,
    message: String,
    timestamp_secs: f32,
}

impl From<LogEntryInfo> for LogLine {
    fn from(entry: LogEntryInfo) -> Self {
        Self {
            level: entry.level.parse().ok(),
            target: entry.target,
            message: entry.message,
            timestamp_secs: entry.timestamp_secs,
        }
    }
}

/// Everything the Logs tab shows: the newest [`LOG_CAP`] lines, how many of
/// them sit at each level, and the current filter and scroll.
struct LogView {
    lines: VecDeque<LogLine>,
    counts: BTreeMap<Level, usize>,
    filter: LevelFilter,
    follow: bool,
    scroll: usize,
}

impl LogView {
    fn new() -> Self {
        Self {
            lines: VecDeque::new(),
            counts: BTreeMap::new(),
            filter: LevelFilter::Info,
            follow: true,
            scroll: 0,
        }
    }

    fn extend(&mut self, entries: impl IntoIterator<Item = LogEntryInfo>) {
        for line in entries.into_iter().map(LogLine::from) {
            if let Some(level) = line.level {
                *self.counts.entry(level).or_default() += 1;
            }
            self.lines.push_back(line);
        }
        while self.lines.len() > LOG_CAP {
            let Some(dropped) = self.lines.pop_front() else {
                break;
            };
            if let Some(count) = dropped.level.and_then(|l| self.counts.get_mut(&l)) {
                *count -= 1;
            }
        }
    }

    /// Error, warn, info, debug, trace, then back to error.
    fn cycle_filter(&mut self) {
        self.filter = LevelFilter::iter()
            .skip_while(|f| *f != self.filter)
            .nth(1)
            .unwrap_or(LevelFilter::Error);
    }

    fn visible(&self) -> Vec<&LogLine> {
        self.lines
            .iter()
            .filter(|line| line.level.is_none_or(|level| level <= self.filter))
            .collect()
    }

    /// `E:1 W:0 I:12 D:0 T:0`
    fn summary(&self) -> String {
        Level::iter()
            .map(|level| {
                let count = self.counts.get(&level).copied().unwrap_or(0);
                format!("{}:{count}", &level.as_str()[..1])
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn scroll_by(&mut self, down: bool) {
        self.follow = false;
        self.scroll = if down {
            self.scroll + 1
        } else {
            self.scroll.saturating_sub(1)
        };
    }
}

// ── App state ────────────────────────────────────────────────────────────

const HISTORY_CAP: usize = 1200;

struct App {
    latest: DiagSnapshot,
    fps_history: VecDeque<u64>,
    /// Total system time per frame, in µs.
    systems_history: VecDeque<u64>,
    active_tab: Tab,
    paused: bool,
    connected: bool,
    /// Socket for sending inspect requests to the runtime.
    request_socket: UdpSocket,

    // World tab state
    inspecting: bool,
    world_offset: usize,
    world_scroll: usize,

    logs: LogView,
}

impl App {
    fn new(request_socket: UdpSocket) -> Self {
        Self {
            latest: DiagSnapshot::default(),
            fps_history: VecDeque::with_capacity(HISTORY_CAP),
            systems_history: VecDeque::with_capacity(HISTORY_CAP),
            active_tab: Tab::Systems,
            paused: false,
            connected: false,
            request_socket,
            inspecting: false,
            world_offset: 0,
            world_scroll: 0,
            logs: LogView::new(),
        }
    }

    fn push_snapshot(&mut self, mut snap: DiagSnapshot) {
        if self.paused {
            return;
        }

        push_capped(&mut self.fps_history, snap.fps.round().max(0.0) as u64);
        push_capped(
            &mut self.systems_history,
            (snap.systems_total_ms * 1000.0).round().max(0.0) as u64,
        );
        self.logs.extend(std::mem::take(&mut snap.logs));

        // The runtime clamps the offset; follow it.
        if let Some(page) = &snap.world {
            self.world_offset = page.offset;
        }

        self.latest = snap;
        self.connected = true;
    }

    fn send_inspect_request(&self) {
        let req = InspectRequest {
            include_world: self.inspecting,
            offset: self.world_offset,
        };
        if let Ok(json) = serde_json::to_vec(&req) {
            let _ = self.request_socket.send(&json);
        }
    }

    fn toggle_inspect(&mut self) {
        self.inspecting = !self.inspecting;
        self.world_scroll = 0;
        self.send_inspect_request();
    }

    fn turn_page(&mut self, forward: bool) {
        if !self.inspecting {
            return;
        }
        self.world_offset = if forward {
            self.world_offset + WORLD_PAGE
        } else {
            self.world_offset.saturating_sub(WORLD_PAGE)
        };
        self.world_scroll = 0;
        self.send_inspect_request();
    }

    /// One line per entity of the current page: id and every component, with
    /// tables in the runtime's declaration order.
    fn entity_rows(&self) -> Vec<(String, Vec<(String, String)>)> {
        let Some(page) = self.latest.world.as_ref().filter(|_| self.inspecting) else {
            return Vec::new();
        };
        let order: Vec<&str> = if self.latest.tables.is_empty() {
            page.components.keys().map(String::as_str).collect()
        } else {
            self.latest.tables.iter().map(|t| t.name.as_str()).collect()
        };
        page.entities
            .iter()
            .map(|id| {
                let key = id.to_string();
                let components = order
                    .iter()
                    .filter_map(|name| {
                        let value = page.components.get(*name)?.get(&key)?;
                        Some((name.to_string(), value.clone()))
                    })
                    .collect();
                (key, components)
            })
            .collect()
    }
}

fn push_capped(history: &mut VecDeque<u64>, sample: u64) {
    if history.len() >= HISTORY_CAP {
        history.pop_front();
    }
    history.push_back(sample);
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> io::Result<()> {
    let recv_socket = UdpSocket::bind(LISTEN_ADDR).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to bind {LISTEN_ADDR} (is another ember-telemetry running?): {e}"),
        )
    })?;
    recv_socket.set_nonblocking(true)?;

    let send_socket = UdpSocket::bind("127.0.0.1:0")?;
    send_socket.connect(REQUEST_ADDR)?;
    let mut app = App::new(send_socket);

    let mut terminal = ratatui::try_init()?;
    let result = run(&mut terminal, &mut app, &recv_socket);
    ratatui::restore();

    // Stop the runtime from building world pages nobody reads.
    if app.inspecting {
        app.inspecting = false;
        app.send_inspect_request();
    }
    result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App, socket: &UdpSocket) -> io::Result<()> {
    let mut buf = [0u8; 65536];
    loop {
        while let Ok(n) = socket.recv(&mut buf) {
            if let Ok(snap) = serde_json::from_slice::<DiagSnapshot>(&buf[..n]) {
                app.push_snapshot(snap);
            }
        }

        terminal.draw(|f| ui(f, app))?;

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && handle_key(app, key) {
                return Ok(());
            }
        }
    }
}

// ── Key handling ─────────────────────────────────────────────────────────

/// Returns `true` if the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('p') => app.paused = !app.paused,
        KeyCode::Char(c @ '1'..='3') => {
            app.active_tab = Tab::ALL[c as usize - '1' as usize];
        }
        KeyCode::Tab => app.active_tab = app.active_tab.next(),
        KeyCode::BackTab => app.active_tab = app.active_tab.prev(),
        code => match app.active_tab {
            Tab::Systems => {}
            Tab::World => world_key(app, code),
            Tab::Logs => logs_key(&mut app.logs, code),
        },
    }
    false
}

fn world_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('i') => app.toggle_inspect(),
        KeyCode::Up => app.world_scroll = app.world_scroll.saturating_sub(1),
        KeyCode::Down => app.world_scroll += 1,
        KeyCode::Left => app.turn_page(false),
        KeyCode::Right => app.turn_page(true),
        _ => {}
    }
}

fn logs_key(logs: &mut LogView, code: KeyCode) {
    match code {
        KeyCode::Char('f') => logs.cycle_filter(),
        KeyCode::Char('g') => logs.follow = !logs.follow,
        KeyCode::Up => logs.scroll_by(false),
        KeyCode::Down => logs.scroll_by(true),
        _ => {}
    }
}

// ── UI rendering ─────────────────────────────────────────────────────────

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // tab bar
            Constraint::Min(6),    // tab content
            Constraint::Length(1), // help bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_tab_bar(f, app, chunks[1]);

    match app.active_tab {
        Tab::Systems => draw_systems_tab(f, app, chunks[2]),
        Tab::World => draw_world_tab(f, app, chunks[2]),
        Tab::Logs => draw_logs_tab(f, app, chunks[2]),
    }

    draw_help_bar(f, app, chunks[3]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let s = &app.latest;
    let (status, status_color) = match (app.paused, app.connected) {
        (true, _) => ("PAUSED", Color::Yellow),
        (false, true) => ("LIVE", Color::Green),
        (false, false) => ("WAITING", Color::DarkGray),
    };

    let mut spans = vec![Span::styled(
        format!(" {status} "),
        Style::default().bg(status_color).fg(Color::Black),
    )];
    let metrics = [
        ("FPS", format!("{:.1}", s.fps)),
        ("Frame", s.frame_count.to_string()),
        ("\u{0394}", format!("{:.1}ms", s.delta_ms)),
        ("Entities", s.entity_count.to_string()),
        ("Up", format_clock(s.elapsed_secs)),
    ];
    for (i, (label, value)) in metrics.into_iter().enumerate() {
        spans.push(Span::raw(if i == 0 { "  " } else { "  |  " }));
        spans.push(Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)));
        let style = if i == 0 {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(value, style));
    }

    let block = Block::default()
        .title(" ember-telemetry ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_tab_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let titles = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| format!(" {} {} ", i + 1, tab.label()));
    let tabs = Tabs::new(titles)
        .select(app.active_tab.index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(
            Style::default()
                .bg(Color::Cyan)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        )
        .divider(" ");
    f.render_widget(tabs, area);
}

// ── Systems Tab ──────────────────────────────────────────────────────────

fn draw_systems_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(area);

    draw_sparklines(f, app, chunks[0]);
    draw_system_timings(f, app, chunks[1]);
}

fn draw_sparklines(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let fps_data: Vec<u64> = app.fps_history.iter().copied().collect();
    let (fps_min, fps_avg, fps_max) = stats(&fps_data);
    draw_history(
        f,
        chunks[0],
        " FPS History ",
        &fps_data,
        Color::Green,
        format!("min: {fps_min:.0}  avg: {fps_avg:.0}  max: {fps_max:.0}"),
    );

    let sys_data: Vec<u64> = app.systems_history.iter().copied().collect();
    let (s_min, s_avg, s_max) = stats(&sys_data);
    draw_history(
        f,
        chunks[1],
        " System Time ",
        &sys_data,
        Color::Yellow,
        format!(
            "min: {:.2}ms  avg: {:.2}ms  max: {:.2}ms",
            s_min / 1000.0,
            s_avg / 1000.0,
            s_max / 1000.0
        ),
    );
}

fn draw_history(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    data: &[u64],
    color: Color,
    summary: String,
) {
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let spark_area = Rect {
        height: inner.height - 1,
        ..inner
    };
    let stats_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    // Keep the newest samples when the history is wider than the panel.
    let visible = data.len().saturating_sub(spark_area.width as usize);
    let sparkline = Sparkline::default()
        .data(&data[visible..])
        .style(Style::default().fg(color));
    f.render_widget(sparkline, spark_area);
    f.render_widget(
        Paragraph::new(Span::styled(summary, Style::default().fg(Color::DarkGray))),
        stats_area,
    );
}

fn draw_system_timings(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(
            " Systems ({:.2}ms total) ",
            app.latest.systems_total_ms
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let timings = &app.latest.systems;
    if timings.is_empty() {
        let text = Span::styled("  No system timing data", Style::default().fg(Color::DarkGray));
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    // Registration order, as the schedule runs them.
    let max_ms = timings
        .iter()
        .map(|t| t.time_ms)
        .fold(0.0_f64, f64::max)
        .max(0.001);
    let name_col_width = timings.iter().map(|t| t.name.len()).max().unwrap_or(10).min(24);
    let bar_max_width = (inner.width as usize / 4).max(4);
    let log_width = (inner.width as usize).saturating_sub(name_col_width + bar_max_width + 16);

    let lines: Vec<Line> = timings
        .iter()
        .take(inner.height as usize)
        .map(|timing| {
            let bar_color = if timing.time_ms < 2.0 {
                Color::Green
            } else if timing.time_ms < 5.0 {
                Color::Yellow
            } else {
                Color::Red
            };
            let bar_len = ((timing.time_ms / max_ms) * bar_max_width as f64).round() as usize;
            let bar = format!(
                "{:width$}",
                "\u{2588}".repeat(bar_len.max(1)),
                width = bar_max_width
            );
            let log = timing
                .log
                .as_ref()
                .map(|v| truncate(&v.to_string(), log_width))
                .unwrap_or_default();

            Line::from(vec![
                Span::styled(
                    format!("  {:width$}", timing.name, width = name_col_width),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!(" {:>7.3}ms ", timing.time_ms),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(bar, Style::default().fg(bar_color)),
                Span::raw("  "),
                Span::styled(log, Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

// ── World Tab ────────────────────────────────────────────────────────────

fn draw_world_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(4)])
        .split(area);
    draw_entity_pool_line(f, app, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(20)])
        .split(rows[1]);
    draw_tables(f, app, cols[0]);
    draw_inspector(f, app, cols[1]);
}

fn draw_entity_pool_line(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let Some(pool) = &app.latest.entity_pool else {
        return;
    };

    let mut spans = vec![
        Span::styled("  Live: ", Style::default().fg(Color::DarkGray)),
        Span::styled(pool.live.to_string(), Style::default().fg(Color::White)),
        Span::styled("  Ids issued: ", Style::default().fg(Color::DarkGray)),
        Span::styled(pool.allocated.to_string(), Style::default().fg(Color::White)),
    ];
    if pool.created > 0 || pool.removed > 0 {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("+{}", pool.created),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled(
            format!("/-{}", pool.removed),
            Style::default().fg(Color::Red),
        ));
        spans.push(Span::styled(
            " since last frame",
            Style::default().fg(Color::DarkGray),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_tables(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Components ({}) ", app.latest.tables.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let name_width = inner.width.saturating_sub(10) as usize;
    let lines: Vec<Line> = app
        .latest
        .tables
        .iter()
        .take(inner.height as usize)
        .map(|table| {
            Line::from(vec![
                Span::styled(
                    format!(" {:width$}", truncate(&table.name, name_width), width = name_width),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!("{:>7}", table.entries),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_inspector(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let title = match (&app.latest.world, app.inspecting) {
        (Some(page), true) => format!(
            " Entities {}-{} of {} ",
            page.offset + 1,
            page.offset + page.entities.len(),
            page.total
        ),
        (None, true) => " Entities (waiting...) ".to_string(),
        (_, false) => " Entities ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if !app.inspecting {
        let text = Span::styled(
            "  Press [i] to inspect entities",
            Style::default().fg(Color::DarkGray),
        );
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let rows = app.entity_rows();
    let visible = inner.height as usize;
    let offset = app.world_scroll.min(rows.len().saturating_sub(visible));
    let lines: Vec<Line> = rows
        .iter()
        .skip(offset)
        .take(visible)
        .map(|(id, components)| {
            let mut spans = vec![Span::styled(
                format!(" #{id:<6}"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )];
            for (name, value) in components {
                spans.push(Span::styled(
                    format!(" {name}="),
                    Style::default().fg(Color::DarkGray),
                ));
                spans.push(Span::styled(
                    truncate(value, 40),
                    Style::default().fg(Color::White),
                ));
            }
            Line::from(spans)
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Logs Tab ─────────────────────────────────────────────────────────────

fn level_color(level: Option<Level>) -> Color {
    match level {
        Some(Level::Error) => Color::Red,
        Some(Level::Warn) => Color::Yellow,
        Some(Level::Info) => Color::Cyan,
        Some(Level::Debug) => Color::Gray,
        Some(Level::Trace) => Color::DarkGray,
        None => Color::White,
    }
}

fn draw_logs_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let logs = &app.logs;
    let block = Block::default()
        .title(format!(
            " Logs [{}+]  {}  {} ",
            logs.filter,
            logs.summary(),
            if logs.follow { "following" } else { "scrolled" },
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let shown = logs.visible();
    if shown.is_empty() {
        let text = Span::styled("  No log messages", Style::default().fg(Color::DarkGray));
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let height = inner.height as usize;
    let last_page = shown.len().saturating_sub(height);
    let first = if logs.follow {
        last_page
    } else {
        logs.scroll.min(last_page)
    };

    let lines: Vec<Line> = shown[first..]
        .iter()
        .take(height)
        .map(|line| {
            let level = line.level.map_or("?", |l| l.as_str());
            Line::from(vec![
                Span::styled(
                    format!("  {:>7.1}s ", line.timestamp_secs),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("{level:<5} "),
                    Style::default()
                        .fg(level_color(line.level))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{} ", line.target),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(line.message.as_str(), Style::default().fg(Color::White)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(lines), inner);
}

// ── Help bar ─────────────────────────────────────────────────────────────

fn draw_help_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut keys: Vec<(&str, &str)> = vec![("1-3", "tab"), ("Tab", "next")];
    match app.active_tab {
        Tab::Systems => {}
        Tab::World if app.inspecting => keys.extend([
            ("i", "stop inspecting"),
            ("\u{2190}\u{2192}", "page"),
            ("\u{2191}\u{2193}", "scroll"),
        ]),
        Tab::World => keys.push(("i", "inspect")),
        Tab::Logs => keys.extend([
            ("f", "filter"),
            ("g", "follow"),
            ("\u{2191}\u{2193}", "scroll"),
        ]),
    }
    keys.extend([("p", "pause"), ("q", "quit")]);

    let key_style = Style::default().fg(Color::Cyan);
    let spans: Vec<Span> = keys
        .into_iter()
        .flat_map(|(key, action)| {
            [
                Span::styled(format!(" [{key}]"), key_style),
                Span::raw(format!(" {action} ")),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Min, mean and max of a history, or zeros when it is empty.
fn stats(data: &[u64]) -> (f64, f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let (min, max, sum) = data
        .iter()
        .fold((u64::MAX, 0, 0), |(min, max, sum), &v| (min.min(v), max.max(v), sum + v));
    (min as f64, sum as f64 / data.len() as f64, max as f64)
}

/// Cut `s` to at most `max_chars` characters, marking the cut with an ellipsis.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}\u{2026}")
}

/// Seconds as `12.3s` under a minute, else `m:ss` or `h:mm:ss`.
fn format_clock(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{secs:.1}s");
    }
    let total = secs as u64;
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}
