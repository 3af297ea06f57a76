use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, unbounded};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::chant::lines::{self, DataQuery, DateWindow, DisplayMode, Filter};
use crate::chant::player::{ChantPlayer, TickOutcome};
use crate::config::Settings;
use crate::cue::CueBackend;
use crate::table::{PageRequest, PaginationTable};
use crate::worker::{self, FetchRequest, FetchResponse};

use super::panel::ChantPanel;
use super::render;

/// Longest the loop sleeps in `event::poll` when no fade tick is pending.
const IDLE_POLL: Duration = Duration::from_millis(100);
const LOG_CAP: usize = 500;

/// Launch the TUI, spawn the fetch worker, and drive the event loop.
pub(crate) fn run_tui(settings: Settings, log_rx: Receiver<String>) -> Result<()> {
    let (req_tx, req_rx) = unbounded::<FetchRequest>();
    let (resp_tx, resp_rx) = unbounded::<FetchResponse>();
    std::thread::spawn({
        let server = settings.server.clone();
        let timeout = settings.request_timeout;
        move || worker::worker_main(server, timeout, req_rx, resp_tx)
    });

    let cues = CueBackend::open(&settings.cues, settings.audio);
    let mut app = App::new(settings, cues, req_tx.clone(), resp_rx, log_rx);
    app.reload_table();

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);
    restore_terminal(&mut term)?;

    req_tx.send(FetchRequest::Quit).ok();
    result
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App {
    server: String,
    pub(crate) mode: DisplayMode,
    filters: Vec<Filter>,
    window: DateWindow,
    pub(crate) player: ChantPlayer<ChantPanel, CueBackend>,
    pub(crate) table: PaginationTable,
    pub(crate) table_error: Option<String>,
    pending_lines: Option<DataQuery>,
    req_tx: Sender<FetchRequest>,
    resp_rx: Receiver<FetchResponse>,

    pub(crate) status: String,
    pub(crate) help_open: bool,
    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    last_status_snapshot: String,
    log_rx: Receiver<String>,
}

impl App {
    fn new(
        settings: Settings,
        cues: CueBackend,
        req_tx: Sender<FetchRequest>,
        resp_rx: Receiver<FetchResponse>,
        log_rx: Receiver<String>,
    ) -> Self {
        let Settings {
            server,
            query,
            fade,
            quotes,
            per_page,
            ..
        } = settings;
        let status = format!("Ready ({})", cues.label());
        let player = ChantPlayer::new(
            ChantPanel::default(),
            cues,
            fade,
            quotes,
            lines::today_day_of_month,
        );
        let (headers, keys) = query.mode.table_columns();
        let table = PaginationTable::new(query.url(&server), headers, keys).with_per_page(per_page);

        Self {
            server,
            mode: query.mode,
            filters: query.filters,
            window: query.window,
            player,
            table,
            table_error: None,
            pending_lines: None,
            req_tx,
            resp_rx,
            status,
            help_open: false,
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            last_status_snapshot: String::new(),
            log_rx,
        }
    }

    fn query(&self) -> DataQuery {
        DataQuery {
            mode: self.mode,
            filters: self.filters.clone(),
            window: self.window,
        }
    }

    pub(crate) fn is_fetching_lines(&self) -> bool {
        self.pending_lines.is_some()
    }

    /// The trigger is offered only when Enter would start a session.
    pub(crate) fn trigger_visible(&self) -> bool {
        self.player.view().trigger_visible && !self.is_fetching_lines()
    }

    /// Ask the worker for lines; the session starts when they arrive.
    fn request_chant(&mut self) {
        if self.player.is_playing() || self.pending_lines.is_some() {
            return;
        }
        let query = self.query();
        if self.req_tx.send(FetchRequest::Lines(query.clone())).is_err() {
            self.status = "Fetch worker is not available".into();
            return;
        }
        self.status = format!("Fetching {}...", self.mode.title());
        self.pending_lines = Some(query);
    }

    fn send_page(&mut self, req: PageRequest) {
        let PageRequest { url, generation } = req;
        if self.req_tx.send(FetchRequest::Page { url, generation }).is_err() {
            self.status = "Fetch worker is not available".into();
        }
    }

    pub(crate) fn reload_table(&mut self) {
        let req = self.table.fetch_data();
        self.send_page(req);
    }

    fn table_prev(&mut self) {
        if let Some(req) = self.table.prev_page() {
            self.send_page(req);
        }
    }

    fn table_next(&mut self) {
        if let Some(req) = self.table.next_page() {
            self.send_page(req);
        }
    }

    /// Switch tab: the next session uses `mode`; the table reloads from page 1.
    /// A running session is left alone.
    fn select_mode(&mut self, mode: DisplayMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        let (headers, keys) = mode.table_columns();
        let url = self.query().url(&self.server);
        let req = self.table.retarget(url, headers, keys);
        self.table_error = None;
        self.send_page(req);
        tracing::info!(mode = mode.title(), "mode selected");
    }

    fn shift_mode(&mut self, delta: isize) {
        let len = DisplayMode::ALL.len() as isize;
        let next = (self.mode.index() as isize + delta).rem_euclid(len) as usize;
        self.select_mode(DisplayMode::ALL[next]);
    }

    /// Apply every pending worker response.
    pub(crate) fn drain_responses(&mut self, now: Instant) {
        while let Ok(resp) = self.resp_rx.try_recv() {
            self.handle_response(resp, now);
        }
    }

    fn handle_response(&mut self, resp: FetchResponse, now: Instant) {
        match resp {
            FetchResponse::Lines { query, result } => {
                if self.pending_lines.take().is_none() {
                    return;
                }
                match result {
                    Ok(lines) => {
                        let count = lines.len();
                        if self.player.play(lines, now) {
                            self.status = if count == 0 {
                                format!("No {} data; quote of the day", query.mode.title())
                            } else {
                                format!("Chanting {count} {}", query.mode.title())
                            };
                        }
                    }
                    Err(e) => self.status = format!("Fetch failed: {e}"),
                }
            }
            FetchResponse::Page { generation, result } => match result {
                Ok(page) => {
                    if self.table.apply_page(generation, page) {
                        self.table_error = None;
                    }
                }
                Err(e) => {
                    if self.table.is_current(generation) {
                        self.table_error = Some(e);
                    }
                }
            },
        }
    }

    pub(crate) fn drain_cue_events(&mut self) {
        for kind in self.player.cues().drain_ended() {
            self.player.on_cue_ended(kind);
        }
    }

    pub(crate) fn tick(&mut self, now: Instant) {
        if self.player.tick(now) == TickOutcome::Finished {
            self.status = "Chant finished".into();
        }
    }

    /// How long the loop may block waiting for input.
    pub(crate) fn poll_timeout(&self, now: Instant) -> Duration {
        self.player
            .next_deadline()
            .map(|due| due.saturating_duration_since(now).min(IDLE_POLL))
            .unwrap_or(IDLE_POLL)
    }

    /// Handle one key press. Returns `true` to quit.
    pub(crate) fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.logs_open {
            match code {
                KeyCode::Char('q') => return true,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return false;
        }
        if self.help_open {
            match code {
                KeyCode::Char('q') => return true,
                KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('?') => self.help_open = false,
                _ => {}
            }
            return false;
        }
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Enter | KeyCode::Char('s') => self.request_chant(),
            KeyCode::Right | KeyCode::Tab => self.shift_mode(1),
            KeyCode::Left | KeyCode::BackTab => self.shift_mode(-1),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some(mode) = DisplayMode::ALL.get(index) {
                    self.select_mode(*mode);
                }
            }
            KeyCode::PageUp | KeyCode::Char('[') => self.table_prev(),
            KeyCode::PageDown | KeyCode::Char(']') => self.table_next(),
            KeyCode::Char('r') => {
                self.reload_table();
                self.status = "Reloading table...".into();
            }
            KeyCode::Char('l') => self.toggle_logs(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.help_open = true,
            _ => {}
        }
        false
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn note_status_change(&mut self) {
        if self.last_status_snapshot == self.status {
            return;
        }
        let line = self.status.clone();
        self.last_status_snapshot = self.status.clone();
        self.push_log_line(line);
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
    }
}

fn ui_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        let now = Instant::now();
        app.drain_responses(now);
        app.drain_cue_events();
        app.tick(now);
        app.drain_logs();

        terminal.draw(|f| render::draw(f, app))?;

        if event::poll(app.poll_timeout(Instant::now())).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                if k.kind == KeyEventKind::Press && app.handle_key(k.code) {
                    return Ok(());
                }
            }
        }

        app.note_status_change();
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
