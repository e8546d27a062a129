use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::{wrap, Options as WrapOptions};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::actions::{Clipboard, Launcher};
use crate::comments;
use crate::data::VideoFeed;
use crate::error::AppError;
use crate::state::{AppState, FetchStatus};
use crate::youtube::VideoRecord;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const COMMENT_PREVIEW_LINES: usize = 3;
const SETTINGS_FIXED_ROWS: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Pane {
    Comments,
    Videos,
    Settings,
}

impl Pane {
    fn title(self) -> &'static str {
        match self {
            Pane::Comments => "Comments",
            Pane::Videos => "Videos",
            Pane::Settings => "Settings",
        }
    }

    fn next(self) -> Self {
        match self {
            Pane::Comments => Pane::Videos,
            Pane::Videos => Pane::Settings,
            Pane::Settings => Pane::Comments,
        }
    }

    fn previous(self) -> Self {
        match self {
            Pane::Comments => Pane::Settings,
            Pane::Videos => Pane::Comments,
            Pane::Settings => Pane::Videos,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SettingsRow {
    ApiKey,
    ChannelId,
    MaxResults,
    Account(usize),
    AddAccount,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PromptKind {
    AddComment,
    Upload,
    ApiKey,
    ChannelId,
    MaxResults,
    AddAccount,
}

impl PromptKind {
    fn title(self) -> &'static str {
        match self {
            PromptKind::AddComment => "New comment",
            PromptKind::Upload => "Upload comments (.pdf, .txt, .csv)",
            PromptKind::ApiKey => "YouTube API key",
            PromptKind::ChannelId => "Channel ID",
            PromptKind::MaxResults => "Max results (1-50)",
            PromptKind::AddAccount => "Account label",
        }
    }

    fn hint(self) -> &'static str {
        match self {
            PromptKind::Upload => "Path to a file; ~ expands to your home directory.",
            PromptKind::AddComment => "Commas are kept as typed.",
            PromptKind::AddAccount => "A display name for your own bookkeeping.",
            _ => "Paste or type a value.",
        }
    }
}

struct Prompt {
    kind: PromptKind,
    buffer: String,
}

impl Prompt {
    fn new(kind: PromptKind) -> Self {
        Self {
            kind,
            buffer: String::new(),
        }
    }

    fn with_value(kind: PromptKind, value: &str) -> Self {
        Self {
            kind,
            buffer: value.to_string(),
        }
    }

    fn insert_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.buffer.push(ch);
        }
    }

    fn insert_str(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' || ch == '\r' {
                self.buffer.push(' ');
            } else {
                self.insert_char(ch);
            }
        }
    }

    fn backspace(&mut self) {
        self.buffer.pop();
    }
}

enum AsyncResponse {
    Videos {
        result: Result<Vec<VideoRecord>, AppError>,
    },
    Import {
        path: PathBuf,
        result: Result<Vec<String>, AppError>,
    },
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let top = area.height.saturating_sub(height) / 2;
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(top),
            Constraint::Length(height.min(area.height)),
            Constraint::Min(0),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width.saturating_sub(1) {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn comment_preview(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let width = width.max(8);
    let mut lines: Vec<String> = wrap(text, WrapOptions::new(width))
        .into_iter()
        .map(|line| line.into_owned())
        .collect();
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            let trimmed = truncate_to_width(last, width.saturating_sub(1));
            *last = format!("{}…", trimmed.trim_end_matches('…'));
        }
    }
    lines
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let count = secret.chars().count();
    if count <= 4 {
        return "•".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "•".repeat(count.min(12) - 4), tail)
}

fn normalize_path_input(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| {
            trimmed
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
        })
        .unwrap_or(trimmed);
    if let Some(rest) = unquoted.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(unquoted)
}

fn move_cursor(current: usize, len: usize, delta: i32) -> usize {
    if len == 0 {
        return 0;
    }
    let next = current as i64 + delta as i64;
    next.clamp(0, len as i64 - 1) as usize
}

pub struct Options {
    pub state: AppState,
    pub feed: Arc<dyn VideoFeed>,
    pub clipboard: Box<dyn Clipboard>,
    pub launcher: Box<dyn Launcher>,
    pub config_path: String,
}

pub struct Model {
    state: AppState,
    feed: Arc<dyn VideoFeed>,
    clipboard: Box<dyn Clipboard>,
    launcher: Box<dyn Launcher>,
    focused_pane: Pane,
    comment_cursor: usize,
    video_cursor: usize,
    settings_cursor: usize,
    prompt: Option<Prompt>,
    confirm_clear: bool,
    imports_in_flight: usize,
    spinner: Spinner,
    needs_redraw: bool,
    drawn_revision: u64,
    config_path: String,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let mut model = Self {
            state: opts.state,
            feed: opts.feed,
            clipboard: opts.clipboard,
            launcher: opts.launcher,
            focused_pane: Pane::Comments,
            comment_cursor: 0,
            video_cursor: 0,
            settings_cursor: 0,
            prompt: None,
            confirm_clear: false,
            imports_in_flight: 0,
            spinner: Spinner::new(),
            needs_redraw: true,
            drawn_revision: 0,
            config_path: opts.config_path,
            response_tx,
            response_rx,
        };
        if model.state.status().is_empty() {
            let message = if model.state.settings().has_credentials() {
                "Ready. Press f to fetch the latest uploads."
            } else {
                "Welcome! Open Settings (3) to enter an API key and channel ID."
            };
            model.state.set_status(message);
        }
        if !model.state.settings().has_credentials() {
            model.focused_pane = Pane::Settings;
        }
        model
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableBracketedPaste)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw || self.drawn_revision != self.state.revision() {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
                self.drawn_revision = self.state.revision();
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                log::error!("ui: key handler failed: {err:#}");
                                self.state.set_status(format!("Error: {}", err));
                            }
                        }
                    }
                    Event::Paste(text) => self.handle_paste(&text),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.state.is_busy() || self.imports_in_flight > 0
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Videos { result } => {
                if self.state.finish_fetch(result).is_ok() {
                    self.video_cursor = 0;
                }
                self.clamp_cursors();
            }
            AsyncResponse::Import { path, result } => {
                self.imports_in_flight = self.imports_in_flight.saturating_sub(1);
                match self.state.finish_import(result) {
                    Ok(added) => log::info!("ui: imported {added} comments from {}", path.display()),
                    Err(err) => log::debug!("ui: import of {} failed: {err}", path.display()),
                }
                self.clamp_cursors();
            }
        }
    }

    fn clamp_cursors(&mut self) {
        self.comment_cursor = self
            .comment_cursor
            .min(self.state.comments().len().saturating_sub(1));
        self.video_cursor = self
            .video_cursor
            .min(self.state.videos().len().saturating_sub(1));
        self.settings_cursor = self
            .settings_cursor
            .min(self.settings_rows().len().saturating_sub(1));
    }

    fn settings_rows(&self) -> Vec<SettingsRow> {
        let mut rows = Vec::with_capacity(SETTINGS_FIXED_ROWS + self.state.accounts().len() + 1);
        rows.extend([
            SettingsRow::ApiKey,
            SettingsRow::ChannelId,
            SettingsRow::MaxResults,
        ]);
        rows.extend((0..self.state.accounts().len()).map(SettingsRow::Account));
        rows.push(SettingsRow::AddAccount);
        rows
    }

    fn current_settings_row(&self) -> SettingsRow {
        self.settings_rows()
            .get(self.settings_cursor)
            .copied()
            .unwrap_or(SettingsRow::AddAccount)
    }

    fn start_fetch(&mut self) {
        let Ok(request) = self.state.begin_fetch() else {
            return;
        };
        let feed = self.feed.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = feed.latest_videos(&request);
            let _ = tx.send(AsyncResponse::Videos { result });
        });
    }

    fn start_import(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() {
            return;
        }
        self.imports_in_flight += 1;
        self.state
            .set_status(format!("Reading comments from {}…", path.display()));
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = comments::ingest_file(&path);
            let _ = tx.send(AsyncResponse::Import { path, result });
        });
    }

    fn handle_paste(&mut self, text: &str) {
        if let Some(prompt) = self.prompt.as_mut() {
            prompt.insert_str(text);
            self.mark_dirty();
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.prompt.is_some() {
            self.handle_prompt_key(code);
            return Ok(false);
        }

        if code != KeyCode::Char('X') {
            self.confirm_clear = false;
        }

        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Esc => {
                self.state.clear_error();
            }
            KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => {
                self.focused_pane = self.focused_pane.previous();
            }
            KeyCode::Char('1') => self.focused_pane = Pane::Comments,
            KeyCode::Char('2') => self.focused_pane = Pane::Videos,
            KeyCode::Char('3') => self.focused_pane = Pane::Settings,
            KeyCode::Char('f') | KeyCode::Char('r') => self.start_fetch(),
            KeyCode::Char('j') | KeyCode::Down => self.navigate(1),
            KeyCode::Char('k') | KeyCode::Up => self.navigate(-1),
            KeyCode::PageDown => self.navigate(10),
            KeyCode::PageUp => self.navigate(-10),
            _ => match self.focused_pane {
                Pane::Comments => self.handle_comments_key(code),
                Pane::Videos => self.handle_videos_key(code),
                Pane::Settings => self.handle_settings_key(code),
            },
        }
        self.mark_dirty();
        Ok(false)
    }

    fn navigate(&mut self, delta: i32) {
        match self.focused_pane {
            Pane::Comments => {
                self.comment_cursor =
                    move_cursor(self.comment_cursor, self.state.comments().len(), delta);
            }
            Pane::Videos => {
                self.video_cursor = move_cursor(self.video_cursor, self.state.videos().len(), delta);
            }
            Pane::Settings => {
                self.settings_cursor =
                    move_cursor(self.settings_cursor, self.settings_rows().len(), delta);
            }
        }
    }

    fn handle_comments_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                if self.state.selected_comment() == Some(self.comment_cursor) {
                    self.state.clear_selection();
                    self.state.set_status("Selection cleared; the first comment will be used.");
                } else {
                    let _ = self.state.select_comment(self.comment_cursor);
                }
            }
            KeyCode::Char('a') => self.prompt = Some(Prompt::new(PromptKind::AddComment)),
            KeyCode::Char('u') => self.prompt = Some(Prompt::new(PromptKind::Upload)),
            KeyCode::Char('d') | KeyCode::Delete => {
                if self.state.remove_comment(self.comment_cursor).is_ok() {
                    self.clamp_cursors();
                }
            }
            KeyCode::Char('X') => {
                if self.state.comments().is_empty() {
                    return;
                }
                if self.confirm_clear {
                    self.confirm_clear = false;
                    self.state.clear_comments();
                    self.comment_cursor = 0;
                } else {
                    self.confirm_clear = true;
                    self.state
                        .set_status("Press X again to delete every comment in the bank.");
                }
            }
            _ => {}
        }
    }

    fn handle_videos_key(&mut self, code: KeyCode) {
        if let KeyCode::Enter | KeyCode::Char('o') = code {
            let _ = self.state.copy_and_open(
                self.video_cursor,
                self.clipboard.as_mut(),
                self.launcher.as_mut(),
            );
        }
    }

    fn handle_settings_key(&mut self, code: KeyCode) {
        let row = self.current_settings_row();
        match code {
            KeyCode::Enter => match row {
                SettingsRow::ApiKey => {
                    let value = self.state.settings().api_key.clone();
                    self.prompt = Some(Prompt::with_value(PromptKind::ApiKey, &value));
                }
                SettingsRow::ChannelId => {
                    let value = self.state.settings().channel_id.clone();
                    self.prompt = Some(Prompt::with_value(PromptKind::ChannelId, &value));
                }
                SettingsRow::MaxResults => {
                    let value = self.state.settings().max_results.to_string();
                    self.prompt = Some(Prompt::with_value(PromptKind::MaxResults, &value));
                }
                SettingsRow::Account(index) => {
                    let _ = self.state.set_active_account(index);
                }
                SettingsRow::AddAccount => {
                    self.prompt = Some(Prompt::new(PromptKind::AddAccount));
                }
            },
            KeyCode::Char('a') => self.prompt = Some(Prompt::new(PromptKind::AddAccount)),
            KeyCode::Char('d') | KeyCode::Delete => {
                if let SettingsRow::Account(index) = row {
                    if self.state.remove_account(index).is_ok() {
                        self.clamp_cursors();
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.prompt = None;
                self.state.set_status("Cancelled.");
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.backspace();
                }
            }
            KeyCode::Char(ch) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.insert_char(ch);
                }
            }
            _ => {}
        }
        self.mark_dirty();
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        let value = prompt.buffer;
        match prompt.kind {
            PromptKind::AddComment => {
                if self.state.add_comment(&value).is_ok() {
                    self.comment_cursor = self.state.comments().len().saturating_sub(1);
                }
            }
            PromptKind::Upload => self.start_import(normalize_path_input(&value)),
            PromptKind::ApiKey => self.state.set_api_key(&value),
            PromptKind::ChannelId => self.state.set_channel_id(&value),
            PromptKind::MaxResults => {
                let _ = self.state.set_max_results_text(&value);
            }
            PromptKind::AddAccount => {
                let _ = self.state.add_account(&value);
            }
        }
        self.clamp_cursors();
    }

    fn draw(&self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        frame.render_widget(self.status_line(), layout[0]);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(35),
                Constraint::Percentage(40),
                Constraint::Percentage(25),
            ])
            .split(layout[1]);

        self.draw_comments(frame, main_chunks[0]);
        self.draw_videos(frame, main_chunks[1]);
        self.draw_settings(frame, main_chunks[2]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);

        if self.prompt.is_some() {
            self.draw_prompt(frame, layout[1]);
        }
    }

    fn status_line(&self) -> Paragraph<'static> {
        if let Some(error) = self.state.error() {
            return Paragraph::new(format!("✗ {error}  (Esc to dismiss)")).style(
                Style::default()
                    .fg(COLOR_ERROR)
                    .bg(COLOR_PANEL_FOCUSED_BG)
                    .add_modifier(Modifier::BOLD),
            );
        }
        let mut text = if self.is_loading() {
            format!("{} {}", self.spinner.frame(), self.state.status())
        } else {
            self.state.status().to_string()
        };
        if let Some(label) = self.state.active_account_label() {
            text = format!("{text}  [{label}]");
        }
        Paragraph::new(text.trim().to_string()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        )
    }

    fn pane_block(&self, pane: Pane, title: String) -> Block<'static> {
        let focused = self.focused_pane == pane;
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(title, title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn highlight_style() -> Style {
        Style::default()
            .fg(COLOR_TEXT_PRIMARY)
            .bg(COLOR_PANEL_SELECTED_BG)
            .add_modifier(Modifier::BOLD)
    }

    fn placeholder(message: &str) -> Paragraph<'static> {
        Paragraph::new(message.to_string())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )
            .wrap(Wrap { trim: true })
    }

    fn draw_comments(&self, frame: &mut Frame<'_>, area: Rect) {
        let bank = self.state.comments();
        let title = format!("{} ({})", Pane::Comments.title(), bank.len());
        let block = self.pane_block(Pane::Comments, title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if bank.is_empty() {
            frame.render_widget(
                Self::placeholder("No comments yet. Press a to add one or u to upload a file."),
                inner,
            );
            return;
        }

        let selected = self.state.selected_comment();
        let text_width = (inner.width as usize).saturating_sub(6);
        let items: Vec<ListItem> = bank
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let marker = if selected == Some(idx) {
                    Span::styled("● ", Style::default().fg(COLOR_SUCCESS))
                } else {
                    Span::raw("  ")
                };
                let mut lines = Vec::new();
                for (line_idx, chunk) in comment_preview(text, text_width, COMMENT_PREVIEW_LINES)
                    .into_iter()
                    .enumerate()
                {
                    let lead = if line_idx == 0 {
                        marker.clone()
                    } else {
                        Span::raw("  ")
                    };
                    lines.push(Line::from(vec![
                        lead,
                        Span::styled(chunk, Style::default().fg(COLOR_TEXT_PRIMARY)),
                    ]));
                }
                ListItem::new(lines)
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Self::highlight_style())
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(self.comment_cursor.min(bank.len() - 1)));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_videos(&self, frame: &mut Frame<'_>, area: Rect) {
        let videos = self.state.videos();
        let title = match self.state.fetch_status() {
            FetchStatus::Pending => format!("{} (fetching…)", Pane::Videos.title()),
            FetchStatus::Failed => format!("{} (last fetch failed)", Pane::Videos.title()),
            FetchStatus::Idle => format!("{} ({})", Pane::Videos.title(), videos.len()),
        };
        let block = self.pane_block(Pane::Videos, title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if videos.is_empty() {
            frame.render_widget(
                Self::placeholder("No videos loaded. Press f to fetch the channel's latest uploads."),
                inner,
            );
            return;
        }

        let width = (inner.width as usize).saturating_sub(2);
        let items: Vec<ListItem> = videos
            .iter()
            .map(|video| {
                let published = video
                    .published_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string();
                let thumb = if video.thumbnail_url.is_some() {
                    " ▣"
                } else {
                    ""
                };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        truncate_to_width(&video.title, width),
                        Style::default()
                            .fg(COLOR_TEXT_PRIMARY)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        truncate_to_width(&format!("{published} · {}{thumb}", video.id), width),
                        Style::default().fg(COLOR_TEXT_SECONDARY),
                    )),
                ])
            })
            .collect();

        let list = List::new(items)
            .highlight_style(Self::highlight_style())
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        list_state.select(Some(self.video_cursor.min(videos.len() - 1)));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_settings(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = self.pane_block(Pane::Settings, Pane::Settings.title().to_string());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let settings = self.state.settings();
        let width = (inner.width as usize).saturating_sub(2);
        let label_style = Style::default().fg(COLOR_TEXT_SECONDARY);
        let value_style = Style::default().fg(COLOR_TEXT_PRIMARY);

        let field = |label: &str, value: String| {
            ListItem::new(vec![
                Line::from(Span::styled(label.to_string(), label_style)),
                Line::from(Span::styled(truncate_to_width(&value, width), value_style)),
            ])
        };

        let mut items = Vec::new();
        for row in self.settings_rows() {
            let item = match row {
                SettingsRow::ApiKey => field("API key", mask_secret(&settings.api_key)),
                SettingsRow::ChannelId => field(
                    "Channel ID",
                    if settings.channel_id.is_empty() {
                        "(not set)".to_string()
                    } else {
                        settings.channel_id.clone()
                    },
                ),
                SettingsRow::MaxResults => field("Max results", settings.max_results.to_string()),
                SettingsRow::Account(index) => {
                    let label = self.state.accounts()[index].clone();
                    let active = self.state.active_account() == Some(index);
                    let mut spans = vec![Span::styled(
                        truncate_to_width(&label, width.saturating_sub(9)),
                        value_style,
                    )];
                    if active {
                        spans.push(Span::styled(" (active)", Style::default().fg(COLOR_SUCCESS)));
                    }
                    let mut lines = Vec::new();
                    if index == 0 {
                        lines.push(Line::default());
                        lines.push(Line::from(Span::styled("Accounts", label_style)));
                    }
                    lines.push(Line::from(spans));
                    ListItem::new(lines)
                }
                SettingsRow::AddAccount => {
                    let mut lines = Vec::new();
                    if self.state.accounts().is_empty() {
                        lines.push(Line::default());
                        lines.push(Line::from(Span::styled("Accounts", label_style)));
                    }
                    lines.push(Line::from(Span::styled(
                        "+ Add account label",
                        Style::default().fg(COLOR_ACCENT),
                    )));
                    ListItem::new(lines)
                }
            };
            items.push(item);
        }

        let mut list = List::new(items).highlight_symbol("▶ ");
        if self.focused_pane == Pane::Settings {
            list = list.highlight_style(Self::highlight_style());
        }
        let mut list_state = ListState::default();
        list_state.select(Some(self.settings_cursor));
        frame.render_stateful_widget(list, inner, &mut list_state);
    }

    fn draw_prompt(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(prompt) = self.prompt.as_ref() else {
            return;
        };
        let popup = centered_rect(60, 7, area);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(Span::styled(
                prompt.kind.title(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let input_width = inner.width.saturating_sub(2) as usize;
        let shown = tail_to_width(&prompt.buffer, input_width);
        let body = Text::from(vec![
            Line::from(Span::styled(
                prompt.kind.hint(),
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("> ", Style::default().fg(COLOR_ACCENT)),
                Span::styled(shown.clone(), Style::default().fg(COLOR_TEXT_PRIMARY)),
            ]),
            Line::from(Span::styled(
                "Enter save · Esc cancel",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]);
        frame.render_widget(Paragraph::new(body), inner);

        let cursor_x = inner.x + 2 + UnicodeWidthStr::width(shown.as_str()) as u16;
        frame.set_cursor(cursor_x.min(inner.right().saturating_sub(1)), inner.y + 2);
    }

    fn footer_text(&self) -> String {
        if let Some(prompt) = self.prompt.as_ref() {
            return format!("{}: type or paste · Enter save · Esc cancel", prompt.kind.title());
        }

        let mut parts: Vec<String> = Vec::new();
        match self.focused_pane {
            Pane::Comments => {
                parts.push("Comments: j/k move, Enter select".to_string());
                parts.push("a add · u upload · d delete · X clear".to_string());
            }
            Pane::Videos => {
                if self.state.videos().is_empty() {
                    parts.push("Videos: press f to fetch".to_string());
                } else {
                    parts.push("Videos: j/k move, Enter copy comment & open".to_string());
                }
            }
            Pane::Settings => {
                parts.push("Settings: j/k move, Enter edit/activate".to_string());
                parts.push("a add account · d delete account".to_string());
                parts.push(format!("config {}", self.config_path));
            }
        }
        parts.push("f fetch".to_string());
        parts.push("Tab switch pane".to_string());
        parts.push("q quit".to_string());
        parts.join(" · ")
    }
}

fn tail_to_width(text: &str, width: usize) -> String {
    let mut used = 0;
    let mut kept: Vec<char> = Vec::new();
    for ch in text.chars().rev() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        kept.push(ch);
    }
    kept.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::testing::RecordingClipboard;
    use crate::config::YoutubeConfig;
    use crate::data::{sample_videos, MockVideoFeed};
    use crate::storage::Store;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct SharedLauncher(Arc<Mutex<Vec<String>>>);

    impl Launcher for SharedLauncher {
        fn open(&mut self, url: &str) -> anyhow::Result<()> {
            self.0.lock().push(url.to_string());
            Ok(())
        }
    }

    fn model_with(feed: Arc<MockVideoFeed>, launcher: SharedLauncher) -> Model {
        let state = AppState::load(Store::in_memory().unwrap(), &YoutubeConfig::default());
        Model::new(Options {
            state,
            feed,
            clipboard: Box::new(RecordingClipboard::default()),
            launcher: Box::new(launcher),
            config_path: "~/.config/ych-tui/config.yaml".into(),
        })
    }

    fn type_text(model: &mut Model, text: &str) {
        for ch in text.chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn wait_for_response(model: &mut Model) {
        let message = model
            .response_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker response");
        model.handle_async_response(message);
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        assert_eq!(truncate_to_width("🦀🦀🦀", 4), "🦀…");
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    #[test]
    fn tail_keeps_rightmost_columns() {
        assert_eq!(tail_to_width("abcdef", 3), "def");
        assert_eq!(tail_to_width("ab", 5), "ab");
    }

    #[test]
    fn comment_preview_limits_lines() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let lines = comment_preview(text, 10, 2);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with('…'));
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abc"), "•••");
        assert_eq!(mask_secret("AIzaSyExample1234"), "••••••••1234");
    }

    #[test]
    fn path_input_is_unquoted_and_expanded() {
        assert_eq!(
            normalize_path_input(" '/tmp/my list.csv' "),
            PathBuf::from("/tmp/my list.csv")
        );
        assert_eq!(normalize_path_input("\"a.txt\""), PathBuf::from("a.txt"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(normalize_path_input("~/c.pdf"), home.join("c.pdf"));
        }
    }

    #[test]
    fn cursor_movement_is_clamped() {
        assert_eq!(move_cursor(0, 0, 1), 0);
        assert_eq!(move_cursor(0, 3, -1), 0);
        assert_eq!(move_cursor(1, 3, 10), 2);
    }

    #[test]
    fn starts_in_settings_without_credentials() {
        let model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        assert_eq!(model.focused_pane, Pane::Settings);
        assert!(model.state().status().contains("Settings"));
    }

    #[test]
    fn adding_a_comment_through_the_prompt() {
        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut model, "Great video!");
        model.handle_key(KeyCode::Backspace).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.prompt.is_none());
        assert_eq!(model.state().comments().as_slice(), ["Great video"]);
    }

    #[test]
    fn quit_key_is_literal_inside_prompt() {
        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('a')).unwrap();
        assert!(!model.handle_key(KeyCode::Char('q')).unwrap());
        model.handle_key(KeyCode::Esc).unwrap();
        assert!(model.state().comments().is_empty());
        assert!(model.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn fetch_without_credentials_shows_error_and_skips_network() {
        let feed = Arc::new(MockVideoFeed::new());
        let mut model = model_with(feed.clone(), SharedLauncher::default());
        model.handle_key(KeyCode::Char('f')).unwrap();
        assert_eq!(feed.calls(), 0);
        assert!(model.state().error().is_some());
        model.handle_key(KeyCode::Esc).unwrap();
        assert!(model.state().error().is_none());
    }

    #[test]
    fn fetch_then_open_video_with_selected_comment() {
        let feed = Arc::new(MockVideoFeed::new());
        feed.push(Ok(sample_videos("abc", 2)));
        let launcher = SharedLauncher::default();
        let mut model = model_with(feed.clone(), launcher.clone());

        model.handle_key(KeyCode::Char('3')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        type_text(&mut model, "KEY");
        model.handle_key(KeyCode::Enter).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        type_text(&mut model, "UC123");
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.state().settings().has_credentials());

        model.handle_key(KeyCode::Char('f')).unwrap();
        assert!(model.is_loading());
        wait_for_response(&mut model);
        assert_eq!(model.state().videos().len(), 2);
        assert_eq!(feed.calls(), 1);

        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut model, "Nice!");
        model.handle_key(KeyCode::Enter).unwrap();

        model.handle_key(KeyCode::Char('2')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(
            launcher.0.lock().as_slice(),
            ["https://www.youtube.com/watch?v=abc1#ych_comment=Nice%21"]
        );
    }

    #[test]
    fn deleting_selected_comment_clears_selection() {
        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model
            .state
            .merge_comments(vec!["one".into(), "two".into()]);
        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.state().selected_comment(), Some(1));
        model.handle_key(KeyCode::Char('d')).unwrap();
        assert_eq!(model.state().selected_comment(), None);
        assert_eq!(model.comment_cursor, 0);
    }

    #[test]
    fn clear_bank_needs_confirmation() {
        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model.state.merge_comments(vec!["one".into()]);
        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('X')).unwrap();
        assert_eq!(model.state().comments().len(), 1);
        model.handle_key(KeyCode::Char('X')).unwrap();
        assert!(model.state().comments().is_empty());
    }

    #[test]
    fn upload_prompt_imports_file_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.txt");
        std::fs::write(&path, "Great video!, Great video! \n Nice one").unwrap();

        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model.state.merge_comments(vec!["Nice one".into()]);
        model.handle_key(KeyCode::Char('1')).unwrap();
        model.handle_key(KeyCode::Char('u')).unwrap();
        model.handle_paste(path.to_str().unwrap());
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.imports_in_flight, 1);
        wait_for_response(&mut model);
        assert_eq!(model.imports_in_flight, 0);
        assert_eq!(
            model.state().comments().as_slice(),
            ["Nice one", "Great video!"]
        );
    }

    #[test]
    fn account_labels_from_settings_pane() {
        let mut model = model_with(Arc::new(MockVideoFeed::new()), SharedLauncher::default());
        model.handle_key(KeyCode::Char('3')).unwrap();
        model.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut model, "Main");
        model.handle_key(KeyCode::Enter).unwrap();
        model.handle_key(KeyCode::Char('a')).unwrap();
        type_text(&mut model, "Alt");
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.state().active_account_label(), Some("Main"));

        model.settings_cursor = SETTINGS_FIXED_ROWS + 1;
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.state().active_account_label(), Some("Alt"));
        model.handle_key(KeyCode::Char('d')).unwrap();
        assert_eq!(model.state().accounts(), ["Main"]);
        assert_eq!(model.state().active_account_label(), Some("Main"));
    }
}
