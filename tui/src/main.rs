use anyhow::Result;
use clap::Parser;
use config::{load_env_file, PathManager, Settings};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers, MouseEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use waypoint_core::message::{ChatStatus, StepStatus, ToolState};
use waypoint_core::routing::{RoutingAgent, RuleRouter};
use waypoint_core::sources::TextSegment;
use waypoint_core::storage::ThreadInfo;
use waypoint_core::tools::weather::OpenMeteoClient;
use waypoint_core::tools::web_search::HttpSearchProvider;
use waypoint_core::tools::ToolSet;
use waypoint_core::{
    filter_displayable_messages, ChatEngine, EngineEvent, Message, RenderPipeline, ThreadStore,
    ViewBlock,
};

#[cfg(not(debug_assertions))]
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

#[derive(Parser, Debug)]
#[command(name = "waypoint", about = "Travel assistant chat TUI")]
struct Args {
    /// Custom path to the thread database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Start with web search enabled (needs a configured API key)
    #[arg(long)]
    web_search: bool,
}

/// Input history for up/down arrow navigation
struct InputHistory {
    entries: Vec<String>,
    position: Option<usize>,
    draft: String,
}

impl InputHistory {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            position: None,
            draft: String::new(),
        }
    }

    fn push(&mut self, entry: String) {
        if !entry.is_empty() && self.entries.last() != Some(&entry) {
            self.entries.push(entry);
        }
        self.position = None;
        self.draft.clear();
    }

    fn prev(&mut self, current_input: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        match self.position {
            None => {
                self.draft = current_input.to_string();
                self.position = Some(self.entries.len() - 1);
            }
            Some(pos) if pos > 0 => {
                self.position = Some(pos - 1);
            }
            _ => return None,
        }
        self.position.map(|p| self.entries[p].as_str())
    }

    fn next(&mut self) -> Option<&str> {
        match self.position {
            Some(pos) if pos + 1 < self.entries.len() => {
                self.position = Some(pos + 1);
                Some(&self.entries[pos + 1])
            }
            Some(_) => {
                self.position = None;
                Some(&self.draft)
            }
            None => None,
        }
    }

    fn reset_position(&mut self) {
        self.position = None;
        self.draft.clear();
    }
}

struct App {
    input: Input,
    engine: ChatEngine,
    pipeline: RenderPipeline,
    messages: Vec<Message>,
    threads: Vec<ThreadInfo>,
    status: ChatStatus,
    status_message: Option<String>,
    web_search: bool,
    show_threads: bool,
    thinking_frame: usize,
    scroll_offset: usize,
    history: InputHistory,
}

impl App {
    fn new(engine: ChatEngine, web_search: bool) -> Self {
        App {
            input: Input::default(),
            engine,
            pipeline: RenderPipeline::with_defaults(),
            messages: Vec::new(),
            threads: Vec::new(),
            status: ChatStatus::Ready,
            status_message: None,
            web_search,
            show_threads: false,
            thinking_frame: 0,
            scroll_offset: 0,
            history: InputHistory::new(),
        }
    }

    fn queue_message(&mut self, message: String) {
        self.status = ChatStatus::Submitted;
        self.thinking_frame = 0;
        self.scroll_offset = 0;
        self.engine.send_message(message);
    }

    /// Replace the in-memory copy of a message by id, appending if new.
    fn upsert_message(&mut self, message: Message) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => *slot = message,
            None => self.messages.push(message),
        }
    }

    fn check_engine_events(&mut self) {
        while let Some(event) = self.engine.try_recv() {
            match event {
                EngineEvent::ThreadOpened { messages, .. } => {
                    self.messages = messages;
                    self.status = ChatStatus::Ready;
                    self.scroll_offset = 0;
                    self.show_threads = false;
                }
                EngineEvent::ThreadsChanged(threads) => {
                    self.threads = threads;
                }
                EngineEvent::MessageStarted(message) => {
                    self.upsert_message(message);
                    self.status = ChatStatus::Submitted;
                }
                EngineEvent::MessageUpdated(message) => {
                    self.upsert_message(message);
                    self.status = ChatStatus::Streaming;
                }
                EngineEvent::MessageComplete(message) => {
                    self.upsert_message(message);
                    self.status = ChatStatus::Ready;
                }
                EngineEvent::WebSearchChanged(enabled) => {
                    self.web_search = enabled;
                }
                EngineEvent::Error(err) => {
                    self.status = ChatStatus::Error;
                    self.status_message = Some(format!("Error: {}", err));
                }
            }
        }
    }

    fn is_streaming(&self) -> bool {
        matches!(self.status, ChatStatus::Submitted | ChatStatus::Streaming)
    }

    fn get_thinking_indicator(&self) -> &'static str {
        const BRAILLE_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];
        BRAILLE_FRAMES[self.thinking_frame % BRAILLE_FRAMES.len()]
    }

    fn advance_thinking_animation(&mut self) {
        self.thinking_frame = self.thinking_frame.wrapping_add(1);
    }

    fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines);
    }

    fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Handle a slash command. Returns false when the app should quit.
    fn handle_command(&mut self, input: &str) -> bool {
        let mut parts = input.trim_start_matches('/').splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match command {
            "help" => {
                self.status_message = Some(
                    "/new · /threads · /open <n> · /delete <n> · /search on|off · /quit".to_string(),
                );
            }
            "new" => {
                self.engine.new_thread();
                self.status_message = Some("Started a new thread".to_string());
            }
            "threads" => {
                self.show_threads = !self.show_threads;
                self.engine.refresh_threads();
            }
            "open" => match self.thread_by_index(arg) {
                Some(id) => self.engine.open_thread(id),
                None => self.status_message = Some("Usage: /open <n> (see /threads)".to_string()),
            },
            "delete" => match self.thread_by_index(arg) {
                Some(id) => {
                    self.engine.delete_thread(id);
                    self.status_message = Some("Thread deleted".to_string());
                }
                None => self.status_message = Some("Usage: /delete <n> (see /threads)".to_string()),
            },
            "search" => match arg {
                "on" => self.engine.set_web_search(true),
                "off" => self.engine.set_web_search(false),
                _ => self.status_message = Some("Usage: /search on|off".to_string()),
            },
            "quit" | "exit" => return false,
            other => {
                self.status_message = Some(format!("Unknown command: /{}", other));
            }
        }
        true
    }

    fn thread_by_index(&self, arg: &str) -> Option<String> {
        let index: usize = arg.parse().ok()?;
        self.threads.get(index.checked_sub(1)?).map(|t| t.id.clone())
    }

    /// Handle a key event. Returns false when the app should quit.
    fn handle_key_event(&mut self, key: crossterm::event::KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return true;
        }

        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('d'), KeyModifiers::CONTROL) => false,
            (KeyCode::Up, _) => {
                let current = self.input.value().to_string();
                if let Some(prev) = self.history.prev(&current) {
                    self.input = Input::from(prev.to_string());
                }
                true
            }
            (KeyCode::Down, _) => {
                if let Some(next) = self.history.next() {
                    self.input = Input::from(next.to_string());
                }
                true
            }
            (KeyCode::PageUp, _) => {
                self.scroll_up(10);
                true
            }
            (KeyCode::PageDown, _) => {
                self.scroll_down(10);
                true
            }
            (KeyCode::Enter, _) => {
                let input_text = self.input.value().trim().to_string();
                self.input.reset();
                self.history.push(input_text.clone());
                self.status_message = None;

                if input_text.is_empty() {
                    true
                } else if input_text.starts_with('/') {
                    self.handle_command(&input_text)
                } else if self.is_streaming() {
                    self.status_message = Some("Still thinking, hold on".to_string());
                    true
                } else {
                    self.queue_message(input_text);
                    true
                }
            }
            _ => {
                self.history.reset_position();
                self.input.handle_event(&Event::Key(key));
                true
            }
        }
    }
}

// ============================================================================
// View-block rendering
// ============================================================================

fn push_wrapped_text(lines: &mut Vec<Line<'static>>, text: &str, style: Style) {
    for line in text.lines() {
        lines.push(Line::from(Span::styled(line.to_string(), style)));
    }
}

fn response_lines(segments: &[TextSegment], lines: &mut Vec<Line<'static>>) {
    let mut spans: Vec<Span> = Vec::new();
    for segment in segments {
        match segment {
            TextSegment::Plain(text) => {
                let mut pieces = text.split('\n');
                if let Some(first) = pieces.next() {
                    if !first.is_empty() {
                        spans.push(Span::raw(first.to_string()));
                    }
                }
                for piece in pieces {
                    lines.push(Line::from(std::mem::take(&mut spans)));
                    if !piece.is_empty() {
                        spans.push(Span::raw(piece.to_string()));
                    }
                }
            }
            TextSegment::Citation { number, .. } => {
                spans.push(Span::styled(
                    format!("[{}]", number),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ));
            }
        }
    }
    if !spans.is_empty() {
        lines.push(Line::from(spans));
    }
}

fn step_symbol(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Waiting => "○",
        StepStatus::Running => "●",
        StepStatus::Success => "✓",
        StepStatus::Failed => "✗",
    }
}

fn block_lines(block: &ViewBlock, lines: &mut Vec<Line<'static>>) {
    match block {
        ViewBlock::Stack(blocks) => {
            for inner in blocks {
                block_lines(inner, lines);
            }
        }
        ViewBlock::Response { segments } => {
            response_lines(segments, lines);
        }
        ViewBlock::Reasoning { text, streaming } => {
            let prefix = if *streaming { "thinking… " } else { "" };
            push_wrapped_text(
                lines,
                &format!("{}{}", prefix, text),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            );
        }
        ViewBlock::Sources { sources } => {
            lines.push(Line::from(Span::styled(
                "Sources:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for (i, source) in sources.iter().enumerate() {
                let title = source.title.as_deref().unwrap_or(&source.url);
                lines.push(Line::from(Span::styled(
                    format!("  [{}] {} ({})", i + 1, title, source.url),
                    Style::default().fg(Color::Cyan),
                )));
            }
        }
        ViewBlock::NetworkTrace { data, streaming } => {
            let header = if *streaming {
                format!("{} (running)", data.name)
            } else {
                data.name.clone()
            };
            lines.push(Line::from(Span::styled(
                header,
                Style::default().fg(Color::Yellow),
            )));
            for step in &data.steps {
                let reason = step
                    .task
                    .as_ref()
                    .map(|t| t.reason.as_str())
                    .unwrap_or_default();
                lines.push(Line::from(Span::styled(
                    format!("  {} {} {}", step_symbol(step.status), step.name, reason),
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
        ViewBlock::ToolCall {
            name,
            state,
            error_text,
            ..
        } => {
            let label = match state {
                ToolState::OutputError => format!(
                    "[{} failed: {}]",
                    name,
                    error_text.as_deref().unwrap_or("unknown error")
                ),
                ToolState::OutputAvailable => format!("[{} done]", name),
                _ => format!("[{} running…]", name),
            };
            let color = if *state == ToolState::OutputError {
                Color::Red
            } else {
                Color::Yellow
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::ITALIC),
            )));
        }
        ViewBlock::Weather(report) => {
            lines.push(Line::from(Span::styled(
                format!("☀ {} · {}", report.location, report.conditions),
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                format!(
                    "  {:.0}°C (feels like {:.0}°C), humidity {:.0}%, wind {:.0} km/h gusting {:.0}",
                    report.temperature,
                    report.feels_like,
                    report.humidity,
                    report.wind_speed,
                    report.wind_gust
                ),
                Style::default().fg(Color::Magenta),
            )));
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Chat area
            Constraint::Length(3), // Input area
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let mut all_lines: Vec<Line> = Vec::new();

    if app.show_threads {
        all_lines.push(Line::from(Span::styled(
            "Threads (use /open <n>, /delete <n>):",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for (i, thread) in app.threads.iter().enumerate() {
            let title = thread.title.as_deref().unwrap_or("(untitled)");
            all_lines.push(Line::from(format!(
                "  {}. {} ({} messages)",
                i + 1,
                title,
                thread.message_count
            )));
        }
        all_lines.push(Line::from(""));
    }

    let displayable = filter_displayable_messages(&app.messages);
    let last_index = displayable.len().saturating_sub(1);
    for (index, &msg) in displayable.iter().enumerate() {
        let (role, style) = match msg.role {
            waypoint_core::Role::User => ("You", Style::default().fg(Color::Cyan)),
            waypoint_core::Role::Assistant => ("Waypoint", Style::default().fg(Color::Green)),
        };
        all_lines.push(Line::from(Span::styled(
            format!("[{}]", role),
            style.add_modifier(Modifier::BOLD),
        )));

        let blocks = app
            .pipeline
            .render_message(msg, app.status, index == last_index);
        for block in &blocks {
            block_lines(block, &mut all_lines);
        }
        all_lines.push(Line::from(""));
    }

    // scroll_offset=0 means auto-scroll to bottom, higher values scroll up
    let total_lines = all_lines.len();
    let visible_height = chunks[0].height.saturating_sub(2) as usize;
    let max_scroll = total_lines.saturating_sub(visible_height);
    if app.scroll_offset > max_scroll {
        app.scroll_offset = max_scroll;
    }
    let effective_scroll = max_scroll.saturating_sub(app.scroll_offset);

    let chat_content = Paragraph::new(all_lines)
        .block(Block::default().borders(Borders::ALL).title("Waypoint"))
        .scroll((effective_scroll as u16, 0));
    f.render_widget(chat_content, chunks[0]);

    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(max_scroll).position(effective_scroll);
        let scrollbar_area = chunks[0].inner(ratatui::layout::Margin {
            vertical: 1,
            horizontal: 0,
        });
        f.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }

    let input_widget = Paragraph::new(app.input.value())
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Where to? (/ for commands)"),
        );
    f.render_widget(input_widget, chunks[1]);

    let search_indicator = if app.web_search { " | search on" } else { "" };
    let status_text = if let Some(ref msg) = app.status_message {
        format!(" {}{} ", msg, search_indicator)
    } else if app.is_streaming() {
        format!(
            " {} Planning your answer…{} ",
            app.get_thinking_indicator(),
            search_indicator
        )
    } else {
        format!(
            " {} threads | {} messages{} ",
            app.threads.len(),
            app.messages.len(),
            search_indicator
        )
    };
    let status_bar =
        Paragraph::new(status_text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(status_bar, chunks[2]);

    f.set_cursor_position((
        chunks[1].x + app.input.visual_cursor() as u16 + 1,
        chunks[1].y + 1,
    ));
}

fn build_engine(args: &Args, settings: &Settings) -> Result<ChatEngine> {
    let db_path = match &args.db {
        Some(path) => path.clone(),
        None => {
            PathManager::ensure_dirs_exist()?;
            PathManager::db_path()
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?
        }
    };
    let store = Arc::new(ThreadStore::open(&db_path)?);

    let mut tools = ToolSet::new(Arc::new(OpenMeteoClient::new()));
    let search_key = settings
        .get_api_key("perplexity")
        .or_else(|| std::env::var("PERPLEXITY_API_KEY").ok());
    if let Some(key) = search_key {
        let mut provider = HttpSearchProvider::new(&key)?;
        if let Some(base_url) = &settings.search_base_url {
            provider = provider.with_base_url(base_url);
        }
        if let Some(model) = &settings.search_model {
            provider = provider.with_model(model);
        }
        tools = tools.with_search(Arc::new(provider));
    }

    let agent = RoutingAgent::new(tools, Arc::new(RuleRouter));
    Ok(ChatEngine::new(store, agent, settings.resource_id()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // File-based logging: a local truncated log in dev, daily rotation
    // under the data directory in release.
    #[cfg(debug_assertions)]
    let (non_blocking, _guard) = {
        let path = PathBuf::from("./waypoint.log");
        let _ = std::fs::remove_file(&path);
        tracing_appender::non_blocking(std::fs::File::create(&path)?)
    };

    #[cfg(not(debug_assertions))]
    let (non_blocking, _guard) = {
        let log_dir = PathManager::logs_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine logs directory"))?;
        std::fs::create_dir_all(&log_dir)?;
        let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "waypoint.log");
        tracing_appender::non_blocking(file_appender)
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Starting waypoint TUI");

    load_env_file();
    let settings = Settings::load();

    let engine = build_engine(&args, &settings)?;
    let web_search = args.web_search || settings.web_search;
    let mut app = App::new(engine, web_search);
    if web_search {
        app.engine.set_web_search(true);
    }
    app.engine.refresh_threads();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut should_quit = false;
    while !should_quit {
        terminal.draw(|f| ui(f, &mut app))?;

        app.check_engine_events();
        if app.is_streaming() {
            app.advance_thinking_animation();
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    should_quit = !app.handle_key_event(key);
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_up(3),
                    MouseEventKind::ScrollDown => app.scroll_down(3),
                    _ => {}
                },
                _ => {}
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    Ok(())
}
