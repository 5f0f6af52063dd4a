use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::highlight::DiffHighlighter;
use crate::ledger::Comparison;
use crate::navigation::NavigationIndex;
use crate::review::{ComparisonView, FileView, ReviewService};
use crate::vcs::VcsProvider;
use crate::{Decision, FileStatus};

/// Which files the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    All,
    Unreviewed,
}

fn status_style(status: FileStatus) -> (&'static str, Style) {
    match status {
        FileStatus::Unreviewed => ("[ ]", Style::default()),
        FileStatus::Approved => ("[✓]", Style::default().fg(Color::Green)),
        FileStatus::Rejected => ("[✗]", Style::default().fg(Color::Red)),
        FileStatus::Skipped => ("[-]", Style::default().fg(Color::DarkGray)),
        FileStatus::Mixed => ("[~]", Style::default().fg(Color::Yellow)),
    }
}

/// Application state for the TUI.
pub struct App<'a, V: VcsProvider> {
    service: &'a ReviewService<V>,
    highlighter: DiffHighlighter,
    view: ComparisonView,
    visible: NavigationIndex,
    selected: Option<String>,
    file: Option<FileView>,
    diff_lines: Vec<Line<'static>>,
    filter: FilterMode,
    should_quit: bool,
    show_help: bool,
    scroll_offset: u16,
    status_message: Option<(String, Instant)>,
}

impl<'a, V: VcsProvider> App<'a, V> {
    /// Open a comparison and select the first file in review order.
    pub fn new(
        service: &'a ReviewService<V>,
        comparison: &Comparison,
        highlighter: DiffHighlighter,
    ) -> Result<Self> {
        let view = service
            .open_comparison(comparison)
            .context("Failed to open comparison")?;

        let mut app = Self {
            service,
            highlighter,
            visible: NavigationIndex::new(&view.files),
            view,
            selected: None,
            file: None,
            diff_lines: Vec::new(),
            filter: FilterMode::All,
            should_quit: false,
            show_help: false,
            scroll_offset: 0,
            status_message: None,
        };
        let first = app.visible.first().map(str::to_string);
        app.select(first)?;
        Ok(app)
    }

    fn rebuild_visible(&mut self) {
        let files: Vec<_> = self
            .view
            .files
            .iter()
            .filter(|f| match self.filter {
                FilterMode::All => true,
                FilterMode::Unreviewed => f.status == FileStatus::Unreviewed,
            })
            .cloned()
            .collect();
        self.visible = NavigationIndex::new(&files);
    }

    /// Load the diff for `path` and make it the current file.
    fn select(&mut self, path: Option<String>) -> Result<()> {
        self.scroll_offset = 0;
        let Some(path) = path else {
            self.selected = None;
            self.file = None;
            self.diff_lines.clear();
            return Ok(());
        };

        let file = self
            .service
            .open_file(&self.view, &path)
            .with_context(|| format!("Failed to load diff for {}", path))?;
        self.diff_lines = self.highlighter.render(&file.path, &file.diff);
        self.file = Some(file);
        self.selected = Some(path);
        Ok(())
    }

    /// Re-aggregate from storage, keeping `preferred` selected when it is still visible.
    fn refresh(&mut self, preferred: Option<String>) -> Result<()> {
        self.view = self
            .service
            .open_comparison(&self.view.comparison)
            .context("Failed to reload comparison")?;
        self.rebuild_visible();

        let target = preferred
            .filter(|p| self.visible.position(p).is_some())
            .or_else(|| self.visible.first().map(str::to_string));
        self.select(target)
    }

    fn navigate_next(&mut self) -> Result<()> {
        let next = self
            .selected
            .as_deref()
            .and_then(|current| self.visible.next(current))
            .map(str::to_string);
        if next.is_some() {
            self.select(next)?;
        }
        Ok(())
    }

    fn navigate_prev(&mut self) -> Result<()> {
        let prev = self
            .selected
            .as_deref()
            .and_then(|current| self.visible.previous(current))
            .map(str::to_string);
        if prev.is_some() {
            self.select(prev)?;
        }
        Ok(())
    }

    /// Record a decision on the current file and move on.
    ///
    /// Failures are shown in the status bar; the session keeps running so the
    /// decision can be retried.
    fn decide(&mut self, decision: Decision) {
        if let Err(err) = self.try_decide(decision) {
            warn!("Decision failed: {:#}", err);
            self.status_message = Some((format!("Error: {:#}", err), Instant::now()));
        }
    }

    fn try_decide(&mut self, decision: Decision) -> Result<()> {
        let Some(path) = self.selected.clone() else {
            return Ok(());
        };

        // Next among the files on screen, before the list is re-sorted.
        let visible_next = self.visible.next(&path).map(str::to_string);

        let recorded_next = self
            .service
            .record_decision(&self.view, &path, decision)
            .with_context(|| format!("Failed to record decision for {}", path))?;
        let next = visible_next.unwrap_or(recorded_next);
        debug!(path = %path, %decision, next = %next, "Decision recorded from TUI");

        self.status_message = Some((format!("{} {}", decision, path), Instant::now()));
        self.refresh(Some(next))
    }

    fn toggle_filter(&mut self) -> Result<()> {
        self.filter = match self.filter {
            FilterMode::All => FilterMode::Unreviewed,
            FilterMode::Unreviewed => FilterMode::All,
        };
        self.rebuild_visible();

        let keep = self
            .selected
            .clone()
            .filter(|p| self.visible.position(p).is_some())
            .or_else(|| self.visible.first().map(str::to_string));
        if keep != self.selected {
            self.select(keep)?;
        }
        Ok(())
    }

    /// Handle keyboard input.
    fn handle_input(&mut self, key: event::KeyEvent) -> Result<()> {
        if self.show_help {
            // Any key closes help
            self.show_help = false;
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('?') => {
                self.show_help = true;
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = self.scroll_offset.saturating_add(10);
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_add(20);
            }
            KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_sub(20);
            }
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => self.navigate_next()?,
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => self.navigate_prev()?,
            KeyCode::Char('a') => self.decide(Decision::Approved),
            KeyCode::Char('x') => self.decide(Decision::Rejected),
            KeyCode::Char('s') => self.decide(Decision::Skipped),
            KeyCode::Char('u') => self.toggle_filter()?,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let expired = self
            .status_message
            .as_ref()
            .map(|(_, time)| time.elapsed() >= Duration::from_secs(3))
            .unwrap_or(false);
        if expired {
            self.status_message = None;
        }

        if self.show_help {
            self.render_help(frame);
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(3)])
            .split(frame.area());

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(chunks[0]);

        self.render_file_list(frame, main_chunks[0]);
        self.render_diff(frame, main_chunks[1]);
        self.render_status_bar(frame, chunks[1]);
    }

    fn render_file_list(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .visible
            .paths()
            .iter()
            .map(|path| {
                let (marker, style) = status_style(self.view.status_of(path));
                ListItem::new(format!("{} {}", marker, path)).style(style)
            })
            .collect();

        let title = match self.filter {
            FilterMode::All => format!("Files ({})", self.view.files.len()),
            FilterMode::Unreviewed => {
                format!("Unreviewed ({}/{})", self.visible.len(), self.view.files.len())
            }
        };

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));

        let mut state = ListState::default();
        state.select(self.selected.as_deref().and_then(|p| self.visible.position(p)));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_diff(&self, frame: &mut Frame, area: Rect) {
        let comparison = &self.view.comparison;
        let (title, text) = match &self.file {
            Some(file) => (
                format!(
                    "{} (+{}/-{}) [{}]",
                    file.path,
                    file.counts.additions,
                    file.counts.deletions,
                    file.status.as_str().to_uppercase()
                ),
                Text::from(self.diff_lines.clone()),
            ),
            None if self.view.no_diff => (
                "Diff".to_string(),
                Text::from(format!(
                    "No differences between {} and {}",
                    comparison.source_branch, comparison.target_branch
                )),
            ),
            None => ("Diff".to_string(), Text::from("No file selected")),
        };

        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .scroll((self.scroll_offset, 0));

        frame.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let progress = &self.view.progress;
        let comparison = &self.view.comparison;

        let text = match &self.status_message {
            Some((msg, _)) => Line::from(Span::styled(
                msg.clone(),
                Style::default().fg(Color::Yellow),
            )),
            None => Line::from(format!(
                "{} → {} | {}/{} reviewed (✓{} ✗{} -{} ~{}) | a=approve x=reject s=skip u=filter ?=help q=quit",
                comparison.source_branch,
                comparison.target_branch,
                progress.reviewed(),
                progress.total_files,
                progress.approved,
                progress.rejected,
                progress.skipped,
                progress.mixed,
            )),
        };

        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .wrap(Wrap { trim: false });

        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame) {
        let help_text = [
            "diffty - Keyboard Shortcuts",
            "",
            "Navigation:",
            "  j / Down / Tab       - Next file",
            "  k / Up / Shift+Tab   - Previous file",
            "  Ctrl+d / PgDn        - Scroll down",
            "  Ctrl+u / PgUp        - Scroll up",
            "",
            "Decisions (recorded, then next file):",
            "  a                    - Approve file",
            "  x                    - Reject file",
            "  s                    - Skip file",
            "",
            "Filters:",
            "  u                    - Toggle unreviewed only",
            "",
            "Other:",
            "  ?                    - Show this help",
            "  q / Esc              - Quit",
            "",
            "Press any key to close this help",
        ];

        let text = Text::from(help_text.iter().map(|&s| Line::from(s)).collect::<Vec<_>>());

        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });

        let area = centered_rect(60, 80, frame.area());
        frame.render_widget(paragraph, area);
    }
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Run the interactive review until the user quits.
pub fn run_tui<V: VcsProvider>(mut app: App<'_, V>) -> Result<()> {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;

    let result = (|| -> Result<()> {
        loop {
            terminal
                .draw(|f| app.render(f))
                .context("Failed to draw frame")?;

            if app.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(200)).context("Failed to poll events")?
                && let Event::Key(key) = event::read().context("Failed to read event")?
                && key.kind == event::KeyEventKind::Press
            {
                app.handle_input(key)?;
            }
        }
        Ok(())
    })();

    // Restore terminal in all cases
    restore_terminal(&mut terminal)?;

    result
}
