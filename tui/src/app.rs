//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - SearchClient for orchestration
//! - DisplayState for rendering
//!
//! The App:
//! 1. Converts terminal events to controller calls
//! 2. Polls the embedded controller so timeline events get applied
//! 3. Receives SearchMessages and updates DisplayState
//! 4. Renders the session snapshot

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};

use photo_search_core::{ProcessStep, StepStatus, SubmitOutcome};

use crate::display::{
    picture_panel_title, result_lines, step_marker, truncate_to_width, visible_pictures,
    DisplayState,
};
use crate::search_client::SearchClient;
use crate::theme::{
    ACCENT, DIM_GRAY, INPUT_TEXT, PICTURE_KIND, STEP_ACTIVE, STEP_COMPLETED,
    STEP_PENDING, SUCCESS_GREEN,
};

/// Input box height (lines), including borders
const INPUT_HEIGHT: u16 = 3;

/// Examples reachable through F1..F4
const EXAMPLE_KEYS: usize = 4;

/// Lines per picture card
const CARD_HEIGHT: u16 = 3;

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,
    /// Whether catalog and examples were loaded
    started: bool,

    // === Controller Integration ===
    /// Client for the embedded search controller
    client: SearchClient,
    /// Display state derived from SearchMessages
    display: DisplayState,

    // === Input State ===
    /// Query input buffer, mirrors the session query
    input_buffer: String,
    /// First picture card shown in the picture pane
    picture_scroll: usize,

    // === Misc State ===
    /// Terminal size
    size: (u16, u16),
}

impl App {
    /// Create a new App around a search client
    pub fn new(client: SearchClient) -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;
        Ok(Self {
            running: true,
            started: false,
            client,
            display: DisplayState::new(),
            input_buffer: String::new(),
            picture_scroll: 0,
            size,
        })
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~10 FPS is plenty for a timeline that moves every 1.2 s
        let frame_duration = Duration::from_millis(100);

        // Async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Render initial frame immediately so user sees UI
        terminal.draw(|frame| self.draw(frame))?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            // Only handle Press events (not Release or Repeat)
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key);
                            }
                            Event::Resize(w, h) => self.size = (w, h),
                            _ => {}
                        }
                    }
                }

                // Frame tick
                () = tokio::time::sleep(Duration::from_millis(16)) => {
                    if !self.started {
                        self.client.start().await;
                        self.started = true;
                    }
                }
            }

            // Apply timeline and network events
            self.client.poll();

            self.process_messages();
            self.request_images();

            terminal.draw(|frame| self.draw(frame))?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Process all pending messages and finished image fetches
    fn process_messages(&mut self) {
        for msg in self.client.recv_all() {
            self.display.apply_message(&msg);
        }
        for image in self.client.recv_images() {
            self.display.apply_image(image);
        }
    }

    /// Fetch images for the cards currently on screen
    fn request_images(&mut self) {
        let urls: Vec<String> = visible_pictures(self.client.session(), self.client.catalog())
            .iter()
            .skip(self.picture_scroll)
            .take(self.cards_per_page())
            .map(|p| p.url.clone())
            .collect();

        for url in urls {
            if self.client.request_image(&url) {
                self.display.image_requested(&url);
            }
        }
    }

    /// Handle keyboard input
    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Quit
            KeyCode::Esc => self.quit(),
            KeyCode::Char('c') if ctrl => self.quit(),

            // Start over
            KeyCode::Char('r') if ctrl => {
                self.client.reset();
                self.input_buffer.clear();
                self.picture_scroll = 0;
            }

            // Search
            KeyCode::Enter => {
                if let SubmitOutcome::Ignored(reason) = self.client.submit() {
                    tracing::debug!(%reason, "Submit ignored");
                } else {
                    self.picture_scroll = 0;
                }
            }

            // Examples
            KeyCode::F(n) if (1..=EXAMPLE_KEYS).contains(&usize::from(n)) => {
                if self.client.select_example(usize::from(n) - 1) {
                    self.input_buffer.clone_from(&self.client.session().query);
                }
            }

            // Typing (frozen while a search runs)
            KeyCode::Char(c) if !ctrl => {
                if !self.client.is_loading() {
                    self.input_buffer.push(c);
                    self.client.set_query(self.input_buffer.clone());
                }
            }
            KeyCode::Backspace => {
                if !self.client.is_loading() {
                    self.input_buffer.pop();
                    self.client.set_query(self.input_buffer.clone());
                }
            }

            // Picture scrolling
            KeyCode::PageDown => {
                let total =
                    visible_pictures(self.client.session(), self.client.catalog()).len();
                let max_scroll = total.saturating_sub(1);
                self.picture_scroll = (self.picture_scroll + self.cards_per_page()).min(max_scroll);
            }
            KeyCode::PageUp => {
                self.picture_scroll = self.picture_scroll.saturating_sub(self.cards_per_page());
            }

            _ => {}
        }
    }

    fn quit(&mut self) {
        self.client.request_quit();
        self.running = false;
    }

    /// Picture cards that fit in the picture pane
    fn cards_per_page(&self) -> usize {
        // Borders plus the status bar
        let inner = self.size.1.saturating_sub(3);
        usize::from((inner / CARD_HEIGHT).max(1))
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn draw(&self, frame: &mut Frame) {
        let [main, status] =
            Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).areas(frame.area());
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(main);

        let examples_height = self.client.examples().len().min(EXAMPLE_KEYS) as u16 + 2;
        let result_rows = result_lines(self.client.session()).len() as u16;
        let result_height = if result_rows == 0 { 0 } else { result_rows + 2 };
        let [input, examples, steps, result] = Layout::vertical([
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(examples_height),
            Constraint::Min(3),
            Constraint::Length(result_height),
        ])
        .areas(left);

        self.render_input(frame, input);
        self.render_examples(frame, examples);
        self.render_steps(frame, steps);
        self.render_result(frame, result);
        self.render_pictures(frame, right);
        self.render_status(frame, status);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let title = if self.client.is_loading() {
            " Query (searching...) "
        } else {
            " Query "
        };
        let width = area.width.saturating_sub(2) as usize;
        if width < 5 {
            return;
        }

        // Keep the tail of long queries visible
        let full_input = format!("> {}_", self.input_buffer);
        let wrapped = textwrap::wrap(&full_input, width);
        let visible = wrapped.last().map(ToString::to_string).unwrap_or_default();

        frame.render_widget(
            Paragraph::new(Line::styled(visible, Style::default().fg(INPUT_TEXT)))
                .block(
                    Block::bordered()
                        .title(title)
                        .border_style(Style::default().fg(ACCENT)),
                ),
            area,
        );
    }

    fn render_examples(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(8) as usize;
        let lines: Vec<Line> = self
            .client
            .examples()
            .iter()
            .take(EXAMPLE_KEYS)
            .enumerate()
            .map(|(i, example)| {
                Line::from(vec![
                    Span::styled(format!("F{} ", i + 1), Style::default().fg(ACCENT)),
                    Span::raw(truncate_to_width(example, width)),
                ])
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::bordered()
                    .title(" Examples ")
                    .border_style(Style::default().fg(DIM_GRAY)),
            ),
            area,
        );
    }

    fn render_steps(&self, frame: &mut Frame, area: Rect) {
        let session = self.client.session();
        let width = area.width.saturating_sub(6) as usize;

        let mut lines = Vec::new();
        for step in &session.steps {
            lines.extend(step_lines(step, width));
        }
        if lines.is_empty() && session.loading {
            lines.push(Line::styled(
                "Waiting for the analysis service...",
                Style::default().fg(DIM_GRAY),
            ));
        }

        let title = if session.steps.is_empty() {
            " Processing Steps ".to_string()
        } else {
            format!(
                " Processing Steps ({}/{}) ",
                session.completed_steps(),
                session.steps.len()
            )
        };
        frame.render_widget(
            Paragraph::new(lines).block(
                Block::bordered()
                    .title(title)
                    .border_style(Style::default().fg(ACCENT)),
            ),
            area,
        );
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(18) as usize;
        let lines: Vec<Line> = result_lines(self.client.session())
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(format!("{label:<14}"), Style::default().fg(DIM_GRAY)),
                    Span::raw(truncate_to_width(&value, width)),
                ])
            })
            .collect();
        if lines.is_empty() {
            return;
        }

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::bordered()
                    .title(" Result ")
                    .border_style(Style::default().fg(SUCCESS_GREEN)),
            ),
            area,
        );
    }

    fn render_pictures(&self, frame: &mut Frame, area: Rect) {
        let session = self.client.session();
        let pictures = visible_pictures(session, self.client.catalog());
        let width = area.width.saturating_sub(4) as usize;

        let mut lines = Vec::new();
        for picture in pictures
            .iter()
            .skip(self.picture_scroll)
            .take(self.cards_per_page())
        {
            let mut name = vec![Span::styled(
                truncate_to_width(&picture.name, width),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if let Some(marker) = self.display.image_marker(&picture.url) {
                name.push(Span::styled(format!("  {marker}"), Style::default().fg(DIM_GRAY)));
            }
            lines.push(Line::from(name));
            lines.push(Line::styled(
                format!("  {}", picture.kind),
                Style::default().fg(PICTURE_KIND),
            ));
            lines.push(Line::styled(
                format!("  {}", truncate_to_width(&picture.tag_line(), width.saturating_sub(2))),
                Style::default().fg(DIM_GRAY),
            ));
        }

        frame.render_widget(
            Paragraph::new(lines).block(
                Block::bordered()
                    .title(format!(" {} ", picture_panel_title(session)))
                    .border_style(Style::default().fg(ACCENT)),
            ),
            area,
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let pictures = self
            .display
            .catalog_count
            .map_or_else(String::new, |n| format!(" | {n} pictures"));
        let last = self
            .display
            .activity
            .back()
            .map_or_else(String::new, |line| format!(" | {line}"));
        let status = format!(
            " {}{} | Enter search | F1-F4 examples | Ctrl-R reset | Esc quit{}",
            self.display.status.description(),
            pictures,
            last,
        );
        let status = truncate_to_width(&status, area.width as usize);
        frame.render_widget(
            Paragraph::new(Line::styled(status, Style::default().fg(DIM_GRAY))),
            area,
        );
    }
}

/// Timeline lines for one step: marker and label, then input/output once
/// the step has started
fn step_lines(step: &ProcessStep, width: usize) -> Vec<Line<'static>> {
    let color = match step.status {
        StepStatus::Pending => STEP_PENDING,
        StepStatus::Active => STEP_ACTIVE,
        StepStatus::Completed => STEP_COMPLETED,
    };
    let mut style = Style::default().fg(color);
    if step.status == StepStatus::Active {
        style = style.add_modifier(Modifier::BOLD);
    }

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:>2} ", step_marker(step)), style),
        Span::styled(truncate_to_width(&step.text, width), style),
    ])];
    if step.status == StepStatus::Pending {
        return lines;
    }

    let detail = width.saturating_sub(5);
    if let Some(ref input) = step.input {
        lines.push(Line::from(vec![
            Span::styled("   in  ", Style::default().fg(DIM_GRAY)),
            Span::raw(truncate_to_width(input, detail)),
        ]));
    }
    if let Some(ref output) = step.output {
        lines.push(Line::from(vec![
            Span::styled("   out ", Style::default().fg(DIM_GRAY)),
            Span::styled(
                truncate_to_width(output, detail),
                Style::default().fg(INPUT_TEXT),
            ),
        ]));
    }
    lines
}
