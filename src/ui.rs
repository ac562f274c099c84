use std::io::{self, Stdout};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tracing::{info, warn};
use unicode_width::UnicodeWidthStr;

use crate::browser::{Action, Input, Menu, MenuView};
use crate::crawler::{CrawlStats, Crawler};
use crate::results::ResultSet;
use crate::viewer::Viewer;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

pub const TOO_MANY_RESULTS: &str = "Too many results to display!";
const TOO_MANY_HINT: &str = "Increase the window size and/or zoom out.";
const LOADING: &str = "Loading...";
const FOOTER: &str = "↑/↓ move · →/Enter open · ← back · u refresh · q quit";

pub fn input_for(key: KeyEvent) -> Option<Input> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Input::Exit);
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Input::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Input::Down),
        KeyCode::Right | KeyCode::Enter | KeyCode::Char('l') => Some(Input::Select),
        KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => Some(Input::Back),
        KeyCode::Char('u') | KeyCode::Char('r') => Some(Input::Refresh),
        KeyCode::Char('q') | KeyCode::Esc => Some(Input::Exit),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Status {
    Info(String),
    Error(String),
}

impl Status {
    fn text(&self) -> &str {
        match self {
            Status::Info(text) | Status::Error(text) => text,
        }
    }
}

pub struct Options {
    pub crawler: Crawler,
    pub viewer: Box<dyn Viewer>,
}

pub struct Model {
    crawler: Crawler,
    viewer: Box<dyn Viewer>,
    results: ResultSet,
    menu: Menu,
    status: Status,
    swept: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let results = ResultSet::empty(opts.crawler.terms());
        Self {
            crawler: opts.crawler,
            viewer: opts.viewer,
            results,
            menu: Menu::new(),
            status: Status::Info(LOADING.to_string()),
            swept: false,
        }
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        self.refresh_with_loading(terminal)?;

        while !self.menu.is_exited() {
            terminal.draw(|frame| self.draw(frame))?;

            let Some(input) = (match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => input_for(key),
                _ => None,
            }) else {
                continue;
            };

            match self.menu.handle(input, &self.results) {
                Action::Refresh => self.refresh_with_loading(terminal)?,
                action => self.apply(action),
            }
        }

        Ok(())
    }

    fn refresh_with_loading<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|frame| self.draw_loading(frame))?;
        self.refresh();
        Ok(())
    }

    /// Feeds one input through the menu and carries out the resulting
    /// action. Refreshes run the sweep synchronously.
    pub fn handle_input(&mut self, input: Input) {
        let action = self.menu.handle(input, &self.results);
        self.apply(action);
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::None => {}
            Action::Refresh => self.refresh(),
            Action::Open(url) => self.open(&url),
            Action::Quit => info!("leaving browser"),
        }
    }

    fn open(&mut self, url: &str) {
        match self.viewer.open(url) {
            Ok(()) => {
                info!(url, "opened thread");
                self.status = Status::Info(format!("Opened {url}"));
            }
            Err(err) => {
                warn!(url, error = %err, "failed to open thread");
                self.status = Status::Error(format!("Failed to open {url}: {err}"));
            }
        }
    }

    /// Runs a sweep and swaps in its results. A failed sweep keeps whatever
    /// the previous successful one produced and reports the failure.
    pub fn refresh(&mut self) {
        match self.crawler.crawl() {
            Ok(sweep) => {
                self.results = sweep.results;
                self.status = Status::Info(sweep_summary(&self.results, &sweep.stats));
                self.swept = true;
            }
            Err(err) => {
                let kept = if self.swept {
                    "Showing results of the previous sweep."
                } else {
                    "No results yet."
                };
                self.status = Status::Error(format!("{err}. {kept} Press u to retry."));
            }
        }
        self.menu.reconcile(&self.results);
    }

    pub fn draw(&self, frame: &mut Frame<'_>) {
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

        let status_style = match self.status {
            Status::Info(_) => Style::default().fg(COLOR_SUCCESS),
            Status::Error(_) => Style::default().fg(COLOR_ERROR),
        };
        let status_line = Paragraph::new(self.status.text().to_string()).style(
            status_style
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let view = self.menu.view(&self.results);
        let block = Block::default()
            .title(Span::styled(
                view.title.clone(),
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_alignment(Alignment::Center)
            .borders(Borders::TOP)
            .border_style(Style::default().fg(COLOR_PANEL_FOCUSED_BG));
        let inner = block.inner(layout[1]);
        frame.render_widget(block, layout[1]);
        frame.render_widget(menu_paragraph(&view, inner), inner);

        let footer = Paragraph::new(FOOTER)
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);
    }

    fn draw_loading(&self, frame: &mut Frame<'_>) {
        let area = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), area);
        let boards: Vec<String> = self
            .crawler
            .plan()
            .boards
            .iter()
            .map(|board| format!("/{board}/"))
            .collect();
        let lines = vec![
            Line::from(Span::styled(
                LOADING,
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                boards.join(" "),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];
        frame.render_widget(centered(lines, area), area);
    }
}

fn sweep_summary(results: &ResultSet, stats: &CrawlStats) -> String {
    format!(
        "{} matches ({} mentions) across {} threads ({} pages, {} skipped) in {:.1}s",
        results.total_entries(),
        results.total_occurrences(),
        stats.threads_scanned,
        stats.pages_fetched,
        stats.pages_skipped + stats.threads_skipped,
        stats.elapsed.as_secs_f64()
    )
}

/// Rows centered in `area`, or a notice when they do not fit.
fn menu_paragraph(view: &MenuView, area: Rect) -> Paragraph<'static> {
    let labels: Vec<String> = view.rows.iter().map(|row| row.label()).collect();
    let fits = labels.len() <= area.height as usize
        && labels
            .iter()
            .all(|label| UnicodeWidthStr::width(label.as_str()) <= area.width as usize);

    if !fits {
        let notice = vec![
            Line::from(Span::styled(
                TOO_MANY_RESULTS,
                Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                TOO_MANY_HINT,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ];
        return Paragraph::new(Text::from(notice)).wrap(Wrap { trim: true });
    }

    let lines: Vec<Line<'static>> = labels
        .into_iter()
        .enumerate()
        .map(|(index, label)| {
            let style = if index == view.selected {
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::REVERSED | Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_PRIMARY)
            };
            Line::from(Span::styled(label, style))
        })
        .collect();
    centered(lines, area)
}

fn centered(lines: Vec<Line<'static>>, area: Rect) -> Paragraph<'static> {
    let top = (area.height as usize).saturating_sub(lines.len()) / 2;
    let mut padded = vec![Line::default(); top];
    padded.extend(lines);
    Paragraph::new(Text::from(padded)).alignment(Alignment::Center)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use ratatui::backend::TestBackend;

    use super::*;
    use crate::board::{Board, Site};
    use crate::browser::{MenuState, TopCursor};
    use crate::crawler::CrawlPlan;
    use crate::fetch::MapFetcher;
    use crate::scan::Term;

    const BASE: &str = "http://boards.test";

    #[derive(Default, Clone)]
    struct RecordingViewer {
        opened: Arc<Mutex<Vec<String>>>,
    }

    impl Viewer for RecordingViewer {
        fn open(&self, url: &str) -> Result<()> {
            self.opened.lock().push(url.to_string());
            Ok(())
        }
    }

    fn model(fetcher: MapFetcher, viewer: RecordingViewer) -> Model {
        let plan = CrawlPlan {
            site: Site::new(BASE).unwrap(),
            boards: vec![Board::new("x")],
            terms: vec![Term::new("Foo"), Term::new("Bar")],
            pages: 1,
            workers: 2,
        };
        Model::new(Options {
            crawler: Crawler::new(Arc::new(fetcher), plan),
            viewer: Box::new(viewer),
        })
    }

    fn sample_fetcher() -> MapFetcher {
        MapFetcher::new()
            .with_page(format!("{BASE}/x"), r#"<div id="t10"></div><div id="t11"></div>"#)
            .with_page(format!("{BASE}/x/thread/10"), "Foo foo")
            .with_page(format!("{BASE}/x/thread/11"), "foo")
    }

    fn screen(model: &Model, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_keys_to_inputs() {
        assert_eq!(input_for(key(KeyCode::Up)), Some(Input::Up));
        assert_eq!(input_for(key(KeyCode::Char('j'))), Some(Input::Down));
        assert_eq!(input_for(key(KeyCode::Right)), Some(Input::Select));
        assert_eq!(input_for(key(KeyCode::Enter)), Some(Input::Select));
        assert_eq!(input_for(key(KeyCode::Left)), Some(Input::Back));
        assert_eq!(input_for(key(KeyCode::Char('u'))), Some(Input::Refresh));
        assert_eq!(input_for(key(KeyCode::Char('q'))), Some(Input::Exit));
        assert_eq!(
            input_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Input::Exit)
        );
        assert_eq!(input_for(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn browse_and_open_a_thread() {
        let viewer = RecordingViewer::default();
        let mut model = model(sample_fetcher(), viewer.clone());
        model.refresh();
        model.handle_input(Input::Select);
        model.handle_input(Input::Down);
        model.handle_input(Input::Select);
        assert_eq!(
            viewer.opened.lock().as_slice(),
            &["http://boards.test/x/thread/11".to_string()]
        );
        assert_eq!(model.menu().state(), MenuState::Drill { term: 0, index: 1 });
    }

    #[test]
    fn failed_refresh_keeps_previous_results() {
        let mut model = model(
            MapFetcher::new().with_unreachable(format!("{BASE}/x")),
            RecordingViewer::default(),
        );
        model.refresh();
        assert_eq!(model.results().len(), 2);
        assert_eq!(model.results().total_entries(), 0);
        let lines = screen(&model, 160, 10);
        assert!(lines[0].contains("sweep aborted"), "status was {:?}", lines[0]);
        assert!(lines[0].contains("Press u to retry"));
    }

    #[test]
    fn renders_rows_with_counts() {
        let mut model = model(sample_fetcher(), RecordingViewer::default());
        model.refresh();
        let lines = screen(&model, 60, 10);
        let body = lines.join("\n");
        assert!(body.contains("2 | Foo"));
        assert!(body.contains("0 | Bar"));
        assert!(body.contains("Exit"));
        assert_eq!(model.menu().state(), MenuState::TopMenu(TopCursor::Term(0)));
    }

    #[test]
    fn titles_the_menu_pane() {
        let mut model = model(sample_fetcher(), RecordingViewer::default());
        assert!(screen(&model, 60, 10)[0].contains(LOADING));

        model.refresh();
        let lines = screen(&model, 60, 10);
        assert!(lines[1].contains("Search terms"), "title row was {:?}", lines[1]);
        assert!(lines[0].contains("2 matches (3 mentions)"), "status was {:?}", lines[0]);

        model.handle_input(Input::Select);
        let lines = screen(&model, 60, 10);
        assert!(lines[1].contains("Threads mentioning \"Foo\""));
    }

    #[test]
    fn shows_notice_when_rows_do_not_fit() {
        let mut model = model(sample_fetcher(), RecordingViewer::default());
        model.refresh();
        let lines = screen(&model, 60, 4);
        assert!(lines.join("\n").contains(TOO_MANY_RESULTS));

        model.handle_input(Input::Select);
        let narrow = screen(&model, 20, 10);
        assert!(narrow.join("").contains("Too many"));
    }
}
