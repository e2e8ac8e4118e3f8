//! # Interactive Terminal Dashboard
//!
//! A sidebar single-select of the six pages, the active page's view on the
//! right, and for the live prediction page a form pane driven from the
//! keyboard. The artifact cache lives in the [`App`] and survives page
//! switches; `r` clears it. `n` moves the section cursor and `o` opens or
//! closes the selected section alone.

use crate::cache::ArtifactCache;
use crate::config::DashboardConfig;
use crate::defaults::FeatureDefaults;
use crate::pages::view::{Block as PageBlock, Chart as PageChart, Tone};
use crate::pages::{Interaction, Page, PageContext, PageView};
use crate::render::text::{expander_header, leaf_lines};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::prelude::*;
use ratatui::symbols;
use ratatui::widgets::{
    Axis, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph,
    Row, Table, Wrap,
};
use std::io;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Form,
}

pub struct App {
    config: DashboardConfig,
    defaults: FeatureDefaults,
    cache: ArtifactCache,
    pub interaction: Interaction,
    page: usize,
    pub focus: Focus,
    scroll: u16,
    section: usize,
    view: PageView,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: DashboardConfig, defaults: FeatureDefaults) -> Self {
        let mut app = Self {
            config,
            defaults,
            cache: ArtifactCache::new(),
            interaction: Interaction::default(),
            page: 0,
            focus: Focus::Sidebar,
            scroll: 0,
            section: 0,
            view: PageView::default(),
            should_quit: false,
        };
        app.refresh();
        app
    }

    pub fn page(&self) -> Page {
        Page::ALL[self.page]
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Label of the section under the cursor, if the page has any.
    pub fn selected_section(&self) -> Option<&str> {
        self.view.section_labels().get(self.section).copied()
    }

    /// Re-renders the active page. The predict request is consumed.
    pub fn refresh(&mut self) {
        let page = self.page();
        let mut ctx = PageContext {
            config: &self.config,
            cache: &mut self.cache,
            defaults: &self.defaults,
        };
        self.view = page.render(&mut ctx, &self.interaction);
        self.interaction.predict_requested = false;
        let sections = self.view.section_labels().len();
        if self.section >= sections {
            self.section = sections.saturating_sub(1);
        }
    }

    fn next_section(&mut self) {
        let sections = self.view.section_labels().len();
        if sections > 0 {
            self.section = (self.section + 1) % sections;
        }
    }

    fn toggle_selected_section(&mut self) {
        if let Some(label) = self.selected_section().map(str::to_string) {
            self.interaction.toggle_section(&label);
            self.refresh();
        }
    }

    fn select_page(&mut self, index: usize) {
        self.page = index % Page::ALL.len();
        self.scroll = 0;
        self.section = 0;
        if self.page() != Page::Live {
            self.focus = Focus::Sidebar;
        }
        self.refresh();
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab if self.page() == Page::Live => {
                self.focus = match self.focus {
                    Focus::Sidebar => Focus::Form,
                    Focus::Form => Focus::Sidebar,
                };
            }
            KeyCode::Down => match self.focus {
                Focus::Sidebar => self.select_page(self.page + 1),
                Focus::Form => self.interaction.live_inputs.select_next(),
            },
            KeyCode::Up => match self.focus {
                Focus::Sidebar => self.select_page(self.page + Page::ALL.len() - 1),
                Focus::Form => self.interaction.live_inputs.select_previous(),
            },
            KeyCode::Left | KeyCode::Right if self.focus == Focus::Form => {
                let steps = if code == KeyCode::Left { -1 } else { 1 };
                self.interaction.live_inputs.step_selected(steps);
                self.refresh();
            }
            KeyCode::Enter | KeyCode::Char('p') if self.page() == Page::Live => {
                self.interaction.predict_requested = true;
                self.refresh();
            }
            KeyCode::Char('s') => {
                self.interaction.show_inputs = !self.interaction.show_inputs;
                self.refresh();
            }
            KeyCode::Char('n') => self.next_section(),
            KeyCode::Char('o') => self.toggle_selected_section(),
            KeyCode::Char('e') => {
                self.interaction.expand_all = !self.interaction.expand_all;
                self.refresh();
            }
            KeyCode::Char('r') => {
                self.cache.clear();
                self.refresh();
            }
            KeyCode::Char(digit @ '1'..='6') => {
                self.select_page(digit as usize - '1' as usize);
            }
            KeyCode::PageDown | KeyCode::Char('j') => self.scroll = self.scroll.saturating_add(5),
            KeyCode::PageUp | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(5),
            _ => {}
        }
    }
}

/// Runs the dashboard until the user quits, restoring the terminal after.
pub fn run(config: DashboardConfig, defaults: FeatureDefaults) -> io::Result<()> {
    with_restore(enable_raw_mode, disable_raw_mode, || {
        with_restore(
            || {
                let mut stdout = io::stdout();
                execute!(stdout, EnterAlternateScreen)
            },
            || {
                let mut stdout = io::stdout();
                execute!(stdout, LeaveAlternateScreen)
            },
            || {
                let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
                let mut app = App::new(config, defaults);
                let result = run_app(&mut terminal, &mut app);
                terminal.show_cursor()?;
                result
            },
        )
    })
}

/// Runs `body` between `enter` and `leave`. `leave` runs whenever `enter`
/// succeeded, even if `body` failed; the first error wins.
fn with_restore<T>(
    enter: impl FnOnce() -> io::Result<()>,
    leave: impl FnOnce() -> io::Result<()>,
    body: impl FnOnce() -> io::Result<T>,
) -> io::Result<T> {
    enter()?;
    let result = body();
    let restored = leave();
    let value = result?;
    restored?;
    Ok(value)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    while !app.should_quit {
        terminal.draw(|f| draw(f, app))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }
    Ok(())
}

pub fn draw(f: &mut Frame<'_>, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
        .split(rows[0]);

    draw_sidebar(f, columns[0], app);

    let mut main = columns[1];
    if app.page() == Page::Live {
        let form_height = app.interaction.live_inputs.controls().len() as u16 + 3;
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(form_height), Constraint::Min(0)])
            .split(main);
        draw_form(f, parts[0], app);
        main = parts[1];
    }

    let scatter = app
        .view
        .charts()
        .into_iter()
        .find(|c| matches!(c, PageChart::Scatter { .. }));
    match scatter {
        Some(chart) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(main);
            draw_body(f, parts[0], app);
            draw_scatter(f, parts[1], chart);
        }
        None => draw_body(f, main, app),
    }

    let help = match app.focus {
        Focus::Sidebar => {
            "Up/Down page  1-6 jump  Tab form  n/o section  e expand all  s inputs  r reload  \
             j/k scroll  q quit"
        }
        Focus::Form => {
            "Up/Down field  Left/Right adjust  Enter predict  Tab sidebar  n/o section  s inputs  \
             q quit"
        }
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );
}

/// Wide enough for the highlight symbol and the longest page title inside
/// the borders.
const SIDEBAR_WIDTH: u16 = 38;
const HIGHLIGHT_SYMBOL: &str = ">> ";

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn draw_sidebar(f: &mut Frame<'_>, area: Rect, app: &App) {
    let items: Vec<ListItem> = Page::ALL.iter().map(|p| ListItem::new(p.title())).collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(app.config.app_name.as_str())
                .borders(Borders::ALL)
                .border_style(focus_style(app.focus == Focus::Sidebar)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(HIGHLIGHT_SYMBOL);
    let mut state = ListState::default().with_selected(Some(app.page));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_form(f: &mut Frame<'_>, area: Rect, app: &App) {
    let inputs = &app.interaction.live_inputs;
    let rows: Vec<Row> = inputs
        .controls()
        .iter()
        .enumerate()
        .map(|(i, control)| {
            let style = if app.focus == Focus::Form && i == inputs.selected() {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(control.feature),
                Cell::from(crate::data::format_number(control.value())),
                Cell::from(control.allowed()),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["Feature", "Value", "Allowed"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(
        Block::default()
            .title("Enter House Details")
            .borders(Borders::ALL)
            .border_style(focus_style(app.focus == Focus::Form)),
    );
    f.render_widget(table, area);
}

fn tone_style(tone: Tone) -> Style {
    let colour = match tone {
        Tone::Info => Color::Blue,
        Tone::Success => Color::Green,
        Tone::Warning => Color::Yellow,
        Tone::Error => Color::Red,
    };
    Style::default().fg(colour)
}

fn styled_lines(
    blocks: &[PageBlock],
    indent: usize,
    selected: Option<&str>,
    out: &mut Vec<Line<'static>>,
) {
    let pad = " ".repeat(indent);
    for block in blocks {
        let style = match block {
            PageBlock::Heading { .. } => Style::default().add_modifier(Modifier::BOLD),
            PageBlock::Callout { tone, .. } => tone_style(*tone),
            PageBlock::Separator => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        match block {
            PageBlock::Expander { label, open, blocks } => {
                let header = Style::default().fg(Color::Magenta);
                let header = if selected == Some(label.as_str()) {
                    header.add_modifier(Modifier::REVERSED)
                } else {
                    header
                };
                out.push(Line::styled(
                    format!("{pad}{}", expander_header(label, *open)),
                    header,
                ));
                if *open {
                    styled_lines(blocks, indent + 4, selected, out);
                }
            }
            leaf => {
                for line in leaf_lines(leaf) {
                    out.push(Line::styled(format!("{pad}{line}"), style));
                }
            }
        }
        out.push(Line::default());
    }
}

fn draw_body(f: &mut Frame<'_>, area: Rect, app: &App) {
    let mut lines = Vec::new();
    styled_lines(&app.view.blocks, 0, app.selected_section(), &mut lines);
    let body = Paragraph::new(lines)
        .block(
            Block::default()
                .title(app.view.title.as_str())
                .borders(Borders::ALL),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(body, area);
}

fn bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (low, high) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if low > high {
        [0.0, 1.0]
    } else if low == high {
        [low - 1.0, high + 1.0]
    } else {
        [low, high]
    }
}

fn draw_scatter(f: &mut Frame<'_>, area: Rect, chart: &PageChart) {
    let PageChart::Scatter {
        title,
        x_label,
        y_label,
        points,
        reference,
        annotation,
    } = chart
    else {
        return;
    };
    let reference_points: Vec<(f64, f64)> = reference
        .iter()
        .flat_map(|line| [line.from, line.to])
        .collect();
    let x_bounds = bounds(points.iter().chain(&reference_points).map(|p| p.0));
    let y_bounds = bounds(points.iter().chain(&reference_points).map(|p| p.1));

    let mut datasets = vec![
        Dataset::default()
            .name(annotation.clone().unwrap_or_default())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::Cyan))
            .data(points),
    ];
    if !reference_points.is_empty() {
        datasets.push(
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Red))
                .data(&reference_points),
        );
    }

    let axis_labels = |b: [f64; 2]| {
        vec![
            Line::from(crate::data::format_number(b[0])),
            Line::from(crate::data::format_number(b[1])),
        ]
    };
    let widget = Chart::new(datasets)
        .block(Block::default().title(title.as_str()).borders(Borders::ALL))
        .x_axis(
            Axis::default()
                .title(x_label.as_str())
                .bounds(x_bounds)
                .labels(axis_labels(x_bounds)),
        )
        .y_axis(
            Axis::default()
                .title(y_label.as_str())
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        );
    f.render_widget(widget, area);
}
