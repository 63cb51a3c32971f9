use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;
use vahan_insights::insights::format_thousands;
use vahan_insights::{
    compute_quarterly_growth, Category, DashboardSummary, Growth, QuarterlyAggregate,
    RecordFilter, RegistrationRecord,
};

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    QuarterlyGrowth,
    Manufacturers,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::QuarterlyGrowth,
            Page::QuarterlyGrowth => Page::Manufacturers,
            Page::Manufacturers => Page::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Overview => Page::Manufacturers,
            Page::QuarterlyGrowth => Page::Overview,
            Page::Manufacturers => Page::QuarterlyGrowth,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::QuarterlyGrowth => "Quarterly Growth",
            Page::Manufacturers => "Manufacturers",
        }
    }
}

/// Session state. The record table never changes; everything else is
/// recomputed from it whenever the filter changes.
pub struct App {
    records: Vec<RegistrationRecord>,
    pub source: String,
    pub filter: RecordFilter,
    pub aggregates: Vec<QuarterlyAggregate>,
    pub summary: DashboardSummary,
    pub state: TableState,
    pub current_page: Page,
}

impl App {
    pub fn new(records: Vec<RegistrationRecord>, source: String) -> Self {
        let filter = RecordFilter::all();
        let summary = DashboardSummary::build(&records, &filter);

        let mut app = Self {
            records,
            source,
            filter,
            aggregates: Vec::new(),
            summary,
            state: TableState::default(),
            current_page: Page::Overview,
        };
        app.recompute();
        app
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Rebuild aggregates and summary for the current filter
    fn recompute(&mut self) {
        let mut aggregates = compute_quarterly_growth(&self.records, &self.filter);
        // Newest quarter first
        aggregates.sort_by(|a, b| {
            b.quarter
                .cmp(&a.quarter)
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.manufacturer.cmp(&b.manufacturer))
        });
        self.aggregates = aggregates;
        self.summary = DashboardSummary::build(&self.records, &self.filter);

        if self.aggregates.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn is_category_selected(&self, category: Category) -> bool {
        self.filter
            .categories
            .as_ref()
            .map_or(true, |set| set.contains(&category))
    }

    pub fn toggle_category(&mut self, category: Category) {
        let mut selected: BTreeSet<Category> = self
            .filter
            .categories
            .clone()
            .unwrap_or_else(|| Category::ALL.into_iter().collect());

        if !selected.remove(&category) {
            selected.insert(category);
        }

        self.filter.categories = if selected.len() == Category::ALL.len() {
            None
        } else {
            Some(selected)
        };
        self.recompute();
    }

    pub fn select_all_categories(&mut self) {
        self.filter.categories = None;
        self.recompute();
    }

    pub fn clear_filter(&mut self) {
        self.filter = RecordFilter::all();
        self.recompute();
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn selected_aggregate(&self) -> Option<&QuarterlyAggregate> {
        self.state.selected().and_then(|i| self.aggregates.get(i))
    }

    pub fn next(&mut self) {
        let len = self.aggregates.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.aggregates.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.aggregates.len();
        if len == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map_or(0, |i| (i + PAGE_STEP).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.aggregates.is_empty() {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_STEP));
        self.state.select(Some(i));
    }

    pub fn first(&mut self) {
        if !self.aggregates.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        if !self.aggregates.is_empty() {
            self.state.select(Some(self.aggregates.len() - 1));
        }
    }

    fn category_filter_label(&self) -> String {
        match &self.filter.categories {
            None => "All categories".to_string(),
            Some(set) if set.is_empty() => "No categories".to_string(),
            Some(set) => set.iter().map(|c| c.code()).collect::<Vec<_>>().join(" + "),
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char('1') => app.toggle_category(Category::TwoWheeler),
                KeyCode::Char('2') => app.toggle_category(Category::ThreeWheeler),
                KeyCode::Char('3') => app.toggle_category(Category::FourWheeler),
                KeyCode::Char('a') => app.select_all_categories(),
                KeyCode::Char('c') => app.clear_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.summary.is_empty() {
        render_empty_state(f, chunks[1]);
    } else {
        match app.current_page {
            Page::Overview => render_overview(f, chunks[1], app),
            Page::QuarterlyGrowth => render_growth_table(f, chunks[1], app),
            Page::Manufacturers => render_manufacturers(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn growth_style(growth: &Growth) -> Style {
    if !growth.is_available() {
        return Style::default().fg(Color::DarkGray);
    }
    let percent = growth.percent().unwrap_or_default();
    if percent > 0.0 {
        Style::default().fg(Color::Green)
    } else if percent < 0.0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::White)
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::TwoWheeler => Color::Cyan,
        Category::ThreeWheeler => Color::Yellow,
        Category::FourWheeler => Color::Magenta,
    }
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Overview, Page::QuarterlyGrowth, Page::Manufacturers];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    for category in Category::ALL {
        let style = if app.is_category_selected(category) {
            Style::default()
                .fg(category_color(category))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        tab_spans.push(Span::styled(format!("[{}] ", category.code()), style));
    }

    tab_spans.push(Span::raw(" |  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", format_thousands(app.summary.total_registrations)),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Vahan Vehicle Registration Analytics "),
    );

    f.render_widget(header, area);
}

fn render_empty_state(f: &mut Frame, area: Rect) {
    let message = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "  No data available for the selected filters.",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  Press 1/2/3 to toggle categories, a for all, c to clear.",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Empty "));

    f.render_widget(message, area);
}

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),
            Constraint::Length(7),
            Constraint::Min(0),
        ])
        .split(area);

    let summary = &app.summary;
    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let kpis = vec![
        Line::from(vec![
            Span::styled("  Total Registrations:      ", label),
            Span::raw(format_thousands(summary.total_registrations)),
        ]),
        Line::from(vec![
            Span::styled("  Avg Monthly Registrations: ", label),
            Span::raw(format_thousands(summary.avg_monthly_registrations.round() as u64)),
        ]),
        Line::from(vec![
            Span::styled("  Top Vehicle Category:     ", label),
            Span::raw(summary.top_category.map_or("-", |c| c.label())),
        ]),
        Line::from(vec![
            Span::styled("  Top Manufacturer:         ", label),
            Span::raw(summary.top_manufacturer.clone().unwrap_or_else(|| "-".to_string())),
        ]),
    ];

    f.render_widget(
        Paragraph::new(kpis).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Key Performance Indicators "),
        ),
        rows[0],
    );

    let growth_rows = summary.latest_category_growth.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.series.clone()),
            Cell::from(row.quarter.to_string()),
            Cell::from(format_thousands(row.total)),
            Cell::from(row.yoy_growth.to_string()).style(growth_style(&row.yoy_growth)),
            Cell::from(row.qoq_growth.to_string()).style(growth_style(&row.qoq_growth)),
        ])
    });

    let growth_table = Table::new(
        growth_rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Category", "Quarter", "Registrations", "YoY", "QoQ"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Latest Growth by Category "),
    );

    f.render_widget(growth_table, rows[1]);

    let insights: Vec<Line> = summary
        .insights
        .iter()
        .map(|insight| Line::from(format!("  • {}", insight)))
        .collect();

    f.render_widget(
        Paragraph::new(insights)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Key Investment Insights "),
            ),
        rows[2],
    );
}

fn render_growth_table(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.aggregates.iter().map(|agg| {
        let quarter = if agg.is_partial() {
            format!("{}*", agg.quarter)
        } else {
            agg.quarter.to_string()
        };

        Row::new(vec![
            Cell::from(quarter),
            Cell::from(agg.category.code()).style(Style::default().fg(category_color(agg.category))),
            Cell::from(truncate(&agg.manufacturer, 20)),
            Cell::from(format_thousands(agg.total)),
            Cell::from(agg.qoq_growth.to_string()).style(growth_style(&agg.qoq_growth)),
            Cell::from(agg.yoy_growth.to_string()).style(growth_style(&agg.yoy_growth)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(6),
            Constraint::Length(22),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Quarter", "Cat", "Manufacturer", "Registrations", "QoQ", "YoY"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Quarterly Growth (* = partial quarter) "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_manufacturers(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let labels: Vec<String> = app
        .summary
        .top_manufacturers
        .iter()
        .map(|r| truncate(&r.name, 14))
        .collect();
    let bars: Vec<(&str, u64)> = labels
        .iter()
        .zip(&app.summary.top_manufacturers)
        .map(|(label, ranked)| (label.as_str(), ranked.total))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Top 10 Manufacturers by Registrations "),
        )
        .direction(Direction::Horizontal)
        .data(bars.as_slice())
        .bar_width(1)
        .bar_gap(0)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    f.render_widget(chart, columns[0]);

    let matrix_rows = app.summary.growth_matrix.iter().map(|point| {
        Row::new(vec![
            Cell::from(truncate(&point.manufacturer, 16)),
            Cell::from(format_thousands(point.total)),
            Cell::from(point.yoy_growth.to_string()).style(growth_style(&point.yoy_growth)),
            Cell::from(point.qoq_growth.to_string()).style(growth_style(&point.qoq_growth)),
        ])
    });

    let matrix = Table::new(
        matrix_rows,
        [
            Constraint::Length(18),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header_row(&["Manufacturer", "Registrations", "YoY", "QoQ"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Growth Matrix: YoY vs QoQ (Top 5) "),
    );

    f.render_widget(matrix, columns[1]);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.aggregates.len();

    let mut status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, total),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("Filter: {}", app.category_filter_label()),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("Source: {} ({} rows)", app.source, app.record_count()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    if let Some(agg) = app.selected_aggregate() {
        if app.current_page == Page::QuarterlyGrowth {
            status_spans.push(Span::raw(" | "));
            status_spans.push(Span::styled(
                format!("{} {} {}", agg.manufacturer, agg.category.code(), agg.quarter),
                Style::default().fg(Color::White),
            ));
        }
    }

    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("1/2/3", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Category | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Clear | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vahan_insights::{GeneratorConfig, SampleDataGenerator, YearMonth};

    fn app() -> App {
        let records = SampleDataGenerator::new(GeneratorConfig {
            years: 2,
            end: YearMonth::new(2024, 12).unwrap(),
            seed: Some(6),
        })
        .generate();
        App::new(records, "test".to_string())
    }

    #[test]
    fn test_starts_unfiltered_with_newest_quarter_first() {
        let app = app();
        assert_eq!(app.aggregates.len(), 8 * 15);
        assert_eq!(app.aggregates[0].quarter.to_string(), "2024-Q4");
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_toggle_category_recomputes() {
        let mut app = app();

        app.toggle_category(Category::TwoWheeler);
        assert!(!app.is_category_selected(Category::TwoWheeler));
        assert_eq!(app.aggregates.len(), 8 * 10);
        assert!(app.aggregates.iter().all(|a| a.category != Category::TwoWheeler));

        app.toggle_category(Category::TwoWheeler);
        assert!(app.filter.categories.is_none());
        assert_eq!(app.aggregates.len(), 8 * 15);
    }

    #[test]
    fn test_deselecting_everything_shows_empty_state() {
        let mut app = app();
        for category in Category::ALL {
            app.toggle_category(category);
        }
        assert!(app.aggregates.is_empty());
        assert!(app.summary.is_empty());
        assert_eq!(app.state.selected(), None);

        app.clear_filter();
        assert!(!app.aggregates.is_empty());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(app.aggregates.len() - 1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(PAGE_STEP));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Overview.next().next().next(), Page::Overview);
        assert_eq!(Page::Overview.previous(), Page::Manufacturers);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Kia", 10), "Kia");
        assert_eq!(truncate("Maruti Suzuki", 8), "Marut...");
    }
}
