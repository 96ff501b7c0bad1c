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
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, Paragraph, Row,
        Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use vahan_growth::view::{period_bounds, series, value_bounds};
use vahan_growth::{
    metrics_path, report_error, ChartSeries, Config, GrowthKind, GrowthRow, MergedMetrics,
    MetricFilter, MetricsCache, YearMonth, SUBJECTS,
};

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::Red,
    Color::Blue,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Charts,
    Filters,
    RawData,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Charts => Page::Filters,
            Page::Filters => Page::RawData,
            Page::RawData => Page::Charts,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Charts => Page::RawData,
            Page::Filters => Page::Charts,
            Page::RawData => Page::Filters,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Charts => "Charts",
            Page::Filters => "Filters",
            Page::RawData => "Raw Data",
        }
    }
}

/// A panel either has a table or the reason it could not be loaded
#[derive(Debug, Clone)]
pub enum PanelData {
    Loaded(Arc<MergedMetrics>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub subject: String,
    pub data: PanelData,
    /// (group label, shown?)
    pub groups: Vec<(String, bool)>,
    pub cursor: usize,
}

impl Panel {
    pub fn new(subject: &str, data: PanelData) -> Self {
        let groups = match &data {
            PanelData::Loaded(metrics) => vahan_growth::view::group_labels(metrics)
                .into_iter()
                .map(|label| (label, true))
                .collect(),
            PanelData::Failed(_) => Vec::new(),
        };

        Self {
            subject: subject.to_string(),
            data,
            groups,
            cursor: 0,
        }
    }

    pub fn title(&self) -> String {
        match self.subject.as_str() {
            "vehicle_type" => "Vehicle Type".to_string(),
            "manufacturer" => "Manufacturer".to_string(),
            other => other.to_string(),
        }
    }

    pub fn metrics(&self) -> Option<&MergedMetrics> {
        match &self.data {
            PanelData::Loaded(metrics) => Some(metrics.as_ref()),
            PanelData::Failed(_) => None,
        }
    }

    pub fn selected_groups(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|(_, shown)| *shown)
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn toggle_group(&mut self) {
        if let Some((_, shown)) = self.groups.get_mut(self.cursor) {
            *shown = !*shown;
        }
    }

    pub fn select_all(&mut self) {
        for (_, shown) in &mut self.groups {
            *shown = true;
        }
    }

    pub fn next_group(&mut self) {
        if !self.groups.is_empty() {
            self.cursor = (self.cursor + 1) % self.groups.len();
        }
    }

    pub fn previous_group(&mut self) {
        if !self.groups.is_empty() {
            self.cursor = (self.cursor + self.groups.len() - 1) % self.groups.len();
        }
    }
}

fn load_panels(config: &Config, cache: &mut MetricsCache) -> Vec<Panel> {
    SUBJECTS
        .iter()
        .map(|subject| {
            let path = metrics_path(&config.metrics_dir, subject);
            let data = match cache.get_or_load(&path) {
                Ok(metrics) => PanelData::Loaded(metrics),
                Err(err) => {
                    let message = format!("Error loading {} metrics", subject);
                    if let Err(log_err) = report_error(&err, &message, &config.logs_dir) {
                        tracing::warn!(error = %log_err, "could not write error log");
                    }
                    PanelData::Failed(format!("{:#}", err))
                }
            };
            Panel::new(subject, data)
        })
        .collect()
}

pub struct App {
    pub panels: Vec<Panel>,
    pub active_panel: usize,
    pub metric: GrowthKind,
    pub current_page: Page,
    /// Full span of the loaded tables
    pub bounds: Option<(YearMonth, YearMonth)>,
    pub from: Option<YearMonth>,
    pub to: Option<YearMonth>,
    pub raw_state: TableState,
}

impl App {
    pub fn new(panels: Vec<Panel>) -> Self {
        let bounds = period_bounds(panels.iter().filter_map(|p| p.metrics()));

        let mut raw_state = TableState::default();
        raw_state.select(Some(0));

        Self {
            panels,
            active_panel: 0,
            metric: GrowthKind::YearOverYear,
            current_page: Page::Charts,
            bounds,
            from: bounds.map(|(lo, _)| lo),
            to: bounds.map(|(_, hi)| hi),
            raw_state,
        }
    }

    /// Load one panel per subject; a missing or broken file becomes a
    /// failed panel and is written to the error log.
    pub fn load(config: &Config, cache: &mut MetricsCache) -> Self {
        Self::new(load_panels(config, cache))
    }

    /// Re-read every panel through the cache (changed files and expired
    /// entries are loaded again). Hidden groups stay hidden and the date
    /// range is kept where the new data allows it.
    pub fn reload(&mut self, config: &Config, cache: &mut MetricsCache) {
        let mut panels = load_panels(config, cache);

        for panel in &mut panels {
            let Some(old) = self.panels.iter().find(|p| p.subject == panel.subject) else {
                continue;
            };
            for (label, shown) in &mut panel.groups {
                if old.groups.iter().any(|(l, s)| l == label && !*s) {
                    *shown = false;
                }
            }
            panel.cursor = old.cursor.min(panel.groups.len().saturating_sub(1));
        }

        self.panels = panels;
        self.bounds = period_bounds(self.panels.iter().filter_map(|p| p.metrics()));
        match (self.bounds, self.from, self.to) {
            (Some((lo, hi)), Some(from), Some(to)) if from <= hi && to >= lo => {
                self.from = Some(from.max(lo));
                self.to = Some(to.min(hi));
            }
            _ => self.reset_range(),
        }
        self.active_panel = self.active_panel.min(self.panels.len().saturating_sub(1));
        self.raw_state.select(Some(0));
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn toggle_metric(&mut self) {
        self.metric = self.metric.toggled();
    }

    pub fn next_panel(&mut self) {
        if !self.panels.is_empty() {
            self.active_panel = (self.active_panel + 1) % self.panels.len();
            self.raw_state.select(Some(0));
        }
    }

    pub fn active(&self) -> Option<&Panel> {
        self.panels.get(self.active_panel)
    }

    pub fn active_mut(&mut self) -> Option<&mut Panel> {
        self.panels.get_mut(self.active_panel)
    }

    /// Move the start of the range, staying inside the data and before `to`
    pub fn shift_from(&mut self, months: i64) {
        if let (Some((lo, _)), Some(from), Some(to)) = (self.bounds, self.from, self.to) {
            let moved = from.add_months(months);
            self.from = Some(moved.max(lo).min(to));
        }
    }

    /// Move the end of the range, staying inside the data and after `from`
    pub fn shift_to(&mut self, months: i64) {
        if let (Some((_, hi)), Some(from), Some(to)) = (self.bounds, self.from, self.to) {
            let moved = to.add_months(months);
            self.to = Some(moved.min(hi).max(from));
        }
    }

    pub fn reset_range(&mut self) {
        self.from = self.bounds.map(|(lo, _)| lo);
        self.to = self.bounds.map(|(_, hi)| hi);
    }

    pub fn filter_for(&self, panel: &Panel) -> MetricFilter {
        MetricFilter {
            from: self.from,
            to: self.to,
            groups: Some(panel.selected_groups()),
        }
    }

    pub fn panel_rows<'a>(&self, panel: &'a Panel) -> Vec<&'a GrowthRow> {
        match panel.metrics() {
            Some(metrics) => self.filter_for(panel).apply(metrics),
            None => Vec::new(),
        }
    }

    pub fn panel_series(&self, panel: &Panel) -> Vec<ChartSeries> {
        series(&self.panel_rows(panel), self.metric)
    }

    fn raw_len(&self) -> usize {
        self.active().map(|p| self.panel_rows(p).len()).unwrap_or(0)
    }

    pub fn next(&mut self) {
        let len = self.raw_len();
        if len == 0 {
            return;
        }
        let i = match self.raw_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.raw_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.raw_len();
        if len == 0 {
            return;
        }
        let i = match self.raw_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => (i - 1).min(len - 1),
        };
        self.raw_state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App, config: &Config, cache: &mut MetricsCache) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, config, cache);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
    cache: &mut MetricsCache,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('m') => app.toggle_metric(),
                KeyCode::Char('p') => app.next_panel(),
                KeyCode::Char('r') => app.reset_range(),
                KeyCode::Char('R') => app.reload(config, cache),
                KeyCode::Left if key.modifiers.contains(KeyModifiers::SHIFT) => app.shift_to(-1),
                KeyCode::Right if key.modifiers.contains(KeyModifiers::SHIFT) => app.shift_to(1),
                KeyCode::Left | KeyCode::Char('h') => app.shift_from(-1),
                KeyCode::Right | KeyCode::Char('l') => app.shift_from(1),
                KeyCode::Char('H') => app.shift_to(-1),
                KeyCode::Char('L') => app.shift_to(1),
                KeyCode::Char(' ') if app.current_page == Page::Filters => {
                    if let Some(panel) = app.active_mut() {
                        panel.toggle_group();
                    }
                }
                KeyCode::Char('a') if app.current_page == Page::Filters => {
                    if let Some(panel) = app.active_mut() {
                        panel.select_all();
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => match app.current_page {
                    Page::Filters => {
                        if let Some(panel) = app.active_mut() {
                            panel.next_group();
                        }
                    }
                    _ => app.next(),
                },
                KeyCode::Up | KeyCode::Char('k') => match app.current_page {
                    Page::Filters => {
                        if let Some(panel) = app.active_mut() {
                            panel.previous_group();
                        }
                    }
                    _ => app.previous(),
                },
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

    match app.current_page {
        Page::Charts => render_charts(f, chunks[1], app),
        Page::Filters => render_filters(f, chunks[1], app),
        Page::RawData => render_raw_data(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Charts, Page::Filters, Page::RawData];

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
    tab_spans.push(Span::styled(
        app.metric.column(),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(range_label(app), Style::default().fg(Color::White)));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn range_label(app: &App) -> String {
    match (app.from, app.to) {
        (Some(from), Some(to)) => format!("{} → {}", from, to),
        _ => "no data".to_string(),
    }
}

fn render_charts(f: &mut Frame, area: Rect, app: &App) {
    let constraints: Vec<Constraint> = app
        .panels
        .iter()
        .map(|_| Constraint::Ratio(1, app.panels.len().max(1) as u32))
        .collect();
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (idx, panel) in app.panels.iter().enumerate() {
        render_panel_chart(f, areas[idx], app, panel, idx == app.active_panel);
    }
}

fn panel_block(title: String, active: bool) -> Block<'static> {
    let border = if active { Color::Yellow } else { Color::White };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title)
}

fn render_panel_chart(f: &mut Frame, area: Rect, app: &App, panel: &Panel, active: bool) {
    let title = format!(" {} - {} ", panel.title(), app.metric.name());

    if let PanelData::Failed(message) = &panel.data {
        let text = vec![
            Line::from(Span::styled(
                "❌ Could not load metrics",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(message.clone()),
        ];
        let paragraph = Paragraph::new(text)
            .wrap(Wrap { trim: true })
            .block(panel_block(title, active));
        f.render_widget(paragraph, area);
        return;
    }

    let lines = app.panel_series(panel);
    let (Some(from), Some(to)) = (app.from, app.to) else {
        f.render_widget(Paragraph::new("No data").block(panel_block(title, active)), area);
        return;
    };

    let points: Vec<Vec<(f64, f64)>> = lines
        .iter()
        .map(|line| {
            line.points
                .iter()
                .map(|(period, value)| (period.months_since(&from) as f64, *value))
                .collect()
        })
        .collect();

    let datasets: Vec<Dataset> = lines
        .iter()
        .zip(points.iter())
        .enumerate()
        .map(|(i, (line, data))| {
            Dataset::default()
                .name(line.label.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                .data(data)
        })
        .collect();

    let span = to.months_since(&from).max(1) as f64;
    let (lo, hi) = value_bounds(&lines).unwrap_or((0.0, 0.0));
    let pad = ((hi - lo).abs() * 0.1).max(1.0);
    let (y_min, y_max) = (lo - pad, hi + pad);

    let chart = Chart::new(datasets)
        .block(panel_block(title, active))
        .x_axis(
            Axis::default()
                .title("Month")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, span])
                .labels(vec![
                    Span::raw(from.to_string()),
                    Span::raw(from.add_months(to.months_since(&from) / 2).to_string()),
                    Span::raw(to.to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.1}", y_min)),
                    Span::raw(format!("{:.1}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{:.1}", y_max)),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_filters(f: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (idx, panel) in app.panels.iter().enumerate().take(2) {
        let active = idx == app.active_panel;
        let title = format!(" {} groups ", panel.title());

        let items: Vec<ListItem> = if panel.groups.is_empty() {
            vec![ListItem::new("(no groups)")]
        } else {
            panel
                .groups
                .iter()
                .enumerate()
                .map(|(i, (label, shown))| {
                    let mark = if *shown { "[x]" } else { "[ ]" };
                    let style = if active && i == panel.cursor {
                        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(format!("{} {}", mark, label)).style(style)
                })
                .collect()
        };

        f.render_widget(List::new(items).block(panel_block(title, active)), columns[idx]);
    }
}

fn format_metric(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn render_raw_data(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(panel) = app.panels.get(app.active_panel) else {
        return;
    };
    let title = format!(" {} metrics ", panel.title());

    if let PanelData::Failed(message) = &panel.data {
        let paragraph = Paragraph::new(message.clone())
            .wrap(Wrap { trim: true })
            .block(panel_block(title, true));
        f.render_widget(paragraph, area);
        return;
    }

    let header_cells = ["Group", "Month", "YoY %", "QoQ %"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .panel_rows(panel)
        .into_iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.group.label()),
                Cell::from(row.period.to_string()),
                Cell::from(format_metric(row.yoy)),
                Cell::from(format_metric(row.qoq)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(panel_block(title, true))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    let mut state = app.raw_state.clone();
    f.render_stateful_widget(table, area, &mut state);
    app.raw_state = state;
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let panel = app.active().map(|p| p.title()).unwrap_or_default();

    let mut status_spans = vec![Span::styled(
        format!(" Panel: {} ", panel),
        Style::default().fg(Color::Cyan),
    )];

    let keys = [
        ("Tab", " Page | "),
        ("p", " Panel | "),
        ("m", " YoY/QoQ | "),
        ("h/l", " Start | "),
        ("H/L", " End | "),
        ("r", " Reset | "),
        ("R", " Reload | "),
        ("Space", " Group | "),
    ];
    status_spans.push(Span::raw(" | "));
    for (key, label) in keys {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vahan_growth::GroupKey;

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn row(group: &str, period: &str, yoy: Option<f64>, qoq: Option<f64>) -> GrowthRow {
        GrowthRow {
            group: GroupKey::new([group]),
            period: ym(period),
            yoy,
            qoq,
        }
    }

    fn sample_app() -> App {
        let metrics = MergedMetrics {
            period_field: "year_month".to_string(),
            group_fields: vec!["vehicle_type".to_string()],
            rows: vec![
                row("2W", "2021-01", Some(10.0), None),
                row("2W", "2021-02", Some(11.0), Some(1.0)),
                row("2W", "2021-03", Some(12.0), Some(2.0)),
                row("4W", "2021-01", Some(5.0), Some(0.5)),
                row("4W", "2021-02", None, Some(0.7)),
                row("4W", "2021-03", Some(6.0), None),
            ],
        };

        App::new(vec![
            Panel::new("vehicle_type", PanelData::Loaded(Arc::new(metrics))),
            Panel::new("manufacturer", PanelData::Failed("file not found".to_string())),
        ])
    }

    #[test]
    fn test_app_starts_on_full_range() {
        let app = sample_app();
        assert_eq!(app.bounds, Some((ym("2021-01"), ym("2021-03"))));
        assert_eq!(app.from, Some(ym("2021-01")));
        assert_eq!(app.to, Some(ym("2021-03")));
        assert_eq!(app.current_page, Page::Charts);
        assert_eq!(app.panels[0].groups.len(), 2);
        assert!(app.panels[1].groups.is_empty());
    }

    #[test]
    fn test_metric_toggle_changes_series() {
        let mut app = sample_app();
        let panel = app.panels[0].clone();

        let yoy = app.panel_series(&panel);
        assert_eq!(yoy[0].points.len(), 3);
        assert_eq!(yoy[1].points.len(), 2);

        app.toggle_metric();
        assert_eq!(app.metric, GrowthKind::QuarterOverQuarter);
        let qoq = app.panel_series(&panel);
        assert_eq!(qoq[0].points.len(), 2);
        assert_eq!(qoq[1].points, vec![(ym("2021-01"), 0.5), (ym("2021-02"), 0.7)]);
    }

    #[test]
    fn test_range_is_clamped() {
        let mut app = sample_app();

        app.shift_from(-5);
        assert_eq!(app.from, Some(ym("2021-01")));

        app.shift_from(1);
        assert_eq!(app.from, Some(ym("2021-02")));
        app.shift_to(-4);
        assert_eq!(app.to, Some(ym("2021-02")));

        let panel = app.panels[0].clone();
        assert_eq!(app.panel_rows(&panel).len(), 2);

        app.reset_range();
        assert_eq!(app.to, Some(ym("2021-03")));
    }

    #[test]
    fn test_group_toggle_hides_series() {
        let mut app = sample_app();
        app.current_page = Page::Filters;

        app.active_mut().unwrap().next_group();
        app.active_mut().unwrap().toggle_group();
        assert_eq!(app.panels[0].selected_groups(), vec!["2W"]);

        let panel = app.panels[0].clone();
        let lines = app.panel_series(&panel);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].label, "2W");

        app.active_mut().unwrap().select_all();
        assert_eq!(app.panels[0].selected_groups().len(), 2);
    }

    #[test]
    fn test_failed_panel_has_no_rows() {
        let mut app = sample_app();
        app.next_panel();
        let panel = app.active().unwrap().clone();

        assert!(matches!(panel.data, PanelData::Failed(ref m) if m == "file not found"));
        assert!(app.panel_rows(&panel).is_empty());
        assert_eq!(panel.title(), "Manufacturer");

        // Navigation on an empty table is a no-op
        app.next();
        app.previous();
        assert_eq!(app.raw_state.selected(), Some(0));
    }

    #[test]
    fn test_load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.set_data_dir(dir.path().join("data"));
        config.logs_dir = dir.path().join("logs");

        let mut cache = MetricsCache::new(&config.period_field);
        let app = App::load(&config, &mut cache);

        assert_eq!(app.panels.len(), 2);
        assert!(app.panels.iter().all(|p| matches!(p.data, PanelData::Failed(_))));
        assert!(app.bounds.is_none());
        assert!(config.logs_dir.join("error_log.txt").exists());
    }

    #[test]
    fn test_reload_picks_up_rewritten_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.set_data_dir(dir.path().join("data"));
        config.logs_dir = dir.path().join("logs");
        std::fs::create_dir_all(&config.metrics_dir).unwrap();

        let header = "vehicle_type,year_month,YoY_Growth_%,QoQ_Growth_%\n";
        let path = metrics_path(&config.metrics_dir, "vehicle_type");
        std::fs::write(&path, format!("{}2W,2021-01,1.5,\n4W,2021-01,2.5,\n", header)).unwrap();

        let mut cache = MetricsCache::new(&config.period_field);
        let mut app = App::load(&config, &mut cache);
        assert_eq!(app.bounds, Some((ym("2021-01"), ym("2021-01"))));

        app.toggle_metric();
        app.active_mut().unwrap().next_group();
        app.active_mut().unwrap().toggle_group();
        assert_eq!(app.panels[0].selected_groups(), vec!["2W"]);

        std::fs::write(
            &path,
            format!("{}2W,2021-01,1.5,\n2W,2021-02,1.7,\n3W,2021-02,0.5,\n4W,2021-01,2.5,\n", header),
        )
        .unwrap();
        app.reload(&config, &mut cache);

        let panel = &app.panels[0];
        assert_eq!(panel.metrics().unwrap().len(), 4);
        assert_eq!(panel.groups.len(), 3);
        assert!(panel.groups.iter().any(|(l, shown)| l == "4W" && !*shown));
        assert!(panel.groups.iter().any(|(l, shown)| l == "3W" && *shown));
        assert_eq!(app.bounds, Some((ym("2021-01"), ym("2021-02"))));
        assert_eq!(app.from, Some(ym("2021-01")));
        assert_eq!(app.to, Some(ym("2021-01")));
        assert_eq!(app.metric, GrowthKind::QuarterOverQuarter);
        assert!(matches!(app.panels[1].data, PanelData::Failed(_)));
        println!("✅ Reload picks up rewritten file PASSED");
    }

    #[test]
    fn test_page_cycle() {
        let mut app = sample_app();
        app.next_page();
        assert_eq!(app.current_page, Page::Filters);
        app.next_page();
        app.next_page();
        assert_eq!(app.current_page, Page::Charts);
        app.previous_page();
        assert_eq!(app.current_page, Page::RawData);
    }
}
