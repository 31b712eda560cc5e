use crate::api::types::DashboardStats;
use crate::api::{CachedApiClient, Session};
use crate::cache::Tag;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::{format_amount, format_trend, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

/// Spending overview: totals, month-over-month trends, top vendors and
/// per-currency breakdown.
pub struct DashboardView {
  client: CachedApiClient,
  query: Query<DashboardStats>,
}

impl DashboardView {
  pub fn new(client: CachedApiClient, session: Session) -> Self {
    let query_client = client.clone();
    let mut query = Query::new(move || {
      let client = query_client.clone();
      let session = session.clone();
      async move {
        client
          .dashboard_stats(&session)
          .await
          .map_err(|e| e.to_string())
      }
    });

    // Start fetching immediately
    query.fetch();

    Self { client, query }
  }

  fn render_totals(&self, frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
        Constraint::Ratio(1, 3),
      ])
      .split(area);

    let (invoice_trend, invoice_color) = format_trend(stats.invoice_trend);
    let (expense_trend, expense_color) = format_trend(stats.expense_trend);

    let cards = [
      (
        " Invoices ",
        stats.total_invoices.to_string(),
        Some((invoice_trend, invoice_color)),
      ),
      (
        " Total expenses ",
        format_amount(stats.total_expenses, ""),
        None,
      ),
      (
        " This month ",
        format_amount(stats.current_month_expenses, ""),
        Some((expense_trend, expense_color)),
      ),
    ];

    for (i, (title, value, trend)) in cards.iter().enumerate() {
      let block = Block::default()
        .title(*title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

      let mut lines = vec![Line::from(Span::styled(
        value.clone(),
        Style::default().fg(Color::White).bold(),
      ))];
      if let Some((text, color)) = trend {
        lines.push(Line::from(Span::styled(
          format!("{} vs last month", text),
          Style::default().fg(*color),
        )));
      }

      let paragraph = Paragraph::new(lines).block(block);
      frame.render_widget(paragraph, chunks[i]);
    }
  }

  fn render_breakdowns(&self, frame: &mut Frame, area: Rect, stats: &DashboardStats) {
    let chunks = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
      .split(area);

    // Top vendors by spend
    let vendor_items: Vec<ListItem> = stats
      .top_vendors
      .iter()
      .map(|v| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&v.name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:>4}x  ", v.count),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(format_amount(v.total, "")),
        ]);
        ListItem::new(line)
      })
      .collect();

    let vendors = List::new(vendor_items).block(
      Block::default()
        .title(" Top vendors ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(vendors, chunks[0]);

    // Expenses by currency
    let currency_items: Vec<ListItem> = stats
      .expenses_by_currency
      .iter()
      .map(|c| {
        let line = Line::from(vec![
          Span::styled(format!("{:<6}", c.currency), Style::default().fg(Color::Yellow)),
          Span::raw(format_amount(c.total, "")),
        ]);
        ListItem::new(line)
      })
      .collect();

    let currencies = List::new(currency_items).block(
      Block::default()
        .title(" By currency ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(currencies, chunks[1]);
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        // Manual refresh: drop cached stats, then refetch
        self.client.invalidate(&[Tag::Dashboard]);
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => " Dashboard (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Dashboard (error: {}) ", e),
      _ => " Dashboard ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let stats = match self.query.data() {
      Some(stats) => stats,
      None => {
        let paragraph =
          Paragraph::new("Loading dashboard...").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(paragraph, inner);
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Totals row
        Constraint::Min(1),    // Breakdowns
      ])
      .split(inner);

    self.render_totals(frame, chunks[0], stats);
    self.render_breakdowns(frame, chunks[1], stats);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(20),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
