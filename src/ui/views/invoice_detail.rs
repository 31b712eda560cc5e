use crate::api::types::Invoice;
use crate::api::{CachedApiClient, Session};
use crate::cache::Tag;
use crate::query::{Query, QueryState};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{format_amount, format_date, status_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};

/// Single invoice: extracted fields, line items and optionally the raw
/// OCR text.
pub struct InvoiceDetailView {
  id: String,
  client: CachedApiClient,
  session: Session,
  query: Query<Invoice>,
  confirm: ConfirmDialog,
  delete_query: Option<Query<()>>,
  delete_error: Option<String>,
  show_raw: bool,
}

impl InvoiceDetailView {
  pub fn new(id: String, client: CachedApiClient, session: Session) -> Self {
    let query_client = client.clone();
    let query_session = session.clone();
    let query_id = id.clone();
    let mut query = Query::new(move || {
      let client = query_client.clone();
      let session = query_session.clone();
      let id = query_id.clone();
      async move { client.get_invoice(&session, &id).await.map_err(|e| e.to_string()) }
    });

    // Start fetching immediately
    query.fetch();

    Self {
      id,
      client,
      session,
      query,
      confirm: ConfirmDialog::new(),
      delete_query: None,
      delete_error: None,
      show_raw: false,
    }
  }

  fn start_delete(&mut self) {
    let client = self.client.clone();
    let session = self.session.clone();
    let id = self.id.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let session = session.clone();
      let id = id.clone();
      async move { client.delete_invoice(&session, &id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.delete_query = Some(query);
    self.delete_error = None;
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let mut title = match self.query.state() {
      QueryState::Loading => " Invoice (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Invoice (error: {}) ", e),
      _ => " Invoice ".to_string(),
    };
    if self.delete_query.is_some() {
      title.push_str("(deleting...) ");
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading invoice...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let invoice = match self.query.data() {
      Some(invoice) => invoice,
      None => return,
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(5), // Extracted fields
        Constraint::Length(1), // Separator / delete error
        Constraint::Min(1),    // Line items or raw text
      ])
      .split(inner);

    // Extracted fields
    let mut header = vec![
      Line::from(vec![
        Span::styled("Vendor:  ", Style::default().fg(Color::DarkGray)),
        Span::styled(&invoice.vendor_name, Style::default().fg(Color::Cyan).bold()),
        Span::raw("  "),
        Span::styled("Number: ", Style::default().fg(Color::DarkGray)),
        Span::raw(&invoice.invoice_number),
      ]),
      Line::from(vec![
        Span::styled("Date:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_date(invoice.invoice_date)),
        Span::raw("  "),
        Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          invoice.status.label(),
          Style::default().fg(status_color(invoice.status)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Total:   ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          format_amount(invoice.total_amount, &invoice.currency),
          Style::default().fg(Color::White).bold(),
        ),
        Span::raw("  "),
        Span::styled("Tax: ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_amount(invoice.tax_amount, &invoice.currency)),
      ]),
      Line::from(vec![
        Span::styled("File:    ", Style::default().fg(Color::DarkGray)),
        Span::raw(&invoice.filename),
      ]),
    ];
    if let Some(error) = &self.delete_error {
      header.push(Line::from(Span::styled(
        format!("Delete failed: {}", error),
        Style::default().fg(Color::Red),
      )));
    }
    frame.render_widget(Paragraph::new(header), chunks[0]);

    // Separator
    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    if self.show_raw {
      let raw = invoice.raw_text.as_deref().unwrap_or("No extracted text");
      let paragraph = Paragraph::new(raw)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[2]);
      return;
    }

    // Line items
    if invoice.line_items.is_empty() {
      let paragraph =
        Paragraph::new("No line items").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[2]);
      return;
    }

    let rows: Vec<Row> = invoice
      .line_items
      .iter()
      .map(|item| {
        Row::new(vec![
          item.description.clone(),
          format!("{:>6}", item.quantity),
          format!("{:>12}", format_amount(item.price, &invoice.currency)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(16),
      ],
    )
    .header(
      Row::new(vec!["Description", "Qty", "Price"])
        .style(Style::default().fg(Color::DarkGray).bold()),
    );
    frame.render_widget(table, chunks[2]);
  }
}

impl View for InvoiceDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.start_delete();
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('r') => {
        // Manual refresh: drop this invoice from the cache, then refetch
        self.client.invalidate(&[Tag::InvoiceId(self.id.clone())]);
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('t') => {
        self.show_raw = !self.show_raw;
        ViewAction::None
      }
      KeyCode::Char('d') => {
        if self.delete_query.is_none() {
          self
            .confirm
            .open("Delete this invoice? This cannot be undone.".to_string());
        }
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(invoice) if !invoice.vendor_name.is_empty() => invoice.vendor_name.clone(),
      _ => "Invoice".to_string(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();

    if let Some(delete) = &mut self.delete_query {
      if delete.poll() {
        match delete.state() {
          QueryState::Success(_) => {
            // Gone from the backend; back to the list
            self.delete_query = None;
            return ViewAction::Pop;
          }
          QueryState::Error(e) => {
            self.delete_error = Some(e.clone());
            self.delete_query = None;
          }
          _ => {}
        }
      }
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("t", "raw text").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ApiClient;
  use crate::config::Config;
  use std::time::Duration;

  fn test_view() -> InvoiceDetailView {
    let config = Config::default();
    let client = CachedApiClient::new(ApiClient::new(&config).expect("client should build"));
    InvoiceDetailView::new("inv-1".to_string(), client, Session::new("token".to_string()))
  }

  #[tokio::test]
  async fn test_completed_delete_closes_the_view() {
    let mut view = test_view();
    let mut delete = Query::new(|| async { Ok::<_, String>(()) });
    delete.fetch();
    view.delete_query = Some(delete);

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(matches!(view.tick(), ViewAction::Pop));
    assert!(view.delete_query.is_none());
  }

  #[tokio::test]
  async fn test_failed_delete_keeps_the_view_and_shows_the_error() {
    let mut view = test_view();
    let mut delete = Query::new(|| async { Err::<(), _>("backend said no".to_string()) });
    delete.fetch();
    view.delete_query = Some(delete);

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(matches!(view.tick(), ViewAction::None));
    assert_eq!(view.delete_error.as_deref(), Some("backend said no"));
    assert!(view.delete_query.is_none());
  }
}
