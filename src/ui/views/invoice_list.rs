use crate::api::types::{Invoice, InvoicePage};
use crate::api::{CachedApiClient, Session};
use crate::cache::Tag;
use crate::query::{Query, QueryState};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_amount, format_date, status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::InvoiceDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Paginated invoice list with client-side filtering and deletion.
pub struct InvoiceListView {
  client: CachedApiClient,
  session: Session,
  page: u32,
  per_page: u32,
  query: Query<InvoicePage>,
  list_state: ListState,
  search: SearchInput,
  filter: String,
  confirm: ConfirmDialog,
  pending_delete: Option<String>,
  delete_query: Option<Query<String>>,
  delete_error: Option<String>,
}

impl InvoiceListView {
  pub fn new(client: CachedApiClient, session: Session, per_page: u32) -> Self {
    let page = 1;
    let query = Self::page_query(&client, &session, page, per_page);

    Self {
      client,
      session,
      page,
      per_page,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      delete_query: None,
      delete_error: None,
    }
  }

  fn page_query(
    client: &CachedApiClient,
    session: &Session,
    page: u32,
    per_page: u32,
  ) -> Query<InvoicePage> {
    let client = client.clone();
    let session = session.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let session = session.clone();
      async move {
        client
          .list_invoices(&session, page, per_page)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    query
  }

  fn go_to_page(&mut self, page: u32) {
    self.page = page;
    self.query = Self::page_query(&self.client, &self.session, page, self.per_page);
    self.list_state.select(None);
  }

  fn total(&self) -> u64 {
    self.query.data().map(|p| p.total).unwrap_or(0)
  }

  fn total_pages(&self) -> u32 {
    let total = self.total();
    if total == 0 {
      1
    } else {
      ((total + self.per_page as u64 - 1) / self.per_page as u64) as u32
    }
  }

  /// Invoices on the current page that match the filter
  fn filtered(&self) -> Vec<&Invoice> {
    let invoices = self
      .query
      .data()
      .map(|p| p.invoices.as_slice())
      .unwrap_or(&[]);

    if self.filter.is_empty() {
      return invoices.iter().collect();
    }

    let needle = self.filter.to_lowercase();
    invoices
      .iter()
      .filter(|inv| {
        inv.vendor_name.to_lowercase().contains(&needle)
          || inv.filename.to_lowercase().contains(&needle)
          || inv.invoice_number.to_lowercase().contains(&needle)
      })
      .collect()
  }

  fn selected_invoice_id(&self) -> Option<String> {
    let idx = self.list_state.selected()?;
    self.filtered().get(idx).map(|inv| inv.id.clone())
  }

  fn start_delete(&mut self, id: String) {
    let client = self.client.clone();
    let session = self.session.clone();
    let delete_id = id;
    let mut query = Query::new(move || {
      let client = client.clone();
      let session = session.clone();
      let id = delete_id.clone();
      async move {
        client
          .delete_invoice(&session, &id)
          .await
          .map(|_| id)
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.delete_query = Some(query);
    self.delete_error = None;
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let filtered_len = self.filtered().len();
    ensure_valid_selection(&mut self.list_state, filtered_len);

    let mut title = match self.query.state() {
      QueryState::Loading => " Invoices (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Invoices (error: {}) ", e),
      _ => format!(
        " Invoices ({}) page {}/{} ",
        self.total(),
        self.page,
        self.total_pages()
      ),
    };
    if !self.filter.is_empty() {
      title = format!("{}[/{}] ", title, self.filter);
    }
    if self.delete_query.is_some() {
      title.push_str("(deleting...) ");
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if filtered_len == 0 && !self.query.is_loading() {
      let content = if let Some(e) = &self.delete_error {
        format!("Delete failed: {}", e)
      } else if self.query.is_error() {
        "Failed to load invoices. Press 'r' to retry.".to_string()
      } else if !self.filter.is_empty() {
        "No invoices match the filter.".to_string()
      } else {
        "No invoices yet. Use :upload to add one.".to_string()
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .filtered()
      .iter()
      .map(|inv| {
        let color = status_color(inv.status);

        let line = Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(&inv.vendor_name, 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(format!("{:<10}", format_date(inv.invoice_date)), Style::default()),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", inv.status.label()),
            Style::default().fg(color),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:>14}", format_amount(inv.total_amount, &inv.currency)),
            Style::default().fg(Color::White),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for InvoiceListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Confirmation dialog takes priority when open
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        if let Some(id) = self.pending_delete.take() {
          self.start_delete(id);
        }
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) => {
        self.pending_delete = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    // Let search component try to handle next
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        self.filter = filter;
        self.list_state.select(None);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    // Normal mode key handling
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('n') => {
        if self.page < self.total_pages() {
          let page = self.page + 1;
          self.go_to_page(page);
        }
      }
      KeyCode::Char('p') => {
        if self.page > 1 {
          let page = self.page - 1;
          self.go_to_page(page);
        }
      }
      KeyCode::Char('r') => {
        // Manual refresh: drop cached pages, then refetch
        self.client.invalidate(&[Tag::Invoice]);
        self.query.refetch();
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.selected_invoice_id() {
          self.pending_delete = Some(id);
          self
            .confirm
            .open("Delete this invoice? This cannot be undone.".to_string());
        }
      }
      KeyCode::Enter => {
        if let Some(id) = self.selected_invoice_id() {
          return ViewAction::Push(Box::new(InvoiceDetailView::new(
            id,
            self.client.clone(),
            self.session.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    // Overlays render on top of the list
    self.search.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Invoices".to_string()
  }

  fn wants_text_input(&self) -> bool {
    self.search.is_active()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();

    if let Some(delete) = &mut self.delete_query {
      if delete.poll() {
        match delete.state() {
          QueryState::Success(_) => {
            self.delete_query = None;
            // The mutation invalidated the cached pages; this refetch
            // goes back to the network.
            self.query.refetch();
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
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("n/p", "page").with_priority(30),
      ShortcutInfo::new("d", "delete").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
