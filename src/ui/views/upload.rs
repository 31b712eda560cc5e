use crate::api::types::Invoice;
use crate::api::{AnalyzeSource, CachedApiClient, Session};
use crate::query::{Query, QueryState};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::{format_amount, format_date};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::upload::{SelectedFile, UploadFlow, UploadState, MAX_FILE_SIZE};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Upload and analyze flow: pick a file by path, validate it locally,
/// send it to the backend, show the extracted invoice.
pub struct UploadView {
  client: CachedApiClient,
  session: Session,
  flow: UploadFlow,
  path_input: TextInput,
  editing_path: bool,
  analyze_query: Option<Query<Invoice>>,
  validation_error: Option<String>,
}

impl UploadView {
  pub fn new(client: CachedApiClient, session: Session) -> Self {
    Self {
      client,
      session,
      flow: UploadFlow::new(),
      path_input: TextInput::new(),
      editing_path: true,
      analyze_query: None,
      validation_error: None,
    }
  }

  fn start_analysis(&mut self) {
    let Some(file) = self.flow.begin_analysis() else {
      return;
    };

    let client = self.client.clone();
    let session = self.session.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let session = session.clone();
      let file = file.clone();
      async move { run_analysis(&client, &session, &file).await }
    });
    query.fetch();
    self.analyze_query = Some(query);
  }

  fn select_path(&mut self, raw: &str) {
    let path = raw.trim();
    if path.is_empty() {
      return;
    }
    match self.flow.select(path.into()) {
      Ok(()) => self.validation_error = None,
      Err(e) => self.validation_error = Some(e.to_string()),
    }
  }

  fn render_state(&self, frame: &mut Frame, area: Rect) {
    let title = match self.flow.state() {
      UploadState::Idle | UploadState::FileSelected(_) => " Upload ".to_string(),
      UploadState::Analyzing(file) => format!(" Upload - analyzing {} ", file.name),
      UploadState::Succeeded(_) => " Upload - done ".to_string(),
      UploadState::Failed { .. } => " Upload - failed ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3), // Path input + validation error
        Constraint::Min(1),    // Flow state
      ])
      .split(inner);

    self.render_path_input(frame, chunks[0]);
    self.render_flow(frame, chunks[1]);
  }

  fn render_path_input(&self, frame: &mut Frame, area: Rect) {
    let max_mib = MAX_FILE_SIZE / (1024 * 1024);
    let mut lines = vec![Line::from(vec![
      Span::styled("File: ", Style::default().fg(Color::DarkGray)),
      Span::raw(self.path_input.value()),
      if self.editing_path {
        Span::styled("_", Style::default().fg(Color::Yellow))
      } else {
        Span::raw("")
      },
    ])];

    if let Some(error) = &self.validation_error {
      lines.push(Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )));
    } else {
      lines.push(Line::from(Span::styled(
        format!("pdf, png, jpg or jpeg, up to {} MiB", max_mib),
        Style::default().fg(Color::DarkGray),
      )));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }

  fn render_flow(&self, frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = match self.flow.state() {
      UploadState::Idle => vec![Line::from(Span::styled(
        "Type a file path and press Enter to select it.",
        Style::default().fg(Color::DarkGray),
      ))],
      UploadState::FileSelected(file) => vec![
        file_line(file),
        Line::raw(""),
        Line::from(Span::styled(
          "Press 'a' to upload and analyze.",
          Style::default().fg(Color::DarkGray),
        )),
      ],
      UploadState::Analyzing(file) => vec![
        file_line(file),
        Line::raw(""),
        Line::from(Span::styled(
          "Analyzing... this can take a few seconds.",
          Style::default().fg(Color::Yellow),
        )),
      ],
      UploadState::Succeeded(invoice) => success_lines(invoice),
      UploadState::Failed { file, error } => vec![
        file_line(file),
        Line::raw(""),
        Line::from(Span::styled(
          format!("Analysis failed: {}", error),
          Style::default().fg(Color::Red),
        )),
        Line::from(Span::styled(
          "Press 'a' to retry or 'x' to start over.",
          Style::default().fg(Color::DarkGray),
        )),
      ],
    };

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
  }
}

fn file_line(file: &SelectedFile) -> Line<'static> {
  let kib = file.size / 1024;
  Line::from(vec![
    Span::styled("Selected: ", Style::default().fg(Color::DarkGray)),
    Span::styled(file.name.clone(), Style::default().fg(Color::Cyan)),
    Span::styled(format!(" ({} KiB)", kib), Style::default().fg(Color::DarkGray)),
  ])
}

fn success_lines(invoice: &Invoice) -> Vec<Line<'static>> {
  vec![
    Line::from(Span::styled(
      "Invoice analyzed.",
      Style::default().fg(Color::Green).bold(),
    )),
    Line::raw(""),
    Line::from(vec![
      Span::styled("Vendor: ", Style::default().fg(Color::DarkGray)),
      Span::styled(invoice.vendor_name.clone(), Style::default().fg(Color::Cyan)),
    ]),
    Line::from(vec![
      Span::styled("Number: ", Style::default().fg(Color::DarkGray)),
      Span::raw(invoice.invoice_number.clone()),
    ]),
    Line::from(vec![
      Span::styled("Date:   ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_date(invoice.invoice_date)),
    ]),
    Line::from(vec![
      Span::styled("Total:  ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_amount(invoice.total_amount, &invoice.currency)),
    ]),
    Line::raw(""),
    Line::from(Span::styled(
      "Press 'x' to upload another, or :invoices to browse.",
      Style::default().fg(Color::DarkGray),
    )),
  ]
}

/// Two-step upload: stage the file, then analyze it by reference.
async fn run_analysis(
  client: &CachedApiClient,
  session: &Session,
  file: &SelectedFile,
) -> Result<Invoice, String> {
  let bytes = tokio::fs::read(&file.path)
    .await
    .map_err(|e| format!("cannot read {}: {}", file.path.display(), e))?;

  let file_ref = client
    .upload_file(session, file.name.clone(), bytes)
    .await
    .map_err(|e| e.to_string())?;

  client
    .analyze_invoice(session, AnalyzeSource::Ref(file_ref))
    .await
    .map_err(|e| e.to_string())
}

impl View for UploadView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.editing_path {
      match self.path_input.handle_key(key) {
        InputResult::Submitted(path) => {
          self.editing_path = false;
          self.select_path(&path);
        }
        InputResult::Cancelled => {
          self.editing_path = false;
        }
        InputResult::Consumed => {}
        InputResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('o') | KeyCode::Char('e') => {
        if !matches!(self.flow.state(), UploadState::Analyzing(_)) {
          self.editing_path = true;
        }
      }
      KeyCode::Char('a') | KeyCode::Enter => {
        if matches!(self.flow.state(), UploadState::Failed { .. }) {
          self.flow.retry();
        }
        self.start_analysis();
      }
      KeyCode::Char('x') => {
        self.flow.reset();
        self.path_input.clear();
        self.validation_error = None;
        self.editing_path = true;
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_state(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Upload".to_string()
  }

  fn wants_text_input(&self) -> bool {
    self.editing_path
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(query) = &mut self.analyze_query {
      if query.poll() {
        match query.state() {
          QueryState::Success(invoice) => {
            self.flow.complete(invoice.clone());
            self.analyze_query = None;
          }
          QueryState::Error(e) => {
            self.flow.fail(e.clone());
            self.analyze_query = None;
          }
          _ => {}
        }
      }
    }
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("o", "pick file").with_priority(20),
      ShortcutInfo::new("a", "analyze").with_priority(30),
      ShortcutInfo::new("x", "reset").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
