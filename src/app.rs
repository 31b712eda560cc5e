use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{ApiClient, CachedApiClient, Session};
use crate::auth::{ConfigIdentityProvider, SessionManager};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{DashboardView, InvoiceListView, ProfileView, UploadView};

/// Main application: view stack, command palette and session state.
pub struct App {
  config: Config,
  client: CachedApiClient,
  session: Option<Session>,
  manager: Arc<Mutex<SessionManager<ApiClient>>>,
  user_email: Option<String>,
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,
  command: CommandInput,
  status: Option<String>,
  should_quit: bool,
}

impl App {
  pub async fn new(config: Config, user_filter: Option<String>) -> Result<Self> {
    let api = ApiClient::new(&config)?;
    let client = CachedApiClient::new(api.clone());

    // Exchange the configured identity for a backend session before the
    // first view is built.
    let mut manager = SessionManager::new(api);
    let provider = ConfigIdentityProvider::new(config.clone());
    manager.sync(&provider).await;

    let mut session = manager.session().cloned();
    if let Some(user) = user_filter {
      if let Some(session) = session.as_mut() {
        session.user_id = Some(user);
      }
    }
    let user_email = manager.profile().map(|p| p.email.clone());
    if let Some(error) = manager.error() {
      warn!(error, "profile sync finished with an error");
    }
    let manager = Arc::new(Mutex::new(manager));

    let root: Box<dyn View> = match &session {
      Some(session) => {
        info!("signed in, opening dashboard");
        Box::new(DashboardView::new(client.clone(), session.clone()))
      }
      // Signed out: the profile view explains how to configure auth.
      None => Box::new(ProfileView::new(manager.clone())),
    };

    Ok(Self {
      config,
      client,
      session,
      manager,
      user_email,
      view_stack: vec![root],
      command: CommandInput::new(),
      status: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      if let Some(event) = events.next().await {
        match event {
          Event::Key(key) => self.handle_key(key),
          Event::Tick => self.tick(),
        }
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Status bar
      ])
      .split(frame.area());

    let breadcrumb: Vec<String> = self.view_stack.iter().map(|v| v.breadcrumb_label()).collect();
    draw_header(
      frame,
      chunks[0],
      &self.config.display_title(),
      &breadcrumb,
      self.user_email.as_deref(),
    );

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    // Status bar: transient message or the view's shortcuts
    if let Some(status) = &self.status {
      let paragraph = ratatui::widgets::Paragraph::new(status.clone())
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, chunks[2]);
    } else if let Some(view) = self.view_stack.last() {
      draw_footer(frame, chunks[2], &view.shortcuts());
    }

    // Command palette renders over everything
    self.command.render_overlay(frame, chunks[1]);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    self.status = None;

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Command palette gets the key first, unless the view is capturing
    // free text (a filter or an edit field).
    let view_capturing = self
      .view_stack
      .last()
      .map(|v| v.wants_text_input())
      .unwrap_or(false);

    if self.command.is_active() || !view_capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) => return,
        KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    if let Some(view) = self.view_stack.last_mut() {
      let action = view.handle_key(key);
      self.apply_action(action);
    }
  }

  fn tick(&mut self) {
    // Only the visible view polls its queries
    if let Some(view) = self.view_stack.last_mut() {
      let action = view.tick();
      self.apply_action(action);
    }
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          // Backing out of the root view quits
          self.should_quit = true;
        }
      }
    }
  }

  /// Replace the root view based on a palette command.
  fn execute_command(&mut self, cmd: &str) {
    match cmd {
      "dashboard" => {
        if let Some(session) = self.session.clone() {
          self.set_root(Box::new(DashboardView::new(self.client.clone(), session)));
        } else {
          self.status = Some("Signed out: configure auth to view the dashboard".to_string());
        }
      }
      "invoices" => {
        if let Some(session) = self.session.clone() {
          self.set_root(Box::new(InvoiceListView::new(
            self.client.clone(),
            session,
            self.config.invoices.per_page,
          )));
        } else {
          self.status = Some("Signed out: configure auth to browse invoices".to_string());
        }
      }
      "upload" => {
        if let Some(session) = self.session.clone() {
          self.set_root(Box::new(UploadView::new(self.client.clone(), session)));
        } else {
          self.status = Some("Signed out: configure auth to upload invoices".to_string());
        }
      }
      "profile" => {
        self.set_root(Box::new(ProfileView::new(self.manager.clone())));
      }
      "quit" => {
        self.should_quit = true;
      }
      "" => {}
      other => {
        self.status = Some(format!("Unknown command: {}", other));
      }
    }
  }

  fn set_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
  }
}
