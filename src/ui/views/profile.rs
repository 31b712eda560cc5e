use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::types::UserProfile;
use crate::api::{ApiClient, ProfileUpdate};
use crate::auth::SessionManager;
use crate::query::{Query, QueryState};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

type SharedSession = Arc<Mutex<SessionManager<ApiClient>>>;

/// Snapshot of the session manager taken on the async side.
#[derive(Debug, Clone)]
struct ProfileSnapshot {
  signed_in: bool,
  profile: Option<UserProfile>,
  error: Option<String>,
}

/// Which profile field is being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
  Name,
  Company,
}

/// Account view: backend profile with inline editing of name and company.
pub struct ProfileView {
  manager: SharedSession,
  query: Query<ProfileSnapshot>,
  editing: Option<EditField>,
  input: TextInput,
  update_query: Option<Query<UserProfile>>,
  update_error: Option<String>,
}

impl ProfileView {
  pub fn new(manager: SharedSession) -> Self {
    let mut query = snapshot_query(manager.clone(), false);
    query.fetch();

    Self {
      manager,
      query,
      editing: None,
      input: TextInput::new(),
      update_query: None,
      update_error: None,
    }
  }

  fn start_edit(&mut self, field: EditField) {
    let Some(snapshot) = self.query.data() else {
      return;
    };
    let Some(profile) = &snapshot.profile else {
      return;
    };

    let current = match field {
      EditField::Name => profile.full_name.as_deref().unwrap_or(""),
      EditField::Company => profile.company.as_deref().unwrap_or(""),
    };
    self.input.set_value(current);
    self.editing = Some(field);
  }

  fn submit_edit(&mut self, value: String) {
    let Some(field) = self.editing.take() else {
      return;
    };

    let update = match field {
      EditField::Name => ProfileUpdate {
        full_name: Some(value),
        company: None,
      },
      EditField::Company => ProfileUpdate {
        full_name: None,
        company: Some(value),
      },
    };

    let manager = self.manager.clone();
    let mut query = Query::new(move || {
      let manager = manager.clone();
      let update = update.clone();
      async move {
        let mut manager = manager.lock().await;
        manager
          .update_profile(update)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.update_query = Some(query);
    self.update_error = None;
  }

  fn render_profile(&self, frame: &mut Frame, area: Rect) {
    let mut title = match self.query.state() {
      QueryState::Loading => " Profile (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Profile (error: {}) ", e),
      _ => " Profile ".to_string(),
    };
    if self.update_query.is_some() {
      title.push_str("(saving...) ");
    }

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(snapshot) = self.query.data() else {
      let paragraph =
        Paragraph::new("Loading profile...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    if !snapshot.signed_in {
      let paragraph = Paragraph::new(
        "Signed out.\n\nAdd an [auth] section to the config and set INVO_API_TOKEN.",
      )
      .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    let mut lines = Vec::new();

    match &snapshot.profile {
      Some(profile) => {
        lines.push(field_line("Email:   ", profile.email.clone(), Color::Cyan));
        lines.push(self.editable_line(
          EditField::Name,
          "Name:    ",
          profile.full_name.as_deref().unwrap_or("-"),
        ));
        lines.push(self.editable_line(
          EditField::Company,
          "Company: ",
          profile.company.as_deref().unwrap_or("-"),
        ));
        if let Some(created) = &profile.created_at {
          lines.push(field_line(
            "Since:   ",
            created.format("%Y-%m-%d").to_string(),
            Color::White,
          ));
        }
      }
      None => {
        lines.push(Line::from(Span::styled(
          "Signed in, but the profile could not be loaded.",
          Style::default().fg(Color::Yellow),
        )));
      }
    }

    if let Some(error) = snapshot.error.as_ref().or(self.update_error.as_ref()) {
      lines.push(Line::raw(""));
      lines.push(Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }

  fn editable_line(&self, field: EditField, label: &'static str, value: &str) -> Line<'static> {
    if self.editing == Some(field) {
      Line::from(vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::raw(self.input.value().to_string()),
        Span::styled("_", Style::default().fg(Color::Yellow)),
      ])
    } else {
      field_line(label, value.to_string(), Color::White)
    }
  }
}

fn field_line(label: &'static str, value: String, color: Color) -> Line<'static> {
  Line::from(vec![
    Span::styled(label, Style::default().fg(Color::DarkGray)),
    Span::styled(value, Style::default().fg(color)),
  ])
}

/// Query that snapshots the session state, optionally re-fetching the
/// backend profile first.
fn snapshot_query(manager: SharedSession, refresh: bool) -> Query<ProfileSnapshot> {
  Query::new(move || {
    let manager = manager.clone();
    async move {
      let mut manager = manager.lock().await;
      if refresh {
        manager.refresh_profile().await;
      }
      Ok(ProfileSnapshot {
        signed_in: manager.session().is_some(),
        profile: manager.profile().cloned(),
        error: manager.error().map(String::from),
      })
    }
  })
}

impl View for ProfileView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.editing.is_some() {
      match self.input.handle_key(key) {
        InputResult::Submitted(value) => self.submit_edit(value),
        InputResult::Cancelled => {
          self.editing = None;
          self.input.clear();
        }
        InputResult::Consumed | InputResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('e') => self.start_edit(EditField::Name),
      KeyCode::Char('c') => self.start_edit(EditField::Company),
      KeyCode::Char('r') => {
        self.query = snapshot_query(self.manager.clone(), true);
        self.query.fetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_profile(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Profile".to_string()
  }

  fn wants_text_input(&self) -> bool {
    self.editing.is_some()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();

    if let Some(update) = &mut self.update_query {
      if update.poll() {
        match update.state() {
          QueryState::Success(_) => {
            self.update_query = None;
            // Manager already holds the updated profile; re-snapshot
            self.query = snapshot_query(self.manager.clone(), false);
            self.query.fetch();
          }
          QueryState::Error(e) => {
            self.update_error = Some(e.clone());
            self.update_query = None;
          }
          _ => {}
        }
      }
    }

    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit name").with_priority(20),
      ShortcutInfo::new("c", "edit company").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
