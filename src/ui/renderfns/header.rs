use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, backend title, breadcrumb and user
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, breadcrumb: &[String], user: Option<&str>) {
  let mut spans = vec![
    Span::styled(" invo ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", breadcrumb.join(" › ")),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if let Some(user) = user {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", user),
      Style::default().fg(Color::Green),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
