use chrono::NaiveDate;
use ratatui::prelude::Color;

use crate::api::types::ProcessingStatus;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Display color for an invoice processing status
pub fn status_color(status: ProcessingStatus) -> Color {
  match status {
    ProcessingStatus::Analyzed => Color::Green,
    ProcessingStatus::Pending => Color::Yellow,
    ProcessingStatus::Failed => Color::Red,
  }
}

/// Format an amount with its currency, e.g. "1,234.50 EUR"
pub fn format_amount(amount: f64, currency: &str) -> String {
  let formatted = group_thousands(amount);
  if currency.is_empty() {
    formatted
  } else {
    format!("{} {}", formatted, currency)
  }
}

fn group_thousands(amount: f64) -> String {
  let negative = amount < 0.0;
  let cents = (amount.abs() * 100.0).round() as u64;
  let whole = cents / 100;
  let frac = cents % 100;

  let digits = whole.to_string();
  let mut grouped = String::new();
  for (i, c) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }

  let sign = if negative { "-" } else { "" };
  format!("{}{}.{:02}", sign, grouped, frac)
}

/// Format an optional invoice date, with a dash for missing ones
pub fn format_date(date: Option<NaiveDate>) -> String {
  match date {
    Some(d) => d.format("%Y-%m-%d").to_string(),
    None => "-".to_string(),
  }
}

/// Format a percentage trend with its direction arrow and color
pub fn format_trend(percent: f64) -> (String, Color) {
  if percent > 0.0 {
    (format!("▲ {:.1}%", percent), Color::Red)
  } else if percent < 0.0 {
    (format!("▼ {:.1}%", percent.abs()), Color::Green)
  } else {
    ("─ 0.0%".to_string(), Color::DarkGray)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_status_colors() {
    assert_eq!(status_color(ProcessingStatus::Analyzed), Color::Green);
    assert_eq!(status_color(ProcessingStatus::Pending), Color::Yellow);
    assert_eq!(status_color(ProcessingStatus::Failed), Color::Red);
  }

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(1234.5, "EUR"), "1,234.50 EUR");
    assert_eq!(format_amount(0.99, "USD"), "0.99 USD");
    assert_eq!(format_amount(1000000.0, "JPY"), "1,000,000.00 JPY");
    assert_eq!(format_amount(42.0, ""), "42.00");
  }

  #[test]
  fn test_format_date() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    assert_eq!(format_date(Some(date)), "2024-03-15");
    assert_eq!(format_date(None), "-");
  }

  #[test]
  fn test_format_trend() {
    // Rising spend is bad, falling spend is good.
    assert_eq!(format_trend(12.5).0, "▲ 12.5%");
    assert_eq!(format_trend(12.5).1, Color::Red);
    assert_eq!(format_trend(-3.2).0, "▼ 3.2%");
    assert_eq!(format_trend(-3.2).1, Color::Green);
    assert_eq!(format_trend(0.0).1, Color::DarkGray);
  }
}
