use chrono::Duration;
use ratatui::prelude::Color;

use crate::ui::view::NoticeKind;

/// Truncate a string to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Footer color for a status message
pub fn notice_color(kind: NoticeKind) -> Color {
  match kind {
    NoticeKind::Info => Color::White,
    NoticeKind::Success => Color::Green,
    NoticeKind::Warning => Color::Yellow,
    NoticeKind::Error => Color::Red,
  }
}

/// Short human age such as "12s", "4m" or "2h"
pub fn format_age(age: Duration) -> String {
  let secs = age.num_seconds().max(0);
  match secs {
    0..=59 => format!("{}s", secs),
    60..=3599 => format!("{}m", secs / 60),
    _ => format!("{}h", secs / 3600),
  }
}
