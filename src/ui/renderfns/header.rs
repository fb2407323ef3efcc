use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::Shortcut;

/// What the header shows besides the shortcuts
#[derive(Debug, Clone, Default)]
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub backend: &'a str,
  pub operator: Option<&'a str>,
  /// Pre-formatted snapshot age, `None` before the first load
  pub age: Option<String>,
  /// The next load will fetch
  pub stale: bool,
  /// Whether the source accepts writes
  pub live: bool,
}

/// Draw the header bar with title, backend, operator, data age and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: &HeaderInfo, shortcuts: &[Shortcut]) {
  let sep = || Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::Cyan).bold()),
    sep(),
    Span::styled(format!(" {} ", info.backend), Style::default().fg(Color::White)),
  ];
  if !info.live {
    spans.push(Span::styled("(read-only) ", Style::default().fg(Color::DarkGray)));
  }
  spans.push(sep());

  match info.operator {
    Some(name) => spans.push(Span::styled(
      format!(" {} ", name),
      Style::default().fg(Color::Yellow).bold(),
    )),
    None => spans.push(Span::styled(" not logged in ", Style::default().fg(Color::DarkGray))),
  }

  if let Some(age) = &info.age {
    spans.push(sep());
    let color = if info.stale { Color::Yellow } else { Color::DarkGray };
    spans.push(Span::styled(
      format!(" data {} old ", age),
      Style::default().fg(color),
    ));
  }

  spans.push(Span::raw(" "));
  for shortcut in shortcuts {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
    spans.push(Span::raw("   "));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
