use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use super::utils::notice_color;
use crate::ui::view::Notice;

/// Draw the footer bar: view breadcrumb on the left, last status message after it
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], notice: Option<&Notice>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  if let Some(notice) = notice {
    spans.push(Span::styled("  │ ", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      notice.text.clone(),
      Style::default().fg(notice_color(notice.kind)),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}
