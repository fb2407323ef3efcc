use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted while the row filter is being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
  /// Filter text changed; empty when the filter was cleared
  Changed(String),
  /// Editing finished, the filter stays applied
  Applied,
}

/// `/`-activated row filter for tables.
///
/// Matching is a case-insensitive substring test against every cell of a row.
#[derive(Debug, Clone, Default)]
pub struct FilterInput {
  input: TextInput,
  active: bool,
}

impl FilterInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Whether any cell of `row` contains the current query.
  pub fn matches<'a, I>(&self, row: I) -> bool
  where
    I: IntoIterator<Item = &'a str>,
  {
    let needle = self.query().trim().to_lowercase();
    if needle.is_empty() {
      return true;
    }
    row
      .into_iter()
      .any(|cell| cell.to_lowercase().contains(&needle))
  }

  /// Handle a key event. Call this regardless of active state, it handles
  /// activation too.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FilterEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.active = true;
        self.input.clear();
        return KeyResult::Event(FilterEvent::Changed(String::new()));
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(FilterEvent::Applied)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(FilterEvent::Changed(String::new()))
      }
      InputResult::Consumed => KeyResult::Event(FilterEvent::Changed(self.query().to_string())),
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the filter line over the top of `area` while editing
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width.saturating_sub(2), 3);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Filter ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.query()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}
