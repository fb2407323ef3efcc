use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Label of the trailing free-text entry
const OTHER_LABEL: &str = "Other (type new)";

/// Events emitted by the location picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  /// An existing location was chosen
  Selected(String),
  /// The operator wants to type a new location
  Other,
  Cancelled,
}

/// Overlay list of known locations, with a free-text escape hatch at the end.
#[derive(Debug, Clone, Default)]
pub struct LocationPicker {
  active: bool,
  options: Vec<String>,
  selected: usize,
}

impl LocationPicker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Open with `options` (already sorted and distinct), preselecting `current`.
  pub fn show(&mut self, options: Vec<String>, current: Option<&str>) {
    self.selected = current
      .and_then(|c| options.iter().position(|o| o == c))
      .unwrap_or(0);
    self.options = options;
    self.active = true;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  /// Entries including the trailing "Other" row
  fn len(&self) -> usize {
    self.options.len() + 1
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let event = match self.options.get(self.selected) {
          Some(location) => PickerEvent::Selected(location.clone()),
          None => PickerEvent::Other,
        };
        self.hide();
        KeyResult::Event(event)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % self.len();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = (self.selected + self.len() - 1) % self.len();
        KeyResult::Handled
      }
      KeyCode::Home | KeyCode::Char('g') => {
        self.selected = 0;
        KeyResult::Handled
      }
      KeyCode::End | KeyCode::Char('G') => {
        self.selected = self.len() - 1;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker centred in `area` if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let longest = self
      .options
      .iter()
      .map(|o| o.chars().count())
      .chain(std::iter::once(OTHER_LABEL.len()))
      .max()
      .unwrap_or(OTHER_LABEL.len());
    let width = (longest as u16 + 6).clamp(24, area.width.saturating_sub(4).max(24));
    let height = (self.len() as u16 + 2).min(area.height.saturating_sub(2)).max(3);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" New location ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|o| ListItem::new(Span::styled(o.as_str(), Style::default().fg(Color::Cyan))))
      .chain(std::iter::once(ListItem::new(Span::styled(
        OTHER_LABEL,
        Style::default().fg(Color::Yellow).italic(),
      ))))
      .collect();

    let list = List::new(items)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
      .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, inner, &mut state);
  }
}
