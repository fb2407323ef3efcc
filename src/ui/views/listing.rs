use crate::schema::CanonicalField;
use crate::session::Session;
use crate::snapshot::Snapshot;
use crate::ui::clamp_selection;
use crate::ui::components::{FilterEvent, FilterInput, KeyResult};
use crate::ui::renderfns::truncate;
use crate::ui::view::{Request, Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};

/// Widest a column gets, in characters
const MAX_COLUMN_WIDTH: usize = 28;

/// Every record of the snapshot with all of its columns
pub struct ListingView {
  table_state: TableState,
  filter: FilterInput,
}

impl Default for ListingView {
  fn default() -> Self {
    Self::new()
  }
}

impl ListingView {
  pub fn new() -> Self {
    Self {
      table_state: TableState::default(),
      filter: FilterInput::new(),
    }
  }

  /// Cell texts of each visible row, in snapshot order. The id column is left out.
  fn visible_rows(&self, snapshot: &Snapshot) -> Vec<Vec<String>> {
    let headers = snapshot.display_headers();
    snapshot
      .records()
      .iter()
      .map(|record| {
        headers
          .iter()
          .map(|h| record.raw(h).unwrap_or_default().to_string())
          .collect::<Vec<_>>()
      })
      .filter(|cells| self.filter.matches(cells.iter().map(String::as_str)))
      .collect()
  }

  fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<Constraint> {
    headers
      .iter()
      .enumerate()
      .map(|(i, header)| {
        let widest = rows
          .iter()
          .filter_map(|row| row.get(i))
          .map(|cell| cell.chars().count())
          .chain(std::iter::once(header.chars().count()))
          .max()
          .unwrap_or(0);
        Constraint::Length(widest.clamp(4, MAX_COLUMN_WIDTH) as u16)
      })
      .collect()
  }

  fn move_selection(&mut self, session: &Session, delta: isize) {
    let len = session
      .snapshot()
      .map(|s| self.visible_rows(s).len())
      .unwrap_or(0);
    let next = self
      .table_state
      .selected()
      .map_or(0, |i| i.saturating_add_signed(delta));
    self.table_state.select(clamp_selection(Some(next), len));
  }
}

impl View for ListingView {
  fn handle_key(&mut self, key: KeyEvent, session: &Session) -> ViewAction {
    match self.filter.handle_key(key) {
      KeyResult::Event(FilterEvent::Changed(_)) => {
        self.table_state.select(None);
        return ViewAction::None;
      }
      KeyResult::Event(FilterEvent::Applied) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(session, 1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(session, -1),
      KeyCode::Char('r') => return ViewAction::Request(Request::Refresh),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, session: &Session) {
    let Some(snapshot) = session.snapshot() else {
      let paragraph = Paragraph::new("No data loaded. Press 'r' to load.")
        .block(Block::default().title(" Vehicles ").borders(Borders::ALL))
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    };

    let rows = self.visible_rows(snapshot);
    self
      .table_state
      .select(clamp_selection(self.table_state.selected(), rows.len()));

    let title = if self.filter.query().is_empty() {
      format!(" Vehicles ({}) ", snapshot.len())
    } else {
      format!(
        " Vehicles ({} of {}) /{} ",
        rows.len(),
        snapshot.len(),
        self.filter.query()
      )
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if rows.is_empty() {
      let content = if snapshot.is_empty() {
        "The table has no records."
      } else {
        "No vehicles match the filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      self.filter.render_overlay(frame, area);
      return;
    }

    let schema = snapshot.schema();
    let headers = snapshot.display_headers();
    let header = Row::new(headers.iter().map(|h| {
      let style = match schema.field_for_header(h) {
        Some(CanonicalField::Location) => Style::default().fg(Color::Green).bold(),
        Some(_) => Style::default().fg(Color::Cyan).bold(),
        None => Style::default().fg(Color::White),
      };
      Cell::from(h.to_string()).style(style)
    }));
    let widths = Self::column_widths(&headers, &rows);
    let body: Vec<Row> = rows
      .into_iter()
      .map(|cells| Row::new(cells.iter().map(|c| Cell::from(truncate(c, MAX_COLUMN_WIDTH)))))
      .collect();

    let table = Table::new(body, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(table, area, &mut self.table_state);

    self.filter.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Listing".to_string()
  }

  fn captures_input(&self) -> bool {
    self.filter.is_active()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command"),
      Shortcut::new("/", "filter"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::memory::MemoryTable;
  use crate::remote::{RemoteDataset, RemoteRecord};
  use crate::session::Operators;
  use chrono::Utc;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn loaded_session(remote: &MemoryTable) -> Session {
    let mut session = Session::default();
    session.login(&Operators::new(["Alice"]), "Alice").unwrap();
    session.load(remote, false).await.unwrap();
    session
  }

  #[tokio::test]
  async fn test_filter_narrows_rows() {
    let remote = MemoryTable::inventory();
    let session = loaded_session(&remote).await;
    let snapshot = session.snapshot().unwrap().clone();
    let mut view = ListingView::new();

    assert_eq!(view.visible_rows(&snapshot).len(), 3);

    view.handle_key(key(KeyCode::Char('/')), &session);
    assert!(view.captures_input());
    for c in "mazda".chars() {
      view.handle_key(key(KeyCode::Char(c)), &session);
    }
    view.handle_key(key(KeyCode::Enter), &session);
    assert!(!view.captures_input());

    let rows = view.visible_rows(&snapshot);
    assert_eq!(rows, vec![vec!["ABC123", "Patio 1", "Mazda"]]);
  }

  #[tokio::test]
  async fn test_selection_stays_in_bounds() {
    let remote = MemoryTable::inventory();
    let session = loaded_session(&remote).await;
    let mut view = ListingView::new();

    for _ in 0..5 {
      view.handle_key(key(KeyCode::Down), &session);
    }
    assert_eq!(view.table_state.selected(), Some(2));
    view.handle_key(key(KeyCode::Up), &session);
    assert_eq!(view.table_state.selected(), Some(1));
  }

  #[tokio::test]
  async fn test_refresh_and_back() {
    let remote = MemoryTable::inventory();
    let session = loaded_session(&remote).await;
    let mut view = ListingView::new();

    assert!(matches!(
      view.handle_key(key(KeyCode::Char('r')), &session),
      ViewAction::Request(Request::Refresh)
    ));
    assert!(matches!(
      view.handle_key(key(KeyCode::Char('q')), &session),
      ViewAction::Pop
    ));
  }

  #[test]
  fn test_column_widths_fit_content() {
    let headers = ["Plate", "Notes"];
    let rows = vec![vec!["AB".to_string(), "x".repeat(40)]];
    assert_eq!(
      ListingView::column_widths(&headers, &rows),
      vec![Constraint::Length(5), Constraint::Length(28)]
    );
  }

  #[test]
  fn test_id_column_is_not_listed() {
    let dataset = RemoteDataset {
      headers: vec!["ID".into(), "Placa".into(), "Marca".into()],
      records: vec![RemoteRecord {
        id: "recA".into(),
        fields: [("ID", "recA"), ("Placa", "ABC123"), ("Marca", "Mazda")]
          .into_iter()
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .collect(),
      }],
      id_header: Some("ID".into()),
    };
    let snapshot = Snapshot::capture(dataset, Utc::now());

    let rows = ListingView::new().visible_rows(&snapshot);
    assert_eq!(rows, vec![vec!["ABC123", "Mazda"]]);
  }
}
