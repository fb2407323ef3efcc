use crate::changelog::EXPORT_HEADERS;
use crate::schema::CanonicalField;
use crate::session::Session;
use crate::snapshot::Record;
use crate::ui::components::{InputResult, KeyResult, LocationPicker, PickerEvent, TextInput};
use crate::ui::renderfns::truncate;
use crate::ui::view::{Notice, Outcome, Request, Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap};

/// Plates are at most six characters in the form
const PLATE_LEN: usize = 6;

const NOT_SET: &str = "Not set";

/// Fields shown on the record card below plate and location
const CARD_FIELDS: [(CanonicalField, &str); 5] = [
  (CanonicalField::Brand, "Brand"),
  (CanonicalField::Reference, "Reference"),
  (CanonicalField::Year, "Year"),
  (CanonicalField::Color, "Color"),
  (CanonicalField::Vin, "VIN"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Plate,
  Picker,
  NewLocation,
  Confirm,
}

/// Search a vehicle by plate, move it, and review the session's changes
pub struct InventoryView {
  focus: Focus,
  plate: TextInput,
  new_location: TextInput,
  picker: LocationPicker,
  record: Option<Record>,
  /// Plate of the last search that found nothing
  missing: Option<String>,
  /// Location waiting for confirmation
  pending: Option<String>,
  /// Location written since the record was fetched
  applied: Option<String>,
}

impl Default for InventoryView {
  fn default() -> Self {
    Self::new()
  }
}

impl InventoryView {
  pub fn new() -> Self {
    Self {
      focus: Focus::Plate,
      plate: TextInput::plate(PLATE_LEN),
      new_location: TextInput::new(),
      picker: LocationPicker::new(),
      record: None,
      missing: None,
      pending: None,
      applied: None,
    }
  }

  /// Location to display for the current record
  fn current_location(&self) -> Option<&str> {
    self
      .applied
      .as_deref()
      .or_else(|| self.record.as_ref().and_then(Record::location))
  }

  fn open_picker(&mut self, session: &Session) -> ViewAction {
    let Some(snapshot) = session.snapshot() else {
      return ViewAction::Notify(Notice::warning("No data loaded yet"));
    };
    if !snapshot.schema().has_location() {
      return ViewAction::Notify(Notice::warning(
        "No location column found, locations cannot be changed",
      ));
    }
    if self.record.is_none() {
      return ViewAction::Notify(Notice::warning("Search a plate first"));
    }

    let options = snapshot.location_options();
    let current = self.current_location().map(str::to_string);
    self.picker.show(options, current.as_deref());
    self.focus = Focus::Picker;
    ViewAction::None
  }

  fn handle_plate_key(&mut self, key: KeyEvent, session: &Session) -> ViewAction {
    match key.code {
      KeyCode::Tab => return self.open_picker(session),
      KeyCode::Esc => {
        self.plate.clear();
        self.record = None;
        self.missing = None;
        self.applied = None;
        return ViewAction::None;
      }
      _ => {}
    }

    match self.plate.handle_key(key) {
      InputResult::Submitted(plate) => {
        let plate = plate.trim().to_string();
        if plate.is_empty() {
          ViewAction::Notify(Notice::warning("Type a plate to search"))
        } else {
          ViewAction::Request(Request::Search(plate))
        }
      }
      _ => ViewAction::None,
    }
  }

  fn handle_picker_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(location)) => {
        self.pending = Some(location);
        self.focus = Focus::Confirm;
      }
      KeyResult::Event(PickerEvent::Other) => {
        self.new_location.clear();
        self.focus = Focus::NewLocation;
      }
      KeyResult::Event(PickerEvent::Cancelled) => self.focus = Focus::Plate,
      KeyResult::Handled | KeyResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn handle_new_location_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.new_location.handle_key(key) {
      InputResult::Submitted(text) => {
        let text = text.trim();
        if text.is_empty() {
          return ViewAction::Notify(Notice::warning("Type the new location first"));
        }
        self.pending = Some(text.to_string());
        self.focus = Focus::Confirm;
      }
      InputResult::Cancelled => self.focus = Focus::Plate,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn handle_confirm_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
        self.focus = Focus::Plate;
        match (self.record.as_ref(), self.pending.take()) {
          (Some(record), Some(location)) => ViewAction::Request(Request::ApplyLocation {
            record_id: record.id().to_string(),
            location,
          }),
          _ => ViewAction::Notify(Notice::warning("Select a location first")),
        }
      }
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
        self.pending = None;
        self.focus = Focus::Plate;
        ViewAction::None
      }
      _ => ViewAction::None,
    }
  }

  fn render_search(&self, frame: &mut Frame, area: Rect) {
    let focused = self.focus == Focus::Plate;
    let block = Block::default()
      .title(" Plate ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::Blue }));

    let mut spans = vec![Span::styled(
      self.plate.value().to_string(),
      Style::default().fg(Color::White).bold(),
    )];
    if focused {
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    spans.push(Span::styled(
      "   Enter search · Tab change location",
      Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
  }

  fn render_card(&self, frame: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
      .title(" Vehicle ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let label = |text: &str| Span::styled(format!("{:<12}", text), Style::default().fg(Color::DarkGray));
    let mut lines: Vec<Line> = Vec::new();

    match (&self.record, &self.missing) {
      (Some(record), _) => {
        lines.push(Line::from(vec![
          label("Plate"),
          Span::styled(record.plate().to_string(), Style::default().fg(Color::Cyan).bold()),
        ]));

        let location = match self.current_location() {
          Some(loc) => Span::styled(loc.to_string(), Style::default().fg(Color::Green).bold()),
          None => Span::styled(NOT_SET, Style::default().fg(Color::DarkGray).italic()),
        };
        lines.push(Line::from(vec![label("Location"), location]));

        for (field, name) in CARD_FIELDS {
          if let Some(value) = record.value(field) {
            lines.push(Line::from(vec![label(name), Span::raw(value.to_string())]));
          }
        }

        if let Some(new_value) = &self.applied {
          lines.push(Line::raw(""));
          lines.push(Line::styled(
            format!("Moved to {}. The table view refreshes on the next load.", new_value),
            Style::default().fg(Color::Green),
          ));
        }
      }
      (None, Some(plate)) => lines.push(Line::styled(
        format!("No vehicle found with plate {}", plate),
        Style::default().fg(Color::Yellow),
      )),
      (None, None) => lines.push(Line::styled(
        "Type a plate and press Enter.",
        Style::default().fg(Color::DarkGray),
      )),
    }

    let location_missing = session
      .snapshot()
      .is_some_and(|s| !s.schema().has_location());
    if location_missing {
      lines.push(Line::raw(""));
      lines.push(Line::styled(
        "No location column found in the table; lookup only.",
        Style::default().fg(Color::Yellow),
      ));
    }

    if let (Some(record), Some(pending), Focus::Confirm) = (&self.record, &self.pending, self.focus) {
      lines.push(Line::raw(""));
      lines.push(Line::from(vec![
        Span::styled(
          format!(
            "Move {} from {} to {}? ",
            record.plate(),
            self.current_location().unwrap_or(NOT_SET),
            pending
          ),
          Style::default().fg(Color::Yellow).bold(),
        ),
        Span::styled("[y/n]", Style::default().fg(Color::Cyan)),
      ]));
    }

    frame.render_widget(
      Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
      area,
    );
  }

  fn render_changes(&self, frame: &mut Frame, area: Rect, session: &Session) {
    let entries = session.change_log().entries();
    let block = Block::default()
      .title(format!(" Changes this session ({}) ", entries.len()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if entries.is_empty() {
      let paragraph = Paragraph::new("No changes made in this session yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(EXPORT_HEADERS.iter().map(|h| Cell::from(*h)))
      .style(Style::default().fg(Color::Cyan).bold());
    // Newest first
    let rows: Vec<Row> = entries
      .iter()
      .rev()
      .map(|e| {
        Row::new(vec![
          Cell::from(e.timestamp().to_string()),
          Cell::from(e.plate().to_string()),
          Cell::from(truncate(e.previous(), 24)),
          Cell::from(truncate(e.new_value(), 24)),
          Cell::from(e.actor().to_string()),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(19),
        Constraint::Length(8),
        Constraint::Fill(1),
        Constraint::Fill(1),
        Constraint::Length(14),
      ],
    )
    .header(header)
    .block(block);
    frame.render_widget(table, area);
  }

  fn render_new_location(&self, frame: &mut Frame, area: Rect) {
    if self.focus != Focus::NewLocation {
      return;
    }
    let width = 50.min(area.width);
    let overlay = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(3) / 2,
      width,
      3.min(area.height),
    );
    frame.render_widget(Clear, overlay);

    let block = Block::default()
      .title(" New location ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let line = Line::from(vec![
      Span::raw(self.new_location.value().to_string()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(line).block(block), overlay);
  }
}

impl View for InventoryView {
  fn handle_key(&mut self, key: KeyEvent, session: &Session) -> ViewAction {
    match self.focus {
      Focus::Plate => self.handle_plate_key(key, session),
      Focus::Picker => self.handle_picker_key(key),
      Focus::NewLocation => self.handle_new_location_key(key),
      Focus::Confirm => self.handle_confirm_key(key),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, session: &Session) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),
        Constraint::Length(12),
        Constraint::Min(4),
      ])
      .split(area);

    self.render_search(frame, chunks[0]);
    self.render_card(frame, chunks[1], session);
    self.render_changes(frame, chunks[2], session);

    self.picker.render_overlay(frame, area);
    self.render_new_location(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match &self.record {
      Some(record) => format!("Inventory [{}]", record.plate()),
      None => "Inventory".to_string(),
    }
  }

  fn on_outcome(&mut self, outcome: &Outcome, session: &Session) {
    match outcome {
      Outcome::Found(record) => {
        self.record = Some(record.clone());
        self.missing = None;
        self.applied = None;
        self.pending = None;
      }
      Outcome::NotFound(plate) => {
        self.record = None;
        self.missing = Some(plate.clone());
        self.applied = None;
        self.pending = None;
      }
      Outcome::Applied(update) => {
        if self.record.as_ref().is_some_and(|r| r.id() == update.record_id) {
          self.applied = Some(update.new_value.clone());
        }
      }
      Outcome::Refreshed => {
        let fresh = self.record.as_ref().and_then(|current| {
          session
            .snapshot()
            .and_then(|s| s.record(current.id()))
            .cloned()
        });
        if fresh.is_some() {
          self.record = fresh;
          self.applied = None;
        }
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.focus == Focus::NewLocation
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    match self.focus {
      Focus::Plate => vec![
        Shortcut::new("enter", "search"),
        Shortcut::new("tab", "move"),
        Shortcut::new(":", "command"),
      ],
      Focus::Picker => vec![Shortcut::new("enter", "choose"), Shortcut::new("esc", "cancel")],
      Focus::NewLocation => vec![Shortcut::new("enter", "done"), Shortcut::new("esc", "cancel")],
      Focus::Confirm => vec![Shortcut::new("y", "apply"), Shortcut::new("n", "cancel")],
    }
  }
}
