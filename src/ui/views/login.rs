use crate::session::{Operators, Session};
use crate::ui::clamp_selection;
use crate::ui::view::{Request, Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Operator selection; the root view while nobody is logged in
pub struct LoginView {
  operators: Vec<String>,
  list_state: ListState,
}

impl LoginView {
  pub fn new(operators: &Operators, preselect: Option<&str>) -> Self {
    let operators = operators.names().to_vec();
    let selected = preselect
      .and_then(|name| operators.iter().position(|o| o == name.trim()))
      .unwrap_or(0);

    let mut list_state = ListState::default();
    list_state.select(clamp_selection(Some(selected), operators.len()));

    Self {
      operators,
      list_state,
    }
  }

  fn selected_operator(&self) -> Option<&str> {
    self
      .list_state
      .selected()
      .and_then(|i| self.operators.get(i))
      .map(String::as_str)
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent, _session: &Session) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        let next = self.list_state.selected().map_or(0, |i| i + 1);
        self
          .list_state
          .select(clamp_selection(Some(next), self.operators.len()));
      }
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Enter => {
        if let Some(name) = self.selected_operator() {
          return ViewAction::Request(Request::Login(name.to_string()));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Request(Request::Quit),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, _session: &Session) {
    let len = self.operators.len();
    self
      .list_state
      .select(clamp_selection(self.list_state.selected(), len));

    let height = (len as u16 + 4).min(area.height);
    let width = 40.min(area.width);
    let boxed = Rect::new(
      area.x + area.width.saturating_sub(width) / 2,
      area.y + area.height.saturating_sub(height) / 3,
      width,
      height,
    );

    let block = Block::default()
      .title(" Who is working? ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(boxed);
    frame.render_widget(block, boxed);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let items: Vec<ListItem> = self
      .operators
      .iter()
      .map(|name| ListItem::new(Span::raw(name.as_str())))
      .collect();
    let list = List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

    let hint = Paragraph::new("Enter to log in")
      .alignment(Alignment::Center)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hint, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Login".to_string()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("enter", "log in"), Shortcut::new("q", "quit")]
  }
}
