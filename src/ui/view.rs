use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::session::Session;
use crate::snapshot::Record;
use crate::update::LocationUpdate;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Work a view asks the App to carry out against the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
  Login(String),
  Logout,
  Refresh,
  Search(String),
  ApplyLocation { record_id: String, location: String },
  ExportLog,
  Publish,
  Quit,
}

/// Result of a request, handed back to the view that asked for it.
#[derive(Debug, Clone)]
pub enum Outcome {
  Found(Record),
  NotFound(String),
  Applied(LocationUpdate),
  /// A fresh snapshot was fetched
  Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Info,
  Success,
  Warning,
  Error,
}

/// One-line status message shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub kind: NoticeKind,
  pub text: String,
}

impl Notice {
  pub fn info(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Info,
      text: text.into(),
    }
  }

  pub fn success(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Success,
      text: text.into(),
    }
  }

  pub fn warning(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Warning,
      text: text.into(),
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      kind: NoticeKind::Error,
      text: text.into(),
    }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Pop current view from stack (go back)
  Pop,
  /// Ask the App to run a session operation
  Request(Request),
  /// Show a message without doing anything else
  Notify(Notice),
}

/// Trait for view behavior
///
/// Views only read the session. Anything that talks to the inventory table
/// goes back to the App as a [`Request`], so each key press costs at most one
/// remote call.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, session: &Session) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, session: &Session);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Receive the result of a request this view made
  fn on_outcome(&mut self, _outcome: &Outcome, _session: &Session) {}

  /// Whether the view is taking free text, so `:` must not open the command line
  fn captures_input(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new(":", "command"), Shortcut::new("q", "back")]
  }
}
