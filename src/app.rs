use crate::commands::CommandKind;
use crate::config::Config;
use crate::error::InventoryError;
use crate::event::{Event, EventHandler};
use crate::remote::{Backend, RemoteTable};
use crate::session::{Operators, Session};
use crate::snapshot::normalize_plate;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{self, format_age, HeaderInfo};
use crate::ui::view::{Notice, Outcome, Request, View, ViewAction};
use crate::ui::views::{InventoryView, ListingView, LoginView};
use crate::update::UpdateCoordinator;
use chrono::{Local, Utc};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_TITLE: &str = "yardloc";

/// Main application state
pub struct App {
  /// Navigation stack - root is Login or Inventory
  view_stack: Vec<Box<dyn View>>,

  /// Command input component (handles : mode)
  command: CommandInput,

  title: String,
  operators: Operators,
  backend: Backend,
  coordinator: UpdateCoordinator,
  session: Session,

  /// Last status message, shown in the footer
  notice: Option<Notice>,

  /// Whether any load has succeeded since start
  connected: bool,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config, backend: Backend, preselect: Option<String>) -> Self {
    let operators = Operators::new(&config.authorized_users);
    let coordinator = UpdateCoordinator::new(
      config.audit.modified_by_field.clone(),
      config.audit.modified_at_field.clone(),
    );
    let session = Session::new(config.cache.ttl());
    let login = LoginView::new(&operators, preselect.as_deref());

    Self {
      view_stack: vec![Box::new(login)],
      command: CommandInput::new(),
      title: config.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
      operators,
      backend,
      coordinator,
      session,
      notice: Some(Notice::info("Choose your name to start")),
      connected: false,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal before any error is reported
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(event) => self.handle_event(event).await?,
        None => break,
      }
    }
    Ok(())
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // View
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let backend = self.backend.describe();
    let now = Utc::now();
    let cache = self.session.cache();
    let info = HeaderInfo {
      title: &self.title,
      backend: &backend,
      operator: self.session.operator(),
      age: cache.age_at(now).map(format_age),
      stale: cache.is_stale_at(now),
      live: self.backend.is_live(),
    };
    let shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    renderfns::draw_header(frame, chunks[0], &info, &shortcuts);

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1], &self.session);
    }

    let breadcrumb: Vec<String> = self.view_stack.iter().map(|v| v.breadcrumb_label()).collect();
    renderfns::draw_footer(frame, chunks[2], &breadcrumb, self.notice.as_ref());

    self.command.render_overlay(frame, chunks[1]);
  }

  async fn handle_event(&mut self, event: Event) -> Result<()> {
    match event {
      Event::Key(key) => self.handle_key(key).await,
      // Redraw happens on the next loop turn
      Event::Tick | Event::Resize => Ok(()),
    }
  }

  async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return Ok(());
    }

    let captures = self
      .view_stack
      .last()
      .is_some_and(|v| v.captures_input());
    if !captures || self.command.is_active() {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(kind)) => return self.run_command(kind).await,
        KeyResult::Event(CommandEvent::Unknown(text)) => {
          self.notice = Some(Notice::error(format!("Unknown command: {}", text)));
          return Ok(());
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return Ok(()),
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key, &self.session),
      None => ViewAction::None,
    };
    self.apply_action(action).await
  }

  async fn apply_action(&mut self, action: ViewAction) -> Result<()> {
    match action {
      ViewAction::None => {}
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }
      ViewAction::Request(request) => return self.execute(request).await,
      ViewAction::Notify(notice) => self.notice = Some(notice),
    }
    Ok(())
  }

  async fn run_command(&mut self, kind: CommandKind) -> Result<()> {
    let needs_login = !matches!(kind, CommandKind::Quit | CommandKind::Logout);
    if needs_login && !self.session.is_authenticated() {
      self.notice = Some(Notice::warning("Log in first"));
      return Ok(());
    }

    match kind {
      CommandKind::Inventory => {
        self.view_stack.truncate(1);
        Ok(())
      }
      CommandKind::Listing => {
        self.view_stack.truncate(1);
        self.view_stack.push(Box::new(ListingView::new()));
        self.load(false).await
      }
      CommandKind::Refresh => self.execute(Request::Refresh).await,
      CommandKind::Export => self.execute(Request::ExportLog).await,
      CommandKind::Publish => self.execute(Request::Publish).await,
      CommandKind::Logout => self.execute(Request::Logout).await,
      CommandKind::Quit => self.execute(Request::Quit).await,
    }
  }

  /// Carry out one request against the session, one remote call at most
  async fn execute(&mut self, request: Request) -> Result<()> {
    match request {
      Request::Login(name) => match self.session.login(&self.operators, &name) {
        Ok(()) => {
          self.view_stack = vec![Box::new(InventoryView::new())];
          self.notice = Some(Notice::success(format!("Welcome, {}", name.trim())));
          self.load(false).await?;
        }
        Err(e) => self.report(e)?,
      },
      Request::Logout => {
        self.session.logout();
        self.view_stack = vec![Box::new(LoginView::new(&self.operators, None))];
        self.notice = Some(Notice::info("Logged out"));
      }
      Request::Refresh => self.load(true).await?,
      Request::Search(plate) => match self.session.search(&self.backend, &plate).await {
        Ok(hit) => {
          self.notice = hit.refresh_error.map(|msg| {
            Notice::warning(format!("Showing cached data, refresh failed: {}", msg))
          });
          self.deliver(Outcome::Found(hit.record));
        }
        Err(InventoryError::RecordNotFound(_)) => {
          let plate = normalize_plate(&plate);
          self.notice = Some(Notice::warning(format!("No vehicle with plate {}", plate)));
          self.deliver(Outcome::NotFound(plate));
        }
        Err(e) => self.report(e)?,
      },
      Request::ApplyLocation {
        record_id,
        location,
      } => {
        let result = self
          .session
          .apply_location(
            &self.backend,
            &self.coordinator,
            &record_id,
            &location,
            Local::now(),
          )
          .await;
        match result {
          Ok(update) => {
            self.notice = Some(Notice::success(format!(
              "{} moved to {}. Data refreshes on the next load.",
              update.plate, update.new_value
            )));
            self.deliver(Outcome::Applied(update));
          }
          Err(e) => self.report(e)?,
        }
      }
      Request::ExportLog => self.export_log()?,
      Request::Publish => self.publish()?,
      Request::Quit => self.should_quit = true,
    }
    Ok(())
  }

  /// Load the snapshot. Failing before anything was ever loaded means the
  /// backend is unreachable, which ends the program.
  async fn load(&mut self, force: bool) -> Result<()> {
    match self.session.load(&self.backend, force).await {
      Ok(result) => {
        self.connected = true;
        debug!(source = ?result.source, captured = %result.cached_at, "snapshot ready");
        let snapshot = result.data;
        if !snapshot.schema().has_location() {
          self.notice = Some(Notice::warning(
            "No location column found; search works, updates are disabled",
          ));
        } else if force {
          self.notice = Some(Notice::success(format!(
            "Reloaded {} vehicles",
            snapshot.len()
          )));
        }
        self.deliver(Outcome::Refreshed);
        Ok(())
      }
      Err(InventoryError::Fetch(msg)) if !self.connected => {
        self.report(InventoryError::Connection(msg))
      }
      Err(e) => self.report(e),
    }
  }

  fn export_log(&mut self) -> Result<()> {
    if !self.session.is_authenticated() {
      self.notice = Some(Notice::warning("Log in first"));
      return Ok(());
    }
    let path = PathBuf::from(format!(
      "yardloc-changes-{}.csv",
      Local::now().format("%Y%m%d-%H%M%S")
    ));
    match self.session.change_log().export_to(&path) {
      Ok(()) => {
        let log = self.session.change_log();
        self.notice = Some(if log.is_empty() {
          Notice::info(format!("No changes yet, wrote headers only to {}", path.display()))
        } else {
          Notice::success(format!(
            "Exported {} changes to {}",
            log.len(),
            path.display()
          ))
        });
        Ok(())
      }
      Err(e) => self.report(e),
    }
  }

  fn publish(&mut self) -> Result<()> {
    let Some(csv) = self.backend.as_csv() else {
      self.notice = Some(Notice::info(
        "Airtable updates are already live, nothing to publish",
      ));
      return Ok(());
    };
    let path = PathBuf::from(format!(
      "yardloc-inventory-{}.csv",
      Local::now().format("%Y%m%d-%H%M%S")
    ));
    let edits = csv.pending_edits();
    match csv.publish(&path) {
      Ok(count) => {
        self.notice = Some(Notice::success(format!(
          "Wrote {} vehicles ({} edited) to {}",
          count,
          edits,
          path.display()
        )));
        Ok(())
      }
      Err(e) => self.report(e),
    }
  }

  fn deliver(&mut self, outcome: Outcome) {
    if let Some(view) = self.view_stack.last_mut() {
      view.on_outcome(&outcome, &self.session);
    }
  }

  /// Show a recoverable error in the footer; fatal ones end the loop.
  fn report(&mut self, error: InventoryError) -> Result<()> {
    if error.is_fatal() {
      return Err(error.into());
    }
    warn!(error = %error, "operation failed");
    self.notice = Some(Notice::error(error.to_string()));
    Ok(())
  }
}

impl Drop for App {
  fn drop(&mut self) {
    if let Some(operator) = self.session.operator() {
      info!(operator, changes = self.session.change_log().len(), "session closed");
    }
  }
}
