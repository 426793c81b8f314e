use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{root_view, DashboardView, ViewContext};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// The `:` palette, drawn over whatever view is on top
  command: CommandInput,

  ctx: ViewContext,

  /// Shown in the header next to the app name
  title: String,

  /// Transient footer message, cleared on the next key press
  message: Option<String>,

  should_quit: bool,
}

impl App {
  pub fn new(ctx: ViewContext, title: String) -> Self {
    let root: Box<dyn View> = Box::new(DashboardView::new(ctx.clone()));
    Self {
      views: vec![root],
      command: CommandInput::new(),
      ctx,
      title,
      message: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!("dashboard started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    info!("dashboard stopped");

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {}
    }
  }

  fn tick(&mut self) {
    if let Some(view) = self.views.last_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    self.message = None;

    // Overlays inside the view own ':' while they are open
    let capturing = self.views.last().is_some_and(|v| v.is_capturing_input());
    if self.command.is_active() || !capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(name)) => {
          self.execute_command(name);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          self.message = Some(format!("Unknown command: {}", input));
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.views.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => {
        debug!(view = %next.breadcrumb_label(), "push view");
        self.views.push(next);
      }
      ViewAction::Pop => {
        // The root view stays; quitting is explicit
        if self.views.len() > 1 {
          self.views.pop();
        }
      }
    }
  }

  fn execute_command(&mut self, name: &str) {
    if name == "quit" {
      self.should_quit = true;
      return;
    }
    match root_view(name, &self.ctx) {
      Some(view) => {
        debug!(command = name, "replace root view");
        self.views = vec![view];
      }
      None => self.message = Some(format!("Unknown command: {}", name)),
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let breadcrumb = self.breadcrumb();
    let Some(view) = self.views.last_mut() else {
      return;
    };

    let context = view.context();
    draw_header(frame, chunks[0], &self.title, context.as_deref(), &view.shortcuts());
    view.render(frame, chunks[1]);

    let status = self.message.clone().or_else(|| view.status());
    draw_footer(frame, chunks[2], &breadcrumb, status.as_deref());

    let area = frame.area();
    self.command.render_overlay(frame, area);
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.views.iter().map(|v| v.breadcrumb_label()).collect()
  }
}
