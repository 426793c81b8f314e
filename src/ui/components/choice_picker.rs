use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the choice picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoicePickerEvent {
  Selected(&'static str),
  Cancelled,
}

/// Centered list overlay for picking one of a fixed set of values
/// (a vehicle's next status, a booking status filter).
#[derive(Debug, Clone, Default)]
pub struct ChoicePicker {
  active: bool,
  choices: Vec<&'static str>,
  selected: usize,
  title: String,
}

impl ChoicePicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker, preselecting `current` when it is one of the choices
  pub fn show(
    &mut self,
    title: impl Into<String>,
    choices: Vec<&'static str>,
    current: Option<&str>,
  ) {
    self.selected = current
      .and_then(|c| choices.iter().position(|choice| *choice == c))
      .unwrap_or(0);
    self.active = !choices.is_empty();
    self.choices = choices;
    self.title = title.into();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.choices.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ChoicePickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(ChoicePickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = self.choices.get(self.selected).copied();
        self.hide();
        match choice {
          Some(choice) => KeyResult::Event(ChoicePickerEvent::Selected(choice)),
          None => KeyResult::Event(ChoicePickerEvent::Cancelled),
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.choices.is_empty() {
          self.selected = (self.selected + 1) % self.choices.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.choices.is_empty() {
          self.selected = (self.selected + self.choices.len() - 1) % self.choices.len();
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active || self.choices.is_empty() {
      return;
    }

    let widest = self
      .choices
      .iter()
      .map(|c| c.len())
      .chain(std::iter::once(self.title.len()))
      .max()
      .unwrap_or(10);
    let width = (widest as u16 + 6).max(20).min(area.width.saturating_sub(4));
    let height = (self.choices.len() as u16 + 2).max(3).min(area.height.saturating_sub(2));

    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = self
      .choices
      .iter()
      .map(|choice| ListItem::new(Span::styled(*choice, Style::default().fg(Color::Cyan))))
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_select_wraps() {
    let mut picker = ChoicePicker::new();
    picker.show("Status", vec!["available", "maintenance", "retired"], None);
    picker.handle_key(key(KeyCode::Char('k')));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(ChoicePickerEvent::Selected("retired"))
    );
    assert!(!picker.is_active());
  }

  #[test]
  fn test_preselects_current() {
    let mut picker = ChoicePicker::new();
    picker.show("Status", vec!["all", "pending", "active"], Some("active"));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(ChoicePickerEvent::Selected("active"))
    );
  }

  #[test]
  fn test_empty_choices_never_activate() {
    let mut picker = ChoicePicker::new();
    picker.show("Status", Vec::new(), None);
    assert!(!picker.is_active());
    assert_eq!(picker.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_modal_swallows_other_keys() {
    let mut picker = ChoicePicker::new();
    picker.show("Status", vec!["a"], None);
    assert_eq!(picker.handle_key(key(KeyCode::Char('d'))), KeyResult::Handled);
    assert_eq!(
      picker.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ChoicePickerEvent::Cancelled)
    );
  }
}
