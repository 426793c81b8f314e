use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::resources::FilterField;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the filter prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInputEvent {
  /// Apply `value` to the named filter; empty clears it
  Submitted { field: &'static str, value: String },
  Cancelled,
}

/// `/` prompt for the free-text server filters of a list.
///
/// Tab cycles through the text filters when a resource has several.
#[derive(Debug, Clone, Default)]
pub struct FilterInput {
  input: TextInput,
  active: bool,
  fields: Vec<FilterField>,
  current: usize,
}

impl FilterInput {
  /// Prompt over the text (non-choice) filters in `fields`
  pub fn new(fields: &[FilterField]) -> Self {
    Self {
      fields: fields.iter().filter(|f| !f.is_choice()).cloned().collect(),
      ..Self::default()
    }
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn has_fields(&self) -> bool {
    !self.fields.is_empty()
  }

  /// Open the prompt with the field's current value; `current` looks it up.
  pub fn activate(&mut self, current: impl Fn(&str) -> Option<String>) {
    let Some(field) = self.fields.first() else {
      return;
    };
    self.current = 0;
    self.input = TextInput::with_value(current(field.name).unwrap_or_default());
    self.active = true;
  }

  fn field(&self) -> Option<&FilterField> {
    self.fields.get(self.current)
  }

  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    current: impl Fn(&str) -> Option<String>,
  ) -> KeyResult<FilterInputEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    if key.code == KeyCode::Tab && self.fields.len() > 1 {
      self.current = (self.current + 1) % self.fields.len();
      let name = self.fields[self.current].name;
      self.input = TextInput::with_value(current(name).unwrap_or_default());
      return KeyResult::Handled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        match self.field() {
          Some(field) => KeyResult::Event(FilterInputEvent::Submitted {
            field: field.name,
            value: value.trim().to_string(),
          }),
          None => KeyResult::Event(FilterInputEvent::Cancelled),
        }
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(FilterInputEvent::Cancelled)
      }
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(field) = self.field().filter(|_| self.active) else {
      return;
    };

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(
      area.x + 1,
      area.y + 1,
      width.saturating_sub(1),
      3.min(area.height),
    );

    frame.render_widget(Clear, overlay_area);

    let title = if self.fields.len() > 1 {
      format!(" Filter: {} (Tab: next field) ", field.label)
    } else {
      format!(" Filter: {} ", field.label)
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before.to_string()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after.to_string()),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}
