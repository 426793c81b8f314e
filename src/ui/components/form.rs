use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::resources::{FormField, FormValues};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the form overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  Submitted(FormValues),
  Cancelled,
}

/// Labelled text inputs for a create or edit form.
///
/// The form itself does no validation; the parent parses the submitted
/// values and reports problems back through [`FormOverlay::set_error`],
/// keeping the form open.
#[derive(Debug, Clone, Default)]
pub struct FormOverlay {
  title: String,
  fields: Vec<(FormField, TextInput)>,
  focused: usize,
  error: Option<String>,
}

impl FormOverlay {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    !self.fields.is_empty()
  }

  pub fn show(&mut self, title: impl Into<String>, fields: Vec<FormField>) {
    self.title = title.into();
    self.fields = fields
      .into_iter()
      .map(|f| {
        let input = TextInput::with_value(f.value.clone());
        (f, input)
      })
      .collect();
    self.focused = 0;
    self.error = None;
  }

  pub fn hide(&mut self) {
    self.fields.clear();
    self.error = None;
  }

  pub fn set_error(&mut self, error: impl Into<String>) {
    self.error = Some(error.into());
  }

  /// Current values by field name
  pub fn values(&self) -> FormValues {
    self
      .fields
      .iter()
      .map(|(field, input)| (field.name, input.value().to_string()))
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if !self.is_active() {
      return KeyResult::NotHandled;
    }

    let count = self.fields.len();
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focused = (self.focused + 1) % count;
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focused = (self.focused + count - 1) % count;
        return KeyResult::Handled;
      }
      _ => {}
    }

    let Some((_, input)) = self.fields.get_mut(self.focused) else {
      return KeyResult::Handled;
    };
    match input.handle_key(key) {
      InputResult::Submitted(_) => KeyResult::Event(FormEvent::Submitted(self.values())),
      InputResult::Cancelled => {
        self.hide();
        KeyResult::Event(FormEvent::Cancelled)
      }
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.is_active() {
      return;
    }

    let label_width = self
      .fields
      .iter()
      .map(|(f, _)| f.label.len())
      .max()
      .unwrap_or(8) as u16
      + 2;
    let width = (area.width * 70 / 100).clamp(40, 80).min(area.width);
    // fields + blank + error/help + borders
    let height = (self.fields.len() as u16 + 4).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let mut lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, (field, input))| {
        let focused = i == self.focused;
        let label_style = if focused {
          Style::default().fg(Color::Yellow).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![Span::styled(
          format!("{:>width$} ", field.label, width = label_width as usize),
          label_style,
        )];
        if focused {
          let (before, after) = input.split_at_cursor();
          spans.push(Span::raw(before.to_string()));
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
          spans.push(Span::raw(after.to_string()));
        } else {
          spans.push(Span::raw(input.value().to_string()));
        }
        Line::from(spans)
      })
      .collect();

    lines.push(Line::from(""));
    lines.push(match &self.error {
      Some(error) => Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))),
      None => Line::from(vec![
        Span::styled("<Tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" next  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Enter>", Style::default().fg(Color::Cyan)),
        Span::styled(" save  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    });

    frame.render_widget(Paragraph::new(lines).block(block), overlay_area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn form() -> FormOverlay {
    let mut form = FormOverlay::new();
    form.show(
      "New user",
      vec![
        FormField::new("email", "Email", ""),
        FormField::new("role", "Role", "customer"),
      ],
    );
    form
  }

  #[test]
  fn test_typing_goes_to_focused_field() {
    let mut form = form();
    for c in "a@b.c".chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Char('x')));

    let KeyResult::Event(FormEvent::Submitted(values)) = form.handle_key(key(KeyCode::Enter)) else {
      panic!("expected submit");
    };
    assert_eq!(values["email"], "a@b.c");
    assert_eq!(values["role"], "customerx");
    // Still open until the parent accepts the values
    assert!(form.is_active());
  }

  #[test]
  fn test_focus_wraps_backwards() {
    let mut form = form();
    form.handle_key(key(KeyCode::BackTab));
    form.handle_key(key(KeyCode::Backspace));
    assert_eq!(form.values()["role"], "custome");
  }

  #[test]
  fn test_escape_closes() {
    let mut form = form();
    form.set_error("email is required");
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
    assert!(!form.is_active());
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }
}
