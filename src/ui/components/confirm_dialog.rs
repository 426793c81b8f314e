use super::KeyResult;
use crate::mutation::{Decision, Mutation, PendingConfirmation};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no overlay in front of a destructive mutation.
///
/// Holds the [`PendingConfirmation`] and hands back the mutation only when
/// the user confirms.
#[derive(Debug, Default)]
pub struct ConfirmDialog {
  pending: Option<PendingConfirmation>,
}

impl ConfirmDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn show(&mut self, pending: PendingConfirmation) {
    self.pending = Some(pending);
  }

  /// `Event(Some(mutation))` on confirm, `Event(None)` on reject.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<Option<Mutation>> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }

    let decision = match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Decision::Confirm,
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        Decision::Reject
      }
      _ => return KeyResult::Handled,
    };

    match self.pending.take() {
      Some(pending) => KeyResult::Event(pending.decide(decision)),
      None => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(pending) = &self.pending else {
      return;
    };

    let width = (pending.prompt().len() as u16 + 6).clamp(30, 70).min(area.width);
    let height = 5.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let text = vec![
      Line::from(Span::raw(pending.prompt())),
      Line::from(""),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" confirm   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];

    let paragraph = Paragraph::new(text)
      .block(block)
      .wrap(Wrap { trim: true })
      .alignment(Alignment::Center);
    frame.render_widget(paragraph, overlay_area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::mutation::Submission;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn pending() -> PendingConfirmation {
    match (Mutation::DeleteUser {
      id: "usr-0004".to_string(),
    })
    .submit()
    {
      Submission::NeedsConfirmation(pending) => pending,
      Submission::Ready(_) => panic!("delete must ask first"),
    }
  }

  #[test]
  fn test_confirm_yields_mutation() {
    let mut dialog = ConfirmDialog::new();
    dialog.show(pending());
    assert_eq!(dialog.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert_eq!(
      dialog.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(Some(Mutation::DeleteUser {
        id: "usr-0004".to_string()
      }))
    );
    assert!(!dialog.is_active());
  }

  #[test]
  fn test_reject_yields_nothing() {
    let mut dialog = ConfirmDialog::new();
    dialog.show(pending());
    assert_eq!(dialog.handle_key(key(KeyCode::Esc)), KeyResult::Event(None));
    assert_eq!(dialog.handle_key(key(KeyCode::Esc)), KeyResult::NotHandled);
  }
}
