use crate::table::Tone;
use ratatui::prelude::{Color, Style};

/// Display color for a cell tone
pub fn tone_color(tone: Tone) -> Color {
  match tone {
    Tone::Normal => Color::White,
    Tone::Muted => Color::DarkGray,
    Tone::Accent => Color::Cyan,
    Tone::Good => Color::Green,
    Tone::Warning => Color::Yellow,
    Tone::Bad => Color::Red,
  }
}

pub fn tone_style(tone: Tone) -> Style {
  Style::default().fg(tone_color(tone))
}

/// Block title suffix for a query's state
pub fn state_suffix(loading: bool, error: Option<&str>) -> String {
  match (loading, error) {
    (true, _) => " (loading...)".to_string(),
    (false, Some(error)) => format!(" (error: {})", error),
    (false, None) => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_tone_colors() {
    assert_eq!(tone_color(Tone::Good), Color::Green);
    assert_eq!(tone_color(Tone::Warning), Color::Yellow);
    assert_eq!(tone_color(Tone::Bad), Color::Red);
    assert_eq!(tone_color(Tone::Normal), Color::White);
  }

  #[test]
  fn test_state_suffix() {
    assert_eq!(state_suffix(true, Some("boom")), " (loading...)");
    assert_eq!(state_suffix(false, Some("boom")), " (error: boom)");
    assert_eq!(state_suffix(false, None), "");
  }
}
