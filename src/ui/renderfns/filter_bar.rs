use crate::resources::FilterField;
use crate::table::truncate;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::collections::BTreeMap;

/// One line showing every filter of a list and its current value.
///
/// Set filters are highlighted; unset ones read "all".
pub fn draw_filter_bar(
  frame: &mut Frame,
  area: Rect,
  fields: &[FilterField],
  values: &BTreeMap<String, String>,
) {
  frame.render_widget(Paragraph::new(filter_line(fields, values)), area);
}

fn filter_line(fields: &[FilterField], values: &BTreeMap<String, String>) -> Line<'static> {
  let mut spans = Vec::new();
  for (i, field) in fields.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" │ ", Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(
      format!("[{}] ", field.label),
      Style::default().fg(Color::Yellow),
    ));
    match values.get(field.name) {
      Some(value) => spans.push(Span::styled(
        format!(" {} ", truncate(value, 15)),
        Style::default().fg(Color::Black).bg(Color::Cyan),
      )),
      None => spans.push(Span::styled("all", Style::default().fg(Color::Gray))),
    }
  }
  Line::from(spans)
}
