use super::utils::tone_style;
use crate::table::TablePresentation;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Paragraph, Row, Table, TableState};

/// Paint a [`TablePresentation`] inside `block`.
pub fn draw_table(
  frame: &mut Frame,
  area: Rect,
  block: Block,
  presentation: &TablePresentation,
  state: &mut TableState,
) {
  match presentation {
    TablePresentation::Loading => {
      let paragraph = Paragraph::new("Loading...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
    }
    TablePresentation::Empty(message) => {
      let paragraph = Paragraph::new(message.as_str())
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
    }
    TablePresentation::Rows {
      headers,
      widths,
      rows,
    } => {
      let header = Row::new(headers.iter().copied())
        .style(Style::default().fg(Color::Yellow).bold())
        .bottom_margin(0);

      let body: Vec<Row> = rows
        .iter()
        .map(|row| {
          Row::new(
            row
              .cells
              .iter()
              .map(|cell| Span::styled(cell.text.clone(), tone_style(cell.tone))),
          )
        })
        .collect();

      let constraints: Vec<Constraint> = widths.iter().map(|w| Constraint::Length(*w)).collect();

      let table = Table::new(body, constraints)
        .header(header)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

      frame.render_stateful_widget(table, area, state);
    }
  }
}
