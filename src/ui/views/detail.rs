use super::ViewContext;
use crate::query::Query;
use crate::resources::Resource;
use crate::ui::renderfns::state_suffix;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Every field of a single entity, fetched by id.
pub struct DetailView<R: Resource> {
  id: String,
  query: Query<R>,
  scroll: u16,
}

impl<R: Resource> DetailView<R> {
  pub fn new(ctx: ViewContext, id: String) -> Self {
    let api = ctx.api.clone();
    let fetch_id = id.clone();
    let mut query = Query::new(move || R::fetch_one(api.clone(), fetch_id.clone()));
    query.fetch();
    Self { id, query, scroll: 0 }
  }

  fn lines(&self) -> Vec<Line<'static>> {
    if let Some(err) = self.query.error() {
      let message = if err.is_not_found() {
        format!("{} no longer exists", self.id)
      } else {
        format!("Failed to load {}: {}. Press 'r' to retry.", self.id, err)
      };
      return vec![Line::from(Span::styled(
        message,
        Style::default().fg(Color::Red),
      ))];
    }
    let Some(row) = self.query.data() else {
      return vec![Line::from(Span::styled(
        "Loading...",
        Style::default().fg(Color::DarkGray),
      ))];
    };

    let pairs = R::detail(row);
    let width = pairs.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    pairs
      .into_iter()
      .map(|(label, value)| {
        Line::from(vec![
          Span::styled(
            format!("{:>width$}  ", label, width = width),
            Style::default().fg(Color::Yellow),
          ),
          Span::raw(value),
        ])
      })
      .collect()
  }
}

impl<R: Resource> View for DetailView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let error = self.query.error().map(|e| e.to_string());
    let title = format!(
      " {} {}{} ",
      R::TITLE,
      self.id,
      state_suffix(self.query.is_loading(), error.as_deref())
    );
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let paragraph = Paragraph::new(self.lines())
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.id.clone()
  }

  fn tick(&mut self) {
    self.query.poll();
  }
}
