use super::{stats_query, DetailView, HealthView, ResourceListView, ViewContext};
use crate::api::types::{Booking, Notification, Page, User, Vehicle};
use crate::cache::QueryKey;
use crate::query::CachedQuery;
use crate::resources::Resource;
use crate::table::{render_table, ColumnDescriptor, ColumnKey, Row};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_table, state_suffix};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, TableState};

/// Cache key of the running-bookings list shown on the dashboard
pub const ACTIVE_BOOKINGS: &str = "active-bookings";

/// One resource's stats record, polled through the cache.
trait StatsCard {
  fn title(&self) -> &'static str;
  fn poll(&mut self);
  fn refresh(&mut self);
  fn lines(&self) -> Vec<Line<'static>>;
}

struct ResourceStats<R: Resource> {
  query: CachedQuery<R::Stats>,
}

impl<R: Resource> ResourceStats<R> {
  fn boxed(ctx: &ViewContext) -> Box<dyn StatsCard> {
    Box::new(Self {
      query: stats_query::<R>(ctx),
    })
  }
}

impl<R: Resource> StatsCard for ResourceStats<R> {
  fn title(&self) -> &'static str {
    R::TITLE
  }

  fn poll(&mut self) {
    self.query.poll();
  }

  fn refresh(&mut self) {
    self.query.refresh();
  }

  fn lines(&self) -> Vec<Line<'static>> {
    if let Some(stats) = self.query.first() {
      return R::stats_line(stats)
        .split("  ")
        .map(|part| Line::from(format!(" {}", part)))
        .collect();
    }
    match self.query.error() {
      Some(err) => vec![Line::from(Span::styled(
        format!(" {}", err),
        Style::default().fg(Color::Red),
      ))],
      None => vec![Line::from(Span::styled(
        " loading...",
        Style::default().fg(Color::DarkGray),
      ))],
    }
  }
}

/// Landing view: stats for every resource plus the bookings running now.
pub struct DashboardView {
  ctx: ViewContext,
  cards: Vec<Box<dyn StatsCard>>,
  active: CachedQuery<Booking>,
  columns: Vec<ColumnDescriptor<Booking>>,
  table_state: TableState,
}

fn active_query(ctx: &ViewContext) -> CachedQuery<Booking> {
  let api = ctx.api.clone();
  let mut query = CachedQuery::new(&ctx.cache, QueryKey::resource(ACTIVE_BOOKINGS), move || {
    let api = api.clone();
    async move { api.active_bookings().await.map(Page::from_rows) }
  });
  query.fetch();
  query
}

impl DashboardView {
  pub fn new(ctx: ViewContext) -> Self {
    let cards = vec![
      ResourceStats::<User>::boxed(&ctx),
      ResourceStats::<Vehicle>::boxed(&ctx),
      ResourceStats::<Booking>::boxed(&ctx),
      ResourceStats::<Notification>::boxed(&ctx),
    ];
    let active = active_query(&ctx);
    // Row actions belong to the bookings list
    let columns = Booking::columns()
      .into_iter()
      .filter(|c| c.key != ColumnKey::Actions)
      .collect();

    Self {
      ctx,
      cards,
      active,
      columns,
      table_state: TableState::default(),
    }
  }

  fn move_selection(&mut self, down: bool) {
    let len = self.active.rows().len();
    if len == 0 {
      return;
    }
    let current = self.table_state.selected().unwrap_or(0);
    let next = if down {
      (current + 1).min(len - 1)
    } else {
      current.saturating_sub(1)
    };
    self.table_state.select(Some(next));
  }

  fn selected_booking(&self) -> Option<&Booking> {
    self
      .table_state
      .selected()
      .and_then(|i| self.active.rows().get(i))
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
      KeyCode::Char('r') => {
        for card in &mut self.cards {
          card.refresh();
        }
        self.active.refresh();
      }
      KeyCode::Char('1') => {
        return ViewAction::Push(Box::new(ResourceListView::<User>::new(self.ctx.clone())))
      }
      KeyCode::Char('2') => {
        return ViewAction::Push(Box::new(ResourceListView::<Vehicle>::new(self.ctx.clone())))
      }
      KeyCode::Char('3') => {
        return ViewAction::Push(Box::new(ResourceListView::<Booking>::new(self.ctx.clone())))
      }
      KeyCode::Char('4') => {
        return ViewAction::Push(Box::new(ResourceListView::<Notification>::new(
          self.ctx.clone(),
        )))
      }
      KeyCode::Char('h') => return ViewAction::Push(Box::new(HealthView::new(self.ctx.clone()))),
      KeyCode::Enter => {
        if let Some(booking) = self.selected_booking() {
          let detail = DetailView::<Booking>::new(self.ctx.clone(), booking.row_key());
          return ViewAction::Push(Box::new(detail));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(8), Constraint::Min(5)])
      .split(area);

    let card_areas = Layout::default()
      .direction(Direction::Horizontal)
      .constraints(vec![Constraint::Ratio(1, self.cards.len() as u32); self.cards.len()])
      .split(chunks[0]);
    for (i, (card, card_area)) in self.cards.iter().zip(card_areas.iter()).enumerate() {
      let block = Block::default()
        .title(format!(" {} {} ", i + 1, card.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
      frame.render_widget(Paragraph::new(card.lines()).block(block), *card_area);
    }

    let rows = self.active.rows();
    let presentation = render_table(
      rows,
      &self.columns,
      self.active.is_loading() && rows.is_empty(),
      "No bookings are running right now",
    );
    ensure_valid_selection(&mut self.table_state, presentation.row_count());

    let error = self.active.error().map(|e| e.to_string());
    let title = format!(
      " Active bookings ({}){} ",
      rows.len(),
      state_suffix(self.active.is_loading(), error.as_deref())
    );
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    draw_table(frame, chunks[1], block, &presentation, &mut self.table_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Dashboard".to_string()
  }

  fn tick(&mut self) {
    for card in &mut self.cards {
      card.poll();
    }
    self.active.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("1-4", "open list").with_priority(20),
      Shortcut::new("h", "health").with_priority(30),
      Shortcut::new("r", "refresh").with_priority(40),
      Shortcut::new("enter", "details").with_priority(50),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{BookingStatus, ListParams};
  use crate::api::{ApiClient, DemoBackend};
  use crate::cache::QueryCache;
  use crate::config::Config;
  use crate::mutation::Mutation;
  use std::sync::Arc;
  use std::time::Duration;

  fn context() -> ViewContext {
    ViewContext::new(
      ApiClient::with_transport(Arc::new(DemoBackend::seeded())),
      QueryCache::new(),
      Config::default(),
    )
  }

  async fn settle(view: &mut DashboardView) {
    for _ in 0..50 {
      view.tick();
      if !view.active.is_loading() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  }

  fn text(lines: &[Line]) -> String {
    lines
      .iter()
      .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
      .collect::<Vec<_>>()
      .join("\n")
  }

  #[tokio::test]
  async fn test_loads_stats_and_active_bookings() {
    let ctx = context();
    let expected = ctx.api.active_bookings().await.unwrap().len();

    let mut view = DashboardView::new(ctx);
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(view.active.rows().len(), expected);
    assert!(view.active.rows().iter().all(|b| b.status == BookingStatus::Active));
    assert!(text(&view.cards[0].lines()).contains("total 12"));
  }

  #[tokio::test]
  async fn test_cancel_elsewhere_refreshes_active_list() {
    let ctx = context();
    let mut view = DashboardView::new(ctx.clone());
    settle(&mut view).await;
    let before = view.active.rows().len();
    let target = view.active.rows()[0].id.clone();

    ctx
      .executor
      .execute(Mutation::CancelBooking { id: target.clone() })
      .await
      .unwrap();
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(view.active.rows().len(), before - 1);
    assert!(view.active.rows().iter().all(|b| b.id != target));

    let bookings = ctx.api.list_bookings(&ListParams::new(50, 0)).await.unwrap();
    let cancelled = bookings.data.iter().find(|b| b.id == target).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
  }
}
