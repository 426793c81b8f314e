use super::{stats_query, DetailView, ViewContext};
use crate::list::ListController;
use crate::mutation::{Mutation, MutationHandle, Submission};
use crate::query::CachedQuery;
use crate::resources::{FilterField, Resource};
use crate::table::{render_table, ColumnDescriptor, TablePresentation};
use crate::ui::components::{
  ChoicePicker, ChoicePickerEvent, ConfirmDialog, FilterInput, FilterInputEvent, FormEvent,
  FormOverlay, KeyResult,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{draw_filter_bar, draw_table, state_suffix};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, TableState};
use tracing::debug;

/// Picker entry that clears a choice filter
const ALL: &str = "all";

enum PickerPurpose<R> {
  Filter(&'static str),
  Status(R),
}

enum FormPurpose<R> {
  Create,
  Edit(R),
}

/// Paged, filterable table of one resource with its stats line and
/// row actions.
pub struct ResourceListView<R: Resource> {
  ctx: ViewContext,
  list: ListController,
  rows: CachedQuery<R>,
  stats: CachedQuery<R::Stats>,
  columns: Vec<ColumnDescriptor<R>>,
  filters: Vec<FilterField>,
  table_state: TableState,
  /// Entity id of the selected row, so selection survives refetches
  selected_key: Option<String>,
  filter_input: FilterInput,
  picker: ChoicePicker,
  picker_purpose: Option<PickerPurpose<R>>,
  form: FormOverlay,
  form_purpose: Option<FormPurpose<R>>,
  confirm: ConfirmDialog,
  running: Option<MutationHandle>,
  message: Option<String>,
}

fn page_query<R: Resource>(ctx: &ViewContext, list: &ListController) -> CachedQuery<R> {
  let api = ctx.api.clone();
  let params = list.params();
  let mut query = CachedQuery::new(&ctx.cache, list.query_key(), move || {
    R::fetch_page(api.clone(), params.clone())
  });
  query.fetch();
  query
}

impl<R: Resource> ResourceListView<R> {
  pub fn new(ctx: ViewContext) -> Self {
    let list = ListController::new(R::NAME, ctx.page_size(R::NAME));
    let rows = page_query::<R>(&ctx, &list);
    let stats = stats_query::<R>(&ctx);
    let filters = R::filters();
    let filter_input = FilterInput::new(&filters);

    Self {
      ctx,
      list,
      rows,
      stats,
      columns: R::columns(),
      filters,
      table_state: TableState::default(),
      selected_key: None,
      filter_input,
      picker: ChoicePicker::new(),
      picker_purpose: None,
      form: FormOverlay::new(),
      form_purpose: None,
      confirm: ConfirmDialog::new(),
      running: None,
      message: None,
    }
  }

  /// Point the rows query at the controller's current page
  fn reload(&mut self) {
    self.rows = page_query::<R>(&self.ctx, &self.list);
    self.sync_selection();
  }

  fn after_rows_changed(&mut self) {
    if !self.rows.is_loading() {
      if let Some(total) = self.rows.total() {
        if self.list.rebound(total) {
          self.reload();
          return;
        }
      }
    }
    self.sync_selection();
  }

  fn sync_selection(&mut self) {
    let presentation = self.presentation();
    let kept = self
      .selected_key
      .as_deref()
      .and_then(|key| presentation.position_of(key));
    if let Some(pos) = kept {
      self.table_state.select(Some(pos));
      return;
    }
    ensure_valid_selection(&mut self.table_state, presentation.row_count());
    self.selected_key = self
      .table_state
      .selected()
      .and_then(|i| presentation.key_at(i))
      .map(str::to_string);
  }

  fn move_selection(&mut self, down: bool) {
    let len = self.rows.rows().len();
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
    self.selected_key = self.rows.rows().get(next).map(|r| r.row_key());
  }

  fn selected_row(&self) -> Option<R> {
    self
      .table_state
      .selected()
      .and_then(|i| self.rows.rows().get(i))
      .cloned()
  }

  fn poll_mutation(&mut self) {
    let Some(handle) = &mut self.running else {
      return;
    };
    let Some(result) = handle.poll() else {
      return;
    };
    let operation = handle.descriptor().operation;
    self.running = None;
    self.message = Some(match result {
      Ok(outcome) => outcome.summary(),
      Err(err) => format!("{} failed: {}", operation, err),
    });
  }

  fn run(&mut self, mutation: Mutation) {
    match mutation.submit() {
      Submission::Ready(mutation) => self.start(mutation),
      Submission::NeedsConfirmation(pending) => self.confirm.show(pending),
    }
  }

  fn start(&mut self, mutation: Mutation) {
    if self.running.is_some() {
      self.message = Some("Another change is still running".to_string());
      return;
    }
    let descriptor = mutation.descriptor();
    debug!(operation = descriptor.operation, resource = descriptor.resource, "starting mutation");
    self.message = Some(format!("{} {}...", descriptor.operation, descriptor.resource));
    self.running = Some(self.ctx.executor.spawn(mutation));
  }

  /// Route keys to whichever overlay is open. Returns whether one took the key.
  fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
    match self.confirm.handle_key(key) {
      KeyResult::Event(Some(mutation)) => {
        self.start(mutation);
        return true;
      }
      KeyResult::Event(None) => {
        self.message = Some("Cancelled".to_string());
        return true;
      }
      KeyResult::Handled => return true,
      KeyResult::NotHandled => {}
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted(values)) => {
        self.submit_form(&values);
        return true;
      }
      KeyResult::Event(FormEvent::Cancelled) => {
        self.form_purpose = None;
        return true;
      }
      KeyResult::Handled => return true,
      KeyResult::NotHandled => {}
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(ChoicePickerEvent::Selected(choice)) => {
        self.apply_choice(choice);
        return true;
      }
      KeyResult::Event(ChoicePickerEvent::Cancelled) => {
        self.picker_purpose = None;
        return true;
      }
      KeyResult::Handled => return true,
      KeyResult::NotHandled => {}
    }

    let list = &self.list;
    match self
      .filter_input
      .handle_key(key, |name| list.filter(name).map(str::to_string))
    {
      KeyResult::Event(FilterInputEvent::Submitted { field, value }) => {
        self.list.set_filter(field, &value);
        self.reload();
        true
      }
      KeyResult::Event(FilterInputEvent::Cancelled) | KeyResult::Handled => true,
      KeyResult::NotHandled => false,
    }
  }

  fn submit_form(&mut self, values: &crate::resources::FormValues) {
    let result = match &self.form_purpose {
      Some(FormPurpose::Create) => R::build_create(values),
      Some(FormPurpose::Edit(row)) => R::build_edit(row, values),
      None => return,
    };
    match result {
      Ok(mutation) => {
        self.form.hide();
        self.form_purpose = None;
        self.run(mutation);
      }
      // The form stays open so the input can be corrected
      Err(err) => self.form.set_error(err),
    }
  }

  fn apply_choice(&mut self, choice: &'static str) {
    match self.picker_purpose.take() {
      Some(PickerPurpose::Filter(field)) => {
        let value = if choice == ALL { "" } else { choice };
        self.list.set_filter(field, value);
        self.reload();
      }
      Some(PickerPurpose::Status(row)) => match R::status_mutation(&row, choice) {
        Ok(mutation) => self.run(mutation),
        Err(err) => self.message = Some(err),
      },
      None => {}
    }
  }

  fn open_choice_filter(&mut self) {
    let Some(field) = self.filters.iter().find(|f| f.is_choice()) else {
      self.message = Some(format!("{} has no choice filters", R::TITLE));
      return;
    };
    let mut choices = vec![ALL];
    choices.extend(field.choices.iter().copied());
    let current = self.list.filter(field.name).unwrap_or(ALL);
    self
      .picker
      .show(format!("Filter by {}", field.label), choices, Some(current));
    self.picker_purpose = Some(PickerPurpose::Filter(field.name));
  }

  fn open_text_filter(&mut self) {
    if !self.filter_input.has_fields() {
      self.message = Some(format!("{} has no text filters", R::TITLE));
      return;
    }
    let list = &self.list;
    self
      .filter_input
      .activate(|name| list.filter(name).map(str::to_string));
  }

  fn open_create_form(&mut self) {
    match R::create_form() {
      Some(fields) => {
        self.form.show(format!("New {}", R::TITLE.to_lowercase()), fields);
        self.form_purpose = Some(FormPurpose::Create);
      }
      None => self.message = Some(format!("{} cannot be created here", R::TITLE)),
    }
  }

  fn open_edit_form(&mut self) {
    let Some(row) = self.selected_row() else {
      return;
    };
    match R::edit_form(&row) {
      Some(fields) => {
        self.form.show(format!("Edit {}", row.row_key()), fields);
        self.form_purpose = Some(FormPurpose::Edit(row));
      }
      None => self.message = Some(format!("{} cannot be edited", R::TITLE)),
    }
  }

  fn open_status_picker(&mut self) {
    let Some(row) = self.selected_row() else {
      return;
    };
    let choices = R::status_choices(&row);
    if choices.is_empty() {
      self.message = Some(format!("{} has no status to change", R::TITLE));
      return;
    }
    self
      .picker
      .show(format!("Status of {}", row.row_key()), choices, None);
    self.picker_purpose = Some(PickerPurpose::Status(row));
  }

  fn row_action(&mut self, key: char) {
    let Some(row) = self.selected_row() else {
      return;
    };
    let action = R::row_actions(&row).into_iter().find(|a| a.key() == key);
    match action.and_then(|action| R::action_mutation(&row, action)) {
      Some(mutation) => self.run(mutation),
      None => self.message = Some(format!("'{}' is not available for {}", key, row.row_key())),
    }
  }

  fn presentation(&self) -> TablePresentation {
    let rows = self.rows.rows();
    if rows.is_empty() {
      if let Some(err) = self.rows.error() {
        return TablePresentation::Empty(format!(
          "Failed to load {}: {}. Press 'r' to retry.",
          R::NAME,
          err
        ));
      }
    }
    render_table(
      rows,
      &self.columns,
      self.rows.is_loading() && rows.is_empty(),
      R::EMPTY_MESSAGE,
    )
  }

  fn window_label(&self) -> String {
    match self.rows.total() {
      Some(total) => match self.list.window(self.rows.rows().len(), total) {
        Some((first, last)) => format!("{}-{} of {}", first, last, total),
        None => format!("0 of {}", total),
      },
      None => "-".to_string(),
    }
  }

  fn render_stats(&self, frame: &mut Frame, area: Rect) {
    let line = match (self.stats.first(), self.stats.error()) {
      (Some(stats), _) => Line::from(Span::styled(
        format!(" {}", R::stats_line(stats)),
        Style::default().fg(Color::Gray),
      )),
      (None, Some(err)) => Line::from(Span::styled(
        format!(" stats unavailable: {}", err),
        Style::default().fg(Color::Red),
      )),
      (None, None) => Line::from(Span::styled(
        " loading stats...",
        Style::default().fg(Color::DarkGray),
      )),
    };
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_rows(&mut self, frame: &mut Frame, area: Rect) {
    let presentation = self.presentation();
    ensure_valid_selection(&mut self.table_state, presentation.row_count());

    let error = self.rows.error().map(|e| e.to_string());
    let title = format!(
      " {} [{}]{} ",
      R::TITLE,
      self.window_label(),
      state_suffix(self.rows.is_loading(), error.as_deref())
    );
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    draw_table(frame, area, block, &presentation, &mut self.table_state);
  }

  fn overlay_active(&self) -> bool {
    self.confirm.is_active()
      || self.form.is_active()
      || self.picker.is_active()
      || self.filter_input.is_active()
  }
}

impl<R: Resource> View for ResourceListView<R> {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.handle_overlay_key(key) {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
      KeyCode::Char('n') | KeyCode::Right => {
        if let Some(total) = self.rows.total() {
          if self.list.next_page(total) {
            self.reload();
          }
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if self.list.previous_page() {
          self.reload();
        }
      }
      KeyCode::Char('r') => {
        self.rows.refresh();
        self.stats.refresh();
      }
      KeyCode::Char('f') => self.open_choice_filter(),
      KeyCode::Char('/') => self.open_text_filter(),
      KeyCode::Char('F') => {
        if self.list.has_filters() {
          self.list.clear_filters();
          self.reload();
        }
      }
      KeyCode::Char('a') => self.open_create_form(),
      KeyCode::Char('e') => self.open_edit_form(),
      KeyCode::Char('s') => self.open_status_picker(),
      KeyCode::Char('S') => match R::bulk_mutation() {
        Some(mutation) => self.run(mutation),
        None => self.message = Some(format!("{} has no bulk action", R::TITLE)),
      },
      KeyCode::Char(c @ ('d' | 'c' | 'm')) => self.row_action(c),
      KeyCode::Enter => {
        if let Some(row) = self.selected_row() {
          let detail = DetailView::<R>::new(self.ctx.clone(), row.row_key());
          return ViewAction::Push(Box::new(detail));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let filter_height = if self.filters.is_empty() { 0 } else { 1 };
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Length(filter_height),
        Constraint::Min(3),
      ])
      .split(area);

    self.render_stats(frame, chunks[0]);
    if !self.filters.is_empty() {
      draw_filter_bar(frame, chunks[1], &self.filters, self.list.filters());
    }
    self.render_rows(frame, chunks[2]);

    self.filter_input.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
    self.form.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::TITLE.to_string()
  }

  fn context(&self) -> Option<String> {
    let total = self.rows.total()?;
    Some(format!(
      "page {}/{}",
      self.list.page() + 1,
      self.list.page_count(total)
    ))
  }

  fn tick(&mut self) {
    if self.rows.poll() {
      self.after_rows_changed();
    }
    self.stats.poll();
    self.poll_mutation();
  }

  fn is_capturing_input(&self) -> bool {
    self.overlay_active()
  }

  fn status(&self) -> Option<String> {
    self.message.clone()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    let mut shortcuts = vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("n/p", "page").with_priority(20),
      Shortcut::new("r", "refresh").with_priority(30),
      Shortcut::new("enter", "details").with_priority(40),
      Shortcut::new("q", "back").with_priority(90),
    ];
    if self.filters.iter().any(FilterField::is_choice) {
      shortcuts.push(Shortcut::new("f", "filter").with_priority(50));
    }
    if self.filter_input.has_fields() {
      shortcuts.push(Shortcut::new("/", "search").with_priority(51));
    }
    if R::create_form().is_some() {
      shortcuts.push(Shortcut::new("a", "add").with_priority(60));
    }
    if let Some(row) = self.selected_row() {
      for action in R::row_actions(&row) {
        shortcuts.push(Shortcut::new(action_key(action.key()), action.label()).with_priority(70));
      }
    }
    if R::bulk_mutation().is_some() {
      shortcuts.push(Shortcut::new("S", "send pending").with_priority(80));
    }
    shortcuts
  }
}

fn action_key(key: char) -> &'static str {
  match key {
    'e' => "e",
    'd' => "d",
    's' => "s",
    'c' => "c",
    'm' => "m",
    _ => "?",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::User;
  use crate::api::{ApiClient, DemoBackend};
  use crate::cache::QueryCache;
  use crate::config::Config;
  use crossterm::event::KeyModifiers;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn context(backend: Arc<DemoBackend>) -> ViewContext {
    ViewContext::new(
      ApiClient::with_transport(backend),
      QueryCache::new(),
      Config::default(),
    )
  }

  async fn settle<R: Resource>(view: &mut ResourceListView<R>) {
    for _ in 0..100 {
      view.tick();
      if !view.rows.is_loading() && !view.stats.is_loading() && view.running.is_none() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  }

  #[tokio::test]
  async fn test_pages_through_users() {
    let mut view = ResourceListView::<User>::new(context(Arc::new(DemoBackend::seeded())));
    settle(&mut view).await;

    assert_eq!(view.rows.rows().len(), 10);
    assert_eq!(view.context().as_deref(), Some("page 1/2"));
    assert_eq!(view.window_label(), "1-10 of 12");
    assert!(view.stats.first().is_some());

    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;
    assert_eq!(view.rows.rows().len(), 2);
    assert_eq!(view.window_label(), "11-12 of 12");

    // Already on the last page
    view.handle_key(key(KeyCode::Char('n')));
    assert_eq!(view.list.page(), 1);

    view.handle_key(key(KeyCode::Char('p')));
    settle(&mut view).await;
    assert_eq!(view.list.page(), 0);
  }

  #[tokio::test]
  async fn test_rebounds_when_last_page_empties() {
    let ctx = context(Arc::new(DemoBackend::seeded()));
    let mut view = ResourceListView::<User>::new(ctx.clone());
    settle(&mut view).await;
    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;

    let ids: Vec<String> = view.rows.rows().iter().map(|u| u.id.clone()).collect();
    for id in ids {
      ctx
        .executor
        .execute(Mutation::DeleteUser { id })
        .await
        .unwrap();
    }
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(view.list.page(), 0);
    assert_eq!(view.rows.rows().len(), 10);
    assert_eq!(view.rows.total(), Some(10));
  }

  #[tokio::test]
  async fn test_selection_follows_row_identity() {
    let ctx = context(Arc::new(DemoBackend::seeded()));
    let mut view = ResourceListView::<User>::new(ctx.clone());
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('j')));
    let selected = view.selected_key.clone().unwrap();
    let first = view.rows.rows()[0].id.clone();

    // Removing the first row shifts every position up by one
    ctx
      .executor
      .execute(Mutation::DeleteUser { id: first })
      .await
      .unwrap();
    settle(&mut view).await;

    assert_eq!(view.selected_key.as_deref(), Some(selected.as_str()));
    assert_eq!(view.table_state.selected(), Some(1));
  }

  #[tokio::test]
  async fn test_delete_asks_for_confirmation() {
    let mut view = ResourceListView::<User>::new(context(Arc::new(DemoBackend::seeded())));
    settle(&mut view).await;
    let target = view.selected_key.clone().unwrap();

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.is_capturing_input());
    assert!(view.running.is_none());

    view.handle_key(key(KeyCode::Char('n')));
    assert!(!view.is_capturing_input());
    assert_eq!(view.status().as_deref(), Some("Cancelled"));

    view.handle_key(key(KeyCode::Char('d')));
    view.handle_key(key(KeyCode::Char('y')));
    assert!(view.running.is_some());
    settle(&mut view).await;
    settle(&mut view).await;

    assert_eq!(view.rows.total(), Some(11));
    assert!(view.rows.rows().iter().all(|u| u.id != target));
  }

  #[tokio::test]
  async fn test_form_errors_keep_form_open() {
    let mut view = ResourceListView::<User>::new(context(Arc::new(DemoBackend::seeded())));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('a')));
    assert!(view.form.is_active());

    // Required fields are still empty
    view.handle_key(key(KeyCode::Enter));
    assert!(view.form.is_active());
    assert!(view.running.is_none());

    view.handle_key(key(KeyCode::Esc));
    assert!(!view.is_capturing_input());
  }

  #[tokio::test]
  async fn test_load_failure_shows_retry_hint() {
    let backend = Arc::new(DemoBackend::seeded());
    backend.fail_next(crate::api::ApiError::transport("connection refused"));
    let mut view = ResourceListView::<User>::new(context(backend));
    settle(&mut view).await;

    match view.presentation() {
      TablePresentation::Empty(message) => {
        assert!(message.contains("connection refused"));
        assert!(message.contains("Press 'r' to retry"));
      }
      other => panic!("unexpected presentation {:?}", other),
    }

    view.handle_key(key(KeyCode::Char('r')));
    settle(&mut view).await;
    assert_eq!(view.rows.rows().len(), 10);
  }
}
