//! Filter and pagination state of one list view.

use crate::api::types::ListParams;
use crate::cache::{FilterSnapshot, QueryKey};
use std::collections::BTreeMap;
use tracing::debug;

/// Active filters plus the current page of a list view.
///
/// Owned by exactly one view. The page is zero-based and the page size is
/// fixed for the lifetime of the controller, so `offset()` is always a
/// multiple of `limit()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListController {
  resource: &'static str,
  filters: BTreeMap<String, String>,
  page: u32,
  limit: u32,
}

impl ListController {
  pub fn new(resource: &'static str, limit: u32) -> Self {
    Self {
      resource,
      filters: BTreeMap::new(),
      page: 0,
      limit: limit.max(1),
    }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  pub fn offset(&self) -> u64 {
    u64::from(self.page) * u64::from(self.limit)
  }

  pub fn filters(&self) -> &BTreeMap<String, String> {
    &self.filters
  }

  pub fn filter(&self, field: &str) -> Option<&str> {
    self.filters.get(field).map(String::as_str)
  }

  pub fn has_filters(&self) -> bool {
    !self.filters.is_empty()
  }

  /// Set (or clear, with an empty value) one filter. Always returns to page 0.
  pub fn set_filter(&mut self, field: &str, value: &str) {
    let value = value.trim();
    if value.is_empty() {
      self.filters.remove(field);
    } else {
      self.filters.insert(field.to_string(), value.to_string());
    }
    self.page = 0;
    debug!(resource = self.resource, field, value, "filter changed");
  }

  /// Jump to `page`. Not clamped: callers bound it with [`Self::page_count`].
  pub fn set_page(&mut self, page: u32) {
    self.page = page;
  }

  /// Back to no filters on the first page. The page size is fixed.
  pub fn clear_filters(&mut self) {
    self.filters.clear();
    self.page = 0;
  }

  /// Number of displayable pages. An empty result still has page 0.
  pub fn page_count(&self, total: u64) -> u32 {
    let pages = total.div_ceil(u64::from(self.limit)).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
  }

  /// "Next" is enabled while rows remain past this page.
  pub fn has_next(&self, total: u64) -> bool {
    (u64::from(self.page) + 1) * u64::from(self.limit) < total
  }

  pub fn has_previous(&self) -> bool {
    self.page > 0
  }

  /// Advance one page if allowed. Returns whether the page changed.
  pub fn next_page(&mut self, total: u64) -> bool {
    if !self.has_next(total) {
      return false;
    }
    self.set_page(self.page + 1);
    true
  }

  pub fn previous_page(&mut self) -> bool {
    if !self.has_previous() {
      return false;
    }
    self.set_page(self.page - 1);
    true
  }

  /// Step back to the last page that still has rows once `total` shrank
  /// below the current offset. Returns whether the page changed.
  pub fn rebound(&mut self, total: u64) -> bool {
    if self.page == 0 || self.offset() < total {
      return false;
    }
    let last = self.page_count(total) - 1;
    debug!(resource = self.resource, from = self.page, to = last, total, "page rebound");
    self.page = last;
    true
  }

  /// 1-based inclusive row window of the current page, `None` when empty.
  pub fn window(&self, rows_on_page: usize, total: u64) -> Option<(u64, u64)> {
    if rows_on_page == 0 || total == 0 {
      return None;
    }
    let first = self.offset() + 1;
    let last = (self.offset() + rows_on_page as u64).min(total);
    Some((first, last))
  }

  pub fn snapshot(&self) -> FilterSnapshot {
    FilterSnapshot::from_filters(&self.filters)
  }

  /// Cache key of the page this controller currently points at.
  pub fn query_key(&self) -> QueryKey {
    QueryKey::new(self.resource, self.snapshot(), self.page, self.limit)
  }

  /// Request parameters for the current page.
  pub fn params(&self) -> ListParams {
    ListParams {
      limit: self.limit,
      offset: self.offset(),
      filters: self.filters.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pagination_bounds() {
    let mut list = ListController::new("vehicles", 10);
    assert_eq!(list.page_count(25), 3);

    let mut pages = vec![list.page()];
    while list.next_page(25) {
      pages.push(list.page());
    }
    assert_eq!(pages, vec![0, 1, 2]);

    // (page+1)*limit >= total disables next
    assert!(!list.has_next(25));
    assert!(list.has_previous());

    list.set_page(0);
    assert!(list.has_next(25));
    assert!(!list.has_previous());
    assert!(!list.previous_page());
  }

  #[test]
  fn test_exact_multiple_has_no_trailing_page() {
    let mut list = ListController::new("users", 10);
    assert_eq!(list.page_count(20), 2);
    list.set_page(1);
    assert!(!list.has_next(20));
  }

  #[test]
  fn test_empty_total_is_one_page() {
    let list = ListController::new("users", 10);
    assert_eq!(list.page_count(0), 1);
    assert!(!list.has_next(0));
    assert_eq!(list.window(0, 0), None);
  }

  #[test]
  fn test_offset_is_page_times_limit() {
    let mut list = ListController::new("bookings", 20);
    list.set_page(3);
    assert_eq!(list.offset(), 60);
    assert_eq!(list.params().offset, 60);
    assert_eq!(list.params().limit, 20);
  }

  #[test]
  fn test_filter_change_resets_page() {
    let mut list = ListController::new("bookings", 20);
    list.set_page(4);
    list.set_filter("status", "active");
    assert_eq!(list.page(), 0);
    assert_eq!(list.filter("status"), Some("active"));

    list.set_page(2);
    list.set_filter("status", "");
    assert_eq!(list.page(), 0);
    assert!(!list.has_filters());
  }

  #[test]
  fn test_empty_and_omitted_filters_share_a_key() {
    let mut a = ListController::new("bookings", 20);
    let b = ListController::new("bookings", 20);
    a.set_filter("user_id", "   ");
    assert_eq!(a.query_key(), b.query_key());

    a.set_filter("user_id", "usr-0001");
    assert_ne!(a.query_key(), b.query_key());
  }

  #[test]
  fn test_clear_filters_keeps_limit() {
    let mut list = ListController::new("notifications", 10);
    list.set_filter("user_id", "usr-0002");
    list.set_page(1);
    list.clear_filters();
    assert_eq!(list.page(), 0);
    assert_eq!(list.params().limit, 10);
    assert!(list.filters().is_empty());
  }

  #[test]
  fn test_rebound_after_last_row_deleted() {
    let mut list = ListController::new("vehicles", 10);
    list.set_page(2);
    // 21 rows: page 2 holds one row
    assert!(!list.rebound(21));
    assert_eq!(list.page(), 2);

    // that row got deleted
    assert!(list.rebound(20));
    assert_eq!(list.page(), 1);

    // everything got deleted
    list.set_page(3);
    assert!(list.rebound(0));
    assert_eq!(list.page(), 0);
    assert!(!list.rebound(0));
  }

  #[test]
  fn test_window() {
    let mut list = ListController::new("users", 10);
    list.set_page(2);
    assert_eq!(list.window(5, 25), Some((21, 25)));
  }
}
