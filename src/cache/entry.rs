//! Cache entries and the typed snapshots views read from them.

use crate::api::ApiError;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Lifecycle state of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  /// Created but never fetched
  Idle,
  /// A fetch is in flight (previous rows, if any, are kept for display)
  Loading,
  Success,
  Error,
}

/// Row vector with its element type erased, so one cache can hold every resource.
pub(crate) type ErasedRows = Arc<dyn Any + Send + Sync>;

/// The stored result for one query key.
///
/// Completed fetches replace the whole entry; nothing mutates rows in place.
#[derive(Clone)]
pub struct CacheEntry {
  pub status: EntryStatus,
  pub(crate) rows: Option<ErasedRows>,
  pub total: Option<u64>,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub stale: bool,
}

impl CacheEntry {
  pub fn idle() -> Self {
    Self {
      status: EntryStatus::Idle,
      rows: None,
      total: None,
      error: None,
      fetched_at: None,
      stale: false,
    }
  }

  pub(crate) fn loaded(rows: ErasedRows, total: u64) -> Self {
    Self {
      status: EntryStatus::Success,
      rows: Some(rows),
      total: Some(total),
      error: None,
      fetched_at: Some(Utc::now()),
      stale: false,
    }
  }

  pub(crate) fn failed(error: ApiError) -> Self {
    Self {
      status: EntryStatus::Error,
      rows: None,
      total: None,
      error: Some(error),
      fetched_at: Some(Utc::now()),
      stale: false,
    }
  }

  /// Settled and trustworthy: can be served without a request.
  pub fn is_fresh(&self) -> bool {
    !self.stale && matches!(self.status, EntryStatus::Success | EntryStatus::Error)
  }

  /// Whether the stored rows are a `Vec<T>` (or there are no rows at all).
  pub(crate) fn holds<T: Send + Sync + 'static>(&self) -> bool {
    self.rows.as_ref().map_or(true, |rows| rows.is::<Vec<T>>())
  }

  /// Typed read view. Rows of a different type read as absent.
  pub fn snapshot<T: Send + Sync + 'static>(&self) -> Snapshot<T> {
    Snapshot {
      status: self.status,
      rows: self
        .rows
        .clone()
        .and_then(|rows| rows.downcast::<Vec<T>>().ok()),
      total: self.total,
      error: self.error.clone(),
      fetched_at: self.fetched_at,
      stale: self.stale,
    }
  }
}

impl fmt::Debug for CacheEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CacheEntry")
      .field("status", &self.status)
      .field("has_rows", &self.rows.is_some())
      .field("total", &self.total)
      .field("error", &self.error)
      .field("fetched_at", &self.fetched_at)
      .field("stale", &self.stale)
      .finish()
  }
}

/// What a view sees of a cache entry.
#[derive(Debug)]
pub struct Snapshot<T> {
  pub status: EntryStatus,
  pub rows: Option<Arc<Vec<T>>>,
  pub total: Option<u64>,
  pub error: Option<ApiError>,
  pub fetched_at: Option<DateTime<Utc>>,
  pub stale: bool,
}

// Manual impl: cloning only bumps the Arc, T itself need not be Clone.
impl<T> Clone for Snapshot<T> {
  fn clone(&self) -> Self {
    Self {
      status: self.status,
      rows: self.rows.clone(),
      total: self.total,
      error: self.error.clone(),
      fetched_at: self.fetched_at,
      stale: self.stale,
    }
  }
}

impl<T> Default for Snapshot<T> {
  fn default() -> Self {
    Self {
      status: EntryStatus::Idle,
      rows: None,
      total: None,
      error: None,
      fetched_at: None,
      stale: false,
    }
  }
}

impl<T> Snapshot<T> {
  pub fn rows(&self) -> &[T] {
    self.rows.as_ref().map(|r| r.as_slice()).unwrap_or(&[])
  }

  /// First row, for single-value queries (stats).
  pub fn first(&self) -> Option<&T> {
    self.rows().first()
  }

  pub fn is_loading(&self) -> bool {
    self.status == EntryStatus::Loading
  }

  #[cfg(test)]
  pub fn is_error(&self) -> bool {
    self.status == EntryStatus::Error
  }

  #[cfg(test)]
  pub fn is_success(&self) -> bool {
    self.status == EntryStatus::Success
  }

  pub fn mark_loading(&mut self) {
    self.status = EntryStatus::Loading;
  }

  /// Settle as failed, keeping whatever rows were shown before.
  pub fn mark_failed(&mut self, error: ApiError) {
    self.status = EntryStatus::Error;
    self.error = Some(error);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_snapshot_downcasts_rows() {
    let entry = CacheEntry::loaded(Arc::new(vec![1u32, 2, 3]), 3);
    let snap = entry.snapshot::<u32>();
    assert!(snap.is_success());
    assert_eq!(snap.rows(), &[1, 2, 3]);
    assert_eq!(snap.total, Some(3));
    assert!(entry.holds::<u32>());
  }

  #[test]
  fn test_wrong_type_reads_as_absent() {
    let entry = CacheEntry::loaded(Arc::new(vec!["a".to_string()]), 1);
    let snap = entry.snapshot::<u32>();
    assert!(snap.rows.is_none());
    assert!(!entry.holds::<u32>());
  }

  #[test]
  fn test_freshness() {
    assert!(!CacheEntry::idle().is_fresh());
    assert!(CacheEntry::failed(ApiError::transport("down")).is_fresh());

    let mut entry = CacheEntry::loaded(Arc::new(Vec::<u8>::new()), 0);
    assert!(entry.is_fresh());
    entry.stale = true;
    assert!(!entry.is_fresh());
  }
}
