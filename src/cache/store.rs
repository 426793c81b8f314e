//! The query cache: one entry per query key, at most one request in flight per key.

use crate::api::types::Page;
use crate::api::ApiError;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::entry::{CacheEntry, EntryStatus, ErasedRows, Snapshot};
use super::key::QueryKey;

type Loaded = Result<(ErasedRows, u64), ApiError>;
/// Fetch result plus whether it was invalidated while in flight
type Completed = (Loaded, bool);
type SharedFetch = Shared<BoxFuture<'static, Completed>>;

struct Slot {
  entry: CacheEntry,
  /// Pending fetch every concurrent caller attaches to
  inflight: Option<SharedFetch>,
  /// Live views watching this key
  observers: usize,
  /// Invalidated while the fetch was running: its result lands stale
  invalidated_in_flight: bool,
}

impl Slot {
  fn new() -> Self {
    Self {
      entry: CacheEntry::idle(),
      inflight: None,
      observers: 0,
      invalidated_in_flight: false,
    }
  }

  fn needs_fetch(&self) -> bool {
    self.inflight.is_none() && !self.entry.is_fresh()
  }

  /// Nothing would be lost by forgetting this slot.
  fn is_disposable(&self) -> bool {
    self.observers == 0 && self.inflight.is_none() && !self.entry.is_fresh()
  }
}

#[derive(Default)]
struct CacheState {
  slots: HashMap<QueryKey, Slot>,
}

/// Shared cache of list query results.
///
/// Cloning is cheap and every clone sees the same entries. Construct one per
/// application (or per test) and hand clones to the views that need it.
#[derive(Clone, Default)]
pub struct QueryCache {
  state: Arc<Mutex<CacheState>>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, CacheState> {
    // Slots are replaced wholesale, so a poisoned map is still consistent.
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Return the entry for `key`, fetching it with `loader` when missing or stale.
  ///
  /// A fresh entry is returned without awaiting anything. If a fetch for the
  /// key is already running, the caller attaches to it instead of issuing a
  /// second request. The loader runs as its own task, so it completes and
  /// populates the entry even if every caller stops waiting.
  pub async fn fetch<T, F, Fut>(&self, key: &QueryKey, loader: F) -> Snapshot<T>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
  {
    let pending = {
      let mut state = self.lock();
      let slot = state.slots.entry(key.clone()).or_insert_with(Slot::new);

      if slot.entry.is_fresh() && slot.entry.holds::<T>() {
        debug!(key = %key, "cache hit");
        return slot.entry.snapshot();
      }

      match &slot.inflight {
        Some(shared) => {
          debug!(key = %key, "joining in-flight fetch");
          shared.clone()
        }
        None => {
          debug!(key = %key, fingerprint = %key.fingerprint(), "cache miss, fetching");
          let shared = self.spawn_fetch(key.clone(), loader());
          slot.entry.status = EntryStatus::Loading;
          slot.invalidated_in_flight = false;
          slot.inflight = Some(shared.clone());
          shared
        }
      }
    };

    let (outcome, stale) = pending.await;
    {
      let state = self.lock();
      if let Some(slot) = state.slots.get(key) {
        if slot.inflight.is_none()
          && slot.entry.status != EntryStatus::Idle
          && slot.entry.holds::<T>()
        {
          return slot.entry.snapshot();
        }
      }
    }

    // Slot was removed (or refetching again) meanwhile: answer from the result itself
    let mut entry = match outcome {
      Ok((rows, total)) => CacheEntry::loaded(rows, total),
      Err(error) => CacheEntry::failed(error),
    };
    entry.stale = stale;
    entry.snapshot()
  }

  fn spawn_fetch<T, Fut>(&self, key: QueryKey, fetch: Fut) -> SharedFetch
  where
    T: Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
  {
    let cache = self.clone();
    let task_key = key.clone();
    let handle = tokio::spawn(async move {
      let result: Loaded = fetch
        .await
        .map(|page| (Arc::new(page.data) as ErasedRows, page.total));
      let stale = cache.complete(&task_key, &result);
      (result, stale)
    });

    let cache = self.clone();
    async move {
      match handle.await {
        Ok(completed) => completed,
        Err(join_error) => {
          let result = Err(ApiError::transport(format!("fetch task failed: {}", join_error)));
          let stale = cache.complete(&key, &result);
          (result, stale)
        }
      }
    }
    .boxed()
    .shared()
  }

  /// Atomically replace the entry with the fetch result. Returns whether
  /// the key was invalidated while the fetch ran.
  fn complete(&self, key: &QueryKey, result: &Loaded) -> bool {
    let mut state = self.lock();
    let Some(slot) = state.slots.get_mut(key) else {
      return false;
    };
    if slot.inflight.is_none() {
      // Already completed (task finished before a join error was reported)
      return slot.entry.stale;
    }

    let mut entry = match result {
      Ok((rows, total)) => CacheEntry::loaded(rows.clone(), *total),
      Err(error) => {
        warn!(key = %key, %error, "fetch failed");
        CacheEntry::failed(error.clone())
      }
    };
    let stale = slot.invalidated_in_flight;
    entry.stale = stale;
    slot.entry = entry;
    slot.inflight = None;
    slot.invalidated_in_flight = false;

    if slot.is_disposable() {
      state.slots.remove(key);
    }
    stale
  }

  /// Current entry for `key` as `T`, without fetching.
  pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Snapshot<T>> {
    let state = self.lock();
    let slot = state.slots.get(key)?;
    if !slot.entry.holds::<T>() {
      return None;
    }
    Some(slot.entry.snapshot())
  }

  /// Raw entry for `key`, if one exists.
  #[cfg(test)]
  pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
    self.lock().slots.get(key).map(|slot| slot.entry.clone())
  }

  /// Whether an observer of `key` should issue a fetch on its next pass:
  /// the entry is missing, idle or stale, and nothing is in flight.
  pub fn needs_fetch(&self, key: &QueryKey) -> bool {
    self.lock().slots.get(key).map_or(true, Slot::needs_fetch)
  }

  pub fn is_in_flight(&self, key: &QueryKey) -> bool {
    self
      .lock()
      .slots
      .get(key)
      .map_or(false, |slot| slot.inflight.is_some())
  }

  /// Number of entries currently held
  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.lock().slots.len()
  }

  /// Register a live view of `key`. The registration ends when the guard drops.
  pub fn observe(&self, key: &QueryKey) -> Observer {
    let mut state = self.lock();
    let slot = state.slots.entry(key.clone()).or_insert_with(Slot::new);
    slot.observers += 1;
    Observer {
      cache: self.clone(),
      key: key.clone(),
    }
  }

  fn release(&self, key: &QueryKey) {
    let mut state = self.lock();
    let Some(slot) = state.slots.get_mut(key) else {
      return;
    };
    slot.observers = slot.observers.saturating_sub(1);
    if slot.is_disposable() {
      state.slots.remove(key);
    }
  }

  /// Mark every entry whose resource matches `prefix` as stale.
  ///
  /// Observed entries stay (their views refetch on the next pass), entries
  /// with a fetch in flight land stale when it completes, and everything
  /// else is dropped. Returns the number of entries affected.
  pub fn invalidate(&self, prefix: &str) -> usize {
    self.invalidate_where(|key| key.matches_prefix(prefix), prefix)
  }

  /// Mark a single entry stale (explicit refresh).
  pub fn invalidate_key(&self, key: &QueryKey) -> usize {
    let label = key.to_string();
    self.invalidate_where(|k| k == key, &label)
  }

  fn invalidate_where(&self, matches: impl Fn(&QueryKey) -> bool, label: &str) -> usize {
    let mut state = self.lock();
    let mut marked = 0;
    let mut dropped = Vec::new();

    for (key, slot) in state.slots.iter_mut().filter(|(key, _)| matches(key)) {
      if slot.inflight.is_some() {
        slot.invalidated_in_flight = true;
        marked += 1;
      } else if slot.observers == 0 {
        dropped.push(key.clone());
      } else {
        slot.entry.stale = true;
        marked += 1;
      }
    }

    for key in &dropped {
      state.slots.remove(key);
    }

    info!(target = label, marked, dropped = dropped.len(), "cache invalidated");
    marked + dropped.len()
  }
}

/// Registration of a live view on one query key.
pub struct Observer {
  cache: QueryCache,
  key: QueryKey,
}

impl Observer {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl Drop for Observer {
  fn drop(&mut self) {
    self.cache.release(&self.key);
  }
}

impl std::fmt::Debug for Observer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Observer").field("key", &self.key).finish()
  }
}
