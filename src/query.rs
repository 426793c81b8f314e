//! View-side queries: how views ask for data and notice when it arrives.
//!
//! [`Query<T>`] is a one-shot async fetch with its own state, used for data
//! that lives outside the cache (health probes, a single record on a detail
//! screen). [`CachedQuery<T>`] observes one [`QueryKey`] of the shared
//! [`QueryCache`] and refetches whenever that key goes stale.
//!
//! Both are polled from the event loop tick:
//!
//! ```ignore
//! let api = api.clone();
//! let mut query = Query::new(move || {
//!     let api = api.clone();
//!     async move { api.health().await }
//! });
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use crate::api::types::Page;
use crate::api::ApiError;
use crate::cache::{Observer, QueryCache, QueryKey, Snapshot};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Uncached async query with loading/success/error state.
///
/// The stale time doubles as a refresh interval: views that poll
/// periodically call [`Query::refetch_if_stale`] on every tick.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query around a closure that produces one fetch per call.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.state.error()
  }

  /// Settled for longer than the stale time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) | QueryState::Error(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching unless a fetch is already running.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch; a pending result is discarded.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Refetch once the current result is older than the stale time.
  pub fn refetch_if_stale(&mut self) -> bool {
    if !self.is_stale() {
      return false;
    }
    self.fetch();
    true
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error(ApiError::transport("query was cancelled"));
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

// ============================================================================
// Cached queries
// ============================================================================

type PageFuture<T> = Pin<Box<dyn Future<Output = Result<Page<T>, ApiError>> + Send>>;

type LoaderFn<T> = Arc<dyn Fn() -> PageFuture<T> + Send + Sync>;

/// A live view of one cache key.
///
/// Holds an [`Observer`] for as long as it exists, so invalidation marks the
/// key stale instead of dropping it, and the next [`CachedQuery::poll`]
/// issues the refetch.
pub struct CachedQuery<T> {
  cache: QueryCache,
  observer: Observer,
  loader: LoaderFn<T>,
  snapshot: Snapshot<T>,
  receiver: Option<mpsc::UnboundedReceiver<Snapshot<T>>>,
}

impl<T: Send + Sync + 'static> CachedQuery<T> {
  /// Observe `key`, loading it with `loader` whenever it is missing or stale.
  pub fn new<F, Fut>(cache: &QueryCache, key: QueryKey, loader: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, ApiError>> + Send + 'static,
  {
    let observer = cache.observe(&key);
    Self {
      cache: cache.clone(),
      observer,
      loader: Arc::new(move || Box::pin(loader())),
      snapshot: Snapshot::default(),
      receiver: None,
    }
  }

  pub fn key(&self) -> &QueryKey {
    self.observer.key()
  }

  pub fn snapshot(&self) -> &Snapshot<T> {
    &self.snapshot
  }

  pub fn rows(&self) -> &[T] {
    self.snapshot.rows()
  }

  pub fn first(&self) -> Option<&T> {
    self.snapshot.first()
  }

  pub fn total(&self) -> Option<u64> {
    self.snapshot.total
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.snapshot.error.as_ref()
  }

  pub fn is_loading(&self) -> bool {
    self.receiver.is_some() || self.snapshot.is_loading()
  }

  /// Read the key through the cache.
  ///
  /// A fresh entry is adopted immediately; otherwise the fetch runs in the
  /// background and the result is picked up by [`Self::poll`].
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }

    let key = self.key().clone();
    if !self.cache.needs_fetch(&key) && !self.cache.is_in_flight(&key) {
      if let Some(snapshot) = self.cache.peek::<T>(&key) {
        self.snapshot = snapshot;
        return;
      }
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.snapshot.mark_loading();

    let cache = self.cache.clone();
    let loader = self.loader.clone();
    tokio::spawn(async move {
      let snapshot = cache.fetch(&key, move || loader()).await;
      let _ = tx.send(snapshot);
    });
  }

  /// Explicit refresh: drop trust in the current entry and refetch it.
  pub fn refresh(&mut self) {
    self.cache.invalidate_key(self.observer.key());
    self.receiver = None;
    self.fetch();
  }

  /// Pick up a finished fetch, or start one if the key went stale.
  ///
  /// Returns `true` if what the view should paint changed.
  pub fn poll(&mut self) -> bool {
    if let Some(receiver) = &mut self.receiver {
      return match receiver.try_recv() {
        Ok(snapshot) => {
          self.snapshot = snapshot;
          self.receiver = None;
          // Invalidated while in flight: go again right away
          if self.cache.needs_fetch(self.observer.key()) {
            self.fetch();
          }
          true
        }
        Err(mpsc::error::TryRecvError::Empty) => false,
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.receiver = None;
          self
            .snapshot
            .mark_failed(ApiError::transport("query was cancelled"));
          true
        }
      };
    }

    if self.cache.needs_fetch(self.observer.key()) {
      self.fetch();
      return true;
    }

    // Another view may have refreshed the same key
    if let Some(current) = self.cache.peek::<T>(self.observer.key()) {
      if current.fetched_at != self.snapshot.fetched_at && !current.is_loading() {
        self.snapshot = current;
        return true;
      }
    }
    false
  }
}

impl<T> std::fmt::Debug for CachedQuery<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CachedQuery")
      .field("key", self.observer.key())
      .field("status", &self.snapshot.status)
      .field("pending", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ErrorKind;
  use crate::api::types::User;
  use crate::api::{ApiClient, DemoBackend};
  use crate::cache::FilterSnapshot;
  use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, ApiError>(vec![1, 2, 3]) });

    assert!(matches!(query.state, QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
    assert!(query.error().is_none());
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> =
      Query::new(|| async { Err(ApiError::from_status(500, "Something went wrong")) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.data().is_none());
    let error = query.error().unwrap();
    assert_eq!(error.kind, ErrorKind::Server);
    assert_eq!(error.message, "Something went wrong");
  }

  #[tokio::test]
  async fn test_query_stale_triggers_refetch() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move { Ok::<_, ApiError>(counter.fetch_add(1, Ordering::SeqCst)) }
    })
    .with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_stale());

    assert!(query.refetch_if_stale());
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, ApiError>(42)
    });

    query.fetch();
    assert!(query.is_loading());
    query.fetch();
    assert!(query.is_loading());
    assert!(!query.refetch_if_stale());
  }

  #[tokio::test]
  async fn test_refetch_cancels_pending() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ApiError>(counter.fetch_add(1, Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  fn users_key() -> QueryKey {
    QueryKey::new("users", FilterSnapshot::default(), 0, 10)
  }

  fn users_query(cache: &QueryCache, api: &ApiClient) -> CachedQuery<User> {
    let api = api.clone();
    CachedQuery::new(cache, users_key(), move || {
      let api = api.clone();
      async move {
        api
          .list_users(&crate::api::types::ListParams::new(10, 0))
          .await
      }
    })
  }

  async fn settle<T: Send + Sync + 'static>(query: &mut CachedQuery<T>) {
    for _ in 0..50 {
      query.poll();
      if !query.is_loading() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(5)).await;
    }
  }

  #[tokio::test]
  async fn test_cached_query_loads_through_cache() {
    let backend = Arc::new(DemoBackend::seeded());
    let api = ApiClient::with_transport(backend.clone());
    let cache = QueryCache::new();

    let mut query = users_query(&cache, &api);
    query.fetch();
    assert!(query.is_loading());
    settle(&mut query).await;

    assert_eq!(query.rows().len(), 10);
    assert_eq!(query.total(), Some(12));

    // A second observer of the same key is served synchronously
    let mut other = users_query(&cache, &api);
    other.fetch();
    assert!(!other.is_loading());
    assert_eq!(other.total(), Some(12));
    assert_eq!(backend.request_count(), 1);
  }

  #[tokio::test]
  async fn test_cached_query_refetches_after_invalidate() {
    let backend = Arc::new(DemoBackend::seeded());
    let api = ApiClient::with_transport(backend.clone());
    let cache = QueryCache::new();

    let mut query = users_query(&cache, &api);
    query.fetch();
    settle(&mut query).await;
    assert_eq!(backend.request_count(), 1);

    cache.invalidate("users");
    assert!(query.poll());
    settle(&mut query).await;
    assert_eq!(backend.request_count(), 2);
    assert!(!query.snapshot().stale);
  }

  #[tokio::test]
  async fn test_cached_query_keeps_error_until_refresh() {
    let backend = Arc::new(DemoBackend::seeded());
    let api = ApiClient::with_transport(backend.clone());
    let cache = QueryCache::new();
    backend.fail_next(ApiError::from_status(503, "down for maintenance"));

    let mut query = users_query(&cache, &api);
    query.fetch();
    settle(&mut query).await;
    assert_eq!(query.error().map(|e| e.message.as_str()), Some("down for maintenance"));

    // No automatic retry
    assert!(!query.poll());
    assert_eq!(backend.request_count(), 1);

    query.refresh();
    settle(&mut query).await;
    assert!(query.error().is_none());
    assert_eq!(query.total(), Some(12));
  }

  #[tokio::test]
  async fn test_cached_query_lost_fetch_settles_as_error() {
    let backend = Arc::new(DemoBackend::seeded());
    let api = ApiClient::with_transport(backend);
    let cache = QueryCache::new();
    let mut query = users_query(&cache, &api);

    // Fetch task went away without answering
    let (tx, rx) = mpsc::unbounded_channel();
    drop(tx);
    query.receiver = Some(rx);
    query.snapshot.mark_loading();

    assert!(query.poll());
    assert!(!query.is_loading());
    assert!(query.snapshot().is_error());
    assert_eq!(
      query.error().map(|e| e.message.as_str()),
      Some("query was cancelled")
    );
  }

  #[tokio::test]
  async fn test_concurrent_observers_share_one_request() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = QueryCache::new();
    let make = |calls: Arc<AtomicUsize>| {
      CachedQuery::new(&cache, users_key(), move || {
        let calls = calls.clone();
        async move {
          calls.fetch_add(1, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok(Page::single(7u8))
        }
      })
    };

    let mut a = make(calls.clone());
    let mut b = make(calls.clone());
    a.fetch();
    b.fetch();
    settle(&mut a).await;
    settle(&mut b).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.first(), Some(&7));
    assert_eq!(b.first(), Some(&7));
  }
}
