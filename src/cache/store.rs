//! In-memory query cache with request deduplication.
//!
//! Every cached query lives in a slot addressed by a [`ResourceKey`]. A read
//! returns the slot's value while it is fresh; otherwise it joins the fetch
//! already in flight for that key, or starts exactly one. Writes go through
//! [`QueryCache::mutate`], which marks the dependent slots stale on success.
//!
//! Each fetch and each invalidation takes a new sequence number for its slot.
//! A fetch only commits its result if its number is still the slot's current
//! one, so a response that was already in flight when the data changed never
//! overwrites the cache.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, trace};

use super::key::{KeySelector, ResourceKey};
use super::state::{CacheEntry, QueryState};
use crate::api::error::ApiError;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

/// Cache timing and retry policy.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
  /// How long a successful result is served without refetching.
  pub stale_time: Duration,
  /// How long an idle, unobserved slot is kept before eviction.
  pub retention: Duration,
  /// Default number of extra attempts for a failed read.
  pub read_retries: u32,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_time: Duration::minutes(5),
      retention: Duration::minutes(30),
      read_retries: 2,
    }
  }
}

/// Per-read overrides.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
  pub retries: Option<u32>,
}

impl ReadOptions {
  pub fn retries(retries: u32) -> Self {
    Self {
      retries: Some(retries),
    }
  }
}

struct Slot<T> {
  state: watch::Sender<QueryState<T>>,
  value: Option<T>,
  error: Option<ApiError>,
  created_at: DateTime<Utc>,
  fetched_at: Option<DateTime<Utc>>,
  stale: bool,
  seq: u64,
  in_flight: Option<SharedFetch<T>>,
}

impl<T: Clone> Slot<T> {
  fn new(now: DateTime<Utc>) -> Self {
    let (state, _) = watch::channel(QueryState::Idle);
    Self {
      state,
      value: None,
      error: None,
      created_at: now,
      fetched_at: None,
      stale: false,
      seq: 0,
      in_flight: None,
    }
  }

  fn fresh_value(&self, now: DateTime<Utc>, stale_time: Duration) -> Option<T> {
    if self.stale || self.error.is_some() {
      return None;
    }
    let fetched_at = self.fetched_at?;
    if now - fetched_at > stale_time {
      return None;
    }
    self.value.clone()
  }

  fn is_evictable(&self, now: DateTime<Utc>, retention: Duration) -> bool {
    let last_touched = self.fetched_at.unwrap_or(self.created_at);
    self.in_flight.is_none() && self.state.receiver_count() == 0 && now - last_touched > retention
  }

  fn snapshot(&self) -> CacheEntry<T> {
    CacheEntry {
      status: self.state.borrow().status(),
      value: self.value.clone(),
      error: self.error.clone(),
      last_fetched_at: self.fetched_at,
      stale: self.stale,
    }
  }
}

struct Inner<T> {
  slots: HashMap<ResourceKey, Slot<T>>,
  next_seq: u64,
}

impl<T: Clone> Inner<T> {
  fn evict_expired(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
    let before = self.slots.len();
    self.slots.retain(|_, slot| !slot.is_evictable(now, retention));
    before - self.slots.len()
  }
}

fn lock<T>(inner: &Mutex<Inner<T>>) -> MutexGuard<'_, Inner<T>> {
  // slots stay consistent even if a holder panicked
  inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keyed cache of query results.
///
/// Cheap to clone; clones share the same slots.
pub struct QueryCache<T> {
  inner: Arc<Mutex<Inner<T>>>,
  config: CacheConfig,
}

impl<T> Clone for QueryCache<T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      config: self.config,
    }
  }
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
  pub fn new(config: CacheConfig) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        slots: HashMap::new(),
        next_seq: 0,
      })),
      config,
    }
  }

  /// Read `key` with the default retry policy.
  pub async fn read<F, Fut>(&self, key: &ResourceKey, fetcher: F) -> Result<T, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.read_with(key, ReadOptions::default(), fetcher).await
  }

  /// Read `key`, fetching at most once for all concurrent callers.
  ///
  /// 1. Fresh value in cache: return it
  /// 2. Fetch already in flight: wait for it
  /// 3. Otherwise start a fetch, retrying failed attempts per `options`
  pub async fn read_with<F, Fut>(
    &self,
    key: &ResourceKey,
    options: ReadOptions,
    fetcher: F,
  ) -> Result<T, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let fetch = {
      let mut guard = lock(&self.inner);
      let now = Utc::now();
      guard.evict_expired(now, self.config.retention);

      let Inner { slots, next_seq } = &mut *guard;
      let slot = slots
        .entry(key.clone())
        .or_insert_with(|| Slot::new(now));

      if let Some(value) = slot.fresh_value(now, self.config.stale_time) {
        trace!(key = %key, "cache hit");
        return Ok(value);
      }

      match &slot.in_flight {
        Some(in_flight) => {
          debug!(key = %key, seq = slot.seq, "joining in-flight fetch");
          in_flight.clone()
        }
        None => {
          *next_seq += 1;
          let seq = *next_seq;
          let retries = options.retries.unwrap_or(self.config.read_retries);
          debug!(key = %key, seq, "cache miss, fetching");

          let fetch = self.start_fetch(key.clone(), seq, retries, fetcher);
          slot.seq = seq;
          slot.in_flight = Some(fetch.clone());
          slot.state.send_replace(QueryState::Loading);
          fetch
        }
      }
    };

    fetch.await
  }

  fn start_fetch<F, Fut>(&self, key: ResourceKey, seq: u64, retries: u32, fetcher: F) -> SharedFetch<T>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let inner = Arc::downgrade(&self.inner);
    async move {
      let result = fetch_with_retries(&key, retries, &fetcher).await;
      settle(&inner, &key, seq, &result);
      result
    }
    .boxed()
    .shared()
  }

  /// Mark matching slots stale. Returns how many slots were touched.
  ///
  /// Subscribers see `Loading`; fetches already in flight for those slots
  /// are superseded and will not commit.
  pub fn invalidate(&self, selector: &KeySelector) -> usize {
    let mut guard = lock(&self.inner);
    let Inner { slots, next_seq } = &mut *guard;

    let mut count = 0;
    for (_, slot) in slots.iter_mut().filter(|(key, _)| selector.matches(key)) {
      *next_seq += 1;
      slot.seq = *next_seq;
      slot.stale = true;
      slot.in_flight = None;
      slot.state.send_replace(QueryState::Loading);
      count += 1;
    }

    debug!(selector = %selector, count, "invalidated");
    count
  }

  /// Invalidate `key` and read it again.
  pub async fn refetch<F, Fut>(&self, key: &ResourceKey, fetcher: F) -> Result<T, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.invalidate(&KeySelector::Exact(key.clone()));
    self.read(key, fetcher).await
  }

  /// Like [`refetch`](Self::refetch), but drops the retained value first so
  /// a failure leaves nothing behind.
  pub async fn hard_refresh<F, Fut>(&self, key: &ResourceKey, fetcher: F) -> Result<T, ApiError>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if let Some(slot) = lock(&self.inner).slots.get_mut(key) {
      slot.value = None;
      slot.error = None;
    }
    self.refetch(key, fetcher).await
  }

  /// Run a write; on success invalidate every dependent selector.
  pub async fn mutate<R, Fut>(&self, dependents: &[KeySelector], op: Fut) -> Result<R, ApiError>
  where
    Fut: Future<Output = Result<R, ApiError>>,
  {
    let result = op.await;
    match &result {
      Ok(_) => {
        for selector in dependents {
          self.invalidate(selector);
        }
      }
      Err(e) => debug!(error = %e, "mutation failed, cache left untouched"),
    }
    result
  }

  /// Watch the state of `key`. Creates an idle slot if none exists.
  pub fn subscribe(&self, key: &ResourceKey) -> watch::Receiver<QueryState<T>> {
    let now = Utc::now();
    lock(&self.inner)
      .slots
      .entry(key.clone())
      .or_insert_with(|| Slot::new(now))
      .state
      .subscribe()
  }

  pub fn entry(&self, key: &ResourceKey) -> Option<CacheEntry<T>> {
    lock(&self.inner).slots.get(key).map(Slot::snapshot)
  }

  /// Drop idle, unobserved slots older than the retention window.
  pub fn evict_expired(&self) -> usize {
    let removed = lock(&self.inner).evict_expired(Utc::now(), self.config.retention);
    if removed > 0 {
      debug!(removed, "evicted expired cache entries");
    }
    removed
  }

  /// Drop every slot. Pending fetches finish but commit nowhere.
  pub fn clear(&self) {
    let mut guard = lock(&self.inner);
    debug!(entries = guard.slots.len(), "clearing cache");
    guard.slots.clear();
  }

  pub fn len(&self) -> usize {
    lock(&self.inner).slots.len()
  }
}

async fn fetch_with_retries<T, F, Fut>(key: &ResourceKey, retries: u32, fetcher: &F) -> Result<T, ApiError>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T, ApiError>>,
{
  let mut attempt = 0;
  loop {
    match fetcher().await {
      Ok(value) => return Ok(value),
      Err(e) if attempt < retries && e.is_retryable() => {
        attempt += 1;
        debug!(key = %key, attempt, error = %e, "fetch failed, retrying");
      }
      Err(e) => return Err(e),
    }
  }
}

fn settle<T: Clone>(
  inner: &Weak<Mutex<Inner<T>>>,
  key: &ResourceKey,
  seq: u64,
  result: &Result<T, ApiError>,
) {
  let Some(inner) = inner.upgrade() else {
    return;
  };
  let mut guard = lock(&inner);
  let Some(slot) = guard.slots.get_mut(key) else {
    return;
  };

  if slot.seq != seq {
    debug!(key = %key, seq, current = slot.seq, "discarding superseded fetch result");
    return;
  }

  slot.in_flight = None;
  match result {
    Ok(value) => {
      slot.value = Some(value.clone());
      slot.error = None;
      slot.stale = false;
      slot.fetched_at = Some(Utc::now());
      slot.state.send_replace(QueryState::Success(value.clone()));
    }
    Err(e) => {
      // keep the previous value around (stale-while-revalidate)
      slot.error = Some(e.clone());
      slot.state.send_replace(QueryState::Error(e.clone()));
    }
  }
}
