//! Cache layer that orchestrates cached reads and invalidating mutations.

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::storage::CacheStorage;
use super::tags::{QueryKey, Tag};

/// Where a query result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from the network.
  Network,
  /// Served from a fresh cache entry, no network call issued.
  Cache,
}

/// Result of a cached read: the data plus its provenance.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

/// Cache layer sitting between the views and the network client.
///
/// Reads are cache-first: a fresh, non-stale entry is returned without a
/// network call; anything else fetches and rewrites the entry. Mutations
/// run their operation and, on success, mark every entry with an
/// overlapping tag stale *before* resolving, so a refetch queued behind a
/// mutation always observes backend state at-or-after it.
///
/// Identical in-flight reads (same key) are coalesced through a per-key
/// guard: later requesters wait, re-check the cache, and observe the
/// leading requester's resolution (its failure included) without issuing
/// a second call. Responses are not fenced by request generation beyond
/// this key-level de-duplication; a stale response can only land under
/// the key it was issued for.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  /// Per-key guards for in-flight coalescing. A guard is retired once
  /// the fetch that created it completes.
  inflight: Arc<tokio::sync::Mutex<HashMap<String, Arc<InflightSlot>>>>,
  /// How long a non-invalidated entry is served without refetching.
  stale_time: Duration,
}

/// Guard for one key's in-flight fetches. The mutex serializes fetches
/// for the key; a failed fetch parks its error here so requesters that
/// were already queued observe the same rejection.
struct InflightSlot {
  /// Completed fetch count under this guard. A waiter reads it before
  /// queuing, so it can tell whether a fetch finished while it waited.
  attempts: AtomicU64,
  guard: tokio::sync::Mutex<Option<SharedFailure>>,
}

struct SharedFailure {
  attempt: u64,
  error: Box<dyn Any + Send + Sync>,
}

impl InflightSlot {
  fn new() -> Self {
    Self {
      attempts: AtomicU64::new(0),
      guard: tokio::sync::Mutex::new(None),
    }
  }
}

impl<S: CacheStorage> CacheLayer<S> {
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      inflight: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
      stale_time: Duration::minutes(5),
    }
  }

  /// Set the time-based staleness window.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn expired(&self, cached_at: chrono::DateTime<Utc>) -> bool {
    Utc::now() - cached_at > self.stale_time
  }

  /// Serve a query cache-first, fetching on miss/staleness.
  pub async fn query<K, T, E, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>, E>
  where
    K: QueryKey,
    T: Serialize + DeserializeOwned,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let hash = key.cache_hash();

    if let Some(hit) = self.lookup::<T>(&hash, key) {
      return Ok(hit);
    }

    // Coalesce identical in-flight queries behind a per-key guard.
    let slot = {
      let mut inflight = self.inflight.lock().await;
      inflight
        .entry(hash.clone())
        .or_insert_with(|| Arc::new(InflightSlot::new()))
        .clone()
    };
    let seen = slot.attempts.load(Ordering::Acquire);
    let mut failure = slot.guard.lock().await;

    // Re-check: the leading requester may have filled the entry while we
    // waited on the guard.
    if let Some(hit) = self.lookup::<T>(&hash, key) {
      return Ok(hit);
    }

    // Or its fetch may have failed. A requester that was already queued
    // shares the rejection; a request arriving after the failure retries.
    if let Some(shared) = failure.as_ref() {
      if shared.attempt > seen {
        if let Some(error) = shared.error.downcast_ref::<E>() {
          debug!(query = %key.description(), "sharing failure with coalesced query");
          return Err(error.clone());
        }
      }
    }

    debug!(query = %key.description(), "cache miss, fetching");
    let result = fetcher().await;
    let attempt = slot.attempts.fetch_add(1, Ordering::AcqRel) + 1;

    let outcome = match result {
      Ok(data) => {
        *failure = None;
        match serde_json::to_value(&data) {
          Ok(value) => self.storage.put(&hash, value, key.tags()),
          // The result still flows to the caller, it just won't be cached.
          Err(e) => warn!(query = %key.description(), error = %e, "failed to serialize cache entry"),
        }
        Ok(CacheResult {
          data,
          source: CacheSource::Network,
        })
      }
      Err(error) => {
        *failure = Some(SharedFailure {
          attempt,
          error: Box::new(error.clone()),
        });
        Err(error)
      }
    };
    drop(failure);

    // Retire the guard. Requesters already queued hold their own handle
    // to it; anyone arriving from here on starts a fresh fetch.
    let mut inflight = self.inflight.lock().await;
    if let Some(current) = inflight.get(&hash) {
      if Arc::ptr_eq(current, &slot) {
        inflight.remove(&hash);
      }
    }

    outcome
  }

  /// Run a mutation and, on success, invalidate overlapping entries
  /// before the result is handed back.
  pub async fn mutate<T, E, F, Fut>(&self, invalidates: &[Tag], op: F) -> Result<T, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let result = op().await?;
    let touched = self.storage.mark_stale(invalidates);
    info!(?invalidates, touched, "mutation resolved, cache invalidated");
    Ok(result)
  }

  /// Mark every entry overlapping `tags` stale. Used for manual refresh.
  pub fn invalidate(&self, tags: &[Tag]) -> usize {
    let touched = self.storage.mark_stale(tags);
    debug!(?tags, touched, "manual invalidation");
    touched
  }

  fn lookup<T: DeserializeOwned>(&self, hash: &str, key: &impl QueryKey) -> Option<CacheResult<T>> {
    let entry = self.storage.get(hash)?;
    if entry.stale || self.expired(entry.cached_at) {
      return None;
    }
    match serde_json::from_value(entry.value) {
      Ok(data) => {
        debug!(query = %key.description(), "cache hit");
        Some(CacheResult {
          data,
          source: CacheSource::Cache,
        })
      }
      Err(e) => {
        // Shape drifted (shouldn't happen within one process); treat as
        // a miss rather than surfacing a decode error for cached data.
        warn!(query = %key.description(), error = %e, "evicting undecodable cache entry");
        self.storage.remove(hash);
        None
      }
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      inflight: Arc::clone(&self.inflight),
      stale_time: self.stale_time,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct TestKey {
    name: &'static str,
    tags: Vec<Tag>,
  }

  impl QueryKey for TestKey {
    fn cache_hash(&self) -> String {
      self.name.to_string()
    }

    fn description(&self) -> String {
      self.name.to_string()
    }

    fn tags(&self) -> Vec<Tag> {
      self.tags.clone()
    }
  }

  fn invoice_key() -> TestKey {
    TestKey {
      name: "invoices",
      tags: vec![Tag::Invoice],
    }
  }

  fn dashboard_key() -> TestKey {
    TestKey {
      name: "stats",
      tags: vec![Tag::Dashboard],
    }
  }

  #[tokio::test]
  async fn test_second_read_served_from_cache() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let first = layer
      .query(&invoice_key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec![1, 2, 3])
      })
      .await
      .unwrap();
    assert_eq!(first.source, CacheSource::Network);

    let second = layer
      .query(&invoice_key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec![9])
      })
      .await
      .unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, vec![1, 2, 3]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_mutation_forces_refetch_of_tagged_queries() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(vec![1])
    };
    layer.query(&invoice_key(), fetch).await.unwrap();

    layer
      .mutate(&[Tag::Invoice, Tag::Dashboard], || async {
        Ok::<_, String>(())
      })
      .await
      .unwrap();

    let after = layer.query(&invoice_key(), fetch).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_cache_intact() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(42u32)
    };
    layer.query(&dashboard_key(), fetch).await.unwrap();

    let err = layer
      .mutate(&[Tag::Dashboard], || async {
        Err::<(), _>("backend said no".to_string())
      })
      .await;
    assert!(err.is_err());

    let after = layer.query(&dashboard_key(), fetch).await.unwrap();
    assert_eq!(after.source, CacheSource::Cache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_unrelated_tags_survive_invalidation() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(1u32)
    };
    layer.query(&dashboard_key(), fetch).await.unwrap();

    layer
      .mutate(&[Tag::Invoice], || async { Ok::<_, String>(()) })
      .await
      .unwrap();

    let after = layer.query(&dashboard_key(), fetch).await.unwrap();
    assert_eq!(after.source, CacheSource::Cache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_identical_queries_coalesce() {
    let layer = Arc::new(CacheLayer::new(MemoryStorage::new()));
    let calls = Arc::new(AtomicU32::new(0));

    let slow_fetch = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Ok::<_, String>(7u32)
      }
    };

    let key_a = invoice_key();
    let key_b = invoice_key();
    let a = layer.query(&key_a, slow_fetch(calls.clone()));
    let b = layer.query(&key_b, slow_fetch(calls.clone()));
    let (ra, rb) = tokio::join!(a, b);

    assert_eq!(ra.unwrap().data, 7);
    assert_eq!(rb.unwrap().data, 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_concurrent_queries_share_the_failure() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = Arc::new(AtomicU32::new(0));

    let failing = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        Err::<u32, _>("backend down".to_string())
      }
    };

    let key_a = invoice_key();
    let key_b = invoice_key();
    let a = layer.query(&key_a, failing(calls.clone()));
    let b = layer.query(&key_b, failing(calls.clone()));
    let (ra, rb) = tokio::join!(a, b);

    assert_eq!(ra.unwrap_err(), "backend down");
    assert_eq!(rb.unwrap_err(), "backend down");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_query_retries_after_a_failure() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let err = layer
      .query(&invoice_key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<u32, _>("backend down".to_string())
      })
      .await;
    assert!(err.is_err());

    // The failure is only shared with queries that were already waiting.
    let after = layer
      .query(&invoice_key(), || async {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(3u32)
      })
      .await
      .unwrap();
    assert_eq!(after.data, 3);
    assert_eq!(after.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_inflight_guard_retired_after_fetch() {
    let layer = CacheLayer::new(MemoryStorage::new());

    layer
      .query(&invoice_key(), || async { Ok::<_, String>(1u32) })
      .await
      .unwrap();
    assert!(layer.inflight.lock().await.is_empty());

    let _ = layer
      .query(&dashboard_key(), || async {
        Err::<u32, _>("backend down".to_string())
      })
      .await;
    assert!(layer.inflight.lock().await.is_empty());
  }

  #[tokio::test]
  async fn test_manual_invalidation_forces_refetch() {
    let layer = CacheLayer::new(MemoryStorage::new());
    let calls = AtomicU32::new(0);

    let fetch = || async {
      calls.fetch_add(1, Ordering::SeqCst);
      Ok::<_, String>(1u32)
    };
    layer.query(&invoice_key(), fetch).await.unwrap();
    assert_eq!(layer.invalidate(&[Tag::Invoice]), 1);

    let after = layer.query(&invoice_key(), fetch).await.unwrap();
    assert_eq!(after.source, CacheSource::Network);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
