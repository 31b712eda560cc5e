//! Cache storage trait and the in-memory implementation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use super::tags::Tag;

/// A single cached query result.
///
/// The value is kept serialized so the storage stays untyped; callers
/// decode through serde on the way out. `stale` flips when a mutation
/// declares an overlapping tag; a stale entry is never served as fresh.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Serialized query result.
  pub value: serde_json::Value,
  /// Tags the result provides.
  pub tags: Vec<Tag>,
  /// Set by tag invalidation; cleared when the entry is rewritten.
  pub stale: bool,
  /// When the entry was written.
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Operations are infallible: the only backend is in-memory, and a cache
/// that cannot be read is equivalent to a miss.
pub trait CacheStorage: Send + Sync {
  /// Look up an entry by key.
  fn get(&self, key: &str) -> Option<CacheEntry>;

  /// Write (or overwrite) an entry, clearing any staleness.
  fn put(&self, key: &str, value: serde_json::Value, tags: Vec<Tag>);

  /// Mark every entry with a tag overlapping `tags` as stale.
  /// Returns the number of entries touched.
  fn mark_stale(&self, tags: &[Tag]) -> usize;

  /// Drop a single entry.
  fn remove(&self, key: &str);

  /// Drop everything.
  fn clear(&self);
}

/// In-memory storage behind a plain mutex.
///
/// The lock is only held for map operations, never across an await point,
/// so contention is not a concern in the single-UI-thread event model.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries currently held (stale ones included).
  #[allow(dead_code)]
  pub fn len(&self) -> usize {
    self.entries.lock().map(|m| m.len()).unwrap_or(0)
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Option<CacheEntry> {
    self.entries.lock().ok()?.get(key).cloned()
  }

  fn put(&self, key: &str, value: serde_json::Value, tags: Vec<Tag>) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.insert(
        key.to_string(),
        CacheEntry {
          value,
          tags,
          stale: false,
          cached_at: Utc::now(),
        },
      );
    }
  }

  fn mark_stale(&self, tags: &[Tag]) -> usize {
    let mut touched = 0;
    if let Ok(mut entries) = self.entries.lock() {
      for entry in entries.values_mut() {
        if entry.stale {
          continue;
        }
        let overlaps = entry
          .tags
          .iter()
          .any(|provided| tags.iter().any(|t| provided.invalidated_by(t)));
        if overlaps {
          entry.stale = true;
          touched += 1;
        }
      }
    }
    touched
  }

  fn remove(&self, key: &str) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.remove(key);
    }
  }

  fn clear(&self) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_put_then_get() {
    let storage = MemoryStorage::new();
    storage.put("k", json!([1, 2, 3]), vec![Tag::Invoice]);

    let entry = storage.get("k").expect("entry should exist");
    assert_eq!(entry.value, json!([1, 2, 3]));
    assert!(!entry.stale);
  }

  #[test]
  fn test_mark_stale_by_overlapping_tag() {
    let storage = MemoryStorage::new();
    storage.put("list", json!([]), vec![Tag::Invoice]);
    storage.put("detail", json!({}), vec![Tag::InvoiceId("7".into())]);
    storage.put("stats", json!({}), vec![Tag::Dashboard]);

    let touched = storage.mark_stale(&[Tag::Invoice]);
    assert_eq!(touched, 2);

    assert!(storage.get("list").unwrap().stale);
    assert!(storage.get("detail").unwrap().stale);
    assert!(!storage.get("stats").unwrap().stale);
  }

  #[test]
  fn test_rewrite_clears_staleness() {
    let storage = MemoryStorage::new();
    storage.put("k", json!(1), vec![Tag::Dashboard]);
    storage.mark_stale(&[Tag::Dashboard]);
    assert!(storage.get("k").unwrap().stale);

    storage.put("k", json!(2), vec![Tag::Dashboard]);
    let entry = storage.get("k").unwrap();
    assert!(!entry.stale);
    assert_eq!(entry.value, json!(2));
  }

  #[test]
  fn test_already_stale_entries_not_recounted() {
    let storage = MemoryStorage::new();
    storage.put("k", json!(1), vec![Tag::Invoice]);
    assert_eq!(storage.mark_stale(&[Tag::Invoice]), 1);
    assert_eq!(storage.mark_stale(&[Tag::Invoice]), 0);
  }

  #[test]
  fn test_clear_drops_everything() {
    let storage = MemoryStorage::new();
    storage.put("a", json!(1), vec![Tag::Invoice]);
    storage.put("b", json!(2), vec![Tag::Dashboard]);
    storage.clear();
    assert_eq!(storage.len(), 0);
    assert!(storage.get("a").is_none());
  }
}
