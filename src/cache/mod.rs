//! Tag-invalidating cache for remote query results.
//!
//! This module keeps the screens consistent with each other: every read
//! operation is cached under a typed key, every result carries the tags it
//! provides, and every mutation declares the tags it invalidates. When a
//! mutation resolves, overlapping entries go stale and refetch on next
//! access.

mod layer;
mod storage;
mod tags;

pub use layer::{CacheLayer, CacheResult, CacheSource};
pub use storage::{CacheStorage, MemoryStorage};
pub use tags::{QueryKey, Tag};
