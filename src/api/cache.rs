//! Cache keys and tags for the backend query operations.

use sha2::{Digest, Sha256};

use crate::cache::{QueryKey, Tag};

/// Typed cache keys for the read operations.
///
/// One variant per query endpoint; the parameters are part of the key so
/// different pages or filters cache independently.
#[derive(Clone, Debug)]
pub enum InvoiceQueryKey {
  /// Paginated invoice list.
  List {
    page: u32,
    per_page: u32,
    user_id: Option<String>,
  },
  /// Single invoice by id.
  Detail { id: String },
  /// Dashboard aggregates.
  Stats { user_id: Option<String> },
}

impl QueryKey for InvoiceQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::List {
        page,
        per_page,
        user_id,
      } => format!(
        "invoices:{}:{}:{}",
        page,
        per_page,
        user_id.as_deref().unwrap_or("")
      ),
      Self::Detail { id } => format!("invoice:{}", id),
      Self::Stats { user_id } => format!("stats:{}", user_id.as_deref().unwrap_or("")),
    };

    // SHA256 for stable, fixed-length keys.
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::List { page, user_id, .. } => match user_id {
        Some(user) => format!("invoices page {} for user {}", page, user),
        None => format!("invoices page {}", page),
      },
      Self::Detail { id } => format!("invoice {}", id),
      Self::Stats { user_id } => match user_id {
        Some(user) => format!("dashboard stats for user {}", user),
        None => "dashboard stats".to_string(),
      },
    }
  }

  fn tags(&self) -> Vec<Tag> {
    match self {
      Self::List { .. } => vec![Tag::Invoice],
      Self::Detail { id } => vec![Tag::InvoiceId(id.clone())],
      Self::Stats { .. } => vec![Tag::Dashboard],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_distinct_parameters_produce_distinct_hashes() {
    let a = InvoiceQueryKey::List {
      page: 1,
      per_page: 20,
      user_id: None,
    };
    let b = InvoiceQueryKey::List {
      page: 2,
      per_page: 20,
      user_id: None,
    };
    let c = InvoiceQueryKey::List {
      page: 1,
      per_page: 20,
      user_id: Some("u1".to_string()),
    };
    assert_ne!(a.cache_hash(), b.cache_hash());
    assert_ne!(a.cache_hash(), c.cache_hash());
  }

  #[test]
  fn test_same_parameters_hash_stably() {
    let a = InvoiceQueryKey::Detail {
      id: "abc".to_string(),
    };
    let b = InvoiceQueryKey::Detail {
      id: "abc".to_string(),
    };
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_tags_per_operation() {
    let list = InvoiceQueryKey::List {
      page: 1,
      per_page: 20,
      user_id: None,
    };
    assert_eq!(list.tags(), vec![Tag::Invoice]);

    let detail = InvoiceQueryKey::Detail {
      id: "abc".to_string(),
    };
    assert_eq!(detail.tags(), vec![Tag::InvoiceId("abc".to_string())]);

    let stats = InvoiceQueryKey::Stats { user_id: None };
    assert_eq!(stats.tags(), vec![Tag::Dashboard]);
  }
}
