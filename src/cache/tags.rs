//! Cache tags and the typed query key trait.

/// Tags describing what a cached result depends on.
///
/// Reads declare the tags they provide; mutations declare the tags they
/// invalidate. The bare `Invoice` tag covers the whole collection, so
/// invalidating it also hits every per-id entry, and invalidating a
/// single id hits the collection queries that contain it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
  /// Invoice collection queries (lists).
  Invoice,
  /// A single invoice by id.
  InvoiceId(String),
  /// Server-side dashboard aggregates.
  Dashboard,
}

impl Tag {
  /// Whether an entry providing `self` goes stale when `invalidated` is
  /// declared by a mutation.
  pub fn invalidated_by(&self, invalidated: &Tag) -> bool {
    match (self, invalidated) {
      (Tag::Dashboard, Tag::Dashboard) => true,
      // Bare type tag reaches the collection and every id under it.
      (Tag::Invoice, Tag::Invoice) => true,
      (Tag::InvoiceId(_), Tag::Invoice) => true,
      // An id tag reaches that id and the collection queries.
      (Tag::Invoice, Tag::InvoiceId(_)) => true,
      (Tag::InvoiceId(a), Tag::InvoiceId(b)) => a == b,
      _ => false,
    }
  }
}

/// Typed key for a cacheable read operation.
pub trait QueryKey {
  /// Stable hash identifying this query and its parameters.
  fn cache_hash(&self) -> String;

  /// Human-readable form for logging.
  fn description(&self) -> String;

  /// Tags the query's result provides.
  fn tags(&self) -> Vec<Tag>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bare_type_tag_reaches_all_ids() {
    assert!(Tag::InvoiceId("1".into()).invalidated_by(&Tag::Invoice));
    assert!(Tag::InvoiceId("2".into()).invalidated_by(&Tag::Invoice));
    assert!(Tag::Invoice.invalidated_by(&Tag::Invoice));
  }

  #[test]
  fn test_id_tag_reaches_same_id_and_collection() {
    assert!(Tag::InvoiceId("1".into()).invalidated_by(&Tag::InvoiceId("1".into())));
    assert!(Tag::Invoice.invalidated_by(&Tag::InvoiceId("1".into())));
    assert!(!Tag::InvoiceId("2".into()).invalidated_by(&Tag::InvoiceId("1".into())));
  }

  #[test]
  fn test_dashboard_is_independent() {
    assert!(Tag::Dashboard.invalidated_by(&Tag::Dashboard));
    assert!(!Tag::Dashboard.invalidated_by(&Tag::Invoice));
    assert!(!Tag::Invoice.invalidated_by(&Tag::Dashboard));
  }

  #[test]
  fn test_id_does_not_reach_dashboard() {
    assert!(!Tag::Dashboard.invalidated_by(&Tag::InvoiceId("1".into())));
  }
}
