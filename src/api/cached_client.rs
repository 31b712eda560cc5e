//! Cached API client: the inner client behind the tag-invalidating cache.
//!
//! Reads go through `CacheLayer::query` under a typed key; the two
//! invoice mutations (analyze, delete) go through `CacheLayer::mutate`
//! declaring `Invoice` + `Dashboard`, so list, detail, and dashboard
//! screens refetch after either. Profile calls are not cached.

use crate::api::cache::InvoiceQueryKey;
use crate::api::client::{AnalyzeSource, ApiClient, Session};
use crate::api::error::ApiError;
use crate::api::types::{DashboardStats, FileRef, Invoice, InvoicePage};
use crate::cache::{CacheLayer, MemoryStorage, Tag};

/// API client with transparent caching and tag invalidation.
#[derive(Clone)]
pub struct CachedApiClient {
  inner: ApiClient,
  cache: CacheLayer<MemoryStorage>,
}

impl CachedApiClient {
  pub fn new(inner: ApiClient) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(MemoryStorage::new()),
    }
  }

  /// Paginated invoice list, cached under (page, per_page, user).
  pub async fn list_invoices(
    &self,
    session: &Session,
    page: u32,
    per_page: u32,
  ) -> Result<InvoicePage, ApiError> {
    let key = InvoiceQueryKey::List {
      page,
      per_page,
      user_id: session.user_id.clone(),
    };

    let result = self
      .cache
      .query(&key, || {
        let inner = self.inner.clone();
        let session = session.clone();
        async move {
          inner
            .list_invoices(&session, page, per_page, session.user_id.as_deref())
            .await
        }
      })
      .await?;

    Ok(result.data)
  }

  /// Single invoice by id, cached per id.
  pub async fn get_invoice(&self, session: &Session, id: &str) -> Result<Invoice, ApiError> {
    let key = InvoiceQueryKey::Detail { id: id.to_string() };

    let result = self
      .cache
      .query(&key, || {
        let inner = self.inner.clone();
        let session = session.clone();
        let id = id.to_string();
        async move { inner.get_invoice(&session, &id).await }
      })
      .await?;

    Ok(result.data)
  }

  /// Dashboard aggregates, cached per user filter.
  pub async fn dashboard_stats(&self, session: &Session) -> Result<DashboardStats, ApiError> {
    let key = InvoiceQueryKey::Stats {
      user_id: session.user_id.clone(),
    };

    let result = self
      .cache
      .query(&key, || {
        let inner = self.inner.clone();
        let session = session.clone();
        async move {
          inner
            .dashboard_stats(&session, session.user_id.as_deref())
            .await
        }
      })
      .await?;

    Ok(result.data)
  }

  /// Upload without analysis. Declares no tags: nothing the views show
  /// changes until the analyze step runs.
  pub async fn upload_file(
    &self,
    session: &Session,
    filename: String,
    bytes: Vec<u8>,
  ) -> Result<FileRef, ApiError> {
    self.inner.upload_file(session, filename, bytes).await
  }

  /// Analyze a file into an invoice record. Invalidates every invoice
  /// and dashboard query before resolving.
  pub async fn analyze_invoice(
    &self,
    session: &Session,
    source: AnalyzeSource,
  ) -> Result<Invoice, ApiError> {
    self
      .cache
      .mutate(&[Tag::Invoice, Tag::Dashboard], || {
        let inner = self.inner.clone();
        let session = session.clone();
        async move { inner.analyze_invoice(&session, source).await }
      })
      .await
  }

  /// Delete an invoice. Invalidates every invoice and dashboard query
  /// before resolving.
  pub async fn delete_invoice(&self, session: &Session, id: &str) -> Result<(), ApiError> {
    self
      .cache
      .mutate(&[Tag::Invoice, Tag::Dashboard], || {
        let inner = self.inner.clone();
        let session = session.clone();
        let id = id.to_string();
        async move { inner.delete_invoice(&session, &id).await }
      })
      .await
  }

  /// Force refetch for the given tags (manual refresh keybinding).
  pub fn invalidate(&self, tags: &[Tag]) {
    self.cache.invalidate(tags);
  }
}
