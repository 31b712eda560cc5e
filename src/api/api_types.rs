//! Serde-deserializable types matching backend API responses.
//!
//! The backend omits fields it could not extract or aggregate, so every
//! field here carries a default: missing values decode to zero/empty
//! instead of failing the whole response. The conversions into domain
//! types are the single place where backend field names (`vendor_name`,
//! `sum`, `firebase_uid`) are renamed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use super::types::{
  CurrencyStat, DashboardStats, FileRef, Invoice, InvoicePage, LineItem, ProcessingStatus,
  UserProfile, VendorStat,
};

/// FastAPI error body; `detail` carries the human-readable message.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
  pub detail: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiLineItem {
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub quantity: f64,
  #[serde(default)]
  pub price: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiInvoice {
  #[serde(default)]
  pub id: String,
  pub filename: Option<String>,
  pub vendor_name: Option<String>,
  pub invoice_number: Option<String>,
  pub invoice_date: Option<NaiveDate>,
  pub total_amount: Option<f64>,
  pub tax_amount: Option<f64>,
  pub currency: Option<String>,
  #[serde(default)]
  pub line_items: Vec<ApiLineItem>,
  pub raw_text: Option<String>,
  #[serde(default)]
  pub processed: bool,
  /// Optional explicit status; the backend mostly reports `processed`.
  pub status: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

impl From<ApiInvoice> for Invoice {
  fn from(api: ApiInvoice) -> Self {
    let status = match api.status.as_deref() {
      Some("failed") => ProcessingStatus::Failed,
      _ if api.processed => ProcessingStatus::Analyzed,
      _ => ProcessingStatus::Pending,
    };

    Invoice {
      id: api.id,
      filename: api.filename.unwrap_or_default(),
      vendor_name: api.vendor_name.unwrap_or_default(),
      invoice_number: api.invoice_number.unwrap_or_default(),
      invoice_date: api.invoice_date,
      total_amount: api.total_amount.unwrap_or_default(),
      tax_amount: api.tax_amount.unwrap_or_default(),
      currency: api.currency.unwrap_or_default(),
      line_items: api
        .line_items
        .into_iter()
        .map(|item| LineItem {
          description: item.description,
          quantity: item.quantity,
          price: item.price,
        })
        .collect(),
      status,
      raw_text: api.raw_text,
      created_at: api.created_at,
    }
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiInvoiceListResponse {
  #[serde(default)]
  pub total: u64,
  #[serde(default)]
  pub page: u32,
  #[serde(default)]
  pub per_page: u32,
  #[serde(default)]
  pub invoices: Vec<ApiInvoice>,
}

impl From<ApiInvoiceListResponse> for InvoicePage {
  fn from(api: ApiInvoiceListResponse) -> Self {
    InvoicePage {
      invoices: api.invoices.into_iter().map(Invoice::from).collect(),
      total: api.total,
      page: api.page,
      per_page: api.per_page,
    }
  }
}

/// Vendor aggregate as the backend names it: `{vendor_name, count, sum}`.
#[derive(Debug, Deserialize, Default)]
pub struct ApiVendorTotal {
  #[serde(default)]
  pub vendor_name: String,
  #[serde(default)]
  pub count: u64,
  #[serde(default)]
  pub sum: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiCurrencyTotal {
  #[serde(default)]
  pub currency: String,
  #[serde(default)]
  pub sum: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiDashboardStats {
  #[serde(default)]
  pub total_invoices: u64,
  #[serde(default)]
  pub total_expenses: f64,
  #[serde(default)]
  pub current_month_expenses: f64,
  #[serde(default)]
  pub invoice_trend: f64,
  #[serde(default)]
  pub expense_trend: f64,
  #[serde(default)]
  pub top_vendors: Vec<ApiVendorTotal>,
  #[serde(default)]
  pub expenses_by_currency: Vec<ApiCurrencyTotal>,
}

impl From<ApiDashboardStats> for DashboardStats {
  fn from(api: ApiDashboardStats) -> Self {
    DashboardStats {
      total_invoices: api.total_invoices,
      total_expenses: api.total_expenses,
      current_month_expenses: api.current_month_expenses,
      invoice_trend: api.invoice_trend,
      expense_trend: api.expense_trend,
      top_vendors: api
        .top_vendors
        .into_iter()
        .map(|v| VendorStat {
          name: v.vendor_name,
          count: v.count,
          total: v.sum,
        })
        .collect(),
      expenses_by_currency: api
        .expenses_by_currency
        .into_iter()
        .map(|c| CurrencyStat {
          currency: c.currency,
          total: c.sum,
        })
        .collect(),
    }
  }
}

/// Envelope for mutation endpoints: `{status, data}`.
#[derive(Debug, Deserialize, Default)]
pub struct ApiEnvelope<T> {
  #[serde(default)]
  pub status: String,
  pub data: Option<T>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiUploadedFile {
  #[serde(default)]
  pub file_id: String,
  #[serde(default)]
  pub filename: String,
  #[serde(default)]
  pub file_size: u64,
}

impl From<ApiUploadedFile> for FileRef {
  fn from(api: ApiUploadedFile) -> Self {
    FileRef {
      file_id: api.file_id,
      filename: api.filename,
      size: api.file_size,
    }
  }
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiUserProfile {
  #[serde(default)]
  pub id: String,
  #[serde(default)]
  pub firebase_uid: String,
  #[serde(default)]
  pub email: String,
  pub full_name: Option<String>,
  pub company: Option<String>,
  pub photo_url: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

impl From<ApiUserProfile> for UserProfile {
  fn from(api: ApiUserProfile) -> Self {
    UserProfile {
      id: api.id,
      uid: api.firebase_uid,
      email: api.email,
      full_name: api.full_name,
      company: api.company,
      photo_url: api.photo_url,
      created_at: api.created_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_dashboard_transform_renames_vendor_fields() {
    let api: ApiDashboardStats = serde_json::from_value(serde_json::json!({
      "total_invoices": 12,
      "total_expenses": 4321.5,
      "top_vendors": [
        {"vendor_name": "Acme Corp", "count": 5, "sum": 1200.0},
        {"vendor_name": "Globex", "count": 2, "sum": 99.9}
      ],
      "expenses_by_currency": [
        {"currency": "EUR", "sum": 300.0}
      ]
    }))
    .unwrap();

    let stats = DashboardStats::from(api);
    assert_eq!(stats.top_vendors.len(), 2);
    assert_eq!(stats.top_vendors[0].name, "Acme Corp");
    assert_eq!(stats.top_vendors[0].count, 5);
    assert_eq!(stats.top_vendors[0].total, 1200.0);
    assert_eq!(stats.expenses_by_currency[0].currency, "EUR");
    assert_eq!(stats.expenses_by_currency[0].total, 300.0);
  }

  #[test]
  fn test_dashboard_missing_arrays_default_to_empty() {
    let api: ApiDashboardStats = serde_json::from_value(serde_json::json!({
      "total_invoices": 3
    }))
    .unwrap();

    let stats = DashboardStats::from(api);
    assert_eq!(stats.total_invoices, 3);
    assert_eq!(stats.total_expenses, 0.0);
    assert!(stats.top_vendors.is_empty());
    assert!(stats.expenses_by_currency.is_empty());
  }

  #[test]
  fn test_invoice_missing_fields_default_to_empty() {
    let api: ApiInvoice = serde_json::from_value(serde_json::json!({
      "id": "inv-1",
      "vendor_name": null
    }))
    .unwrap();

    let invoice = Invoice::from(api);
    assert_eq!(invoice.id, "inv-1");
    assert_eq!(invoice.vendor_name, "");
    assert_eq!(invoice.total_amount, 0.0);
    assert!(invoice.line_items.is_empty());
    assert_eq!(invoice.status, ProcessingStatus::Pending);
  }

  #[test]
  fn test_invoice_status_mapping() {
    let processed: ApiInvoice =
      serde_json::from_value(serde_json::json!({"id": "a", "processed": true})).unwrap();
    assert_eq!(Invoice::from(processed).status, ProcessingStatus::Analyzed);

    let failed: ApiInvoice =
      serde_json::from_value(serde_json::json!({"id": "b", "status": "failed"})).unwrap();
    assert_eq!(Invoice::from(failed).status, ProcessingStatus::Failed);
  }

  #[test]
  fn test_profile_uid_rename() {
    let api: ApiUserProfile = serde_json::from_value(serde_json::json!({
      "id": "u1",
      "firebase_uid": "fb-123",
      "email": "a@b.com"
    }))
    .unwrap();

    let profile = UserProfile::from(api);
    assert_eq!(profile.uid, "fb-123");
  }
}
