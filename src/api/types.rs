//! Domain types used by the views.
//!
//! Kept separate from the wire types in `api_types` so lenient decoding
//! and backend field names stay at the boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStatus {
  Pending,
  Analyzed,
  Failed,
}

impl ProcessingStatus {
  pub fn label(&self) -> &'static str {
    match self {
      ProcessingStatus::Pending => "Pending",
      ProcessingStatus::Analyzed => "Analyzed",
      ProcessingStatus::Failed => "Failed",
    }
  }
}

/// One line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
  pub description: String,
  pub quantity: f64,
  pub price: f64,
}

/// A processed invoice record.
///
/// String fields the backend did not extract are empty; amounts default
/// to zero. Views decide how to present the gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: String,
  pub filename: String,
  pub vendor_name: String,
  pub invoice_number: String,
  pub invoice_date: Option<NaiveDate>,
  pub total_amount: f64,
  pub tax_amount: f64,
  pub currency: String,
  pub line_items: Vec<LineItem>,
  pub status: ProcessingStatus,
  pub raw_text: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// One page of the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoicePage {
  pub invoices: Vec<Invoice>,
  pub total: u64,
  pub page: u32,
  pub per_page: u32,
}

/// Per-vendor aggregate on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorStat {
  pub name: String,
  pub count: u64,
  pub total: f64,
}

/// Per-currency aggregate on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyStat {
  pub currency: String,
  pub total: f64,
}

/// Server-side dashboard aggregates. Never mutated by the client; goes
/// stale whenever invoices change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub total_invoices: u64,
  pub total_expenses: f64,
  pub current_month_expenses: f64,
  pub invoice_trend: f64,
  pub expense_trend: f64,
  pub top_vendors: Vec<VendorStat>,
  pub expenses_by_currency: Vec<CurrencyStat>,
}

/// Backend profile synchronized from the external identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: String,
  pub uid: String,
  pub email: String,
  pub full_name: Option<String>,
  pub company: Option<String>,
  pub photo_url: Option<String>,
  pub created_at: Option<DateTime<Utc>>,
}

/// Opaque reference to an uploaded file, for the two-step upload/analyze
/// flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRef {
  pub file_id: String,
  pub filename: String,
  pub size: u64,
}
