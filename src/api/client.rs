//! HTTP client for the invoice backend.

use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::api_types::{
  ApiDashboardStats, ApiEnvelope, ApiErrorBody, ApiInvoice, ApiInvoiceListResponse,
  ApiUploadedFile, ApiUserProfile,
};
use crate::api::error::ApiError;
use crate::api::types::{DashboardStats, FileRef, Invoice, InvoicePage, UserProfile};
use crate::config::Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated caller identity, passed explicitly into every call.
///
/// `user_id` is the backend profile id used for per-user filters on the
/// list and dashboard endpoints; it is unset until the profile sync has
/// run (or a filter was forced from the command line).
#[derive(Debug, Clone)]
pub struct Session {
  pub token: String,
  pub user_id: Option<String>,
}

impl Session {
  pub fn new(token: String) -> Self {
    Self {
      token,
      user_id: None,
    }
  }
}

/// Payload for the analyze operation: either raw file bytes or a
/// reference from a previous upload.
#[derive(Debug, Clone)]
pub enum AnalyzeSource {
  File { filename: String, bytes: Vec<u8> },
  Ref(FileRef),
}

/// Body for the profile-create call.
#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
  pub firebase_uid: String,
  pub email: String,
  pub full_name: Option<String>,
  pub photo_url: Option<String>,
}

/// Partial profile update; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company: Option<String>,
}

/// Invoice backend API client.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: Url,
}

impl ApiClient {
  pub fn new(config: &Config) -> Result<Self, ApiError> {
    let base_url = Url::parse(&config.api.base_url)
      .map_err(|e| ApiError::Network(format!("invalid base URL {}: {}", config.api.base_url, e)))?;

    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(ApiError::from)?;

    Ok(Self { http, base_url })
  }

  fn url(&self, path: &str) -> Result<Url, ApiError> {
    self
      .base_url
      .join(path)
      .map_err(|e| ApiError::Network(format!("invalid request path {}: {}", path, e)))
  }

  /// Send a request and decode the success body, mapping non-2xx into
  /// the error taxonomy with the backend `detail` message when present.
  async fn request_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
    let resp = req.send().await?;
    let status = resp.status();

    if !status.is_success() {
      let detail = resp
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail);
      return Err(ApiError::from_status(status.as_u16(), detail));
    }

    resp
      .json::<T>()
      .await
      .map_err(|e| ApiError::Decode(e.to_string()))
  }

  /// Paginated invoice list, optionally filtered by user.
  pub async fn list_invoices(
    &self,
    session: &Session,
    page: u32,
    per_page: u32,
    user_id: Option<&str>,
  ) -> Result<InvoicePage, ApiError> {
    let mut url = self.url("/api/invoices")?;
    url
      .query_pairs_mut()
      .append_pair("page", &page.to_string())
      .append_pair("per_page", &per_page.to_string());
    if let Some(user) = user_id {
      url.query_pairs_mut().append_pair("user_id", user);
    }

    debug!(%url, "listing invoices");
    let api: ApiInvoiceListResponse = self
      .request_json(self.http.get(url).bearer_auth(&session.token))
      .await?;
    Ok(api.into())
  }

  /// Single invoice by id; 404 surfaces as `ApiError::NotFound`.
  pub async fn get_invoice(&self, session: &Session, id: &str) -> Result<Invoice, ApiError> {
    let url = self.url(&format!("/api/invoices/{}", id))?;
    let api: ApiInvoice = self
      .request_json(self.http.get(url).bearer_auth(&session.token))
      .await?;
    Ok(api.into())
  }

  /// Delete an invoice. The backend echoes the deleted record; the
  /// client only cares about the 2xx.
  pub async fn delete_invoice(&self, session: &Session, id: &str) -> Result<(), ApiError> {
    let url = self.url(&format!("/api/invoices/{}", id))?;
    let resp = self
      .http
      .delete(url)
      .bearer_auth(&session.token)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let detail = resp
        .json::<ApiErrorBody>()
        .await
        .ok()
        .and_then(|body| body.detail);
      return Err(ApiError::from_status(status.as_u16(), detail));
    }
    Ok(())
  }

  /// Step one of the two-step flow: upload raw bytes, get a `FileRef`.
  pub async fn upload_file(
    &self,
    session: &Session,
    filename: String,
    bytes: Vec<u8>,
  ) -> Result<FileRef, ApiError> {
    let url = self.url("/api/upload")?;
    let form = Form::new().part("file", file_part(filename, bytes)?);

    let envelope: ApiEnvelope<ApiUploadedFile> = self
      .request_json(self.http.post(url).bearer_auth(&session.token).multipart(form))
      .await?;

    envelope
      .data
      .map(FileRef::from)
      .ok_or_else(|| ApiError::Decode("upload response missing data".to_string()))
  }

  /// Run OCR/extraction on a file (or a previously uploaded reference)
  /// and get back the stored invoice record.
  pub async fn analyze_invoice(
    &self,
    session: &Session,
    source: AnalyzeSource,
  ) -> Result<Invoice, ApiError> {
    let url = self.url("/api/analyze")?;
    let form = match source {
      AnalyzeSource::File { filename, bytes } => {
        Form::new().part("file", file_part(filename, bytes)?)
      }
      AnalyzeSource::Ref(file_ref) => Form::new().text("file_id", file_ref.file_id),
    };

    let envelope: ApiEnvelope<ApiInvoice> = self
      .request_json(self.http.post(url).bearer_auth(&session.token).multipart(form))
      .await?;

    envelope
      .data
      .map(Invoice::from)
      .ok_or_else(|| ApiError::Decode("analyze response missing data".to_string()))
  }

  /// Dashboard aggregates, optionally filtered by user.
  pub async fn dashboard_stats(
    &self,
    session: &Session,
    user_id: Option<&str>,
  ) -> Result<DashboardStats, ApiError> {
    let mut url = self.url("/api/dashboard/stats")?;
    if let Some(user) = user_id {
      url.query_pairs_mut().append_pair("user_id", user);
    }

    let api: ApiDashboardStats = self
      .request_json(self.http.get(url).bearer_auth(&session.token))
      .await?;
    Ok(api.into())
  }

  /// Current user's backend profile; 404 means "not signed up yet".
  pub async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, ApiError> {
    let url = self.url("/auth/me")?;
    let api: ApiUserProfile = self
      .request_json(self.http.get(url).bearer_auth(&session.token))
      .await?;
    Ok(api.into())
  }

  /// Create the backend profile for a fresh identity.
  pub async fn create_profile(
    &self,
    session: &Session,
    signup: &SignupRequest,
  ) -> Result<UserProfile, ApiError> {
    let url = self.url("/auth/signup")?;
    let api: ApiUserProfile = self
      .request_json(self.http.post(url).bearer_auth(&session.token).json(signup))
      .await?;
    Ok(api.into())
  }

  /// Partial profile update.
  pub async fn update_profile(
    &self,
    session: &Session,
    update: &ProfileUpdate,
  ) -> Result<UserProfile, ApiError> {
    let url = self.url("/auth/profile")?;
    let api: ApiUserProfile = self
      .request_json(self.http.put(url).bearer_auth(&session.token).json(update))
      .await?;
    Ok(api.into())
  }
}

fn file_part(filename: String, bytes: Vec<u8>) -> Result<Part, ApiError> {
  let mime = mime_for(&filename);
  Part::bytes(bytes)
    .file_name(filename)
    .mime_str(mime)
    .map_err(|e| ApiError::Decode(format!("invalid mime type {}: {}", mime, e)))
}

/// Content type by extension for the accepted upload formats.
fn mime_for(filename: &str) -> &'static str {
  let ext = filename.rsplit('.').next().unwrap_or_default();
  match ext.to_ascii_lowercase().as_str() {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    _ => "application/octet-stream",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_mime_for_accepted_types() {
    assert_eq!(mime_for("invoice.pdf"), "application/pdf");
    assert_eq!(mime_for("scan.PNG"), "image/png");
    assert_eq!(mime_for("photo.jpeg"), "image/jpeg");
    assert_eq!(mime_for("photo.jpg"), "image/jpeg");
    assert_eq!(mime_for("notes.txt"), "application/octet-stream");
  }
}
