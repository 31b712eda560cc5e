//! Remote data client for the invoice backend.

pub mod api_types;
mod cache;
mod cached_client;
mod client;
mod error;
pub mod types;

pub use cached_client::CachedApiClient;
pub use client::{AnalyzeSource, ApiClient, ProfileUpdate, Session, SignupRequest};
pub use error::ApiError;
