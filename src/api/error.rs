//! Error taxonomy for backend calls.

use thiserror::Error;

/// Errors produced by the remote data client.
///
/// `NotFound` is split out from `Backend` because a 404 is a signal, not
/// just a failure: the session provider uses it to decide that a backend
/// profile must be created.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
  /// The request never got a response.
  #[error("network error: {0}")]
  Network(String),

  /// Non-2xx status with the backend-provided message when present.
  #[error("{message} (status {status})")]
  Backend { status: u16, message: String },

  /// 404 on a resource lookup.
  #[error("not found")]
  NotFound,

  /// 401/403 — bad or missing bearer credential.
  #[error("authentication failed: {0}")]
  Auth(String),

  /// The response arrived but did not have the expected shape.
  #[error("unexpected response: {0}")]
  Decode(String),
}

impl ApiError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, ApiError::NotFound)
  }

  /// Map a non-2xx status plus the backend `detail` message (if any).
  pub fn from_status(status: u16, message: Option<String>) -> Self {
    let message = message.unwrap_or_else(|| format!("request failed with status {}", status));
    match status {
      404 => ApiError::NotFound,
      401 | 403 => ApiError::Auth(message),
      _ => ApiError::Backend { status, message },
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_decode() {
      ApiError::Decode(e.to_string())
    } else {
      ApiError::Network(e.to_string())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_mapping() {
    assert!(ApiError::from_status(404, None).is_not_found());
    assert!(matches!(
      ApiError::from_status(401, Some("expired".into())),
      ApiError::Auth(_)
    ));
    assert!(matches!(
      ApiError::from_status(500, None),
      ApiError::Backend { status: 500, .. }
    ));
  }

  #[test]
  fn test_backend_message_is_kept() {
    let err = ApiError::from_status(400, Some("Only PDF or image files supported".into()));
    assert_eq!(
      err.to_string(),
      "Only PDF or image files supported (status 400)"
    );
  }
}
