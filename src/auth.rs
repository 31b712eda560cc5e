//! Session provider: external identity in, backend profile out.
//!
//! The identity provider (token issuance, sign-in) is an external
//! collaborator consumed through the `IdentityProvider` capability trait.
//! `SessionManager` exchanges the identity for a bearer session and keeps
//! the backend profile in sync: a missing profile (404) is created on the
//! spot, and sync failures land in an error slot without logging the
//! session out — the UI shows a degraded profile instead of blocking.

use tracing::{info, warn};

use crate::api::types::UserProfile;
use crate::api::{ApiClient, ApiError, ProfileUpdate, Session, SignupRequest};
use crate::config::Config;

/// External identity as the provider reports it.
#[derive(Debug, Clone)]
pub struct Identity {
  pub uid: String,
  pub email: String,
  pub display_name: Option<String>,
  pub photo_url: Option<String>,
}

/// Capability interface over the external auth provider.
pub trait IdentityProvider {
  /// Currently signed-in identity, if any.
  fn identity(&self) -> Option<Identity>;

  /// Bearer credential for the current identity.
  fn bearer_token(&self) -> Result<String, ApiError>;
}

/// Identity provider backed by config fields and the token env var.
pub struct ConfigIdentityProvider {
  config: Config,
}

impl ConfigIdentityProvider {
  pub fn new(config: Config) -> Self {
    Self { config }
  }
}

impl IdentityProvider for ConfigIdentityProvider {
  fn identity(&self) -> Option<Identity> {
    let auth = self.config.auth.as_ref()?;
    Some(Identity {
      uid: auth.uid.clone(),
      email: auth.email.clone(),
      display_name: auth.display_name.clone(),
      photo_url: auth.photo_url.clone(),
    })
  }

  fn bearer_token(&self) -> Result<String, ApiError> {
    Config::api_token().map_err(|e| ApiError::Auth(e.to_string()))
  }
}

/// The profile calls `SessionManager` needs; a seam for tests.
pub trait ProfileApi {
  async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, ApiError>;
  async fn create_profile(
    &self,
    session: &Session,
    signup: &SignupRequest,
  ) -> Result<UserProfile, ApiError>;
  async fn update_profile(
    &self,
    session: &Session,
    update: &ProfileUpdate,
  ) -> Result<UserProfile, ApiError>;
}

impl ProfileApi for ApiClient {
  async fn fetch_profile(&self, session: &Session) -> Result<UserProfile, ApiError> {
    ApiClient::fetch_profile(self, session).await
  }

  async fn create_profile(
    &self,
    session: &Session,
    signup: &SignupRequest,
  ) -> Result<UserProfile, ApiError> {
    ApiClient::create_profile(self, session, signup).await
  }

  async fn update_profile(
    &self,
    session: &Session,
    update: &ProfileUpdate,
  ) -> Result<UserProfile, ApiError> {
    ApiClient::update_profile(self, session, update).await
  }
}

/// Session and profile state for the running app.
#[derive(Clone)]
pub struct SessionManager<A> {
  api: A,
  session: Option<Session>,
  profile: Option<UserProfile>,
  error: Option<String>,
  loading: bool,
}

impl<A: ProfileApi> SessionManager<A> {
  pub fn new(api: A) -> Self {
    Self {
      api,
      session: None,
      profile: None,
      error: None,
      loading: false,
    }
  }

  pub fn session(&self) -> Option<&Session> {
    self.session.as_ref()
  }

  pub fn profile(&self) -> Option<&UserProfile> {
    self.profile.as_ref()
  }

  /// Last profile-sync failure, if any.
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  /// Exchange the current identity for a session and sync the backend
  /// profile, creating it when the backend has never seen this identity.
  pub async fn sync(&mut self, provider: &impl IdentityProvider) {
    self.loading = true;
    self.error = None;

    let Some(identity) = provider.identity() else {
      self.session = None;
      self.profile = None;
      self.loading = false;
      return;
    };

    let token = match provider.bearer_token() {
      Ok(token) => token,
      Err(e) => {
        warn!(error = %e, "no bearer credential, staying signed out");
        self.error = Some(e.to_string());
        self.session = None;
        self.profile = None;
        self.loading = false;
        return;
      }
    };

    let mut session = Session::new(token);

    match self.api.fetch_profile(&session).await {
      Ok(profile) => {
        session.user_id = Some(profile.id.clone());
        self.profile = Some(profile);
      }
      Err(e) if e.is_not_found() => {
        // First sign-in for this identity; create the backend profile.
        let signup = SignupRequest {
          firebase_uid: identity.uid.clone(),
          email: identity.email.clone(),
          full_name: identity
            .display_name
            .clone()
            .or_else(|| identity.email.split('@').next().map(String::from)),
          photo_url: identity.photo_url.clone(),
        };
        match self.api.create_profile(&session, &signup).await {
          Ok(profile) => {
            info!(email = %identity.email, "created backend profile");
            session.user_id = Some(profile.id.clone());
            self.profile = Some(profile);
          }
          Err(e) => {
            warn!(error = %e, "profile creation failed");
            self.error = Some(e.to_string());
          }
        }
      }
      Err(e) => {
        // Degraded: logged in, but no profile to show.
        warn!(error = %e, "profile sync failed");
        self.error = Some(e.to_string());
      }
    }

    self.session = Some(session);
    self.loading = false;
  }

  /// Re-fetch the profile for the current session.
  pub async fn refresh_profile(&mut self) {
    let Some(session) = self.session.clone() else {
      return;
    };

    match self.api.fetch_profile(&session).await {
      Ok(profile) => {
        self.error = None;
        if let Some(s) = self.session.as_mut() {
          s.user_id = Some(profile.id.clone());
        }
        self.profile = Some(profile);
      }
      Err(e) => {
        self.error = Some(e.to_string());
      }
    }
  }

  /// Push a partial update; the stored profile follows the response.
  pub async fn update_profile(&mut self, update: ProfileUpdate) -> Result<UserProfile, ApiError> {
    let Some(session) = self.session.clone() else {
      return Err(ApiError::Auth("no active session".to_string()));
    };

    let profile = self.api.update_profile(&session, &update).await?;
    self.profile = Some(profile.clone());
    Ok(profile)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  fn profile(id: &str, email: &str, full_name: Option<&str>) -> UserProfile {
    UserProfile {
      id: id.to_string(),
      uid: "fb-1".to_string(),
      email: email.to_string(),
      full_name: full_name.map(String::from),
      company: None,
      photo_url: None,
      created_at: None,
    }
  }

  struct MockApi {
    fetch_result: fn() -> Result<UserProfile, ApiError>,
    fetch_calls: Arc<AtomicU32>,
    create_calls: Arc<AtomicU32>,
  }

  impl ProfileApi for MockApi {
    async fn fetch_profile(&self, _session: &Session) -> Result<UserProfile, ApiError> {
      self.fetch_calls.fetch_add(1, Ordering::SeqCst);
      (self.fetch_result)()
    }

    async fn create_profile(
      &self,
      _session: &Session,
      signup: &SignupRequest,
    ) -> Result<UserProfile, ApiError> {
      self.create_calls.fetch_add(1, Ordering::SeqCst);
      Ok(profile("created-1", &signup.email, signup.full_name.as_deref()))
    }

    async fn update_profile(
      &self,
      _session: &Session,
      update: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
      Ok(profile("u-1", "a@b.com", update.full_name.as_deref()))
    }
  }

  struct StaticIdentity;

  impl IdentityProvider for StaticIdentity {
    fn identity(&self) -> Option<Identity> {
      Some(Identity {
        uid: "fb-1".to_string(),
        email: "jane@example.com".to_string(),
        display_name: None,
        photo_url: None,
      })
    }

    fn bearer_token(&self) -> Result<String, ApiError> {
      Ok("token".to_string())
    }
  }

  #[tokio::test]
  async fn test_not_found_triggers_exactly_one_create() {
    let create_calls = Arc::new(AtomicU32::new(0));
    let api = MockApi {
      fetch_result: || Err(ApiError::NotFound),
      fetch_calls: Arc::new(AtomicU32::new(0)),
      create_calls: create_calls.clone(),
    };

    let mut manager = SessionManager::new(api);
    manager.sync(&StaticIdentity).await;

    assert_eq!(create_calls.load(Ordering::SeqCst), 1);
    let profile = manager.profile().expect("profile should be created");
    assert_eq!(profile.id, "created-1");
    assert_eq!(profile.email, "jane@example.com");
    // Display name fell back to the email local part.
    assert_eq!(profile.full_name.as_deref(), Some("jane"));
    assert!(manager.error().is_none());
  }

  #[tokio::test]
  async fn test_existing_profile_skips_create() {
    let create_calls = Arc::new(AtomicU32::new(0));
    let api = MockApi {
      fetch_result: || Ok(profile("u-9", "jane@example.com", Some("Jane"))),
      fetch_calls: Arc::new(AtomicU32::new(0)),
      create_calls: create_calls.clone(),
    };

    let mut manager = SessionManager::new(api);
    manager.sync(&StaticIdentity).await;

    assert_eq!(create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(manager.profile().unwrap().id, "u-9");
    assert_eq!(
      manager.session().unwrap().user_id.as_deref(),
      Some("u-9"),
      "session should carry the profile id as its user filter"
    );
  }

  #[tokio::test]
  async fn test_sync_failure_keeps_session_logged_in() {
    let api = MockApi {
      fetch_result: || Err(ApiError::Network("connection refused".to_string())),
      fetch_calls: Arc::new(AtomicU32::new(0)),
      create_calls: Arc::new(AtomicU32::new(0)),
    };

    let mut manager = SessionManager::new(api);
    manager.sync(&StaticIdentity).await;

    assert!(manager.session().is_some(), "degraded but logged in");
    assert!(manager.profile().is_none());
    assert!(manager.error().unwrap().contains("connection refused"));
  }

  #[tokio::test]
  async fn test_update_profile_replaces_stored_profile() {
    let api = MockApi {
      fetch_result: || Ok(profile("u-1", "a@b.com", Some("Old Name"))),
      fetch_calls: Arc::new(AtomicU32::new(0)),
      create_calls: Arc::new(AtomicU32::new(0)),
    };

    let mut manager = SessionManager::new(api);
    manager.sync(&StaticIdentity).await;

    let updated = manager
      .update_profile(ProfileUpdate {
        full_name: Some("New Name".to_string()),
        company: None,
      })
      .await
      .unwrap();

    assert_eq!(updated.full_name.as_deref(), Some("New Name"));
    assert_eq!(
      manager.profile().unwrap().full_name.as_deref(),
      Some("New Name")
    );
  }
}
