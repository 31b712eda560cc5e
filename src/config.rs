use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Identity for the backend session. Without it the app runs signed out.
  pub auth: Option<AuthConfig>,
  /// Custom title for header (defaults to the backend host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub invoices: InvoicesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Backend base URL. `INVO_API_URL` overrides whatever is configured.
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// Stable identifier from the external identity provider.
  pub uid: String,
  pub email: String,
  pub display_name: Option<String>,
  pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoicesConfig {
  /// Invoices per page in the list view.
  #[serde(default = "default_per_page")]
  pub per_page: u32,
}

impl Default for InvoicesConfig {
  fn default() -> Self {
    Self {
      per_page: default_per_page(),
    }
  }
}

fn default_per_page() -> u32 {
  20
}

impl Config {
  /// Load configuration.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./invo.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/invo/config.yaml
  /// 4. ~/.config/invo/config.yaml
  ///
  /// A missing file is not an error: the defaults point at a local
  /// backend. An explicit path that does not exist is an error.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var("INVO_API_URL") {
      if !url.is_empty() {
        config.api.base_url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("invo.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("invo").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the backend API token from environment variables.
  ///
  /// Checks INVO_API_TOKEN first, then INVOICE_API_TOKEN as fallback.
  pub fn api_token() -> Result<String> {
    std::env::var("INVO_API_TOKEN")
      .or_else(|_| std::env::var("INVOICE_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set INVO_API_TOKEN or INVOICE_API_TOKEN environment variable.")
      })
  }

  /// Header title: configured override or the backend host.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    self
      .api
      .base_url
      .trim_start_matches("https://")
      .trim_start_matches("http://")
      .trim_end_matches('/')
      .to_string()
  }
}
