//! Upload/analyze flow state machine.
//!
//! File selection is validated locally (type allow-list, size bound)
//! before anything touches the network: analysis can only be started from
//! `FileSelected`, and `FileSelected` is only reachable through
//! validation. A failed analysis is retryable; a successful one is
//! terminal until the user resets.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::types::Invoice;

/// Upper bound on upload size, matching the backend's limit.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Accepted upload formats: PDF, PNG, JPEG.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg"];

/// Local validation failure. Never produces a network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("unsupported file type '.{0}' (allowed: pdf, png, jpg, jpeg)")]
  UnsupportedType(String),
  #[error("file is {0} bytes, over the 10 MiB limit")]
  TooLarge(u64),
  #[error("file is empty")]
  Empty,
  #[error("cannot read file: {0}")]
  Unreadable(String),
}

/// A file that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
  pub path: PathBuf,
  pub name: String,
  pub size: u64,
}

impl SelectedFile {
  /// Stat and validate a file on disk.
  pub fn from_path(path: PathBuf) -> Result<Self, ValidationError> {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();

    let meta =
      std::fs::metadata(&path).map_err(|e| ValidationError::Unreadable(e.to_string()))?;
    if !meta.is_file() {
      return Err(ValidationError::Unreadable(format!(
        "{} is not a regular file",
        path.display()
      )));
    }

    validate(&name, meta.len())?;

    Ok(Self {
      size: meta.len(),
      name,
      path,
    })
  }
}

/// Check a candidate file name and size against the allow-list and the
/// size bound. Pure so the rules are testable without touching disk.
pub fn validate(name: &str, size: u64) -> Result<(), ValidationError> {
  let ext = match name.rsplit_once('.') {
    Some((_, ext)) => ext.to_ascii_lowercase(),
    None => String::new(),
  };

  if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
    return Err(ValidationError::UnsupportedType(ext));
  }
  if size == 0 {
    return Err(ValidationError::Empty);
  }
  if size > MAX_FILE_SIZE {
    return Err(ValidationError::TooLarge(size));
  }
  Ok(())
}

/// States of the upload flow.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadState {
  Idle,
  FileSelected(SelectedFile),
  Analyzing(SelectedFile),
  /// Terminal until `reset`.
  Succeeded(Box<Invoice>),
  /// Recoverable: `retry` goes back to `FileSelected`.
  Failed { file: SelectedFile, error: String },
}

/// The upload flow state machine. Owns no I/O: the view performs the
/// network call while the flow sits in `Analyzing` and reports the
/// outcome through `complete`/`fail`.
#[derive(Debug, Default)]
pub struct UploadFlow {
  state: UploadState,
}

impl Default for UploadState {
  fn default() -> Self {
    UploadState::Idle
  }
}

impl UploadFlow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &UploadState {
    &self.state
  }

  /// Validate and select a file. Ignored while an analysis is running
  /// and after one succeeded (reset first).
  pub fn select(&mut self, path: PathBuf) -> Result<(), ValidationError> {
    if matches!(
      self.state,
      UploadState::Analyzing(_) | UploadState::Succeeded(_)
    ) {
      return Ok(());
    }
    let file = SelectedFile::from_path(path)?;
    self.state = UploadState::FileSelected(file);
    Ok(())
  }

  /// Move to `Analyzing`, handing the caller the file to send.
  /// Only permitted from `FileSelected`.
  pub fn begin_analysis(&mut self) -> Option<SelectedFile> {
    match &self.state {
      UploadState::FileSelected(file) => {
        let file = file.clone();
        self.state = UploadState::Analyzing(file.clone());
        Some(file)
      }
      _ => None,
    }
  }

  /// Record a successful analysis.
  pub fn complete(&mut self, invoice: Invoice) {
    if matches!(self.state, UploadState::Analyzing(_)) {
      self.state = UploadState::Succeeded(Box::new(invoice));
    }
  }

  /// Record a failed analysis; the selected file is kept for retry.
  pub fn fail(&mut self, error: String) {
    if let UploadState::Analyzing(file) = &self.state {
      self.state = UploadState::Failed {
        file: file.clone(),
        error,
      };
    }
  }

  /// Go back to `FileSelected` after a failure.
  pub fn retry(&mut self) -> bool {
    if let UploadState::Failed { file, .. } = &self.state {
      self.state = UploadState::FileSelected(file.clone());
      true
    } else {
      false
    }
  }

  /// Back to `Idle`. Ignored while an analysis is in flight (there is no
  /// request cancellation; the result is discarded by the view instead).
  pub fn reset(&mut self) {
    if !matches!(self.state, UploadState::Analyzing(_)) {
      self.state = UploadState::Idle;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::ProcessingStatus;
  use std::io::Write;

  fn invoice() -> Invoice {
    Invoice {
      id: "inv-1".to_string(),
      filename: "scan.pdf".to_string(),
      vendor_name: "Acme Corp".to_string(),
      invoice_number: "A-100".to_string(),
      invoice_date: None,
      total_amount: 99.5,
      tax_amount: 9.5,
      currency: "USD".to_string(),
      line_items: Vec::new(),
      status: ProcessingStatus::Analyzed,
      raw_text: None,
      created_at: None,
    }
  }

  fn temp_file(name: &str, len: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(&vec![0u8; len]).unwrap();
    (dir, path)
  }

  #[test]
  fn test_disallowed_type_is_rejected() {
    assert_eq!(
      validate("notes.txt", 100),
      Err(ValidationError::UnsupportedType("txt".to_string()))
    );
    assert_eq!(
      validate("no_extension", 100),
      Err(ValidationError::UnsupportedType(String::new()))
    );
  }

  #[test]
  fn test_allowed_types_pass() {
    assert_eq!(validate("invoice.pdf", 100), Ok(()));
    assert_eq!(validate("scan.PNG", 100), Ok(()));
    assert_eq!(validate("photo.jpeg", 100), Ok(()));
    assert_eq!(validate("photo.JPG", 100), Ok(()));
  }

  #[test]
  fn test_size_bound() {
    assert_eq!(validate("a.pdf", MAX_FILE_SIZE), Ok(()));
    assert_eq!(
      validate("a.pdf", MAX_FILE_SIZE + 1),
      Err(ValidationError::TooLarge(MAX_FILE_SIZE + 1))
    );
    assert_eq!(validate("a.pdf", 0), Err(ValidationError::Empty));
  }

  #[test]
  fn test_select_rejects_bad_file_and_stays_idle() {
    let (_dir, path) = temp_file("notes.txt", 10);
    let mut flow = UploadFlow::new();

    let result = flow.select(path);
    assert_eq!(
      result,
      Err(ValidationError::UnsupportedType("txt".to_string()))
    );
    assert_eq!(flow.state(), &UploadState::Idle);
  }

  #[test]
  fn test_happy_path() {
    let (_dir, path) = temp_file("scan.pdf", 10);
    let mut flow = UploadFlow::new();

    flow.select(path).unwrap();
    assert!(matches!(flow.state(), UploadState::FileSelected(_)));

    let file = flow.begin_analysis().expect("should start analyzing");
    assert_eq!(file.name, "scan.pdf");
    assert!(matches!(flow.state(), UploadState::Analyzing(_)));

    flow.complete(invoice());
    match flow.state() {
      UploadState::Succeeded(inv) => assert_eq!(inv.vendor_name, "Acme Corp"),
      other => panic!("unexpected state {:?}", other),
    }
  }

  #[test]
  fn test_analysis_requires_selected_file() {
    let mut flow = UploadFlow::new();
    assert!(flow.begin_analysis().is_none());
    assert_eq!(flow.state(), &UploadState::Idle);
  }

  #[test]
  fn test_failure_is_retryable() {
    let (_dir, path) = temp_file("scan.pdf", 10);
    let mut flow = UploadFlow::new();

    flow.select(path).unwrap();
    flow.begin_analysis().unwrap();
    flow.fail("backend exploded".to_string());
    assert!(matches!(flow.state(), UploadState::Failed { .. }));

    assert!(flow.retry());
    assert!(matches!(flow.state(), UploadState::FileSelected(_)));
    assert!(flow.begin_analysis().is_some());
  }

  #[test]
  fn test_success_is_terminal_until_reset() {
    let (_dir, path) = temp_file("scan.pdf", 10);
    let (_dir2, other) = temp_file("other.pdf", 10);
    let mut flow = UploadFlow::new();

    flow.select(path).unwrap();
    flow.begin_analysis().unwrap();
    flow.complete(invoice());

    // Selecting without reset is ignored.
    flow.select(other.clone()).unwrap();
    assert!(matches!(flow.state(), UploadState::Succeeded(_)));
    assert!(flow.begin_analysis().is_none());

    flow.reset();
    assert_eq!(flow.state(), &UploadState::Idle);
    flow.select(other).unwrap();
    assert!(matches!(flow.state(), UploadState::FileSelected(_)));
  }

  #[test]
  fn test_reset_ignored_while_analyzing() {
    let (_dir, path) = temp_file("scan.pdf", 10);
    let mut flow = UploadFlow::new();

    flow.select(path).unwrap();
    flow.begin_analysis().unwrap();
    flow.reset();
    assert!(matches!(flow.state(), UploadState::Analyzing(_)));
  }
}
