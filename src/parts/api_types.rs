//! Serde types for API payloads that are not domain entities.

use serde::Deserialize;

/// Error body returned by the API.
///
/// The backend is not consistent: the message sits either under
/// `error.message` or at the top level.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub error: Option<ApiErrorDetail>,
  pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
  pub message: Option<String>,
}

impl ApiErrorBody {
  /// Extract the server's message from a raw error body, if it has one.
  pub fn message(body: &[u8]) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_slice(body).ok()?;
    parsed
      .error
      .and_then(|detail| detail.message)
      .or(parsed.message)
      .filter(|message| !message.trim().is_empty())
  }
}
