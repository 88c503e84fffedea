//! Error kinds produced by the entity fetchers and carried through the cache.

use thiserror::Error;

/// Failure of a single fetch or mutation request.
///
/// Cloneable because one in-flight fetch fans its result out to every caller
/// that attached to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
  /// The requested resource does not exist
  #[error("{resource} not found")]
  NotFound {
    resource: String,
    message: Option<String>,
  },

  /// Network, CORS-style or authentication failure (`auth` for 401/403)
  #[error("connection failed: {detail}")]
  Transport {
    detail: String,
    auth: bool,
    message: Option<String>,
  },

  /// 5xx response
  #[error("server error (HTTP {status}): {message}")]
  Server { status: u16, message: String },

  /// 4xx response other than not-found and auth failures
  #[error("request rejected (HTTP {status}): {message}")]
  Validation { status: u16, message: String },

  #[error("{0}")]
  Unknown(String),
}

impl FetchError {
  pub fn not_found(resource: impl Into<String>) -> Self {
    Self::NotFound {
      resource: resource.into(),
      message: None,
    }
  }

  pub fn transport(detail: impl Into<String>) -> Self {
    Self::Transport {
      detail: detail.into(),
      auth: false,
      message: None,
    }
  }

  /// 401/403, with whatever the server said about it.
  pub fn auth(message: Option<String>) -> Self {
    Self::Transport {
      detail: "authentication failed".to_string(),
      auth: true,
      message,
    }
  }

  /// Classify a non-success HTTP status.
  ///
  /// `server_message` is whatever the response body carried in its
  /// `error.message` or `message` field.
  pub fn from_status(status: u16, resource: &str, server_message: Option<String>) -> Self {
    match status {
      401 | 403 => Self::auth(server_message),
      404 => Self::NotFound {
        resource: resource.to_string(),
        message: server_message,
      },
      s if s >= 500 => Self::Server {
        status: s,
        message: server_message.unwrap_or_default(),
      },
      s => Self::Validation {
        status: s,
        message: server_message.unwrap_or_default(),
      },
    }
  }

  /// Short message suitable for an error banner.
  ///
  /// A message the server sent along always wins over the fixed texts.
  pub fn user_message(&self) -> String {
    match self {
      Self::NotFound {
        message: Some(message),
        ..
      }
      | Self::Transport {
        message: Some(message),
        ..
      } if !message.trim().is_empty() => message.clone(),
      Self::NotFound { .. } => "Resource not found.".to_string(),
      Self::Transport { auth: true, .. } => {
        "Authentication failed. Please check your API credentials.".to_string()
      }
      Self::Transport { .. } => "Connection failed. This could be a network issue, CORS problem, or \
         authentication error. Check your API key and network connection."
        .to_string(),
      Self::Server { message, .. } if !message.is_empty() => message.clone(),
      Self::Server { .. } => "Service error. Please try again later.".to_string(),
      Self::Validation { message, .. } if !message.is_empty() => message.clone(),
      Self::Validation { status, .. } => format!("Request failed with status {}", status),
      Self::Unknown(message) if !message.is_empty() => message.clone(),
      Self::Unknown(_) => "An unexpected error occurred. Please try again.".to_string(),
    }
  }
}
