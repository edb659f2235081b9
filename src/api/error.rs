//! Error types for the Free Shops API client.

use serde_json::Value;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Network,
  Timeout,
  Http,
  Unauthorized,
  Validation,
  Decode,
  Unsupported,
}

/// Errors from the admin API client.
///
/// Cloneable so a single deduplicated fetch can hand the same failure to
/// every waiter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
  /// No response was received.
  #[error("network error: {0}")]
  Network(String),

  /// The request hit the client timeout.
  #[error("request timeout")]
  Timeout,

  /// The server answered with a non-success status.
  #[error("HTTP {status}{}", message_suffix(.body))]
  Http { status: u16, body: Option<Value> },

  /// The server answered 401. The session has already been cleared.
  #[error("unauthorized: session expired, log in again")]
  Unauthorized { body: Option<Value> },

  /// Client-side checks rejected the request before it was sent.
  #[error("validation failed: {0}")]
  Validation(String),

  /// A success response carried a body that is not JSON.
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// The resource has no route for the requested operation.
  #[error("{resource} does not support {operation}")]
  Unsupported {
    resource: &'static str,
    operation: &'static str,
  },
}

impl ApiError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::Network(_) => ErrorKind::Network,
      ApiError::Timeout => ErrorKind::Timeout,
      ApiError::Http { .. } => ErrorKind::Http,
      ApiError::Unauthorized { .. } => ErrorKind::Unauthorized,
      ApiError::Validation(_) => ErrorKind::Validation,
      ApiError::Decode(_) => ErrorKind::Decode,
      ApiError::Unsupported { .. } => ErrorKind::Unsupported,
    }
  }

  /// HTTP status, when the server answered at all.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Http { status, .. } => Some(*status),
      ApiError::Unauthorized { .. } => Some(401),
      _ => None,
    }
  }

  /// The server-supplied `message` field, if the error body carried one.
  pub fn message(&self) -> Option<&str> {
    match self {
      ApiError::Http { body, .. } | ApiError::Unauthorized { body } => body_message(body.as_ref()),
      _ => None,
    }
  }

  /// Whether a read should be attempted again after this error.
  pub fn is_retryable(&self) -> bool {
    !matches!(
      self.kind(),
      ErrorKind::Unauthorized | ErrorKind::Validation | ErrorKind::Unsupported
    )
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ApiError::Timeout
    } else {
      ApiError::Network(err.to_string())
    }
  }
}

fn body_message(body: Option<&Value>) -> Option<&str> {
  body?.get("message")?.as_str()
}

fn message_suffix(body: &Option<Value>) -> String {
  body_message(body.as_ref())
    .map(|m| format!(": {}", m))
    .unwrap_or_default()
}
