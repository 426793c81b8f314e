//! Error type shared by the API facade, the query cache and the mutation executor.

use std::fmt;

/// Broad classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Network unreachable, timeout, connection reset
  Transport,
  /// 4xx - validation, not found, conflict
  Client,
  /// 5xx, or a success response we could not decode
  Server,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      ErrorKind::Transport => "transport",
      ErrorKind::Client => "client",
      ErrorKind::Server => "server",
    };
    f.write_str(label)
  }
}

/// A rejected API operation.
///
/// Cloneable so the query cache can store it verbatim in an entry and hand
/// the same value to every caller attached to a shared fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct ApiError {
  pub kind: ErrorKind,
  /// HTTP status, when the server answered at all
  pub status: Option<u16>,
  pub message: String,
}

impl ApiError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self {
      kind: ErrorKind::Transport,
      status: None,
      message: message.into(),
    }
  }

  /// Classify an HTTP status code into client/server.
  pub fn from_status(status: u16, message: impl Into<String>) -> Self {
    let kind = if (400..500).contains(&status) {
      ErrorKind::Client
    } else {
      ErrorKind::Server
    };
    Self {
      kind,
      status: Some(status),
      message: message.into(),
    }
  }

  pub fn not_found(what: impl fmt::Display) -> Self {
    Self::from_status(404, format!("{} not found", what))
  }

  pub fn decode(message: impl fmt::Display) -> Self {
    Self {
      kind: ErrorKind::Server,
      status: None,
      message: format!("invalid response body: {}", message),
    }
  }

  pub fn is_not_found(&self) -> bool {
    self.status == Some(404)
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if let Some(status) = err.status() {
      return Self::from_status(status.as_u16(), err.to_string());
    }
    if err.is_decode() {
      return Self::decode(err);
    }
    Self::transport(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_status_classifies_kind() {
    assert_eq!(ApiError::from_status(404, "gone").kind, ErrorKind::Client);
    assert_eq!(ApiError::from_status(409, "conflict").kind, ErrorKind::Client);
    assert_eq!(ApiError::from_status(500, "boom").kind, ErrorKind::Server);
    assert_eq!(ApiError::from_status(503, "down").kind, ErrorKind::Server);
  }

  #[test]
  fn test_display_includes_kind_and_message() {
    let err = ApiError::transport("connection refused");
    assert_eq!(err.to_string(), "transport error: connection refused");
    assert_eq!(err.status, None);
  }

  #[test]
  fn test_not_found() {
    let err = ApiError::not_found("user u-1");
    assert!(err.is_not_found());
    assert_eq!(err.message, "user u-1 not found");
  }
}
