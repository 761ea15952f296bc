//! Error types and axum `IntoResponse` implementation.

use std::path::PathBuf;

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to read template {}: {source}", .path.display())]
  Template {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("spool error on {}: {source}", .path.display())]
  Spool {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("mailbox error: {0}")]
  Mailbox(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn mailbox(
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Mailbox(Box::new(e))
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    tracing::error!(error = %self, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
