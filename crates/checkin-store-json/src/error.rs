//! Error type for `checkin-store-json`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("I/O error on {}: {source}", .path.display())]
  Io {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("json error in {}: {source}", .path.display())]
  Json {
    path:   PathBuf,
    source: serde_json::Error,
  },

  #[error("base64 error in {}: {source}", .path.display())]
  Base64 {
    path:   PathBuf,
    source: base64::DecodeError,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
