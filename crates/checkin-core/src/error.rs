//! Error types for `checkin-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unrecognised period: {0:?}")]
  InvalidPeriod(String),

  #[error("period {0:?} ends before it starts")]
  DegeneratePeriod(String),

  #[error("invalid date in {field}: {value:?}")]
  InvalidDate { field: &'static str, value: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
