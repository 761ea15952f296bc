//! [`Board`] — the in-memory state the interpreter writes and the renderer
//! reads.

use crate::{
  absence::AbsenceIndex,
  address::{self, ManagerList},
  alternate::AlternateTable,
  status::StatusTable,
};

/// All tables making up the status board.
///
/// Owned by a single processing component and lent out by reference; the
/// interpreter takes `&mut Board`, rendering only needs `&Board`.
#[derive(Debug, Clone, Default)]
pub struct Board {
  pub status:         StatusTable,
  pub absences:       AbsenceIndex,
  pub alternates:     AlternateTable,
  pub managers:       ManagerList,
  /// Domain appended to bare account names, e.g. `example.com`.
  pub default_domain: String,
}

impl Board {
  pub fn new(default_domain: impl Into<String>) -> Self {
    Self {
      default_domain: default_domain.into(),
      ..Self::default()
    }
  }

  /// Normalise an account name or address against this board's domain.
  pub fn normalize(&self, raw: &str) -> Option<String> {
    address::normalize(raw, &self.default_domain)
  }
}
