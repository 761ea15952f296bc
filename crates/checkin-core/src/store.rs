//! The `BoardStore` trait: durable storage for the board's tables.
//!
//! Implemented by storage backends (e.g. `checkin-store-json`). The daemon
//! depends on this abstraction, not on any concrete backend.

use std::{collections::BTreeMap, future::Future};

use chrono::NaiveDate;

use crate::{
  absence::GroupedAbsences,
  address::ManagerList,
  status::{InitialValue, StatusTable},
};

/// A rendered page written out after each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
  /// The live status page.
  LivePage,
  /// The absence board.
  AbsencePage,
  /// Yesterday's status page, frozen at rollover.
  BackupPage(NaiveDate),
}

/// `YYYYMMDD.html`, the name of the backup page for `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
  format!("{}.html", date.format("%Y%m%d"))
}

/// A line for the rejection log.
#[derive(Debug, Clone)]
pub struct Rejection {
  pub date:        NaiveDate,
  pub sender:      String,
  pub return_path: String,
}

/// Abstraction over the board's persistence.
///
/// Loads return the decoded tables; callers decide what to do when a table
/// cannot be read (the daemon starts over with an empty one).
pub trait BoardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Status table ──────────────────────────────────────────────────────

  fn load_status(
    &self,
  ) -> impl Future<Output = Result<StatusTable, Self::Error>> + Send + '_;

  fn save_status<'a>(
    &'a self,
    table: &'a StatusTable,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Write a dated snapshot of the status table (taken at rollover).
  fn save_status_snapshot<'a>(
    &'a self,
    date: NaiveDate,
    table: &'a StatusTable,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Absences ──────────────────────────────────────────────────────────

  fn load_absences(
    &self,
  ) -> impl Future<Output = Result<GroupedAbsences, Self::Error>> + Send + '_;

  fn save_absences<'a>(
    &'a self,
    grouped: &'a GroupedAbsences,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Alternate addresses ───────────────────────────────────────────────

  fn load_alternates(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, Vec<String>>, Self::Error>>
  + Send
  + '_;

  fn save_alternates<'a>(
    &'a self,
    forward: &'a BTreeMap<String, Vec<String>>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Static inputs ─────────────────────────────────────────────────────

  fn load_initial_values(
    &self,
  ) -> impl Future<Output = Result<BTreeMap<String, InitialValue>, Self::Error>>
  + Send
  + '_;

  fn load_managers<'a>(
    &'a self,
    default_domain: &'a str,
  ) -> impl Future<Output = Result<ManagerList, Self::Error>> + Send + 'a;

  // ── Outputs ───────────────────────────────────────────────────────────

  fn append_rejection<'a>(
    &'a self,
    rejection: &'a Rejection,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn publish<'a>(
    &'a self,
    artifact: Artifact,
    html: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
