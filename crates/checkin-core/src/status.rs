//! Per-person status records and the status table.
//!
//! A [`PersonStatus`] holds what a person declared for the morning and the
//! afternoon of the current day, plus bookkeeping about when they last wrote
//! in. The [`StatusTable`] is emptied once a day at rollover.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, absence::end_of_day};

// ─── Declared status ─────────────────────────────────────────────────────────

/// A half-day status as declared by the person (or by an absence notice).
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
  Office,
  Remote,
  Offduty,
  Vacation,
  Leave,
  /// Wrote in, but the declaration did not match any known category.
  #[default]
  Contact,
}

// ─── Resolved status ─────────────────────────────────────────────────────────

/// What the board shows for a person at a given moment.
///
/// Superset of [`Status`]: `Home` means the day is finished, `Unknown` means
/// there is no data at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum DisplayStatus {
  Office,
  Remote,
  Offduty,
  Vacation,
  Leave,
  Contact,
  Home,
  Unknown,
}

impl DisplayStatus {
  /// Background colour of the table cell.
  pub fn color(self) -> &'static str {
    match self {
      Self::Office => "lime",
      Self::Remote => "aqua",
      Self::Home => "yellow",
      Self::Offduty | Self::Vacation | Self::Leave => "gainsboro",
      Self::Contact => "lightcyan",
      Self::Unknown => "darkgray",
    }
  }

  /// Inline `style` attribute for the table cell.
  pub fn style(self) -> String {
    format!("style='background:{};'", self.color())
  }

  /// Legend label. The three absent states share one legend entry.
  pub fn label(self) -> &'static str {
    match self {
      Self::Office => "会社",
      Self::Remote => "在宅/外出/出張",
      Self::Offduty | Self::Vacation | Self::Leave => "休暇/非番/休職",
      Self::Contact => "不明（更新あり）",
      Self::Home => "勤務終了",
      Self::Unknown => "不明（更新なし）",
    }
  }
}

impl From<Status> for DisplayStatus {
  fn from(status: Status) -> Self {
    match status {
      Status::Office => Self::Office,
      Status::Remote => Self::Remote,
      Status::Offduty => Self::Offduty,
      Status::Vacation => Self::Vacation,
      Status::Leave => Self::Leave,
      Status::Contact => Self::Contact,
    }
  }
}

// ─── PersonStatus ────────────────────────────────────────────────────────────

/// The record kept for each person who wrote in during the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonStatus {
  #[serde(rename = "statusAM")]
  pub status_am:      Status,
  #[serde(rename = "statusPM")]
  pub status_pm:      Status,
  /// Short annotation for the morning, usually the bracketed label.
  #[serde(rename = "statusAMText")]
  pub status_am_text: Option<String>,
  #[serde(rename = "statusPMText")]
  pub status_pm_text: Option<String>,
  pub tel:            Option<String>,
  /// Set by an end-of-day command, cleared by start-of-day or clear.
  pub finished:       bool,
  #[serde(rename = "firstReceived")]
  pub first_received: Option<NaiveDateTime>,
  #[serde(rename = "lastReceived")]
  pub last_received:  Option<NaiveDateTime>,
  /// Who filed the absence notice this record was projected from. Never set
  /// on records created by a person's own mail.
  #[serde(rename = "absenceReported", skip_serializing_if = "Option::is_none")]
  pub absence_reported: Option<String>,
}

impl PersonStatus {
  /// A fresh record for somebody seen for the first time at `received`.
  pub fn first_seen(received: NaiveDateTime) -> Self {
    Self {
      first_received: Some(received),
      ..Self::default()
    }
  }
}

// ─── Initial values ──────────────────────────────────────────────────────────

/// A statically configured status applied to an account for a date window,
/// e.g. somebody on long-term leave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialValue {
  #[serde(flatten)]
  pub status:    PersonStatus,
  /// `YYYY/MM/DD`, inclusive from 00:00.
  #[serde(rename = "dateFrom")]
  pub date_from: String,
  /// `YYYY/MM/DD`, inclusive until 23:59.
  #[serde(rename = "dateTo")]
  pub date_to:   String,
}

impl InitialValue {
  /// The `[from 00:00, to 23:59]` window during which this value applies.
  pub fn window(&self) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let from = parse_slash_date("dateFrom", &self.date_from)?;
    let to = parse_slash_date("dateTo", &self.date_to)?;
    Ok((from.and_time(NaiveTime::MIN), end_of_day(to)))
  }
}

fn parse_slash_date(field: &'static str, value: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(value.trim(), "%Y/%m/%d").map_err(|_| {
    Error::InvalidDate {
      field,
      value: value.to_string(),
    }
  })
}

/// Outcome of [`StatusTable::seed`].
#[derive(Debug, Default)]
pub struct Seeded {
  pub applied: usize,
  /// Accounts whose date window could not be parsed.
  pub invalid: Vec<String>,
}

// ─── StatusTable ─────────────────────────────────────────────────────────────

/// All person records, keyed by normalised email address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusTable {
  entries: BTreeMap<String, PersonStatus>,
}

impl StatusTable {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, address: &str) -> Option<&PersonStatus> {
    self.entries.get(address)
  }

  pub fn insert(&mut self, address: impl Into<String>, status: PersonStatus) {
    self.entries.insert(address.into(), status);
  }

  /// Record contact from `address` at `received`.
  ///
  /// Creates the record (both halves `contact`, `first_received` set) when it
  /// does not exist; otherwise only `last_received` moves.
  pub fn touch(
    &mut self,
    address: &str,
    received: NaiveDateTime,
  ) -> &mut PersonStatus {
    self
      .entries
      .entry(address.to_string())
      .and_modify(|st| st.last_received = Some(received))
      .or_insert_with(|| PersonStatus::first_seen(received))
  }

  /// Apply every initial value whose window strictly contains `now`.
  pub fn seed<'a>(
    &mut self,
    values: impl IntoIterator<Item = (&'a String, &'a InitialValue)>,
    now: NaiveDateTime,
  ) -> Seeded {
    let mut seeded = Seeded::default();
    for (address, value) in values {
      match value.window() {
        Ok((from, to)) if from < now && now < to => {
          self.entries.insert(address.clone(), value.status.clone());
          seeded.applied += 1;
        }
        Ok(_) => {}
        Err(_) => seeded.invalid.push(address.clone()),
      }
    }
    seeded
  }

  pub fn clear(&mut self) { self.entries.clear(); }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = (&String, &PersonStatus)> {
    self.entries.iter()
  }
}
