//! Scheduled absences and the two indices kept over them.
//!
//! Absence notices are filed by one person about another (or themselves).
//! They are stored grouped by reporter and subject, which is also the
//! persisted shape, and mirrored into a per-subject view sorted newest report
//! first for lookup while rendering. Every mutation goes through
//! [`AbsenceIndex`] and rebuilds the per-subject view before returning, so a
//! reader holding `&AbsenceIndex` always sees both views agree.

use std::{
  collections::{BTreeMap, HashMap},
  fmt,
};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  status::{PersonStatus, Status},
};

// ─── Period ──────────────────────────────────────────────────────────────────

/// Separators accepted between the two ends of a period.
const PERIOD_SEPARATORS: [char; 3] = ['～', '~', '〜'];

const DATE_TIME_FORMATS: [&str; 2] = ["%Y/%m/%d %H:%M", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

/// A closed interval `[from, to]` parsed from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
  pub from: NaiveDateTime,
  pub to:   NaiveDateTime,
}

enum Endpoint {
  Date(NaiveDate),
  DateTime(NaiveDateTime),
  Time(NaiveTime),
}

/// The last minute of a day an all-day window still covers.
const DAY_END: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
  Some(t) => t,
  None => panic!("23:59 is a valid time"),
};

/// `date` at 23:59, the inclusive end of a date-only window.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime { date.and_time(DAY_END) }

fn parse_endpoint(s: &str) -> Option<Endpoint> {
  let s = s.trim();
  for fmt in DATE_TIME_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
      return Some(Endpoint::DateTime(dt));
    }
  }
  for fmt in DATE_FORMATS {
    if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
      return Some(Endpoint::Date(d));
    }
  }
  NaiveTime::parse_from_str(s, "%H:%M").ok().map(Endpoint::Time)
}

impl Period {
  /// Parse `"<start>～<end>"` or a single date.
  ///
  /// Each end is `YYYY/MM/DD` or `YYYY-MM-DD`, optionally followed by
  /// ` HH:MM`. The end may be a bare `HH:MM`, meaning the same day as the
  /// start. A date without a time covers the whole day.
  pub fn parse(text: &str) -> Result<Self> {
    let invalid = || Error::InvalidPeriod(text.to_string());

    let (start, end) = match text.split_once(PERIOD_SEPARATORS) {
      Some((start, end)) => (start, Some(end)),
      None => (text, None),
    };

    let (from, start_day) = match parse_endpoint(start).ok_or_else(invalid)? {
      Endpoint::Date(d) => (d.and_time(NaiveTime::MIN), d),
      Endpoint::DateTime(dt) => (dt, dt.date()),
      Endpoint::Time(_) => return Err(invalid()),
    };

    let to = match end.map(parse_endpoint) {
      None => end_of_day(start_day),
      Some(None) => return Err(invalid()),
      Some(Some(Endpoint::Date(d))) => end_of_day(d),
      Some(Some(Endpoint::DateTime(dt))) => dt,
      Some(Some(Endpoint::Time(t))) => start_day.and_time(t),
    };

    if from >= to {
      return Err(Error::DegeneratePeriod(text.to_string()));
    }
    Ok(Self { from, to })
  }

  pub fn contains(&self, at: NaiveDateTime) -> bool {
    self.from <= at && at <= self.to
  }
}

// ─── AbsenceRecord ───────────────────────────────────────────────────────────

/// One absence notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRecord {
  /// When the notice was sent.
  pub reported_date: NaiveDateTime,
  /// Local part (or full address) of whoever filed the notice.
  #[serde(rename = "reported")]
  pub reported_by:   String,
  /// Normalised email of the absent person.
  pub subject:       String,
  /// Free-text window, see [`Period::parse`].
  pub period:        String,
  pub status:        Status,
  pub status_text:   Option<String>,
  pub tel:           Option<String>,
}

impl AbsenceRecord {
  pub fn interval(&self) -> Result<Period> { Period::parse(&self.period) }

  /// Usable records name somebody and carry a parseable, non-empty window.
  pub fn is_valid(&self) -> bool {
    !self.subject.is_empty() && self.interval().is_ok()
  }

  pub fn covers(&self, at: NaiveDateTime) -> bool {
    self.interval().is_ok_and(|p| p.contains(at))
  }

  /// The status this notice stands in for while it is active.
  pub fn project(&self) -> PersonStatus {
    PersonStatus {
      status_am: self.status,
      status_pm: self.status,
      status_am_text: self.status_text.clone(),
      status_pm_text: self.status_text.clone(),
      tel: self.tel.clone(),
      absence_reported: Some(self.reported_by.clone()),
      ..PersonStatus::default()
    }
  }
}

impl fmt::Display for AbsenceRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let reason = match self.status_text.as_deref() {
      Some(text) if !text.is_empty() => text.to_string(),
      _ => self.status.to_string(),
    };
    write!(f, "{} {}（{}）", self.period, reason, self.reported_by)
  }
}

// ─── AbsenceIndex ────────────────────────────────────────────────────────────

/// `reported_by → subject → records`; the persisted shape.
pub type GroupedAbsences = BTreeMap<String, BTreeMap<String, Vec<AbsenceRecord>>>;

/// Both views over the absence records.
#[derive(Debug, Clone, Default)]
pub struct AbsenceIndex {
  grouped:    GroupedAbsences,
  by_subject: HashMap<String, Vec<AbsenceRecord>>,
}

impl AbsenceIndex {
  /// Build from persisted data, discarding invalid records.
  ///
  /// Returns the index and the number of records dropped.
  pub fn load(mut grouped: GroupedAbsences) -> (Self, usize) {
    let mut dropped = 0;
    for subjects in grouped.values_mut() {
      for records in subjects.values_mut() {
        let before = records.len();
        records.retain(AbsenceRecord::is_valid);
        dropped += before - records.len();
      }
      subjects.retain(|_, records| !records.is_empty());
    }
    grouped.retain(|_, subjects| !subjects.is_empty());

    let mut index = Self {
      grouped,
      by_subject: HashMap::new(),
    };
    index.rebuild();
    (index, dropped)
  }

  pub fn grouped(&self) -> &GroupedAbsences { &self.grouped }

  /// Add a notice. Invalid records are refused and `false` is returned.
  pub fn register(&mut self, record: AbsenceRecord) -> bool {
    if !record.is_valid() {
      return false;
    }
    self
      .grouped
      .entry(record.reported_by.clone())
      .or_default()
      .entry(record.subject.clone())
      .or_default()
      .push(record);
    self.rebuild();
    true
  }

  /// Withdraw every notice `reported_by` filed about `subject`.
  ///
  /// Returns `false` when there was nothing to remove.
  pub fn reset(&mut self, reported_by: &str, subject: &str) -> bool {
    let Some(subjects) = self.grouped.get_mut(reported_by) else {
      return false;
    };
    if subjects.remove(subject).is_none() {
      return false;
    }
    if subjects.is_empty() {
      self.grouped.remove(reported_by);
    }
    self.rebuild();
    true
  }

  /// Drop every record whose window ended before `reference`.
  ///
  /// Returns the number of records removed.
  pub fn collect_garbage(&mut self, reference: NaiveDateTime) -> usize {
    let mut removed = 0;
    for subjects in self.grouped.values_mut() {
      for records in subjects.values_mut() {
        let before = records.len();
        records.retain(|r| r.interval().is_ok_and(|p| p.to >= reference));
        removed += before - records.len();
      }
      subjects.retain(|_, records| !records.is_empty());
    }
    self.grouped.retain(|_, subjects| !subjects.is_empty());
    self.rebuild();
    removed
  }

  /// All notices about `subject`, most recently reported first.
  pub fn for_subject(&self, subject: &str) -> &[AbsenceRecord] {
    self.by_subject.get(subject).map_or(&[], Vec::as_slice)
  }

  /// The most recently reported notice about `subject` covering `at`.
  pub fn active(
    &self,
    subject: &str,
    at: NaiveDateTime,
  ) -> Option<&AbsenceRecord> {
    self.for_subject(subject).iter().find(|r| r.covers(at))
  }

  pub fn len(&self) -> usize {
    self.by_subject.values().map(Vec::len).sum()
  }

  pub fn is_empty(&self) -> bool { self.by_subject.is_empty() }

  /// Regenerate the per-subject view from the grouped one.
  fn rebuild(&mut self) {
    self.by_subject.clear();
    for subjects in self.grouped.values() {
      for (subject, records) in subjects {
        self
          .by_subject
          .entry(subject.clone())
          .or_default()
          .extend(records.iter().cloned());
      }
    }
    for records in self.by_subject.values_mut() {
      records.sort_by(|a, b| b.reported_date.cmp(&a.reported_date));
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dt(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, d)
      .unwrap()
      .and_hms_opt(h, m, 0)
      .unwrap()
  }

  fn record(by: &str, subject: &str, period: &str, reported: u32) -> AbsenceRecord {
    AbsenceRecord {
      reported_date: dt(reported, 9, 0),
      reported_by:   by.to_string(),
      subject:       subject.to_string(),
      period:        period.to_string(),
      status:        Status::Vacation,
      status_text:   Some("休暇".to_string()),
      tel:           None,
    }
  }

  // ── Period ─────────────────────────────────────────────────────────────

  #[test]
  fn period_single_date_covers_whole_day() {
    let p = Period::parse("2024/05/10").unwrap();
    assert_eq!(p.from, dt(10, 0, 0));
    assert_eq!(p.to, dt(10, 23, 59));
  }

  #[test]
  fn end_of_day_is_last_minute() {
    assert_eq!(end_of_day(dt(10, 0, 0).date()), dt(10, 23, 59));
  }

  #[test]
  fn period_date_range_with_fullwidth_tilde() {
    let p = Period::parse("2024/05/10～2024/05/12").unwrap();
    assert_eq!(p.from, dt(10, 0, 0));
    assert_eq!(p.to, dt(12, 23, 59));
  }

  #[test]
  fn period_time_only_end_reuses_start_day() {
    let p = Period::parse("2024-05-10 13:00~17:30").unwrap();
    assert_eq!(p.from, dt(10, 13, 0));
    assert_eq!(p.to, dt(10, 17, 30));
  }

  #[test]
  fn period_rejects_garbage_and_reversed() {
    assert!(matches!(
      Period::parse("next week"),
      Err(Error::InvalidPeriod(_))
    ));
    assert!(matches!(
      Period::parse("2024/05/12～2024/05/10"),
      Err(Error::DegeneratePeriod(_))
    ));
    assert!(Period::parse("13:00～17:00").is_err());
  }

  // ── Index ──────────────────────────────────────────────────────────────

  #[test]
  fn register_refuses_invalid_records() {
    let mut index = AbsenceIndex::default();
    assert!(!index.register(record("alice", "", "2024/05/10", 1)));
    assert!(!index.register(record("alice", "bob@example.com", "soon", 1)));
    assert!(index.is_empty());
    assert!(index.grouped().is_empty());
  }

  #[test]
  fn subject_view_sorted_newest_report_first() {
    let mut index = AbsenceIndex::default();
    index.register(record("alice", "bob@example.com", "2024/05/20", 2));
    index.register(record("carol", "bob@example.com", "2024/05/21", 5));
    index.register(record("alice", "bob@example.com", "2024/05/22", 3));

    let dates: Vec<_> = index
      .for_subject("bob@example.com")
      .iter()
      .map(|r| r.reported_date)
      .collect();
    assert_eq!(dates, vec![dt(5, 9, 0), dt(3, 9, 0), dt(2, 9, 0)]);

    index.reset("carol", "bob@example.com");
    let dates: Vec<_> = index
      .for_subject("bob@example.com")
      .iter()
      .map(|r| r.reported_date)
      .collect();
    assert_eq!(dates, vec![dt(3, 9, 0), dt(2, 9, 0)]);
  }

  #[test]
  fn reset_only_touches_the_reporters_entry() {
    let mut index = AbsenceIndex::default();
    index.register(record("alice", "bob@example.com", "2024/05/20", 1));
    index.register(record("carol", "bob@example.com", "2024/05/21", 1));

    assert!(!index.reset("dave", "bob@example.com"));
    assert!(index.reset("alice", "bob@example.com"));
    assert!(!index.reset("alice", "bob@example.com"));
    assert!(!index.grouped().contains_key("alice"));
    assert_eq!(index.for_subject("bob@example.com").len(), 1);
    assert_eq!(index.for_subject("bob@example.com")[0].reported_by, "carol");
  }

  #[test]
  fn garbage_collection_drops_elapsed_and_is_idempotent() {
    let mut index = AbsenceIndex::default();
    index.register(record("alice", "bob@example.com", "2024/05/01～2024/05/03", 1));
    index.register(record("alice", "bob@example.com", "2024/05/20", 1));
    index.register(record("carol", "dan@example.com", "2024/05/02", 1));

    let reference = dt(10, 5, 0);
    assert_eq!(index.collect_garbage(reference), 2);
    let once = index.grouped().clone();
    assert_eq!(index.collect_garbage(reference), 0);
    assert_eq!(index.grouped(), &once);

    assert!(!index.grouped().contains_key("carol"));
    assert!(index.for_subject("dan@example.com").is_empty());
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn active_picks_covering_record() {
    let mut index = AbsenceIndex::default();
    index.register(record("alice", "bob@example.com", "2024/05/20", 1));
    assert!(index.active("bob@example.com", dt(20, 10, 0)).is_some());
    assert!(index.active("bob@example.com", dt(21, 10, 0)).is_none());
  }

  #[test]
  fn load_drops_invalid_records() {
    let mut grouped = GroupedAbsences::new();
    grouped.entry("alice".into()).or_default().insert(
      "bob@example.com".into(),
      vec![
        record("alice", "bob@example.com", "2024/05/20", 1),
        record("alice", "bob@example.com", "whenever", 1),
      ],
    );
    grouped
      .entry("carol".into())
      .or_default()
      .insert("dan@example.com".into(), vec![record("carol", "dan@example.com", "", 1)]);

    let (index, dropped) = AbsenceIndex::load(grouped);
    assert_eq!(dropped, 2);
    assert_eq!(index.len(), 1);
    assert!(!index.grouped().contains_key("carol"));
  }

  #[test]
  fn projection_carries_reason_and_reporter() {
    let r = record("alice", "bob@example.com", "2024/05/20", 1);
    let st = r.project();
    assert_eq!(st.status_am, Status::Vacation);
    assert_eq!(st.status_pm_text.as_deref(), Some("休暇"));
    assert_eq!(st.absence_reported.as_deref(), Some("alice"));
    assert!(!st.finished);
    assert_eq!(r.to_string(), "2024/05/20 休暇（alice）");
  }
}
