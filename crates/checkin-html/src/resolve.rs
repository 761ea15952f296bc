//! Status resolution: what a board cell shows for one person right now.

use checkin_core::{
  absence::AbsenceRecord,
  status::{DisplayStatus, PersonStatus},
};
use chrono::{NaiveDateTime, Timelike};

use crate::escape::escape;

/// Hours up to and including noon show the morning status.
const LAST_MORNING_HOUR: u32 = 12;

/// Annotations are cut to this many characters.
const ANNOTATION_CHARS: usize = 2;

const UNKNOWN_TEXT: &str = "（不明）";
const FINISHED_SUFFIX: &str = " 勤務終了";

/// The resolved view of one person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
  pub status:           DisplayStatus,
  /// Escaped cell text, e.g. `（AM東京 PM在宅 08:50 12:03）`.
  pub text:             String,
  /// Unescaped contact number.
  pub tel:              Option<String>,
  /// Set when the cell is projected from somebody's absence notice.
  pub absence_reported: Option<String>,
}

impl Resolved {
  fn unknown() -> Self {
    Self {
      status:           DisplayStatus::Unknown,
      text:             UNKNOWN_TEXT.to_string(),
      tel:              None,
      absence_reported: None,
    }
  }
}

/// Resolve a person from their own record, falling back to the first of
/// `absences` (newest report first) whose window covers `now`.
pub fn resolve(
  record: Option<&PersonStatus>,
  absences: &[AbsenceRecord],
  now: NaiveDateTime,
) -> Resolved {
  let projected;
  let record = match record {
    Some(record) => record,
    None => {
      projected = absences
        .iter()
        .find(|a| a.covers(now))
        .map(AbsenceRecord::project);
      match &projected {
        Some(record) => record,
        None => return Resolved::unknown(),
      }
    }
  };

  Resolved {
    status:           display_status(record, now),
    text:             display_text(record),
    tel:              record.tel.clone(),
    absence_reported: record.absence_reported.clone(),
  }
}

/// `home` once the day is finished, otherwise the half-day status for the
/// hour of `now`.
pub fn display_status(
  record: &PersonStatus,
  now: NaiveDateTime,
) -> DisplayStatus {
  if record.finished {
    DisplayStatus::Home
  } else if now.hour() <= LAST_MORNING_HOUR {
    record.status_am.into()
  } else {
    record.status_pm.into()
  }
}

/// `（AM<am> PM<pm>[ first][ last][ 勤務終了]）`, with `-` for a missing
/// annotation.
pub fn display_text(record: &PersonStatus) -> String {
  let mut text = String::from("（");
  text.push_str(&half_day("AM", record.status_am_text.as_deref()));
  text.push(' ');
  text.push_str(&half_day("PM", record.status_pm_text.as_deref()));
  let received = [record.first_received, record.last_received];
  for at in received.into_iter().flatten() {
    text.push(' ');
    text.push_str(&at.format("%H:%M").to_string());
  }
  if record.finished {
    text.push_str(FINISHED_SUFFIX);
  }
  text.push('）');
  text
}

fn half_day(label: &str, annotation: Option<&str>) -> String {
  match annotation {
    Some(annotation) => {
      let short: String = annotation.chars().take(ANNOTATION_CHARS).collect();
      format!("{label}{}", escape(&short))
    }
    None => format!("{label}-"),
  }
}
