//! The update engine: applies a parsed command to the [`Board`].

use checkin_core::{
  Board,
  absence::AbsenceRecord,
  address,
  status::Status,
};
use chrono::NaiveDateTime;

use crate::{
  parse::{
    ABSENCE_TEL_FIELD, ALT_FIELD, AM_FIELD, Command, PERIOD_FIELD,
    PERSON_FIELD, PM_FIELD, ParsedBody, REASON_FIELD, TEL_FIELD,
  },
  text::{bracket_text, classify, field_value},
};

/// Which persisted tables a command modified.
///
/// The status table is touched by every command and is not listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
  pub absences:   bool,
  pub alternates: bool,
}

/// Apply `parsed` on behalf of `sender` (already resolved to a primary
/// address), received at `received`.
pub fn apply(
  board: &mut Board,
  sender: &str,
  received: NaiveDateTime,
  parsed: &ParsedBody,
) -> Changes {
  let fields = parsed.fields();
  match parsed.command {
    Command::Start => apply_normal(board, sender, received, fields, Some(false)),
    Command::End => apply_normal(board, sender, received, fields, Some(true)),
    Command::Fix => apply_normal(board, sender, received, fields, None),
    Command::Clear => {
      board.status.touch(sender, received).finished = false;
      Changes::default()
    }
    Command::AbsenceRegister => {
      board.status.touch(sender, received);
      register_absence(board, sender, received, fields)
    }
    Command::AbsenceReset => {
      board.status.touch(sender, received);
      reset_absence(board, sender, fields)
    }
    Command::None => {
      board.status.touch(sender, received);
      Changes::default()
    }
  }
}

// ─── Normal commands ─────────────────────────────────────────────────────────

fn apply_normal(
  board: &mut Board,
  sender: &str,
  received: NaiveDateTime,
  fields: &[String],
  finished: Option<bool>,
) -> Changes {
  let mut alternates: Vec<String> = Vec::new();
  let st = board.status.touch(sender, received);

  for line in fields {
    let line = line.trim_start();
    if let Some(rest) = line.strip_prefix(AM_FIELD) {
      st.status_am = classify(rest);
      st.status_am_text = Some(bracket_text(rest).to_string());
    } else if let Some(rest) = line.strip_prefix(PM_FIELD) {
      st.status_pm = classify(rest);
      st.status_pm_text = Some(bracket_text(rest).to_string());
    } else if let Some(rest) = line.strip_prefix(TEL_FIELD) {
      st.tel = Some(bracket_text(rest).to_string());
    } else if let Some(rest) = line.strip_prefix(ALT_FIELD) {
      alternates.extend(
        bracket_text(rest)
          .split(',')
          .map(str::trim)
          .filter(|a| !a.is_empty())
          .map(str::to_lowercase),
      );
    }
  }

  if let Some(finished) = finished {
    st.finished = finished;
  }

  if alternates.is_empty() {
    return Changes::default();
  }
  board.alternates.replace(sender, alternates);
  Changes {
    alternates: true,
    ..Changes::default()
  }
}

// ─── Absence commands ────────────────────────────────────────────────────────

fn register_absence(
  board: &mut Board,
  sender: &str,
  received: NaiveDateTime,
  fields: &[String],
) -> Changes {
  let mut person: Option<&str> = None;
  let mut record = AbsenceRecord {
    reported_date: received,
    reported_by:   address::local_part(sender).to_string(),
    subject:       String::new(),
    period:        String::new(),
    status:        Status::Contact,
    status_text:   None,
    tel:           None,
  };

  for line in fields {
    let line = line.trim_start();
    if let Some(rest) = line.strip_prefix(PERSON_FIELD) {
      person = Some(field_value(rest));
    } else if let Some(rest) = line.strip_prefix(PERIOD_FIELD) {
      record.period = field_value(rest).to_string();
    } else if let Some(rest) = line.strip_prefix(REASON_FIELD) {
      record.status = classify(rest);
      record.status_text = Some(bracket_text(rest).to_string());
    } else if let Some(rest) = line.strip_prefix(ABSENCE_TEL_FIELD) {
      record.tel = Some(bracket_text(rest).to_string());
    }
  }

  record.subject = person
    .and_then(|p| board.normalize(p))
    .unwrap_or_default();

  Changes {
    absences: board.absences.register(record),
    ..Changes::default()
  }
}

fn reset_absence(board: &mut Board, sender: &str, fields: &[String]) -> Changes {
  let person = fields
    .iter()
    .find_map(|line| line.trim_start().strip_prefix(PERSON_FIELD))
    .map(field_value)
    .and_then(|p| board.normalize(p));

  let Some(subject) = person else {
    return Changes::default();
  };
  Changes {
    absences: board
      .absences
      .reset(address::local_part(sender), &subject),
    ..Changes::default()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::parse::parse_body;

  const ALICE: &str = "alice@example.com";

  fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 10)
      .unwrap()
      .and_hms_opt(h, m, 0)
      .unwrap()
  }

  fn run(board: &mut Board, body: &str, received: NaiveDateTime) -> Changes {
    apply(board, ALICE, received, &parse_body(body))
  }

  #[test]
  fn start_then_end_keeps_start_fields() {
    let mut board = Board::new("example.com");
    run(&mut board, "[開始]\nAM[東京]\nPM[在宅]\nTEL[内線 1234]", at(8, 50));
    run(&mut board, "[終了]\n", at(18, 5));

    let st = board.status.get(ALICE).unwrap();
    assert!(st.finished);
    assert_eq!(st.status_am, Status::Office);
    assert_eq!(st.status_pm, Status::Remote);
    assert_eq!(st.status_am_text.as_deref(), Some("東京"));
    assert_eq!(st.tel.as_deref(), Some("内線 1234"));
    assert_eq!(st.first_received, Some(at(8, 50)));
    assert_eq!(st.last_received, Some(at(18, 5)));
  }

  #[test]
  fn fix_leaves_finished_untouched() {
    let mut board = Board::new("example.com");
    run(&mut board, "[終了]\nAM[東京]", at(18, 0));
    run(&mut board, "[修正]\nPM[外出]", at(18, 10));

    let st = board.status.get(ALICE).unwrap();
    assert!(st.finished);
    assert_eq!(st.status_am, Status::Office);
    assert_eq!(st.status_pm, Status::Remote);
    assert_eq!(st.status_pm_text.as_deref(), Some("外出"));
  }

  #[test]
  fn clear_reopens_and_changes_nothing_else() {
    let mut board = Board::new("example.com");
    run(&mut board, "[終了]\nAM[東京]\nPM[東京]", at(18, 0));
    let changes =
      run(&mut board, "[クリア]\n[開始]\nAM[休暇]\nALT[x@y.jp]", at(18, 30));

    assert_eq!(changes, Changes::default());
    let st = board.status.get(ALICE).unwrap();
    assert!(!st.finished);
    assert_eq!(st.status_am, Status::Office);
    assert!(board.alternates.is_empty());
  }

  #[test]
  fn none_only_touches() {
    let mut board = Board::new("example.com");
    run(&mut board, "Thanks!", at(9, 0));
    let st = board.status.get(ALICE).unwrap();
    assert_eq!(st.status_am, Status::Contact);
    assert_eq!(st.status_pm, Status::Contact);
    assert_eq!(st.status_am_text, None);
    assert!(!st.finished);
  }

  #[test]
  fn alt_line_replaces_alternates() {
    let mut board = Board::new("example.com");
    let changes = run(
      &mut board,
      "[修正]\nALT[Alice@Mobile.jp , alice.home@net.jp]",
      at(9, 0),
    );
    assert!(changes.alternates);
    assert_eq!(board.alternates.resolve("alice@mobile.jp"), ALICE);
    assert_eq!(board.alternates.resolve("alice.home@net.jp"), ALICE);

    let changes = run(&mut board, "[修正]\nALT[]", at(9, 5));
    assert!(!changes.alternates);
    assert_eq!(board.alternates.resolve("alice@mobile.jp"), ALICE);
  }

  #[test]
  fn register_absence_commits_valid_record() {
    let mut board = Board::new("example.com");
    let body = "[不在連絡]\n不在者[Bob]\n不在期間[2024/05/13～2024/05/14]\n\
                不在理由[休暇]\n不在時TEL[090-0000-0000]";
    let changes = run(&mut board, body, at(10, 0));
    assert!(changes.absences);

    let records = board.absences.for_subject("bob@example.com");
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.reported_by, "alice");
    assert_eq!(r.status, Status::Vacation);
    assert_eq!(r.status_text.as_deref(), Some("休暇"));
    assert_eq!(r.tel.as_deref(), Some("090-0000-0000"));
    assert_eq!(r.reported_date, at(10, 0));
    assert!(board.status.get(ALICE).is_some());
  }

  #[test]
  fn register_absence_drops_invalid_record() {
    let mut board = Board::new("example.com");
    let changes = run(
      &mut board,
      "[不在連絡]\n不在者[bob]\n不在期間[来週のどこか]",
      at(10, 0),
    );
    assert!(!changes.absences);
    assert!(board.absences.is_empty());

    let changes =
      run(&mut board, "[不在連絡]\n不在期間[2024/05/13]", at(10, 0));
    assert!(!changes.absences);
    assert!(board.absences.is_empty());
  }

  #[test]
  fn reset_absence_removes_own_entry() {
    let mut board = Board::new("example.com");
    run(&mut board, "[不在連絡]\n不在者[bob]\n不在期間[2024/05/13]", at(10, 0));
    apply(
      &mut board,
      "carol@example.com",
      at(10, 5),
      &parse_body("[不在連絡]\n不在者[bob]\n不在期間[2024/05/14]"),
    );

    let changes = run(&mut board, "[不在連絡取消]\n不在者[bob]", at(11, 0));
    assert!(changes.absences);
    let remaining = board.absences.for_subject("bob@example.com");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].reported_by, "carol");

    let changes = run(&mut board, "[不在連絡取消]\n不在者[bob]", at(11, 5));
    assert!(!changes.absences);
  }
}
