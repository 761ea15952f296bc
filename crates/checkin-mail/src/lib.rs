//! The mail interpreter: turns one inbound message into changes on the
//! [`Board`].
//!
//! ```text
//!   InboundMessage ─▶ vet ─▶ alternate lookup ─▶ parse_body ─▶ apply
//! ```
//!
//! Everything here is synchronous and does no I/O. The caller persists
//! whatever tables [`Changes`] reports as modified (the status table is
//! always modified for an applied message).

pub mod apply;
pub mod parse;
pub mod text;
pub mod vet;

use checkin_core::{Board, message::InboundMessage};

pub use self::{
  apply::{Changes, apply},
  parse::{Command, ParsedBody, parse_body},
  vet::{Verdict, vet},
};

/// What happened to a message.
#[derive(Debug, Clone)]
pub enum Outcome {
  Applied {
    /// The primary address the message was attributed to.
    sender:  String,
    command: Command,
    changes: Changes,
  },
  /// Sender or return-path did not look like an address.
  Ignored,
  /// Return-path vetting failed; the caller dates the rejection-log line
  /// with the processing day.
  Rejected { sender: String, return_path: String },
}

/// Interpret `message` against `board`.
pub fn interpret(board: &mut Board, message: &InboundMessage) -> Outcome {
  let sender = match vet(message, &board.managers) {
    Verdict::Accept(sender) => sender,
    Verdict::Ignore => return Outcome::Ignored,
    Verdict::Reject {
      sender,
      return_path,
    } => {
      return Outcome::Rejected {
        sender,
        return_path,
      };
    }
  };

  let sender = board.alternates.resolve(&sender).to_string();
  let parsed = parse_body(&message.body);
  let changes = apply(board, &sender, message.sent_at, &parsed);

  Outcome::Applied {
    sender,
    command: parsed.command,
    changes,
  }
}

#[cfg(test)]
mod tests {
  use checkin_core::status::Status;
  use chrono::{NaiveDate, NaiveDateTime};

  use super::*;

  fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, d)
      .unwrap()
      .and_hms_opt(h, m, 0)
      .unwrap()
  }

  fn mail(from: &str, sent_at: NaiveDateTime, body: &str) -> InboundMessage {
    InboundMessage {
      id: format!("{from}-{sent_at}"),
      from: from.to_string(),
      return_path: None,
      sent_at,
      body: body.to_string(),
    }
  }

  #[test]
  fn start_declares_office_for_both_halves() {
    let mut board = Board::new("example.com");
    let msg = mail("alice@example.com", at(10, 8, 45), "[開始]\nAM[東京]\nPM[東京]");

    let outcome = interpret(&mut board, &msg);
    assert!(matches!(
      outcome,
      Outcome::Applied { command: Command::Start, .. }
    ));

    let st = board.status.get("alice@example.com").unwrap();
    assert_eq!(st.status_am, Status::Office);
    assert_eq!(st.status_pm, Status::Office);
    assert!(!st.finished);
    assert_eq!(st.first_received, Some(at(10, 8, 45)));
  }

  #[test]
  fn clear_after_end_reopens_day() {
    let mut board = Board::new("example.com");
    interpret(
      &mut board,
      &mail("alice@example.com", at(10, 8, 45), "[開始]\nAM[東京]\nPM[東京]"),
    );
    interpret(&mut board, &mail("alice@example.com", at(10, 18, 0), "[終了]"));
    assert!(board.status.get("alice@example.com").unwrap().finished);

    interpret(
      &mut board,
      &mail("alice@example.com", at(10, 18, 30), "[クリア]\nPM[休暇]"),
    );
    let st = board.status.get("alice@example.com").unwrap();
    assert!(!st.finished);
    assert_eq!(st.status_pm, Status::Office);
  }

  #[test]
  fn absence_notice_survives_until_its_window_ends() {
    let mut board = Board::new("example.com");
    let outcome = interpret(
      &mut board,
      &mail(
        "alice@example.com",
        at(10, 9, 0),
        "[不在連絡]\n不在者[bob]\n不在期間[2024/05/13～2024/05/14]\n不在理由[休暇]",
      ),
    );
    assert!(matches!(
      outcome,
      Outcome::Applied {
        changes: Changes { absences: true, .. },
        ..
      }
    ));

    let monday = at(13, 10, 0);
    let active = board.absences.active("bob@example.com", monday).unwrap();
    assert_eq!(active.status, Status::Vacation);
    assert_eq!(active.reported_by, "alice");

    assert_eq!(board.absences.collect_garbage(at(14, 5, 0)), 0);
    assert_eq!(board.absences.collect_garbage(at(15, 5, 0)), 1);
    assert_eq!(board.absences.collect_garbage(at(15, 5, 0)), 0);
    assert!(board.absences.is_empty());
  }

  #[test]
  fn shared_alternate_attributes_to_last_registrant() {
    let mut board = Board::new("example.com");
    interpret(
      &mut board,
      &mail("alice@example.com", at(10, 9, 0), "[修正]\nALT[shared@mobile.jp]"),
    );
    interpret(
      &mut board,
      &mail("bob@example.com", at(10, 9, 5), "[修正]\nALT[shared@mobile.jp]"),
    );

    let outcome = interpret(
      &mut board,
      &mail("<Shared@Mobile.jp>", at(10, 9, 10), "[開始]\nAM[在宅]"),
    );
    match outcome {
      Outcome::Applied { sender, .. } => assert_eq!(sender, "bob@example.com"),
      other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
      board.status.get("bob@example.com").unwrap().status_am,
      Status::Remote
    );
    assert!(board.status.get("shared@mobile.jp").is_none());
    assert!(board.alternates.forward().get("alice@example.com").is_none());
  }

  #[test]
  fn end_fields_overwrite_the_morning_declaration() {
    let mut board = Board::new("example.com");
    interpret(
      &mut board,
      &mail("alice@example.com", at(10, 8, 45), "[開始]\nAM[東京]\nPM[東京]"),
    );
    interpret(
      &mut board,
      &mail("alice@example.com", at(10, 17, 30), "[終了]\nAM[休暇]\nPM[休暇]"),
    );

    let st = board.status.get("alice@example.com").unwrap();
    assert!(st.finished);
    assert_eq!(st.status_am, Status::Vacation);
    assert_eq!(st.status_pm, Status::Vacation);
    assert_eq!(st.status_am_text.as_deref(), Some("休暇"));
    assert_eq!(st.first_received, Some(at(10, 8, 45)));
    assert_eq!(st.last_received, Some(at(10, 17, 30)));
  }

  #[test]
  fn elapsed_absence_is_accepted_then_collected() {
    let mut board = Board::new("example.com");
    let outcome = interpret(
      &mut board,
      &mail(
        "alice@example.com",
        at(10, 9, 0),
        "[不在連絡]\n不在者[bob]\n不在期間[2024/05/01～2024/05/02]\n不在理由[休暇]",
      ),
    );
    assert!(matches!(
      outcome,
      Outcome::Applied {
        changes: Changes { absences: true, .. },
        ..
      }
    ));
    assert_eq!(board.absences.for_subject("bob@example.com").len(), 1);

    assert_eq!(board.absences.collect_garbage(at(11, 5, 0)), 1);
    assert!(board.absences.for_subject("bob@example.com").is_empty());
    assert!(board.absences.grouped().is_empty());
  }

  #[test]
  fn rejected_mail_changes_nothing() {
    let mut board = Board::new("example.com");
    let mut msg = mail("alice@example.com", at(10, 9, 0), "[開始]\nAM[東京]");
    msg.return_path = Some("<mallory@evil.test>".into());

    match interpret(&mut board, &msg) {
      Outcome::Rejected {
        sender,
        return_path,
      } => {
        assert_eq!(sender, "alice@example.com");
        assert_eq!(return_path, "mallory@evil.test");
      }
      other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(board.status.is_empty());
  }

  #[test]
  fn manager_may_send_on_behalf() {
    let mut board = Board::new("example.com");
    board.managers =
      checkin_core::address::ManagerList::parse("boss", "example.com");
    let mut msg = mail("alice@example.com", at(10, 9, 0), "[開始]\nAM[東京]");
    msg.return_path = Some("<boss@example.com>".into());

    assert!(matches!(interpret(&mut board, &msg), Outcome::Applied { .. }));
    assert!(board.status.get("alice@example.com").is_some());
  }
}
