//! Command recognition in free-form mail bodies.
//!
//! A body may contain anything (greetings, signatures, quoted replies). A
//! command starts at a line whose trimmed text begins with a marker such as
//! `[開始]`, and only counts once the following line begins with one of the
//! marker's field prefixes. Scanning is a small state machine:
//!
//! ```text
//!   Seeking ──marker──▶ Confirming ──field prefix──▶ Consuming
//!      ▲                    │
//!      └──── other line ────┘
//! ```
//!
//! A marker that is never confirmed is still remembered: if the body ends
//! without a confirmed block, the last marker seen applies with no fields.

use crate::text::normalize_charset;

// ─── Vocabulary ──────────────────────────────────────────────────────────────

pub const START_MARK: &str = "[開始]";
pub const END_MARK: &str = "[終了]";
pub const FIX_MARK: &str = "[修正]";
pub const CLEAR_MARK: &str = "[クリア]";
pub const ABSENCE_MARK: &str = "[不在連絡]";
pub const ABSENCE_RESET_MARK: &str = "[不在連絡取消]";

pub const AM_FIELD: &str = "AM";
pub const PM_FIELD: &str = "PM";
pub const TEL_FIELD: &str = "TEL";
pub const ALT_FIELD: &str = "ALT";

pub const PERSON_FIELD: &str = "不在者";
pub const PERIOD_FIELD: &str = "不在期間";
pub const REASON_FIELD: &str = "不在理由";
pub const ABSENCE_TEL_FIELD: &str = "不在時TEL";

const NORMAL_FIELDS: [&str; 4] = [AM_FIELD, PM_FIELD, TEL_FIELD, ALT_FIELD];
const ABSENCE_FIELDS: [&str; 4] =
  [PERSON_FIELD, PERIOD_FIELD, REASON_FIELD, ABSENCE_TEL_FIELD];

/// Markers in the order they are tested against a line.
const MARKERS: [(&str, Command); 6] = [
  (START_MARK, Command::Start),
  (END_MARK, Command::End),
  (FIX_MARK, Command::Fix),
  (CLEAR_MARK, Command::Clear),
  (ABSENCE_MARK, Command::AbsenceRegister),
  (ABSENCE_RESET_MARK, Command::AbsenceReset),
];

// ─── Command ─────────────────────────────────────────────────────────────────

/// What a mail body asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  /// Start of the working day.
  Start,
  /// End of the working day.
  End,
  /// Correct AM/PM/TEL/ALT without touching the finished flag.
  Fix,
  /// Reopen a finished day; only honoured on the very first line.
  Clear,
  /// File an absence notice.
  AbsenceRegister,
  /// Withdraw absence notices.
  AbsenceReset,
  /// No command found; the sender is only marked as having written.
  None,
}

impl Command {
  fn from_line(line: &str) -> Option<Self> {
    MARKERS
      .iter()
      .find(|(mark, _)| line.starts_with(mark))
      .map(|(_, cmd)| *cmd)
  }

  /// Prefixes that may open this command's field block.
  pub fn field_prefixes(self) -> &'static [&'static str] {
    match self {
      Self::Start | Self::End | Self::Fix => &NORMAL_FIELDS,
      Self::AbsenceRegister | Self::AbsenceReset => &ABSENCE_FIELDS,
      Self::Clear | Self::None => &[],
    }
  }

  fn accepts_field(self, line: &str) -> bool {
    self.field_prefixes().iter().any(|p| line.starts_with(p))
  }

  pub fn is_absence(self) -> bool {
    matches!(self, Self::AbsenceRegister | Self::AbsenceReset)
  }
}

// ─── Parsed body ─────────────────────────────────────────────────────────────

/// A recognised command together with the lines its fields are read from.
#[derive(Debug, Clone)]
pub struct ParsedBody {
  pub command: Command,
  lines:       Vec<String>,
  fields_from: usize,
}

impl ParsedBody {
  /// Every line from the start of the field block to the end of the body.
  pub fn fields(&self) -> &[String] {
    self.lines.get(self.fields_from..).unwrap_or(&[])
  }
}

// ─── Scanner ─────────────────────────────────────────────────────────────────

enum ScanState {
  Seeking,
  Confirming(Command),
  Consuming(Command),
}

/// Split a body into lines after charset normalisation.
///
/// Runs of line breaks count as one. A body that opens with a line break
/// keeps an empty first line, so nothing but the literal first line can be
/// a clear.
pub(crate) fn body_lines(body: &str) -> Vec<String> {
  normalize_charset(body)
    .split(['\r', '\n'])
    .enumerate()
    .filter(|(i, l)| *i == 0 || !l.is_empty())
    .map(|(_, l)| l.to_owned())
    .collect()
}

/// Find the command in `body`.
pub fn parse_body(body: &str) -> ParsedBody {
  let lines = body_lines(body);
  let mut state = ScanState::Seeking;
  let mut last_marker = Command::None;
  let mut i = 0;

  loop {
    match state {
      ScanState::Seeking => {
        let Some(line) = lines.get(i) else {
          break;
        };
        match Command::from_line(line.trim_start()) {
          Some(Command::Clear) if i == 0 => {
            return ParsedBody {
              command:     Command::Clear,
              fields_from: lines.len(),
              lines,
            };
          }
          Some(Command::Clear) | None => {}
          Some(cmd) => {
            last_marker = cmd;
            state = ScanState::Confirming(cmd);
          }
        }
        i += 1;
      }
      ScanState::Confirming(cmd) => {
        state = match lines.get(i) {
          Some(line) if cmd.accepts_field(line.trim_start()) => {
            ScanState::Consuming(cmd)
          }
          _ => ScanState::Seeking,
        };
      }
      ScanState::Consuming(cmd) => {
        return ParsedBody {
          command: cmd,
          lines,
          fields_from: i,
        };
      }
    }
  }

  ParsedBody {
    command:     last_marker,
    fields_from: lines.len(),
    lines,
  }
}
