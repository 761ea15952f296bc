//! Text helpers shared by the command parser and the update engine.

use checkin_core::status::Status;

// ─── Charset normalisation ───────────────────────────────────────────────────

/// Code points remapped before parsing so that mail written with either
/// Unicode mapping of the legacy Japanese charset compares equal.
const CHARSET_MAP: [(char, char); 7] = [
  ('\u{2014}', '\u{2015}'), // EM DASH → HORIZONTAL BAR
  ('\u{301c}', '\u{ff5e}'), // WAVE DASH → FULLWIDTH TILDE
  ('\u{2016}', '\u{2225}'), // DOUBLE VERTICAL LINE → PARALLEL TO
  ('\u{2212}', '\u{ff0d}'), // MINUS SIGN → FULLWIDTH HYPHEN-MINUS
  ('\u{00a2}', '\u{ffe0}'), // CENT SIGN → FULLWIDTH CENT SIGN
  ('\u{00a3}', '\u{ffe1}'), // POUND SIGN → FULLWIDTH POUND SIGN
  ('\u{00ac}', '\u{ffe2}'), // NOT SIGN → FULLWIDTH NOT SIGN
];

pub fn normalize_charset(text: &str) -> String {
  text
    .chars()
    .map(|c| {
      CHARSET_MAP
        .iter()
        .find(|(from, _)| *from == c)
        .map_or(c, |(_, to)| *to)
    })
    .collect()
}

// ─── Bracket extraction ──────────────────────────────────────────────────────

/// The text strictly between the first `[` and the next `]`.
///
/// Returns `text` unchanged when there is no such pair.
pub fn bracket_text(text: &str) -> &str {
  let Some(open) = text.find('[') else {
    return text;
  };
  match text[open + 1..].find(']') {
    Some(len) => &text[open + 1..open + 1 + len],
    None => text,
  }
}

/// [`bracket_text`] with any leading `:`/`：` and surrounding blanks removed,
/// for fields whose value is parsed further (a person, a period).
pub fn field_value(text: &str) -> &str {
  bracket_text(text)
    .trim_start_matches([':', '：'])
    .trim_matches([' ', '\t', '\u{3000}'])
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Category keywords in priority order; the first one contained in the text
/// decides the status.
pub const CATEGORY_KEYWORDS: [(&str, Status); 8] = [
  ("[在宅]", Status::Remote),
  ("[外出]", Status::Remote),
  ("[出張]", Status::Remote),
  ("[東京]", Status::Office),
  ("[大阪]", Status::Office),
  ("[非番]", Status::Offduty),
  ("[休暇]", Status::Vacation),
  ("[休職]", Status::Leave),
];

/// Classify a declaration; anything unrecognised counts as plain contact.
pub fn classify(text: &str) -> Status {
  CATEGORY_KEYWORDS
    .iter()
    .find(|(keyword, _)| text.contains(keyword))
    .map_or(Status::Contact, |(_, status)| *status)
}
