//! Mail address recognition and normalisation.
//!
//! Every table in the board is keyed by a lower-cased email address. Bare
//! account names (the local part only) are expanded with the organisation's
//! default domain before they are used as keys.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ─── Patterns ────────────────────────────────────────────────────────────────

/// An account token in square brackets, e.g. `[tanaka]`.
static ACCOUNT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\[([A-Za-z0-9\-]+)\]").expect("static account pattern")
});

/// A bare email address anywhere in a line of text.
static MAIL_ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"([A-Za-z0-9\-_.]+@[A-Za-z0-9\-_.]+)")
    .expect("static mail address pattern")
});

/// Extract the first email address contained in `text`, lower-cased.
///
/// Works on display forms such as `"Tanaka <Tanaka@Example.com>"`.
pub fn find_mail_address(text: &str) -> Option<String> {
  MAIL_ADDRESS_PATTERN
    .captures(text)
    .map(|c| c[1].to_lowercase())
}

/// Extract the first bracketed account token contained in `text`.
pub fn find_account(text: &str) -> Option<&str> {
  ACCOUNT_PATTERN
    .captures(text)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Lower-case `raw` and append `@default_domain` when it has no domain part.
///
/// Returns `None` for blank input.
pub fn normalize(raw: &str, default_domain: &str) -> Option<String> {
  let raw = raw.trim();
  if raw.is_empty() {
    return None;
  }
  let lower = raw.to_lowercase();
  if lower.contains('@') {
    Some(lower)
  } else {
    Some(format!("{lower}@{default_domain}"))
  }
}

/// The part of an address before `@`, or the whole string if there is none.
pub fn local_part(address: &str) -> &str {
  address.split_once('@').map_or(address, |(local, _)| local)
}

// ─── Manager allow-list ──────────────────────────────────────────────────────

/// Addresses allowed to send on behalf of somebody else (a mismatching
/// `Return-Path` is accepted when it belongs to a manager).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManagerList(Vec<String>);

impl ManagerList {
  /// Parse the plain-text manager file: one account per line, blank lines and
  /// lines starting with `#` ignored.
  pub fn parse(text: &str, default_domain: &str) -> Self {
    let managers = text
      .lines()
      .filter(|line| !line.starts_with('#'))
      .filter_map(|line| normalize(line, default_domain))
      .collect();
    Self(managers)
  }

  pub fn contains(&self, address: &str) -> bool {
    self.0.iter().any(|m| m == address)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mail_address_found_in_display_form() {
    assert_eq!(
      find_mail_address("Alice Smith <Alice.Smith@Example.COM>"),
      Some("alice.smith@example.com".to_string())
    );
    assert_eq!(find_mail_address("no address here"), None);
  }

  #[test]
  fn account_token_requires_ascii() {
    assert_eq!(find_account("<td>[tanaka-t][内線]</td>"), Some("tanaka-t"));
    assert_eq!(find_account("<td>[内線]</td>"), None);
  }

  #[test]
  fn normalize_expands_bare_accounts() {
    assert_eq!(
      normalize(" Bob ", "example.com"),
      Some("bob@example.com".to_string())
    );
    assert_eq!(
      normalize("Bob@Other.org", "example.com"),
      Some("bob@other.org".to_string())
    );
    assert_eq!(normalize("   ", "example.com"), None);
  }

  #[test]
  fn local_part_strips_domain() {
    assert_eq!(local_part("carol@example.com"), "carol");
    assert_eq!(local_part("carol"), "carol");
  }

  #[test]
  fn manager_file_skips_comments_and_blanks() {
    let text = "# managers\nboss\n\nDeputy@Example.com\n#old\n";
    let managers = ManagerList::parse(text, "example.com");
    assert_eq!(managers.len(), 2);
    assert!(managers.contains("boss@example.com"));
    assert!(managers.contains("deputy@example.com"));
    assert!(!managers.contains("old@example.com"));
  }
}
