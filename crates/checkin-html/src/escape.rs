//! HTML escaping and placeholder substitution.

// ─── Escaping ────────────────────────────────────────────────────────────────

/// Whitespace entities that survive escaping when a value already carries
/// them.
const KEPT_ENTITIES: [&str; 4] = ["nbsp", "ensp", "emsp", "thinsp"];

/// Entity-escape a value inserted into rendered output.
///
/// Spaces become `&nbsp;` so cell text never wraps. `&nbsp;`, `&ensp;`,
/// `&emsp;` and `&thinsp;` already present in `src` are kept as they are.
pub fn escape(src: &str) -> String {
  let mut out = String::with_capacity(src.len());
  for c in src.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      ' ' => out.push_str("&nbsp;"),
      c => out.push(c),
    }
  }

  for entity in KEPT_ENTITIES {
    let doubled = format!("&amp;{entity};");
    if out.contains(&doubled) {
      out = out.replace(&doubled, &format!("&{entity};"));
    }
  }
  out
}

// ─── Placeholder ─────────────────────────────────────────────────────────────

/// Opening of the contact-number placeholder in the template, e.g.
/// `[内線 1234]`.
pub const PLACEHOLDER_START: &str = "[内線";
const PLACEHOLDER_END: char = ']';

/// Byte offsets of the placeholder's `[` and its closing `]`.
fn placeholder(src: &str) -> Option<(usize, usize)> {
  let start = src.find(PLACEHOLDER_START)?;
  let end = start + src[start..].find(PLACEHOLDER_END)?;
  Some((start, end))
}

/// Replace the placeholder in `src` with `[value]`.
///
/// `src` is returned unchanged when there is no value or no placeholder.
pub fn embed(src: &str, value: Option<&str>) -> String {
  match (value, placeholder(src)) {
    (Some(value), Some((start, end))) => {
      format!("{}[{}]{}", &src[..start], value, &src[end + 1..])
    }
    _ => src.to_string(),
  }
}

/// Replace the placeholder in `src` with `[first][second]`.
///
/// A missing `first` keeps the placeholder's own text in the first slot.
pub fn embed_pair(src: &str, first: Option<&str>, second: &str) -> String {
  let Some((start, end)) = placeholder(src) else {
    return src.to_string();
  };
  let first = first.unwrap_or(&src[start + 1..end]);
  format!("{}[{}][{}]{}", &src[..start], first, second, &src[end + 1..])
}
