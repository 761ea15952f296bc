//! Template rendering.
//!
//! The template is an ordinary HTML page in which each person occupies two
//! consecutive lines: a name cell followed by a *slot* line carrying the
//! person's account (`[tanaka]`) or address and a contact placeholder
//! (`[内線 1234]`). The walk keeps exactly one line buffered so that a slot
//! line can always reach back to its name line; both are then replaced by two
//! styled cells. Everything else is copied through. Output uses CRLF.

use checkin_core::{
  Board,
  address,
  status::DisplayStatus,
  store::backup_file_name,
};
use chrono::{Days, NaiveDateTime};

use crate::{
  escape::{embed, embed_pair, escape},
  resolve::resolve,
};

const BODY_OPEN: &str = "<body>";
const COLSPAN: &str = "colspan";
const CRLF: &str = "\r\n";

const NO_ABSENCE_TEXT: &str = "不在予定なし";
const NO_ABSENCE_STYLE: &str = "style='background:white;'";
const ABSENCE_STYLE: &str = "style='background:gainsboro;'";

/// Legend entries in display order.
const LEGEND: [DisplayStatus; 6] = [
  DisplayStatus::Office,
  DisplayStatus::Remote,
  DisplayStatus::Home,
  DisplayStatus::Vacation,
  DisplayStatus::Contact,
  DisplayStatus::Unknown,
];

/// Which flavour of the status page to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
  /// The page served during the day; links back to yesterday's backup.
  Live,
  /// The copy frozen at rollover; links to the neighbouring backups.
  Backup,
}

/// Inputs every render needs besides the board.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
  pub now:           NaiveDateTime,
  pub manual_url:    &'a str,
  /// Poll interval shown next to the last-updated time.
  pub interval_mins: u64,
}

// ─── Template walk ───────────────────────────────────────────────────────────

/// A slot line paired with the name line before it.
struct Slot<'t> {
  address: String,
  /// Between the name line's first `>` and its last `<`.
  name:    &'t str,
  /// The slot line from its first `[` on.
  rest:    &'t str,
  colspan: bool,
}

impl<'t> Slot<'t> {
  fn pair(name_line: &'t str, line: &'t str, address: String) -> Option<Self> {
    let name_from = name_line.find('>')? + 1;
    let name_to = name_line.rfind('<')?;
    if name_from >= name_line.len() || name_from > name_to {
      return None;
    }
    let rest_from = line.find('[')?;
    Some(Self {
      address,
      name: &name_line[name_from..name_to],
      rest: &line[rest_from..],
      colspan: line.contains(COLSPAN),
    })
  }

  /// Write both cells with the same `style` attribute.
  fn write(&self, out: &mut String, style: &str, content: &str) {
    out.push_str(&format!("      <td {style}>{}</td>{CRLF}", self.name));
    if self.colspan {
      out.push_str(&format!("      <td colspan=\"2\" {style}>"));
    } else {
      out.push_str(&format!("      <td {style}>"));
    }
    out.push_str(content);
    out.push_str(CRLF);
  }
}

/// The address a template line stands for, if it is a slot line.
///
/// An account token takes precedence over a literal address.
fn slot_address(line: &str, board: &Board) -> Option<String> {
  match address::find_account(line) {
    Some(account) => board.normalize(account),
    None => address::find_mail_address(line),
  }
}

fn push_line(out: &mut String, line: &str) {
  out.push_str(line);
  out.push_str(CRLF);
}

fn walk<'t>(
  template: &'t str,
  board: &Board,
  mut header: impl FnMut(&mut String),
  mut slot: impl FnMut(&mut String, &Slot<'t>),
) -> String {
  let mut out = String::with_capacity(template.len() * 2);
  let mut buffered: Option<&'t str> = None;

  for line in template.lines() {
    let paired = match slot_address(line, board) {
      Some(address) => buffered.and_then(|prev| Slot::pair(prev, line, address)),
      None if line.contains(BODY_OPEN) => {
        if let Some(prev) = buffered.take() {
          push_line(&mut out, prev);
        }
        push_line(&mut out, line);
        header(&mut out);
        continue;
      }
      None => None,
    };

    match paired {
      Some(paired) => {
        buffered = None;
        slot(&mut out, &paired);
      }
      None => {
        if let Some(prev) = buffered.replace(line) {
          push_line(&mut out, prev);
        }
      }
    }
  }

  if let Some(prev) = buffered {
    push_line(&mut out, prev);
  }
  out
}

// ─── Header blocks ───────────────────────────────────────────────────────────

fn last_updated(out: &mut String, ctx: &RenderContext<'_>) {
  out.push_str(&format!(
    "<table border=\"0\" width=\"100%\"><tbody><tr><td align=\"right\">\
     最終更新日時({}分毎更新)：{}</td></tr></tbody></table>{CRLF}",
    ctx.interval_mins,
    ctx.now.format("%Y/%m/%d %H:%M"),
  ));
}

fn navigation(out: &mut String, ctx: &RenderContext<'_>, kind: PageKind) {
  let today = ctx.now.date();
  let yesterday = today - Days::new(1);

  out.push_str(
    "<table border=\"0\" width=\"100%\"><tbody><tr><td align=\"left\"><a href=\"",
  );
  match kind {
    PageKind::Live => {
      out.push_str(&format!("bk/{}\">←前日</a>", backup_file_name(yesterday)));
    }
    PageKind::Backup => {
      let before = yesterday - Days::new(1);
      out.push_str(&format!(
        "{}\">←前日</a>◆<a href=\"{}\">翌日→</a>",
        backup_file_name(before),
        backup_file_name(today),
      ));
    }
  }
  out.push_str(&format!(
    "</td><td align=\"right\"><a href=\"{}\" target=\"_blank\">マニュアル</a>\
     </td></tr></tbody></table>{CRLF}",
    ctx.manual_url,
  ));
}

fn legend(out: &mut String) {
  out.push_str(
    "<table cellspacing=\"3\" width=\"40%\" align=\"right\"><tbody>\
     <tr align=\"center\"><td width=\"10%\" align=\"right\">凡例</td>",
  );
  for status in LEGEND {
    out.push_str(&format!(
      "<td width=\"15%\" {}>{}</td>",
      status.style(),
      status.label()
    ));
  }
  out.push_str("</tr></tbody></table>");
  out.push_str(CRLF);
}

// ─── Pages ───────────────────────────────────────────────────────────────────

/// Render the status page: navigation and legend after `<body>`, one
/// resolved cell pair per slot.
pub fn render_status_page(
  template: &str,
  board: &Board,
  ctx: &RenderContext<'_>,
  kind: PageKind,
) -> String {
  walk(
    template,
    board,
    |out| {
      navigation(out, ctx, kind);
      last_updated(out, ctx);
      legend(out);
    },
    |out, slot| {
      let resolved = resolve(
        board.status.get(&slot.address),
        board.absences.for_subject(&slot.address),
        ctx.now,
      );
      let tel = resolved.tel.as_deref().map(escape);

      let filled = match resolved.absence_reported.as_deref() {
        Some(reporter) if !reporter.is_empty() => {
          let notice = escape(&format!("不在連絡：{reporter}"));
          embed_pair(slot.rest, tel.as_deref(), &notice)
        }
        _ => embed(slot.rest, tel.as_deref()),
      };

      let content = format!("{}{}", resolved.text, filled);
      slot.write(out, &resolved.status.style(), &content);
    },
  )
}

/// Render the absence board: every pending notice about each person, or
/// `不在予定なし`.
pub fn render_absence_page(
  template: &str,
  board: &Board,
  ctx: &RenderContext<'_>,
) -> String {
  walk(
    template,
    board,
    |out| last_updated(out, ctx),
    |out, slot| {
      let records = board.absences.for_subject(&slot.address);
      let (style, summary) = if records.is_empty() {
        (NO_ABSENCE_STYLE, NO_ABSENCE_TEXT.to_string())
      } else {
        let joined = records
          .iter()
          .map(ToString::to_string)
          .collect::<Vec<_>>()
          .join(", ");
        (ABSENCE_STYLE, joined)
      };
      let content = embed(slot.rest, Some(&escape(&summary)));
      slot.write(out, style, &content);
    },
  )
}
