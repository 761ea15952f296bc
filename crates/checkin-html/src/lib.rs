//! HTML rendering for the check-in board.
//!
//! Resolves each person's current status from a [`checkin_core::Board`] and
//! merges it into a static HTML template. Pure synchronous; the caller reads
//! the template and writes the result.
//!
//! # Quick start
//!
//! ```no_run
//! use checkin_core::Board;
//! use checkin_html::{PageKind, RenderContext, render_status_page};
//!
//! let board = Board::new("example.com");
//! let ctx = RenderContext {
//!   now:           chrono::Local::now().naive_local(),
//!   manual_url:    "https://wiki.example.com/checkin",
//!   interval_mins: 5,
//! };
//! let template = "<body>\n<td>Tanaka</td>\n<td>[tanaka][内線]</td>\n";
//! let html = render_status_page(template, &board, &ctx, PageKind::Live);
//! ```

pub mod escape;
mod render;
pub mod resolve;

pub use self::{
  render::{PageKind, RenderContext, render_absence_page, render_status_page},
  resolve::{Resolved, resolve},
};
