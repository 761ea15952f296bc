//! The check-in board daemon: polls a mail spool, keeps the board and its
//! files up to date, and optionally serves the pages over HTTP.

pub mod daemon;
pub mod error;
pub mod http;
pub mod spool;

use std::path::PathBuf;

use checkin_html::RenderContext;
use checkin_store_json::Layout;
use chrono::NaiveDateTime;
use serde::Deserialize;

pub use self::{
  daemon::Daemon,
  error::{Error, Result},
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
  /// Directory of `.eml` files waiting to be processed.
  pub spool_dir:       PathBuf,
  pub state_dir:       PathBuf,
  pub template:        PathBuf,
  pub live_page:       PathBuf,
  pub absence_page:    PathBuf,
  pub backup_dir:      PathBuf,
  pub backup_json_dir: PathBuf,
  /// Domain appended to bare account names.
  pub default_domain:  String,
  #[serde(default)]
  pub manual_url:      String,
  #[serde(default = "default_interval_secs")]
  pub interval_secs:   u64,
  /// Local hour at which yesterday's page is frozen and the day restarts.
  #[serde(default = "default_rollover_hour")]
  pub rollover_hour:   u32,
  /// Serve the pages over HTTP on this address when set.
  #[serde(default)]
  pub listen:          Option<String>,
}

fn default_interval_secs() -> u64 { 300 }

fn default_rollover_hour() -> u32 { 5 }

impl DaemonConfig {
  pub fn layout(&self) -> Layout {
    Layout {
      state_dir:       self.state_dir.clone(),
      live_page:       self.live_page.clone(),
      absence_page:    self.absence_page.clone(),
      backup_dir:      self.backup_dir.clone(),
      backup_json_dir: self.backup_json_dir.clone(),
    }
  }

  /// Poll interval in whole minutes, as printed on the pages.
  pub fn interval_mins(&self) -> u64 { (self.interval_secs / 60).max(1) }

  /// Read the template fresh, so edits take effect on the next render.
  pub async fn read_template(&self) -> Result<String> {
    tokio::fs::read_to_string(&self.template)
      .await
      .map_err(|source| Error::Template {
        path: self.template.clone(),
        source,
      })
  }
}

pub(crate) fn render_context(
  config: &DaemonConfig,
  now: NaiveDateTime,
) -> RenderContext<'_> {
  RenderContext {
    now,
    manual_url: &config.manual_url,
    interval_mins: config.interval_mins(),
  }
}
