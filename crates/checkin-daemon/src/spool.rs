//! A [`MessageSource`] over a spool directory of `.eml` files.
//!
//! Whatever delivers mail (an MDA, `fetchmail`, a test) drops one RFC 5322
//! message per file into the directory. Files are taken in file-name order
//! and deleted once acknowledged.

use std::path::{Path, PathBuf};

use checkin_core::message::{Fetched, InboundMessage, MessageSource};
use chrono::{DateTime, Local, NaiveDateTime};
use mail_parser::{HeaderName, MessageParser};

use crate::{Error, Result};

const EXTENSION: &str = "eml";

#[derive(Debug, Clone)]
pub struct SpoolDir {
  dir: PathBuf,
}

impl SpoolDir {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  async fn list(&self) -> Result<Vec<PathBuf>> {
    let io_err = |source| Error::Spool {
      path: self.dir.clone(),
      source,
    };
    let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
      let path = entry.path();
      if path.extension().is_some_and(|ext| ext == EXTENSION) {
        paths.push(path);
      }
    }
    paths.sort();
    Ok(paths)
  }
}

/// Decode one message; `None` when the bytes are not a parseable message.
pub fn decode(
  id: String,
  raw: &[u8],
  received: NaiveDateTime,
) -> Option<InboundMessage> {
  let message = MessageParser::default().parse(raw)?;

  let from = message
    .from()
    .and_then(|from| from.first())
    .and_then(|addr| addr.address())
    .unwrap_or_default()
    .to_string();
  let return_path = message
    .header_raw(HeaderName::ReturnPath)
    .map(|raw| raw.trim().to_string());
  let sent_at = message
    .date()
    .and_then(|date| DateTime::from_timestamp(date.to_timestamp(), 0))
    .map_or(received, |utc| utc.with_timezone(&Local).naive_local());
  let body = message.body_text(0).unwrap_or_default().into_owned();

  Some(InboundMessage {
    id,
    from,
    return_path,
    sent_at,
    body,
  })
}

fn file_id(path: &Path) -> String { path.to_string_lossy().into_owned() }

impl MessageSource for SpoolDir {
  type Error = Error;

  async fn fetch(&self) -> Result<Fetched> {
    let now = Local::now().naive_local();
    let mut fetched = Fetched::default();

    for path in self.list().await? {
      let id = file_id(&path);
      let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) => {
          tracing::warn!(file = %id, error = %e, "unreadable spool file");
          fetched.skipped.push(id);
          continue;
        }
      };
      match decode(id.clone(), &raw, now) {
        Some(message) => fetched.messages.push(message),
        None => {
          tracing::warn!(file = %id, "undecodable message");
          fetched.skipped.push(id);
        }
      }
    }
    Ok(fetched)
  }

  async fn acknowledge(&self, id: &str) -> Result<()> {
    match tokio::fs::remove_file(id).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(source) => Err(Error::Spool {
        path: PathBuf::from(id),
        source,
      }),
    }
  }
}
