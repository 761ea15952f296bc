//! [`JsonStore`] — the file-based implementation of [`BoardStore`].

use std::{
  collections::BTreeMap,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::URL_SAFE};
use checkin_core::{
  absence::GroupedAbsences,
  address::ManagerList,
  status::{InitialValue, StatusTable},
  store::{Artifact, BoardStore, Rejection, backup_file_name},
};
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt as _;

use crate::{Error, Result};

const STATUS_FILE: &str = "status.json";
const ABSENCE_FILE: &str = "absence.json";
const ALTERNATE_FILE: &str = "alternate.bin";
const INITIAL_VALUE_FILE: &str = "initialValue.txt";
const MANAGERS_FILE: &str = "managers.txt";
const REJECTION_LOG: &str = "rejected.txt";

// ─── Layout ──────────────────────────────────────────────────────────────────

/// Where each file lives.
#[derive(Debug, Clone)]
pub struct Layout {
  /// Holds the tables, the static inputs and the rejection log.
  pub state_dir:       PathBuf,
  pub live_page:       PathBuf,
  pub absence_page:    PathBuf,
  /// Daily copies of the live page.
  pub backup_dir:      PathBuf,
  /// Daily snapshots of the status table.
  pub backup_json_dir: PathBuf,
}

impl Layout {
  /// Everything below `root`, in the default arrangement.
  pub fn under(root: impl AsRef<Path>) -> Self {
    let root = root.as_ref();
    Self {
      state_dir:       root.join("state"),
      live_page:       root.join("output/index.html"),
      absence_page:    root.join("output/absence.html"),
      backup_dir:      root.join("output/bk"),
      backup_json_dir: root.join("state/bk"),
    }
  }

  fn state(&self, name: &str) -> PathBuf { self.state_dir.join(name) }

  fn artifact(&self, artifact: Artifact) -> PathBuf {
    match artifact {
      Artifact::LivePage => self.live_page.clone(),
      Artifact::AbsencePage => self.absence_page.clone(),
      Artifact::BackupPage(date) => {
        self.backup_dir.join(backup_file_name(date))
      }
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A board store backed by plain files.
///
/// A table whose file does not exist yet loads as empty.
#[derive(Debug, Clone)]
pub struct JsonStore {
  layout: Layout,
}

impl JsonStore {
  /// Create the directories of `layout` if needed.
  pub async fn open(layout: Layout) -> Result<Self> {
    let mut dirs = vec![
      layout.state_dir.clone(),
      layout.backup_dir.clone(),
      layout.backup_json_dir.clone(),
    ];
    dirs.extend(
      [&layout.live_page, &layout.absence_page]
        .into_iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf)),
    );

    for dir in dirs {
      if dir.as_os_str().is_empty() {
        continue;
      }
      tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| Error::Io { path: dir, source })?;
    }
    Ok(Self { layout })
  }

  pub fn layout(&self) -> &Layout { &self.layout }
}

// ─── File helpers ────────────────────────────────────────────────────────────

/// Read `path`, or `None` when it does not exist.
async fn read_optional(path: &Path) -> Result<Option<String>> {
  match tokio::fs::read_to_string(path).await {
    Ok(text) => Ok(Some(text)),
    Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
    Err(source) => Err(Error::Io {
      path: path.to_path_buf(),
      source,
    }),
  }
}

async fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
  tokio::fs::write(path, contents)
    .await
    .map_err(|source| Error::Io {
      path: path.to_path_buf(),
      source,
    })
}

fn decode<T: DeserializeOwned>(path: &Path, text: &str) -> Result<T> {
  serde_json::from_str(text).map_err(|source| Error::Json {
    path: path.to_path_buf(),
    source,
  })
}

fn encode<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<String> {
  serde_json::to_string_pretty(value).map_err(|source| Error::Json {
    path: path.to_path_buf(),
    source,
  })
}

async fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
  match read_optional(path).await? {
    Some(text) => decode(path, &text),
    None => Ok(T::default()),
  }
}

/// Drop `#` comment lines before decoding.
fn strip_comments(text: &str) -> String {
  text
    .lines()
    .filter(|line| !line.starts_with('#'))
    .collect::<Vec<_>>()
    .join("\n")
}

// ─── BoardStore impl ─────────────────────────────────────────────────────────

impl BoardStore for JsonStore {
  type Error = Error;

  // ── Status table ──────────────────────────────────────────────────────────

  async fn load_status(&self) -> Result<StatusTable> {
    load_json(&self.layout.state(STATUS_FILE)).await
  }

  async fn save_status(&self, table: &StatusTable) -> Result<()> {
    let path = self.layout.state(STATUS_FILE);
    write(&path, encode(&path, table)?).await
  }

  async fn save_status_snapshot(
    &self,
    date: NaiveDate,
    table: &StatusTable,
  ) -> Result<()> {
    let name = format!("{}.json", date.format("%Y%m%d"));
    let path = self.layout.backup_json_dir.join(name);
    write(&path, encode(&path, table)?).await
  }

  // ── Absences ──────────────────────────────────────────────────────────────

  async fn load_absences(&self) -> Result<GroupedAbsences> {
    load_json(&self.layout.state(ABSENCE_FILE)).await
  }

  async fn save_absences(&self, grouped: &GroupedAbsences) -> Result<()> {
    let path = self.layout.state(ABSENCE_FILE);
    write(&path, encode(&path, grouped)?).await
  }

  // ── Alternate addresses ───────────────────────────────────────────────────

  async fn load_alternates(&self) -> Result<BTreeMap<String, Vec<String>>> {
    let path = self.layout.state(ALTERNATE_FILE);
    let Some(text) = read_optional(&path).await? else {
      return Ok(BTreeMap::new());
    };
    let bytes = URL_SAFE
      .decode(text.trim())
      .map_err(|source| Error::Base64 {
        path: path.clone(),
        source,
      })?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Json { path, source })
  }

  async fn save_alternates(
    &self,
    forward: &BTreeMap<String, Vec<String>>,
  ) -> Result<()> {
    let path = self.layout.state(ALTERNATE_FILE);
    let json = serde_json::to_vec(forward).map_err(|source| Error::Json {
      path: path.clone(),
      source,
    })?;
    write(&path, URL_SAFE.encode(json)).await
  }

  // ── Static inputs ─────────────────────────────────────────────────────────

  async fn load_initial_values(&self) -> Result<BTreeMap<String, InitialValue>> {
    let path = self.layout.state(INITIAL_VALUE_FILE);
    match read_optional(&path).await? {
      Some(text) => decode(&path, &strip_comments(&text)),
      None => Ok(BTreeMap::new()),
    }
  }

  async fn load_managers(&self, default_domain: &str) -> Result<ManagerList> {
    let path = self.layout.state(MANAGERS_FILE);
    let text = read_optional(&path).await?.unwrap_or_default();
    Ok(ManagerList::parse(&text, default_domain))
  }

  // ── Outputs ───────────────────────────────────────────────────────────────

  async fn append_rejection(&self, rejection: &Rejection) -> Result<()> {
    let path = self.layout.state(REJECTION_LOG);
    let line = format!(
      "{}, {}, {}\n",
      rejection.date.format("%Y/%m/%d"),
      rejection.sender,
      rejection.return_path,
    );

    let io_err = |source| Error::Io {
      path: path.clone(),
      source,
    };
    let mut file = tokio::fs::OpenOptions::new()
      .create(true)
      .append(true)
      .open(&path)
      .await
      .map_err(io_err)?;
    file.write_all(line.as_bytes()).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)
  }

  async fn publish(&self, artifact: Artifact, html: &str) -> Result<()> {
    write(&self.layout.artifact(artifact), html).await
  }
}
