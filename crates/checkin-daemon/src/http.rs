//! Read-only HTTP view of the board.
//!
//! Pages are rendered on request from the in-memory board, so they are never
//! older than the last applied message.

use std::sync::Arc;

use axum::{
  Router,
  extract::State,
  http::header,
  response::{Html, IntoResponse},
  routing::get,
};
use checkin_core::Board;
use checkin_html::{PageKind, render_absence_page, render_status_page};
use chrono::Local;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::{DaemonConfig, Result, render_context};

// ─── Application state ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
  pub board:  Arc<RwLock<Board>>,
  pub config: Arc<DaemonConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(status_page))
    .route("/absence", get(absence_page))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn status_page(State(state): State<AppState>) -> Result<impl IntoResponse> {
  let template = state.config.read_template().await?;
  let ctx = render_context(&state.config, Local::now().naive_local());
  let board = state.board.read().await;
  let html = render_status_page(&template, &board, &ctx, PageKind::Live);
  Ok(no_cache(html))
}

async fn absence_page(State(state): State<AppState>) -> Result<impl IntoResponse> {
  let template = state.config.read_template().await?;
  let ctx = render_context(&state.config, Local::now().naive_local());
  let board = state.board.read().await;
  Ok(no_cache(render_absence_page(&template, &board, &ctx)))
}

fn no_cache(html: String) -> impl IntoResponse {
  ([(header::CACHE_CONTROL, "no-cache")], Html(html))
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use checkin_core::status::Status;
  use chrono::NaiveDate;
  use tower::ServiceExt as _;

  use super::*;

  const TEMPLATE: &str = "<html>\n<body>\n<table>\n<tr>\n\
                          <td>Alice</td>\n<td>[alice][内線]</td>\n\
                          </tr>\n</table>\n</body>\n</html>\n";

  fn config(template: PathBuf) -> DaemonConfig {
    DaemonConfig {
      spool_dir: PathBuf::from("spool"),
      state_dir: PathBuf::from("state"),
      template,
      live_page: PathBuf::from("index.html"),
      absence_page: PathBuf::from("absence.html"),
      backup_dir: PathBuf::from("bk"),
      backup_json_dir: PathBuf::from("state/bk"),
      default_domain: "example.com".into(),
      manual_url: String::new(),
      interval_secs: 300,
      rollover_hour: 5,
      listen: None,
    }
  }

  async fn get_page(state: AppState, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  async fn state_with_template() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.html");
    tokio::fs::write(&template, TEMPLATE).await.unwrap();

    let mut board = Board::new("example.com");
    let st = board.status.touch(
      "alice@example.com",
      NaiveDate::from_ymd_opt(2024, 5, 10)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap(),
    );
    st.status_am = Status::Remote;
    st.status_pm = Status::Remote;

    let state = AppState {
      board:  Arc::new(RwLock::new(board)),
      config: Arc::new(config(template)),
    };
    (dir, state)
  }

  #[tokio::test]
  async fn status_page_reflects_board() {
    let (_dir, state) = state_with_template().await;
    let (status, html) = get_page(state, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("style='background:aqua;'>Alice</td>"), "{html}");
    assert!(html.contains("凡例"));
  }

  #[tokio::test]
  async fn absence_page_lists_nothing_pending() {
    let (_dir, state) = state_with_template().await;
    let (status, html) = get_page(state, "/absence").await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("不在予定なし"));
  }

  #[tokio::test]
  async fn missing_template_is_a_server_error() {
    let state = AppState {
      board:  Arc::new(RwLock::new(Board::new("example.com"))),
      config: Arc::new(config(PathBuf::from("/nonexistent/template.html"))),
    };
    let (status, _) = get_page(state, "/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  }
}
