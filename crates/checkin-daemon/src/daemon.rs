//! The poll loop: drain the mailbox, apply every message to the board,
//! persist what changed and republish the pages.

use std::{sync::Arc, time::Duration};

use checkin_core::{
  Board,
  absence::AbsenceIndex,
  alternate::AlternateTable,
  message::MessageSource,
  store::{Artifact, BoardStore, Rejection},
};
use checkin_html::{PageKind, render_absence_page, render_status_page};
use checkin_mail::{Changes, Command, Outcome};
use chrono::{Days, Local, NaiveDate, NaiveDateTime, Timelike};
use tokio::{
  sync::RwLock,
  time::{MissedTickBehavior, interval},
};

use crate::{DaemonConfig, Error, Result, render_context};

/// Owns the board and drives the poll cycle.
pub struct Daemon<S, M> {
  store:         S,
  source:        M,
  board:         Arc<RwLock<Board>>,
  config:        Arc<DaemonConfig>,
  last_rollover: Option<NaiveDate>,
  /// Tables changed in memory but not yet written out.
  unsaved:       Changes,
}

impl<S, M> Daemon<S, M>
where
  S: BoardStore,
  M: MessageSource,
{
  /// Load every persisted table and seed initial values for `now`.
  ///
  /// A table that cannot be loaded starts empty.
  pub async fn start(
    config: Arc<DaemonConfig>,
    store: S,
    source: M,
    now: NaiveDateTime,
  ) -> Self {
    let mut board = Board::new(config.default_domain.clone());

    match store.load_status().await {
      Ok(status) => board.status = status,
      Err(e) => tracing::warn!(error = %e, "status table reset"),
    }
    match store.load_absences().await {
      Ok(grouped) => {
        let (index, dropped) = AbsenceIndex::load(grouped);
        if dropped > 0 {
          tracing::debug!(dropped, "invalid absence records dropped on load");
        }
        board.absences = index;
      }
      Err(e) => tracing::warn!(error = %e, "absence table reset"),
    }
    match store.load_alternates().await {
      Ok(forward) => board.alternates = AlternateTable::from_forward(forward),
      Err(e) => tracing::warn!(error = %e, "alternate table reset"),
    }
    reload_static(&store, &mut board, now).await;

    tracing::info!(
      people = board.status.len(),
      absences = board.absences.len(),
      managers = board.managers.len(),
      "board loaded"
    );

    Self {
      store,
      source,
      board: Arc::new(RwLock::new(board)),
      config,
      last_rollover: None,
      unsaved: Changes::default(),
    }
  }

  /// The shared board, for readers such as the HTTP endpoint.
  pub fn board(&self) -> Arc<RwLock<Board>> { Arc::clone(&self.board) }

  /// Run cycles every `interval_secs`, measured from cycle start.
  ///
  /// A failed cycle is logged and the loop carries on.
  pub async fn run(mut self) {
    let mut ticker = interval(Duration::from_secs(self.config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      let now = Local::now().naive_local();
      if let Err(e) = self.cycle(now).await {
        tracing::error!(error = %e, "poll cycle failed");
      }
    }
  }

  /// One poll cycle at `now`.
  ///
  /// Each message is removed from the mailbox before it is applied, so a
  /// cycle that fails later never applies it a second time. Tables that could
  /// not be saved stay marked and are written on the next cycle.
  pub async fn cycle(&mut self, now: NaiveDateTime) -> Result<()> {
    if self.rollover_due(now) {
      self.rollover(now).await?;
    }

    let fetched = self.source.fetch().await.map_err(Error::mailbox)?;
    for id in &fetched.skipped {
      self.source.acknowledge(id).await.map_err(Error::mailbox)?;
    }

    let mut applied = 0usize;
    for message in &fetched.messages {
      self
        .source
        .acknowledge(&message.id)
        .await
        .map_err(Error::mailbox)?;
      let outcome = {
        let mut board = self.board.write().await;
        checkin_mail::interpret(&mut board, message)
      };
      applied += usize::from(matches!(outcome, Outcome::Applied { .. }));
      self.record(outcome, message.from.as_str(), now).await;
    }

    self.flush().await?;
    self.publish(now).await?;
    tracing::info!(
      fetched = fetched.messages.len(),
      skipped = fetched.skipped.len(),
      applied,
      "poll cycle complete"
    );
    Ok(())
  }

  /// Log `outcome`, mark the tables it changed and append any rejection.
  async fn record(&mut self, outcome: Outcome, from: &str, now: NaiveDateTime) {
    match outcome {
      Outcome::Applied {
        sender,
        command,
        changes,
      } => {
        tracing::debug!(%sender, ?command, "message applied");
        if command == Command::AbsenceRegister && !changes.absences {
          tracing::debug!(%sender, "invalid absence notice dropped");
        }
        self.unsaved.absences |= changes.absences;
        self.unsaved.alternates |= changes.alternates;
      }
      Outcome::Ignored => {
        tracing::debug!(%from, "message without usable sender ignored");
      }
      Outcome::Rejected {
        sender,
        return_path,
      } => {
        tracing::warn!(%sender, %return_path, "return-path rejected");
        let rejection = Rejection {
          date: now.date(),
          sender,
          return_path,
        };
        if let Err(e) = self.store.append_rejection(&rejection).await {
          tracing::warn!(error = %e, "rejection log not written");
        }
      }
    }
  }

  /// Write every table marked unsaved, clearing each mark once written.
  async fn flush(&mut self) -> Result<()> {
    let board = self.board.read().await;
    if self.unsaved.absences {
      self
        .store
        .save_absences(board.absences.grouped())
        .await
        .map_err(Error::store)?;
      self.unsaved.absences = false;
    }
    if self.unsaved.alternates {
      self
        .store
        .save_alternates(board.alternates.forward())
        .await
        .map_err(Error::store)?;
      self.unsaved.alternates = false;
    }
    Ok(())
  }

  /// Render both pages and save the status table.
  async fn publish(&self, now: NaiveDateTime) -> Result<()> {
    let template = self.config.read_template().await?;
    let ctx = render_context(&self.config, now);
    let board = self.board.read().await;

    let live = render_status_page(&template, &board, &ctx, PageKind::Live);
    let absence = render_absence_page(&template, &board, &ctx);

    self
      .store
      .publish(Artifact::LivePage, &live)
      .await
      .map_err(Error::store)?;
    self
      .store
      .save_status(&board.status)
      .await
      .map_err(Error::store)?;
    self
      .store
      .publish(Artifact::AbsencePage, &absence)
      .await
      .map_err(Error::store)
  }

  // ─── Daily rollover ──────────────────────────────────────────────────────

  fn rollover_due(&self, now: NaiveDateTime) -> bool {
    now.hour() == self.config.rollover_hour
      && self.last_rollover != Some(now.date())
  }

  /// Freeze yesterday's page and status, then start a fresh day.
  async fn rollover(&mut self, now: NaiveDateTime) -> Result<()> {
    let yesterday = now.date() - Days::new(1);
    let template = self.config.read_template().await?;
    let ctx = render_context(&self.config, now);

    let mut board = self.board.write().await;
    let backup = render_status_page(&template, &board, &ctx, PageKind::Backup);
    self
      .store
      .publish(Artifact::BackupPage(yesterday), &backup)
      .await
      .map_err(Error::store)?;
    self
      .store
      .save_status_snapshot(yesterday, &board.status)
      .await
      .map_err(Error::store)?;

    board.status.clear();
    let expired = board.absences.collect_garbage(now);
    reload_static(&self.store, &mut board, now).await;
    drop(board);

    self.last_rollover = Some(now.date());
    self.unsaved.absences = true;
    self.flush().await?;
    tracing::info!(%yesterday, expired, "daily rollover done");
    Ok(())
  }
}

/// Re-read the manager list and re-apply initial values.
async fn reload_static<S: BoardStore>(
  store: &S,
  board: &mut Board,
  now: NaiveDateTime,
) {
  match store.load_managers(&board.default_domain).await {
    Ok(managers) => board.managers = managers,
    Err(e) => tracing::warn!(error = %e, "manager list reset"),
  }
  match store.load_initial_values().await {
    Ok(values) => {
      let seeded = board.status.seed(&values, now);
      for account in &seeded.invalid {
        tracing::warn!(%account, "initial value with unparseable dates");
      }
      tracing::debug!(applied = seeded.applied, "initial values applied");
    }
    Err(e) => tracing::warn!(error = %e, "initial values skipped"),
  }
}
