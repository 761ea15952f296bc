//! Inbound mail as handed over by a [`MessageSource`].

use std::future::Future;

use chrono::NaiveDateTime;

/// One decoded message.
///
/// Addresses are kept as they appeared in the headers; the interpreter
/// extracts and normalises them.
#[derive(Debug, Clone)]
pub struct InboundMessage {
  /// Source-specific handle passed back to [`MessageSource::acknowledge`].
  pub id:          String,
  /// The `From` header.
  pub from:        String,
  /// The `Return-Path` header, if present.
  pub return_path: Option<String>,
  /// Sent date in board-local time.
  pub sent_at:     NaiveDateTime,
  /// First text part of the body.
  pub body:        String,
}

/// A mailbox drained once per poll cycle.
///
/// Messages are yielded in the mailbox's listing order and are removed from
/// the mailbox once acknowledged.
pub trait MessageSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// List and decode every waiting message.
  ///
  /// Messages that cannot be decoded are left out of the result (and
  /// reported through the returned `skipped` handles so they can still be
  /// acknowledged).
  fn fetch(
    &self,
  ) -> impl Future<Output = Result<Fetched, Self::Error>> + Send + '_;

  /// Remove a processed (or undecodable) message from the mailbox.
  fn acknowledge<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// The result of [`MessageSource::fetch`].
#[derive(Debug, Default)]
pub struct Fetched {
  pub messages: Vec<InboundMessage>,
  /// Handles of messages that could not be decoded.
  pub skipped:  Vec<String>,
}
