//! Core types for the check-in status board.
//!
//! This crate holds the state model (per-person status, scheduled absences,
//! alternate sender addresses, the manager allow-list) and the traits that
//! describe the collaborators around it. It performs no I/O; the mail
//! interpreter, the HTML renderer and the storage backends all depend on it.

// Native `async fn` in traits; the returned futures carry explicit `Send`
// bounds where the daemon needs them.
#![allow(async_fn_in_trait)]

pub mod absence;
pub mod address;
pub mod alternate;
pub mod board;
pub mod error;
pub mod message;
pub mod status;
pub mod store;

pub use board::Board;
pub use error::{Error, Result};
