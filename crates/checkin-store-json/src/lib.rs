//! JSON-file backend for the check-in board.
//!
//! Every table lives in its own file under a state directory; rendered pages
//! and daily backups go wherever the [`Layout`] says. All file access goes
//! through [`tokio::fs`].

mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{JsonStore, Layout};
