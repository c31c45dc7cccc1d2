//! Core of a local course player: builds an ordered course tree from a
//! folder of lesson files, tracks per-lesson progress, navigates between
//! lessons and keeps all of it across restarts.
//!
//! The terminal front-end lives in the binary; everything here is usable
//! without a terminal.

pub mod config;
pub mod course;
pub mod engine;
pub mod error;
pub mod session;
pub mod store;

pub use config::Config;
pub use session::{BootstrapReport, Session, SessionState};
