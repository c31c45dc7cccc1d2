pub mod access;
pub mod bootstrap;
pub mod context;
pub mod playback;

pub use bootstrap::{BootstrapReport, SessionState};
pub use context::Session;
