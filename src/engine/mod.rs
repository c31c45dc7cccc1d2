pub mod autoplay;
pub mod navigation;
pub mod progress;
pub mod summary;
pub mod watch_stats;
