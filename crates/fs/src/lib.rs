mod config;
mod entry;
mod sources;
mod walker;

pub use config::POLL_INTERVAL;
pub use entry::{Entry, NotRegularKind, send_entry};
pub use sources::{Source, classify_arg, feed_args};
pub use walker::walk_parallel;
