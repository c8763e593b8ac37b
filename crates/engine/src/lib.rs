mod attr;
mod config;
mod decision;
mod error;
mod pipeline;
mod probe;
mod report;
mod stats;
mod store;
mod timestamp;

pub use attr::*;
pub use config::CheckOptions;
pub use decision::*;
pub use error::*;
pub use pipeline::*;
pub use probe::{Probe, Sha256Probe, hash_consistent};
pub use report::*;
pub use stats::*;
pub use store::{AttrStore, MemoryStore, XattrStore};
pub use timestamp::*;
