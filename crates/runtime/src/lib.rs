mod config;
pub mod logging;

pub use config::{
    HASH_BUFFER_SIZE, PROGRAM_LOG_LEVEL, PROGRAM_NAME, QUEUE_DEPTH_PER_WORKER, XATTR_SHA256,
    XATTR_TS, default_concurrency,
};

pub use logging::init;
