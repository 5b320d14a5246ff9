pub mod config;
pub mod error;
pub mod llm;
pub mod types;

pub use config::{
    YtragConfig, DEFAULT_BIND, DEFAULT_PORT, DEFAULT_POLL_INTERVAL_SECS, DOWNLOAD_TIMEOUT_SECS,
    EMBED_WAIT_POLL_MS, EMBED_WAIT_TIMEOUT_SECS, METADATA_TIMEOUT_SECS,
};
pub use error::{Result, YtragError};
