pub mod error;
pub mod models;
pub mod pool;
pub mod repo;

pub use error::{DbError, Result};
pub use pool::connect;
pub use repo::chat::ChatRepo;
pub use repo::channel::ChannelRepo;
pub use repo::chunk::ChunkRepo;
pub use repo::notifier::TaskNotifier;
pub use repo::segment::SegmentRepo;
pub use repo::settings::{rag_defaults, worker_defaults, SettingDefault, SettingsRepo};
pub use repo::tasks::TaskStore;
pub use repo::video::VideoRepo;
