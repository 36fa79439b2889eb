pub mod codec;
pub mod index;
mod persist;
pub mod stats;
pub mod store;
pub mod types;

pub use stats::{log_stats, LogStats};
pub use store::{LogOptions, LogPaths, RecordLog, RepairReport, VerifyReport};
pub use types::MemoryRecord;
