//! Impls - port implementations
//!
//! # Stores
//! - **InMemoryQueueStore**: process-local table
//! - **FileQueueStore**: durable, one JSON file per row
//!
//! # Mailers
//! - **LogMailer**: logs instead of sending (dry runs)
//! - **RecordingMailer**: records sends, fails on request (tests)

pub mod file_store;
pub mod log_mailer;
pub mod memory_store;
pub mod recording_mailer;

pub use self::file_store::FileQueueStore;
pub use self::log_mailer::LogMailer;
pub use self::memory_store::InMemoryQueueStore;
pub use self::recording_mailer::RecordingMailer;
