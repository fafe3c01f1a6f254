//! App - application layer
//!
//! Combines the ports into the queue's operations.
//!
//! # Components
//! - **MailQueue**: enqueue / process / purge / status
//! - **MailQueueBuilder**: wiring with startup validation
//! - **QueueConfig**: TOML configuration
//! - **RoundReport**: per-round tally
//! - **QueueCounts**: rows per state

pub mod builder;
pub mod config;
pub mod mail_queue;
pub mod processor;
pub mod purge;
pub mod report;
pub mod status;

pub use self::builder::{BuildError, MailQueueBuilder};
pub use self::config::{Encryption, QueueConfig, StoreConfig, TransportConfig};
pub use self::mail_queue::MailQueue;
pub use self::report::RoundReport;
pub use self::status::QueueCounts;
