//! postbox-core
//!
//! A persistent outbound mail queue: messages are stored instead of sent,
//! and a bounded processing round later delivers the due ones, oldest
//! first, retrying failures up to a ceiling.
//!
//! # Modules
//! - **domain**: queue rows, messages, ids, errors
//! - **ports**: store, mailer, clock and id generator traits
//! - **impls**: in-memory and file stores, log and recording mailers
//! - **app**: `MailQueue`, its builder, configuration and round reports
//! - **logging**: tracing subscriber setup for binaries

pub mod app;
pub mod domain;
pub mod impls;
pub mod logging;
pub mod ports;

pub use self::app::{MailQueue, MailQueueBuilder, QueueConfig, RoundReport};
pub use self::domain::{OutboundMessage, QueueError, QueueItemId};
