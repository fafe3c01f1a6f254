//! MailQueueBuilder - wiring and startup validation
//!
//! Fail-fast: a queue that could never process a round is rejected at
//! `build()` instead of on its first round.

use std::sync::Arc;

use super::config::QueueConfig;
use super::mail_queue::MailQueue;
use crate::domain::QueueError;
use crate::ports::{Clock, IdGenerator, Mailer, QueueStore, SystemClock, UlidGenerator};

/// Builds a `MailQueue` from injected parts.
///
/// # Example
/// ```ignore
/// let queue = MailQueueBuilder::new()
///     .config(config)
///     .store(Arc::new(InMemoryQueueStore::new("mail_queue")))
///     .mailer(Arc::new(LogMailer::default()))
///     .build()?;
/// ```
///
/// Clock and id generator default to `SystemClock` and `UlidGenerator`.
#[derive(Default)]
pub struct MailQueueBuilder {
    config: QueueConfig,
    store: Option<Arc<dyn QueueStore>>,
    mailer: Option<Arc<dyn Mailer>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no queue store was provided")]
    MissingStore,

    #[error("no mailer was provided")]
    MissingMailer,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[source] QueueError),

    #[error("store is bound to table `{store}` but the configuration names `{configured}`")]
    TableMismatch { store: String, configured: String },
}

impl MailQueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(mut self, store: Arc<dyn QueueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # Errors
    /// - `MissingStore` / `MissingMailer` if a required part was not given
    /// - `InvalidConfig` if `QueueConfig::validate` fails
    /// - `TableMismatch` if the store serves a different table
    pub fn build(self) -> Result<MailQueue, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let mailer = self.mailer.ok_or(BuildError::MissingMailer)?;
        self.config.validate().map_err(BuildError::InvalidConfig)?;
        if store.table() != self.config.table {
            return Err(BuildError::TableMismatch {
                store: store.table().to_string(),
                configured: self.config.table,
            });
        }

        Ok(MailQueue {
            config: self.config,
            store,
            mailer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            ids: self.ids.unwrap_or_else(|| Arc::new(UlidGenerator::new())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryQueueStore, LogMailer};

    fn store(table: &str) -> Arc<dyn QueueStore> {
        Arc::new(InMemoryQueueStore::new(table))
    }

    #[test]
    fn build_success() {
        let queue = MailQueueBuilder::new()
            .store(store("mail_queue"))
            .mailer(Arc::new(LogMailer::default()))
            .build();
        assert!(queue.is_ok());
    }

    #[test]
    fn build_missing_parts() {
        let no_store = MailQueueBuilder::new()
            .mailer(Arc::new(LogMailer::default()))
            .build();
        assert!(matches!(no_store, Err(BuildError::MissingStore)));

        let no_mailer = MailQueueBuilder::new().store(store("mail_queue")).build();
        assert!(matches!(no_mailer, Err(BuildError::MissingMailer)));
    }

    #[test]
    fn build_invalid_config() {
        let queue = MailQueueBuilder::new()
            .config(QueueConfig {
                mails_per_round: 0,
                ..QueueConfig::default()
            })
            .store(store("mail_queue"))
            .mailer(Arc::new(LogMailer::default()))
            .build();
        assert!(matches!(
            queue,
            Err(BuildError::InvalidConfig(QueueError::Configuration(_)))
        ));
    }

    #[test]
    fn build_table_mismatch() {
        let queue = MailQueueBuilder::new()
            .store(store("other_table"))
            .mailer(Arc::new(LogMailer::default()))
            .build();
        assert!(matches!(
            queue,
            Err(BuildError::TableMismatch { store, configured })
                if store == "other_table" && configured == "mail_queue"
        ));
    }
}
