//! Ports - abstraction layer
//!
//! Traits at the seams of the queue. The processor holds each of them as an
//! injected `Arc<dyn _>`; nothing here knows which implementation it gets.

pub mod clock;
pub mod id_generator;
pub mod mailer;
pub mod queue_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::Mailer;
pub use self::queue_store::{Eligibility, QueueStore, RowStream};
