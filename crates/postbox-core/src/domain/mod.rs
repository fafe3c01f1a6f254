//! Domain model: queue rows, outbound messages, ids and errors.

pub mod errors;
pub mod ids;
pub mod item;
pub mod message;
pub mod outcome;
pub mod state;

pub use self::errors::{ErrorKind, QueueError, StoreError, TransportError};
pub use self::ids::QueueItemId;
pub use self::item::{AttemptPatch, QueueItem};
pub use self::message::{MessageCodec, OutboundMessage};
pub use self::outcome::DeliveryOutcome;
pub use self::state::ItemState;
