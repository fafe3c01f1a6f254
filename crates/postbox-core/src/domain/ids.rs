//! Queue item identifiers.
//!
//! Ids are ULIDs: the timestamp sits in the high bits, so ids minted by a
//! monotonic generator from the enqueue time sort in creation order. The
//! file store relies on this to list rows oldest-first without reading them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

const PREFIX: &str = "mail-";

/// Identifier of a queued message (primary key of a queue row).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(Ulid);

impl QueueItemId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Bare ULID text, used as the on-disk row name.
    pub fn file_stem(&self) -> String {
        self.0.to_string()
    }

    /// Parse a row file name (`<ulid>.json`) back into an id.
    ///
    /// Anything else, temporary files included, yields `None`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(".json")?;
        Ulid::from_string(stem).ok().map(Self)
    }
}

impl From<Ulid> for QueueItemId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.0)
    }
}

impl FromStr for QueueItemId {
    type Err = ulid::DecodeError;

    /// Accepts both `mail-<ulid>` and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw).map(Self)
    }
}
