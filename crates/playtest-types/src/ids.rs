//! Snapshot identifiers.
//!
//! A [`SnapshotId`] wraps a [`Uuid`]. Ids are derived deterministically from
//! a per-store salt plus the snapshot's tick, timestamp, and a sequence
//! number (UUID v5), so two stores never hand out the same id and one store
//! never repeats itself.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub Uuid);

impl SnapshotId {
    /// Derive an id for the `sequence`-th snapshot saved under `salt`.
    pub fn derive(salt: &Uuid, tick: u64, timestamp: f64, sequence: u64) -> Self {
        let name = format!("{tick}_{timestamp}_{sequence}");
        Self(Uuid::new_v5(salt, name.as_bytes()))
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SnapshotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for SnapshotId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<SnapshotId> for Uuid {
    fn from(id: SnapshotId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic_per_salt() {
        let salt = Uuid::new_v4();
        let a = SnapshotId::derive(&salt, 5, 1000.0, 0);
        let b = SnapshotId::derive(&salt, 5, 1000.0, 0);
        assert_eq!(a, b);
    }

    #[test]
    fn different_salts_never_collide() {
        let a = SnapshotId::derive(&Uuid::new_v4(), 5, 1000.0, 0);
        let b = SnapshotId::derive(&Uuid::new_v4(), 5, 1000.0, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn sequence_separates_identical_ticks() {
        let salt = Uuid::new_v4();
        let a = SnapshotId::derive(&salt, 5, 1000.0, 0);
        let b = SnapshotId::derive(&salt, 5, 1000.0, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn display_parses_back() {
        let id = SnapshotId::derive(&Uuid::new_v4(), 1, 0.0, 0);
        let parsed: Result<SnapshotId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
    }
}
