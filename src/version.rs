use serde::{Deserialize, Serialize};
use std::fmt;

/// Version assigned by the catalog service to each object mutation.
///
/// Versions are strictly monotonic per logical stream: service broadcasts and
/// direct DDL results each produce non-decreasing versions for the objects
/// they touch. Version 0 is reserved and never assigned to a live object; on
/// the wire it marks a heartbeat drop whose effective version is the version
/// of the batch that carries it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CatalogVersion(pub u64);

impl CatalogVersion {
    pub const INITIAL: CatalogVersion = CatalogVersion(0);

    pub fn new(v: u64) -> Self {
        CatalogVersion(v)
    }

    /// True for the reserved not-yet-assigned version.
    pub fn is_initial(self) -> bool {
        self.0 == 0
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the catalog service instance that produced the cache contents.
///
/// A new identity means a different service instance has been started and the
/// cached state must be discarded. The all-zero value is the sentinel for "no
/// service observed yet"; adopting the first observed identity is not a
/// change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    pub hi: u64,
    pub lo: u64,
}

impl ServiceId {
    pub const UNSET: ServiceId = ServiceId { hi: 0, lo: 0 };

    pub fn new(hi: u64, lo: u64) -> Self {
        ServiceId { hi, lo }
    }

    /// True while no catalog service has been observed.
    pub fn is_unset(self) -> bool {
        self == ServiceId::UNSET
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}:{:016x}", self.hi, self.lo)
    }
}
