use crate::catalog::object::{ObjectKey, ObjectKind};
use crate::version::CatalogVersion;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RemovedObject {
    kind: ObjectKind,
    version: CatalogVersion,
}

/// Tombstone record of dropped catalog objects.
///
/// Broadcast and direct-update streams race: a direct DDL drop can land
/// before a broadcast that still carries an add of the same object at an
/// older version. The log remembers the version each object was dropped at so
/// such stale adds are rejected instead of resurrecting the object. Entries
/// at or below the sync watermark are covered by broadcasts and can be
/// collected.
///
/// All operations run under the catalog write lock and complete in bounded
/// time.
#[derive(Debug, Default)]
pub struct DeltaLog {
    removed: HashMap<ObjectKey, RemovedObject>,
}

impl DeltaLog {
    pub fn new() -> DeltaLog {
        DeltaLog::default()
    }

    /// Records a drop. A later drop of the same key replaces an earlier entry;
    /// an older drop arriving out of order is ignored.
    pub fn record_drop(&mut self, key: ObjectKey, kind: ObjectKind, version: CatalogVersion) {
        let entry = self
            .removed
            .entry(key)
            .or_insert(RemovedObject { kind, version });
        if entry.version < version {
            *entry = RemovedObject { kind, version };
        }
    }

    /// True iff the object was dropped in a version later than `version`.
    pub fn was_removed_after(&self, key: &ObjectKey, version: CatalogVersion) -> bool {
        self.removed
            .get(key)
            .is_some_and(|entry| entry.version > version)
    }

    /// Removes every entry with version at or below the watermark. Total over
    /// all watermarks: a watermark below every entry simply removes nothing.
    pub fn garbage_collect(&mut self, watermark: CatalogVersion) {
        self.removed.retain(|_, entry| entry.version > watermark);
    }

    pub fn clear(&mut self) {
        self.removed.clear();
    }

    pub fn len(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}
