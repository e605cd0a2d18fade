//! The catalog cache: a versioned, multi-reader view of databases, tables
//! and functions, kept eventually consistent with the catalog service.
//!
//! One reader/writer lock guards the object store, the delta log, the service
//! id and the sync watermark as a single consistency domain. Readers hold it
//! shared for the duration of a lookup or listing; update batches hold it
//! exclusive, so no reader ever observes a partially applied batch.

pub mod delta_log;
pub mod object;
mod reconcile;
pub mod table;

use crate::catalog::delta_log::DeltaLog;
use crate::catalog::object::DbRecord;
use crate::catalog::table::TableRecord;
use crate::error::NyalaError;
use crate::version::{CatalogVersion, ServiceId};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Everything guarded by the catalog lock.
#[derive(Debug, Default)]
pub struct CatalogState {
    dbs: HashMap<String, DbRecord>,
    pub(crate) service_id: ServiceId,
    pub(crate) last_synced_version: CatalogVersion,
    pub(crate) delta_log: DeltaLog,
}

impl CatalogState {
    /// Case-insensitive database lookup.
    pub fn db(&self, name: &str) -> Option<&DbRecord> {
        self.dbs.get(&name.to_lowercase())
    }

    pub(crate) fn db_mut(&mut self, name: &str) -> Option<&mut DbRecord> {
        self.dbs.get_mut(&name.to_lowercase())
    }

    pub fn contains_table(&self, db: &str, table: &str) -> bool {
        self.db(db).is_some_and(|db| db.contains_table(table))
    }

    /// Returns the cached record, which may be incomplete; callers that need
    /// usable metadata must check `ensure_loaded`.
    pub fn table(&self, db: &str, table: &str) -> Result<Arc<TableRecord>, NyalaError> {
        let db_record = self
            .db(db)
            .ok_or_else(|| NyalaError::DatabaseNotFound(db.to_string()))?;
        db_record
            .table(table)
            .cloned()
            .ok_or_else(|| NyalaError::TableNotFound(format!("{db}.{table}")))
    }

    /// Database names matching the pattern, sorted, original case preserved.
    pub fn db_names(&self, pattern: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = self
            .dbs
            .values()
            .filter(|db| matches_pattern(pattern, &db.name))
            .map(|db| db.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Unqualified table names in `db` matching the pattern, sorted.
    pub fn table_names(&self, db: &str, pattern: Option<&str>) -> Result<Vec<String>, NyalaError> {
        let db_record = self
            .db(db)
            .ok_or_else(|| NyalaError::DatabaseNotFound(db.to_string()))?;
        let mut names: Vec<String> = db_record
            .table_names()
            .filter(|name| matches_pattern(pattern, name))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    pub(crate) fn put_db(&mut self, db: DbRecord) {
        self.dbs.insert(db.name.to_lowercase(), db);
    }

    /// Idempotent; removing an absent database is a no-op.
    pub(crate) fn remove_db(&mut self, name: &str) {
        self.dbs.remove(&name.to_lowercase());
    }

    pub fn service_id(&self) -> ServiceId {
        self.service_id
    }

    pub fn last_synced_version(&self) -> CatalogVersion {
        self.last_synced_version
    }

    pub fn delta_log(&self) -> &DeltaLog {
        &self.delta_log
    }

    /// Drops every record and resets the sync state to its initial value.
    /// Used when the catalog service identity changes and the cache must be
    /// rebuilt from a full resync.
    pub(crate) fn flush(&mut self) {
        self.dbs.clear();
        self.delta_log.clear();
        self.service_id = ServiceId::UNSET;
        self.last_synced_version = CatalogVersion::INITIAL;
    }
}

/// Thread-safe cache handle. Update batches are applied through
/// [`CatalogCache::apply_update`]; everything else is a reader.
#[derive(Debug, Default)]
pub struct CatalogCache {
    state: RwLock<CatalogState>,
    ready: AtomicBool,
}

impl CatalogCache {
    pub fn new() -> CatalogCache {
        CatalogCache::default()
    }

    /// Shared access for lookups and listings. The guard pins the batch
    /// boundary: state cannot change while it is held.
    pub fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read()
    }

    pub(crate) fn write(&self) -> parking_lot::RwLockWriteGuard<'_, CatalogState> {
        self.state.write()
    }

    /// True once the cache has absorbed at least one update batch since start
    /// or since the last full flush.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn service_id(&self) -> ServiceId {
        self.state.read().service_id
    }

    pub fn last_synced_version(&self) -> CatalogVersion {
        self.state.read().last_synced_version
    }
}

/// Glob-like, case-insensitive match: `*` matches any sequence, every other
/// character matches literally. A missing or empty pattern matches
/// everything.
pub fn matches_pattern(pattern: Option<&str>, candidate: &str) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    if pattern.is_empty() {
        return true;
    }
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
    let candidate: Vec<char> = candidate.to_lowercase().chars().collect();

    // Two-pointer wildcard match with backtracking to the last `*`.
    let (mut p, mut c) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while c < candidate.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some((p, c));
            p += 1;
        } else if p < pattern.len() && pattern[p] == candidate[c] {
            p += 1;
            c += 1;
        } else if let Some((star_p, star_c)) = star {
            p = star_p + 1;
            c = star_c + 1;
            star = Some((star_p, star_c + 1));
        } else {
            return false;
        }
    }
    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pattern_star_matches_any_sequence() {
        assert!(matches_pattern(Some("sales*"), "sales"));
        assert!(matches_pattern(Some("sales*"), "sales_archive"));
        assert!(matches_pattern(Some("sales*"), "SalesQA"));
        assert!(!matches_pattern(Some("sales*"), "presales"));
        assert!(matches_pattern(Some("*arch*"), "sales_archive"));
        assert!(matches_pattern(Some("a*b*c"), "aXXbYYc"));
        assert!(!matches_pattern(Some("a*b*c"), "aXXbYY"));
    }

    #[test]
    fn pattern_is_case_insensitive_and_literal_otherwise() {
        assert!(matches_pattern(Some("SALES"), "sales"));
        assert!(!matches_pattern(Some("sal.s"), "sales"));
        assert!(matches_pattern(None, "anything"));
        assert!(matches_pattern(Some(""), "anything"));
    }

    proptest! {
        #[test]
        fn literal_patterns_match_only_themselves(name in "[a-z_][a-z0-9_]{0,16}") {
            prop_assert!(matches_pattern(Some(&name), &name));
            prop_assert!(matches_pattern(Some(&name.to_uppercase()), &name));
            let other = format!("{name}x");
            prop_assert!(!matches_pattern(Some(&name), &other));
        }

        #[test]
        fn star_prefix_matches_all_suffixes(name in "[a-z]{1,12}", cut in 0usize..12) {
            let cut = cut.min(name.len());
            let pattern = format!("{}*", &name[..cut]);
            prop_assert!(matches_pattern(Some(&pattern), &name));
        }
    }
}
