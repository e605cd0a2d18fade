//! Applies one catalog update batch (a service broadcast or the direct
//! result of a DDL statement) to the cache.
//!
//! Work from one update stream must not be undone by the other. Three rules
//! enforce this, all keyed on per-object versions:
//! - an add is applied only if it is newer than the cached record and was not
//!   dropped at a later version (delta log);
//! - a drop is applied only if it is newer than the cached record;
//! - drops that outrun the sync watermark are tombstoned so a stale broadcast
//!   add cannot resurrect them.

use crate::catalog::object::{DbRecord, FunctionRecord, ObjectKey, ObjectKind};
use crate::catalog::table::TableRecord;
use crate::catalog::{CatalogCache, CatalogState};
use crate::error::NyalaError;
use crate::messages::{
    CatalogObject, CatalogUpdateRequest, CatalogUpdateResponse, DbDesc, FunctionDesc, TableDesc,
};
use crate::version::CatalogVersion;
use std::sync::Arc;
use tracing::{debug, info, warn};

fn identity(object: &CatalogObject) -> Option<(ObjectKey, ObjectKind)> {
    match object {
        CatalogObject::CatalogMarker { .. } => None,
        CatalogObject::Database { db, .. } => {
            Some((ObjectKey::database(&db.name), ObjectKind::Database))
        }
        CatalogObject::Table { table, .. } => Some((
            ObjectKey::table(&table.db_name, &table.name),
            ObjectKind::Table,
        )),
        CatalogObject::View { table, .. } => Some((
            ObjectKey::table(&table.db_name, &table.name),
            ObjectKind::View,
        )),
        CatalogObject::Function { function, .. } => Some((
            ObjectKey::function(&function.db_name, &function.signature),
            ObjectKind::Function,
        )),
    }
}

impl CatalogCache {
    /// Applies one batch atomically under the catalog write lock.
    ///
    /// The batch is processed in the order received; the service guarantees
    /// dependency order (a database precedes its tables and functions).
    /// Per-object problems are logged and skipped; they never abort the
    /// batch. The only control-flow error is a catalog service identity
    /// change: the cache is flushed to its initial state and the caller must
    /// request a full resync.
    pub fn apply_update(
        &self,
        req: &CatalogUpdateRequest,
    ) -> Result<CatalogUpdateResponse, NyalaError> {
        let mut state = self.write();

        if req.catalog_service_id != state.service_id {
            if state.service_id.is_unset() {
                info!(service_id = %req.catalog_service_id, "adopting catalog service id");
                state.service_id = req.catalog_service_id;
            } else {
                let observed = req.catalog_service_id;
                warn!(
                    current = %state.service_id,
                    observed = %observed,
                    "catalog service id changed; flushing cache and requesting full resync"
                );
                state.flush();
                self.set_ready(false);
                return Err(NyalaError::ServiceIdChanged { observed });
            }
        }

        let mut new_version = state.last_synced_version;
        for object in &req.updated_objects {
            if let CatalogObject::CatalogMarker { version } = object {
                new_version = *version;
            } else {
                state.add_object(object);
            }
        }

        for object in &req.removed_objects {
            state.remove_object(object, new_version);
        }

        state.last_synced_version = new_version;
        state.delta_log.garbage_collect(new_version);
        let service_id = state.service_id;
        self.set_ready(true);

        Ok(CatalogUpdateResponse {
            catalog_service_id: service_id,
        })
    }
}

impl CatalogState {
    /// Adds one object, unless it is out of date: dropped at a later version,
    /// or older than the record already cached.
    fn add_object(&mut self, object: &CatalogObject) {
        let Some((key, _)) = identity(object) else {
            return;
        };
        if self.delta_log.was_removed_after(&key, object.version()) {
            debug!(
                object = %key,
                version = %object.version(),
                "skipping update; a matching object was removed in a later version"
            );
            return;
        }
        match object {
            CatalogObject::Database { version, db } => self.add_db(db, *version),
            CatalogObject::Table { version, table } | CatalogObject::View { version, table } => {
                self.add_table(table, *version);
            }
            CatalogObject::Function { version, function } => self.add_function(function, *version),
            CatalogObject::CatalogMarker { .. } => {}
        }
    }

    fn add_db(&mut self, desc: &DbDesc, version: CatalogVersion) {
        let existing = self.db(&desc.name);
        if existing.is_some_and(|db| db.version >= version) {
            return;
        }
        let mut record = DbRecord::new(
            desc.name.clone(),
            desc.owner.clone(),
            desc.comment.clone(),
            desc.location.clone(),
            version,
        );
        // Replacement is wholesale for the database metadata; children keep
        // their own versioned records.
        if let Some(previous) = self.take_db(&desc.name) {
            record.adopt_children(previous);
        }
        self.put_db(record);
    }

    fn add_table(&mut self, desc: &TableDesc, version: CatalogVersion) {
        let Some(db) = self.db_mut(&desc.db_name) else {
            // A later batch will carry the parent; the service re-sends
            // children with it.
            debug!(
                table = %format!("{}.{}", desc.db_name, desc.name),
                "parent database of table does not exist"
            );
            return;
        };
        let outdated = db.table(&desc.name).is_some_and(|t| t.version >= version);
        if !outdated {
            db.put_table(Arc::new(TableRecord::from_desc(desc, version)));
        }
    }

    fn add_function(&mut self, desc: &FunctionDesc, version: CatalogVersion) {
        let Some(db) = self.db_mut(&desc.db_name) else {
            debug!(
                function = %format!("{}.{}", desc.db_name, desc.signature),
                "parent database of function does not exist"
            );
            return;
        };
        let outdated = db
            .function(&desc.signature)
            .is_some_and(|f| f.version >= version);
        if !outdated {
            db.put_function(FunctionRecord {
                signature: desc.signature.clone(),
                db_name: desc.db_name.clone(),
                version,
            });
        }
    }

    /// Removes one object if the drop is newer than the cached record.
    ///
    /// Heartbeat drops carry version 0 and inherit the batch version: a
    /// broadcast can never contain both a drop and an add of the same object,
    /// so the batch version is a safe upper bound. A non-zero version marks a
    /// direct-DDL drop; if it outruns the sync watermark it is tombstoned so
    /// stale broadcast adds cannot resurrect the object.
    fn remove_object(&mut self, object: &CatalogObject, batch_version: CatalogVersion) {
        let Some((key, kind)) = identity(object) else {
            debug!("ignoring removal without object identity");
            return;
        };
        let drop_version = if object.version().is_initial() {
            batch_version
        } else {
            object.version()
        };

        match &key {
            ObjectKey::Database(name) => {
                if self.db(name).is_some_and(|db| db.version < drop_version) {
                    self.remove_db(name);
                }
            }
            ObjectKey::Table { db, table } => {
                // The parent may already be gone; removing a child after its
                // database is a no-op.
                if let Some(db_record) = self.db_mut(db) {
                    if db_record
                        .table(table)
                        .is_some_and(|t| t.version < drop_version)
                    {
                        db_record.remove_table(table);
                    }
                }
            }
            ObjectKey::Function { db, signature } => {
                if let Some(db_record) = self.db_mut(db) {
                    if db_record
                        .function(signature)
                        .is_some_and(|f| f.version < drop_version)
                    {
                        db_record.remove_function(signature);
                    }
                }
            }
        }

        if object.version() > self.last_synced_version {
            self.delta_log.record_drop(key, kind, drop_version);
        }
    }

    fn take_db(&mut self, name: &str) -> Option<DbRecord> {
        let key = name.to_lowercase();
        self.dbs.remove(&key)
    }
}
