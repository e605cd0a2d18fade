//! Seam to the Hive-compatible metastore.
//!
//! DDL statements executed by this process drive the metastore through
//! [`MetastoreClient`] and, on success, receive the resulting catalog objects
//! (with versions assigned by the catalog service) to publish into the cache
//! as a direct update. Outcomes are result variants, not exceptions: callers
//! decide whether `AlreadyExists`/`NotFound` is an error based on the
//! statement's `if [not] exists` clause.

use crate::error::NyalaError;
use crate::messages::{
    AlterTableParams, CatalogObject, CatalogUpdate, CreateDbParams, CreateTableLikeParams,
    CreateTableParams, DropDbParams, DropTableParams,
};
use crate::version::ServiceId;
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::sync::Arc;

/// A database record as the metastore knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetastoreDb {
    pub name: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub location: Option<String>,
}

/// Cache mutation produced by a successful DDL statement. Versions come from
/// the catalog service reply; the service id lets the reconciler detect a
/// service restart even on the direct path.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectUpdate {
    pub catalog_service_id: ServiceId,
    pub updated: Vec<CatalogObject>,
    pub removed: Vec<CatalogObject>,
}

/// Outcome of one metastore DDL call.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlOutcome {
    Applied(DirectUpdate),
    AlreadyExists { name: String },
    NotFound { name: String },
}

/// One pooled connection to the metastore. Implementations must be safe to
/// call from multiple threads; a client is leased to one operation at a time.
pub trait MetastoreClient: Send + Sync {
    fn get_database(&self, name: &str) -> Result<Option<MetastoreDb>, NyalaError>;

    /// Loads a fresh table record, used when a cached entry is invalidated.
    /// Returns the wire object carrying the new version.
    fn load_table(&self, db: &str, table: &str) -> Result<CatalogObject, NyalaError>;

    /// Storage location of a table, if one is set on the table itself.
    fn table_location(&self, db: &str, table: &str) -> Result<Option<String>, NyalaError>;

    fn create_database(&self, params: &CreateDbParams) -> Result<DdlOutcome, NyalaError>;

    fn create_table(&self, params: &CreateTableParams) -> Result<DdlOutcome, NyalaError>;

    fn create_table_like(&self, params: &CreateTableLikeParams) -> Result<DdlOutcome, NyalaError>;

    fn drop_database(&self, params: &DropDbParams) -> Result<DdlOutcome, NyalaError>;

    fn drop_table(&self, params: &DropTableParams) -> Result<DdlOutcome, NyalaError>;

    fn alter_table(&self, params: &AlterTableParams) -> Result<DdlOutcome, NyalaError>;

    /// Publishes partitions created while writing into a table.
    fn add_partitions(&self, update: &CatalogUpdate) -> Result<DdlOutcome, NyalaError>;
}

/// Bounded pool of metastore clients. `lease` blocks until a client is free;
/// the guard returns it on every exit path, including panics and early
/// returns.
pub struct MetastoreClientPool {
    clients: Mutex<Vec<Arc<dyn MetastoreClient>>>,
    available: Condvar,
}

impl MetastoreClientPool {
    /// The pool size is fixed at construction; an empty pool would deadlock
    /// the first lease, so it is rejected.
    pub fn new(clients: Vec<Arc<dyn MetastoreClient>>) -> Result<MetastoreClientPool, NyalaError> {
        if clients.is_empty() {
            return Err(NyalaError::InvalidConfig(
                "metastore client pool must hold at least one client".into(),
            ));
        }
        Ok(MetastoreClientPool {
            clients: Mutex::new(clients),
            available: Condvar::new(),
        })
    }

    /// Convenience for the common single-client setup.
    pub fn single(client: Arc<dyn MetastoreClient>) -> MetastoreClientPool {
        MetastoreClientPool {
            clients: Mutex::new(vec![client]),
            available: Condvar::new(),
        }
    }

    pub fn lease(&self) -> MetastoreLease<'_> {
        let mut clients = self.clients.lock();
        while clients.is_empty() {
            self.available.wait(&mut clients);
        }
        let client = clients.pop().expect("non-empty after wait");
        MetastoreLease {
            pool: self,
            client: Some(client),
        }
    }
}

impl std::fmt::Debug for MetastoreClientPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetastoreClientPool")
            .field("idle", &self.clients.lock().len())
            .finish()
    }
}

pub struct MetastoreLease<'a> {
    pool: &'a MetastoreClientPool,
    client: Option<Arc<dyn MetastoreClient>>,
}

impl Deref for MetastoreLease<'_> {
    type Target = dyn MetastoreClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_deref().expect("client present until drop")
    }
}

impl Drop for MetastoreLease<'_> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.clients.lock().push(client);
            self.pool.available.notify_one();
        }
    }
}
