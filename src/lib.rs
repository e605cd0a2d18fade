pub mod authz;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod error;
pub mod hadoop;
pub mod messages;
pub mod metastore;
pub mod planner;
pub mod version;


use crate::authz::reloader::{self, CheckerSlot};
use crate::authz::{AuthorizationChecker, Privilege, PrivilegeRequest, PrivilegeRequestBuilder, User};
use crate::catalog::object::DbRecord;
use crate::catalog::table::{ColumnType, TableKind, TableRecord};
use crate::catalog::{CatalogCache, CatalogState};
use crate::config::FrontendConfig;
use crate::error::{NyalaError, ResourceType};
use crate::hadoop::HadoopConfig;
use crate::messages::{
    AlterTableOp, AlterTableParams, CatalogUpdate, CatalogUpdateRequest, CatalogUpdateResponse,
    ClientRequest, CreateDbParams, CreateTableLikeParams, CreateTableParams, DescribeTableResult,
    DropDbParams, DropTableParams, ExecRequest, MetadataOp, MetadataOpRequest, MetadataOpResponse,
    TableDesc,
};
use crate::metastore::{DdlOutcome, DirectUpdate, MetastoreClientPool};
use crate::planner::Planner;
use crate::version::CatalogVersion;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// The request facade consumed by the query layer.
///
/// Holds the catalog cache, the authorization checker and the metastore pool;
/// every name lookup, listing and DDL statement of this process goes through
/// here. Reads take the catalog lock shared; update batches (broadcast or
/// direct) take it exclusive through [`CatalogCache::apply_update`]. The
/// authorization checker lives behind its own lock so a policy swap never
/// blocks catalog readers.
pub struct Frontend {
    config: FrontendConfig,
    catalog: CatalogCache,
    authz_checker: CheckerSlot,
    metastore: MetastoreClientPool,
    planner: Arc<dyn Planner>,
    hadoop: HadoopConfig,
    background_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Frontend {
    /// Builds the facade and, when authorization is enabled, spawns the
    /// policy reloader on the provided runtime. Fails if the policy file
    /// cannot be parsed at boot; a later reload failure only logs.
    pub fn new(
        config: FrontendConfig,
        metastore: MetastoreClientPool,
        planner: Arc<dyn Planner>,
        rt: &Handle,
    ) -> Result<Frontend, NyalaError> {
        info!(
            authorization_enabled = config.authorization.is_enabled(),
            policy_file = %config.authorization.policy_file.display(),
            policy_reload_interval_secs = config.policy_reload_interval.as_secs(),
            "frontend config"
        );
        let checker = AuthorizationChecker::from_config(&config.authorization)?;
        let authz_checker: CheckerSlot = Arc::new(RwLock::new(Arc::new(checker)));
        let hadoop = match &config.hadoop_conf_dir {
            Some(dir) => HadoopConfig::load_dir(dir)?,
            None => HadoopConfig::from_env()?,
        };
        let mut background_tasks = Vec::new();
        if config.authorization.is_enabled() {
            background_tasks.push(reloader::spawn(rt, &config, Arc::clone(&authz_checker)));
        }
        Ok(Frontend {
            config,
            catalog: CatalogCache::new(),
            authz_checker,
            metastore,
            planner,
            hadoop,
            background_tasks: Mutex::new(background_tasks),
        })
    }

    /// Stops the policy reloader. Readers and updates remain usable; the
    /// checker simply stops refreshing.
    pub fn shutdown(&self) {
        for handle in self.background_tasks.lock().drain(..) {
            handle.abort();
        }
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// True once at least one catalog update has been absorbed since start or
    /// since the last full flush.
    pub fn is_ready(&self) -> bool {
        self.catalog.is_ready()
    }

    /// Entry point for delta broadcasts from the catalog service.
    pub fn update_catalog_cache(
        &self,
        req: &CatalogUpdateRequest,
    ) -> Result<CatalogUpdateResponse, NyalaError> {
        self.catalog.apply_update(req)
    }

    // ---- authorization ----------------------------------------------------

    /// Non-throwing privilege check, used for list filtering.
    pub fn has_access(&self, user: &User, request: &PrivilegeRequest) -> bool {
        self.authz_checker.read().has_access(user, request)
    }

    /// Throwing privilege check; the denial message distinguishes access
    /// checks from action checks.
    pub fn check_access(&self, user: &User, request: &PrivilegeRequest) -> Result<(), NyalaError> {
        self.authz_checker.read().check_access(user, request)
    }

    pub fn check_create_drop_function_access(&self, user: &User) -> Result<(), NyalaError> {
        self.authz_checker
            .read()
            .check_create_drop_function_access(user)
    }

    // ---- planning bridge --------------------------------------------------

    /// Plans one statement under the catalog read lock and returns the
    /// executable request.
    pub fn create_exec_request(&self, request: &ClientRequest) -> Result<ExecRequest, NyalaError> {
        let state = self.catalog.read();
        let planned = self.planner.create_exec_request(&state, request)?;
        info!(explain = %planned.explain_string, "created exec request");
        Ok(planned.exec_request)
    }

    pub fn explain(&self, request: &ClientRequest) -> Result<String, NyalaError> {
        let state = self.catalog.read();
        let plan = self.planner.explain(&state, request)?;
        info!(explain = %plan, "explain plan");
        Ok(plan)
    }

    // ---- privilege-checked lookups ----------------------------------------

    /// Case-insensitive database lookup; `None` if no such database. `Any`
    /// asks for visibility (any privilege on the database or a table under
    /// it); other privileges are required on the database itself.
    pub fn get_db(
        &self,
        db: &str,
        user: &User,
        privilege: Privilege,
    ) -> Result<Option<DbRecord>, NyalaError> {
        let builder = PrivilegeRequestBuilder::new();
        let request = if privilege == Privilege::Any {
            builder.any().on_any_table(db).to_request()
        } else {
            builder.all_of(privilege).on_db(db).to_request()
        };
        self.check_access(user, &request)?;
        Ok(self.catalog.read().db(db).cloned())
    }

    /// Returns the table record after enforcing the privilege. A record whose
    /// load failed earlier raises that failure here.
    pub fn get_table(
        &self,
        db: &str,
        table: &str,
        user: &User,
        privilege: Privilege,
    ) -> Result<Arc<TableRecord>, NyalaError> {
        let request = PrivilegeRequestBuilder::new()
            .all_of(privilege)
            .on_table(db, table)
            .to_request();
        self.check_access(user, &request)?;
        let record = self.catalog.read().table(db, table)?;
        record.ensure_loaded()?;
        Ok(record)
    }

    /// True if the table exists in the given database; the database itself
    /// must exist.
    pub fn db_contains_table(
        &self,
        db: &str,
        table: &str,
        user: &User,
        privilege: Privilege,
    ) -> Result<bool, NyalaError> {
        let request = PrivilegeRequestBuilder::new()
            .all_of(privilege)
            .on_table(db, table)
            .to_request();
        self.check_access(user, &request)?;
        let state = self.catalog.read();
        let db_record = state
            .db(db)
            .ok_or_else(|| NyalaError::DatabaseNotFound(db.to_string()))?;
        Ok(db_record.contains_table(table))
    }

    /// True if both the database and the table exist.
    pub fn contains_table(
        &self,
        db: &str,
        table: &str,
        user: &User,
        privilege: Privilege,
    ) -> Result<bool, NyalaError> {
        let request = PrivilegeRequestBuilder::new()
            .all_of(privilege)
            .on_table(db, table)
            .to_request();
        self.check_access(user, &request)?;
        Ok(self.catalog.read().contains_table(db, table))
    }

    // ---- listings ---------------------------------------------------------

    /// Databases matching the pattern that the user may see.
    pub fn get_db_names(&self, pattern: Option<&str>, user: &User) -> Vec<String> {
        let state = self.catalog.read();
        self.filter_db_names(&state, pattern, user)
    }

    /// Unqualified table names in `db` matching the pattern that the user may
    /// see.
    pub fn get_table_names(
        &self,
        db: &str,
        pattern: Option<&str>,
        user: &User,
    ) -> Result<Vec<String>, NyalaError> {
        let state = self.catalog.read();
        self.filter_table_names(&state, db, pattern, user)
    }

    fn filter_db_names(
        &self,
        state: &CatalogState,
        pattern: Option<&str>,
        user: &User,
    ) -> Vec<String> {
        let mut names = state.db_names(pattern);
        if self.config.authorization.is_enabled() {
            let checker = self.authz_checker.read();
            names.retain(|db| {
                let request = PrivilegeRequestBuilder::new()
                    .any()
                    .on_any_table(db)
                    .to_request();
                checker.has_access(user, &request)
            });
        }
        names
    }

    fn filter_table_names(
        &self,
        state: &CatalogState,
        db: &str,
        pattern: Option<&str>,
        user: &User,
    ) -> Result<Vec<String>, NyalaError> {
        let mut names = state.table_names(db, pattern)?;
        if self.config.authorization.is_enabled() {
            let checker = self.authz_checker.read();
            names.retain(|table| {
                let request = PrivilegeRequestBuilder::new()
                    .any()
                    .on_table(db, table)
                    .to_request();
                checker.has_access(user, &request)
            });
        }
        Ok(names)
    }

    /// The columns making up a table. Raises the stored loading failure for
    /// an incomplete record.
    pub fn describe_table(&self, db: &str, table: &str) -> Result<DescribeTableResult, NyalaError> {
        let record = self.catalog.read().table(db, table)?;
        record.ensure_loaded()?;
        Ok(DescribeTableResult {
            columns: record.columns().to_vec(),
        })
    }

    /// Client-protocol metadata operations, answered from one consistent
    /// cache view.
    pub fn exec_metadata_op(
        &self,
        request: &MetadataOpRequest,
    ) -> Result<MetadataOpResponse, NyalaError> {
        let user = User::new(&request.user);
        let state = self.catalog.read();
        match &request.op {
            MetadataOp::GetSchemas { schema_pattern } => {
                let rows = self
                    .filter_db_names(&state, schema_pattern.as_deref(), &user)
                    .into_iter()
                    .map(|db| vec![db, String::new()])
                    .collect();
                Ok(MetadataOpResponse {
                    schema: vec!["TABLE_SCHEM".into(), "TABLE_CATALOG".into()],
                    rows,
                })
            }
            MetadataOp::GetTables {
                schema_pattern,
                table_pattern,
            } => {
                let mut rows = Vec::new();
                for db in self.filter_db_names(&state, schema_pattern.as_deref(), &user) {
                    for table in
                        self.filter_table_names(&state, &db, table_pattern.as_deref(), &user)?
                    {
                        rows.push(vec![
                            String::new(),
                            db.clone(),
                            table,
                            "TABLE".into(),
                            String::new(),
                        ]);
                    }
                }
                Ok(MetadataOpResponse {
                    schema: vec![
                        "TABLE_CAT".into(),
                        "TABLE_SCHEM".into(),
                        "TABLE_NAME".into(),
                        "TABLE_TYPE".into(),
                        "REMARKS".into(),
                    ],
                    rows,
                })
            }
            MetadataOp::GetColumns {
                schema_pattern,
                table_pattern,
                column_pattern,
            } => {
                let mut rows = Vec::new();
                for db in self.filter_db_names(&state, schema_pattern.as_deref(), &user) {
                    for table in
                        self.filter_table_names(&state, &db, table_pattern.as_deref(), &user)?
                    {
                        let record = state.table(&db, &table)?;
                        if record.is_incomplete() {
                            debug!(table = %record.full_name(), "skipping incomplete table in column listing");
                            continue;
                        }
                        for column in record.columns() {
                            if !catalog::matches_pattern(column_pattern.as_deref(), &column.name) {
                                continue;
                            }
                            rows.push(vec![
                                String::new(),
                                db.clone(),
                                table.clone(),
                                column.name.clone(),
                                column.col_type.to_string(),
                            ]);
                        }
                    }
                }
                Ok(MetadataOpResponse {
                    schema: vec![
                        "TABLE_CAT".into(),
                        "TABLE_SCHEM".into(),
                        "TABLE_NAME".into(),
                        "COLUMN_NAME".into(),
                        "TYPE_NAME".into(),
                    ],
                    rows,
                })
            }
            MetadataOp::GetTypeInfo => Ok(MetadataOpResponse {
                schema: vec!["TYPE_NAME".into()],
                rows: ColumnType::ALL
                    .into_iter()
                    .map(|t| vec![t.to_string().to_uppercase()])
                    .collect(),
            }),
        }
    }

    // ---- DDL fan-out ------------------------------------------------------

    pub fn create_database(&self, params: &CreateDbParams) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().create_database(params)?;
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::AlreadyExists { name } if params.if_not_exists => {
                debug!(db = %name, "database already exists; nothing to do");
                Ok(())
            }
            DdlOutcome::AlreadyExists { name } => Err(NyalaError::AlreadyExists {
                resource: ResourceType::Database,
                name,
            }),
            DdlOutcome::NotFound { name } => Err(unexpected_not_found("create database", &name)),
        }
    }

    pub fn create_table(&self, params: &CreateTableParams) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().create_table(params)?;
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::AlreadyExists { name } if params.if_not_exists => {
                debug!(table = %name, "table already exists; nothing to do");
                Ok(())
            }
            DdlOutcome::AlreadyExists { name } => Err(NyalaError::AlreadyExists {
                resource: ResourceType::Table,
                name,
            }),
            DdlOutcome::NotFound { name } => Err(not_found_error(&name)),
        }
    }

    pub fn create_table_like(&self, params: &CreateTableLikeParams) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().create_table_like(params)?;
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::AlreadyExists { name } if params.if_not_exists => {
                debug!(table = %name, "table already exists; nothing to do");
                Ok(())
            }
            DdlOutcome::AlreadyExists { name } => Err(NyalaError::AlreadyExists {
                resource: ResourceType::Table,
                name,
            }),
            DdlOutcome::NotFound { name } => Err(not_found_error(&name)),
        }
    }

    pub fn drop_database(&self, params: &DropDbParams) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().drop_database(params)?;
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::NotFound { name } if params.if_exists => {
                debug!(db = %name, "database does not exist; nothing to do");
                Ok(())
            }
            DdlOutcome::NotFound { name } => Err(NyalaError::DatabaseNotFound(name)),
            DdlOutcome::AlreadyExists { name } => {
                Err(unexpected_already_exists("drop database", &name))
            }
        }
    }

    pub fn drop_table(&self, params: &DropTableParams) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().drop_table(params)?;
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::NotFound { name } if params.if_exists => {
                debug!(table = %name, "table does not exist; nothing to do");
                Ok(())
            }
            DdlOutcome::NotFound { name } => Err(not_found_error(&name)),
            DdlOutcome::AlreadyExists { name } => Err(unexpected_already_exists("drop table", &name)),
        }
    }

    /// Dispatches one ALTER TABLE statement. A table rename publishes a drop
    /// of the old name and an add of the new name under one shared version,
    /// so a racing stale add of the old name cannot resurrect it.
    pub fn alter_table(&self, params: &AlterTableParams) -> Result<(), NyalaError> {
        let storage_bound = matches!(
            params.op,
            AlterTableOp::AddPartition { .. }
                | AlterTableOp::DropPartition { .. }
                | AlterTableOp::SetFileFormat { .. }
                | AlterTableOp::SetLocation { .. }
        );
        if storage_bound
            && let Ok(record) = self
                .catalog
                .read()
                .table(&params.table_name.db, &params.table_name.table)
            && matches!(record.kind, TableKind::HBase(_))
        {
            return Err(NyalaError::Unsupported(format!(
                "ALTER TABLE storage operation on HBase table {}",
                params.table_name
            )));
        }
        let outcome = self.metastore.lease().alter_table(params)?;
        let (if_not_exists, if_exists) = match &params.op {
            AlterTableOp::AddPartition { if_not_exists, .. } => (*if_not_exists, false),
            AlterTableOp::DropPartition { if_exists, .. } => (false, *if_exists),
            _ => (false, false),
        };
        match outcome {
            DdlOutcome::Applied(update) => self.publish_direct(update),
            DdlOutcome::AlreadyExists { name } if if_not_exists => {
                debug!(partition = %name, "partition already exists; nothing to do");
                Ok(())
            }
            DdlOutcome::AlreadyExists { name } => {
                let resource = match &params.op {
                    AlterTableOp::RenameTable { .. } => ResourceType::Table,
                    _ => ResourceType::Partition,
                };
                Err(NyalaError::AlreadyExists { resource, name })
            }
            DdlOutcome::NotFound { name } if if_exists => {
                debug!(partition = %name, "partition does not exist; nothing to do");
                Ok(())
            }
            DdlOutcome::NotFound { name } => Err(not_found_error(&name)),
        }
    }

    /// Publishes partitions created by a finished write into the metastore
    /// and refreshes the table record.
    pub fn update_metastore(&self, update: &CatalogUpdate) -> Result<(), NyalaError> {
        let outcome = self.metastore.lease().add_partitions(update)?;
        match outcome {
            DdlOutcome::Applied(direct) => self.publish_direct(direct),
            DdlOutcome::AlreadyExists { name } => {
                debug!(partition = %name, "partition already published");
                Ok(())
            }
            DdlOutcome::NotFound { name } => Err(not_found_error(&name)),
        }
    }

    fn publish_direct(&self, update: DirectUpdate) -> Result<(), NyalaError> {
        let request = CatalogUpdateRequest {
            updated_objects: update.updated,
            removed_objects: update.removed,
            catalog_service_id: update.catalog_service_id,
        };
        self.catalog.apply_update(&request)?;
        Ok(())
    }

    // ---- invalidation -----------------------------------------------------

    /// Reloads one table from the metastore. When the reload fails, an
    /// incomplete record carrying the failure replaces the cached one, so the
    /// error surfaces on the next access rather than here.
    pub fn reset_table(&self, db: &str, table: &str) -> Result<(), NyalaError> {
        let existing = self.catalog.read().table(db, table)?;
        let loaded = self.metastore.lease().load_table(db, table);
        let object = match loaded {
            Ok(object) => object,
            Err(error) => {
                debug!(table = %existing.full_name(), error = %error, "reload failed; caching incomplete record");
                messages::CatalogObject::Table {
                    version: CatalogVersion::new(existing.version.as_u64() + 1),
                    table: TableDesc::incomplete(existing.id, db, table, &error),
                }
            }
        };
        let request = CatalogUpdateRequest {
            updated_objects: vec![object],
            removed_objects: Vec::new(),
            catalog_service_id: self.catalog.service_id(),
        };
        self.catalog.apply_update(&request)?;
        Ok(())
    }

    /// Drops the whole cache and waits for a full resync: object store,
    /// delta log, watermark and service id all return to their initial
    /// values and the readiness probe reports false.
    pub fn reset_catalog(&self) {
        info!("resetting catalog cache; awaiting full resync");
        let mut state = self.catalog.write();
        state.flush();
        self.catalog.set_ready(false);
        drop(state);
    }

    // ---- host configuration ----------------------------------------------

    /// All loaded host configuration parameters as a table of keys and
    /// values, in raw text or HTML.
    pub fn get_hadoop_config(&self, as_text: bool) -> String {
        self.hadoop.render(as_text)
    }

    /// Single config value; the empty string when absent.
    pub fn get_hadoop_config_value(&self, key: &str) -> String {
        self.hadoop.get(key)
    }

    /// Warehouse path for a table: the table's own location when set,
    /// otherwise `<database location>/<table name>`.
    pub fn table_path(&self, db: &str, table: &str) -> Result<String, NyalaError> {
        let client = self.metastore.lease();
        if let Some(location) = client.table_location(db, table)? {
            return Ok(location);
        }
        let database = client
            .get_database(db)?
            .ok_or_else(|| NyalaError::DatabaseNotFound(db.to_string()))?;
        let base = database.location.ok_or_else(|| {
            NyalaError::Internal(format!("database '{db}' has no storage location"))
        })?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            table.to_lowercase()
        ))
    }
}

impl Drop for Frontend {
    fn drop(&mut self) {
        for handle in self.background_tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

/// Qualified names come back from the metastore as `db.table`; everything
/// else is a database name.
fn not_found_error(name: &str) -> NyalaError {
    if name.contains('.') {
        NyalaError::TableNotFound(name.to_string())
    } else {
        NyalaError::DatabaseNotFound(name.to_string())
    }
}

fn unexpected_not_found(op: &str, name: &str) -> NyalaError {
    NyalaError::Internal(format!("unexpected NotFound('{name}') outcome from {op}"))
}

fn unexpected_already_exists(op: &str, name: &str) -> NyalaError {
    NyalaError::Internal(format!("unexpected AlreadyExists('{name}') outcome from {op}"))
}
