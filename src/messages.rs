//! Wire records exchanged with foreign callers and with the catalog service.
//!
//! Every structured request and response crossing the facade boundary is one
//! of these serde records, encoded as MessagePack by the bridge. Field names
//! are the contract; the physical encoding is owned by the bridge.

use crate::catalog::table::{
    Column, HBaseTable, HdfsFileFormat, HdfsPartition, HdfsTable, RowFormat, TableId, TableKind,
};
use crate::error::NyalaError;
use crate::version::{CatalogVersion, ServiceId};
use serde::{Deserialize, Serialize};

/// A query statement submitted by a client session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub stmt: String,
    pub session_user: String,
    #[serde(default)]
    pub default_db: Option<String>,
    #[serde(default)]
    pub query_options: Vec<(String, String)>,
}

/// Planner output for one statement, opaque to the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub stmt: String,
    /// (db, table) pairs the plan references, lowercased.
    pub referenced_tables: Vec<(String, String)>,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableName {
    pub db: String,
    pub table: String,
}

impl TableName {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> TableName {
        TableName {
            db: db.into(),
            table: table.into(),
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.db, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbDesc {
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableStorageDesc {
    Hdfs {
        format: HdfsFileFormat,
        row_format: RowFormat,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        partitions: Vec<HdfsPartition>,
    },
    HBase {
        table_name: String,
        column_families: Vec<String>,
    },
}

impl TableStorageDesc {
    pub(crate) fn to_kind(&self) -> TableKind {
        match self {
            TableStorageDesc::Hdfs {
                format,
                row_format,
                location,
                partitions,
            } => TableKind::Hdfs(HdfsTable {
                format: *format,
                row_format: row_format.clone(),
                location: location.clone(),
                partitions: partitions.clone(),
            }),
            TableStorageDesc::HBase {
                table_name,
                column_families,
            } => TableKind::HBase(HBaseTable {
                hbase_table_name: table_name.clone(),
                column_families: column_families.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDesc {
    pub id: TableId,
    pub db_name: String,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub columns: Vec<Column>,
    pub num_clustering_cols: u32,
    pub storage: TableStorageDesc,
    /// Set when the catalog service failed to load this table; the cache
    /// installs an incomplete record carrying this message.
    #[serde(default)]
    pub load_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDesc {
    pub db_name: String,
    pub signature: String,
}

/// One object in a catalog update batch, tagged by kind and carrying the
/// version the mutation was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CatalogObject {
    CatalogMarker {
        version: CatalogVersion,
    },
    Database {
        version: CatalogVersion,
        db: DbDesc,
    },
    Table {
        version: CatalogVersion,
        table: TableDesc,
    },
    View {
        version: CatalogVersion,
        table: TableDesc,
    },
    Function {
        version: CatalogVersion,
        function: FunctionDesc,
    },
}

impl CatalogObject {
    pub fn version(&self) -> CatalogVersion {
        match self {
            CatalogObject::CatalogMarker { version }
            | CatalogObject::Database { version, .. }
            | CatalogObject::Table { version, .. }
            | CatalogObject::View { version, .. }
            | CatalogObject::Function { version, .. } => *version,
        }
    }
}

/// One delta batch from the catalog service, or the direct result of a DDL
/// statement executed by this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogUpdateRequest {
    pub updated_objects: Vec<CatalogObject>,
    pub removed_objects: Vec<CatalogObject>,
    pub catalog_service_id: ServiceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUpdateResponse {
    pub catalog_service_id: ServiceId,
}

/// Post-execution metastore maintenance: partitions created while writing
/// into a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUpdate {
    pub db_name: String,
    pub target_table: String,
    /// One entry per new partition: values in clustering-column order.
    pub created_partitions: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDbsParams {
    #[serde(default)]
    pub pattern: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDbsResult {
    pub dbs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTablesParams {
    pub db: String,
    #[serde(default)]
    pub pattern: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTablesResult {
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTableParams {
    pub db: String,
    pub table_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeTableResult {
    pub columns: Vec<Column>,
}

/// Client-protocol metadata operations served from the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataOp {
    GetSchemas {
        #[serde(default)]
        schema_pattern: Option<String>,
    },
    GetTables {
        #[serde(default)]
        schema_pattern: Option<String>,
        #[serde(default)]
        table_pattern: Option<String>,
    },
    GetColumns {
        #[serde(default)]
        schema_pattern: Option<String>,
        #[serde(default)]
        table_pattern: Option<String>,
        #[serde(default)]
        column_pattern: Option<String>,
    },
    GetTypeInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOpRequest {
    pub user: String,
    pub op: MetadataOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataOpResponse {
    /// Column names of the result rows.
    pub schema: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKeyValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlterTableOp {
    AddReplaceColumns {
        columns: Vec<Column>,
        replace_existing: bool,
    },
    AddPartition {
        partition_spec: Vec<PartitionKeyValue>,
        #[serde(default)]
        location: Option<String>,
        if_not_exists: bool,
    },
    DropColumn {
        column: String,
    },
    ChangeColumn {
        column: String,
        new_def: Column,
    },
    DropPartition {
        partition_spec: Vec<PartitionKeyValue>,
        if_exists: bool,
    },
    RenameTable {
        new_table_name: TableName,
    },
    SetFileFormat {
        #[serde(default)]
        partition_spec: Option<Vec<PartitionKeyValue>>,
        file_format: HdfsFileFormat,
    },
    SetLocation {
        #[serde(default)]
        partition_spec: Option<Vec<PartitionKeyValue>>,
        location: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTableParams {
    pub table_name: TableName,
    pub op: AlterTableOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDbParams {
    pub db: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableParams {
    pub table_name: TableName,
    pub columns: Vec<Column>,
    pub partition_columns: Vec<Column>,
    #[serde(default)]
    pub owner: Option<String>,
    pub is_external: bool,
    #[serde(default)]
    pub comment: Option<String>,
    pub row_format: RowFormat,
    pub file_format: HdfsFileFormat,
    #[serde(default)]
    pub location: Option<String>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableLikeParams {
    pub table_name: TableName,
    pub src_table_name: TableName,
    #[serde(default)]
    pub owner: Option<String>,
    pub is_external: bool,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub file_format: Option<HdfsFileFormat>,
    #[serde(default)]
    pub location: Option<String>,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropDbParams {
    pub db: String,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTableParams {
    pub table_name: TableName,
    pub if_exists: bool,
}

impl TableDesc {
    /// Minimal wire form carrying only the table identity, used for removal
    /// objects where no payload is needed.
    pub fn reference(db_name: &str, name: &str) -> TableDesc {
        TableDesc {
            id: TableId(0),
            db_name: db_name.to_string(),
            name: name.to_string(),
            owner: None,
            columns: Vec::new(),
            num_clustering_cols: 0,
            storage: TableStorageDesc::Hdfs {
                format: HdfsFileFormat::Text,
                row_format: RowFormat::default(),
                location: None,
                partitions: Vec::new(),
            },
            load_error: None,
        }
    }

    /// Wire form of a table whose load failed; the cache will install an
    /// incomplete record from this.
    pub fn incomplete(id: TableId, db_name: &str, name: &str, error: &NyalaError) -> TableDesc {
        TableDesc {
            id,
            db_name: db_name.to_string(),
            name: name.to_string(),
            owner: None,
            columns: Vec::new(),
            num_clustering_cols: 0,
            storage: TableStorageDesc::Hdfs {
                format: HdfsFileFormat::Text,
                row_format: RowFormat::default(),
                location: None,
                partitions: Vec::new(),
            },
            load_error: Some(error.to_string()),
        }
    }
}
