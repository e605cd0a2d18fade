use crate::error::NyalaError;
use crate::messages::TableDesc;
use crate::version::CatalogVersion;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TableId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Date,
    DateTime,
    Timestamp,
    String,
}

impl ColumnType {
    pub const ALL: [ColumnType; 11] = [
        ColumnType::Boolean,
        ColumnType::TinyInt,
        ColumnType::SmallInt,
        ColumnType::Int,
        ColumnType::BigInt,
        ColumnType::Float,
        ColumnType::Double,
        ColumnType::Date,
        ColumnType::DateTime,
        ColumnType::Timestamp,
        ColumnType::String,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::TinyInt => "tinyint",
            ColumnType::SmallInt => "smallint",
            ColumnType::Int => "int",
            ColumnType::BigInt => "bigint",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::String => "string",
        }
    }

    /// Case-insensitive parse of a type name as it appears in metastore
    /// records.
    pub fn parse(name: &str) -> Option<ColumnType> {
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == name.to_lowercase())
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub col_type: ColumnType,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            col_type,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HdfsFileFormat {
    Text,
    RcFile,
    Parquet,
    SequenceFile,
    Avro,
}

impl HdfsFileFormat {
    pub fn input_format(self) -> &'static str {
        match self {
            HdfsFileFormat::Text => "org.apache.hadoop.mapred.TextInputFormat",
            HdfsFileFormat::RcFile => "org.apache.hadoop.hive.ql.io.RCFileInputFormat",
            HdfsFileFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat"
            }
            HdfsFileFormat::SequenceFile => "org.apache.hadoop.mapred.SequenceFileInputFormat",
            HdfsFileFormat::Avro => "org.apache.hadoop.hive.ql.io.avro.AvroContainerInputFormat",
        }
    }

    pub fn output_format(self) -> &'static str {
        match self {
            HdfsFileFormat::Text => "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat",
            HdfsFileFormat::RcFile => "org.apache.hadoop.hive.ql.io.RCFileOutputFormat",
            HdfsFileFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat"
            }
            HdfsFileFormat::SequenceFile => {
                "org.apache.hadoop.hive.ql.io.HiveSequenceFileOutputFormat"
            }
            HdfsFileFormat::Avro => "org.apache.hadoop.hive.ql.io.avro.AvroContainerOutputFormat",
        }
    }

    pub fn serialization_lib(self) -> &'static str {
        match self {
            HdfsFileFormat::Text | HdfsFileFormat::SequenceFile => {
                "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe"
            }
            HdfsFileFormat::RcFile => "org.apache.hadoop.hive.serde2.columnar.ColumnarSerDe",
            HdfsFileFormat::Parquet => {
                "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe"
            }
            HdfsFileFormat::Avro => "org.apache.hadoop.hive.serde2.avro.AvroSerDe",
        }
    }
}

/// Row-level text layout of a table, carried through DDL into the storage
/// descriptor parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFormat {
    #[serde(default)]
    pub field_delimiter: Option<String>,
    #[serde(default)]
    pub line_delimiter: Option<String>,
    #[serde(default)]
    pub escape_char: Option<String>,
}

/// Storage descriptor handed to the metastore when creating or altering a
/// table. A pure transform of (file format, row format); nothing here reads
/// cache state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDescriptor {
    pub input_format: String,
    pub output_format: String,
    pub serialization_lib: String,
    pub parameters: BTreeMap<String, String>,
    pub compressed: bool,
}

impl StorageDescriptor {
    /// The compressed flag is not used to decide whether data is compressed;
    /// that is derived from the input format or file names.
    pub fn for_format(format: HdfsFileFormat, row_format: &RowFormat) -> StorageDescriptor {
        let mut parameters = BTreeMap::new();
        if let Some(delim) = &row_format.field_delimiter {
            parameters.insert("serialization.format".to_string(), delim.clone());
            parameters.insert("field.delim".to_string(), delim.clone());
        }
        if let Some(escape) = &row_format.escape_char {
            parameters.insert("escape.delim".to_string(), escape.clone());
        }
        if let Some(delim) = &row_format.line_delimiter {
            parameters.insert("line.delim".to_string(), delim.clone());
        }
        StorageDescriptor {
            input_format: format.input_format().to_string(),
            output_format: format.output_format().to_string(),
            serialization_lib: format.serialization_lib().to_string(),
            parameters,
            compressed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsPartition {
    pub id: u64,
    /// One value per clustering column, in clustering-column order.
    pub values: Vec<String>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HdfsTable {
    pub format: HdfsFileFormat,
    pub row_format: RowFormat,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub partitions: Vec<HdfsPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HBaseTable {
    pub hbase_table_name: String,
    pub column_families: Vec<String>,
}

/// Placeholder payload for a table whose metadata could not be loaded. The
/// record stays listable; the cause is raised the next time the table is
/// accessed.
#[derive(Debug, Clone)]
pub struct IncompleteTable {
    pub cause: Arc<NyalaError>,
}

#[derive(Debug, Clone)]
pub enum TableKind {
    Hdfs(HdfsTable),
    HBase(HBaseTable),
    Incomplete(IncompleteTable),
}

/// One cached table or view. Views carry the same record shape; the cache
/// does not distinguish them.
///
/// The first `num_clustering_cols` entries of `columns` are the clustering
/// (partition) columns: rows sharing their values are physically colocated.
#[derive(Debug, Clone)]
pub struct TableRecord {
    pub id: TableId,
    /// Back-reference to the owning database by name. Lookups go through the
    /// object store, so replacing the database record cannot dangle this.
    pub db_name: String,
    pub name: String,
    pub owner: Option<String>,
    pub version: CatalogVersion,
    columns: Vec<Column>,
    num_clustering_cols: usize,
    cols_by_name: HashMap<String, usize>,
    pub kind: TableKind,
}

impl TableRecord {
    pub fn new(
        id: TableId,
        db_name: impl Into<String>,
        name: impl Into<String>,
        owner: Option<String>,
        columns: Vec<Column>,
        num_clustering_cols: usize,
        kind: TableKind,
        version: CatalogVersion,
    ) -> TableRecord {
        let cols_by_name = columns
            .iter()
            .enumerate()
            .map(|(pos, col)| (col.name.to_lowercase(), pos))
            .collect();
        let num_clustering_cols = num_clustering_cols.min(columns.len());
        TableRecord {
            id,
            db_name: db_name.into(),
            name: name.into(),
            owner,
            version,
            columns,
            num_clustering_cols,
            cols_by_name,
            kind,
        }
    }

    /// Builds a cache record from its wire form. A populated `load_error`
    /// yields an incomplete record regardless of the storage payload.
    pub fn from_desc(desc: &TableDesc, version: CatalogVersion) -> TableRecord {
        let kind = match &desc.load_error {
            Some(message) => TableKind::Incomplete(IncompleteTable {
                cause: Arc::new(NyalaError::Internal(message.clone())),
            }),
            None => desc.storage.to_kind(),
        };
        TableRecord::new(
            desc.id,
            desc.db_name.clone(),
            desc.name.clone(),
            desc.owner.clone(),
            desc.columns.clone(),
            desc.num_clustering_cols as usize,
            kind,
            version,
        )
    }

    pub fn full_name(&self) -> String {
        format!("{}.{}", self.db_name, self.name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.cols_by_name
            .get(&name.to_lowercase())
            .map(|pos| &self.columns[*pos])
    }

    pub fn num_clustering_cols(&self) -> usize {
        self.num_clustering_cols
    }

    pub fn clustering_columns(&self) -> &[Column] {
        &self.columns[..self.num_clustering_cols]
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind, TableKind::Incomplete(_))
    }

    pub fn incomplete_cause(&self) -> Option<&Arc<NyalaError>> {
        match &self.kind {
            TableKind::Incomplete(inner) => Some(&inner.cause),
            _ => None,
        }
    }

    /// Raises the stored loading failure if this record is incomplete.
    pub fn ensure_loaded(&self) -> Result<(), NyalaError> {
        match self.incomplete_cause() {
            Some(cause) => Err(NyalaError::table_loading(
                self.full_name(),
                Arc::clone(cause),
            )),
            None => Ok(()),
        }
    }

    /// Plan-time descriptor for this table. Dispatches on the storage tag;
    /// incomplete records raise their loading failure instead.
    pub fn to_descriptor(&self) -> Result<TableDescriptor, NyalaError> {
        let storage = match &self.kind {
            TableKind::Hdfs(hdfs) => DescriptorStorage::Hdfs {
                descriptor: StorageDescriptor::for_format(hdfs.format, &hdfs.row_format),
                location: hdfs.location.clone(),
                partitions: hdfs.partitions.clone(),
            },
            TableKind::HBase(hbase) => DescriptorStorage::HBase {
                table_name: hbase.hbase_table_name.clone(),
                column_families: hbase.column_families.clone(),
            },
            TableKind::Incomplete(inner) => {
                return Err(NyalaError::table_loading(
                    self.full_name(),
                    Arc::clone(&inner.cause),
                ));
            }
        };
        Ok(TableDescriptor {
            id: self.id,
            db_name: self.db_name.clone(),
            name: self.name.clone(),
            columns: self.columns.clone(),
            num_clustering_cols: self.num_clustering_cols,
            storage,
        })
    }
}

/// What the planner consumes when it references a table in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub id: TableId,
    pub db_name: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub num_clustering_cols: usize,
    pub storage: DescriptorStorage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DescriptorStorage {
    Hdfs {
        descriptor: StorageDescriptor,
        location: Option<String>,
        partitions: Vec<HdfsPartition>,
    },
    HBase {
        table_name: String,
        column_families: Vec<String>,
    },
}
