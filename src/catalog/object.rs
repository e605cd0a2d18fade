use crate::catalog::table::TableRecord;
use crate::version::CatalogVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The kinds of objects that flow through catalog update batches. Tables and
/// views are interchangeable for cache purposes; the marker object carries
/// only a version and advances the sync watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    CatalogMarker,
    Database,
    Table,
    View,
    Function,
}

/// Identity of one catalog object, normalized to lowercase. This is the key
/// the delta log and the reconciler agree on across broadcast and direct
/// update streams.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Database(String),
    Table { db: String, table: String },
    Function { db: String, signature: String },
}

impl ObjectKey {
    pub fn database(name: &str) -> ObjectKey {
        ObjectKey::Database(name.to_lowercase())
    }

    pub fn table(db: &str, table: &str) -> ObjectKey {
        ObjectKey::Table {
            db: db.to_lowercase(),
            table: table.to_lowercase(),
        }
    }

    pub fn function(db: &str, signature: &str) -> ObjectKey {
        ObjectKey::Function {
            db: db.to_lowercase(),
            signature: signature.to_string(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Database(db) => write!(f, "{db}"),
            ObjectKey::Table { db, table } => write!(f, "{db}.{table}"),
            ObjectKey::Function { db, signature } => write!(f, "{db}.{signature}"),
        }
    }
}

/// One cached function, identified by its canonical signature (name plus
/// argument-type encoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub signature: String,
    pub db_name: String,
    pub version: CatalogVersion,
}

/// One cached database and its child tables and functions.
///
/// Child maps are keyed by lowercased table name and by function signature.
/// Children are owned here; tables refer back to the database by name only,
/// so replacing this record does not invalidate them.
#[derive(Debug, Clone)]
pub struct DbRecord {
    pub name: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
    pub location: Option<String>,
    pub version: CatalogVersion,
    tables: HashMap<String, Arc<TableRecord>>,
    functions: HashMap<String, FunctionRecord>,
}

impl DbRecord {
    pub fn new(
        name: impl Into<String>,
        owner: Option<String>,
        comment: Option<String>,
        location: Option<String>,
        version: CatalogVersion,
    ) -> DbRecord {
        DbRecord {
            name: name.into(),
            owner,
            comment,
            location,
            version,
            tables: HashMap::new(),
            functions: HashMap::new(),
        }
    }

    /// Moves the child maps of a replaced record into this one. Replacement
    /// updates the database metadata only; children keep their own versions.
    pub fn adopt_children(&mut self, previous: DbRecord) {
        self.tables = previous.tables;
        self.functions = previous.functions;
    }

    pub fn table(&self, name: &str) -> Option<&Arc<TableRecord>> {
        self.tables.get(&name.to_lowercase())
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    pub fn put_table(&mut self, table: Arc<TableRecord>) {
        self.tables.insert(table.name.to_lowercase(), table);
    }

    /// Idempotent; removing an absent table is a no-op.
    pub fn remove_table(&mut self, name: &str) {
        self.tables.remove(&name.to_lowercase());
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|t| t.name.as_str())
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableRecord>> {
        self.tables.values()
    }

    pub fn function(&self, signature: &str) -> Option<&FunctionRecord> {
        self.functions.get(signature)
    }

    pub fn put_function(&mut self, function: FunctionRecord) {
        self.functions.insert(function.signature.clone(), function);
    }

    pub fn remove_function(&mut self, signature: &str) {
        self.functions.remove(signature);
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionRecord> {
        self.functions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::table::{Column, ColumnType, TableId, TableKind};
    use crate::catalog::table::{HdfsFileFormat, HdfsTable, RowFormat};

    fn table(db: &str, name: &str, version: u64) -> Arc<TableRecord> {
        Arc::new(TableRecord::new(
            TableId(1),
            db,
            name,
            None,
            vec![Column::new("id", ColumnType::BigInt)],
            0,
            TableKind::Hdfs(HdfsTable {
                format: HdfsFileFormat::Text,
                row_format: RowFormat::default(),
                location: None,
                partitions: Vec::new(),
            }),
            CatalogVersion::new(version),
        ))
    }

    #[test]
    fn table_lookup_ignores_case() {
        let mut db = DbRecord::new("sales", None, None, None, CatalogVersion::new(2));
        db.put_table(table("sales", "Orders", 3));
        assert!(db.contains_table("ORDERS"));
        assert_eq!(db.table("orders").map(|t| t.name.as_str()), Some("Orders"));
        db.remove_table("oRdErS");
        assert!(!db.contains_table("orders"));
        // removing again is a no-op
        db.remove_table("orders");
    }

    #[test]
    fn replacement_adopts_children() {
        let mut old = DbRecord::new("sales", None, None, None, CatalogVersion::new(2));
        old.put_table(table("sales", "orders", 3));
        let mut new = DbRecord::new(
            "sales",
            Some("etl".into()),
            None,
            None,
            CatalogVersion::new(8),
        );
        new.adopt_children(old);
        assert!(new.contains_table("orders"));
        assert_eq!(new.owner.as_deref(), Some("etl"));
    }

    #[test]
    fn object_keys_normalize_case() {
        assert_eq!(
            ObjectKey::table("Sales", "Orders"),
            ObjectKey::table("sales", "orders")
        );
        assert_eq!(ObjectKey::database("SALES"), ObjectKey::database("sales"));
        assert_eq!(ObjectKey::table("sales", "orders").to_string(), "sales.orders");
    }
}
