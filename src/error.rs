use crate::version::ServiceId;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Database,
    Table,
    Function,
    Partition,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Database => write!(f, "database"),
            ResourceType::Table => write!(f, "table"),
            ResourceType::Function => write!(f, "function"),
            ResourceType::Partition => write!(f, "partition"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NyalaErrorCode {
    Internal,
    Catalog,
    ServiceIdChanged,
    TableLoading,
    DatabaseNotFound,
    TableNotFound,
    Authorization,
    DatabaseAlreadyExists,
    TableAlreadyExists,
    FunctionAlreadyExists,
    PartitionAlreadyExists,
    InvalidOperation,
    Unsupported,
    Encode,
    Decode,
    Io,
    InvalidConfig,
}

impl NyalaErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            NyalaErrorCode::Internal => "internal",
            NyalaErrorCode::Catalog => "catalog",
            NyalaErrorCode::ServiceIdChanged => "service_id_changed",
            NyalaErrorCode::TableLoading => "table_loading",
            NyalaErrorCode::DatabaseNotFound => "database_not_found",
            NyalaErrorCode::TableNotFound => "table_not_found",
            NyalaErrorCode::Authorization => "authorization",
            NyalaErrorCode::DatabaseAlreadyExists => "database_already_exists",
            NyalaErrorCode::TableAlreadyExists => "table_already_exists",
            NyalaErrorCode::FunctionAlreadyExists => "function_already_exists",
            NyalaErrorCode::PartitionAlreadyExists => "partition_already_exists",
            NyalaErrorCode::InvalidOperation => "invalid_operation",
            NyalaErrorCode::Unsupported => "unsupported",
            NyalaErrorCode::Encode => "encode",
            NyalaErrorCode::Decode => "decode",
            NyalaErrorCode::Io => "io",
            NyalaErrorCode::InvalidConfig => "invalid_config",
        }
    }
}

#[derive(Debug, Error)]
pub enum NyalaError {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("detected catalog service ID change to {observed}; a full resync is required")]
    ServiceIdChanged { observed: ServiceId },
    #[error("failed to load metadata for table '{table}': {message}")]
    TableLoading {
        table: String,
        message: String,
        /// The failure recorded when the load was attempted, shared with the
        /// incomplete record it came from.
        cause: Option<Arc<NyalaError>>,
    },
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("{0}")]
    Authorization(String),
    #[error("{resource} '{name}' already exists")]
    AlreadyExists { resource: ResourceType, name: String },
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl NyalaError {
    pub fn code(&self) -> NyalaErrorCode {
        match self {
            NyalaError::Internal(_) => NyalaErrorCode::Internal,
            NyalaError::Catalog(_) => NyalaErrorCode::Catalog,
            NyalaError::ServiceIdChanged { .. } => NyalaErrorCode::ServiceIdChanged,
            NyalaError::TableLoading { .. } => NyalaErrorCode::TableLoading,
            NyalaError::DatabaseNotFound(_) => NyalaErrorCode::DatabaseNotFound,
            NyalaError::TableNotFound(_) => NyalaErrorCode::TableNotFound,
            NyalaError::Authorization(_) => NyalaErrorCode::Authorization,
            NyalaError::AlreadyExists { resource, .. } => match resource {
                ResourceType::Database => NyalaErrorCode::DatabaseAlreadyExists,
                ResourceType::Table => NyalaErrorCode::TableAlreadyExists,
                ResourceType::Function => NyalaErrorCode::FunctionAlreadyExists,
                ResourceType::Partition => NyalaErrorCode::PartitionAlreadyExists,
            },
            NyalaError::InvalidOperation(_) => NyalaErrorCode::InvalidOperation,
            NyalaError::Unsupported(_) => NyalaErrorCode::Unsupported,
            NyalaError::Encode(_) => NyalaErrorCode::Encode,
            NyalaError::Decode(_) => NyalaErrorCode::Decode,
            NyalaError::Io(_) => NyalaErrorCode::Io,
            NyalaError::InvalidConfig(_) => NyalaErrorCode::InvalidConfig,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    /// Wraps a loading failure so it can be re-raised when the table is
    /// accessed, long after the batch that carried it was applied.
    pub fn table_loading(table: impl Into<String>, cause: Arc<NyalaError>) -> NyalaError {
        NyalaError::TableLoading {
            table: table.into(),
            message: cause.to_string(),
            cause: Some(cause),
        }
    }
}
