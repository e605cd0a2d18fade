//! Bytes-in/bytes-out surface for foreign callers.
//!
//! Every structured operation of the facade is exposed as "decode the
//! request record, call through, encode the response record". The encoding
//! is MessagePack over the serde records in [`messages`](crate::messages);
//! callers on the other side of the boundary never see Rust types.

use crate::Frontend;
use crate::error::NyalaError;
use crate::messages::{
    AlterTableParams, CatalogUpdate, CatalogUpdateRequest, ClientRequest, CreateDbParams,
    CreateTableLikeParams, CreateTableParams, DescribeTableParams, DropDbParams, DropTableParams,
    GetDbsParams, GetDbsResult, GetTablesParams, GetTablesResult, MetadataOpRequest,
};
use crate::authz::User;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub struct FrontendBridge {
    inner: Arc<Frontend>,
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, NyalaError> {
    rmp_serde::from_slice(bytes).map_err(|e| NyalaError::Decode(e.to_string()))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NyalaError> {
    rmp_serde::to_vec(value).map_err(|e| NyalaError::Encode(e.to_string()))
}

impl FrontendBridge {
    pub fn new(inner: Arc<Frontend>) -> FrontendBridge {
        FrontendBridge { inner }
    }

    /// Accepts a serialized `ClientRequest`; returns a serialized
    /// `ExecRequest`.
    pub fn create_exec_request(&self, request: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let request: ClientRequest = decode(request)?;
        encode(&self.inner.create_exec_request(&request)?)
    }

    /// Accepts a serialized `ClientRequest`; returns the explain rendering.
    pub fn explain(&self, request: &[u8]) -> Result<String, NyalaError> {
        let request: ClientRequest = decode(request)?;
        self.inner.explain(&request)
    }

    /// Accepts a serialized `CatalogUpdateRequest`; returns a serialized
    /// `CatalogUpdateResponse`.
    pub fn update_catalog_cache(&self, request: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let request: CatalogUpdateRequest = decode(request)?;
        encode(&self.inner.update_catalog_cache(&request)?)
    }

    pub fn alter_table(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: AlterTableParams = decode(params)?;
        self.inner.alter_table(&params)
    }

    pub fn create_database(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: CreateDbParams = decode(params)?;
        self.inner.create_database(&params)
    }

    pub fn create_table(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: CreateTableParams = decode(params)?;
        self.inner.create_table(&params)
    }

    pub fn create_table_like(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: CreateTableLikeParams = decode(params)?;
        self.inner.create_table_like(&params)
    }

    pub fn drop_database(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: DropDbParams = decode(params)?;
        self.inner.drop_database(&params)
    }

    pub fn drop_table(&self, params: &[u8]) -> Result<(), NyalaError> {
        let params: DropTableParams = decode(params)?;
        self.inner.drop_table(&params)
    }

    pub fn update_metastore(&self, update: &[u8]) -> Result<(), NyalaError> {
        let update: CatalogUpdate = decode(update)?;
        self.inner.update_metastore(&update)
    }

    /// Accepts a serialized `GetDbsParams`; returns a serialized
    /// `GetDbsResult`.
    pub fn get_db_names(&self, params: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let params: GetDbsParams = decode(params)?;
        let user = User::new(&params.user);
        let dbs = self.inner.get_db_names(params.pattern.as_deref(), &user);
        encode(&GetDbsResult { dbs })
    }

    /// Accepts a serialized `GetTablesParams`; returns a serialized
    /// `GetTablesResult`.
    pub fn get_table_names(&self, params: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let params: GetTablesParams = decode(params)?;
        let user = User::new(&params.user);
        let tables = self
            .inner
            .get_table_names(&params.db, params.pattern.as_deref(), &user)?;
        encode(&GetTablesResult { tables })
    }

    /// Accepts a serialized `DescribeTableParams`; returns a serialized
    /// `DescribeTableResult`.
    pub fn describe_table(&self, params: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let params: DescribeTableParams = decode(params)?;
        encode(&self.inner.describe_table(&params.db, &params.table_name)?)
    }

    /// Accepts a serialized `MetadataOpRequest`; returns a serialized
    /// `MetadataOpResponse`.
    pub fn exec_metadata_op(&self, request: &[u8]) -> Result<Vec<u8>, NyalaError> {
        let request: MetadataOpRequest = decode(request)?;
        encode(&self.inner.exec_metadata_op(&request)?)
    }

    pub fn reset_table(&self, db: &str, table: &str) -> Result<(), NyalaError> {
        self.inner.reset_table(db, table)
    }

    pub fn reset_catalog(&self) {
        self.inner.reset_catalog();
    }

    pub fn get_hadoop_config(&self, as_text: bool) -> String {
        self.inner.get_hadoop_config(as_text)
    }

    pub fn get_hadoop_config_value(&self, key: &str) -> String {
        self.inner.get_hadoop_config_value(key)
    }
}
