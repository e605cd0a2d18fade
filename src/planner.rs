//! Seam to the query planner. Planning itself lives outside this crate; the
//! facade hands the planner a read-locked view of the catalog so one plan
//! sees one consistent cache state.

use crate::catalog::CatalogState;
use crate::error::NyalaError;
use crate::messages::{ClientRequest, ExecRequest};

/// Planner output plus the explain rendering produced alongside it.
#[derive(Debug, Clone)]
pub struct PlannedRequest {
    pub exec_request: ExecRequest,
    pub explain_string: String,
}

pub trait Planner: Send + Sync {
    /// Plans one statement against the given catalog view. Name resolution
    /// and privilege enforcement inside the plan are the planner's concern;
    /// the view is guaranteed stable for the duration of the call.
    fn create_exec_request(
        &self,
        catalog: &CatalogState,
        request: &ClientRequest,
    ) -> Result<PlannedRequest, NyalaError>;

    fn explain(
        &self,
        catalog: &CatalogState,
        request: &ClientRequest,
    ) -> Result<String, NyalaError> {
        Ok(self.create_exec_request(catalog, request)?.explain_string)
    }
}
