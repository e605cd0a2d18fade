use nyaladb::Frontend;
use nyaladb::authz::{Privilege, PrivilegeRequestBuilder, User};
use nyaladb::config::{AuthorizationConfig, FrontendConfig};
use nyaladb::error::{NyalaError, NyalaErrorCode};
use nyaladb::messages::{
    AlterTableParams, CatalogObject, CatalogUpdate, CatalogUpdateRequest, ClientRequest,
    CreateDbParams, CreateTableLikeParams, CreateTableParams, DbDesc, DropDbParams,
    DropTableParams,
};
use nyaladb::metastore::{DdlOutcome, MetastoreClient, MetastoreClientPool, MetastoreDb};
use nyaladb::planner::{PlannedRequest, Planner};
use nyaladb::version::{CatalogVersion, ServiceId};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct IdleMetastore;

fn idle<T>() -> Result<T, NyalaError> {
    Err(NyalaError::Internal("metastore not used by authz tests".into()))
}

impl MetastoreClient for IdleMetastore {
    fn get_database(&self, _name: &str) -> Result<Option<MetastoreDb>, NyalaError> {
        idle()
    }
    fn load_table(&self, _db: &str, _table: &str) -> Result<CatalogObject, NyalaError> {
        idle()
    }
    fn table_location(&self, _db: &str, _table: &str) -> Result<Option<String>, NyalaError> {
        idle()
    }
    fn create_database(&self, _params: &CreateDbParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn create_table(&self, _params: &CreateTableParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn create_table_like(&self, _params: &CreateTableLikeParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn drop_database(&self, _params: &DropDbParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn drop_table(&self, _params: &DropTableParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn alter_table(&self, _params: &AlterTableParams) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
    fn add_partitions(&self, _update: &CatalogUpdate) -> Result<DdlOutcome, NyalaError> {
        idle()
    }
}

struct IdlePlanner;

impl Planner for IdlePlanner {
    fn create_exec_request(
        &self,
        _catalog: &nyaladb::catalog::CatalogState,
        _request: &ClientRequest,
    ) -> Result<PlannedRequest, NyalaError> {
        idle()
    }
}

fn facade_with_policy(
    policy_path: &Path,
    reload_interval: Duration,
    rt: &tokio::runtime::Runtime,
) -> Frontend {
    let mut config = FrontendConfig::default()
        .with_authorization(AuthorizationConfig::enabled(policy_path, "server1"));
    config.policy_reload_interval = reload_interval;
    config.policy_reload_jitter = Duration::ZERO;
    Frontend::new(
        config,
        MetastoreClientPool::single(Arc::new(IdleMetastore)),
        Arc::new(IdlePlanner),
        rt.handle(),
    )
    .expect("frontend")
}

fn seed_catalog(fe: &Frontend) {
    fe.update_catalog_cache(&CatalogUpdateRequest {
        updated_objects: vec![
            CatalogObject::CatalogMarker {
                version: CatalogVersion::new(10),
            },
            CatalogObject::Database {
                version: CatalogVersion::new(5),
                db: DbDesc {
                    name: "sales".into(),
                    owner: None,
                    comment: None,
                    location: None,
                },
            },
        ],
        removed_objects: vec![],
        catalog_service_id: ServiceId::new(9, 9),
    })
    .expect("seed");
}

const BASE_POLICY: &str = r#"{
    "users": {
        "analyst": [{ "privilege": "select", "db": "sales" }]
    }
}"#;

const WIDENED_POLICY: &str = r#"{
    "users": {
        "analyst": [{ "privilege": "select", "db": "sales" }],
        "intern": [{ "privilege": "select", "db": "sales" }]
    }
}"#;

fn select_on_sales() -> nyaladb::authz::PrivilegeRequest {
    PrivilegeRequestBuilder::new()
        .all_of(Privilege::Select)
        .on_db("sales")
        .to_request()
}

#[test]
fn facade_enforces_policy_with_distinct_messages() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let policy = tempfile::NamedTempFile::new().expect("policy");
    std::fs::write(policy.path(), BASE_POLICY).expect("write policy");
    let fe = facade_with_policy(policy.path(), Duration::from_secs(300), &rt);
    seed_catalog(&fe);

    let analyst = User::new("analyst");
    let intern = User::new("intern");

    assert!(fe.get_db("sales", &analyst, Privilege::Select).expect("granted").is_some());

    let denied = fe
        .get_db("sales", &intern, Privilege::Select)
        .expect_err("denied");
    assert_eq!(
        denied.to_string(),
        "User 'intern' does not have privileges to execute 'SELECT' on: sales"
    );

    let denied = fe
        .get_db("sales", &intern, Privilege::Any)
        .expect_err("denied");
    assert_eq!(
        denied.to_string(),
        "User 'intern' does not have privileges to access: sales.*"
    );

    let denied = fe
        .check_create_drop_function_access(&intern)
        .expect_err("denied");
    assert_eq!(
        denied.to_string(),
        "User 'intern' does not have privileges to CREATE/DROP functions."
    );
}

#[test]
fn has_access_and_check_access_agree() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let policy = tempfile::NamedTempFile::new().expect("policy");
    std::fs::write(policy.path(), BASE_POLICY).expect("write policy");
    let fe = facade_with_policy(policy.path(), Duration::from_secs(300), &rt);

    for user in [User::new("analyst"), User::new("intern")] {
        for request in [
            select_on_sales(),
            PrivilegeRequestBuilder::new().any().on_any_table("sales").to_request(),
            PrivilegeRequestBuilder::new().all_of(Privilege::Drop).on_server().to_request(),
        ] {
            assert_eq!(
                fe.has_access(&user, &request),
                fe.check_access(&user, &request).is_ok(),
                "symmetry broken for {user:?} on {request:?}"
            );
        }
    }
}

#[test]
fn reloader_picks_up_policy_changes() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let policy = tempfile::NamedTempFile::new().expect("policy");
    std::fs::write(policy.path(), BASE_POLICY).expect("write policy");
    let fe = facade_with_policy(policy.path(), Duration::from_millis(50), &rt);

    let intern = User::new("intern");
    assert!(!fe.has_access(&intern, &select_on_sales()));

    std::fs::write(policy.path(), WIDENED_POLICY).expect("widen policy");

    // the reloader runs on its own cadence; poll until the swap lands
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while !fe.has_access(&intern, &select_on_sales()) {
        assert!(
            std::time::Instant::now() < deadline,
            "policy reload never happened"
        );
        std::thread::sleep(Duration::from_millis(25));
    }

    // the analyst's grant survived the swap
    assert!(fe.has_access(&User::new("analyst"), &select_on_sales()));
}

#[test]
fn broken_policy_file_keeps_previous_checker() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let policy = tempfile::NamedTempFile::new().expect("policy");
    std::fs::write(policy.path(), BASE_POLICY).expect("write policy");
    let fe = facade_with_policy(policy.path(), Duration::from_millis(50), &rt);

    let analyst = User::new("analyst");
    assert!(fe.has_access(&analyst, &select_on_sales()));

    std::fs::write(policy.path(), b"{ broken json").expect("corrupt policy");
    std::thread::sleep(Duration::from_millis(400));

    // reload failures are logged and the old policy stays authoritative
    assert!(fe.has_access(&analyst, &select_on_sales()));
}

#[test]
fn shutdown_stops_the_reloader() {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let policy = tempfile::NamedTempFile::new().expect("policy");
    std::fs::write(policy.path(), BASE_POLICY).expect("write policy");
    let fe = facade_with_policy(policy.path(), Duration::from_millis(50), &rt);

    fe.shutdown();
    std::fs::write(policy.path(), WIDENED_POLICY).expect("widen policy");
    std::thread::sleep(Duration::from_millis(400));

    // no reloader left to pick up the widened policy
    assert!(!fe.has_access(&User::new("intern"), &select_on_sales()));
}
