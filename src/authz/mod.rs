//! Privilege model and the policy-backed authorization checker.
//!
//! The checker is an immutable value built from the policy file; the facade
//! keeps the current checker behind its own reader/writer lock and the
//! reloader swaps in a fresh one periodically. Checks never mutate.

pub mod reloader;

use crate::config::AuthorizationConfig;
use crate::error::NyalaError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User {
    name: String,
}

impl User {
    pub fn new(name: impl Into<String>) -> User {
        User { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    All,
    Insert,
    Select,
    Create,
    Drop,
    ViewMetadata,
    Any,
}

impl Privilege {
    /// Access checks get the "does not have privileges to access" denial
    /// message; action checks name the privilege being exercised.
    pub fn is_access_check(self) -> bool {
        matches!(self, Privilege::Any | Privilege::All | Privilege::ViewMetadata)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privilege::All => "ALL",
            Privilege::Insert => "INSERT",
            Privilege::Select => "SELECT",
            Privilege::Create => "CREATE",
            Privilege::Drop => "DROP",
            Privilege::ViewMetadata => "VIEW_METADATA",
            Privilege::Any => "ANY",
        };
        f.write_str(name)
    }
}

/// The object a privilege request is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeScope {
    Server,
    Db(String),
    Table { db: String, table: String },
    Column { db: String, table: String, column: String },
    Uri(String),
    /// Satisfied by privileges on the database itself or on any table under
    /// it; used to decide whether a database is visible at all.
    AnyTableIn(String),
}

impl PrivilegeScope {
    fn name(&self, server_name: &str) -> String {
        match self {
            PrivilegeScope::Server => server_name.to_string(),
            PrivilegeScope::Db(db) => db.clone(),
            PrivilegeScope::Table { db, table } => format!("{db}.{table}"),
            PrivilegeScope::Column { db, table, column } => format!("{db}.{table}.{column}"),
            PrivilegeScope::Uri(uri) => uri.clone(),
            PrivilegeScope::AnyTableIn(db) => format!("{db}.*"),
        }
    }
}

/// One privilege check: every listed privilege must be held on the scope.
/// Usually a single privilege; compound requests come from the builder's
/// `all_of_each`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeRequest {
    pub privileges: Vec<Privilege>,
    pub scope: PrivilegeScope,
}

impl PrivilegeRequest {
    fn leading_privilege(&self) -> Privilege {
        self.privileges.first().copied().unwrap_or(Privilege::Any)
    }
}

/// Builder producing [`PrivilegeRequest`]s in the shape the facade needs.
#[derive(Debug, Default)]
pub struct PrivilegeRequestBuilder {
    privileges: Vec<Privilege>,
    scope: Option<PrivilegeScope>,
}

impl PrivilegeRequestBuilder {
    pub fn new() -> PrivilegeRequestBuilder {
        PrivilegeRequestBuilder::default()
    }

    pub fn any(mut self) -> Self {
        self.privileges = vec![Privilege::Any];
        self
    }

    pub fn all_of(mut self, privilege: Privilege) -> Self {
        self.privileges = vec![privilege];
        self
    }

    pub fn all_of_each(mut self, privileges: &[Privilege]) -> Self {
        self.privileges = privileges.to_vec();
        self
    }

    pub fn on_server(mut self) -> Self {
        self.scope = Some(PrivilegeScope::Server);
        self
    }

    pub fn on_db(mut self, db: &str) -> Self {
        self.scope = Some(PrivilegeScope::Db(db.to_lowercase()));
        self
    }

    pub fn on_table(mut self, db: &str, table: &str) -> Self {
        self.scope = Some(PrivilegeScope::Table {
            db: db.to_lowercase(),
            table: table.to_lowercase(),
        });
        self
    }

    pub fn on_column(mut self, db: &str, table: &str, column: &str) -> Self {
        self.scope = Some(PrivilegeScope::Column {
            db: db.to_lowercase(),
            table: table.to_lowercase(),
            column: column.to_lowercase(),
        });
        self
    }

    pub fn on_uri(mut self, uri: &str) -> Self {
        self.scope = Some(PrivilegeScope::Uri(uri.to_string()));
        self
    }

    pub fn on_any_table(mut self, db: &str) -> Self {
        self.scope = Some(PrivilegeScope::AnyTableIn(db.to_lowercase()));
        self
    }

    pub fn to_request(self) -> PrivilegeRequest {
        PrivilegeRequest {
            privileges: if self.privileges.is_empty() {
                vec![Privilege::Any]
            } else {
                self.privileges
            },
            scope: self.scope.unwrap_or(PrivilegeScope::Server),
        }
    }
}

/// What a policy entry grants a privilege on.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GrantScope {
    Server,
    Db(String),
    Table { db: String, table: String },
    Uri(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PolicyGrant {
    scope: GrantScope,
    privilege: Privilege,
}

/// On-disk policy shape: a map from user name to grant entries. Exactly one
/// of `server`, `db`, `table` (`"db.table"`) or `uri` selects the scope.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    users: HashMap<String, Vec<PolicyEntry>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyEntry {
    privilege: Privilege,
    #[serde(default)]
    server: bool,
    #[serde(default)]
    db: Option<String>,
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl PolicyEntry {
    fn to_grant(&self) -> Result<PolicyGrant, NyalaError> {
        let scope = match (self.server, &self.db, &self.table, &self.uri) {
            (true, None, None, None) => GrantScope::Server,
            (false, Some(db), None, None) => GrantScope::Db(db.to_lowercase()),
            (false, None, Some(table), None) => {
                let (db, table) = table.split_once('.').ok_or_else(|| {
                    NyalaError::InvalidConfig(format!(
                        "policy table scope must be 'db.table', got '{table}'"
                    ))
                })?;
                GrantScope::Table {
                    db: db.to_lowercase(),
                    table: table.to_lowercase(),
                }
            }
            (false, None, None, Some(uri)) => GrantScope::Uri(uri.clone()),
            _ => {
                return Err(NyalaError::InvalidConfig(
                    "policy entry must set exactly one of server, db, table, uri".into(),
                ));
            }
        };
        Ok(PolicyGrant {
            scope,
            privilege: self.privilege,
        })
    }
}

/// Immutable snapshot of the authorization policy. Rebuilt by the reloader
/// and swapped wholesale; never mutated in place.
#[derive(Debug)]
pub struct AuthorizationChecker {
    enabled: bool,
    server_name: String,
    grants: HashMap<String, Vec<PolicyGrant>>,
}

impl AuthorizationChecker {
    /// Builds a checker from the policy file named by the config. With
    /// authorization disabled every request is granted and no file is read.
    pub fn from_config(config: &AuthorizationConfig) -> Result<AuthorizationChecker, NyalaError> {
        if !config.is_enabled() {
            return Ok(AuthorizationChecker {
                enabled: false,
                server_name: config.server_name.clone(),
                grants: HashMap::new(),
            });
        }
        let raw = fs::read_to_string(&config.policy_file)?;
        let file: PolicyFile = serde_json::from_str(&raw)
            .map_err(|e| NyalaError::InvalidConfig(format!("malformed policy file: {e}")))?;
        let mut grants = HashMap::new();
        for (user, entries) in file.users {
            let parsed: Result<Vec<PolicyGrant>, NyalaError> =
                entries.iter().map(PolicyEntry::to_grant).collect();
            grants.insert(user.to_lowercase(), parsed?);
        }
        Ok(AuthorizationChecker {
            enabled: true,
            server_name: config.server_name.clone(),
            grants,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Non-throwing check used for list filtering.
    pub fn has_access(&self, user: &User, request: &PrivilegeRequest) -> bool {
        if !self.enabled {
            return true;
        }
        let Some(grants) = self.grants.get(&user.name().to_lowercase()) else {
            return false;
        };
        request
            .privileges
            .iter()
            .all(|p| grants.iter().any(|g| grant_satisfies(g, *p, &request.scope)))
    }

    /// Throwing form of [`has_access`](Self::has_access). The denial message
    /// distinguishes access checks from action checks.
    pub fn check_access(&self, user: &User, request: &PrivilegeRequest) -> Result<(), NyalaError> {
        if self.has_access(user, request) {
            return Ok(());
        }
        let privilege = request.leading_privilege();
        let target = request.scope.name(&self.server_name);
        let message = if privilege.is_access_check() {
            format!(
                "User '{}' does not have privileges to access: {}",
                user.name(),
                target
            )
        } else {
            format!(
                "User '{}' does not have privileges to execute '{}' on: {}",
                user.name(),
                privilege,
                target
            )
        };
        Err(NyalaError::Authorization(message))
    }

    /// Creating or dropping a function requires ALL on the server.
    pub fn check_create_drop_function_access(&self, user: &User) -> Result<(), NyalaError> {
        let request = PrivilegeRequestBuilder::new()
            .all_of(Privilege::All)
            .on_server()
            .to_request();
        if self.has_access(user, &request) {
            return Ok(());
        }
        Err(NyalaError::Authorization(format!(
            "User '{}' does not have privileges to CREATE/DROP functions.",
            user.name()
        )))
    }
}

fn privilege_satisfies(granted: Privilege, requested: Privilege) -> bool {
    granted == Privilege::All || requested == Privilege::Any || granted == requested
}

/// Grants apply hierarchically: a server grant covers everything, a database
/// grant covers its tables and their columns, a table grant covers its
/// columns. URI grants are prefix matches.
fn grant_satisfies(grant: &PolicyGrant, requested: Privilege, scope: &PrivilegeScope) -> bool {
    if !privilege_satisfies(grant.privilege, requested) {
        return false;
    }
    match (&grant.scope, scope) {
        (GrantScope::Server, _) => true,
        (GrantScope::Db(granted), PrivilegeScope::Db(db)) => granted == db,
        (GrantScope::Db(granted), PrivilegeScope::Table { db, .. })
        | (GrantScope::Db(granted), PrivilegeScope::Column { db, .. })
        | (GrantScope::Db(granted), PrivilegeScope::AnyTableIn(db)) => granted == db,
        (GrantScope::Table { db: gdb, table: gt }, PrivilegeScope::Table { db, table })
        | (GrantScope::Table { db: gdb, table: gt }, PrivilegeScope::Column { db, table, .. }) => {
            gdb == db && gt == table
        }
        (GrantScope::Table { db: gdb, .. }, PrivilegeScope::AnyTableIn(db)) => gdb == db,
        (GrantScope::Uri(granted), PrivilegeScope::Uri(uri)) => uri.starts_with(granted),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorizationConfig;
    use std::io::Write;

    fn checker_from(policy: &str) -> AuthorizationChecker {
        let mut file = tempfile::NamedTempFile::new().expect("temp policy");
        file.write_all(policy.as_bytes()).expect("write policy");
        let config = AuthorizationConfig::enabled(file.path(), "server1");
        AuthorizationChecker::from_config(&config).expect("parse policy")
    }

    const POLICY: &str = r#"{
        "users": {
            "admin": [{ "privilege": "all", "server": true }],
            "analyst": [
                { "privilege": "select", "db": "sales" },
                { "privilege": "insert", "table": "staging.events" }
            ],
            "loader": [{ "privilege": "all", "uri": "hdfs://nn/landing/" }]
        }
    }"#;

    #[test]
    fn server_grant_covers_everything() {
        let checker = checker_from(POLICY);
        let admin = User::new("admin");
        for request in [
            PrivilegeRequestBuilder::new().all_of(Privilege::Drop).on_db("sales").to_request(),
            PrivilegeRequestBuilder::new().any().on_table("x", "y").to_request(),
            PrivilegeRequestBuilder::new().all_of(Privilege::All).on_server().to_request(),
        ] {
            assert!(checker.has_access(&admin, &request));
        }
        assert!(checker.check_create_drop_function_access(&admin).is_ok());
    }

    #[test]
    fn db_grant_covers_tables_and_columns() {
        let checker = checker_from(POLICY);
        let analyst = User::new("analyst");
        assert!(checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().all_of(Privilege::Select).on_table("Sales", "Orders").to_request()
        ));
        assert!(checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().all_of(Privilege::Select).on_column("sales", "orders", "amount").to_request()
        ));
        assert!(!checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().all_of(Privilege::Insert).on_table("sales", "orders").to_request()
        ));
        assert!(!checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().all_of(Privilege::Select).on_db("finance").to_request()
        ));
    }

    #[test]
    fn table_grant_satisfies_any_on_the_database() {
        let checker = checker_from(POLICY);
        let analyst = User::new("analyst");
        // visibility of the parent database comes from the table grant
        assert!(checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().any().on_any_table("staging").to_request()
        ));
        assert!(!checker.has_access(
            &analyst,
            &PrivilegeRequestBuilder::new().any().on_any_table("finance").to_request()
        ));
    }

    #[test]
    fn uri_grants_are_prefix_matches() {
        let checker = checker_from(POLICY);
        let loader = User::new("loader");
        assert!(checker.has_access(
            &loader,
            &PrivilegeRequestBuilder::new().all_of(Privilege::All).on_uri("hdfs://nn/landing/2024/01").to_request()
        ));
        assert!(!checker.has_access(
            &loader,
            &PrivilegeRequestBuilder::new().all_of(Privilege::All).on_uri("hdfs://nn/secure/").to_request()
        ));
    }

    #[test]
    fn denial_messages_distinguish_access_and_action() {
        let checker = checker_from(POLICY);
        let nobody = User::new("nobody");

        let access = checker
            .check_access(
                &nobody,
                &PrivilegeRequestBuilder::new().any().on_table("sales", "orders").to_request(),
            )
            .expect_err("denied");
        assert_eq!(
            access.to_string(),
            "User 'nobody' does not have privileges to access: sales.orders"
        );

        let action = checker
            .check_access(
                &nobody,
                &PrivilegeRequestBuilder::new().all_of(Privilege::Insert).on_table("sales", "orders").to_request(),
            )
            .expect_err("denied");
        assert_eq!(
            action.to_string(),
            "User 'nobody' does not have privileges to execute 'INSERT' on: sales.orders"
        );
    }

    #[test]
    fn compound_requests_require_every_privilege() {
        let checker = checker_from(POLICY);
        let analyst = User::new("analyst");
        // select on sales is granted, drop on sales is not
        let both = PrivilegeRequestBuilder::new()
            .all_of_each(&[Privilege::Select, Privilege::Drop])
            .on_db("sales")
            .to_request();
        assert!(!checker.has_access(&analyst, &both));
        let select_only = PrivilegeRequestBuilder::new()
            .all_of_each(&[Privilege::Select])
            .on_db("sales")
            .to_request();
        assert!(checker.has_access(&analyst, &select_only));
    }

    #[test]
    fn denial_symmetry_between_check_and_has() {
        let checker = checker_from(POLICY);
        let analyst = User::new("analyst");
        let requests = [
            PrivilegeRequestBuilder::new().any().on_any_table("sales").to_request(),
            PrivilegeRequestBuilder::new().all_of(Privilege::Drop).on_db("sales").to_request(),
            PrivilegeRequestBuilder::new().all_of(Privilege::Insert).on_table("staging", "events").to_request(),
            PrivilegeRequestBuilder::new().all_of(Privilege::Select).on_server().to_request(),
        ];
        for request in requests {
            assert_eq!(
                checker.has_access(&analyst, &request),
                checker.check_access(&analyst, &request).is_ok(),
            );
        }
    }

    #[test]
    fn disabled_config_grants_everything_without_a_policy_file() {
        let config = AuthorizationConfig::disabled();
        let checker = AuthorizationChecker::from_config(&config).expect("disabled checker");
        assert!(checker.has_access(
            &User::new("anyone"),
            &PrivilegeRequestBuilder::new().all_of(Privilege::Drop).on_server().to_request()
        ));
    }

    #[test]
    fn malformed_policy_is_an_invalid_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp policy");
        file.write_all(b"{ not json").expect("write");
        let config = AuthorizationConfig::enabled(file.path(), "srv");
        let err = AuthorizationChecker::from_config(&config).expect_err("must fail");
        assert_eq!(err.code_str(), "invalid_config");
    }

    #[test]
    fn table_scope_must_be_qualified() {
        let mut file = tempfile::NamedTempFile::new().expect("temp policy");
        file.write_all(
            br#"{ "users": { "u": [{ "privilege": "select", "table": "unqualified" }] } }"#,
        )
        .expect("write");
        let config = AuthorizationConfig::enabled(file.path(), "srv");
        assert!(AuthorizationChecker::from_config(&config).is_err());
    }
}
