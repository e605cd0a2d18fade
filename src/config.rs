use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the authorization policy lives and whether it is enforced at all.
/// With `enabled` false every privilege check passes and the policy file is
/// never read.
#[derive(Debug, Clone)]
pub struct AuthorizationConfig {
    pub enabled: bool,
    pub policy_file: PathBuf,
    /// Name this server is known by in policy scopes and denial messages.
    pub server_name: String,
}

impl AuthorizationConfig {
    pub fn enabled(policy_file: impl AsRef<Path>, server_name: impl Into<String>) -> Self {
        AuthorizationConfig {
            enabled: true,
            policy_file: policy_file.as_ref().to_path_buf(),
            server_name: server_name.into(),
        }
    }

    pub fn disabled() -> Self {
        AuthorizationConfig {
            enabled: false,
            policy_file: PathBuf::new(),
            server_name: "server".to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Runtime configuration for a [`Frontend`](crate::Frontend) instance.
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub authorization: AuthorizationConfig,
    /// Base period of the policy reloader.
    pub policy_reload_interval: Duration,
    /// Upper bound of the uniform start jitter that decorrelates nodes.
    pub policy_reload_jitter: Duration,
    /// Directory of `*.properties` files rendered by the host-config
    /// endpoints. `None` falls back to the `HADOOP_CONF_DIR` environment
    /// variable; an unset variable yields an empty configuration.
    pub hadoop_conf_dir: Option<PathBuf>,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        FrontendConfig {
            authorization: AuthorizationConfig::disabled(),
            policy_reload_interval: Duration::from_secs(5 * 60),
            policy_reload_jitter: Duration::from_secs(60),
            hadoop_conf_dir: None,
        }
    }
}

impl FrontendConfig {
    /// Environment-driven construction: `NYALADB_POLICY_FILE` and
    /// `NYALADB_SERVER_NAME` enable authorization, `HADOOP_CONF_DIR` points
    /// at the host configuration. Core semantics do not depend on any of
    /// these.
    pub fn from_env() -> Self {
        let mut config = FrontendConfig::default();
        if let Ok(policy_file) = std::env::var("NYALADB_POLICY_FILE") {
            let server_name = std::env::var("NYALADB_SERVER_NAME")
                .unwrap_or_else(|_| "server".to_string());
            config.authorization = AuthorizationConfig::enabled(policy_file, server_name);
        }
        if let Ok(dir) = std::env::var("HADOOP_CONF_DIR") {
            config.hadoop_conf_dir = Some(PathBuf::from(dir));
        }
        config
    }

    pub fn with_authorization(mut self, authorization: AuthorizationConfig) -> Self {
        self.authorization = authorization;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reload_cadence() {
        let config = FrontendConfig::default();
        assert_eq!(config.policy_reload_interval, Duration::from_secs(300));
        assert_eq!(config.policy_reload_jitter, Duration::from_secs(60));
        assert!(!config.authorization.is_enabled());
    }
}
