//! Periodic reconstruction of the authorization checker from the policy
//! file.
//!
//! The reloader never touches readers: it builds the new checker outside the
//! auth lock and takes the writer half only for the swap. A failed reload
//! keeps the previous checker installed and retries on the next tick. Start
//! times are staggered by a uniform random jitter so a fleet of nodes does
//! not hit the policy store in lockstep.

use crate::authz::AuthorizationChecker;
use crate::config::{AuthorizationConfig, FrontendConfig};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) type CheckerSlot = Arc<RwLock<Arc<AuthorizationChecker>>>;

/// Spawns the reload loop on the provided runtime. The task runs until the
/// returned handle is aborted (the facade does this on shutdown).
pub(crate) fn spawn(rt: &Handle, config: &FrontendConfig, slot: CheckerSlot) -> JoinHandle<()> {
    let authorization = config.authorization.clone();
    let interval = config.policy_reload_interval;
    let jitter = random_jitter(config.policy_reload_jitter);
    rt.spawn(async move {
        tokio::time::sleep(interval + jitter).await;
        loop {
            reload_once(&authorization, &slot);
            tokio::time::sleep(interval).await;
        }
    })
}

fn random_jitter(bound: Duration) -> Duration {
    if bound.is_zero() {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..bound.as_millis() as u64))
}

fn reload_once(config: &AuthorizationConfig, slot: &CheckerSlot) {
    info!(policy_file = %config.policy_file.display(), "reloading authorization policy file");
    match AuthorizationChecker::from_config(config) {
        Ok(next) => {
            *slot.write() = Arc::new(next);
        }
        Err(error) => {
            warn!(
                policy_file = %config.policy_file.display(),
                error = %error,
                "authorization policy reload failed; previous policy stays installed"
            );
        }
    }
}
