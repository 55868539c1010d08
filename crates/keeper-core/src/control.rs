//! Running-job registry: single-flight per job name plus cancellation.
//!
//! Every run registers its job name with a cancellation token. A second run
//! of the same name is refused while the first is registered, and
//! [`RunRegistry::cancel`] trips the token of an active run.
//!
//! Lock rule: the inner mutex is only held for map lookups and inserts. It is
//! never held across an `.await` or while a backend is running.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Shared registry of job name -> cancellation token.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: Mutex<HashMap<String, CancellationToken>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `name` with a child of `parent`. Returns `None` if a run of
    /// that name is already registered; the registry is left untouched.
    pub fn try_register(self: &Arc<Self>, name: &str, parent: &CancellationToken) -> Option<RunGuard> {
        let mut runs = self.lock();
        if runs.contains_key(name) {
            return None;
        }
        let token = parent.child_token();
        runs.insert(name.to_string(), token.clone());
        Some(RunGuard {
            registry: Arc::clone(self),
            name: name.to_string(),
            token,
        })
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Request cancellation of a running job. No-op if it is not running.
    pub fn cancel(&self, name: &str) -> bool {
        match self.lock().get(name) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Names of currently running jobs, sorted.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn release(&self, name: &str) {
        self.lock().remove(name);
    }
}

/// Deregisters the job when dropped, on every return path.
#[derive(Debug)]
pub struct RunGuard {
    registry: Arc<RunRegistry>,
    name: String,
    token: CancellationToken,
}

impl RunGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.registry.release(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_registration_is_refused() {
        let reg = Arc::new(RunRegistry::new());
        let root = CancellationToken::new();
        let guard = reg.try_register("docs", &root).expect("first registration");
        assert!(reg.try_register("docs", &root).is_none());
        assert!(reg.is_running("docs"));
        assert_eq!(reg.running(), vec!["docs".to_string()]);
        drop(guard);
        assert!(!reg.is_running("docs"));
        assert!(reg.try_register("docs", &root).is_some());
    }

    #[test]
    fn cancel_trips_only_the_named_run() {
        let reg = Arc::new(RunRegistry::new());
        let root = CancellationToken::new();
        let a = reg.try_register("a", &root).unwrap();
        let b = reg.try_register("b", &root).unwrap();
        assert!(reg.cancel("a"));
        assert!(a.token().is_cancelled());
        assert!(!b.token().is_cancelled());
        assert!(!reg.cancel("missing"));
    }

    #[test]
    fn parent_cancellation_reaches_children() {
        let reg = Arc::new(RunRegistry::new());
        let root = CancellationToken::new();
        let guard = reg.try_register("a", &root).unwrap();
        root.cancel();
        assert!(guard.token().is_cancelled());
    }
}
