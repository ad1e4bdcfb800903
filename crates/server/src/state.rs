use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::sync::RepoSyncer;

/// Advisory flag guarding the webhook-triggered sync path. Only
/// `try_begin`/`end` are exposed so the discipline (set for the duration of
/// one sync, cleared unconditionally afterward) cannot be bypassed.
#[derive(Default)]
pub struct UpdateGuard {
    updating: AtomicBool,
}

impl UpdateGuard {
    /// Claim the sync path. Returns false if a sync is already running.
    pub fn try_begin(&self) -> bool {
        self.updating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the sync path. Safe to call even after a failed sync;
    /// skipping this would lock updates out permanently.
    pub fn end(&self) {
        self.updating.store(false, Ordering::SeqCst);
    }
}

pub struct AppState {
    /// Shared webhook secret.
    pub secret: String,
    pub guard: UpdateGuard,
    pub sync: Arc<dyn RepoSyncer>,
}

impl AppState {
    pub fn new(secret: String, sync: Arc<dyn RepoSyncer>) -> Self {
        Self {
            secret,
            guard: UpdateGuard::default(),
            sync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_until_ended() {
        let guard = UpdateGuard::default();
        assert!(guard.try_begin());
        assert!(!guard.try_begin());
        guard.end();
        assert!(guard.try_begin());
    }
}
