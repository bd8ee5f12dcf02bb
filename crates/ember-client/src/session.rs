//! Local credential storage and the forced-logout rule.
//!
//! The auth collaborator hands the UI a bearer token; this module only
//! decides what happens to it when a send fails. A stale identity clears
//! the token, everything else leaves the session alone.

use crate::api::SendError;
use parking_lot::Mutex;

/// Where the bearer token lives between page loads. The website keeps it in
/// browser storage; tests and the desktop shell keep it in memory.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set(&self, token: String);
    fn clear(&self);
}

#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.inner.lock().clone()
    }

    fn set(&self, token: String) {
        *self.inner.lock() = Some(token);
    }

    fn clear(&self) {
        *self.inner.lock() = None;
    }
}

/// What the UI does after a failed send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendFailure {
    /// Credentials were cleared; route to the login view.
    ForceLogout,
    /// Transient: surface an alert, keep the session.
    ShowError,
}

/// Apply the error taxonomy: stale identity is fatal to the local session
/// and must never be folded into generic error handling.
pub fn handle_send_failure(store: &dyn TokenStore, err: &SendError) -> SendFailure {
    match err {
        SendError::StaleIdentity => {
            store.clear();
            SendFailure::ForceLogout
        }
        SendError::Rejected(_) | SendError::Network(_) => SendFailure::ShowError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_identity_clears_credentials() {
        let store = MemoryTokenStore::new();
        store.set("tok-123".into());

        let outcome = handle_send_failure(&store, &SendError::StaleIdentity);
        assert_eq!(outcome, SendFailure::ForceLogout);
        assert!(store.token().is_none());
    }

    #[test]
    fn generic_rejection_keeps_credentials() {
        let store = MemoryTokenStore::new();
        store.set("tok-123".into());

        let outcome =
            handle_send_failure(&store, &SendError::Rejected("server exploded".into()));
        assert_eq!(outcome, SendFailure::ShowError);
        assert_eq!(store.token().as_deref(), Some("tok-123"));
    }
}
