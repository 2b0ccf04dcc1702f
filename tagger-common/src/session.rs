//! Session identity
//!
//! A session id partitions all server-side state (events, stopwatch) per
//! client profile. It is created once, persisted in local storage, and
//! returned unchanged on every later lookup until the user resets it.
//!
//! Dependents that scope state to the session hold a `watch::Receiver`
//! from [`SessionProvider::subscribe`] and always read the current id from
//! it, so a reset is observed without re-wiring anything.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::model::SessionId;
use crate::storage::LocalStore;
use crate::time::unix_millis;

/// Local storage key holding the session id
pub const SESSION_KEY: &str = "sessionId";

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_RANDOM_LEN: usize = 9;

/// Generate a fresh identifier from the current time and random entropy
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_RANDOM_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    SessionId::new(format!("session_{}_{}", unix_millis(), suffix))
}

/// Produces and persists the client's session identifier
pub struct SessionProvider {
    store: Arc<dyn LocalStore>,
    current: watch::Sender<SessionId>,
}

impl SessionProvider {
    /// Load the persisted id, creating and persisting one if absent
    ///
    /// If storage cannot be read or written the provider falls back to the
    /// ephemeral `default` id for its lifetime.
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let id = match store.get(SESSION_KEY) {
            Ok(Some(existing)) if !existing.trim().is_empty() => SessionId::new(existing),
            Ok(_) => {
                let fresh = generate_session_id();
                match store.set(SESSION_KEY, fresh.as_str()) {
                    Ok(()) => {
                        info!(session = %fresh, "Created new session");
                        fresh
                    }
                    Err(e) => {
                        warn!("Session storage unavailable, using ephemeral session: {}", e);
                        SessionId::ephemeral()
                    }
                }
            }
            Err(e) => {
                warn!("Session storage unavailable, using ephemeral session: {}", e);
                SessionId::ephemeral()
            }
        };

        let (current, _) = watch::channel(id);
        Self { store, current }
    }

    /// Current session id; stable until [`reset_session`](Self::reset_session)
    pub fn get_session_id(&self) -> SessionId {
        self.current.borrow().clone()
    }

    /// Receiver that always yields the current session id
    pub fn subscribe(&self) -> watch::Receiver<SessionId> {
        self.current.subscribe()
    }

    /// Generate and persist a new id, then notify subscribers
    ///
    /// Server-side and local state tied to the previous id is the caller's
    /// to discard; subscribers see the change through their receivers.
    pub fn reset_session(&self) -> SessionId {
        let fresh = generate_session_id();
        if let Err(e) = self.store.set(SESSION_KEY, fresh.as_str()) {
            warn!("Failed to persist new session id (kept in memory only): {}", e);
        }

        let previous = self.current.send_replace(fresh.clone());
        info!(previous = %previous, session = %fresh, "Session reset");
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::{Error, Result};

    /// Store whose every operation fails
    struct BrokenStore;

    impl LocalStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("unavailable".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("unavailable".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("unavailable".to_string()))
        }
    }

    #[test]
    fn test_generated_ids_are_unique_and_prefixed() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("session_"));
    }

    #[test]
    fn test_session_id_is_stable_within_store() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());

        let first = SessionProvider::load(Arc::clone(&store)).get_session_id();
        let second = SessionProvider::load(Arc::clone(&store)).get_session_id();

        assert_eq!(first, second);
        assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_existing_id_is_reused() {
        let store = Arc::new(MemoryStore::new());
        store.set(SESSION_KEY, "session_42_abc").unwrap();

        let provider = SessionProvider::load(store);
        assert_eq!(provider.get_session_id().as_str(), "session_42_abc");
    }

    #[test]
    fn test_reset_persists_and_notifies() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryStore::new());
        let provider = SessionProvider::load(Arc::clone(&store));
        let mut rx = provider.subscribe();
        let old = provider.get_session_id();

        let new = provider.reset_session();

        assert_ne!(old, new);
        assert_eq!(provider.get_session_id(), new);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), new);
        assert_eq!(store.get(SESSION_KEY).unwrap().as_deref(), Some(new.as_str()));
    }

    #[test]
    fn test_unavailable_storage_falls_back_to_ephemeral() {
        let provider = SessionProvider::load(Arc::new(BrokenStore));
        assert_eq!(provider.get_session_id(), SessionId::ephemeral());

        // Reset still rotates the in-memory id
        let new = provider.reset_session();
        assert_ne!(new, SessionId::ephemeral());
    }
}
