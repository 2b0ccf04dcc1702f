//! Event collection manager
//!
//! Local mirror of the session's tagged events. Every list change happens
//! strictly after the server acknowledges it, so the visible list never
//! shows an event that failed to persist. Mutations are serialized through
//! one async lock and therefore apply in invocation order.

use std::sync::Arc;

use tagger_common::model::{Event, EventDraft, EventStats};
use tagger_common::SessionId;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::api::TaggerApi;
use crate::Result;

#[derive(Debug, Default)]
struct CollectionState {
    events: Vec<Event>,
    /// Per-team aggregates; dropped whenever the list changes
    stats: Option<Vec<EventStats>>,
    /// Bumped by every list mutation; stats fetched under an older
    /// version are never cached
    version: u64,
    last_error: Option<String>,
}

impl CollectionState {
    fn invalidate_stats(&mut self) {
        self.stats = None;
        self.version = self.version.wrapping_add(1);
    }
}

pub struct EventCollection {
    api: Arc<dyn TaggerApi>,
    session: watch::Receiver<SessionId>,
    state: RwLock<CollectionState>,
    mutations: Mutex<()>,
}

impl EventCollection {
    pub fn new(api: Arc<dyn TaggerApi>, session: watch::Receiver<SessionId>) -> Self {
        Self {
            api,
            session,
            state: RwLock::new(CollectionState::default()),
            mutations: Mutex::new(()),
        }
    }

    fn current_session(&self) -> SessionId {
        self.session.borrow().clone()
    }

    /// Replace the local list with the server's
    ///
    /// On failure the previous list stays and the error is recorded.
    pub async fn fetch_events(&self) -> Result<Vec<Event>> {
        let session = self.current_session();
        match self.api.list_events(&session).await {
            Ok(events) => {
                debug!(session = %session, count = events.len(), "Events fetched");
                let mut state = self.state.write().await;
                state.events = events.clone();
                state.last_error = None;
                Ok(events)
            }
            Err(e) => {
                error!(session = %session, "Failed to fetch events: {}", e);
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Submit a draft and append the stored event
    ///
    /// The draft is validated first; an invalid draft sends nothing.
    pub async fn add_event(&self, draft: &EventDraft) -> Result<Event> {
        draft.validate()?;

        let _guard = self.mutations.lock().await;
        let session = self.current_session();
        match self.api.create_event(&session, draft).await {
            Ok(event) => {
                info!(session = %session, event_id = event.id, event_type = %event.event_type, "Event saved");
                let mut state = self.state.write().await;
                state.events.push(event.clone());
                state.invalidate_stats();
                state.last_error = None;
                Ok(event)
            }
            Err(e) => {
                error!(session = %session, "Failed to save event: {}", e);
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete by id; the local entry goes only after the server confirms
    ///
    /// Whatever the server answers for an unknown id is passed through.
    pub async fn remove_event(&self, id: u64) -> Result<()> {
        let _guard = self.mutations.lock().await;
        let session = self.current_session();
        match self.api.delete_event(&session, id).await {
            Ok(()) => {
                info!(session = %session, event_id = id, "Event deleted");
                let mut state = self.state.write().await;
                state.events.retain(|e| e.id != id);
                state.invalidate_stats();
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                error!(session = %session, event_id = id, "Failed to delete event: {}", e);
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Delete every event of the session; irreversible
    pub async fn clear_all_events(&self) -> Result<()> {
        let session = self.current_session();
        self.clear_for(&session).await
    }

    /// Bulk delete for an explicit session (used while rotating sessions)
    pub(crate) async fn clear_for(&self, session: &SessionId) -> Result<()> {
        let _guard = self.mutations.lock().await;
        match self.api.clear_events(session).await {
            Ok(()) => {
                warn!(session = %session, "All events cleared");
                let mut state = self.state.write().await;
                state.events.clear();
                state.invalidate_stats();
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                error!(session = %session, "Failed to clear events: {}", e);
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Per-team aggregates, cached until the list changes
    ///
    /// A response that raced a mutation is returned but not cached. A failure is logged and returned but does not replace `last_error`.
    pub async fn fetch_stats(&self) -> Result<Vec<EventStats>> {
        let version = {
            let state = self.state.read().await;
            if let Some(stats) = &state.stats {
                return Ok(stats.clone());
            }
            state.version
        };

        let session = self.current_session();
        match self.api.event_stats(&session).await {
            Ok(stats) => {
                let mut state = self.state.write().await;
                if state.version == version {
                    state.stats = Some(stats.clone());
                } else {
                    debug!(session = %session, "Event list changed during stats request, not caching");
                }
                Ok(stats)
            }
            Err(e) => {
                warn!(session = %session, "Failed to fetch event stats: {}", e);
                Err(e)
            }
        }
    }

    pub async fn events(&self) -> Vec<Event> {
        self.state.read().await.events.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.events.is_empty()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Forget everything held locally (session reset)
    pub async fn discard(&self) {
        let mut state = self.state.write().await;
        let version = state.version.wrapping_add(1);
        *state = CollectionState {
            version,
            ..CollectionState::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use crate::Error;
    use tagger_common::form::EventForm;
    use tagger_common::model::Team;

    fn collection(api: &Arc<MockApi>) -> EventCollection {
        let (_tx, rx) = watch::channel(SessionId::new("session_test"));
        let api: Arc<dyn TaggerApi> = api.clone();
        EventCollection::new(api, rx)
    }

    fn draft(event_type: &str, elapsed: f64) -> EventDraft {
        EventForm::quick_draft(Team::Home, event_type, elapsed).unwrap()
    }

    #[tokio::test]
    async fn test_add_appends_server_event() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);

        let first = events.add_event(&draft("Corner", 12.0)).await.unwrap();
        let second = events.add_event(&draft("Foul", 30.0)).await.unwrap();

        let list = events.events().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[1].id, second.id);
        assert_ne!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_list_unchanged() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);
        events.add_event(&draft("Corner", 1.0)).await.unwrap();

        api.fail("create_event");
        let err = events.add_event(&draft("Foul", 2.0)).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(events.len().await, 1);
        assert!(events.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_draft_sends_nothing() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);

        let mut bad = draft("Corner", 1.0);
        bad.event_type = "  ".to_string();
        let err = events.add_event(&bad).await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(api.calls("create_event"), 0);
    }

    #[tokio::test]
    async fn test_remove_drops_matching_id() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);
        let a = events.add_event(&draft("Corner", 1.0)).await.unwrap();
        let b = events.add_event(&draft("Foul", 2.0)).await.unwrap();

        events.remove_event(a.id).await.unwrap();

        let list = events.events().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, b.id);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_propagates_and_keeps_list() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);
        events.add_event(&draft("Corner", 1.0)).await.unwrap();

        let err = events.remove_event(999).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
        assert_eq!(events.len().await, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_list() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);
        events.add_event(&draft("Corner", 1.0)).await.unwrap();
        events.fetch_events().await.unwrap();

        api.fail("list_events");
        assert!(events.fetch_events().await.is_err());
        assert_eq!(events.len().await, 1);
        assert!(events.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_stats_cached_until_list_changes() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);

        events.fetch_stats().await.unwrap();
        events.fetch_stats().await.unwrap();
        assert_eq!(api.calls("event_stats"), 1);

        events.add_event(&draft("Transition", 5.0)).await.unwrap();
        let stats = events.fetch_stats().await.unwrap();
        assert_eq!(api.calls("event_stats"), 2);
        assert_eq!(stats[0].transitions, 1);
    }

    #[tokio::test]
    async fn test_stats_racing_a_mutation_are_not_cached() {
        let api = Arc::new(MockApi::new());
        let events = Arc::new(collection(&api));
        let gate = api.hold("event_stats");

        let pending = {
            let events = Arc::clone(&events);
            tokio::spawn(async move { events.fetch_stats().await })
        };
        while api.calls("event_stats") == 0 {
            tokio::task::yield_now().await;
        }

        events.add_event(&draft("Transition", 5.0)).await.unwrap();
        gate.notify_one();
        let raced = pending.await.unwrap().unwrap();
        assert_eq!(raced[0].transitions, 0);

        // The pre-add answer was not kept; the next call asks again
        let stats = events.fetch_stats().await.unwrap();
        assert_eq!(api.calls("event_stats"), 2);
        assert_eq!(stats[0].transitions, 1);
    }

    #[tokio::test]
    async fn test_stats_failure_does_not_overwrite_error() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);

        api.fail("event_stats");
        assert!(events.fetch_stats().await.is_err());
        assert_eq!(events.last_error().await, None);
    }

    #[tokio::test]
    async fn test_clear_all_events() {
        let api = Arc::new(MockApi::new());
        let events = collection(&api);
        events.add_event(&draft("Corner", 1.0)).await.unwrap();
        events.add_event(&draft("Foul", 2.0)).await.unwrap();

        events.clear_all_events().await.unwrap();

        assert!(events.is_empty().await);
        assert!(api.server_events().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_adds_apply_in_order() {
        let api = Arc::new(MockApi::new());
        let events = Arc::new(collection(&api));

        let handles: Vec<_> = (0..5)
            .map(|i| {
                let events = Arc::clone(&events);
                tokio::spawn(async move {
                    events.add_event(&draft("Corner", i as f64)).await.unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let ids: Vec<u64> = events.events().await.iter().map(|e| e.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 5);
    }
}
