//! In-memory backend for unit tests
//!
//! Behaves like a single-session backend and records every call so tests
//! can assert which requests were (or were not) sent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tagger_common::model::{
    ElapsedTime, Event, EventDraft, EventStats, ExportKind, HeatmapOptions, PitchData,
    PitchOptions, StopwatchAction, StopwatchStatus,
};
use tagger_common::SessionId;
use tokio::sync::Notify;

use super::TaggerApi;
use crate::{Error, Result};

#[derive(Default)]
struct MockState {
    calls: Vec<(String, SessionId)>,
    failing: HashSet<&'static str>,
    held: HashMap<&'static str, Arc<Notify>>,
    events: Vec<Event>,
    next_id: u64,
    running: bool,
    elapsed: f64,
    hot_zone: Vec<(String, f64)>,
}

#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `op` fail with a 500
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    /// Hold the next response of `op` until the returned gate is notified
    ///
    /// The response is computed when the request arrives, like a slow
    /// server whose answer is already in flight.
    pub fn hold(&self, op: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().held.insert(op, Arc::clone(&gate));
        gate
    }

    async fn release_held(&self, op: &'static str) {
        let gate = self.state.lock().unwrap().held.remove(op);
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    pub fn set_elapsed(&self, elapsed: f64) {
        self.state.lock().unwrap().elapsed = elapsed;
    }

    pub fn set_running(&self, running: bool) {
        self.state.lock().unwrap().running = running;
    }

    pub fn set_hot_zone(&self, zone: &str, count: f64) {
        self.state
            .lock()
            .unwrap()
            .hot_zone
            .push((zone.to_string(), count));
    }

    pub fn server_events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Number of recorded calls of `op`
    pub fn calls(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(name, _)| name == op)
            .count()
    }

    /// Session id sent with the most recent call of `op`
    pub fn last_session(&self, op: &str) -> Option<SessionId> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|(name, _)| name == op)
            .map(|(_, session)| session.clone())
    }

    fn record(&self, op: &'static str, session: &SessionId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((op.to_string(), session.clone()));
        if state.failing.contains(op) {
            return Err(Error::Api {
                status: 500,
                message: format!("{} failed", op),
            });
        }
        Ok(())
    }

    fn status(state: &MockState) -> StopwatchStatus {
        StopwatchStatus {
            running: state.running,
            elapsed_time: state.elapsed,
            start_time: None,
        }
    }
}

#[async_trait]
impl TaggerApi for MockApi {
    async fn list_events(&self, session: &SessionId) -> Result<Vec<Event>> {
        self.record("list_events", session)?;
        Ok(self.server_events())
    }

    async fn create_event(&self, session: &SessionId, draft: &EventDraft) -> Result<Event> {
        self.record("create_event", session)?;
        let mut state = self.state.lock().unwrap();
        let event = Event {
            id: state.next_id,
            minute: draft.minute,
            second: draft.second,
            time_in_second: draft.time_in_second,
            team: draft.team,
            event_type: draft.event_type.clone(),
            cross_outcome: draft.cross_outcome,
            shot_outcome: draft.shot_outcome,
            zone: draft.zone,
            created_at: None,
        };
        state.next_id += 1;
        state.events.push(event.clone());
        Ok(event)
    }

    async fn delete_event(&self, session: &SessionId, id: u64) -> Result<()> {
        self.record("delete_event", session)?;
        let mut state = self.state.lock().unwrap();
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(Error::Api {
                status: 404,
                message: "Event not found".to_string(),
            });
        }
        Ok(())
    }

    async fn clear_events(&self, session: &SessionId) -> Result<()> {
        self.record("clear_events", session)?;
        self.state.lock().unwrap().events.clear();
        Ok(())
    }

    async fn event_stats(&self, session: &SessionId) -> Result<Vec<EventStats>> {
        self.record("event_stats", session)?;
        let stats: Vec<EventStats> = {
            let state = self.state.lock().unwrap();
            let count = |team: &str| {
                state
                    .events
                    .iter()
                    .filter(|e| e.team.as_str() == team && e.event_type == "Transition")
                    .count() as u32
            };
            ["Home", "Away"]
                .iter()
                .map(|team| EventStats {
                    team: team.to_string(),
                    goals: 0,
                    shots: 0,
                    shots_on_target: 0,
                    cross_attempts: 0,
                    cross_completed: 0,
                    transitions: count(team),
                })
                .collect()
        };
        self.release_held("event_stats").await;
        Ok(stats)
    }

    async fn stopwatch_command(
        &self,
        session: &SessionId,
        action: StopwatchAction,
    ) -> Result<StopwatchStatus> {
        let op = match action {
            StopwatchAction::Start => "start",
            StopwatchAction::Stop => "stop",
            StopwatchAction::Reset => "reset",
        };
        self.record(op, session)?;
        let mut state = self.state.lock().unwrap();
        match action {
            StopwatchAction::Start => state.running = true,
            StopwatchAction::Stop => state.running = false,
            StopwatchAction::Reset => {
                state.running = false;
                state.elapsed = 0.0;
            }
        }
        Ok(Self::status(&state))
    }

    async fn stopwatch_status(&self, session: &SessionId) -> Result<StopwatchStatus> {
        self.record("status", session)?;
        Ok(Self::status(&self.state.lock().unwrap()))
    }

    async fn elapsed_time(&self, session: &SessionId) -> Result<ElapsedTime> {
        self.record("elapsed", session)?;
        Ok(ElapsedTime {
            elapsed_time: self.state.lock().unwrap().elapsed,
        })
    }

    async fn heatmap(&self, session: &SessionId, options: &HeatmapOptions) -> Result<Value> {
        self.record("heatmap", session)?;
        Ok(json!({ "data": [], "event_type": options.event_type }))
    }

    async fn pitch_data(&self, session: &SessionId, options: &PitchOptions) -> Result<PitchData> {
        self.record("pitch_data", session)?;
        let state = self.state.lock().unwrap();
        Ok(PitchData {
            figure: json!({ "data": [] }),
            zone_dict: Default::default(),
            hot_zone: state.hot_zone.iter().cloned().collect(),
            rows: options.rows,
            columns: options.columns,
            field_dimen: vec![options.field_length, options.field_width],
        })
    }

    async fn divergent_chart(&self, session: &SessionId) -> Result<Value> {
        self.record("divergent_chart", session)?;
        Ok(json!({ "data": [] }))
    }

    async fn export(
        &self,
        session: &SessionId,
        kind: ExportKind,
        _filename: Option<&str>,
    ) -> Result<Vec<u8>> {
        self.record("export", session)?;
        Ok(format!("{} payload", kind).into_bytes())
    }
}
