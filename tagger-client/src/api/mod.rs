//! Backend API surface
//!
//! [`TaggerApi`] is the seam between client state and the network: the
//! stopwatch and event managers only ever talk to this trait, so tests can
//! swap in an in-memory backend. Every call carries the session id
//! explicitly; the caller decides which session it is acting for.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde_json::Value;
use tagger_common::model::{
    ElapsedTime, Event, EventDraft, EventStats, ExportKind, HeatmapOptions, PitchData,
    PitchOptions, StopwatchAction, StopwatchStatus,
};
use tagger_common::SessionId;

use crate::Result;

pub use http::HttpTaggerApi;

/// Header carrying the session id on every request
pub const SESSION_HEADER: &str = "X-Session-ID";

#[async_trait]
pub trait TaggerApi: Send + Sync {
    /// `GET events`
    async fn list_events(&self, session: &SessionId) -> Result<Vec<Event>>;

    /// `POST events`; the returned event carries the server-assigned id
    async fn create_event(&self, session: &SessionId, draft: &EventDraft) -> Result<Event>;

    /// `DELETE events/{id}`
    async fn delete_event(&self, session: &SessionId, id: u64) -> Result<()>;

    /// `DELETE events`
    async fn clear_events(&self, session: &SessionId) -> Result<()>;

    /// `GET events/stats`
    async fn event_stats(&self, session: &SessionId) -> Result<Vec<EventStats>>;

    /// `POST stopwatch/{start|stop|reset}`
    async fn stopwatch_command(
        &self,
        session: &SessionId,
        action: StopwatchAction,
    ) -> Result<StopwatchStatus>;

    /// `GET stopwatch/status` (uncached)
    async fn stopwatch_status(&self, session: &SessionId) -> Result<StopwatchStatus>;

    /// `GET stopwatch/elapsed` (uncached)
    async fn elapsed_time(&self, session: &SessionId) -> Result<ElapsedTime>;

    /// `POST visualization/heatmap`; the figure payload is passed through
    async fn heatmap(&self, session: &SessionId, options: &HeatmapOptions) -> Result<Value>;

    /// `GET visualization/pitch`
    async fn pitch_data(&self, session: &SessionId, options: &PitchOptions) -> Result<PitchData>;

    /// `POST visualization/divergent-chart`: home vs away comparison figure
    async fn divergent_chart(&self, session: &SessionId) -> Result<Value>;

    /// `POST export/{csv|xml|zip}`; returns the raw file bytes
    async fn export(
        &self,
        session: &SessionId,
        kind: ExportKind,
        filename: Option<&str>,
    ) -> Result<Vec<u8>>;
}
