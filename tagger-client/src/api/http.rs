//! reqwest implementation of [`TaggerApi`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tagger_common::model::{
    ElapsedTime, Event, EventDraft, EventStats, ExportKind, HeatmapOptions, PitchData,
    PitchOptions, StopwatchAction, StopwatchStatus,
};
use tagger_common::time::unix_millis;
use tagger_common::SessionId;
use tracing::debug;

use super::{TaggerApi, SESSION_HEADER};
use crate::{Error, Result};

const USER_AGENT: &str = concat!("event-tagger/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for the tagging backend
///
/// Requests have no overall timeout: a slow backend holds up the one
/// operation waiting on it and nothing else.
#[derive(Clone)]
pub struct HttpTaggerApi {
    http_client: Client,
    base_url: String,
}

impl HttpTaggerApi {
    /// Create a client for the backend at `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn get(&self, session: &SessionId, path: &str) -> RequestBuilder {
        self.http_client
            .get(self.url(path))
            .header(SESSION_HEADER, session.as_str())
    }

    fn post(&self, session: &SessionId, path: &str) -> RequestBuilder {
        self.http_client
            .post(self.url(path))
            .header(SESSION_HEADER, session.as_str())
    }

    fn delete(&self, session: &SessionId, path: &str) -> RequestBuilder {
        self.http_client
            .delete(self.url(path))
            .header(SESSION_HEADER, session.as_str())
    }

    /// GET with caching disabled, for values that change every tick
    fn get_uncached(&self, session: &SessionId, path: &str) -> RequestBuilder {
        self.get(session, path)
            .header(CACHE_CONTROL, "no-cache")
            .query(&[("t", unix_millis())])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Backend rejected request");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        let body = response.bytes().await.map_err(|e| Error::Network(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Send and discard the body; `204 No Content` and empty bodies are fine
    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl TaggerApi for HttpTaggerApi {
    async fn list_events(&self, session: &SessionId) -> Result<Vec<Event>> {
        self.send_json(self.get(session, "events")).await
    }

    async fn create_event(&self, session: &SessionId, draft: &EventDraft) -> Result<Event> {
        let body = serde_json::to_vec(draft).map_err(tagger_common::Error::from)?;
        let request = self
            .post(session, "events")
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.send_json(request).await
    }

    async fn delete_event(&self, session: &SessionId, id: u64) -> Result<()> {
        self.send_empty(self.delete(session, &format!("events/{}", id)))
            .await
    }

    async fn clear_events(&self, session: &SessionId) -> Result<()> {
        self.send_empty(self.delete(session, "events")).await
    }

    async fn event_stats(&self, session: &SessionId) -> Result<Vec<EventStats>> {
        self.send_json(self.get(session, "events/stats")).await
    }

    async fn stopwatch_command(
        &self,
        session: &SessionId,
        action: StopwatchAction,
    ) -> Result<StopwatchStatus> {
        let path = format!("stopwatch/{}", action.path_segment());
        self.send_json(self.post(session, &path)).await
    }

    async fn stopwatch_status(&self, session: &SessionId) -> Result<StopwatchStatus> {
        self.send_json(self.get_uncached(session, "stopwatch/status"))
            .await
    }

    async fn elapsed_time(&self, session: &SessionId) -> Result<ElapsedTime> {
        self.send_json(self.get_uncached(session, "stopwatch/elapsed"))
            .await
    }

    async fn heatmap(&self, session: &SessionId, options: &HeatmapOptions) -> Result<Value> {
        let request = self
            .post(session, "visualization/heatmap")
            .query(&options.to_query());
        self.send_json(request).await
    }

    async fn pitch_data(&self, session: &SessionId, options: &PitchOptions) -> Result<PitchData> {
        let request = self
            .get(session, "visualization/pitch")
            .query(&options.to_query());
        self.send_json(request).await
    }

    async fn divergent_chart(&self, session: &SessionId) -> Result<Value> {
        self.send_json(self.post(session, "visualization/divergent-chart"))
            .await
    }

    async fn export(
        &self,
        session: &SessionId,
        kind: ExportKind,
        filename: Option<&str>,
    ) -> Result<Vec<u8>> {
        let mut request = self.post(session, &format!("export/{}", kind.path_segment()));
        if let Some(name) = filename {
            request = request.query(&[("filename", name)]);
        }

        let response = self.send(request).await?;
        let bytes = response.bytes().await.map_err(|e| Error::Network(e.to_string()))?;
        debug!(kind = %kind, size = bytes.len(), "Export downloaded");
        Ok(bytes.to_vec())
    }
}
