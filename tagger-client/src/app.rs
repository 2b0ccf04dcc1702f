//! Application state
//!
//! [`TaggerApp`] is the single owner of everything a tagging session needs:
//! session identity, the mirrored stopwatch, the event list, tag
//! configuration, the form and zone selection. Front ends drive it through
//! the narrow actions below instead of reaching into the parts.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tagger_common::form::EventForm;
use tagger_common::model::{Event, ExportKind, HeatmapOptions, PitchData, PitchOptions, Team};
use tagger_common::session::SessionProvider;
use tagger_common::storage::LocalStore;
use tagger_common::tags::TagStore;
use tagger_common::zone::{Grid, Point, Surface, ZoneSelection};
use tagger_common::SessionId;
use tracing::{info, warn};

use crate::api::TaggerApi;
use crate::events::EventCollection;
use crate::export::ExportTrigger;
use crate::stopwatch::StopwatchSync;
use crate::{Error, Result};

/// Settings the application state needs from configuration
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub download_dir: PathBuf,
    pub pitch: PitchOptions,
}

pub struct TaggerApp {
    api: Arc<dyn TaggerApi>,
    session: SessionProvider,
    stopwatch: StopwatchSync,
    events: EventCollection,
    exports: ExportTrigger,
    tags: TagStore,
    form: EventForm,
    zone: ZoneSelection,
    grid: Grid,
    pitch: PitchOptions,
    hot_zones: BTreeMap<String, f64>,
}

impl TaggerApp {
    pub fn new(
        api: Arc<dyn TaggerApi>,
        store: Arc<dyn LocalStore>,
        settings: AppSettings,
    ) -> Result<Self> {
        let grid = Grid::new(settings.pitch.rows, settings.pitch.columns)?;
        let session = SessionProvider::load(Arc::clone(&store));
        let tags = TagStore::load(store);

        let mut form = EventForm::new();
        form.sync_with_tags(tags.tags());

        Ok(Self {
            stopwatch: StopwatchSync::new(Arc::clone(&api), session.subscribe()),
            events: EventCollection::new(Arc::clone(&api), session.subscribe()),
            exports: ExportTrigger::new(Arc::clone(&api), session.subscribe(), settings.download_dir),
            api,
            session,
            tags,
            form,
            zone: ZoneSelection::new(),
            grid,
            pitch: settings.pitch,
            hot_zones: BTreeMap::new(),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session.get_session_id()
    }

    pub fn stopwatch(&self) -> &StopwatchSync {
        &self.stopwatch
    }

    pub fn events(&self) -> &EventCollection {
        &self.events
    }

    pub fn tags(&self) -> &[String] {
        self.tags.tags()
    }

    pub fn tag_suggestions(&self) -> Vec<&'static str> {
        self.tags.suggestions()
    }

    pub fn form(&self) -> &EventForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EventForm {
        &mut self.form
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn pitch(&self) -> PitchOptions {
        self.pitch
    }

    pub fn selected_zone(&self) -> Option<u32> {
        self.zone.selected()
    }

    /// Hot-zone counts from the last pitch refresh
    pub fn hot_zones(&self) -> &BTreeMap<String, f64> {
        &self.hot_zones
    }

    /// Initial sync: clock status and the session's events
    ///
    /// Both are attempted; the first failure is returned.
    pub async fn mount(&self) -> Result<()> {
        let clock = self.stopwatch.mount().await;
        let list = self.events.fetch_events().await;
        clock?;
        list?;
        Ok(())
    }

    /// Add a tag and keep the form's event type valid
    pub fn add_tag(&mut self, input: &str) -> Result<Option<String>> {
        let added = self.tags.add_tag(input)?;
        self.form.sync_with_tags(self.tags.tags());
        Ok(added)
    }

    pub fn remove_tag(&mut self, name: &str) -> Result<bool> {
        let removed = self.tags.remove_tag(name)?;
        self.form.sync_with_tags(self.tags.tags());
        Ok(removed)
    }

    pub fn set_tags(&mut self, tags: Vec<String>) -> Result<()> {
        self.tags.set_tags(tags)?;
        self.form.sync_with_tags(self.tags.tags());
        Ok(())
    }

    /// Click on the pitch surface; each click overwrites the selection
    pub fn click_zone(&mut self, surface: Surface, point: Point) -> Option<u32> {
        self.zone.click(surface, point, self.grid)
    }

    /// Select a zone by index (out-of-range clears the selection)
    pub fn select_zone(&mut self, zone: u32) -> Option<u32> {
        self.zone.select(zone, self.grid)
    }

    /// Tag an event from the form at the current clock time
    ///
    /// Refused while the clock is stopped. On success the zone selection is
    /// cleared and hot zones are refreshed (refresh failures are only
    /// logged).
    pub async fn tag_event(&mut self) -> Result<Event> {
        let elapsed = self.running_elapsed().await?;
        let draft = self.form.build_draft(elapsed, self.zone.selected())?;
        let event = self.events.add_event(&draft).await?;

        self.zone.clear();
        if let Err(e) = self.refresh_pitch().await {
            warn!("Hot zone refresh failed: {}", e);
        }
        Ok(event)
    }

    /// One-touch tag with only team and type
    pub async fn quick_tag(&mut self, team: Team, event_type: &str) -> Result<Event> {
        let elapsed = self.running_elapsed().await?;
        let draft = EventForm::quick_draft(team, event_type, elapsed)?;
        self.events.add_event(&draft).await
    }

    async fn running_elapsed(&self) -> Result<f64> {
        let clock = self.stopwatch.snapshot().await;
        if !clock.running {
            return Err(Error::InvalidState(
                "Start the stopwatch before tagging events".to_string(),
            ));
        }
        Ok(clock.elapsed_time)
    }

    pub async fn delete_event(&mut self, id: u64) -> Result<()> {
        self.events.remove_event(id).await?;
        if let Err(e) = self.refresh_pitch().await {
            warn!("Hot zone refresh failed: {}", e);
        }
        Ok(())
    }

    pub async fn export(&self, kind: ExportKind, filename: Option<&str>) -> Result<PathBuf> {
        self.exports.export_artifact(kind, filename).await
    }

    /// Fetch pitch data and keep its hot-zone counts
    pub async fn refresh_pitch(&mut self) -> Result<PitchData> {
        let data = self.api.pitch_data(&self.session_id(), &self.pitch).await?;
        self.hot_zones = data.hot_zone.clone();
        Ok(data)
    }

    /// Heatmap figure, optionally filtered to one event type
    pub async fn heatmap(&self, event_type: Option<String>) -> Result<Value> {
        let options = HeatmapOptions {
            pitch: self.pitch,
            event_type,
        };
        self.api.heatmap(&self.session_id(), &options).await
    }

    /// Home vs away comparison figure
    pub async fn divergent_chart(&self) -> Result<Value> {
        self.api.divergent_chart(&self.session_id()).await
    }

    /// Wipe the current session and start a fresh one
    ///
    /// Server events and the clock of the old session are cleared first; if
    /// that fails nothing is rotated. Local state is then dropped.
    pub async fn reset_everything(&mut self) -> Result<SessionId> {
        let old = self.session_id();
        self.events.clear_for(&old).await?;
        self.stopwatch.reset().await?;

        let fresh = self.session.reset_session();
        self.stopwatch.discard().await;
        self.events.discard().await;
        self.zone.clear();
        self.hot_zones.clear();

        info!(previous = %old, session = %fresh, "Everything reset");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockApi;
    use tagger_common::model::CrossOutcome;
    use tagger_common::storage::MemoryStore;
    use tempfile::TempDir;

    struct Fixture {
        api: Arc<MockApi>,
        app: TaggerApp,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(MockApi::new());
        let dir = TempDir::new().unwrap();
        let settings = AppSettings {
            download_dir: dir.path().to_path_buf(),
            pitch: PitchOptions::default(),
        };
        let dyn_api: Arc<dyn TaggerApi> = api.clone();
        let app = TaggerApp::new(dyn_api, Arc::new(MemoryStore::new()), settings).unwrap();
        Fixture { api, app, _dir: dir }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tagging_requires_running_clock() {
        let mut f = fixture();
        let err = f.app.tag_event().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(f.api.calls("create_event"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_event_uses_form_clock_and_zone() {
        let mut f = fixture();
        f.app.stopwatch().start().await.unwrap();
        f.api.set_elapsed(75.6);
        f.app.stopwatch().poll_once().await.unwrap();

        f.app.form_mut().set_team(Team::Away);
        f.app.form_mut().set_event_type("Corner");
        f.app.form_mut().set_cross_outcome(CrossOutcome::Completed);
        f.app.select_zone(4);

        let event = f.app.tag_event().await.unwrap();
        assert_eq!(event.minute, 1);
        assert_eq!(event.second, 15);
        assert_eq!(event.team, Team::Away);
        assert_eq!(event.zone, Some(4));
        assert_eq!(event.cross_outcome, Some(CrossOutcome::Completed));

        // Selection cleared and hot zones refreshed after save
        assert_eq!(f.app.selected_zone(), None);
        assert_eq!(f.api.calls("pitch_data"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_hot_zone_refresh_does_not_fail_tagging() {
        let mut f = fixture();
        f.app.stopwatch().start().await.unwrap();
        f.api.fail("pitch_data");

        assert!(f.app.tag_event().await.is_ok());
        assert_eq!(f.app.events().len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_tag() {
        let mut f = fixture();
        f.app.stopwatch().start().await.unwrap();

        let event = f.app.quick_tag(Team::Home, "Transition").await.unwrap();
        assert_eq!(event.event_type, "Transition");
        assert_eq!(event.zone, None);
    }

    #[tokio::test]
    async fn test_refresh_pitch_stores_hot_zones() {
        let mut f = fixture();
        f.api.set_hot_zone("4", 3.0);

        f.app.refresh_pitch().await.unwrap();
        assert_eq!(f.app.hot_zones().get("4"), Some(&3.0));
    }

    #[tokio::test]
    async fn test_removed_tag_resyncs_form() {
        let mut f = fixture();
        assert_eq!(f.app.form().event_type(), Some("Transition"));

        f.app.remove_tag("Transition").unwrap();
        assert_eq!(f.app.form().event_type(), Some("Corner"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_everything_rotates_session() {
        let mut f = fixture();
        f.app.stopwatch().start().await.unwrap();
        f.app.quick_tag(Team::Home, "Corner").await.unwrap();
        let old = f.app.session_id();

        let fresh = f.app.reset_everything().await.unwrap();

        assert_ne!(old, fresh);
        assert_eq!(f.app.session_id(), fresh);
        assert_eq!(f.api.last_session("clear_events"), Some(old.clone()));
        assert_eq!(f.api.last_session("reset"), Some(old));
        assert!(f.app.events().is_empty().await);
        assert!(!f.app.stopwatch().is_polling());

        // Later requests use the new session
        f.app.events().fetch_events().await.unwrap();
        assert_eq!(f.api.last_session("list_events"), Some(fresh));
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_session() {
        let mut f = fixture();
        let old = f.app.session_id();
        f.api.fail("clear_events");

        assert!(f.app.reset_everything().await.is_err());
        assert_eq!(f.app.session_id(), old);
    }
}
