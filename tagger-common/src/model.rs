//! Wire data model shared between the API client and local logic
//!
//! Field names follow the backend's JSON contract (snake_case). Outcome
//! values of `None` travel as JSON `null` when a draft is submitted, which
//! is what the backend expects for "no cross" / "no shot".

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Opaque per-profile session identifier, sent as a header on every request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Value used when local storage is unavailable
    pub const EPHEMERAL: &'static str = "default";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn ephemeral() -> Self {
        Self(Self::EPHEMERAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Team an event is credited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Team {
    #[default]
    Home,
    Away,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Home => "Home",
            Team::Away => "Away",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Team::Home),
            "away" => Ok(Team::Away),
            other => Err(Error::InvalidInput(format!("Unknown team: {}", other))),
        }
    }
}

/// Outcome of a cross attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrossOutcome {
    #[default]
    None,
    Completed,
    Blocked,
    Intercepted,
    Saved,
}

impl CrossOutcome {
    pub const ALL: [CrossOutcome; 5] = [
        CrossOutcome::None,
        CrossOutcome::Completed,
        CrossOutcome::Blocked,
        CrossOutcome::Intercepted,
        CrossOutcome::Saved,
    ];

    /// A blocked, intercepted or saved cross never reaches a shooter.
    pub fn permits_shot(&self) -> bool {
        matches!(self, CrossOutcome::None | CrossOutcome::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrossOutcome::None => "None",
            CrossOutcome::Completed => "Completed",
            CrossOutcome::Blocked => "Blocked",
            CrossOutcome::Intercepted => "Intercepted",
            CrossOutcome::Saved => "Saved",
        }
    }
}

impl fmt::Display for CrossOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrossOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown cross outcome: {}", wanted)))
    }
}

/// Outcome of a shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShotOutcome {
    #[default]
    None,
    Goal,
    Post,
    Blocked,
    Out,
    Saved,
}

impl ShotOutcome {
    pub const ALL: [ShotOutcome; 6] = [
        ShotOutcome::None,
        ShotOutcome::Goal,
        ShotOutcome::Post,
        ShotOutcome::Blocked,
        ShotOutcome::Out,
        ShotOutcome::Saved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotOutcome::None => "None",
            ShotOutcome::Goal => "Goal",
            ShotOutcome::Post => "Post",
            ShotOutcome::Blocked => "Blocked",
            ShotOutcome::Out => "Out",
            ShotOutcome::Saved => "Saved",
        }
    }
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShotOutcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidInput(format!("Unknown shot outcome: {}", wanted)))
    }
}

/// Event as submitted to the backend (no id yet)
///
/// Build one through [`crate::form::EventForm`] or construct it directly and
/// call [`EventDraft::validate`] before handing it to the event manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDraft {
    pub minute: u32,
    pub second: u32,
    /// Authoritative timestamp; `minute`/`second` are derived display fields
    pub time_in_second: f64,
    pub team: Team,
    pub event_type: String,
    #[serde(serialize_with = "cross_or_null")]
    pub cross_outcome: Option<CrossOutcome>,
    #[serde(serialize_with = "shot_or_null")]
    pub shot_outcome: Option<ShotOutcome>,
    pub zone: Option<u32>,
}

impl EventDraft {
    /// Check the draft at the boundary before any request is sent
    pub fn validate(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(Error::InvalidInput("Please select an event type".to_string()));
        }
        if self.second > 59 {
            return Err(Error::InvalidInput(format!(
                "Second must be within 0-59, got {}",
                self.second
            )));
        }
        if !self.time_in_second.is_finite() || self.time_in_second < 0.0 {
            return Err(Error::InvalidInput(format!(
                "Invalid event time: {}",
                self.time_in_second
            )));
        }

        let cross = self.cross_outcome.unwrap_or_default();
        let shot = self.shot_outcome.unwrap_or_default();
        if shot != ShotOutcome::None && !cross.permits_shot() {
            return Err(Error::InvalidInput(format!(
                "Shot outcome can only be set when cross is None or Completed (cross = {})",
                cross
            )));
        }

        Ok(())
    }
}

fn cross_or_null<S: Serializer>(value: &Option<CrossOutcome>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(outcome) if *outcome != CrossOutcome::None => s.serialize_some(outcome),
        _ => s.serialize_none(),
    }
}

fn shot_or_null<S: Serializer>(value: &Option<ShotOutcome>, s: S) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Some(outcome) if *outcome != ShotOutcome::None => s.serialize_some(outcome),
        _ => s.serialize_none(),
    }
}

/// Event as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Server-assigned, unique and monotonic by creation
    pub id: u64,
    #[serde(deserialize_with = "whole_number")]
    pub minute: u32,
    #[serde(deserialize_with = "whole_number")]
    pub second: u32,
    pub time_in_second: f64,
    pub team: Team,
    pub event_type: String,
    #[serde(default)]
    pub cross_outcome: Option<CrossOutcome>,
    #[serde(default)]
    pub shot_outcome: Option<ShotOutcome>,
    #[serde(default)]
    pub zone: Option<u32>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

/// The backend encodes minute/second as floats (`15.0`)
fn whole_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let value = f64::deserialize(d)?;
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {}",
            value
        )));
    }
    Ok(value.floor() as u32)
}

/// Accept naive ISO timestamps and RFC 3339; anything unparseable becomes `None`
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error> {
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw.and_then(|s| parse_timestamp(&s)))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Server-held stopwatch state; the client mirrors it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopwatchStatus {
    pub running: bool,
    /// Seconds, never negative
    pub elapsed_time: f64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<NaiveDateTime>,
}

/// Response of the elapsed-time poll endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub elapsed_time: f64,
}

/// Stopwatch command, mapped to the `stopwatch/{action}` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchAction {
    Start,
    Stop,
    Reset,
}

impl StopwatchAction {
    pub fn path_segment(&self) -> &'static str {
        match self {
            StopwatchAction::Start => "start",
            StopwatchAction::Stop => "stop",
            StopwatchAction::Reset => "reset",
        }
    }
}

impl fmt::Display for StopwatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Per-team aggregate row from `events/stats`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    pub team: String,
    pub goals: u32,
    pub shots: u32,
    /// Goal, Saved or Post
    pub shots_on_target: u32,
    pub cross_attempts: u32,
    pub cross_completed: u32,
    pub transitions: u32,
}

/// Default grid and field dimensions for pitch requests
pub const DEFAULT_GRID_ROWS: u32 = 3;
pub const DEFAULT_GRID_COLUMNS: u32 = 3;
pub const DEFAULT_FIELD_LENGTH: f64 = 120.0;
pub const DEFAULT_FIELD_WIDTH: f64 = 80.0;

/// Grid and field dimensions sent with pitch requests
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchOptions {
    pub rows: u32,
    pub columns: u32,
    pub field_length: f64,
    pub field_width: f64,
}

impl Default for PitchOptions {
    fn default() -> Self {
        Self {
            rows: DEFAULT_GRID_ROWS,
            columns: DEFAULT_GRID_COLUMNS,
            field_length: DEFAULT_FIELD_LENGTH,
            field_width: DEFAULT_FIELD_WIDTH,
        }
    }
}

impl PitchOptions {
    /// Query string pairs in the backend's parameter names
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rows", self.rows.to_string()),
            ("columns", self.columns.to_string()),
            ("field_length", self.field_length.to_string()),
            ("field_width", self.field_width.to_string()),
        ]
    }
}

/// Heatmap request: pitch dimensions plus an optional event-type filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapOptions {
    pub pitch: PitchOptions,
    pub event_type: Option<String>,
}

impl HeatmapOptions {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = self.pitch.to_query();
        if let Some(event_type) = self.event_type.as_deref().filter(|t| !t.is_empty()) {
            query.push(("event_type", event_type.to_string()));
        }
        query
    }
}

/// Pitch figure plus zone centers and per-zone event counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchData {
    /// Renderable figure payload, passed through untouched
    pub figure: serde_json::Value,
    #[serde(default)]
    pub zone_dict: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub hot_zone: BTreeMap<String, f64>,
    pub rows: u32,
    pub columns: u32,
    #[serde(default)]
    pub field_dimen: Vec<f64>,
}

/// Artifact produced by the export endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Row-data table
    Csv,
    /// Structured interchange format
    Xml,
    /// Bundle of both
    Zip,
}

impl ExportKind {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ExportKind::Csv => "csv",
            ExportKind::Xml => "xml",
            ExportKind::Zip => "zip",
        }
    }

    /// Local file name for the downloaded artifact
    pub fn download_name(&self, filename: Option<&str>) -> String {
        match (self, filename) {
            (ExportKind::Zip, name) => format!("{}.zip", name.unwrap_or("events")),
            (_, Some(name)) => name.to_string(),
            (ExportKind::Csv, None) => "events.csv".to_string(),
            (ExportKind::Xml, None) => "events_LiveTagProFormat.xml".to_string(),
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for ExportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportKind::Csv),
            "xml" => Ok(ExportKind::Xml),
            "zip" => Ok(ExportKind::Zip),
            other => Err(Error::InvalidInput(format!("Unknown export kind: {}", other))),
        }
    }
}
