//! Event description form
//!
//! Holds the observer's current choices (team, event type, cross and shot
//! outcome) and turns them into a validated [`EventDraft`] stamped with the
//! match clock. Shot outcomes are gated on the cross outcome: once a cross
//! is blocked, intercepted or saved there is no independent shot to record.

use crate::match_clock::split_elapsed;
use crate::model::{CrossOutcome, EventDraft, ShotOutcome, Team};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventForm {
    team: Team,
    event_type: Option<String>,
    cross_outcome: CrossOutcome,
    shot_outcome: ShotOutcome,
}

impl EventForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(&self) -> Team {
        self.team
    }

    pub fn set_team(&mut self, team: Team) {
        self.team = team;
    }

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    /// Choose the event type; blank input clears the choice
    pub fn set_event_type(&mut self, event_type: &str) {
        let trimmed = event_type.trim();
        self.event_type = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub fn cross_outcome(&self) -> CrossOutcome {
        self.cross_outcome
    }

    /// Set the cross outcome, forcing the shot outcome back to `None` when
    /// the new cross outcome precludes a shot
    pub fn set_cross_outcome(&mut self, outcome: CrossOutcome) {
        self.cross_outcome = outcome;
        if !outcome.permits_shot() {
            self.shot_outcome = ShotOutcome::None;
        }
    }

    pub fn shot_outcome(&self) -> ShotOutcome {
        self.shot_outcome
    }

    /// Whether a non-`None` shot outcome may currently be chosen
    pub fn shot_outcome_enabled(&self) -> bool {
        self.cross_outcome.permits_shot()
    }

    /// Set the shot outcome; rejected while the cross outcome precludes it
    pub fn set_shot_outcome(&mut self, outcome: ShotOutcome) -> Result<()> {
        if outcome != ShotOutcome::None && !self.shot_outcome_enabled() {
            return Err(Error::InvalidInput(format!(
                "Shot outcome can only be set when cross is None or Completed (cross = {})",
                self.cross_outcome
            )));
        }
        self.shot_outcome = outcome;
        Ok(())
    }

    /// Keep the chosen event type only while it is still a configured tag;
    /// otherwise fall back to the first available tag
    pub fn sync_with_tags(&mut self, tags: &[String]) {
        let still_valid = self
            .event_type
            .as_ref()
            .map(|t| tags.iter().any(|tag| tag == t))
            .unwrap_or(false);
        if !still_valid {
            self.event_type = tags.first().cloned();
        }
    }

    /// Build a draft stamped at `elapsed_secs` with an optional zone
    pub fn build_draft(&self, elapsed_secs: f64, zone: Option<u32>) -> Result<EventDraft> {
        let event_type = self
            .event_type
            .clone()
            .ok_or_else(|| Error::InvalidInput("Please select an event type".to_string()))?;

        let (minute, second) = split_elapsed(elapsed_secs);
        let draft = EventDraft {
            minute,
            second,
            time_in_second: elapsed_secs.max(0.0),
            team: self.team,
            event_type,
            cross_outcome: Some(self.cross_outcome),
            shot_outcome: Some(self.shot_outcome),
            zone,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Quick-tag draft with only team and type, as used by hand control
    pub fn quick_draft(team: Team, event_type: &str, elapsed_secs: f64) -> Result<EventDraft> {
        let mut form = Self::new();
        form.set_team(team);
        form.set_event_type(event_type);
        form.build_draft(elapsed_secs, None)
    }
}
