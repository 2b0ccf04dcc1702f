//! Event-type tag configuration
//!
//! The tag list is an ordered set of unique names, seeded from common
//! football situations and extensible with custom names. It is persisted to
//! local storage whenever a mutation changes it. An emptied list removes the
//! stored key instead of persisting `[]`, so the next load falls back to the
//! default seed.
//!
//! Loading never writes: persisted data is not clobbered by its own echo.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::LocalStore;
use crate::Result;

/// Local storage key holding the serialized tag list
pub const TAGS_KEY: &str = "eventTags";

/// Known event names; partial input snaps to these spellings
pub const PREDEFINED_TAGS: [&str; 15] = [
    "Transition",
    "Corner",
    "Dead-ball",
    "Slow-attack",
    "Penalty",
    "Free-kick",
    "Throw-in",
    "Goal-kick",
    "Offside",
    "Foul",
    "Yellow-card",
    "Red-card",
    "Substitution",
    "Build-up",
    "Defending",
];

/// Number of predefined tags in the default seed
const DEFAULT_SEED_LEN: usize = 5;

/// Tag list used when nothing has been configured
pub fn default_tags() -> Vec<String> {
    PREDEFINED_TAGS[..DEFAULT_SEED_LEN]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

pub struct TagStore {
    store: Arc<dyn LocalStore>,
    tags: Vec<String>,
}

impl TagStore {
    /// Load persisted tags, falling back to the default seed
    pub fn load(store: Arc<dyn LocalStore>) -> Self {
        let tags = match store.get(TAGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) if !list.is_empty() => dedup(list),
                Ok(_) => default_tags(),
                Err(e) => {
                    warn!("Ignoring corrupt stored tag list: {}", e);
                    default_tags()
                }
            },
            Ok(None) => default_tags(),
            Err(e) => {
                warn!("Tag storage unavailable, using defaults: {}", e);
                default_tags()
            }
        };

        debug!(count = tags.len(), "Tags loaded");
        Self { store, tags }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Predefined names not yet in the list
    pub fn suggestions(&self) -> Vec<&'static str> {
        PREDEFINED_TAGS
            .iter()
            .copied()
            .filter(|p| !self.contains(p))
            .collect()
    }

    /// Resolve raw input to the tag that would be added
    ///
    /// Trimmed input that is a case-insensitive prefix of an unused
    /// predefined name resolves to that name; anything else resolves to the
    /// trimmed input itself. Blank input resolves to nothing.
    pub fn resolve(&self, input: &str) -> Option<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }

        let needle = trimmed.to_lowercase();
        let canonical = PREDEFINED_TAGS
            .iter()
            .find(|p| p.to_lowercase().starts_with(&needle) && !self.contains(p));

        Some(canonical.map(|p| p.to_string()).unwrap_or_else(|| trimmed.to_string()))
    }

    /// Add a tag; returns the tag actually added, `None` for a no-op
    pub fn add_tag(&mut self, input: &str) -> Result<Option<String>> {
        let Some(tag) = self.resolve(input) else {
            return Ok(None);
        };
        if self.contains(&tag) {
            return Ok(None);
        }

        let mut next = self.tags.clone();
        next.push(tag.clone());
        self.commit(next)?;
        Ok(Some(tag))
    }

    /// Remove by exact name; absent names are ignored
    pub fn remove_tag(&mut self, name: &str) -> Result<bool> {
        if !self.contains(name) {
            return Ok(false);
        }
        let next = self.tags.iter().filter(|t| *t != name).cloned().collect();
        self.commit(next)?;
        Ok(true)
    }

    /// Replace the whole list (duplicates dropped, order kept)
    pub fn set_tags(&mut self, tags: Vec<String>) -> Result<()> {
        let tags = dedup(tags);
        if tags == self.tags {
            return Ok(());
        }
        self.commit(tags)
    }

    /// Persist `next`, then adopt it; a storage failure keeps the old list
    fn commit(&mut self, next: Vec<String>) -> Result<()> {
        if next.is_empty() {
            self.store.remove(TAGS_KEY)?;
        } else {
            let raw = serde_json::to_string(&next)?;
            self.store.set(TAGS_KEY, &raw)?;
        }
        debug!(count = next.len(), "Tags persisted");
        self.tags = next;
        Ok(())
    }
}

fn dedup(tags: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}
