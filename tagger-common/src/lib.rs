//! # Event Tagger Common Library
//!
//! Shared code for the event tagger client including:
//! - Wire data model (events, stopwatch status, statistics, pitch data)
//! - Match clock formatting
//! - Session identity and local persistence
//! - Pitch zone geometry
//! - Event form gating and tag configuration
//! - Post-match clip review (CSV rows, video links)
//! - Configuration loading

pub mod clip;
pub mod config;
pub mod error;
pub mod form;
pub mod match_clock;
pub mod model;
pub mod session;
pub mod storage;
pub mod tags;
pub mod time;
pub mod zone;

pub use error::{Error, Result};
pub use model::SessionId;
