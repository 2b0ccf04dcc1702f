//! # Event Tagger Client
//!
//! Talks to the tagging backend and keeps the client-side view of a
//! session consistent:
//! - [`api`]: the backend contract and its HTTP implementation
//! - [`stopwatch`]: server-held match clock mirror with cancellable polling
//! - [`events`]: confirmed-only event list management
//! - [`export`]: artifact downloads
//! - [`app`]: the application state tying them together

pub mod api;
pub mod app;
pub mod error;
pub mod events;
pub mod export;
pub mod stopwatch;

pub use error::{Error, Result};
