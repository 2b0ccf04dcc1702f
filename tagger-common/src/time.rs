//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds since the Unix epoch, used for cache-busting and session ids
pub fn unix_millis() -> i64 {
    now().timestamp_millis()
}
