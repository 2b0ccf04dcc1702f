//! Match clock display
//!
//! Minute and second are always floor decompositions of the floating-point
//! elapsed time; they are never tracked independently.

/// Split elapsed seconds into `(minute, second)`
///
/// Negative or non-finite input is treated as zero.
pub fn split_elapsed(elapsed_secs: f64) -> (u32, u32) {
    let secs = if elapsed_secs.is_finite() && elapsed_secs > 0.0 {
        elapsed_secs
    } else {
        0.0
    };
    let minute = (secs / 60.0).floor();
    let second = (secs % 60.0).floor();
    (minute.min(u32::MAX as f64) as u32, second as u32)
}

/// Format elapsed seconds as `M:SS`
///
/// # Examples
///
/// ```
/// use tagger_common::match_clock::format_match_clock;
///
/// assert_eq!(format_match_clock(12.4), "0:12");
/// assert_eq!(format_match_clock(754.9), "12:34");
/// ```
pub fn format_match_clock(elapsed_secs: f64) -> String {
    let (minute, second) = split_elapsed(elapsed_secs);
    format!("{}:{:02}", minute, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_elapsed_floors_both_parts() {
        assert_eq!(split_elapsed(0.0), (0, 0));
        assert_eq!(split_elapsed(59.999), (0, 59));
        assert_eq!(split_elapsed(60.0), (1, 0));
        assert_eq!(split_elapsed(930.7), (15, 30));
    }

    #[test]
    fn test_split_elapsed_rejects_garbage() {
        assert_eq!(split_elapsed(-3.0), (0, 0));
        assert_eq!(split_elapsed(f64::NAN), (0, 0));
        assert_eq!(split_elapsed(f64::INFINITY), (0, 0));
    }

    #[test]
    fn test_format_pads_seconds_only() {
        assert_eq!(format_match_clock(0.0), "0:00");
        assert_eq!(format_match_clock(5.5), "0:05");
        assert_eq!(format_match_clock(12.4), "0:12");
        assert_eq!(format_match_clock(5400.0), "90:00");
        assert_eq!(format_match_clock(6001.2), "100:01");
    }
}
