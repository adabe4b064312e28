//! Duration string parsing for spec documents.

use std::time::Duration;

use crate::error::{SpecError, SpecResult};

/// Parse a duration string like "500ms", "5s", "1m".
///
/// A bare number is treated as seconds.
pub fn parse_duration(s: &str) -> SpecResult<Duration> {
    let s = s.trim();
    let parsed = if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };

    parsed.ok_or_else(|| SpecError::BadDuration(s.to_string()))
}
