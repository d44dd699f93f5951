//! Display formatting of contract timestamps.

use chrono::{DateTime, FixedOffset};

/// Offset of the display time zone (UTC-3, no daylight saving).
const DISPLAY_OFFSET_SECS: i32 = 3 * 3600;

/// Date and time of a timestamp as shown by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTime {
    /// `dd/mm/YYYY`
    pub date: String,
    /// `HH:MM:SS`
    pub time: String,
}

/// Format a Unix timestamp in seconds at UTC-3.
///
/// Returns `None` for timestamps outside the representable range.
pub fn format_timestamp(timestamp: u64) -> Option<DisplayTime> {
    let offset = FixedOffset::west_opt(DISPLAY_OFFSET_SECS)?;
    let seconds = i64::try_from(timestamp).ok()?;
    let local = DateTime::from_timestamp(seconds, 0)?.with_timezone(&offset);

    Some(DisplayTime {
        date: local.format("%d/%m/%Y").to_string(),
        time: local.format("%H:%M:%S").to_string(),
    })
}
