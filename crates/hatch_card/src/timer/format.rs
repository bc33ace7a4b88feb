use chrono::DateTime;
use chrono::SecondsFormat;
use chrono::Utc;

use crate::clock::Millis;

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Countdown text shown on the card: `M:SS` below one hour, `H:MM:SS` above.
pub fn format_remaining(ms: Millis) -> String {
    let total_seconds = ms.max(0) / MS_PER_SECOND;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Zero-padded `HH:MM:SS`, the duration format the host timer service takes.
pub fn format_hms(ms: Millis) -> String {
    let total_seconds = ms.max(0) / MS_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// Parse a host duration string such as `0:30:00`, `01:05:09.5` or
/// `1 day, 2:00:00`.
pub fn parse_hms(text: &str) -> Option<Millis> {
    let text = text.trim();
    let (days, clock) = match text.split_once(',') {
        Some((days, clock)) => {
            let count = days
                .trim()
                .trim_end_matches("days")
                .trim_end_matches("day")
                .trim();
            (count.parse::<i64>().ok().filter(|d| *d >= 0)?, clock.trim())
        }
        None => (0, text),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return None;
    };

    let hours: i64 = h.parse().ok()?;
    let minutes: i64 = m.parse().ok()?;
    let seconds: f64 = s.parse().ok()?;
    if hours < 0 || !(0..60).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return None;
    }

    days.checked_mul(MS_PER_DAY)?
        .checked_add(hours.checked_mul(MS_PER_HOUR)?)?
        .checked_add(minutes * MS_PER_MINUTE)?
        .checked_add((seconds * MS_PER_SECOND as f64).round() as i64)
}

/// Label for a preset button: `15m`, `1h`, `2h`, `1h30m`.
pub fn preset_label(minutes: u32) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else if minutes % 60 == 0 {
        format!("{}h", minutes / 60)
    } else {
        format!("{}h{}m", minutes / 60, minutes % 60)
    }
}

pub fn minutes_to_ms(minutes: u32) -> Millis {
    i64::from(minutes) * MS_PER_MINUTE
}

/// Parse an RFC 3339 timestamp (the host's `finishes_at`) into epoch ms.
pub fn parse_timestamp(text: &str) -> Option<Millis> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.timestamp_millis())
}

pub fn format_timestamp(ms: Millis) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, false)
}
