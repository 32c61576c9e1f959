use chrono::{DateTime, NaiveDate, Utc};

/// This is the standard way of converting a date to a string in sitetime. Both stores key
/// their daily aggregates with it.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whole seconds between two moments, rounded to the nearest second. A moment earlier than
/// `from` (the wall clock stepped backwards) counts as zero.
pub fn rounded_seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    let millis = (to - from).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    ((millis as u64) + 500) / 1000
}

/// Renders seconds the way the reports show them: `1h 5m`, `12m` or `40s`.
pub fn format_seconds(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}
