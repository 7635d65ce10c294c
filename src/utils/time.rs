use chrono::{DateTime, Utc};

/// This is the standard way of presenting an accumulated duration in worktracker: `"{h}h {m}m {s}s"`.
/// Fractions of a second are dropped.
pub fn format_seconds(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0. {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    format!("{hours}h {minutes}m {secs}s")
}

/// Seconds elapsed between two wall-clock readings. A clock adjusted backwards yields zero rather
/// than a negative span.
pub fn elapsed_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    let seconds = span.num_milliseconds() as f64 / 1000.;
    seconds.max(0.)
}
