use std::fmt::Write;

use ansi_term::Colour;
use chrono::{DateTime, Local};

use crate::{
    storage::snapshot::Snapshot,
    utils::{percentage::efficiency, time::format_seconds},
};

/// Human readable summary of a saved snapshot. `colored` is off when the output isn't a terminal.
pub fn render_status(snapshot: Option<&Snapshot>, colored: bool) -> String {
    let paint = |colour: Colour, text: String| {
        if colored {
            colour.paint(text).to_string()
        } else {
            text
        }
    };

    let Some(snapshot) = snapshot else {
        return "Nothing has been tracked yet\n".into();
    };

    let mut out = String::new();
    let tracking = if snapshot.is_tracking {
        paint(Colour::Green, "on".into())
    } else {
        paint(Colour::Yellow, "off".into())
    };
    let _ = writeln!(out, "Tracking:\t{tracking}");
    let _ = writeln!(
        out,
        "Total:\t\t{}",
        format_seconds(snapshot.total_time_seconds)
    );
    let _ = writeln!(
        out,
        "Productive:\t{}",
        format_seconds(snapshot.productive_time_seconds)
    );
    let _ = writeln!(
        out,
        "Efficiency:\t{}",
        efficiency(
            snapshot.productive_time_seconds,
            snapshot.total_time_seconds
        )
    );

    if let Some(last) = &snapshot.last_result {
        let verdict = if last.is_productive {
            paint(Colour::Green, "productive".into())
        } else {
            paint(Colour::Red, "not productive".into())
        };
        let _ = writeln!(
            out,
            "Last activity:\t{} ({verdict}, {}% sure)",
            last.category,
            (last.confidence * 100.).round()
        );
    }

    if let Some(saved_at) = DateTime::from_timestamp_millis(snapshot.saved_at) {
        let _ = writeln!(
            out,
            "Saved at:\t{}",
            saved_at.with_timezone(&Local).format("%x %H:%M:%S")
        );
    }
    out
}
