//! Bridge to the UI shell. The shell drives the daemon by writing [ControlEvent]s as JSON lines to
//! its stdin and receives [UiEvent]s as JSON lines on its stdout.

use std::io::Write;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    accounting::AccumulatorState,
    classify::verdict::Verdict,
    utils::time::format_seconds,
};

use super::tracking::TrackerEvent;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "kebab-case")]
pub enum ControlEvent {
    ToggleTracking(bool),
    ResetData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    pub current_app: String,
    pub is_productive: bool,
    /// Whole percent, `0..=100`.
    pub efficiency: u8,
    pub total_time: String,
    pub productive_time: String,
    pub category: String,
    pub confidence: f64,
    pub is_quick_result: bool,
}

impl TrackingUpdate {
    pub fn new(
        current_app: &str,
        verdict: &Verdict,
        state: &AccumulatorState,
        is_quick_result: bool,
    ) -> Self {
        Self {
            current_app: current_app.into(),
            is_productive: verdict.is_productive,
            efficiency: state.efficiency().rounded(),
            total_time: format_seconds(state.total_seconds),
            productive_time: format_seconds(state.productive_seconds),
            category: verdict.category.clone(),
            confidence: verdict.confidence,
            is_quick_result,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoredState {
    #[serde(flatten)]
    pub update: TrackingUpdate,
    pub is_tracking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UiEvent {
    TrackingUpdate(TrackingUpdate),
    RestoreTrackingState(RestoredState),
}

/// Receiver of push events. Pushing never fails from the caller's point of view.
pub trait UiSink: Send + Sync {
    fn push(&self, event: UiEvent);
}

/// Writes events as JSON lines to stdout.
pub struct StdoutSink;

impl UiSink for StdoutSink {
    fn push(&self, event: UiEvent) {
        let write = || -> Result<()> {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer(&mut stdout, &event)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
            Ok(())
        };
        if let Err(e) = write() {
            error!("Failed to push UI event {e:?}");
        }
    }
}

/// Forwards control events read from `input` until it ends or shutdown is requested.
pub async fn read_control_events(
    input: impl AsyncBufRead + Unpin,
    next: mpsc::Sender<TrackerEvent>,
    shutdown: CancellationToken,
) {
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => return,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Control input closed");
                return;
            }
            Err(e) => {
                error!("Failed to read control input {e:?}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ControlEvent>(&line) {
            Ok(event) => {
                debug!("Received control event {event:?}");
                if next.send(TrackerEvent::Control(event)).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!("Ignoring invalid control event {line:?}: {e}"),
        }
    }
}
