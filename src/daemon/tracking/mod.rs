//! Owner of the [TimeAccountant]. Samples, control events from the UI and finished analyses all end
//! up here and are applied one at a time, so the counters never see concurrent writers.

pub mod writer;

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    sync::mpsc::Receiver,
    task::JoinSet,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use writer::SnapshotWriter;

use crate::{
    accounting::{Session, Tick, TimeAccountant},
    classify::{verdict::Verdict, ProductivityClassifier},
    config::TrackerConfig,
    storage::{snapshot::Snapshot, PersistenceGateway},
    utils::clock::Clock,
    window_api::Sample,
};

use super::ui::{ControlEvent, RestoredState, TrackingUpdate, UiEvent, UiSink};

/// Shown as the current app until the first sample after a restart.
pub const RESTORED_APP: &str = "Restored session";

#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Tick(Sample),
    Control(ControlEvent),
}

/// Outcome of a full classification launched for one tick.
struct Analysis {
    session: Session,
    delta: f64,
    current_app: String,
    quick: Verdict,
    full: Verdict,
}

pub struct TrackingModule {
    receiver: Receiver<TrackerEvent>,
    accountant: TimeAccountant,
    classifier: Arc<ProductivityClassifier>,
    writer: SnapshotWriter,
    ui: Box<dyn UiSink>,
    clock: Arc<dyn Clock>,
    shutdown: CancellationToken,
    analyses: JoinSet<Analysis>,
    last_result: Option<Verdict>,
    last_analysis: Option<Instant>,
    analysis_cooldown: Duration,
    flush_interval: Duration,
}

impl TrackingModule {
    /// Loads the previous state from `gateway`, announces it to the UI and returns the module
    /// ready to run. Unreadable state is logged and replaced by zeroed counters.
    pub async fn restore<G>(
        gateway: G,
        receiver: Receiver<TrackerEvent>,
        classifier: Arc<ProductivityClassifier>,
        ui: Box<dyn UiSink>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
        config: &TrackerConfig,
    ) -> Self
    where
        G: PersistenceGateway + Send + Sync + 'static,
    {
        let (mut accountant, last_result) = match gateway.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    total = snapshot.total_time_seconds,
                    productive = snapshot.productive_time_seconds,
                    is_tracking = snapshot.is_tracking,
                    "Restored tracking state"
                );
                let accountant = TimeAccountant::restore(
                    snapshot.total_time_seconds,
                    snapshot.productive_time_seconds,
                    snapshot.is_tracking,
                    clock.time(),
                );
                (accountant, snapshot.last_result)
            }
            Ok(None) => (TimeAccountant::new(), None),
            Err(e) => {
                error!("Failed to load tracking state, starting fresh {e:?}");
                (TimeAccountant::new(), None)
            }
        };

        if config.track_on_start {
            accountant.start(clock.time());
        }

        let module = Self {
            receiver,
            accountant,
            classifier,
            writer: SnapshotWriter::spawn(gateway),
            ui,
            clock,
            shutdown,
            analyses: JoinSet::new(),
            last_result,
            last_analysis: None,
            analysis_cooldown: config.analysis_cooldown(),
            flush_interval: config.flush_interval(),
        };
        module.push_restored_state();
        if config.track_on_start {
            module.flush();
        }
        module
    }

    /// Runs until shutdown is requested or every sender is gone. Analyses still in flight are
    /// abandoned and the final state is saved before returning.
    pub async fn run(mut self) -> Result<()> {
        let mut flush = tokio::time::interval_at(
            Instant::now() + self.flush_interval,
            self.flush_interval,
        );
        flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = flush.tick() => {
                    if self.accountant.is_tracking() {
                        self.flush();
                    }
                }
                Some(joined) = self.analyses.join_next() => match joined {
                    Ok(analysis) => self.apply_analysis(analysis),
                    Err(e) => error!("Analysis task failed {e:?}"),
                },
                event = self.receiver.recv() => match event {
                    Some(event) => self.handle(event),
                    None => break,
                },
            }
        }

        self.analyses.abort_all();
        self.receiver.close();
        let last = self.snapshot();
        self.writer.finish(last).await;
        info!("Tracking module stopped");
        Ok(())
    }

    fn handle(&mut self, event: TrackerEvent) {
        match event {
            TrackerEvent::Tick(sample) => self.on_sample(sample),
            TrackerEvent::Control(ControlEvent::ToggleTracking(true)) => {
                self.accountant.start(self.clock.time());
                self.flush();
            }
            TrackerEvent::Control(ControlEvent::ToggleTracking(false)) => {
                self.accountant.stop();
                self.flush();
            }
            TrackerEvent::Control(ControlEvent::ResetData) => {
                self.accountant.reset();
                self.last_result = None;
                self.flush();
            }
        }
    }

    fn on_sample(&mut self, sample: Sample) {
        if !self.accountant.is_tracking() {
            return;
        }
        let quick = self.classifier.quick(&sample);
        let Some(tick) = self.accountant.advance(sample.observed_at, &quick) else {
            return;
        };
        debug!(
            process = sample.process_name(),
            title = sample.window_title(),
            delta = tick.delta,
            is_productive = quick.is_productive,
            "Applied quick result"
        );

        self.push_update(sample.process_name(), &quick, true);
        self.last_result = Some(quick.clone());

        if self.analysis_due() {
            self.launch_analysis(sample, tick, quick);
        }
    }

    fn analysis_due(&mut self) -> bool {
        let now = self.clock.instant();
        match self.last_analysis {
            Some(last) if now.saturating_duration_since(last) < self.analysis_cooldown => false,
            _ => {
                self.last_analysis = Some(now);
                true
            }
        }
    }

    fn launch_analysis(&mut self, sample: Sample, tick: Tick, quick: Verdict) {
        let classifier = self.classifier.clone();
        self.analyses.spawn(async move {
            let full = classifier.full(&sample).await;
            Analysis {
                session: tick.session,
                delta: tick.delta,
                current_app: sample.process_name().into(),
                quick,
                full,
            }
        });
    }

    /// Applies a finished analysis. Results for ticks of an earlier session are stale and dropped.
    fn apply_analysis(&mut self, analysis: Analysis) {
        if analysis.session != self.accountant.session() {
            debug!("Discarding analysis of a previous session");
            return;
        }
        if !analysis.full.disagrees_with(&analysis.quick) {
            return;
        }

        self.accountant.correct(
            analysis.delta,
            analysis.quick.is_productive,
            analysis.full.is_productive,
        );
        self.push_update(&analysis.current_app, &analysis.full, false);
        self.last_result = Some(analysis.full);
    }

    fn push_update(&self, current_app: &str, verdict: &Verdict, is_quick_result: bool) {
        let update =
            TrackingUpdate::new(current_app, verdict, &self.accountant.state(), is_quick_result);
        self.ui.push(UiEvent::TrackingUpdate(update));
    }

    fn push_restored_state(&self) {
        let verdict = self
            .last_result
            .clone()
            .unwrap_or_else(|| Verdict::unknown(""));
        let state = self.accountant.state();
        self.ui.push(UiEvent::RestoreTrackingState(RestoredState {
            update: TrackingUpdate::new(RESTORED_APP, &verdict, &state, true),
            is_tracking: state.is_tracking,
        }));
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::capture(
            &self.accountant.state(),
            self.last_result.clone(),
            self.clock.time(),
        )
    }

    fn flush(&self) {
        self.writer.submit(self.snapshot());
    }
}
