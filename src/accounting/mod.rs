//! Time accounting. [TimeAccountant] is the only thing allowed to change the accumulated counters;
//! everything else sees them through [AccumulatorState] snapshots.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    classify::verdict::Verdict,
    utils::{
        percentage::{efficiency, Percentage},
        time::elapsed_seconds,
    },
};

/// Accumulated counters. `0 <= productive_seconds <= total_seconds` holds for every value handed
/// out by [TimeAccountant].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccumulatorState {
    pub total_seconds: f64,
    pub productive_seconds: f64,
    pub is_tracking: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl AccumulatorState {
    pub fn efficiency(&self) -> Percentage {
        efficiency(self.productive_seconds, self.total_seconds)
    }
}

/// Identifies the span between two transitions of the accountant. Work started in one session must
/// not change the counters of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Session(u64);

/// Result of [TimeAccountant::advance].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Seconds added to the total by this tick.
    pub delta: f64,
    pub efficiency: Percentage,
    pub session: Session,
}

#[derive(Debug, Default)]
pub struct TimeAccountant {
    state: AccumulatorState,
    session: Session,
}

impl TimeAccountant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores counters saved by a previous run. Tracking is resumed with a fresh baseline, so the
    /// time the process was not running is never counted.
    pub fn restore(
        total_seconds: f64,
        productive_seconds: f64,
        is_tracking: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let total_seconds = sanitize(total_seconds);
        let mut accountant = Self {
            state: AccumulatorState {
                total_seconds,
                productive_seconds: sanitize(productive_seconds).min(total_seconds),
                is_tracking: false,
                last_tick_at: None,
            },
            session: Session::default(),
        };
        if is_tracking {
            accountant.start(now);
        }
        accountant
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking
    }

    pub fn session(&self) -> Session {
        self.session
    }

    /// Starts tracking. The next [TimeAccountant::advance] only measures from `now`.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.state.is_tracking {
            return;
        }
        self.state.is_tracking = true;
        self.state.last_tick_at = Some(now);
        self.next_session();
        info!("Tracking started");
    }

    /// Stops tracking. The caller is expected to flush the state right after.
    pub fn stop(&mut self) {
        if !self.state.is_tracking {
            return;
        }
        self.state.is_tracking = false;
        self.state.last_tick_at = None;
        self.next_session();
        info!(
            total = self.state.total_seconds,
            productive = self.state.productive_seconds,
            "Tracking stopped"
        );
    }

    /// Adds the time since the previous tick. Returns `None` while not tracking.
    pub fn advance(&mut self, now: DateTime<Utc>, verdict: &Verdict) -> Option<Tick> {
        if !self.state.is_tracking {
            return None;
        }
        let delta = self
            .state
            .last_tick_at
            .map_or(0., |last| elapsed_seconds(last, now));

        self.state.total_seconds += delta;
        if verdict.is_productive {
            self.state.productive_seconds += delta;
        }
        self.state.last_tick_at = Some(now);

        Some(Tick {
            delta,
            efficiency: self.state.efficiency(),
            session: self.session,
        })
    }

    /// Moves `delta` seconds between productive and non-productive time after a slower verdict
    /// disagreed with the one applied by [TimeAccountant::advance]. The total never changes.
    ///
    /// Callers must apply at most one correction per tick.
    pub fn correct(&mut self, delta: f64, was_productive: bool, is_productive_now: bool) {
        if !self.state.is_tracking || was_productive == is_productive_now {
            return;
        }
        let delta = sanitize(delta);
        let productive = if is_productive_now {
            self.state.productive_seconds + delta
        } else {
            self.state.productive_seconds - delta
        };
        self.state.productive_seconds = productive.clamp(0., self.state.total_seconds);
        debug!(
            delta,
            is_productive_now,
            productive = self.state.productive_seconds,
            "Corrected productive time"
        );
    }

    /// Zeroes the counters and stops tracking. Always followed by a flush.
    pub fn reset(&mut self) {
        self.state = AccumulatorState::default();
        self.next_session();
        info!("Tracking data reset");
    }

    fn next_session(&mut self) {
        self.session = Session(self.session.0 + 1);
    }
}

/// Negative, infinite or NaN amounts of time are treated as zero.
fn sanitize(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0. {
        seconds
    } else {
        0.
    }
}
