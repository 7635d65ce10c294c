use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
    daemon::tracking::TrackerEvent,
    utils::clock::Clock,
    window_api::{Sample, WindowSampler},
};

/// Samples the foreground window once per interval and hands the samples to the tracking module.
pub struct SamplingModule {
    next: mpsc::Sender<TrackerEvent>,
    sampler: Box<dyn WindowSampler>,
    shutdown: CancellationToken,
    interval: Duration,
    clock: Arc<dyn Clock>,
}

impl SamplingModule {
    pub fn new(
        next: mpsc::Sender<TrackerEvent>,
        sampler: Box<dyn WindowSampler>,
        shutdown: CancellationToken,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            next,
            sampler,
            shutdown,
            interval,
            clock,
        }
    }

    /// A failed query still produces a sample, so that the time is accounted to "unknown".
    fn sample(&mut self) -> Sample {
        let observed_at = self.clock.time();
        match self.sampler.get_active_window_data() {
            Ok(window) => Sample::observed(window, observed_at),
            Err(e) => {
                warn!("Failed to query the foreground window {e:?}");
                Sample::unknown(observed_at)
            }
        }
    }

    /// Executes the sampling loop.
    pub async fn run(mut self) -> Result<()> {
        let mut sampling_point = self.clock.instant();
        loop {
            sampling_point += self.interval;

            let sample = self.sample();
            debug!("Sending sample {:?}", sample);
            if let Err(e) = self.next.send(TrackerEvent::Tick(sample)).await {
                // The tracking module is gone, there is nobody left to sample for.
                error!("Unexpected error during sending {e:?}");
                return Ok(());
            }

            tokio::select! {
                // Cancelation drops the sender, which lets the tracking module drain and stop.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.clock.sleep_until(sampling_point) => ()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::tracking::TrackerEvent,
        utils::clock::DefaultClock,
        window_api::{ActiveWindowData, MockWindowSampler, UNKNOWN_PROCESS},
    };

    use super::SamplingModule;

    #[tokio::test(start_paused = true)]
    async fn test_samples_every_interval_until_shutdown() -> Result<()> {
        let mut sampler = MockWindowSampler::new();
        let mut calls = 0;
        sampler.expect_get_active_window_data().returning(move || {
            calls += 1;
            if calls == 2 {
                Err(anyhow!("no window"))
            } else {
                Ok(ActiveWindowData::new("code", "main.rs"))
            }
        });

        let shutdown = CancellationToken::new();
        let (sender, mut receiver) = mpsc::channel(16);
        let module = SamplingModule::new(
            sender,
            Box::new(sampler),
            shutdown.clone(),
            Duration::from_secs(1),
            Arc::new(DefaultClock),
        );

        let (result, _) = tokio::join!(module.run(), async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            shutdown.cancel();
        });
        result?;

        let mut processes = vec![];
        while let Some(TrackerEvent::Tick(sample)) = receiver.recv().await {
            processes.push(sample.process_name().to_string());
        }
        assert_eq!(processes, vec!["code", UNKNOWN_PROCESS, "code"]);
        Ok(())
    }
}
