use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use collection::collector::SamplingModule;
use tokio::{
    io::{AsyncBufRead, BufReader},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracking::{TrackerEvent, TrackingModule};
use ui::StdoutSink;

use crate::{
    classify::{
        cache::ClassificationCache,
        ocr::{CommandScreenReader, ScreenReaderGate},
        remote::HttpTextClassifier,
        volatility::VolatilityClassifier,
        ProductivityClassifier,
    },
    config::TrackerConfig,
    storage::file::FileSnapshotStore,
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowSampler, WindowSampler},
};

pub mod args;
pub mod collection;
pub mod shutdown;
pub mod tracking;
pub mod ui;

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf, config: TrackerConfig) -> Result<()> {
    let (sender, receiver) = mpsc::channel::<TrackerEvent>(16);
    let sampler = GenericWindowSampler::new()?;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    let shutdown_token = CancellationToken::new();

    let collector = create_collector(
        sender.clone(),
        sampler,
        &shutdown_token,
        clock.clone(),
        &config,
    );

    let classifier = Arc::new(create_classifier(&config, clock.clone())?);
    let store = FileSnapshotStore::new(dir)?;
    let tracker = TrackingModule::restore(
        store,
        receiver,
        classifier,
        Box::new(StdoutSink),
        clock,
        shutdown_token.clone(),
        &config,
    )
    .await;

    info!("Daemon started");
    tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        run_modules(
            collector,
            tracker,
            BufReader::new(tokio::io::stdin()),
            sender,
            shutdown_token.clone()
        ),
    );

    Ok(())
}

/// Runs the modules until shutdown. `control` may end at any time, for example when the daemon
/// was detached from its terminal; sampling and tracking go on without it.
async fn run_modules(
    collector: SamplingModule,
    tracker: TrackingModule,
    control: impl AsyncBufRead + Unpin,
    sender: mpsc::Sender<TrackerEvent>,
    shutdown_token: CancellationToken,
) {
    let (_, collection_result, tracking_result) = tokio::join!(
        ui::read_control_events(control, sender, shutdown_token),
        collector.run(),
        tracker.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Sampling module got an error {:?}", collection_result);
    }

    if let Err(tracking_result) = tracking_result {
        error!("Tracking module got an error {:?}", tracking_result);
    }
}

fn create_collector(
    sender: mpsc::Sender<TrackerEvent>,
    sampler: impl WindowSampler + 'static,
    shutdown_token: &CancellationToken,
    clock: Arc<dyn Clock>,
    config: &TrackerConfig,
) -> SamplingModule {
    SamplingModule::new(
        sender,
        Box::new(sampler),
        shutdown_token.clone(),
        config.tick_interval(),
        clock,
    )
}

fn create_classifier(
    config: &TrackerConfig,
    clock: Arc<dyn Clock>,
) -> Result<ProductivityClassifier> {
    let screen = match (config.ocr_enabled, &config.ocr_command) {
        (true, Some(command)) => ScreenReaderGate::new(
            Arc::new(CommandScreenReader::new(command)?),
            true,
            config.ocr_cooldown(),
        ),
        (true, None) => {
            warn!("OCR is enabled but no ocr_command is configured, continuing without it");
            ScreenReaderGate::disabled()
        }
        (false, _) => ScreenReaderGate::disabled(),
    };

    let token = config.api_token();
    if token.is_none() {
        warn!(
            "{} is not set, remote classification will most likely fail",
            config.api_token_env
        );
    }

    Ok(ProductivityClassifier::new(
        config.catalog(),
        VolatilityClassifier::default(),
        ClassificationCache::new(config.static_cache_ttl(), config.dynamic_cache_ttl()),
        Arc::new(HttpTextClassifier::new(config.api_url.clone(), token)),
        screen,
        clock,
    ))
}
