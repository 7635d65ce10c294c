//! Access to on-screen text. Reading the screen is expensive, so every read goes through
//! [ScreenReaderGate], which initializes the reader lazily and allows at most one read per
//! cooldown window across all callers.

use std::{process::Stdio, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::{process::Command, sync::Mutex, time::Instant};
use tracing::{debug, error, info, warn};

/// How many times initialization of the reader is attempted before OCR is given up on.
pub const MAX_INIT_ATTEMPTS: u32 = 3;

/// External screenshot + text recognition engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenReader: Send + Sync {
    /// Prepares the engine. Called once before the first read, and again after a failure.
    async fn initialize(&self) -> Result<()>;

    /// Captures the screen and returns the recognized text.
    async fn read_screen(&self) -> Result<String>;
}

/// [ScreenReader] used when no engine is configured.
pub struct NoScreenReader;

#[async_trait]
impl ScreenReader for NoScreenReader {
    async fn initialize(&self) -> Result<()> {
        Err(anyhow!("No screen reader is configured"))
    }

    async fn read_screen(&self) -> Result<String> {
        Err(anyhow!("No screen reader is configured"))
    }
}

/// Runs an external program, for example a shell pipeline of a screenshot tool into `tesseract`,
/// and takes its standard output as the screen text.
pub struct CommandScreenReader {
    program: String,
    args: Vec<String>,
}

impl CommandScreenReader {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("OCR command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl ScreenReader for CommandScreenReader {
    async fn initialize(&self) -> Result<()> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        debug!("OCR program {} answered --version with {status}", self.program);
        if !status.success() {
            return Err(anyhow!(
                "OCR program {} is not usable, --version exited with {status}",
                self.program
            ));
        }
        Ok(())
    }

    async fn read_screen(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(anyhow!(
                "OCR program exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Pending { failures: u32 },
    Ready,
    GaveUp,
}

pub struct ScreenReaderGate {
    reader: Arc<dyn ScreenReader>,
    enabled: bool,
    cooldown: Duration,
    init: Mutex<InitState>,
    last_read: std::sync::Mutex<Option<Instant>>,
}

impl ScreenReaderGate {
    pub fn new(reader: Arc<dyn ScreenReader>, enabled: bool, cooldown: Duration) -> Self {
        Self {
            reader,
            enabled,
            cooldown,
            init: Mutex::new(InitState::Pending { failures: 0 }),
            last_read: std::sync::Mutex::new(None),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoScreenReader), false, Duration::ZERO)
    }

    /// Reads the screen if OCR is enabled, usable and out of its cooldown. Every failure ends up
    /// as `None`: callers continue without screen text.
    pub async fn try_read(&self, now: Instant) -> Option<String> {
        if !self.enabled || !self.reserve_slot(now) {
            return None;
        }
        if !self.ensure_initialized().await {
            return None;
        }

        match self.reader.read_screen().await {
            Ok(text) => {
                let text = text.trim().to_string();
                debug!("OCR completed with {} characters", text.len());
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                warn!("OCR failed {e:?}");
                None
            }
        }
    }

    /// Claims the current cooldown window. Fails when another read already claimed it.
    fn reserve_slot(&self, now: Instant) -> bool {
        let mut last_read = match self.last_read.lock() {
            Ok(v) => v,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *last_read {
            Some(previous) if now.saturating_duration_since(previous) < self.cooldown => false,
            _ => {
                *last_read = Some(now);
                true
            }
        }
    }

    async fn ensure_initialized(&self) -> bool {
        // Held across initialization so that concurrent tasks wait for one attempt instead of
        // starting their own.
        let mut state = self.init.lock().await;
        let failures = match *state {
            InitState::Ready => return true,
            InitState::GaveUp => return false,
            InitState::Pending { failures } => failures,
        };

        match self.reader.initialize().await {
            Ok(()) => {
                info!("Screen reader initialized");
                *state = InitState::Ready;
                true
            }
            Err(e) => {
                let failures = failures + 1;
                if failures >= MAX_INIT_ATTEMPTS {
                    error!("Screen reader initialization failed {failures} times, disabling OCR: {e:?}");
                    *state = InitState::GaveUp;
                } else {
                    warn!("Screen reader initialization failed {e:?}");
                    *state = InitState::Pending { failures };
                }
                false
            }
        }
    }
}
