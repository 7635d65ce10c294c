//! Tunables of the tracker. Read once at startup from `<app dir>/config.json`; every field is
//! optional and falls back to its default.

use std::{io::ErrorKind, path::Path, time::Duration};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{default_categories, Category, CategoryCatalog};

pub const CONFIG_FILE_NAME: &str = "config.json";

pub const DEFAULT_API_URL: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Time between two samples of the foreground window.
    pub tick_interval_ms: u64,
    /// Time between two periodic snapshot saves while running.
    pub flush_interval_secs: u64,
    pub static_cache_ttl_secs: u64,
    pub dynamic_cache_ttl_secs: u64,
    /// Minimum time between two launches of the full classification. Zero launches one per tick.
    pub analysis_cooldown_ms: u64,
    pub ocr_enabled: bool,
    pub ocr_cooldown_secs: u64,
    /// Program and arguments printing the text currently on screen.
    pub ocr_command: Option<Vec<String>>,
    pub api_url: String,
    /// Name of the environment variable holding the API token.
    pub api_token_env: String,
    /// Replaces the built-in category catalog when set.
    pub categories: Option<Vec<Category>>,
    /// Starts tracking right after the previous state is restored. A detached daemon has no control
    /// input and would otherwise never start.
    pub track_on_start: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            flush_interval_secs: 60,
            static_cache_ttl_secs: 5 * 60,
            dynamic_cache_ttl_secs: 10,
            analysis_cooldown_ms: 5000,
            ocr_enabled: false,
            ocr_cooldown_secs: 10,
            ocr_command: None,
            api_url: DEFAULT_API_URL.into(),
            api_token_env: "HUGGINGFACE_TOKEN".into(),
            categories: None,
            track_on_start: false,
        }
    }
}

impl TrackerConfig {
    /// Loads the configuration from `dir`. A missing file gives the defaults, and so does an
    /// invalid one, after logging the problem.
    pub fn load(dir: &Path) -> Self {
        match Self::try_load(dir) {
            Ok(Some(config)) => {
                info!("Loaded configuration from {dir:?}");
                config
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to load configuration, using defaults {e:?}");
                Self::default()
            }
        }
    }

    fn try_load(dir: &Path) -> Result<Option<Self>> {
        let data = match std::fs::read_to_string(dir.join(CONFIG_FILE_NAME)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => Err(e)?,
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }

    pub fn static_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.static_cache_ttl_secs)
    }

    pub fn dynamic_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.dynamic_cache_ttl_secs)
    }

    pub fn analysis_cooldown(&self) -> Duration {
        Duration::from_millis(self.analysis_cooldown_ms)
    }

    pub fn ocr_cooldown(&self) -> Duration {
        Duration::from_secs(self.ocr_cooldown_secs)
    }

    pub fn api_token(&self) -> Option<String> {
        std::env::var(&self.api_token_env)
            .ok()
            .filter(|v| !v.is_empty())
    }

    pub fn catalog(&self) -> CategoryCatalog {
        CategoryCatalog::new(
            self.categories
                .clone()
                .unwrap_or_else(default_categories),
        )
    }
}
