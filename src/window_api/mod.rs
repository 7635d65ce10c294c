//! Contains logic for reading the foreground window in different environments.
//! [GenericWindowSampler] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{path::Path, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Process name reported when nothing could be sampled.
pub const UNKNOWN_PROCESS: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveWindowData {
    /// Name of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Chrome'
    pub window_title: Arc<str>,
    /// Executable name without its directory. For example 'code' or 'firefox.exe'
    pub process_name: Arc<str>,
}

impl ActiveWindowData {
    pub fn new(process_name: impl Into<Arc<str>>, window_title: impl Into<Arc<str>>) -> Self {
        Self {
            window_title: window_title.into(),
            process_name: process_name.into(),
        }
    }
}

/// One observation of the foreground window. `window` is `None` when the platform couldn't tell
/// what is in the foreground, which is treated as unknown, non-productive activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub window: Option<ActiveWindowData>,
    pub observed_at: DateTime<Utc>,
}

impl Sample {
    pub fn observed(window: ActiveWindowData, observed_at: DateTime<Utc>) -> Self {
        Self {
            window: Some(window),
            observed_at,
        }
    }

    pub fn unknown(observed_at: DateTime<Utc>) -> Self {
        Self {
            window: None,
            observed_at,
        }
    }

    pub fn process_name(&self) -> &str {
        self.window
            .as_ref()
            .map_or(UNKNOWN_PROCESS, |v| &v.process_name)
    }

    pub fn window_title(&self) -> &str {
        self.window.as_ref().map_or("", |v| &v.window_title)
    }
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowSampler {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData>;
}

/// Strips directories from an executable path. Catalog entries are matched against bare names.
pub(crate) fn executable_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or(path)
}

/// Serves as a cross-compatible WindowSampler implementation.
pub struct GenericWindowSampler {
    inner: Box<dyn WindowSampler>,
}

impl GenericWindowSampler {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowSampler;
                Ok(Self {
                    inner: Box::new(WindowsWindowSampler::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowSampler;
                Ok(Self {
                    inner: Box::new(LinuxWindowSampler::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window backend was compiled in. Rebuild with the `x11` or `win` feature"
                ))
            }
        }
    }
}

impl WindowSampler for GenericWindowSampler {
    fn get_active_window_data(&mut self) -> Result<ActiveWindowData> {
        self.inner.get_active_window_data()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{executable_name, ActiveWindowData, Sample, UNKNOWN_PROCESS};

    #[test]
    fn test_executable_name() {
        assert_eq!(executable_name("/usr/share/code/code"), "code");
        assert_eq!(executable_name("firefox"), "firefox");
        assert_eq!(executable_name(""), "");
    }

    #[test]
    fn test_unknown_sample() {
        let at = Utc.with_ymd_and_hms(2018, 7, 4, 0, 0, 0).unwrap();
        let sample = Sample::unknown(at);
        assert_eq!(sample.process_name(), UNKNOWN_PROCESS);
        assert_eq!(sample.window_title(), "");

        let sample = Sample::observed(ActiveWindowData::new("code", "main.rs"), at);
        assert_eq!(sample.process_name(), "code");
        assert_eq!(sample.window_title(), "main.rs");
    }
}
