use serde::{Deserialize, Serialize};

/// Which tier of the classifier produced a [Verdict].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictSource {
    AppList,
    Heuristic,
    RemoteModel,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_productive: bool,
    /// Always within `0..=1`.
    pub confidence: f64,
    pub category: String,
    pub source: VerdictSource,
    #[serde(default)]
    pub details: String,
}

impl Verdict {
    pub fn new(
        is_productive: bool,
        confidence: f64,
        category: impl Into<String>,
        source: VerdictSource,
        details: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.
        } else {
            confidence.clamp(0., 1.)
        };
        Self {
            is_productive,
            confidence,
            category: category.into(),
            source,
            details: details.into(),
        }
    }

    /// Verdict for activity nothing is known about.
    pub fn unknown(details: impl Into<String>) -> Self {
        Self::new(false, 0.5, "Unknown", VerdictSource::Fallback, details)
    }

    /// Whether two verdicts disagree in a way that affects accounting.
    pub fn disagrees_with(&self, other: &Verdict) -> bool {
        self.is_productive != other.is_productive
    }
}
