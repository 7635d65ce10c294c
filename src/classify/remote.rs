//! Client for the zero-shot text classification service used by the full classification tier.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const PRODUCTIVE_WORK_LABEL: &str = "productive learning or work activity";
pub const PROFESSIONAL_DEVELOPMENT_LABEL: &str = "educational or professional development";
pub const WORK_RESEARCH_LABEL: &str = "work-related research or documentation";
pub const LEISURE_LABEL: &str = "non-productive leisure activity";

/// Labels requested from the service, in request order.
pub const CANDIDATE_LABELS: [&str; 4] = [
    PRODUCTIVE_WORK_LABEL,
    PROFESSIONAL_DEVELOPMENT_LABEL,
    WORK_RESEARCH_LABEL,
    LEISURE_LABEL,
];

pub const PRODUCTIVE_LABELS: [&str; 3] = [
    PRODUCTIVE_WORK_LABEL,
    PROFESSIONAL_DEVELOPMENT_LABEL,
    WORK_RESEARCH_LABEL,
];

/// The top label has to score above this for anything to count as productive.
pub const PRODUCTIVE_SCORE_THRESHOLD: f64 = 0.4;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service responded with an error: {0}")]
    Service(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Labels with their scores, ordered from the highest score down.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScores {
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

impl LabelScores {
    /// Parses the service reply. Error payloads and replies without matching, non-empty
    /// labels and scores are rejected.
    pub fn from_response(value: serde_json::Value) -> Result<Self, RemoteError> {
        #[derive(Deserialize)]
        struct Reply {
            error: Option<serde_json::Value>,
            labels: Option<Vec<String>>,
            scores: Option<Vec<f64>>,
        }

        let reply: Reply = serde_json::from_value(value)
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        if let Some(error) = reply.error {
            return Err(RemoteError::Service(error.to_string()));
        }
        let (Some(labels), Some(scores)) = (reply.labels, reply.scores) else {
            return Err(RemoteError::Malformed("labels or scores are missing".into()));
        };
        if labels.is_empty() || labels.len() != scores.len() {
            return Err(RemoteError::Malformed(format!(
                "{} labels for {} scores",
                labels.len(),
                scores.len()
            )));
        }
        Ok(Self { labels, scores })
    }

    pub fn top_label(&self) -> &str {
        &self.labels[0]
    }

    pub fn top_score(&self) -> f64 {
        self.scores[0]
    }

    /// Productive when one of the two best labels is a productive one and the best score clears
    /// [PRODUCTIVE_SCORE_THRESHOLD].
    pub fn is_productive(&self) -> bool {
        let productive_in_top = self
            .labels
            .iter()
            .take(2)
            .any(|label| PRODUCTIVE_LABELS.contains(&label.as_str()));
        productive_in_top && self.top_score() > PRODUCTIVE_SCORE_THRESHOLD
    }
}

/// Remote multi-label classifier scoring text against [CANDIDATE_LABELS]. Implementations must not
/// panic; every failure is reported as a [RemoteError] so the caller can degrade.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<LabelScores, RemoteError>;
}

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    multi_label: bool,
}

/// [TextClassifier] talking to a Hugging Face style inference endpoint.
pub struct HttpTextClassifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpTextClassifier {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            token,
        }
    }
}

#[async_trait]
impl TextClassifier for HttpTextClassifier {
    async fn classify(&self, text: &str) -> Result<LabelScores, RemoteError> {
        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels: &CANDIDATE_LABELS,
                multi_label: true,
            },
        };
        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Classification service answered with {status}");
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        LabelScores::from_response(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LabelScores, RemoteError, LEISURE_LABEL, PRODUCTIVE_WORK_LABEL, WORK_RESEARCH_LABEL};

    fn scores(labels: &[&str], scores: &[f64]) -> LabelScores {
        LabelScores {
            labels: labels.iter().map(|v| v.to_string()).collect(),
            scores: scores.to_vec(),
        }
    }

    #[test]
    fn test_productive_label_on_top() {
        assert!(scores(&[PRODUCTIVE_WORK_LABEL, LEISURE_LABEL], &[0.8, 0.1]).is_productive());
    }

    #[test]
    fn test_productive_label_second() {
        assert!(scores(&[LEISURE_LABEL, WORK_RESEARCH_LABEL], &[0.6, 0.5]).is_productive());
    }

    #[test]
    fn test_low_top_score_is_not_productive() {
        assert!(!scores(&[PRODUCTIVE_WORK_LABEL, LEISURE_LABEL], &[0.4, 0.3]).is_productive());
    }

    #[test]
    fn test_productive_label_third_is_ignored() {
        let result = scores(
            &[LEISURE_LABEL, "something else", PRODUCTIVE_WORK_LABEL],
            &[0.9, 0.5, 0.4],
        );
        assert!(!result.is_productive());
    }

    #[test]
    fn test_parse_response() -> anyhow::Result<()> {
        let parsed = LabelScores::from_response(json!({
            "sequence": "Application: code",
            "labels": [PRODUCTIVE_WORK_LABEL, LEISURE_LABEL],
            "scores": [0.9, 0.05],
        }))?;
        assert_eq!(parsed.top_label(), PRODUCTIVE_WORK_LABEL);
        assert_eq!(parsed.top_score(), 0.9);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_error_and_malformed() {
        assert!(matches!(
            LabelScores::from_response(json!({"error": "Model is loading"})),
            Err(RemoteError::Service(_))
        ));
        assert!(matches!(
            LabelScores::from_response(json!({"labels": [LEISURE_LABEL]})),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            LabelScores::from_response(json!({"labels": [], "scores": []})),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            LabelScores::from_response(json!({"labels": [LEISURE_LABEL], "scores": ["high"]})),
            Err(RemoteError::Malformed(_))
        ));
        assert!(matches!(
            LabelScores::from_response(json!([1, 2, 3])),
            Err(RemoteError::Malformed(_))
        ));
    }
}
