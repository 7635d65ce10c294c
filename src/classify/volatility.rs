/// Identifiers of applications and sites where what's on screen matters more than the app itself.
/// A browser showing a lecture and the same browser showing a music video are both "youtube.com".
pub const DYNAMIC_APPS: &[&str] = &[
    "youtube.com",
    "spotify",
    "netflix",
    "twitch",
    "udemy",
    "coursera",
    "pluralsight",
    "chatgpt",
    "chat.openai.com",
    "github.com",
    "stackoverflow.com",
    "docs.microsoft.com",
    "developer.mozilla.org",
    "medium.com",
];

/// Tells dynamic content apart from static content. Dynamic content gets short cache lifetimes and
/// content fingerprints in its cache keys.
#[derive(Debug, Clone)]
pub struct VolatilityClassifier {
    identifiers: Vec<String>,
}

impl VolatilityClassifier {
    pub fn new(identifiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            identifiers: identifiers
                .into_iter()
                .map(|v| v.into().to_lowercase())
                .collect(),
        }
    }

    /// True when the process name is one of the identifiers or the window title mentions one.
    pub fn is_dynamic(&self, process_name: &str, window_title: &str) -> bool {
        let process_name = process_name.to_lowercase();
        let window_title = window_title.to_lowercase();
        self.identifiers
            .iter()
            .any(|id| *id == process_name || window_title.contains(id.as_str()))
    }
}

impl Default for VolatilityClassifier {
    fn default() -> Self {
        Self::new(DYNAMIC_APPS.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::VolatilityClassifier;

    #[test]
    fn test_dynamic_by_process_name() {
        let classifier = VolatilityClassifier::default();
        assert!(classifier.is_dynamic("Spotify", "Daily Mix 1"));
        assert!(!classifier.is_dynamic("spotify-launcher", "Settings"));
    }

    #[test]
    fn test_dynamic_by_title() {
        let classifier = VolatilityClassifier::default();
        assert!(classifier.is_dynamic("firefox", "Rust tutorial - youtube.com"));
        assert!(classifier.is_dynamic("chrome", "ChatGPT"));
        assert!(!classifier.is_dynamic("code", "main.rs - worktracker"));
    }
}
