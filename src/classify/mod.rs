//! Turns samples of the foreground window into productivity [Verdict]s.
//!
//! There are two tiers:
//!  - [ProductivityClassifier::quick] answers from the cache and the category catalog. It never
//!    touches the network or the screen and is used on every tick.
//!  - [ProductivityClassifier::full] may read the screen and ask the remote text classifier. Its
//!    answer arrives later and is used to correct the quick one.

pub mod cache;
pub mod ocr;
pub mod remote;
pub mod verdict;
pub mod volatility;

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, instrument, warn};

use crate::{
    catalog::CategoryCatalog,
    utils::clock::Clock,
    window_api::{ActiveWindowData, Sample},
};

use cache::{CacheKey, ClassificationCache};
use ocr::ScreenReaderGate;
use remote::TextClassifier;
use verdict::{Verdict, VerdictSource};
use volatility::VolatilityClassifier;

/// Screen text beyond this many characters is not sent to the remote classifier.
pub const SCREEN_CONTEXT_LIMIT: usize = 500;

const AI_ASSISTANT_MARKERS: &[&str] = &["chatgpt", "chat.openai.com"];
const CODE_HOSTING_MARKERS: &[&str] = &["github"];

pub struct ProductivityClassifier {
    catalog: CategoryCatalog,
    volatility: VolatilityClassifier,
    cache: Mutex<ClassificationCache>,
    remote: Arc<dyn TextClassifier>,
    screen: ScreenReaderGate,
    clock: Arc<dyn Clock>,
}

impl ProductivityClassifier {
    pub fn new(
        catalog: CategoryCatalog,
        volatility: VolatilityClassifier,
        cache: ClassificationCache,
        remote: Arc<dyn TextClassifier>,
        screen: ScreenReaderGate,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            volatility,
            cache: Mutex::new(cache),
            remote,
            screen,
            clock,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// Cheap verdict for the tick loop. Dynamic content is keyed by its title here, since reading
    /// the screen is not allowed on this path.
    pub fn quick(&self, sample: &Sample) -> Verdict {
        let Some(window) = &sample.window else {
            return Verdict::unknown("No foreground window");
        };
        let (process, title) = (&*window.process_name, &*window.window_title);

        let key = if self.volatility.is_dynamic(process, title) {
            CacheKey::for_dynamic(process, title, title)
        } else {
            CacheKey::for_static(process, title)
        };
        let cached = self.lock_cache().get(&key, self.clock.instant());
        if let Some(cached) = cached {
            return cached;
        }

        if self.matches_catalog(window) {
            Verdict::new(
                true,
                0.7,
                self.catalog.resolve(process, title),
                VerdictSource::AppList,
                "Quick analysis",
            )
        } else {
            Verdict::unknown("Quick analysis")
        }
    }

    /// Thorough verdict. Never fails: every problem on the way degrades to
    /// [ProductivityClassifier::fallback].
    #[instrument(skip(self, sample), fields(process = sample.process_name()))]
    pub async fn full(&self, sample: &Sample) -> Verdict {
        let Some(window) = &sample.window else {
            return self.fallback(sample);
        };
        let (process, title) = (&*window.process_name, &*window.window_title);
        let is_dynamic = self.volatility.is_dynamic(process, title);

        // The fingerprint of dynamic content depends on what is on screen, so the screen has to be
        // read before the cache can answer.
        let mut screen_text = None;
        let key = if is_dynamic {
            screen_text = self.screen.try_read(self.clock.instant()).await;
            CacheKey::for_dynamic(process, title, screen_text.as_deref().unwrap_or(title))
        } else {
            CacheKey::for_static(process, title)
        };

        let cached = self.lock_cache().get(&key, self.clock.instant());
        if let Some(cached) = cached {
            debug!(
                is_productive = cached.is_productive,
                category = %cached.category,
                is_dynamic,
                "Using cached result"
            );
            return cached;
        }

        let used_screen = screen_text.is_some();
        let verdict = match self.classify_locally(window) {
            Some(verdict) => verdict,
            None => {
                if !is_dynamic {
                    screen_text = self.screen.try_read(self.clock.instant()).await;
                }
                self.classify_remotely(sample, window, screen_text.as_deref())
                    .await
            }
        };

        info!(
            process,
            title,
            is_productive = verdict.is_productive,
            confidence = verdict.confidence,
            category = %verdict.category,
            source = ?verdict.source,
            has_ocr = used_screen || screen_text.is_some(),
            "Analyzed activity"
        );

        self.lock_cache()
            .put(key, verdict.clone(), self.clock.instant());
        verdict
    }

    /// Verdict from the app list alone. Used whenever the richer tiers fail.
    pub fn fallback(&self, sample: &Sample) -> Verdict {
        let Some(window) = &sample.window else {
            return Verdict::unknown("Fallback due to missing window info");
        };
        let is_productive = self.catalog.is_known_productive_app(&window.process_name);
        Verdict::new(
            is_productive,
            if is_productive { 0.7 } else { 0.5 },
            self.catalog
                .resolve(&window.process_name, &window.window_title),
            VerdictSource::Fallback,
            "Using predefined app list",
        )
    }

    /// Known apps and well-known sites don't need the remote classifier.
    fn classify_locally(&self, window: &ActiveWindowData) -> Option<Verdict> {
        let (process, title) = (&*window.process_name, &*window.window_title);
        if self.matches_catalog(window) {
            return Some(Verdict::new(
                true,
                0.9,
                self.catalog.resolve(process, title),
                VerdictSource::AppList,
                "App-based classification",
            ));
        }

        let title = title.to_lowercase();
        if AI_ASSISTANT_MARKERS.iter().any(|v| title.contains(v)) {
            return Some(Verdict::new(
                true,
                0.85,
                "Development Tools",
                VerdictSource::Heuristic,
                "AI-assisted development",
            ));
        }
        if CODE_HOSTING_MARKERS.iter().any(|v| title.contains(v)) {
            return Some(Verdict::new(
                true,
                0.9,
                "Development",
                VerdictSource::Heuristic,
                "Code repository work",
            ));
        }
        None
    }

    async fn classify_remotely(
        &self,
        sample: &Sample,
        window: &ActiveWindowData,
        screen_text: Option<&str>,
    ) -> Verdict {
        let context = build_context(window, screen_text);
        match self.remote.classify(&context).await {
            Ok(scores) => Verdict::new(
                scores.is_productive(),
                scores.top_score(),
                self.catalog
                    .resolve(&window.process_name, &window.window_title),
                VerdictSource::RemoteModel,
                format!("AI classification ({})", scores.top_label()),
            ),
            Err(e) => {
                warn!("Classification failed, falling back to the app list: {e}");
                self.fallback(sample)
            }
        }
    }

    fn matches_catalog(&self, window: &ActiveWindowData) -> bool {
        self.catalog.is_known_productive_app(&window.process_name)
            || self.catalog.title_mentions_member(&window.window_title)
    }

    fn lock_cache(&self) -> MutexGuard<'_, ClassificationCache> {
        // A panic while holding the lock can't leave a half-written entry behind, so the cache is
        // still usable.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Text submitted to the remote classifier.
fn build_context(window: &ActiveWindowData, screen_text: Option<&str>) -> String {
    let mut context = format!(
        "Application Context:\n\
         - Program: {}\n\
         - Window: {}\n",
        window.process_name, window.window_title
    );
    if let Some(text) = screen_text {
        let text: String = text.chars().take(SCREEN_CONTEXT_LIMIT).collect();
        context.push_str(&format!("- Screen Content: {text}\n"));
    }
    context.push_str(
        "\nTask Analysis:\n\
         This application/website is being used for:\n\
         - Learning and skill development\n\
         - Professional work and research\n\
         - Project development and coding\n\
         - Educational content consumption\n\
         - Technical documentation and learning\n\
         - Professional communication\n\
         - Work-related research\n\
         \n\
         Considering these aspects, determine if this is a productive work/learning activity.",
    );
    context
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use mockall::predicate::function;

    use crate::{
        catalog::CategoryCatalog,
        utils::{clock::DefaultClock, logging::TEST_LOGGING},
        window_api::{ActiveWindowData, Sample},
    };

    use super::{
        build_context,
        cache::ClassificationCache,
        ocr::{MockScreenReader, ScreenReader, ScreenReaderGate},
        remote::{LabelScores, MockTextClassifier, RemoteError, TextClassifier, LEISURE_LABEL, PRODUCTIVE_WORK_LABEL},
        verdict::VerdictSource,
        volatility::VolatilityClassifier,
        ProductivityClassifier, SCREEN_CONTEXT_LIMIT,
    };

    const STATIC_TTL: Duration = Duration::from_secs(300);
    const DYNAMIC_TTL: Duration = Duration::from_secs(10);

    fn classifier(remote: impl TextClassifier + 'static, screen: ScreenReaderGate) -> ProductivityClassifier {
        ProductivityClassifier::new(
            CategoryCatalog::default(),
            VolatilityClassifier::default(),
            ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL),
            Arc::new(remote),
            screen,
            Arc::new(DefaultClock),
        )
    }

    fn sample(process: &str, title: &str) -> Sample {
        Sample::observed(
            ActiveWindowData::new(process, title),
            Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap(),
        )
    }

    fn leisure() -> LabelScores {
        LabelScores {
            labels: vec![LEISURE_LABEL.into(), PRODUCTIVE_WORK_LABEL.into()],
            scores: vec![0.35, 0.3],
        }
    }

    fn work() -> LabelScores {
        LabelScores {
            labels: vec![PRODUCTIVE_WORK_LABEL.into(), LEISURE_LABEL.into()],
            scores: vec![0.8, 0.1],
        }
    }

    /// Collaborator that never answers.
    struct Hanging;

    #[async_trait]
    impl TextClassifier for Hanging {
        async fn classify(&self, _text: &str) -> Result<LabelScores, RemoteError> {
            std::future::pending().await
        }
    }

    #[async_trait]
    impl ScreenReader for Hanging {
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn read_screen(&self) -> anyhow::Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_never_waits_for_remote_or_ocr() {
        *TEST_LOGGING;
        let screen = ScreenReaderGate::new(Arc::new(Hanging), true, Duration::ZERO);
        let classifier = classifier(Hanging, screen);

        let verdict = classifier.quick(&sample("firefox", "Some news - youtube.com"));
        assert!(!verdict.is_productive);
        assert_eq!(verdict.category, "Unknown");

        let verdict = classifier.quick(&sample("code", "main.rs"));
        assert!(verdict.is_productive);
        assert_eq!(verdict.confidence, 0.7);
        assert_eq!(verdict.source, VerdictSource::AppList);
        assert_eq!(verdict.category, "Development");

        // The full tier really is stuck on the collaborators.
        let news = sample("firefox", "Some news - youtube.com");
        let full = classifier.full(&news);
        assert!(tokio::time::timeout(Duration::from_secs(60), full).await.is_err());
    }

    #[tokio::test]
    async fn test_quick_unknown_window() {
        let classifier = classifier(MockTextClassifier::new(), ScreenReaderGate::disabled());
        let verdict = classifier.quick(&Sample::unknown(Utc::now()));
        assert!(!verdict.is_productive);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.category, "Unknown");
    }

    #[tokio::test]
    async fn test_full_known_app_skips_remote() {
        let mut remote = MockTextClassifier::new();
        remote.expect_classify().never();
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let verdict = classifier.full(&sample("slack", "general")).await;
        assert!(verdict.is_productive);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.source, VerdictSource::AppList);
    }

    #[tokio::test]
    async fn test_full_overrides_for_assistants_and_code_hosting() {
        let mut remote = MockTextClassifier::new();
        remote.expect_classify().never();
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let verdict = classifier.full(&sample("firefox", "ChatGPT")).await;
        assert!(verdict.is_productive);
        assert_eq!(verdict.confidence, 0.85);
        assert_eq!(verdict.category, "Development Tools");
        assert_eq!(verdict.source, VerdictSource::Heuristic);

        let verdict = classifier.full(&sample("firefox", "tokio-rs/tokio - GitHub")).await;
        assert!(verdict.is_productive);
        assert_eq!(verdict.confidence, 0.9);
        assert_eq!(verdict.category, "Development");
    }

    #[tokio::test]
    async fn test_full_uses_remote_decision() {
        let mut remote = MockTextClassifier::new();
        remote
            .expect_classify()
            .with(function(|text: &str| text.contains("- Window: Cat videos")))
            .times(1)
            .returning(|_| Ok(leisure()));
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let verdict = classifier.full(&sample("firefox", "Cat videos")).await;
        assert!(!verdict.is_productive);
        assert_eq!(verdict.confidence, 0.35);
        assert_eq!(verdict.source, VerdictSource::RemoteModel);
        assert_eq!(verdict.category, "Uncategorized");

        // Second lookup is answered by the cache.
        let cached = classifier.full(&sample("firefox", "Cat videos")).await;
        assert_eq!(cached, verdict);
    }

    #[tokio::test]
    async fn test_leisure_titles_sharing_words_with_executables_go_to_remote() {
        let mut remote = MockTextClassifier::new();
        remote.expect_classify().times(4).returning(|_| Ok(leisure()));
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        for title in [
            "Hello Kitty cartoon - YouTube",
            "The Da Vinci Code trailer - Netflix",
            "Cooking ideas for dinner",
            "Best football teams 2024",
        ] {
            let quick = classifier.quick(&sample("firefox", title));
            assert!(!quick.is_productive, "{title}");

            let verdict = classifier.full(&sample("firefox", title)).await;
            assert!(!verdict.is_productive, "{title}");
            assert_eq!(verdict.source, VerdictSource::RemoteModel, "{title}");
            assert_eq!(verdict.category, "Uncategorized", "{title}");
        }
    }

    #[tokio::test]
    async fn test_full_remote_failure_falls_back() {
        let mut remote = MockTextClassifier::new();
        remote
            .expect_classify()
            .returning(|_| Err(RemoteError::Service("Model is loading".into())));
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let verdict = classifier.full(&sample("firefox", "Weather")).await;
        assert!(!verdict.is_productive);
        assert_eq!(verdict.confidence, 0.5);
        assert_eq!(verdict.source, VerdictSource::Fallback);
    }

    #[tokio::test]
    async fn test_full_without_window_falls_back() {
        let mut remote = MockTextClassifier::new();
        remote.expect_classify().never();
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let verdict = classifier.full(&Sample::unknown(Utc::now())).await;
        assert_eq!(verdict.category, "Unknown");
        assert_eq!(verdict.source, VerdictSource::Fallback);
    }

    #[tokio::test]
    async fn test_full_dynamic_content_is_fingerprinted_by_screen_text() {
        let mut screen = MockScreenReader::new();
        screen.expect_initialize().returning(|| Ok(()));
        let mut pages = vec!["Linear algebra, lecture 3", "Funny cats compilation"].into_iter();
        screen
            .expect_read_screen()
            .times(2)
            .returning(move || Ok(pages.next().unwrap_or_default().to_string()));

        let mut remote = MockTextClassifier::new();
        remote
            .expect_classify()
            .with(function(|text: &str| text.contains("Linear algebra")))
            .times(1)
            .returning(|_| Ok(work()));
        remote
            .expect_classify()
            .with(function(|text: &str| text.contains("Funny cats")))
            .times(1)
            .returning(|_| Ok(leisure()));

        let gate = ScreenReaderGate::new(Arc::new(screen), true, Duration::ZERO);
        let classifier = classifier(remote, gate);

        let first = classifier.full(&sample("firefox", "YouTube - youtube.com")).await;
        let second = classifier.full(&sample("firefox", "YouTube - youtube.com")).await;
        assert!(first.is_productive);
        assert!(!second.is_productive);
    }

    #[tokio::test]
    async fn test_ocr_failure_still_classifies() {
        let mut screen = MockScreenReader::new();
        screen.expect_initialize().returning(|| Ok(()));
        screen
            .expect_read_screen()
            .returning(|| Err(anyhow!("no display")));
        let mut remote = MockTextClassifier::new();
        remote
            .expect_classify()
            .with(function(|text: &str| !text.contains("Screen Content")))
            .returning(|_| Ok(work()));

        let gate = ScreenReaderGate::new(Arc::new(screen), true, Duration::ZERO);
        let classifier = classifier(remote, gate);
        let verdict = classifier.full(&sample("firefox", "Quarterly planning")).await;
        assert!(verdict.is_productive);
        assert_eq!(verdict.source, VerdictSource::RemoteModel);
    }

    #[tokio::test]
    async fn test_quick_reads_full_results_from_cache() {
        let mut remote = MockTextClassifier::new();
        remote.expect_classify().times(1).returning(|_| Ok(work()));
        let classifier = classifier(remote, ScreenReaderGate::disabled());

        let sample = sample("firefox", "Quarterly planning");
        assert!(!classifier.quick(&sample).is_productive);
        classifier.full(&sample).await;
        let quick = classifier.quick(&sample);
        assert!(quick.is_productive);
        assert_eq!(quick.source, VerdictSource::RemoteModel);
    }

    #[test]
    fn test_context_truncates_screen_text() {
        let window = ActiveWindowData::new("firefox", "Docs");
        let long = "x".repeat(SCREEN_CONTEXT_LIMIT * 2);
        let context = build_context(&window, Some(&long));
        assert!(context.contains(&"x".repeat(SCREEN_CONTEXT_LIMIT)));
        assert!(!context.contains(&"x".repeat(SCREEN_CONTEXT_LIMIT + 1)));
        assert!(context.contains("- Program: firefox"));
    }
}
