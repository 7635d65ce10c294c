use std::{collections::HashMap, hash::Hasher, time::Duration};

use tokio::time::Instant;

use super::verdict::Verdict;

/// Builds cache keys. Static content is identified by process and title alone, dynamic content
/// additionally by a fingerprint of what is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Static { process: String, title: String },
    Dynamic { process: String, title: String, fingerprint: u64 },
}

impl CacheKey {
    pub fn for_static(process: &str, title: &str) -> Self {
        Self::Static {
            process: process.into(),
            title: title.into(),
        }
    }

    /// `content` is the on-screen text when it could be read, otherwise the window title.
    pub fn for_dynamic(process: &str, title: &str, content: &str) -> Self {
        Self::Dynamic {
            process: process.into(),
            title: title.into(),
            fingerprint: fingerprint(content),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

/// FNV-1a over the text. Only collision avoidance matters here, not resistance to tampering.
pub fn fingerprint(content: &str) -> u64 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(content.as_bytes());
    hasher.finish()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    verdict: Verdict,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_alive(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

/// Time-bounded memo of verdicts. A lookup evicts the dead entry it finds, and every insertion
/// sweeps all dead entries.
#[derive(Debug)]
pub struct ClassificationCache {
    entries: HashMap<CacheKey, CacheEntry>,
    static_ttl: Duration,
    dynamic_ttl: Duration,
}

impl ClassificationCache {
    pub fn new(static_ttl: Duration, dynamic_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            static_ttl,
            dynamic_ttl,
        }
    }

    pub fn get(&mut self, key: &CacheKey, now: Instant) -> Option<Verdict> {
        match self.entries.get(key) {
            Some(entry) if entry.is_alive(now) => Some(entry.verdict.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a verdict, replacing whatever was stored under the key.
    pub fn put(&mut self, key: CacheKey, verdict: Verdict, now: Instant) {
        self.entries.retain(|_, entry| entry.is_alive(now));
        let ttl = if key.is_dynamic() {
            self.dynamic_ttl
        } else {
            self.static_ttl
        };
        self.entries.insert(
            key,
            CacheEntry {
                verdict,
                created_at: now,
                ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::classify::verdict::{Verdict, VerdictSource};

    use super::{CacheKey, ClassificationCache};

    const STATIC_TTL: Duration = Duration::from_secs(300);
    const DYNAMIC_TTL: Duration = Duration::from_secs(10);
    const EPSILON: Duration = Duration::from_millis(1);

    fn verdict() -> Verdict {
        Verdict::new(true, 0.9, "Development", VerdictSource::AppList, "")
    }

    #[test]
    fn test_static_key_expiry() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let key = CacheKey::for_static("code", "main.rs");
        let inserted = Instant::now();
        cache.put(key.clone(), verdict(), inserted);

        assert_eq!(cache.get(&key, inserted + STATIC_TTL - EPSILON), Some(verdict()));
        assert_eq!(cache.get(&key, inserted + STATIC_TTL + EPSILON), None);
        // Expired entries are evicted by the lookup that found them dead.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_dynamic_key_expiry() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let key = CacheKey::for_dynamic("firefox", "YouTube", "lecture 1");
        let inserted = Instant::now();
        cache.put(key.clone(), verdict(), inserted);

        assert!(cache.get(&key, inserted + DYNAMIC_TTL - EPSILON).is_some());
        assert!(cache.get(&key, inserted + DYNAMIC_TTL + EPSILON).is_none());
    }

    #[test]
    fn test_dynamic_keys_with_different_content_never_collide() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let now = Instant::now();
        let lecture = CacheKey::for_dynamic("firefox", "YouTube", "Linear algebra lecture");
        let music = CacheKey::for_dynamic("firefox", "YouTube", "Top 40 hits");
        assert_ne!(lecture, music);

        cache.put(lecture.clone(), verdict(), now);
        assert!(cache.get(&music, now).is_none());
        assert!(cache.get(&lecture, now).is_some());
    }

    #[test]
    fn test_static_and_dynamic_keys_are_distinct() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let now = Instant::now();
        cache.put(CacheKey::for_static("firefox", "YouTube"), verdict(), now);
        assert!(cache
            .get(&CacheKey::for_dynamic("firefox", "YouTube", "YouTube"), now)
            .is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let now = Instant::now();
        let key = CacheKey::for_static("firefox", "News");
        cache.put(key.clone(), verdict(), now);
        let replaced = Verdict::unknown("replaced");
        cache.put(key.clone(), replaced.clone(), now);
        assert_eq!(cache.get(&key, now), Some(replaced));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_sweeps_expired_entries() {
        let mut cache = ClassificationCache::new(STATIC_TTL, DYNAMIC_TTL);
        let start = Instant::now();
        for frame in 0..50 {
            let content = format!("frame {frame}");
            cache.put(
                CacheKey::for_dynamic("firefox", "YouTube", &content),
                verdict(),
                start,
            );
        }
        let editor = CacheKey::for_static("code", "main.rs");
        cache.put(editor.clone(), verdict(), start);
        assert_eq!(cache.len(), 51);

        // None of the dynamic keys is ever looked up again.
        let later = start + DYNAMIC_TTL + EPSILON;
        cache.put(CacheKey::for_static("code", "lib.rs"), verdict(), later);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&editor, later).is_some());
    }
}
