//! Runnable Registry - language → priority-ordered handlers

use super::traits::Runnable;
use koderunner_foundation::{Error, Result};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One handler registered for a language
#[derive(Clone)]
pub struct Registration {
    /// Language as given at registration (lookups are case-insensitive)
    pub language: String,

    pub priority: i32,

    pub runnable: Arc<dyn Runnable>,

    /// Registration order, breaks priority ties
    seq: usize,
}

/// Language buckets, each kept sorted by descending priority then
/// registration order. Immutable once published through `SharedRegistry`.
#[derive(Default)]
pub struct RunnableRegistry {
    buckets: HashMap<String, Vec<Registration>>,
    counter: usize,
}

fn language_key(language: &str) -> String {
    language.to_lowercase()
}

impl RunnableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the runnable's own language and priority
    pub fn register(&mut self, runnable: Arc<dyn Runnable>) {
        let language = runnable.language().to_string();
        let priority = runnable.priority();
        self.register_as(&language, priority, runnable);
    }

    /// Register under an explicit language and priority. Never fails;
    /// duplicates are kept.
    pub fn register_as(&mut self, language: &str, priority: i32, runnable: Arc<dyn Runnable>) {
        let seq = self.counter;
        self.counter += 1;

        debug!(
            "Registered runnable {} for {} (priority {})",
            runnable.name(),
            language,
            priority
        );

        let bucket = self.buckets.entry(language_key(language)).or_default();
        bucket.push(Registration {
            language: language.to_string(),
            priority,
            runnable,
            seq,
        });
        // stable: equal priorities keep registration order
        bucket.sort_by_key(|r| Reverse(r.priority));
    }

    /// Move every registration of `other` in here, keeping its order
    pub fn absorb(&mut self, other: RunnableRegistry) {
        let mut incoming: Vec<_> = other.buckets.into_values().flatten().collect();
        incoming.sort_by_key(|r| r.seq);
        for registration in incoming {
            self.register_as(
                &registration.language,
                registration.priority,
                registration.runnable,
            );
        }
    }

    /// Highest-priority handler for `language`
    pub fn resolve(&self, language: &str) -> Result<Arc<dyn Runnable>> {
        self.buckets
            .get(&language_key(language))
            .and_then(|bucket| bucket.first())
            .map(|r| Arc::clone(&r.runnable))
            .ok_or_else(|| Error::NotFound(language.to_string()))
    }

    /// Every handler for `language`, highest priority first. Empty when the
    /// language is unknown.
    pub fn resolve_all<'a>(
        &'a self,
        language: &str,
    ) -> impl Iterator<Item = Arc<dyn Runnable>> + 'a {
        self.buckets
            .get(&language_key(language))
            .into_iter()
            .flatten()
            .map(|r| Arc::clone(&r.runnable))
    }

    pub fn contains(&self, language: &str) -> bool {
        self.buckets.contains_key(&language_key(language))
    }

    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<_> = self.buckets.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// One line per registration, grouped by language
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for language in self.languages() {
            for r in &self.buckets[&language] {
                let description = r.runnable.description();
                if description.is_empty() {
                    lines.push(format!("{} / {} / {}", language, r.runnable.name(), r.priority));
                } else {
                    lines.push(format!(
                        "{} / {} / {} - {}",
                        language,
                        r.runnable.name(),
                        r.priority,
                        description
                    ));
                }
            }
        }
        lines
    }
}
