//! Process-local registry of document identifiers known to have indexed chunks.

use tokio::sync::{Mutex, MutexGuard};

/// Insertion-ordered, duplicate-free set of source identifiers.
///
/// Starts empty. Single-call helpers lock internally; callers that must keep the registry in
/// step with a vector store mutation take [`CorpusRegistry::lock`] and hold the guard across it.
#[derive(Debug, Default)]
pub struct CorpusRegistry {
    sources: Mutex<Vec<String>>,
}

/// Exclusive access to the registry contents.
pub struct RegistryGuard<'a> {
    sources: MutexGuard<'a, Vec<String>>,
}

impl CorpusRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire exclusive access; concurrent ingest, delete and reset serialize here.
    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            sources: self.sources.lock().await,
        }
    }

    /// Register `source`; returns `false` when it was already present.
    pub async fn add(&self, source: &str) -> bool {
        self.lock().await.add(source)
    }

    /// Unregister `source`; returns `false` when it was not present.
    pub async fn remove(&self, source: &str) -> bool {
        self.lock().await.remove(source)
    }

    /// Snapshot of registered sources in first-ingested order.
    pub async fn list(&self) -> Vec<String> {
        self.lock().await.list()
    }

    /// Whether `source` is registered.
    pub async fn contains(&self, source: &str) -> bool {
        self.lock().await.contains(source)
    }

    /// Remove every source.
    pub async fn reset(&self) {
        self.lock().await.reset();
    }
}

impl RegistryGuard<'_> {
    /// Register `source`; returns `false` when it was already present.
    pub fn add(&mut self, source: &str) -> bool {
        if self.contains(source) {
            return false;
        }
        self.sources.push(source.to_string());
        true
    }

    /// Unregister `source`; returns `false` when it was not present.
    pub fn remove(&mut self, source: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|known| known != source);
        self.sources.len() != before
    }

    /// Snapshot of registered sources in first-ingested order.
    pub fn list(&self) -> Vec<String> {
        self.sources.clone()
    }

    /// Whether `source` is registered.
    pub fn contains(&self, source: &str) -> bool {
        self.sources.iter().any(|known| known == source)
    }

    /// Remove every source.
    pub fn reset(&mut self) {
        self.sources.clear();
    }
}
