//! In-memory repositories keyed by upload id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use repolens_index::{Retriever, SourceFile};
use repolens_llm::LlmProvider;
use tokio::sync::RwLock;

use crate::facts::RepositoryFacts;

/// One uploaded repository with its analysis and retrieval index.
pub struct RepositoryEntry<P: LlmProvider> {
    pub id: String,
    pub files: Vec<SourceFile>,
    pub facts: RepositoryFacts,
    pub retriever: Retriever<P>,
}

struct Slot<P: LlmProvider> {
    entry: Arc<RepositoryEntry<P>>,
    last_access: Instant,
}

pub struct RepositoryRegistry<P: LlmProvider> {
    entries: RwLock<HashMap<String, Slot<P>>>,
    idle_ttl: Option<Duration>,
}

impl<P: LlmProvider> RepositoryRegistry<P> {
    /// `idle_ttl` of `None` keeps repositories until they are removed.
    #[must_use]
    pub fn new(idle_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Store a repository under a fresh id.
    pub async fn register(
        &self,
        files: Vec<SourceFile>,
        facts: RepositoryFacts,
        retriever: Retriever<P>,
    ) -> Arc<RepositoryEntry<P>> {
        let id = uuid::Uuid::new_v4().to_string();
        let entry = Arc::new(RepositoryEntry {
            id: id.clone(),
            files,
            facts,
            retriever,
        });
        self.entries.write().await.insert(
            id,
            Slot {
                entry: Arc::clone(&entry),
                last_access: Instant::now(),
            },
        );
        entry
    }

    /// Look up a repository and mark it as recently used.
    pub async fn get(&self, id: &str) -> Option<Arc<RepositoryEntry<P>>> {
        let mut entries = self.entries.write().await;
        let slot = entries.get_mut(id)?;
        slot.last_access = Instant::now();
        Some(Arc::clone(&slot.entry))
    }

    /// Returns `true` if the repository existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Drop repositories idle longer than the configured lifetime.
    ///
    /// Returns the number of evicted repositories.
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.idle_ttl else {
            return 0;
        };
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, slot| slot.last_access.elapsed() < ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = entries.len(), "evicted idle repositories");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use repolens_index::Embedder;
    use repolens_llm::mock::MockProvider;

    use super::*;

    fn retriever() -> Retriever<MockProvider> {
        Retriever::new(Embedder::new(Arc::new(MockProvider::default())))
    }

    async fn register_one(registry: &RepositoryRegistry<MockProvider>) -> String {
        let files = vec![SourceFile::new("a.py", "x = 1\n")];
        let entry = registry
            .register(files, RepositoryFacts::default(), retriever())
            .await;
        entry.id.clone()
    }

    #[tokio::test]
    async fn register_and_get() {
        let registry = RepositoryRegistry::new(None);
        let id = register_one(&registry).await;
        let entry = registry.get(&id).await.unwrap();
        assert_eq!(entry.files[0].path, "a.py");
        assert!(registry.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let registry = RepositoryRegistry::new(None);
        let a = register_one(&registry).await;
        let b = register_one(&registry).await;
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
        assert_eq!(uuid::Uuid::parse_str(&a).unwrap().get_version_num(), 4);
    }

    #[tokio::test]
    async fn remove_reports_existence() {
        let registry = RepositoryRegistry::new(None);
        let id = register_one(&registry).await;
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn evict_idle_removes_expired() {
        let registry = RepositoryRegistry::new(Some(Duration::from_millis(1)));
        register_one(&registry).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn evict_idle_keeps_recently_used() {
        let registry = RepositoryRegistry::new(Some(Duration::from_secs(300)));
        let id = register_one(&registry).await;
        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.ids().await, vec![id]);
    }

    #[tokio::test]
    async fn eviction_disabled_without_ttl() {
        let registry = RepositoryRegistry::new(None);
        register_one(&registry).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(registry.evict_idle().await, 0);
        assert_eq!(registry.len().await, 1);
    }
}
