use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clawarts_core::board::{TickProject, TickTask};

use crate::config::CacheConfig;

/// Cache key types for the polled board reads
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum CacheKey {
    Projects,
    ProjectTasks { slug: String },
}

/// Cached value wrapper
#[derive(Debug, Clone)]
pub enum CacheValue {
    Projects(Vec<TickProject>),
    ProjectTasks(Option<(TickProject, Vec<TickTask>)>),
}

/// Read cache in front of the board tables. The dashboard polls these
/// endpoints; entries are dropped on every sync or delete.
///
/// Loads are tagged with the generation seen before reading the store. Every
/// invalidation bumps the generation first, so a load that raced a sync
/// evicts its own insert instead of serving stale rows until the TTL.
#[derive(Clone)]
pub struct BoardCache {
    cache: Cache<CacheKey, CacheValue>,
    generation: Arc<AtomicU64>,
}

impl BoardCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Read before loading from the store and pass to the matching `set_*`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    async fn insert_if_fresh(&self, key: CacheKey, value: CacheValue, seen: u64) {
        self.cache.insert(key.clone(), value).await;
        if self.generation() != seen {
            tracing::debug!(key = ?key, "Board changed during load, dropping cached entry");
            self.cache.invalidate(&key).await;
        }
    }

    pub async fn get_projects(&self) -> Option<Vec<TickProject>> {
        self.cache.get(&CacheKey::Projects).await.and_then(|v| {
            if let CacheValue::Projects(data) = v {
                Some(data)
            } else {
                None
            }
        })
    }

    pub async fn set_projects(&self, data: Vec<TickProject>, seen: u64) {
        self.insert_if_fresh(CacheKey::Projects, CacheValue::Projects(data), seen)
            .await;
    }

    /// Outer `None` is a miss; inner `None` is a cached unknown project
    pub async fn get_project_tasks(&self, slug: &str) -> Option<Option<(TickProject, Vec<TickTask>)>> {
        let key = CacheKey::ProjectTasks {
            slug: slug.to_string(),
        };

        self.cache.get(&key).await.and_then(|v| {
            if let CacheValue::ProjectTasks(data) = v {
                Some(data)
            } else {
                None
            }
        })
    }

    pub async fn set_project_tasks(
        &self,
        slug: &str,
        data: Option<(TickProject, Vec<TickTask>)>,
        seen: u64,
    ) {
        let key = CacheKey::ProjectTasks {
            slug: slug.to_string(),
        };
        self.insert_if_fresh(key, CacheValue::ProjectTasks(data), seen)
            .await;
    }

    /// Drop the project list and one project's task list
    pub async fn invalidate_project(&self, slug: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate(&CacheKey::Projects).await;
        self.cache
            .invalidate(&CacheKey::ProjectTasks {
                slug: slug.to_string(),
            })
            .await;
        tracing::debug!(slug = %slug, "Board cache invalidated");
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
