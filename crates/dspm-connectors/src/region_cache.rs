//! Per-region client memoization, so cross-region bucket calls don't
//! rebuild a fresh client on every request.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Caches one `T` per region string. Reads take a shared lock; a miss
/// upgrades to a write lock only long enough to insert the freshly built
/// client.
pub struct RegionClientCache<T> {
    clients: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Default for RegionClientCache<T> {
    fn default() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> RegionClientCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_insert_with<F, Fut>(&self, region: &str, build: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        if let Some(existing) = self.clients.read().await.get(region) {
            return existing.clone();
        }

        let mut guard = self.clients.write().await;
        if let Some(existing) = guard.get(region) {
            return existing.clone();
        }

        let built = Arc::new(build().await);
        guard.insert(region.to_string(), built.clone());
        built
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn builds_once_per_region() {
        let cache: RegionClientCache<String> = RegionClientCache::new();
        let builds = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let builds = builds.clone();
            cache
                .get_or_insert_with("us-east-1", || async move {
                    builds.fetch_add(1, Ordering::SeqCst);
                    "client".to_string()
                })
                .await;
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_regions_build_independently() {
        let cache: RegionClientCache<String> = RegionClientCache::new();
        let a = cache.get_or_insert_with("us-east-1", || async { "a".to_string() }).await;
        let b = cache.get_or_insert_with("eu-west-1", || async { "b".to_string() }).await;
        assert_ne!(*a, *b);
    }
}
