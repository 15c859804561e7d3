//! Run-scoped memoization of governance reads.
//!
//! Successful results are kept per `(resource, argument)` until
//! [`CachedSource::clear`] is called. Failures are never stored, so the next
//! call retries the upstream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::schema::{Bundle, Goal, Policy, Project, RegisteredModel};
use crate::source::GovernanceSource;
use crate::Result;

#[derive(Debug, Default)]
struct Entries {
    bundles: Option<Vec<Bundle>>,
    projects: Option<Vec<Project>>,
    registered_models: Option<Vec<RegisteredModel>>,
    policies: HashMap<String, Policy>,
    goals: HashMap<String, Vec<Goal>>,
}

/// Hit/miss counters of a [`CachedSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Memoizing wrapper around any [`GovernanceSource`]
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    entries: Mutex<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: GovernanceSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        CachedSource {
            inner,
            entries: Mutex::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The wrapped source
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Drop every memoized result (the "refresh" action).
    pub fn clear(&self) {
        *self.lock() = Entries::default();
        debug!(event = "cache.cleared");
    }

    /// Current hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // Entries are only ever replaced whole; a poisoned guard is still consistent.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn hit<T>(&self, resource: &str, value: T) -> T {
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!(resource = resource, "cache hit");
        value
    }

    fn miss(&self, resource: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(resource = resource, "cache miss");
    }
}

#[async_trait]
impl<S: GovernanceSource> GovernanceSource for CachedSource<S> {
    async fn fetch_bundles(&self) -> Result<Vec<Bundle>> {
        let cached = self.lock().bundles.clone();
        if let Some(cached) = cached {
            return Ok(self.hit("bundles", cached));
        }
        self.miss("bundles");
        let fresh = self.inner.fetch_bundles().await?;
        self.lock().bundles = Some(fresh.clone());
        Ok(fresh)
    }

    async fn fetch_policy(&self, policy_id: &str) -> Result<Policy> {
        let cached = self.lock().policies.get(policy_id).cloned();
        if let Some(cached) = cached {
            return Ok(self.hit("policy", cached));
        }
        self.miss("policy");
        let fresh = self.inner.fetch_policy(policy_id).await?;
        self.lock()
            .policies
            .insert(policy_id.to_string(), fresh.clone());
        Ok(fresh)
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>> {
        let cached = self.lock().projects.clone();
        if let Some(cached) = cached {
            return Ok(self.hit("projects", cached));
        }
        self.miss("projects");
        let fresh = self.inner.fetch_projects().await?;
        self.lock().projects = Some(fresh.clone());
        Ok(fresh)
    }

    async fn fetch_registered_models(&self) -> Result<Vec<RegisteredModel>> {
        let cached = self.lock().registered_models.clone();
        if let Some(cached) = cached {
            return Ok(self.hit("registered_models", cached));
        }
        self.miss("registered_models");
        let fresh = self.inner.fetch_registered_models().await?;
        self.lock().registered_models = Some(fresh.clone());
        Ok(fresh)
    }

    async fn fetch_project_goals(&self, project_id: &str) -> Result<Vec<Goal>> {
        let cached = self.lock().goals.get(project_id).cloned();
        if let Some(cached) = cached {
            return Ok(self.hit("goals", cached));
        }
        self.miss("goals");
        let fresh = self.inner.fetch_project_goals(project_id).await?;
        self.lock()
            .goals
            .insert(project_id.to_string(), fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        fail_projects: bool,
    }

    #[async_trait]
    impl GovernanceSource for CountingSource {
        async fn fetch_bundles(&self) -> Result<Vec<Bundle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Bundle {
                id: "b1".to_string(),
                name: Some("bundle".to_string()),
                state: None,
                stage: None,
                policy_id: None,
                policy_name: None,
                project_id: None,
                project_name: None,
                project_owner: None,
                created_by: None,
                attachments: Vec::new(),
            }])
        }

        async fn fetch_policy(&self, policy_id: &str) -> Result<Policy> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Policy {
                id: policy_id.to_string(),
                name: format!("policy {policy_id}"),
                stages: Vec::new(),
            })
        }

        async fn fetch_projects(&self) -> Result<Vec<Project>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_projects {
                return Err(ApiError::Transport("connection refused".to_string()));
            }
            Ok(Vec::new())
        }

        async fn fetch_registered_models(&self) -> Result<Vec<RegisteredModel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn fetch_project_goals(&self, _project_id: &str) -> Result<Vec<Goal>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Goal::default()])
        }
    }

    #[tokio::test]
    async fn test_second_call_is_a_hit() {
        let cached = CachedSource::new(CountingSource::default());
        let first = cached.fetch_bundles().await.unwrap();
        let second = cached.fetch_bundles().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[tokio::test]
    async fn test_keyed_by_argument() {
        let cached = CachedSource::new(CountingSource::default());
        cached.fetch_policy("p1").await.unwrap();
        cached.fetch_policy("p2").await.unwrap();
        cached.fetch_policy("p1").await.unwrap();
        cached.fetch_project_goals("a").await.unwrap();
        cached.fetch_project_goals("a").await.unwrap();

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_clear_forces_refetch() {
        let cached = CachedSource::new(CountingSource::default());
        cached.fetch_registered_models().await.unwrap();
        cached.clear();
        cached.fetch_registered_models().await.unwrap();

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_are_not_memoized() {
        let cached = CachedSource::new(CountingSource {
            fail_projects: true,
            ..CountingSource::default()
        });
        assert!(cached.fetch_projects().await.is_err());
        assert!(cached.fetch_projects().await.is_err());

        assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.stats().hits, 0);
    }
}
