//! One fetch-and-aggregate pass over the governance API.
//!
//! [`Dashboard::load`] is the degrading boundary: every fetch failure becomes
//! an empty result plus a [`FetchWarning`], so a run always produces a
//! snapshot. "Upstream empty" and "upstream failed" render the same, except
//! that the latter also lists a warning.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use govlens_api::{Bundle, GovernanceSource, Goal, Policy, Project, RegisteredModel};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::aggregate::{
    self, ApprovalScan, ModelGovernance, PolicyAdoption, ProjectCoverage,
};
use crate::metrics::METRICS;
use crate::obs;

/// A fetch that degraded to an empty result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWarning {
    /// `bundles`, `policy`, `projects`, `registered_models` or `goals`
    pub resource: String,
    /// Policy or project id for keyed resources
    pub key: Option<String>,
    pub message: String,
}

impl std::fmt::Display for FetchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} {}: {}", self.resource, key, self.message),
            None => write!(f, "{}: {}", self.resource, self.message),
        }
    }
}

/// Everything fetched in one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub host: String,
    pub bundles: Vec<Bundle>,
    pub projects: Vec<Project>,
    pub registered_models: Vec<RegisteredModel>,
    pub policies: BTreeMap<String, Policy>,
    pub goals_by_project: BTreeMap<String, Vec<Goal>>,
    pub warnings: Vec<FetchWarning>,
}

impl DashboardSnapshot {
    /// Empty snapshot for `host`.
    pub fn empty(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    pub fn governed_bundles(&self) -> Vec<&Bundle> {
        aggregate::governed_bundles(&self.bundles)
    }

    pub fn policy_adoption(&self) -> Vec<PolicyAdoption> {
        aggregate::policy_adoption(&self.policies, &self.bundles)
    }

    pub fn project_coverage(&self) -> ProjectCoverage {
        aggregate::project_coverage(&self.projects, &self.bundles)
    }

    pub fn model_governance(&self) -> Vec<ModelGovernance> {
        aggregate::model_governance(&self.registered_models, &self.bundles)
    }

    pub fn approvals(&self) -> ApprovalScan {
        aggregate::pending_approvals(&self.goals_by_project, &self.bundles, &self.host)
    }
}

/// Drives one run against a [`GovernanceSource`]
#[derive(Clone)]
pub struct Dashboard {
    source: Arc<dyn GovernanceSource>,
    host: String,
}

impl Dashboard {
    /// `host` is used to resolve relative links found in goal descriptions.
    pub fn new(source: Arc<dyn GovernanceSource>, host: &str) -> Self {
        Self {
            source,
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Fetch every resource and return the snapshot; never fails.
    pub async fn load(&self) -> DashboardSnapshot {
        let run_id = obs::new_run_id();
        let span = obs::run_span(&run_id);
        self.load_run(&run_id).instrument(span).await
    }

    async fn load_run(&self, run_id: &str) -> DashboardSnapshot {
        let started = Instant::now();
        obs::emit_run_started(run_id, &self.host);

        let mut snapshot = DashboardSnapshot::empty(&self.host);
        let warnings = &mut snapshot.warnings;

        snapshot.bundles = settle(
            "bundles",
            None,
            self.source.fetch_bundles().await,
            Vec::len,
            warnings,
        )
        .unwrap_or_default();

        snapshot.projects = settle(
            "projects",
            None,
            self.source.fetch_projects().await,
            Vec::len,
            warnings,
        )
        .unwrap_or_default();

        snapshot.registered_models = settle(
            "registered_models",
            None,
            self.source.fetch_registered_models().await,
            Vec::len,
            warnings,
        )
        .unwrap_or_default();

        for policy_id in aggregate::distinct_policy_ids(&snapshot.bundles) {
            let fetched = self.source.fetch_policy(&policy_id).await;
            let stages = |p: &Policy| p.stages.len();
            if let Some(policy) = settle("policy", Some(&policy_id), fetched, stages, warnings) {
                snapshot.policies.insert(policy_id, policy);
            }
        }

        snapshot.goals_by_project = self
            .load_goals(aggregate::distinct_project_ids(&snapshot.bundles), warnings)
            .await;

        obs::emit_run_finished(
            run_id,
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            snapshot.bundles.len(),
            snapshot.warnings.len(),
        );
        snapshot
    }

    /// Goals of every project, fetched concurrently and keyed by project id.
    async fn load_goals(
        &self,
        project_ids: Vec<String>,
        warnings: &mut Vec<FetchWarning>,
    ) -> BTreeMap<String, Vec<Goal>> {
        let mut join_set = JoinSet::new();
        for project_id in project_ids {
            let source = Arc::clone(&self.source);
            join_set.spawn(
                async move {
                    let result = source.fetch_project_goals(&project_id).await;
                    (project_id, result)
                }
                .in_current_span(),
            );
        }

        let mut goals = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((project_id, result)) => {
                    if let Some(list) = settle("goals", Some(&project_id), result, Vec::len, warnings) {
                        goals.insert(project_id, list);
                    }
                }
                Err(e) => {
                    METRICS.inc_fetches();
                    METRICS.inc_fetch_failures();
                    obs::emit_fetch_degraded("goals", None, None, &e);
                    warnings.push(FetchWarning {
                        resource: "goals".to_string(),
                        key: None,
                        message: format!("goal fetch task failed: {e}"),
                    });
                }
            }
        }
        goals
    }
}

/// Log and count one fetch outcome; failures become a warning and `None`.
fn settle<T>(
    resource: &str,
    key: Option<&str>,
    result: govlens_api::Result<T>,
    count: impl Fn(&T) -> usize,
    warnings: &mut Vec<FetchWarning>,
) -> Option<T> {
    METRICS.inc_fetches();
    match result {
        Ok(value) => {
            obs::emit_fetch_completed(resource, key, count(&value));
            Some(value)
        }
        Err(e) => {
            METRICS.inc_fetch_failures();
            obs::emit_fetch_degraded(resource, key, e.status(), &e);
            warnings.push(FetchWarning {
                resource: resource.to_string(),
                key: key.map(str::to_string),
                message: e.to_string(),
            });
            None
        }
    }
}
