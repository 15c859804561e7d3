//! Cross-referencing of bundles, policies, projects, models and goals.
//!
//! Every function here is pure and works on already fetched records. Empty
//! input yields empty output; nothing here fails.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use govlens_api::{Bundle, Goal, Policy, Project, RegisteredModel};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::metrics::METRICS;
use crate::task_ref::{parse_task_reference, TaskReference};

/// Display name of a bundle without one
pub const UNNAMED_BUNDLE: &str = "Unnamed Bundle";
/// Display value of a missing field
pub const UNKNOWN: &str = "Unknown";
/// Display value of a missing user
pub const UNKNOWN_USER: &str = "unknown_user";

/// Name of `bundle`, or [`UNNAMED_BUNDLE`].
pub fn display_name(bundle: &Bundle) -> &str {
    bundle
        .name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(UNNAMED_BUNDLE)
}

/// Bundles that carry a policy name.
pub fn governed_bundles(bundles: &[Bundle]) -> Vec<&Bundle> {
    bundles.iter().filter(|b| b.is_governed()).collect()
}

/// A `(model name, version)` pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelVersionKey {
    pub model: String,
    pub version: String,
}

/// Distinct model versions attached to `bundles`.
pub fn model_versions<'a>(
    bundles: impl IntoIterator<Item = &'a Bundle>,
) -> BTreeSet<ModelVersionKey> {
    bundles
        .into_iter()
        .flat_map(Bundle::model_versions)
        .map(|id| ModelVersionKey {
            model: id.name.clone(),
            version: id.version.clone(),
        })
        .collect()
}

/// Model name to its distinct, sorted versions across `bundles`.
pub fn versions_by_model<'a>(
    bundles: impl IntoIterator<Item = &'a Bundle>,
) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in model_versions(bundles) {
        // BTreeSet iteration is sorted by (model, version), so pushes stay sorted.
        grouped.entry(key.model).or_default().push(key.version);
    }
    grouped
}

/// Projects split by whether any bundle points at them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCoverage {
    pub with_bundle: Vec<Project>,
    pub without_bundle: Vec<Project>,
}

/// Partition `projects` by whether any bundle points at them.
///
/// A bundle with a `projectId` matches on id only. Project names are unique
/// per owner, so `projectName` is a fallback for bundles that lack an id.
pub fn project_coverage(projects: &[Project], bundles: &[Bundle]) -> ProjectCoverage {
    let mut ids: HashSet<&str> = HashSet::new();
    let mut names: HashSet<&str> = HashSet::new();
    for bundle in bundles {
        match (bundle.project_id.as_deref(), bundle.project_name.as_deref()) {
            (Some(id), _) => {
                ids.insert(id);
            }
            (None, Some(name)) => {
                names.insert(name);
            }
            (None, None) => {}
        }
    }

    let (with_bundle, without_bundle): (Vec<Project>, Vec<Project>) = projects
        .iter()
        .cloned()
        .partition(|p| ids.contains(p.id.as_str()) || names.contains(p.name.as_str()));

    ProjectCoverage {
        with_bundle,
        without_bundle,
    }
}

/// Bundle count at one stage of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub stage: String,
    pub count: usize,
    /// Whether the policy definition lists this stage
    pub defined: bool,
}

/// How far the bundles of one policy have progressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAdoption {
    pub policy_id: String,
    pub policy_name: String,
    /// `false` when the policy definition could not be fetched
    pub policy_found: bool,
    pub stages: Vec<StageCount>,
    pub total_bundles: usize,
}

impl PolicyAdoption {
    /// Count at `stage`, zero when absent.
    pub fn count(&self, stage: &str) -> usize {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map_or(0, |s| s.count)
    }
}

/// Stage counts of the bundles under `policy_id`.
///
/// Defined stages come first in policy order, zero-filled; observed stages
/// the policy does not list follow in first-seen order.
pub fn stage_adoption(
    policy_id: &str,
    policy: Option<&Policy>,
    bundles: &[Bundle],
) -> PolicyAdoption {
    let members: Vec<&Bundle> = bundles
        .iter()
        .filter(|b| b.policy_id.as_deref() == Some(policy_id))
        .collect();

    let mut stages: Vec<StageCount> = policy
        .map(|p| {
            p.stages
                .iter()
                .map(|s| StageCount {
                    stage: s.name.clone(),
                    count: 0,
                    defined: true,
                })
                .collect()
        })
        .unwrap_or_default();

    for bundle in &members {
        let stage = bundle
            .stage
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(UNKNOWN);
        match stages.iter_mut().find(|s| s.stage == stage) {
            Some(slot) => slot.count += 1,
            None => stages.push(StageCount {
                stage: stage.to_string(),
                count: 1,
                defined: false,
            }),
        }
    }

    let policy_name = policy
        .map(|p| p.name.clone())
        .or_else(|| members.iter().find_map(|b| b.policy_name.clone()))
        .unwrap_or_else(|| UNKNOWN.to_string());

    PolicyAdoption {
        policy_id: policy_id.to_string(),
        policy_name,
        policy_found: policy.is_some(),
        stages,
        total_bundles: members.len(),
    }
}

/// Distinct `policyId`s on `bundles`, sorted.
pub fn distinct_policy_ids(bundles: &[Bundle]) -> Vec<String> {
    let ids: BTreeSet<&str> = bundles.iter().filter_map(|b| b.policy_id.as_deref()).collect();
    ids.into_iter().map(str::to_string).collect()
}

/// Distinct `projectId`s on `bundles`, sorted.
pub fn distinct_project_ids(bundles: &[Bundle]) -> Vec<String> {
    let ids: BTreeSet<&str> = bundles
        .iter()
        .filter_map(|b| b.project_id.as_deref())
        .collect();
    ids.into_iter().map(str::to_string).collect()
}

/// [`stage_adoption`] for every policy referenced by `bundles`.
pub fn policy_adoption(
    policies: &BTreeMap<String, Policy>,
    bundles: &[Bundle],
) -> Vec<PolicyAdoption> {
    distinct_policy_ids(bundles)
        .iter()
        .map(|id| stage_adoption(id, policies.get(id), bundles))
        .collect()
}

/// Open approval request that names a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub project_id: String,
    pub goal_id: Option<String>,
    pub goal_title: Option<String>,
    pub bundle_name: String,
    pub link: String,
    pub stage_label: Option<String>,
    /// Ids of bundles whose name equals `bundle_name`; more than one means a collision
    pub matched_bundle_ids: Vec<String>,
}

/// Approval request whose description named no parsable bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedReference {
    pub project_id: String,
    pub goal_id: Option<String>,
    pub reason: String,
}

/// Result of scanning project goals for approval requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalScan {
    pub pending: Vec<PendingApproval>,
    pub malformed: Vec<MalformedReference>,
}

/// Open goals that reference a bundle, joined to bundles by trimmed name.
pub fn pending_approvals(
    goals_by_project: &BTreeMap<String, Vec<Goal>>,
    bundles: &[Bundle],
    host: &str,
) -> ApprovalScan {
    let mut ids_by_name: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for bundle in bundles {
        if let Some(name) = bundle.name.as_deref() {
            ids_by_name
                .entry(name.trim())
                .or_default()
                .push(bundle.id.clone());
        }
    }

    let mut scan = ApprovalScan::default();
    for (project_id, goals) in goals_by_project {
        for goal in goals.iter().filter(|g| g.is_open()) {
            let description = goal.description.as_deref().unwrap_or_default();
            match parse_task_reference(description, host) {
                TaskReference::NotApprovalRequest => {}
                TaskReference::Malformed { reason } => {
                    METRICS.inc_malformed_references();
                    warn!(
                        event = "approval.malformed_reference",
                        project_id = %project_id,
                        goal_id = goal.id.as_deref().unwrap_or(UNKNOWN),
                        reason = %reason,
                    );
                    scan.malformed.push(MalformedReference {
                        project_id: project_id.clone(),
                        goal_id: goal.id.clone(),
                        reason,
                    });
                }
                TaskReference::Parsed(reference) => {
                    let matched_bundle_ids = ids_by_name
                        .get(reference.bundle_name.as_str())
                        .cloned()
                        .unwrap_or_default();
                    scan.pending.push(PendingApproval {
                        project_id: project_id.clone(),
                        goal_id: goal.id.clone(),
                        goal_title: goal.title.clone(),
                        bundle_name: reference.bundle_name,
                        link: reference.link,
                        stage_label: reference.stage_label,
                        matched_bundle_ids,
                    });
                }
            }
        }
    }
    scan
}

/// A bundle that references a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRef {
    pub id: String,
    pub name: String,
}

/// Governance status of one registered model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelGovernance {
    pub model: RegisteredModel,
    pub governed: bool,
    pub bundles: Vec<BundleRef>,
}

/// Mark every registered model governed when a governed bundle attaches a
/// version of it, and collect the referencing bundles.
pub fn model_governance(models: &[RegisteredModel], bundles: &[Bundle]) -> Vec<ModelGovernance> {
    let mut index: BTreeMap<&str, Vec<BundleRef>> = BTreeMap::new();
    for bundle in bundles.iter().filter(|b| b.is_governed()) {
        let names: BTreeSet<&str> = bundle.model_versions().map(|id| id.name.as_str()).collect();
        for name in names {
            index.entry(name).or_default().push(BundleRef {
                id: bundle.id.clone(),
                name: display_name(bundle).to_string(),
            });
        }
    }

    models
        .iter()
        .map(|model| {
            let bundles = index.get(model.name.as_str()).cloned().unwrap_or_default();
            ModelGovernance {
                model: model.clone(),
                governed: !bundles.is_empty(),
                bundles,
            }
        })
        .collect()
}

/// Bundle count per `state`.
pub fn bundles_by_state(bundles: &[Bundle]) -> BTreeMap<String, usize> {
    count_by(bundles, |b| b.state.as_deref(), UNKNOWN)
}

/// Bundle count per project owner.
pub fn bundles_by_owner(bundles: &[Bundle]) -> BTreeMap<String, usize> {
    count_by(bundles, |b| b.project_owner.as_deref(), UNKNOWN_USER)
}

fn count_by<'a>(
    bundles: &'a [Bundle],
    key: impl Fn(&'a Bundle) -> Option<&'a str>,
    missing: &str,
) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for bundle in bundles {
        let k = key(bundle).filter(|k| !k.trim().is_empty()).unwrap_or(missing);
        *counts.entry(k.to_string()).or_insert(0) += 1;
    }
    counts
}
