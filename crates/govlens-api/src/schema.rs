//! Wire records returned by the governance, project and model-registry APIs.
//!
//! Field names follow the governance v1 JSON shape (camelCase). Optional
//! fields are explicit `Option`s; required ones make decoding fail loudly.
//! The only tolerated divergences are `targets` for `attachments` and
//! `username` for `userName`.

use serde::{Deserialize, Deserializer, Serialize};

/// Attachment type string that marks a model version
pub const MODEL_VERSION_TYPE: &str = "ModelVersion";

/// User reference embedded in bundles and attachments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default, alias = "username")]
    pub user_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl UserRef {
    /// "First Last" when both halves are known.
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// Kind of artifact attached to a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AttachmentKind {
    ModelVersion,
    Other(String),
}

impl From<String> for AttachmentKind {
    fn from(value: String) -> Self {
        if value == MODEL_VERSION_TYPE {
            AttachmentKind::ModelVersion
        } else {
            AttachmentKind::Other(value)
        }
    }
}

impl From<AttachmentKind> for String {
    fn from(value: AttachmentKind) -> Self {
        match value {
            AttachmentKind::ModelVersion => MODEL_VERSION_TYPE.to_string(),
            AttachmentKind::Other(other) => other,
        }
    }
}

/// Identifier of a model version attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersionId {
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub version: String,
}

/// Artifact attached to a bundle (a.k.a. target)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    #[serde(default)]
    pub identifier: Option<ModelVersionId>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
}

impl Attachment {
    /// The `(name, version)` identifier when this is a model version attachment.
    pub fn model_version(&self) -> Option<&ModelVersionId> {
        match self.kind {
            AttachmentKind::ModelVersion => self.identifier.as_ref(),
            AttachmentKind::Other(_) => None,
        }
    }
}

/// Governance bundle (a.k.a. deliverable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub policy_id: Option<String>,
    #[serde(default)]
    pub policy_name: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub project_owner: Option<String>,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default, alias = "targets", deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
}

impl Bundle {
    /// A bundle is governed when it carries a non-empty policy name.
    pub fn is_governed(&self) -> bool {
        self.policy_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }

    /// Model version identifiers among the attachments.
    pub fn model_versions(&self) -> impl Iterator<Item = &ModelVersionId> {
        self.attachments.iter().filter_map(Attachment::model_version)
    }
}

/// One step of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStage {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Governance policy with its ordered stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stages: Vec<PolicyStage>,
}

/// Platform project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owner_username: Option<String>,
}

/// Project reference embedded in a registered model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Model registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredModel {
    pub name: String,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(default)]
    pub owner_username: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub latest_version: Option<String>,
}

impl RegisteredModel {
    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().and_then(|p| p.name.as_deref())
    }
}

/// Project goal; approval requests show up as goals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Goal {
    /// Goals without a status, or with one that is not a closed state, are open.
    pub fn is_open(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(status) => !matches!(
                status.trim().to_ascii_lowercase().as_str(),
                "completed" | "complete" | "closed" | "done"
            ),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

fn opt_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "string_or_number")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(s)| s))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bundle_decodes_governance_shape() {
        let bundle: Bundle = serde_json::from_value(json!({
            "id": "b1",
            "name": "Credit Model",
            "state": "Active",
            "stage": "Review",
            "policyId": "p1",
            "policyName": "Model Risk",
            "projectId": "proj1",
            "projectName": "credit",
            "projectOwner": "alice",
            "createdBy": {"userName": "alice", "firstName": "Alice", "lastName": "Ng"},
            "attachments": [
                {"type": "ModelVersion", "identifier": {"name": "m1", "version": 3}},
                {"type": "Report", "identifier": null}
            ]
        }))
        .unwrap();

        assert!(bundle.is_governed());
        let versions: Vec<_> = bundle.model_versions().collect();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "3");
        assert_eq!(
            bundle.attachments[1].kind,
            AttachmentKind::Other("Report".to_string())
        );
        assert_eq!(
            bundle.created_by.unwrap().full_name().as_deref(),
            Some("Alice Ng")
        );
    }

    #[test]
    fn test_bundle_accepts_targets_and_username_aliases() {
        let bundle: Bundle = serde_json::from_value(json!({
            "id": "b2",
            "createdBy": {"username": "bob"},
            "targets": [{"type": "ModelVersion", "identifier": {"name": "m2", "version": "1"}}]
        }))
        .unwrap();

        assert!(!bundle.is_governed());
        assert_eq!(bundle.attachments.len(), 1);
        assert_eq!(
            bundle.created_by.unwrap().user_name.as_deref(),
            Some("bob")
        );
    }

    #[test]
    fn test_bundle_without_attachments_is_empty() {
        let bundle: Bundle = serde_json::from_value(json!({"id": "b3", "attachments": null})).unwrap();
        assert!(bundle.attachments.is_empty());
        assert_eq!(bundle.model_versions().count(), 0);
    }

    #[test]
    fn test_bundle_missing_id_fails_loudly() {
        let result: std::result::Result<Bundle, _> =
            serde_json::from_value(json!({"name": "no id"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_policy_name_is_ungoverned() {
        let bundle: Bundle =
            serde_json::from_value(json!({"id": "b4", "policyName": "  "})).unwrap();
        assert!(!bundle.is_governed());
    }

    #[test]
    fn test_registered_model_latest_version_number() {
        let model: RegisteredModel = serde_json::from_value(json!({
            "name": "churn",
            "project": {"id": "p9", "name": "retention"},
            "ownerUsername": "carol",
            "latestVersion": 7
        }))
        .unwrap();
        assert_eq!(model.latest_version.as_deref(), Some("7"));
        assert_eq!(model.project_name(), Some("retention"));
    }

    #[test]
    fn test_goal_open_status() {
        let open = Goal {
            status: Some("Open".to_string()),
            ..Goal::default()
        };
        let done = Goal {
            status: Some("Completed".to_string()),
            ..Goal::default()
        };
        assert!(open.is_open());
        assert!(!done.is_open());
        assert!(Goal::default().is_open());
    }
}
