//! Deep links into the platform UI.
//!
//! Each owner, project, model and id is pushed as its own path segment, so
//! spaces and slashes in names are percent-encoded rather than splitting the
//! path.

use url::Url;

use crate::error::{GovlensError, Result};

/// Builds platform UI URLs below one host
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    base: Url,
}

impl LinkBuilder {
    pub fn new(host: &str) -> Result<Self> {
        let base = govlens_api::config::parse_base_url(host)
            .map_err(|e| GovlensError::InvalidLinkBase(e.to_string()))?;
        Ok(Self { base })
    }

    /// Builder over an already validated base URL.
    pub fn from_url(base: Url) -> Self {
        Self { base }
    }

    /// Host without trailing slash
    pub fn host(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn build(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `parse_base_url` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// `/u/{owner}/{project}/overview`
    pub fn project(&self, owner: &str, project: &str) -> String {
        self.build(&["u", owner, project, "overview"]).into()
    }

    /// `/u/{owner}/{project}/governance/bundle/{id}/policy/{policyId}/evidence`
    pub fn bundle_evidence(
        &self,
        owner: &str,
        project: &str,
        bundle_id: &str,
        policy_id: &str,
    ) -> String {
        self.build(&[
            "u",
            owner,
            project,
            "governance",
            "bundle",
            bundle_id,
            "policy",
            policy_id,
            "evidence",
        ])
        .into()
    }

    /// `/u/{owner}/{project}/model-registry/{model}/model-card?version={v}`
    pub fn model_card(&self, owner: &str, project: &str, model: &str, version: &str) -> String {
        let mut url = self.build(&["u", owner, project, "model-registry", model, "model-card"]);
        url.query_pairs_mut().append_pair("version", version);
        url.into()
    }

    /// `/u/{owner}/{project}/model-registry/{model}/model-card`
    pub fn model_overview(&self, owner: &str, project: &str, model: &str) -> String {
        self.build(&["u", owner, project, "model-registry", model, "model-card"])
            .into()
    }

    /// `/governance/policy/{policyId}/editor`
    pub fn policy(&self, policy_id: &str) -> String {
        self.build(&["governance", "policy", policy_id, "editor"])
            .into()
    }
}
