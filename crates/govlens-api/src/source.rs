//! Abstract data source for the governance records.
//!
//! Implemented by [`crate::GovernanceClient`] (HTTP), by
//! [`crate::CachedSource`] (run-scoped memoization) and by test stubs.

use async_trait::async_trait;

use crate::schema::{Bundle, Goal, Policy, Project, RegisteredModel};
use crate::Result;

/// Every read the dashboard needs from the platform.
#[async_trait]
pub trait GovernanceSource: Send + Sync {
    /// All bundles visible to the caller.
    async fn fetch_bundles(&self) -> Result<Vec<Bundle>>;

    /// One policy with its stage definitions.
    async fn fetch_policy(&self, policy_id: &str) -> Result<Policy>;

    /// All projects visible to the caller.
    async fn fetch_projects(&self) -> Result<Vec<Project>>;

    /// All model registry entries.
    async fn fetch_registered_models(&self) -> Result<Vec<RegisteredModel>>;

    /// Goals of one project.
    async fn fetch_project_goals(&self, project_id: &str) -> Result<Vec<Goal>>;
}
