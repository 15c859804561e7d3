//! govlens-api: typed access to the governance platform
//!
//! This crate provides the fetch layer for govlens. It knows the REST
//! endpoints for bundles, policies, projects, registered models and project
//! goals, and the hosted scoring endpoint.
//!
//! ## Layer 0 - Fetch
//!
//! Focus: one typed deserialization boundary, explicit errors, no retries.
//!
//! ## Key Components
//!
//! - `GovernanceSource`: the reads the dashboard needs, as an async trait
//! - `GovernanceClient`: reqwest implementation of `GovernanceSource`
//! - `CachedSource`: run-scoped memoization with explicit `clear()`
//! - `ScoringClient`: POSTs applications to the scoring model

mod cache;
mod client;
pub mod config;
mod error;
pub mod schema;
mod scoring;
mod source;

pub use cache::{CacheStats, CachedSource};
pub use client::{BodyField, GovernanceClient};
pub use config::{ApiConfig, ApiFlavor, AuthScheme, ScoringConfig, API_KEY_HEADER};
pub use error::ApiError;
pub use schema::{
    Attachment, AttachmentKind, Bundle, Goal, ModelVersionId, Policy, PolicyStage, Project,
    ProjectRef, RegisteredModel, UserRef,
};
pub use scoring::{ScoringClient, ScoringFeatures};
pub use source::GovernanceSource;

/// Result type for govlens-api operations
pub type Result<T> = std::result::Result<T, ApiError>;
