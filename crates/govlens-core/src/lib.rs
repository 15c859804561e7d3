//! govlens Core Library
//!
//! Layer 1 - Aggregate and render: turns the records fetched by
//! `govlens-api` into governance coverage, stage adoption, pending
//! approvals, deep links and Markdown or JSON reports.

pub mod aggregate;
pub mod dashboard;
pub mod error;
pub mod links;
pub mod metrics;
pub mod obs;
pub mod report;
pub mod scoring;
pub mod task_ref;
pub mod telemetry;

pub use aggregate::{
    ApprovalScan, BundleRef, MalformedReference, ModelGovernance, ModelVersionKey,
    PendingApproval, PolicyAdoption, ProjectCoverage, StageCount, UNKNOWN, UNKNOWN_USER,
    UNNAMED_BUNDLE,
};

pub use dashboard::{Dashboard, DashboardSnapshot, FetchWarning};

pub use error::{GovlensError, Result};

pub use links::LinkBuilder;

pub use metrics::METRICS;

pub use report::{
    render_report_json, render_report_md, write_report, DashboardReport, DashboardSummary,
};

pub use scoring::{score_application, RiskBand, ScoreInput, ScoreOutcome};

pub use task_ref::{parse_task_reference, BundleReference, TaskReference};

pub use telemetry::init_tracing;

pub use govlens_api::{
    ApiConfig, ApiError, ApiFlavor, AuthScheme, Bundle, CachedSource, Goal, GovernanceClient,
    GovernanceSource, Policy, Project, RegisteredModel, ScoringClient, ScoringConfig,
};
