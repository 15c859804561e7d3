//! Dashboard report: headline metrics, tables, stage charts and deep links.
//!
//! [`DashboardReport`] is the serializable view of one run (the `--format
//! json` output); the `render_*` functions turn it into Markdown sections.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use govlens_api::{Bundle, Project};
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    self, display_name, ApprovalScan, ModelGovernance, PolicyAdoption, ProjectCoverage, UNKNOWN,
    UNKNOWN_USER,
};
use crate::dashboard::{DashboardSnapshot, FetchWarning};
use crate::error::Result;
use crate::links::LinkBuilder;
use crate::metrics::METRICS;

/// Widest bar in a stage chart, in characters
pub const MAX_BAR_WIDTH: usize = 40;
/// `schema_version` of the JSON report
pub const REPORT_SCHEMA_VERSION: &str = "govlens.report.v1";

// ── headline metrics ──────────────────────────────────────────────────────

/// Single-number metrics shown at the top of the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_bundles: usize,
    pub governed_bundles: usize,
    pub ungoverned_bundles: usize,
    pub governed_model_versions: usize,
    pub governed_models: usize,
    pub policies: usize,
    pub projects: usize,
    pub projects_with_bundle: usize,
    pub projects_without_bundle: usize,
    pub registered_models: usize,
    pub models_governed: usize,
    pub models_not_governed: usize,
    pub pending_approvals: usize,
    pub malformed_approvals: usize,
    pub warnings: usize,
    pub bundles_by_state: BTreeMap<String, usize>,
    pub bundles_by_owner: BTreeMap<String, usize>,
}

impl DashboardSummary {
    pub fn compute(
        snapshot: &DashboardSnapshot,
        coverage: &ProjectCoverage,
        models: &[ModelGovernance],
        approvals: &ApprovalScan,
    ) -> Self {
        let governed = snapshot.governed_bundles();
        let versions = aggregate::versions_by_model(governed.iter().copied());
        let models_governed = models.iter().filter(|m| m.governed).count();

        Self {
            total_bundles: snapshot.bundles.len(),
            governed_bundles: governed.len(),
            ungoverned_bundles: snapshot.bundles.len() - governed.len(),
            governed_model_versions: versions.values().map(Vec::len).sum(),
            governed_models: versions.len(),
            policies: aggregate::distinct_policy_ids(&snapshot.bundles).len(),
            projects: snapshot.projects.len(),
            projects_with_bundle: coverage.with_bundle.len(),
            projects_without_bundle: coverage.without_bundle.len(),
            registered_models: models.len(),
            models_governed,
            models_not_governed: models.len() - models_governed,
            pending_approvals: approvals.pending.len(),
            malformed_approvals: approvals.malformed.len(),
            warnings: snapshot.warnings.len(),
            bundles_by_state: aggregate::bundles_by_state(&snapshot.bundles),
            bundles_by_owner: aggregate::bundles_by_owner(&snapshot.bundles),
        }
    }
}

// ── report model ──────────────────────────────────────────────────────────

/// Aggregated view of one dashboard run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardReport {
    pub schema_version: String,
    pub host: String,
    pub generated_at: DateTime<Utc>,
    pub summary: DashboardSummary,
    pub bundles: Vec<Bundle>,
    pub versions_by_model: BTreeMap<String, Vec<String>>,
    pub policy_adoption: Vec<PolicyAdoption>,
    pub project_coverage: ProjectCoverage,
    pub model_governance: Vec<ModelGovernance>,
    pub approvals: ApprovalScan,
    /// Project id to project, for labelling approval rows
    pub projects: BTreeMap<String, Project>,
    pub warnings: Vec<FetchWarning>,
}

impl DashboardReport {
    /// Aggregate `snapshot` into a report stamped with the current time.
    pub fn new(snapshot: DashboardSnapshot) -> Self {
        let coverage = snapshot.project_coverage();
        let models = snapshot.model_governance();
        let approvals = snapshot.approvals();
        let summary = DashboardSummary::compute(&snapshot, &coverage, &models, &approvals);
        let versions_by_model = aggregate::versions_by_model(snapshot.governed_bundles());
        let policy_adoption = snapshot.policy_adoption();
        let projects = snapshot
            .projects
            .iter()
            .map(|p| (p.id.clone(), p.clone()))
            .collect();

        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            host: snapshot.host,
            generated_at: Utc::now(),
            summary,
            bundles: snapshot.bundles,
            versions_by_model,
            policy_adoption,
            project_coverage: coverage,
            model_governance: models,
            approvals,
            projects,
            warnings: snapshot.warnings,
        }
    }

    pub fn governed_bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.bundles.iter().filter(|b| b.is_governed())
    }
}

// ── markdown helpers ──────────────────────────────────────────────────────

/// Escape text for a Markdown table cell.
pub fn md_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace('\n', " ")
}

fn md_link(text: &str, url: &str) -> String {
    let label = md_escape(text).replace('[', "\\[").replace(']', "\\]");
    // `|` in a target would split the table row
    let url = url.replace('|', "%7C");
    format!("[{label}]({url})")
}

fn md_table(out: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    let _ = writeln!(out, "| {} |", headers.join(" | "));
    let _ = writeln!(
        out,
        "|{}",
        headers.iter().map(|_| " --- |").collect::<String>()
    );
    for row in rows {
        let _ = writeln!(out, "| {} |", row.join(" | "));
    }
    out.push('\n');
}

/// Horizontal text bar chart; bars scale to the largest count.
pub fn render_bar_chart(rows: &[(String, usize)], max_width: usize) -> String {
    let label_width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let max_count = rows.iter().map(|(_, c)| *c).max().unwrap_or(0);

    let mut out = String::new();
    for (label, count) in rows {
        let width = if max_count == 0 || *count == 0 {
            0
        } else {
            // Non-zero counts always get at least one cell.
            (count * max_width).div_ceil(max_count).max(1)
        };
        let pad = label_width - label.chars().count();
        let _ = writeln!(
            out,
            "{label}{} {}{}{count}",
            " ".repeat(pad),
            "█".repeat(width),
            if width == 0 { "" } else { " " },
        );
    }
    out
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(UNKNOWN)
}

fn project_cell(links: &LinkBuilder, owner: Option<&str>, project: Option<&str>) -> String {
    match (owner, project) {
        (Some(owner), Some(project)) => md_link(project, &links.project(owner, project)),
        (_, project) => md_escape(or_unknown(project)),
    }
}

// ── sections ──────────────────────────────────────────────────────────────

/// Title block with timestamp and host.
pub fn render_header(report: &DashboardReport) -> String {
    format!(
        "# Governance Dashboard\n\n_Generated {} from {}_\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.host
    )
}

/// Headline metrics.
pub fn render_summary_md(report: &DashboardReport) -> String {
    let s = &report.summary;
    let mut out = String::from("## Summary\n\n");
    let metrics = [
        ("Total bundles", s.total_bundles),
        ("Governed bundles", s.governed_bundles),
        ("Ungoverned bundles", s.ungoverned_bundles),
        ("Governed models", s.governed_models),
        ("Governed model versions", s.governed_model_versions),
        ("Policies in use", s.policies),
        ("Projects", s.projects),
        ("Projects with a bundle", s.projects_with_bundle),
        ("Projects without a bundle", s.projects_without_bundle),
        ("Registered models", s.registered_models),
        ("Models in governed bundles", s.models_governed),
        ("Models not in governed bundles", s.models_not_governed),
        ("Pending approvals", s.pending_approvals),
    ];
    for (label, value) in metrics {
        let _ = writeln!(out, "- **{label}**: {value}");
    }
    out.push('\n');

    if !s.bundles_by_state.is_empty() {
        out.push_str("### Bundles by state\n\n");
        let rows: Vec<Vec<String>> = s
            .bundles_by_state
            .iter()
            .map(|(state, n)| vec![md_escape(state), n.to_string()])
            .collect();
        md_table(&mut out, &["State", "Bundles"], &rows);
    }
    if !s.bundles_by_owner.is_empty() {
        out.push_str("### Bundles by project owner\n\n");
        let rows: Vec<Vec<String>> = s
            .bundles_by_owner
            .iter()
            .map(|(owner, n)| vec![md_escape(owner), n.to_string()])
            .collect();
        md_table(&mut out, &["Owner", "Bundles"], &rows);
    }
    out
}

/// Bundle table; governed bundles only unless `include_ungoverned`.
pub fn render_bundles_md(
    report: &DashboardReport,
    links: &LinkBuilder,
    include_ungoverned: bool,
) -> String {
    let title = if include_ungoverned {
        "## Bundles\n\n"
    } else {
        "## Governed Bundles\n\n"
    };
    let mut out = String::from(title);

    let bundles: Vec<&Bundle> = if include_ungoverned {
        report.bundles.iter().collect()
    } else {
        report.governed_bundles().collect()
    };
    if bundles.is_empty() {
        out.push_str("No bundles found.\n\n");
        return out;
    }

    let rows: Vec<Vec<String>> = bundles.iter().map(|b| bundle_row(b, links)).collect();
    md_table(
        &mut out,
        &["Bundle", "Policy", "Stage", "State", "Project", "Created by", "Models"],
        &rows,
    );

    if !report.versions_by_model.is_empty() {
        out.push_str("### Governed model versions\n\n");
        let rows: Vec<Vec<String>> = report
            .versions_by_model
            .iter()
            .map(|(model, versions)| vec![md_escape(model), versions.join(", ")])
            .collect();
        md_table(&mut out, &["Model", "Versions"], &rows);
    }
    out
}

fn bundle_row(bundle: &Bundle, links: &LinkBuilder) -> Vec<String> {
    let owner = bundle.project_owner.as_deref();
    let project = bundle.project_name.as_deref();

    let name = match (owner, project, bundle.policy_id.as_deref()) {
        (Some(owner), Some(project), Some(policy_id)) => md_link(
            display_name(bundle),
            &links.bundle_evidence(owner, project, &bundle.id, policy_id),
        ),
        _ => md_escape(display_name(bundle)),
    };
    let policy = match (bundle.policy_id.as_deref(), bundle.policy_name.as_deref()) {
        (Some(id), Some(name)) => md_link(name, &links.policy(id)),
        (_, name) => md_escape(name.unwrap_or("—")),
    };
    let created_by = bundle
        .created_by
        .as_ref()
        .and_then(|u| u.full_name().or_else(|| u.user_name.clone()))
        .unwrap_or_else(|| UNKNOWN_USER.to_string());
    let models: Vec<String> = bundle
        .model_versions()
        .map(|mv| {
            let text = format!("{} v{}", mv.name, mv.version);
            match (owner, project) {
                (Some(owner), Some(project)) => {
                    md_link(&text, &links.model_card(owner, project, &mv.name, &mv.version))
                }
                _ => md_escape(&text),
            }
        })
        .collect();

    vec![
        name,
        policy,
        md_escape(or_unknown(bundle.stage.as_deref())),
        md_escape(or_unknown(bundle.state.as_deref())),
        project_cell(links, owner, project),
        md_escape(&created_by),
        if models.is_empty() {
            "—".to_string()
        } else {
            models.join(", ")
        },
    ]
}

/// Stage chart per policy referenced by a bundle.
pub fn render_policies_md(report: &DashboardReport, links: &LinkBuilder) -> String {
    let mut out = String::from("## Policies\n\n");
    if report.policy_adoption.is_empty() {
        out.push_str("No policies found.\n\n");
        return out;
    }

    for adoption in &report.policy_adoption {
        let _ = writeln!(
            out,
            "### {}\n",
            md_link(&adoption.policy_name, &links.policy(&adoption.policy_id))
        );
        let _ = writeln!(out, "- **Bundles**: {}", adoption.total_bundles);
        if !adoption.policy_found {
            out.push_str("- Policy definition unavailable; showing observed stages only.\n");
        }
        let undefined: Vec<&str> = adoption
            .stages
            .iter()
            .filter(|s| !s.defined && adoption.policy_found)
            .map(|s| s.stage.as_str())
            .collect();
        if !undefined.is_empty() {
            let _ = writeln!(out, "- Stages not in policy: {}", undefined.join(", "));
        }
        out.push('\n');

        let rows: Vec<(String, usize)> = adoption
            .stages
            .iter()
            .map(|s| (s.stage.clone(), s.count))
            .collect();
        out.push_str("```text\n");
        out.push_str(&render_bar_chart(&rows, MAX_BAR_WIDTH));
        out.push_str("```\n\n");
    }
    out
}

/// Projects with and without a bundle.
pub fn render_projects_md(report: &DashboardReport, links: &LinkBuilder) -> String {
    let mut out = String::from("## Projects\n\n");
    let coverage = &report.project_coverage;

    for (title, projects) in [
        ("Projects with a bundle", &coverage.with_bundle),
        ("Projects without a bundle", &coverage.without_bundle),
    ] {
        let _ = writeln!(out, "### {title}\n");
        if projects.is_empty() {
            out.push_str("No projects found.\n\n");
            continue;
        }
        let rows: Vec<Vec<String>> = projects
            .iter()
            .map(|p| {
                let owner = p.owner_username.as_deref();
                vec![
                    project_cell(links, owner, Some(p.name.as_str())),
                    md_escape(owner.unwrap_or(UNKNOWN_USER)),
                ]
            })
            .collect();
        md_table(&mut out, &["Project", "Owner"], &rows);
    }
    out
}

/// Registered models split by governance status.
pub fn render_models_md(report: &DashboardReport, links: &LinkBuilder) -> String {
    let mut out = String::from("## Models\n\n");
    let (governed, ungoverned): (Vec<&ModelGovernance>, Vec<&ModelGovernance>) =
        report.model_governance.iter().partition(|m| m.governed);

    for (title, models) in [
        ("Models in governed bundles", governed),
        ("Models not in governed bundles", ungoverned),
    ] {
        let _ = writeln!(out, "### {title}\n");
        if models.is_empty() {
            out.push_str("No models found.\n\n");
            continue;
        }
        let rows: Vec<Vec<String>> = models.iter().map(|m| model_row(m, links)).collect();
        md_table(
            &mut out,
            &["Model", "Project", "Owner", "Latest version", "Bundles"],
            &rows,
        );
    }
    out
}

fn model_row(entry: &ModelGovernance, links: &LinkBuilder) -> Vec<String> {
    let model = &entry.model;
    let owner = model.owner_username.as_deref();
    let project = model.project_name();

    let name = match (owner, project) {
        (Some(owner), Some(project)) => {
            md_link(&model.name, &links.model_overview(owner, project, &model.name))
        }
        _ => md_escape(&model.name),
    };
    let bundles: Vec<String> = entry.bundles.iter().map(|b| md_escape(&b.name)).collect();

    vec![
        name,
        project_cell(links, owner, project),
        md_escape(owner.unwrap_or(UNKNOWN_USER)),
        md_escape(model.latest_version.as_deref().unwrap_or("—")),
        if bundles.is_empty() {
            "—".to_string()
        } else {
            bundles.join(", ")
        },
    ]
}

/// Open approval requests and references that did not parse.
pub fn render_approvals_md(report: &DashboardReport) -> String {
    let mut out = String::from("## Pending Approvals\n\n");
    let scan = &report.approvals;

    if scan.pending.is_empty() {
        out.push_str("No pending approvals found.\n\n");
    } else {
        let rows: Vec<Vec<String>> = scan
            .pending
            .iter()
            .map(|p| {
                let matched = match p.matched_bundle_ids.len() {
                    0 => "no matching bundle".to_string(),
                    1 => p.matched_bundle_ids[0].clone(),
                    n => format!("{} ({n} bundles share this name)", p.matched_bundle_ids.join(", ")),
                };
                vec![
                    md_link(&p.bundle_name, &p.link),
                    md_escape(p.stage_label.as_deref().unwrap_or(UNKNOWN)),
                    md_escape(project_label(report, &p.project_id)),
                    md_escape(p.goal_title.as_deref().unwrap_or("—")),
                    md_escape(&matched),
                ]
            })
            .collect();
        md_table(
            &mut out,
            &["Bundle", "Stage", "Project", "Goal", "Matched bundles"],
            &rows,
        );
    }

    if !scan.malformed.is_empty() {
        out.push_str("### Unreadable approval requests\n\n");
        for m in &scan.malformed {
            let _ = writeln!(
                out,
                "- {} goal {}: {}",
                project_label(report, &m.project_id),
                m.goal_id.as_deref().unwrap_or(UNKNOWN),
                m.reason
            );
        }
        out.push('\n');
    }
    out
}

fn project_label<'a>(report: &'a DashboardReport, project_id: &'a str) -> &'a str {
    report
        .projects
        .get(project_id)
        .map_or(project_id, |p| p.name.as_str())
}

/// Fetches that degraded; empty when the run was clean.
pub fn render_warnings_md(report: &DashboardReport) -> String {
    if report.warnings.is_empty() {
        return String::new();
    }
    let mut out = String::from("## Warnings\n\n");
    for w in &report.warnings {
        let _ = writeln!(out, "- {w}");
    }
    out.push('\n');
    out
}

/// Every section in dashboard order.
pub fn render_report_md(report: &DashboardReport, links: &LinkBuilder) -> String {
    let mut out = render_header(report);
    out.push_str(&render_summary_md(report));
    out.push_str(&render_bundles_md(report, links, false));
    out.push_str(&render_policies_md(report, links));
    out.push_str(&render_projects_md(report, links));
    out.push_str(&render_models_md(report, links));
    out.push_str(&render_approvals_md(report));
    out.push_str(&render_warnings_md(report));
    METRICS.inc_reports_rendered();
    out
}

/// Pretty JSON form of `report`.
pub fn render_report_json(report: &DashboardReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report)?;
    METRICS.inc_reports_rendered();
    Ok(json)
}

/// Write rendered report `content` to `path`.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)?;
    tracing::info!(event = "report.written", path = %path.display(), bytes = content.len());
    Ok(())
}
