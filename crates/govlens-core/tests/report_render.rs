//! Markdown and JSON rendering of a populated dashboard.

use std::collections::BTreeMap;

use govlens_api::{Goal, Policy};
use govlens_core::report::{
    render_approvals_md, render_bundles_md, render_models_md, render_policies_md,
    render_projects_md, render_summary_md,
};
use govlens_core::{
    render_report_json, render_report_md, DashboardReport, DashboardSnapshot, LinkBuilder,
};
use serde_json::json;

const HOST: &str = "https://gov.example.com";

fn snapshot() -> DashboardSnapshot {
    let mut snapshot = DashboardSnapshot::empty(HOST);
    snapshot.bundles = serde_json::from_value(json!([
        {
            "id": "b1", "name": "Credit | Q3", "state": "Active", "stage": "Review",
            "policyId": "p1", "policyName": "Model Risk",
            "projectId": "proj1", "projectName": "credit risk", "projectOwner": "alice",
            "createdBy": {"userName": "alice"},
            "attachments": [
                {"type": "ModelVersion", "identifier": {"name": "xgb", "version": 3}}
            ]
        },
        {
            "id": "b2", "name": "Churn", "state": "Active", "stage": "Review",
            "policyId": "p1", "policyName": "Model Risk",
            "projectId": "proj2", "projectName": "churn", "projectOwner": "bob",
            "createdBy": {"userName": "bob", "firstName": "Bob", "lastName": "Stone"}
        },
        {"id": "b3", "state": "Archived"}
    ]))
    .unwrap();
    snapshot.projects = serde_json::from_value(json!([
        {"id": "proj1", "name": "credit risk", "ownerUsername": "alice"},
        {"id": "proj2", "name": "churn", "ownerUsername": "bob"},
        {"id": "proj3", "name": "sandbox", "ownerUsername": "carol"}
    ]))
    .unwrap();
    snapshot.registered_models = serde_json::from_value(json!([
        {"name": "xgb", "project": {"id": "proj1", "name": "credit risk"}, "ownerUsername": "alice", "latestVersion": 3},
        {"name": "lgbm", "ownerUsername": "bob"}
    ]))
    .unwrap();
    let policy: Policy = serde_json::from_value(json!({
        "id": "p1",
        "name": "Model Risk",
        "stages": [{"name": "Draft"}, {"name": "Review"}, {"name": "Approved"}]
    }))
    .unwrap();
    snapshot.policies = BTreeMap::from([("p1".to_string(), policy)]);
    snapshot.goals_by_project = BTreeMap::from([(
        "proj2".to_string(),
        vec![Goal {
            id: Some("g1".to_string()),
            title: Some("Sign-off".to_string()),
            description: Some("Approval requested Stage Review: [Churn](/u/bob/churn/governance/bundle/b2)".to_string()),
            status: Some("Open".to_string()),
        }],
    )]);
    snapshot
}

fn links() -> LinkBuilder {
    LinkBuilder::new(HOST).unwrap()
}

#[test]
fn summary_lists_headline_metrics() {
    let report = DashboardReport::new(snapshot());
    let md = render_summary_md(&report);
    assert!(md.contains("- **Total bundles**: 3"));
    assert!(md.contains("- **Governed bundles**: 2"));
    assert!(md.contains("- **Governed model versions**: 1"));
    assert!(md.contains("- **Projects without a bundle**: 1"));
    assert!(md.contains("- **Models in governed bundles**: 1"));
    assert!(md.contains("- **Pending approvals**: 1"));
    assert!(md.contains("| Active | 2 |"));
}

#[test]
fn bundle_table_links_evidence_and_escapes_names() {
    let report = DashboardReport::new(snapshot());
    let md = render_bundles_md(&report, &links(), false);
    assert!(md.contains(
        "[Credit \\| Q3](https://gov.example.com/u/alice/credit%20risk/governance/bundle/b1/policy/p1/evidence)"
    ));
    assert!(md.contains("[Model Risk](https://gov.example.com/governance/policy/p1/editor)"));
    assert!(md.contains(
        "[xgb v3](https://gov.example.com/u/alice/credit%20risk/model-registry/xgb/model-card?version=3)"
    ));
    assert!(md.contains("| Bob Stone |"), "full name preferred over user name");
    assert!(md.contains("| alice |"));
    assert!(!md.contains("Unnamed Bundle"), "ungoverned bundle hidden by default");

    let all = render_bundles_md(&report, &links(), true);
    assert!(all.contains("Unnamed Bundle"));
}

#[test]
fn policy_section_charts_every_stage() {
    let report = DashboardReport::new(snapshot());
    let md = render_policies_md(&report, &links());
    assert!(md.contains("- **Bundles**: 2"));
    assert!(md.contains("```text\n"));
    assert!(md.contains("Draft    0\n"));
    assert!(md.contains(&format!("Review   {} 2\n", "█".repeat(40))));
    assert!(md.contains("Approved 0\n"));
}

#[test]
fn projects_and_models_are_split() {
    let report = DashboardReport::new(snapshot());
    let projects = render_projects_md(&report, &links());
    assert!(projects.contains("[sandbox](https://gov.example.com/u/carol/sandbox/overview)"));

    let models = render_models_md(&report, &links());
    let (governed, ungoverned) = models
        .split_once("### Models not in governed bundles")
        .unwrap();
    assert!(governed.contains("credit%20risk/model-registry/xgb/model-card"));
    assert!(governed.contains("Credit \\| Q3"));
    assert!(ungoverned.contains("| lgbm |"));
}

#[test]
fn approvals_table_names_project_and_stage() {
    let report = DashboardReport::new(snapshot());
    let md = render_approvals_md(&report);
    assert!(md.contains("[Churn](https://gov.example.com/u/bob/churn/governance/bundle/b2)"));
    assert!(md.contains("| Review | churn | Sign-off | b2 |"));
}

#[test]
fn full_report_has_every_section_and_no_warnings() {
    let report = DashboardReport::new(snapshot());
    let md = render_report_md(&report, &links());
    for heading in [
        "# Governance Dashboard",
        "## Summary",
        "## Governed Bundles",
        "## Policies",
        "## Projects",
        "## Models",
        "## Pending Approvals",
    ] {
        assert!(md.contains(heading), "missing {heading}");
    }
    assert!(!md.contains("## Warnings"));
}

#[test]
fn json_report_round_trips() {
    let report = DashboardReport::new(snapshot());
    let json = render_report_json(&report).unwrap();
    let back: DashboardReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}
