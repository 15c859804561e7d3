//! Bundle references embedded in approval-request goals.
//!
//! The platform files an approval request as a project goal whose
//! description reads like `Approval requested Stage Review: [Bundle](/u/...)`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Phrase that marks a goal as a bundle approval request
pub const APPROVAL_MARKER: &str = "Approval requested Stage";

/// A bundle reference parsed out of a goal description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReference {
    pub bundle_name: String,
    /// Absolute link to the bundle
    pub link: String,
    /// Text between the marker and the first `:`, e.g. `"2"` or `"Review"`
    pub stage_label: Option<String>,
}

/// Outcome of parsing one goal description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReference {
    /// The marker phrase is absent; not a bundle approval
    NotApprovalRequest,
    /// Marker present but no `[name](target)` link after it
    Malformed { reason: String },
    Parsed(BundleReference),
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\[(?P<name>[^\[\]]+)\]\((?P<target>[^()\s]+)\)")
            .unwrap_or_else(|e| unreachable!("link pattern is a valid regex: {e}"))
    })
}

/// Parse `description`; relative link targets are resolved against `host`.
pub fn parse_task_reference(description: &str, host: &str) -> TaskReference {
    let Some(marker_at) = description.find(APPROVAL_MARKER) else {
        return TaskReference::NotApprovalRequest;
    };
    let after_marker = &description[marker_at + APPROVAL_MARKER.len()..];

    let Some(captures) = link_pattern().captures(after_marker) else {
        return TaskReference::Malformed {
            reason: "no [name](link) reference after the approval marker".to_string(),
        };
    };

    let bundle_name = captures["name"].trim();
    if bundle_name.is_empty() {
        return TaskReference::Malformed {
            reason: "bundle name in reference is blank".to_string(),
        };
    }

    let link_start = captures.get(0).map_or(0, |m| m.start());
    let stage_label = after_marker[..link_start]
        .split_once(':')
        .map(|(label, _)| label.trim())
        .filter(|label| !label.is_empty())
        .map(str::to_string);

    TaskReference::Parsed(BundleReference {
        bundle_name: bundle_name.to_string(),
        link: resolve_link(host, &captures["target"]),
        stage_label,
    })
}

/// Join a possibly relative link target onto `host`.
pub fn resolve_link(host: &str, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    let host = host.trim_end_matches('/');
    if target.starts_with('/') {
        format!("{host}{target}")
    } else {
        format!("{host}/{target}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "https://gov.example.com";

    #[test]
    fn test_parses_name_link_and_stage() {
        let parsed =
            parse_task_reference("Approval requested Stage 2: [BundleX](/path/to/x)", HOST);
        assert_eq!(
            parsed,
            TaskReference::Parsed(BundleReference {
                bundle_name: "BundleX".to_string(),
                link: format!("{HOST}/path/to/x"),
                stage_label: Some("2".to_string()),
            })
        );
    }

    #[test]
    fn test_without_marker_is_not_an_approval() {
        assert_eq!(
            parse_task_reference("Please review [BundleX](/path/to/x)", HOST),
            TaskReference::NotApprovalRequest
        );
        assert_eq!(
            parse_task_reference("", HOST),
            TaskReference::NotApprovalRequest
        );
    }

    #[test]
    fn test_marker_without_link_is_malformed() {
        let parsed = parse_task_reference("Approval requested Stage Review: BundleX", HOST);
        assert!(matches!(parsed, TaskReference::Malformed { .. }));

        let parsed = parse_task_reference("Approval requested Stage Review: [BundleX]", HOST);
        assert!(matches!(parsed, TaskReference::Malformed { .. }));
    }

    #[test]
    fn test_absolute_links_are_kept() {
        let parsed = parse_task_reference(
            "Approval requested Stage Validation: [Churn v2](https://other.example.com/b/9)",
            HOST,
        );
        match parsed {
            TaskReference::Parsed(reference) => {
                assert_eq!(reference.bundle_name, "Churn v2");
                assert_eq!(reference.link, "https://other.example.com/b/9");
                assert_eq!(reference.stage_label.as_deref(), Some("Validation"));
            }
            other => panic!("expected parsed reference, got {other:?}"),
        }
    }

    #[test]
    fn test_first_reference_wins() {
        let parsed = parse_task_reference(
            "Approval requested Stage 1: [First](/a) then [Second](/b)",
            HOST,
        );
        match parsed {
            TaskReference::Parsed(reference) => assert_eq!(reference.bundle_name, "First"),
            other => panic!("expected parsed reference, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_label_absent_without_colon() {
        let parsed = parse_task_reference("Approval requested Stage [B](/b)", HOST);
        match parsed {
            TaskReference::Parsed(reference) => assert_eq!(reference.stage_label, None),
            other => panic!("expected parsed reference, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_link_slashes() {
        assert_eq!(resolve_link("https://h/", "/x"), "https://h/x");
        assert_eq!(resolve_link("https://h", "x"), "https://h/x");
        assert_eq!(resolve_link("https://h", "http://o/x"), "http://o/x");
    }
}
