//! Quality and consistency analysis of workflow artifacts.
//!
//! Scoring is deliberately blunt and deterministic:
//!
//! - completeness = `max(0, 100 - issues / 3 * 100)` per artifact, where the
//!   issues are leftover placeholders, fewer than 500 characters and fewer
//!   than three `##` sections
//! - consistency fails when artifacts declare different `**Feature**:` labels
//! - quality = `0.7 * avg(completeness) + 0.3 * (100 or 80)`

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::store::{ArtifactKind, ArtifactStore};
use super::validation::placeholders;
use crate::error::Result;

const MIN_LENGTH: usize = 500;
const MIN_SECTIONS: usize = 3;
const TARGET_SCORE: f64 = 70.0;

static FEATURE_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\*\*Feature\*\*:[ \t]*(.+?)[ \t]*$").expect("valid label regex"));

/// Metrics for one artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactAnalysis {
    /// Length in characters
    pub length: usize,

    /// Number of lines
    pub lines: usize,

    /// Number of `##` headings
    pub sections: usize,

    /// Number of distinct unresolved placeholders
    pub placeholders: usize,

    /// Human-readable issues
    pub issues: Vec<String>,

    /// Completeness percentage, one decimal
    pub completeness: f64,
}

/// Cross-artifact consistency findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Distinct `**Feature**:` labels found
    pub feature_labels: Vec<String>,

    /// Problems found
    pub issues: Vec<String>,
}

/// Snapshot written to `analysis.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// RFC 3339 time of the analysis
    pub timestamp: String,

    /// Feature the report covers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,

    /// Per-artifact metrics
    pub artifacts: BTreeMap<ArtifactKind, ArtifactAnalysis>,

    /// Consistency findings
    pub consistency: ConsistencyReport,

    /// Aggregate score, one decimal
    pub quality_score: f64,

    /// Suggested follow-ups
    pub recommendations: Vec<String>,
}

impl QualityReport {
    /// Whether any artifact or the consistency check reported issues.
    pub fn has_issues(&self) -> bool {
        !self.consistency.issues.is_empty() || self.artifacts.values().any(|a| !a.issues.is_empty())
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Measure one artifact.
pub fn analyze_artifact(content: &str) -> ArtifactAnalysis {
    let length = content.chars().count();
    let lines = content.lines().count();
    let sections = content.lines().filter(|l| l.trim_start().starts_with("##")).count();
    let placeholder_count = placeholders(content).len();

    let mut issues = Vec::new();
    if placeholder_count > 0 {
        issues.push(format!("{placeholder_count} unresolved placeholder(s)"));
    }
    if length < MIN_LENGTH {
        issues.push(format!("Content too short ({length} characters)"));
    }
    if sections < MIN_SECTIONS {
        issues.push(format!("Too few sections ({sections})"));
    }

    let completeness = round1((100.0 - issues.len() as f64 / 3.0 * 100.0).max(0.0));

    ArtifactAnalysis { length, lines, sections, placeholders: placeholder_count, issues, completeness }
}

/// Compare the `**Feature**:` labels across artifacts.
pub fn check_consistency(artifacts: &[(ArtifactKind, String)]) -> ConsistencyReport {
    let mut labels: Vec<String> = Vec::new();
    for (_, content) in artifacts {
        for caps in FEATURE_LABEL.captures_iter(content) {
            let label = caps[1].to_string();
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }

    let mut issues = Vec::new();
    if labels.len() > 1 {
        issues.push(format!("Inconsistent feature labels: {}", labels.join(", ")));
    }

    ConsistencyReport { feature_labels: labels, issues }
}

/// Analyze a set of artifacts.
pub fn analyze(artifacts: &[(ArtifactKind, String)]) -> QualityReport {
    let per_artifact: BTreeMap<ArtifactKind, ArtifactAnalysis> =
        artifacts.iter().map(|(kind, content)| (*kind, analyze_artifact(content))).collect();
    let consistency = check_consistency(artifacts);

    let quality_score = if per_artifact.is_empty() {
        0.0
    } else {
        let average = per_artifact.values().map(|a| a.completeness).sum::<f64>()
            / per_artifact.len() as f64;
        let consistency_score = if consistency.issues.is_empty() { 100.0 } else { 80.0 };
        round1(0.7 * average + 0.3 * consistency_score)
    };

    let recommendations = recommendations(&per_artifact, &consistency, quality_score);

    QualityReport {
        timestamp: chrono::Utc::now().to_rfc3339(),
        feature: None,
        artifacts: per_artifact,
        consistency,
        quality_score,
        recommendations,
    }
}

/// Load the scored artifacts of `feature` (plus the constitution) and analyze them.
pub fn analyze_feature(store: &dyn ArtifactStore, feature: &str) -> Result<QualityReport> {
    let mut artifacts = load_artifacts(store, feature)?;
    artifacts.retain(|(kind, _)| kind.is_scored());
    let mut report = analyze(&artifacts);
    report.feature = Some(feature.to_string());
    Ok(report)
}

/// All existing artifacts for a feature, in workflow order.
pub fn load_artifacts(
    store: &dyn ArtifactStore,
    feature: &str,
) -> Result<Vec<(ArtifactKind, String)>> {
    let mut artifacts = Vec::new();
    for kind in ArtifactKind::ALL {
        if let Some(content) = store.read(&kind.scope(feature), kind)? {
            artifacts.push((kind, content));
        }
    }
    Ok(artifacts)
}

fn recommendations(
    artifacts: &BTreeMap<ArtifactKind, ArtifactAnalysis>,
    consistency: &ConsistencyReport,
    score: f64,
) -> Vec<String> {
    let mut out = Vec::new();

    if !artifacts.is_empty() && score < TARGET_SCORE {
        out.push(format!(
            "Overall quality is below target ({score:.1}/100); review the artifacts flagged below"
        ));
    }

    for (kind, analysis) in artifacts {
        if analysis.placeholders > 0 {
            out.push(format!("Fill remaining placeholders in {kind}"));
        }
        if analysis.completeness < 80.0 {
            out.push(format!("Improve completeness of {kind} ({:.1}%)", analysis.completeness));
        }
    }

    for issue in &consistency.issues {
        out.push(format!("Fix consistency: {issue}"));
    }

    if out.is_empty() {
        out.push("All artifacts meet quality standards".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::store::{MemoryArtifactStore, Scope};

    fn clean_doc(label: &str) -> String {
        let mut doc = format!("# Document\n\n**Feature**: {label}\n\n");
        for title in ["One", "Two", "Three"] {
            doc.push_str(&format!("## {title}\n\n{}\n\n", "Plain descriptive text. ".repeat(8)));
        }
        doc
    }

    #[test]
    fn test_clean_artifact_is_complete() {
        let analysis = analyze_artifact(&clean_doc("feature-001-a"));
        assert!(analysis.length >= 500);
        assert_eq!(analysis.sections, 3);
        assert!(analysis.issues.is_empty());
        assert!((analysis.completeness - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_one_placeholder_drops_completeness() {
        let doc = clean_doc("feature-001-a") + "\n[OWNER]\n";
        let analysis = analyze_artifact(&doc);
        assert_eq!(analysis.placeholders, 1);
        assert!((analysis.completeness - 66.7).abs() < 1e-9);
    }

    #[test]
    fn test_completeness_floor() {
        let analysis = analyze_artifact("[A_B] short");
        assert_eq!(analysis.issues.len(), 3);
        assert!(analysis.completeness.abs() < f64::EPSILON);
    }

    #[test]
    fn test_consistency_detects_label_mismatch() {
        let artifacts = vec![
            (ArtifactKind::Specification, clean_doc("feature-001-a")),
            (ArtifactKind::Plan, clean_doc("feature-001-a")),
            (ArtifactKind::Tasks, clean_doc("feature-002-b")),
        ];
        let report = check_consistency(&artifacts);
        assert_eq!(report.feature_labels, vec!["feature-001-a", "feature-002-b"]);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_quality_score_clean() {
        let artifacts = vec![
            (ArtifactKind::Specification, clean_doc("feature-001-a")),
            (ArtifactKind::Plan, clean_doc("feature-001-a")),
        ];
        let report = analyze(&artifacts);
        assert!((report.quality_score - 100.0).abs() < f64::EPSILON);
        assert!(!report.has_issues());
        assert_eq!(report.recommendations, vec!["All artifacts meet quality standards"]);
    }

    #[test]
    fn test_quality_score_with_issues() {
        let artifacts = vec![
            (ArtifactKind::Specification, clean_doc("feature-001-a") + "[OWNER]"),
            (ArtifactKind::Plan, clean_doc("feature-009-z")),
        ];
        let report = analyze(&artifacts);
        // avg(66.7, 100) = 83.35 -> 0.7 * 83.35 + 0.3 * 80 = 82.345
        assert!((report.quality_score - 82.3).abs() < 1e-9);
        assert!(report
            .recommendations
            .contains(&"Fill remaining placeholders in specification".to_string()));
        assert!(report.recommendations.iter().any(|r| r.starts_with("Fix consistency")));
    }

    #[test]
    fn test_low_score_recommendation() {
        let report = analyze(&[(ArtifactKind::Tasks, "tiny".to_string())]);
        assert!(report.quality_score < TARGET_SCORE);
        assert!(report.recommendations[0].starts_with("Overall quality is below target"));
    }

    #[test]
    fn test_empty_analysis() {
        let report = analyze(&[]);
        assert!(report.quality_score.abs() < f64::EPSILON);
        assert_eq!(report.recommendations, vec!["All artifacts meet quality standards"]);
    }

    #[test]
    fn test_analyze_feature_reads_store() {
        let store = MemoryArtifactStore::new();
        store.write(&Scope::Project, ArtifactKind::Constitution, &clean_doc("x")).unwrap();
        store
            .write(&Scope::Feature("feature-001-a".into()), ArtifactKind::Plan, &clean_doc("feature-001-a"))
            .unwrap();

        let report = analyze_feature(&store, "feature-001-a").unwrap();
        assert_eq!(report.feature.as_deref(), Some("feature-001-a"));
        assert_eq!(report.artifacts.len(), 2);
    }

    #[test]
    fn test_answered_clarifications_do_not_change_score() {
        let store = MemoryArtifactStore::new();
        let scope = Scope::Feature("feature-001-a".into());
        store.write(&Scope::Project, ArtifactKind::Constitution, &clean_doc("feature-001-a")).unwrap();
        for kind in [
            ArtifactKind::Specification,
            ArtifactKind::Plan,
            ArtifactKind::Tasks,
            ArtifactKind::Implementation,
        ] {
            store.write(&scope, kind, &clean_doc("feature-001-a")).unwrap();
        }
        let before = analyze_feature(&store, "feature-001-a").unwrap();

        let answers = "# Clarifications\n\n**Q1**: Who signs in?\n\n**A**: Staff only.\n";
        store.write(&scope, ArtifactKind::Clarifications, answers).unwrap();
        let after = analyze_feature(&store, "feature-001-a").unwrap();

        assert!((before.quality_score - 100.0).abs() < f64::EPSILON);
        assert!((after.quality_score - before.quality_score).abs() < f64::EPSILON);
        assert!(!after.artifacts.contains_key(&ArtifactKind::Clarifications));
        assert!(load_artifacts(&store, "feature-001-a")
            .unwrap()
            .iter()
            .any(|(kind, _)| *kind == ArtifactKind::Clarifications));
    }

    #[test]
    fn test_report_serializes_kind_keys() {
        let report = analyze(&[(ArtifactKind::Plan, clean_doc("a"))]);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["artifacts"]["plan"]["completeness"].is_number());
    }
}
