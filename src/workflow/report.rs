//! Plain-text rendering of workflow results.

use std::fmt::Write;

use super::analysis::QualityReport;
use super::checklist::Checklist;
use super::orchestrator::{WorkflowResult, WorkflowState};
use super::trigger::Classification;

/// Summary of a run: outcome, phases, artifacts, quality.
pub fn render_summary(result: &WorkflowResult) -> String {
    let mut out = String::new();

    let headline = match &result.state {
        WorkflowState::Summary => format!("Workflow complete for {}", result.feature),
        WorkflowState::Failed { phase, reason } => {
            format!("Workflow failed at phase {}: {reason}", phase.title())
        }
        WorkflowState::Cancelled { phase } => {
            format!("Workflow cancelled during phase {}", phase.title())
        }
        WorkflowState::Start | WorkflowState::Running { .. } => {
            format!("Workflow interrupted for {}", result.feature)
        }
    };
    let _ = writeln!(out, "{headline}");
    let _ = writeln!(out, "Feature: {} (complexity: {})", result.feature, result.complexity);
    let _ = writeln!(out, "Run: {}", result.run_id);

    out.push_str("\nPhases:\n");
    for phase in &result.phases {
        let status = if phase.success {
            "ok"
        } else if phase.cancelled {
            "cancelled"
        } else {
            "FAILED"
        };
        let mut line = format!("  [{status}] {}. {}", phase.phase.number(), phase.phase.title());
        if phase.reused {
            line.push_str(" (reused)");
        } else if phase.success && phase.content.is_empty() {
            line.push_str(" (nothing to record)");
        }
        if !phase.errors.is_empty() {
            let _ = write!(line, " - {} warning(s)", phase.errors.len());
        }
        if let Some(reason) = &phase.failure {
            let _ = write!(line, " - {reason}");
        }
        let _ = writeln!(out, "{line}");
    }

    out.push_str("\nArtifacts:\n");
    if result.artifacts.is_empty() {
        out.push_str("  (none)\n");
    }
    for artifact in &result.artifacts {
        let _ = writeln!(out, "  - {}: {}", artifact.kind, artifact.location);
    }

    if !result.errors.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.errors {
            let _ = writeln!(out, "  - {warning}");
        }
    }

    if let Some(quality) = &result.quality {
        out.push('\n');
        out.push_str(&render_quality(quality));
    }
    out
}

/// Quality report: per-artifact completeness, consistency, recommendations.
pub fn render_quality(report: &QualityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Quality score: {:.1}/100", report.quality_score);

    for (kind, analysis) in &report.artifacts {
        let _ = writeln!(
            out,
            "  {kind:<15} {:>5.1}%  {} chars, {} sections",
            analysis.completeness, analysis.length, analysis.sections
        );
        for issue in &analysis.issues {
            let _ = writeln!(out, "      - {issue}");
        }
    }

    if report.consistency.issues.is_empty() {
        out.push_str("  Consistency: ok\n");
    } else {
        for issue in &report.consistency.issues {
            let _ = writeln!(out, "  Consistency: {issue}");
        }
    }

    out.push_str("Recommendations:\n");
    for recommendation in &report.recommendations {
        let _ = writeln!(out, "  - {recommendation}");
    }
    out
}

/// Checklist grouped by category.
pub fn render_checklist(checklist: &Checklist) -> String {
    let mut out = String::new();
    for category in checklist.categories() {
        let _ = writeln!(out, "{category}");
        for item in checklist.category(category) {
            let mark = if item.passed { "x" } else { " " };
            let _ = writeln!(out, "  [{mark}] {}", item.check);
        }
    }
    let _ = writeln!(
        out,
        "\nPassed {}/{} ({:.1}%)",
        checklist.passed, checklist.total, checklist.pass_rate
    );
    out
}

/// Classifier verdict.
pub fn render_classification(classification: &Classification) -> String {
    format!(
        "Trigger workflow: {}\nComplexity: {}\nWords: {}, markers: {}, technical terms: {}\n",
        if classification.should_trigger { "yes" } else { "no" },
        classification.complexity,
        classification.words,
        classification.markers,
        classification.technical_terms
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::checklist::run_checklist;
    use crate::workflow::orchestrator::ArtifactRef;
    use crate::workflow::phases::{PhaseKind, PhaseResult};
    use crate::workflow::store::ArtifactKind;
    use crate::workflow::trigger::{classify, Complexity};

    fn failed_result() -> WorkflowResult {
        WorkflowResult {
            run_id: "run-1".to_string(),
            success: false,
            feature: "feature-001-todo".to_string(),
            feature_number: 1,
            complexity: Complexity::Simple,
            phases: vec![
                PhaseResult::generated(PhaseKind::Constitution, "c".into(), Vec::new()),
                PhaseResult::generated(
                    PhaseKind::Specification,
                    "s".into(),
                    vec!["Missing required section: Success Criteria".into()],
                ),
                PhaseResult::failed(PhaseKind::Planning, "Generation failed: timeout"),
            ],
            artifacts: vec![
                ArtifactRef {
                    kind: ArtifactKind::Constitution,
                    location: "/p/memory/constitution.md".into(),
                    reused: false,
                },
                ArtifactRef {
                    kind: ArtifactKind::Specification,
                    location: "/p/specs/feature-001-todo/spec.md".into(),
                    reused: false,
                },
            ],
            quality: None,
            failure: Some("Planning failed: Generation failed: timeout".into()),
            errors: vec![
                "Specification: Missing required section: Success Criteria".into(),
                "Specification: Step 2 failed: check the upstream id".into(),
            ],
            state: WorkflowState::Failed {
                phase: PhaseKind::Planning,
                reason: "Generation failed: timeout".into(),
            },
        }
    }

    #[test]
    fn test_summary_names_failed_phase_and_artifacts() {
        let text = render_summary(&failed_result());
        assert!(text.starts_with("Workflow failed at phase Planning"));
        assert!(text.contains("[FAILED] 3. Planning - Generation failed: timeout"));
        assert!(text.contains("[ok] 2. Specification - 1 warning(s)"));
        assert!(text.contains("- constitution: /p/memory/constitution.md"));
        assert!(text.contains("- specification: /p/specs/feature-001-todo/spec.md"));
        assert!(text.contains("Warnings:\n  - Specification: Missing required section"));
        assert!(!text.contains("Quality score"));
    }

    #[test]
    fn test_summary_keeps_warnings_that_mention_failure() {
        let text = render_summary(&failed_result());
        assert!(text.contains("  - Specification: Step 2 failed: check the upstream id"));
        assert!(!text.contains("  - Planning failed"));
    }

    #[test]
    fn test_checklist_rendering() {
        let text = render_checklist(&run_checklist(&[]));
        assert!(text.contains("Constitution\n  [ ] Constitution exists"));
        assert!(text.contains("Passed 0/15 (0.0%)"));
    }

    #[test]
    fn test_classification_rendering() {
        let text = render_classification(&classify("create a todo app"));
        assert!(text.contains("Trigger workflow: yes"));
        assert!(text.contains("Complexity: simple"));
    }
}
