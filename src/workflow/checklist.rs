//! Quality checklist: grouped yes/no checks over a feature's documents.

use serde::Serialize;

use super::store::ArtifactKind;
use super::validation::{has_header, how_terms};

/// One check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    /// Group, e.g. "Specification"
    pub category: &'static str,

    /// What was checked
    pub check: &'static str,

    /// Outcome
    pub passed: bool,
}

/// Result of [`run_checklist`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Checklist {
    pub items: Vec<ChecklistItem>,
    pub passed: usize,
    pub total: usize,

    /// Percentage of passed checks, one decimal
    pub pass_rate: f64,
}

impl Checklist {
    /// Items of one category, in order.
    pub fn category<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ChecklistItem> + 'a {
        self.items.iter().filter(move |i| i.category == name)
    }

    /// Category names in order of first appearance.
    pub fn categories(&self) -> Vec<&'static str> {
        let mut out: Vec<&'static str> = Vec::new();
        for item in &self.items {
            if !out.contains(&item.category) {
                out.push(item.category);
            }
        }
        out
    }
}

type Check = (&'static str, fn(&str) -> bool);

const CONSTITUTION_CHECKS: &[Check] = &[
    ("Constitution exists", |_| true),
    ("Version is declared", |c| c.to_lowercase().contains("version")),
    ("Governance section present", |c| has_header(c, "Governance")),
];

const SPECIFICATION_CHECKS: &[Check] = &[
    ("Functional requirements listed", |c| has_header(c, "Functional Requirements")),
    ("User stories described", |c| has_header(c, "User Scenarios")),
    ("Success criteria defined", |c| has_header(c, "Success Criteria")),
    ("No implementation details", |c| how_terms(c).is_empty()),
];

const PLANNING_CHECKS: &[Check] = &[
    ("Tech stack defined", |c| has_header(c, "Tech Stack")),
    ("Architecture described", |c| has_header(c, "Architecture")),
    ("Risks identified", |c| has_header(c, "Risk")),
    ("File structure outlined", |c| has_header(c, "File Structure")),
];

const TASKS_CHECKS: &[Check] = &[
    ("Tasks use checkboxes", |c| c.contains("- [ ]") || c.contains("- [x]")),
    ("Effort estimated", |c| c.to_lowercase().contains("effort")),
    ("Dependencies listed", |c| c.to_lowercase().contains("dependencies")),
    ("Acceptance criteria defined", |c| c.to_lowercase().contains("acceptance criteria")),
];

/// Run every check. Checks on a missing document fail.
pub fn run_checklist(artifacts: &[(ArtifactKind, String)]) -> Checklist {
    let groups: [(&'static str, ArtifactKind, &[Check]); 4] = [
        ("Constitution", ArtifactKind::Constitution, CONSTITUTION_CHECKS),
        ("Specification", ArtifactKind::Specification, SPECIFICATION_CHECKS),
        ("Planning", ArtifactKind::Plan, PLANNING_CHECKS),
        ("Tasks", ArtifactKind::Tasks, TASKS_CHECKS),
    ];

    let mut items = Vec::new();
    for (category, kind, checks) in groups {
        let content = artifacts.iter().find(|(k, _)| *k == kind).map(|(_, c)| c.as_str());
        for &(check, test) in checks {
            items.push(ChecklistItem { category, check, passed: content.is_some_and(test) });
        }
    }

    let total = items.len();
    let passed = items.iter().filter(|i| i.passed).count();
    let pass_rate = super::analysis::round1(passed as f64 / total as f64 * 100.0);

    Checklist { items, passed, total, pass_rate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_feature_fails_everything() {
        let checklist = run_checklist(&[]);
        assert_eq!(checklist.total, 15);
        assert_eq!(checklist.passed, 0);
        assert!(checklist.pass_rate.abs() < f64::EPSILON);
        assert_eq!(
            checklist.categories(),
            vec!["Constitution", "Specification", "Planning", "Tasks"]
        );
    }

    #[test]
    fn test_partial_checklist() {
        let spec = "## User Scenarios & Testing\n\n## Functional Requirements\n\nStored in a database.\n";
        let tasks = "- [ ] Task 1\n  - **Effort**: S\n  - **Acceptance Criteria**: done\n";
        let checklist = run_checklist(&[
            (ArtifactKind::Specification, spec.to_string()),
            (ArtifactKind::Tasks, tasks.to_string()),
        ]);

        let spec_passed: Vec<bool> = checklist.category("Specification").map(|i| i.passed).collect();
        assert_eq!(spec_passed, vec![true, true, false, false]);

        let task_passed: Vec<bool> = checklist.category("Tasks").map(|i| i.passed).collect();
        assert_eq!(task_passed, vec![true, true, false, true]);

        assert_eq!(checklist.passed, 5);
        assert!((checklist.pass_rate - 33.3).abs() < 1e-9);
    }
}
