//! Phase 6: clarification (optional).
//!
//! Collects open questions from the feature documents and lets the
//! operator answer them. Never calls the generator and never fails the run.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{Phase, PhaseContext, PhaseKind, PhaseResult};
use crate::workflow::store::ArtifactKind;
use crate::workflow::validation::{Validation, CLARIFICATION_MARKER};

const VAGUE_TERMS: &[&str] = &["maybe", "possibly", "probably", "should", "could", "might"];

static VAGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", VAGUE_TERMS.join("|"))).expect("valid vague-term regex")
});

static UNFINISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:TBD|TODO)\b").expect("valid TBD regex"));

const SKIP: &str = "Skip";

/// One open question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClarificationItem {
    /// Document the question came from
    pub source: ArtifactKind,

    /// Question shown to the operator
    pub question: String,
}

/// Finds ambiguities and records the operator's answers in `clarifications.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarificationPhase;

impl ClarificationPhase {
    /// Open questions in spec, plan and tasks, capped at `max`.
    ///
    /// Order: explicit `[NEEDS CLARIFICATION]` markers per document, then
    /// vague wording in the spec, then TBD/TODO in the plan.
    pub fn find_items(
        spec: Option<&str>,
        plan: Option<&str>,
        tasks: Option<&str>,
        max: usize,
    ) -> Vec<ClarificationItem> {
        let mut items = Vec::new();

        for (source, content) in [
            (ArtifactKind::Specification, spec),
            (ArtifactKind::Plan, plan),
            (ArtifactKind::Tasks, tasks),
        ] {
            for line in content.unwrap_or_default().lines() {
                let Some(caps) = CLARIFICATION_MARKER.captures(line) else { continue };
                let question = caps
                    .get(1)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|q| !q.is_empty())
                    .unwrap_or_else(|| {
                        CLARIFICATION_MARKER
                            .replace_all(line, "")
                            .trim()
                            .trim_start_matches(['-', '*'])
                            .trim()
                            .to_string()
                    });
                items.push(ClarificationItem { source, question });
            }
        }

        for line in spec.unwrap_or_default().lines() {
            if VAGUE.is_match(line) && !CLARIFICATION_MARKER.is_match(line) {
                items.push(ClarificationItem {
                    source: ArtifactKind::Specification,
                    question: format!("Clarify: {}", line.trim()),
                });
            }
        }

        if plan.is_some_and(|p| UNFINISHED.is_match(p)) {
            items.push(ClarificationItem {
                source: ArtifactKind::Plan,
                question: "Complete TBD/TODO items in technical plan".to_string(),
            });
        }

        items.truncate(max);
        items
    }

    /// Render the answered questions.
    pub fn render(answers: &[(ClarificationItem, String)], date: &str) -> String {
        let mut doc = format!(
            "# Clarifications\n\n**Date**: {date}\n**Total Clarifications**: {}\n\n## Questions and Answers\n\n",
            answers.len()
        );

        for (i, (item, answer)) in answers.iter().enumerate() {
            doc.push_str(&format!(
                "### {}. {}\n\n**Question**: {}\n\n**Answer**: {}\n\n---\n\n",
                i + 1,
                source_title(item.source),
                item.question,
                answer
            ));
        }

        doc.push_str("## Impact Analysis\n\nThese clarifications may require updates to:\n\n");
        let mut sources: Vec<ArtifactKind> = answers.iter().map(|(item, _)| item.source).collect();
        sources.sort();
        sources.dedup();
        for source in sources {
            doc.push_str(&format!("- {}\n", source_title(source)));
        }

        doc.push_str(
            "\n## Next Steps\n\n\
             1. Review clarifications\n\
             2. Update affected documents\n\
             3. Validate consistency across all artifacts\n",
        );
        doc
    }
}

fn source_title(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Specification => "Specification",
        ArtifactKind::Plan => "Plan",
        ArtifactKind::Tasks => "Tasks",
        ArtifactKind::Constitution => "Constitution",
        ArtifactKind::Implementation => "Implementation",
        ArtifactKind::Clarifications => "Clarifications",
    }
}

impl Phase for ClarificationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Clarification
    }

    fn validate(&self, _content: &str, _ctx: &PhaseContext<'_>) -> Validation {
        Validation::ok()
    }

    fn execute(&self, ctx: &PhaseContext<'_>) -> PhaseResult {
        let kind = self.kind();
        let spec = ctx.artifact(ArtifactKind::Specification);
        let plan = ctx.artifact(ArtifactKind::Plan);
        let tasks = ctx.artifact(ArtifactKind::Tasks);

        let items = Self::find_items(
            spec.as_deref(),
            plan.as_deref(),
            tasks.as_deref(),
            ctx.max_clarifications,
        );
        if items.is_empty() {
            tracing::info!("No clarifications needed");
            return PhaseResult::skipped(kind);
        }
        tracing::info!(count = items.len(), "Found items needing clarification");

        let prompt = format!("Found {} item(s) needing clarification. Address them now?", items.len());
        match ctx.operator.ask_yes_no(&prompt, false) {
            Ok(true) => {}
            Ok(false) => return PhaseResult::skipped(kind),
            Err(e) => return PhaseResult::from_operator_error(kind, e),
        }

        let total = items.len();
        let mut answers = Vec::new();
        for (i, item) in items.into_iter().enumerate() {
            let prompt = format!(
                "Question {}/{} ({}): {}",
                i + 1,
                total,
                source_title(item.source),
                item.question
            );
            let answer = match ctx.operator.ask_text(&prompt, SKIP) {
                Ok(answer) => answer,
                Err(e) => return PhaseResult::from_operator_error(kind, e),
            };
            let answer = answer.trim().to_string();
            if !answer.is_empty() && !answer.eq_ignore_ascii_case(SKIP) {
                answers.push((item, answer));
            }
        }

        if answers.is_empty() {
            return PhaseResult::skipped(kind);
        }

        let date = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let content = Self::render(&answers, &date);
        let artifact = kind.artifact();
        if let Err(e) = ctx.store.write(&ctx.scope(artifact), artifact, &content) {
            // Clarification never blocks completion.
            tracing::warn!(error = %e, "Failed to save clarifications");
            let mut result = PhaseResult::skipped(kind);
            result.errors.push(format!("Clarifications not saved: {e}"));
            return result;
        }
        PhaseResult::generated(kind, content, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::operator::{Answer, AutoOperator, Operator, ScriptedOperator};
    use crate::workflow::phases::test_support::{generation, CannedGenerator};
    use crate::workflow::store::{ArtifactStore, MemoryArtifactStore, Scope};
    use crate::workflow::templates::TemplateLibrary;

    const FEATURE: &str = "feature-001-todo";

    const SPEC: &str = "# Spec\n\n\
        - Who can see shared lists? [NEEDS CLARIFICATION]\n\
        - [NEEDS CLARIFICATION: how long are items kept?]\n\
        - Reminders might repeat.\n\
        - Lists could be archived.\n";

    fn run(store: &MemoryArtifactStore, operator: &dyn Operator, max: usize) -> PhaseResult {
        let generator = CannedGenerator::default();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = PhaseContext {
            store,
            generator: &generator,
            operator,
            templates: &templates,
            feature: FEATURE,
            generation: &gen,
            max_clarifications: max,
        };
        let result = ClarificationPhase.execute(&ctx);
        assert!(generator.calls.lock().is_empty());
        result
    }

    fn store_with_spec() -> MemoryArtifactStore {
        let store = MemoryArtifactStore::new();
        store.write(&Scope::Feature(FEATURE.into()), ArtifactKind::Specification, SPEC).unwrap();
        store
    }

    #[test]
    fn test_find_items_order_and_questions() {
        let plan = "## Architecture\n\nTBD\n";
        let items = ClarificationPhase::find_items(Some(SPEC), Some(plan), None, 10);
        let questions: Vec<&str> = items.iter().map(|i| i.question.as_str()).collect();
        assert_eq!(
            questions,
            vec![
                "Who can see shared lists?",
                "how long are items kept?",
                "Clarify: - Reminders might repeat.",
                "Clarify: - Lists could be archived.",
                "Complete TBD/TODO items in technical plan",
            ]
        );
        assert_eq!(items[4].source, ArtifactKind::Plan);
    }

    #[test]
    fn test_vague_terms_match_whole_words() {
        let spec = "The shoulder strap is adjustable.";
        assert!(ClarificationPhase::find_items(Some(spec), None, None, 3).is_empty());
    }

    #[test]
    fn test_items_capped() {
        let items = ClarificationPhase::find_items(Some(SPEC), Some("TODO"), None, 3);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_no_items_is_success_without_prompt() {
        let store = MemoryArtifactStore::new();
        let operator = ScriptedOperator::new(Vec::new());
        let result = run(&store, &operator, 3);
        assert!(result.success);
        assert!(result.content.is_empty());
        assert!(operator.asked().is_empty());
    }

    #[test]
    fn test_declined_is_success_and_writes_nothing() {
        let store = store_with_spec();
        let result = run(&store, &AutoOperator::no(), 3);
        assert!(result.success);
        assert!(result.content.is_empty());
        assert!(!store
            .exists(&Scope::Feature(FEATURE.into()), ArtifactKind::Clarifications)
            .unwrap());
    }

    #[test]
    fn test_answers_are_recorded() {
        let store = store_with_spec();
        let operator = ScriptedOperator::new([
            Answer::Yes,
            Answer::Text("Only invited members".into()),
            Answer::Text("skip".into()),
            Answer::Text("Yes, weekly".into()),
        ]);

        let result = run(&store, &operator, 3);
        assert!(result.success);
        assert_eq!(operator.asked().len(), 4);

        let doc = store
            .read(&Scope::Feature(FEATURE.into()), ArtifactKind::Clarifications)
            .unwrap()
            .unwrap();
        assert!(doc.contains("**Total Clarifications**: 2"));
        assert!(doc.contains("**Answer**: Only invited members"));
        assert!(doc.contains("**Answer**: Yes, weekly"));
        assert!(!doc.contains("how long are items kept?"));
        assert!(doc.contains("## Impact Analysis"));
        assert!(doc.contains("- Specification"));
    }

    #[test]
    fn test_interrupt_cancels() {
        let store = store_with_spec();
        let operator = ScriptedOperator::new([Answer::Yes, Answer::Interrupt]);
        let result = run(&store, &operator, 3);
        assert!(result.cancelled);
    }
}
