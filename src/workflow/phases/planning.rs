//! Phase 3: technical plan.

use super::{Phase, PhaseContext, PhaseKind};
use crate::workflow::store::ArtifactKind;
use crate::workflow::validation::{validate_plan, Validation};

/// Writes `plan.md` and checks it against the specification.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanningPhase;

impl Phase for PlanningPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Planning
    }

    fn validate(&self, content: &str, ctx: &PhaseContext<'_>) -> Validation {
        let specification = ctx.artifact(ArtifactKind::Specification);
        validate_plan(content, specification.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::operator::AutoOperator;
    use crate::workflow::phases::test_support::{generation, CannedGenerator};
    use crate::workflow::store::{ArtifactStore, MemoryArtifactStore, Scope};
    use crate::workflow::templates::TemplateLibrary;

    const SPEC: &str = "## Functional Requirements\n\n\
                        - Users manage a Shopping List.\n\
                        - Items carry Due Dates.\n\
                        - Owners share a Family Board.\n\n\
                        ## Success Criteria\n";

    fn run(plan: &str) -> Vec<String> {
        let store = MemoryArtifactStore::new();
        store
            .write(&Scope::Feature("feature-001-list".into()), ArtifactKind::Specification, SPEC)
            .unwrap();
        let generator = CannedGenerator::default().with(ArtifactKind::Plan, plan);
        let operator = AutoOperator::no();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = PhaseContext {
            store: &store,
            generator: &generator,
            operator: &operator,
            templates: &templates,
            feature: "feature-001-list",
            generation: &gen,
            max_clarifications: 3,
        };
        let result = PlanningPhase.execute(&ctx);
        assert!(result.success);
        result.errors
    }

    #[test]
    fn test_plan_covering_spec_is_valid() {
        let plan = "## Tech Stack\n\nAny.\n\n## Architecture\n\n\
                    The shopping list and due dates modules.\n\n## File Structure\n\nsrc/\n";
        assert!(run(plan).is_empty());
    }

    #[test]
    fn test_plan_missing_coverage_is_reported() {
        let plan = "## Tech Stack\n\nAny.\n\n## Architecture\n\nA shopping list.\n\n## File Structure\n";
        let errors = run(plan);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("1/3"));
    }
}
