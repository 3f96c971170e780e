//! Phase 1: project constitution.

use super::{Phase, PhaseContext, PhaseKind};
use crate::workflow::operator::OperatorError;
use crate::workflow::validation::{validate_constitution, Validation};

/// Writes the project-wide constitution to `memory/constitution.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstitutionPhase;

impl Phase for ConstitutionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Constitution
    }

    fn validate(&self, content: &str, _ctx: &PhaseContext<'_>) -> Validation {
        validate_constitution(content)
    }

    fn operator_input(&self, ctx: &PhaseContext<'_>) -> Result<Option<String>, OperatorError> {
        if !ctx.operator.ask_yes_no("Provide custom principles for the constitution?", false)? {
            return Ok(None);
        }

        let principles =
            ctx.operator.ask_text("Principles (separate with ';')", "")?.replace(';', "\n");
        Ok(Some(principles).filter(|p| !p.trim().is_empty()))
    }
}
