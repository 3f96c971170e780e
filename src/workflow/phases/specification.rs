//! Phase 2: feature specification (WHAT and WHY, never HOW).

use super::{Phase, PhaseContext, PhaseKind};
use crate::workflow::validation::{validate_specification, Validation};

/// Writes `spec.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationPhase;

impl Phase for SpecificationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Specification
    }

    fn validate(&self, content: &str, _ctx: &PhaseContext<'_>) -> Validation {
        validate_specification(content)
    }
}
