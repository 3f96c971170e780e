//! Phase 5: implementation log.

use super::{Phase, PhaseContext, PhaseKind};
use crate::workflow::validation::Validation;

/// Writes `implementation.md`, a progress log seeded from the tasks.
///
/// The log is free-form, so it is always valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplementationPhase;

impl Phase for ImplementationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Implementation
    }

    fn validate(&self, _content: &str, _ctx: &PhaseContext<'_>) -> Validation {
        Validation::ok()
    }
}
