//! Phase 4: task breakdown.

use super::{Phase, PhaseContext, PhaseKind};
use crate::workflow::validation::{validate_tasks, Validation};

/// Writes `tasks.md`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TasksPhase;

impl Phase for TasksPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Tasks
    }

    fn validate(&self, content: &str, _ctx: &PhaseContext<'_>) -> Validation {
        validate_tasks(content)
    }
}
