//! Workflow phases.
//!
//! Every phase shares one lifecycle (see [`Phase::execute`]):
//!
//! 1. If the artifact already exists, ask whether to reuse it
//! 2. Load the template and ask the generator for one document
//! 3. Persist it
//! 4. Validate it; validation errors are warnings, not failures
//!
//! Clarification is the exception: it never calls the generator.

mod clarification;
mod constitution;
mod implementation;
mod planning;
mod specification;
mod tasks;

use std::fmt;

use serde::Serialize;

pub use clarification::{ClarificationItem, ClarificationPhase};
pub use constitution::ConstitutionPhase;
pub use implementation::ImplementationPhase;
pub use planning::PlanningPhase;
pub use specification::SpecificationPhase;
pub use tasks::TasksPhase;

use super::generator::{ContentGenerator, GenerationContext, GenerationError, GenerationRequest};
use super::operator::{Operator, OperatorError};
use super::store::{ArtifactKind, ArtifactStore, Scope};
use super::templates::TemplateLibrary;
use super::validation::Validation;
use crate::error::WorkflowError;

/// The six workflow phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Constitution,
    Specification,
    Planning,
    Tasks,
    Implementation,
    Clarification,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [Self; 6] = [
        Self::Constitution,
        Self::Specification,
        Self::Planning,
        Self::Tasks,
        Self::Implementation,
        Self::Clarification,
    ];

    /// Lowercase identifier, used in metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constitution => "constitution",
            Self::Specification => "specification",
            Self::Planning => "planning",
            Self::Tasks => "tasks",
            Self::Implementation => "implementation",
            Self::Clarification => "clarification",
        }
    }

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Constitution => "Constitution",
            Self::Specification => "Specification",
            Self::Planning => "Planning",
            Self::Tasks => "Tasks",
            Self::Implementation => "Implementation",
            Self::Clarification => "Clarification",
        }
    }

    /// 1-based position in the workflow.
    pub fn number(self) -> usize {
        Self::ALL.iter().position(|k| *k == self).map_or(0, |i| i + 1)
    }

    /// Artifact this phase writes.
    pub fn artifact(self) -> ArtifactKind {
        match self {
            Self::Constitution => ArtifactKind::Constitution,
            Self::Specification => ArtifactKind::Specification,
            Self::Planning => ArtifactKind::Plan,
            Self::Tasks => ArtifactKind::Tasks,
            Self::Implementation => ArtifactKind::Implementation,
            Self::Clarification => ArtifactKind::Clarifications,
        }
    }

    /// Phases that must have succeeded before this one starts.
    pub fn predecessors(self) -> &'static [Self] {
        match self {
            Self::Constitution => &[],
            Self::Specification => &[Self::Constitution],
            Self::Planning => &[Self::Constitution, Self::Specification],
            Self::Tasks => &[Self::Specification, Self::Planning],
            Self::Implementation => &[Self::Planning, Self::Tasks],
            Self::Clarification => &[Self::Specification, Self::Planning, Self::Tasks],
        }
    }

    /// Whether the run can complete without this phase.
    pub fn is_optional(self) -> bool {
        matches!(self, Self::Clarification)
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase implementation for `kind`.
pub fn phase_for(kind: PhaseKind) -> Box<dyn Phase> {
    match kind {
        PhaseKind::Constitution => Box::new(ConstitutionPhase),
        PhaseKind::Specification => Box::new(SpecificationPhase),
        PhaseKind::Planning => Box::new(PlanningPhase),
        PhaseKind::Tasks => Box::new(TasksPhase),
        PhaseKind::Implementation => Box::new(ImplementationPhase),
        PhaseKind::Clarification => Box::new(ClarificationPhase),
    }
}

/// Collaborators and inputs shared by all phases of one run.
pub struct PhaseContext<'a> {
    /// Where artifacts live
    pub store: &'a dyn ArtifactStore,

    /// Who writes documents
    pub generator: &'a dyn ContentGenerator,

    /// Who answers questions
    pub operator: &'a dyn Operator,

    /// Where templates come from
    pub templates: &'a TemplateLibrary,

    /// Feature key, e.g. `feature-001-todo-app`
    pub feature: &'a str,

    /// Base generation inputs (project, request, role, date)
    pub generation: &'a GenerationContext,

    /// Cap on clarification questions
    pub max_clarifications: usize,
}

impl PhaseContext<'_> {
    /// Scope of `kind` for this run's feature.
    pub fn scope(&self, kind: ArtifactKind) -> Scope {
        kind.scope(self.feature)
    }

    /// Read an artifact of this run, treating store errors as absent.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<String> {
        match self.store.read(&self.scope(kind), kind) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Failed to read artifact");
                None
            }
        }
    }

    /// Artifacts of the predecessors of `phase`, in workflow order.
    pub fn prior_artifacts(&self, phase: PhaseKind) -> Vec<(ArtifactKind, String)> {
        phase
            .predecessors()
            .iter()
            .filter_map(|p| self.artifact(p.artifact()).map(|content| (p.artifact(), content)))
            .collect()
    }
}

/// Outcome of one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseResult {
    /// Which phase ran
    pub phase: PhaseKind,

    /// False only for hard failures and cancellation
    pub success: bool,

    /// Document produced or reused; empty when nothing was written
    pub content: String,

    /// Validation warnings
    pub errors: Vec<String>,

    /// Whether an existing artifact was kept
    pub reused: bool,

    /// Reason of a hard failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// Whether the operator interrupted the phase
    pub cancelled: bool,
}

impl PhaseResult {
    fn base(phase: PhaseKind, success: bool) -> Self {
        Self {
            phase,
            success,
            content: String::new(),
            errors: Vec::new(),
            reused: false,
            failure: None,
            cancelled: false,
        }
    }

    /// Document generated and written; `errors` are validation warnings.
    pub fn generated(phase: PhaseKind, content: String, errors: Vec<String>) -> Self {
        Self { content, errors, ..Self::base(phase, true) }
    }

    /// Existing document kept.
    pub fn reused(phase: PhaseKind, content: String, errors: Vec<String>) -> Self {
        Self { content, errors, reused: true, ..Self::base(phase, true) }
    }

    /// Success without an artifact.
    pub fn skipped(phase: PhaseKind) -> Self {
        Self::base(phase, true)
    }

    /// Hard failure.
    pub fn failed(phase: PhaseKind, reason: impl Into<String>) -> Self {
        Self { failure: Some(reason.into()), ..Self::base(phase, false) }
    }

    /// Operator interrupt.
    pub fn cancelled(phase: PhaseKind) -> Self {
        Self { cancelled: true, ..Self::base(phase, false) }
    }

    /// Whether the document was written or reused.
    pub fn has_artifact(&self) -> bool {
        self.success && !self.content.is_empty()
    }

    fn from_error(phase: PhaseKind, error: WorkflowError) -> Self {
        if error.is_cancellation() {
            Self::cancelled(phase)
        } else {
            Self::failed(phase, error.to_string())
        }
    }

    fn from_operator_error(phase: PhaseKind, error: OperatorError) -> Self {
        match error {
            OperatorError::Interrupted => Self::cancelled(phase),
            OperatorError::Io(e) => Self::failed(phase, format!("Operator I/O error: {e}")),
        }
    }
}

/// One step of the workflow.
pub trait Phase {
    /// Which phase this is.
    fn kind(&self) -> PhaseKind;

    /// Check a document against this phase's rules.
    fn validate(&self, content: &str, ctx: &PhaseContext<'_>) -> Validation;

    /// Ask the operator for phase-specific input before generation.
    fn operator_input(&self, _ctx: &PhaseContext<'_>) -> Result<Option<String>, OperatorError> {
        Ok(None)
    }

    /// Run the phase.
    fn execute(&self, ctx: &PhaseContext<'_>) -> PhaseResult {
        run_generated(self, ctx)
    }
}

/// Reuse, generate, persist, validate.
fn run_generated<P: Phase + ?Sized>(phase: &P, ctx: &PhaseContext<'_>) -> PhaseResult {
    let kind = phase.kind();
    let artifact = kind.artifact();
    let scope = ctx.scope(artifact);

    let existing = match ctx.store.read(&scope, artifact) {
        Ok(existing) => existing,
        Err(e) => return PhaseResult::from_error(kind, e),
    };

    if let Some(content) = existing {
        let prompt = format!(
            "{} already exists at {}. Reuse it?",
            kind.title(),
            ctx.store.location(&scope, artifact)
        );
        match ctx.operator.ask_yes_no(&prompt, true) {
            Ok(true) => {
                tracing::info!(phase = %kind, "Reusing existing artifact");
                let validation = phase.validate(&content, ctx);
                return PhaseResult::reused(kind, content, validation.errors);
            }
            Ok(false) => {}
            Err(e) => return PhaseResult::from_operator_error(kind, e),
        }
    }

    let extra = match phase.operator_input(ctx) {
        Ok(extra) => extra,
        Err(e) => return PhaseResult::from_operator_error(kind, e),
    };

    let template = match ctx.templates.load(artifact) {
        Ok(template) => template,
        Err(e) => return PhaseResult::from_error(kind, e),
    };

    let mut generation = ctx.generation.clone();
    generation.feature = if artifact.is_global() { String::new() } else { ctx.feature.to_string() };
    generation.extra = extra;
    generation.prior = ctx.prior_artifacts(kind);

    let request = GenerationRequest { kind: artifact, template: &template, context: &generation };
    tracing::debug!(phase = %kind, generator = ctx.generator.name(), "Generating document");

    let content = match ctx.generator.generate(&request) {
        Ok(content) if content.trim().is_empty() => {
            return PhaseResult::from_error(kind, GenerationError::Empty.into());
        }
        Ok(content) => content,
        Err(e) => return PhaseResult::from_error(kind, e.into()),
    };

    if let Err(e) = ctx.store.write(&scope, artifact, &content) {
        return PhaseResult::from_error(kind, e);
    }

    let validation = phase.validate(&content, ctx);
    for error in &validation.errors {
        tracing::warn!(phase = %kind, error = %error, "Validation warning");
    }
    PhaseResult::generated(kind, content, validation.errors)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use parking_lot::Mutex;

    use super::*;

    /// Generator returning canned documents per kind.
    #[derive(Default)]
    pub struct CannedGenerator {
        pub docs: BTreeMap<ArtifactKind, Result<String, String>>,
        pub calls: Mutex<Vec<ArtifactKind>>,
    }

    impl CannedGenerator {
        pub fn with(mut self, kind: ArtifactKind, doc: &str) -> Self {
            self.docs.insert(kind, Ok(doc.to_string()));
            self
        }

        pub fn failing(mut self, kind: ArtifactKind, reason: &str) -> Self {
            self.docs.insert(kind, Err(reason.to_string()));
            self
        }
    }

    impl ContentGenerator for CannedGenerator {
        fn name(&self) -> &str {
            "canned"
        }

        fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
            self.calls.lock().push(request.kind);
            match self.docs.get(&request.kind) {
                Some(Ok(doc)) => Ok(doc.clone()),
                Some(Err(reason)) => Err(GenerationError::Failed(reason.clone())),
                None => Err(GenerationError::Unavailable("no canned document".to_string())),
            }
        }
    }

    pub fn generation() -> GenerationContext {
        GenerationContext {
            project_name: "shop".to_string(),
            request: "Create a todo app".to_string(),
            role: "Helpful Assistant".to_string(),
            date: "2026-10-18".to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{generation, CannedGenerator};
    use super::*;
    use crate::workflow::operator::{Answer, AutoOperator, ScriptedOperator};
    use crate::workflow::store::MemoryArtifactStore;

    const FEATURE: &str = "feature-001-todo";

    fn context<'a>(
        store: &'a MemoryArtifactStore,
        generator: &'a CannedGenerator,
        operator: &'a dyn Operator,
        templates: &'a TemplateLibrary,
        generation: &'a GenerationContext,
    ) -> PhaseContext<'a> {
        PhaseContext {
            store,
            generator,
            operator,
            templates,
            feature: FEATURE,
            generation,
            max_clarifications: 3,
        }
    }

    #[test]
    fn test_phase_kind_order_and_artifacts() {
        assert_eq!(PhaseKind::Constitution.number(), 1);
        assert_eq!(PhaseKind::Clarification.number(), 6);
        assert_eq!(PhaseKind::Planning.artifact(), ArtifactKind::Plan);
        assert!(PhaseKind::Clarification.is_optional());
        assert!(PhaseKind::Constitution.predecessors().is_empty());
        for kind in PhaseKind::ALL {
            assert_eq!(phase_for(kind).kind(), kind);
            assert!(kind.predecessors().iter().all(|p| p < &kind));
        }
    }

    #[test]
    fn test_generation_failure_is_hard() {
        let store = MemoryArtifactStore::new();
        let generator = CannedGenerator::default().failing(ArtifactKind::Plan, "quota exceeded");
        let operator = AutoOperator::yes();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = PlanningPhase.execute(&ctx);
        assert!(!result.success);
        assert!(result.failure.unwrap().contains("quota exceeded"));
        assert!(store.read(&ctx.scope(ArtifactKind::Plan), ArtifactKind::Plan).unwrap().is_none());
    }

    #[test]
    fn test_blank_output_is_hard_failure() {
        let store = MemoryArtifactStore::new();
        let generator = CannedGenerator::default().with(ArtifactKind::Tasks, "  \n ");
        let operator = AutoOperator::yes();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = TasksPhase.execute(&ctx);
        assert!(!result.success);
        assert_eq!(result.failure.as_deref(), Some("Generator returned no content"));
    }

    #[test]
    fn test_missing_template_is_hard_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = MemoryArtifactStore::new();
        let generator = CannedGenerator::default().with(ArtifactKind::Tasks, "- [ ] x");
        let operator = AutoOperator::yes();
        let templates = TemplateLibrary::with_dir(temp.path()).without_builtins();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = TasksPhase.execute(&ctx);
        assert!(!result.success);
        assert!(result.failure.unwrap().contains("Template not found"));
        assert!(generator.calls.lock().is_empty());
    }

    #[test]
    fn test_validation_errors_are_soft() {
        let store = MemoryArtifactStore::new();
        let generator = CannedGenerator::default().with(ArtifactKind::Tasks, "# Tasks\n\nnothing yet");
        let operator = AutoOperator::yes();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = TasksPhase.execute(&ctx);
        assert!(result.success);
        assert_eq!(result.errors.len(), 3);
        assert!(store.exists(&ctx.scope(ArtifactKind::Tasks), ArtifactKind::Tasks).unwrap());
    }

    #[test]
    fn test_reuse_existing_skips_generation() {
        let store = MemoryArtifactStore::new();
        let scope = Scope::Feature(FEATURE.to_string());
        store.write(&scope, ArtifactKind::Implementation, "existing log").unwrap();

        let generator = CannedGenerator::default().with(ArtifactKind::Implementation, "new log");
        let operator = ScriptedOperator::new([Answer::Yes]);
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = ImplementationPhase.execute(&ctx);
        assert!(result.success && result.reused);
        assert_eq!(result.content, "existing log");
        assert!(generator.calls.lock().is_empty());
    }

    #[test]
    fn test_declined_reuse_overwrites() {
        let store = MemoryArtifactStore::new();
        let scope = Scope::Feature(FEATURE.to_string());
        store.write(&scope, ArtifactKind::Implementation, "existing log").unwrap();

        let generator = CannedGenerator::default().with(ArtifactKind::Implementation, "new log");
        let operator = ScriptedOperator::new([Answer::No]);
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = ImplementationPhase.execute(&ctx);
        assert!(result.success && !result.reused);
        assert_eq!(store.read(&scope, ArtifactKind::Implementation).unwrap().as_deref(), Some("new log"));
    }

    #[test]
    fn test_interrupt_cancels_phase() {
        let store = MemoryArtifactStore::new();
        let scope = Scope::Feature(FEATURE.to_string());
        store.write(&scope, ArtifactKind::Plan, "existing").unwrap();

        let generator = CannedGenerator::default();
        let operator = ScriptedOperator::new([Answer::Interrupt]);
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let result = PlanningPhase.execute(&ctx);
        assert!(!result.success);
        assert!(result.cancelled);
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_prior_artifacts_follow_predecessors() {
        let store = MemoryArtifactStore::new();
        store.write(&Scope::Project, ArtifactKind::Constitution, "c").unwrap();
        store.write(&Scope::Feature(FEATURE.into()), ArtifactKind::Specification, "s").unwrap();
        store.write(&Scope::Feature(FEATURE.into()), ArtifactKind::Tasks, "t").unwrap();

        let generator = CannedGenerator::default();
        let operator = AutoOperator::yes();
        let templates = TemplateLibrary::builtin();
        let gen = generation();
        let ctx = context(&store, &generator, &operator, &templates, &gen);

        let prior = ctx.prior_artifacts(PhaseKind::Planning);
        assert_eq!(
            prior,
            vec![
                (ArtifactKind::Constitution, "c".to_string()),
                (ArtifactKind::Specification, "s".to_string())
            ]
        );
    }
}
