//! Spec-driven workflow engine.
//!
//! Turns a free-form request into a set of structured documents before it
//! is sent to a model.
//!
//! ## Documents
//!
//! - `memory/constitution.md` - Project principles, shared by all features
//! - `specs/feature-NNN-slug/spec.md` - What users need and why
//! - `specs/feature-NNN-slug/plan.md` - Technical plan
//! - `specs/feature-NNN-slug/tasks.md` - Task breakdown
//! - `specs/feature-NNN-slug/implementation.md` - Progress log
//! - `specs/feature-NNN-slug/clarifications.md` - Operator answers (optional)
//!
//! ## Flow
//!
//! - `classify` decides whether a request warrants the workflow
//! - `Orchestrator` names the feature and runs the phases in order
//! - `analyze` scores the resulting documents

mod analysis;
mod checklist;
mod generator;
mod metadata;
mod naming;
mod operator;
mod orchestrator;
mod phases;
mod prompt;
mod report;
mod store;
mod templates;
mod trigger;
mod validation;

pub use analysis::{
    analyze, analyze_artifact, analyze_feature, check_consistency, load_artifacts, ArtifactAnalysis,
    ConsistencyReport, QualityReport,
};
pub use checklist::{run_checklist, Checklist, ChecklistItem};
pub use generator::{
    render, ContentGenerator, GenerationContext, GenerationError, GenerationRequest,
    OfflineGenerator,
};
pub use metadata::{FeatureMetadata, FeatureStatus};
pub use naming::{next_number, slug, Feature};
pub use operator::{Answer, AutoOperator, ConsoleOperator, Operator, OperatorError, ScriptedOperator};
pub use orchestrator::{ArtifactRef, Orchestrator, WorkflowOptions, WorkflowResult, WorkflowState};
pub use phases::{
    phase_for, ClarificationItem, ClarificationPhase, ConstitutionPhase, ImplementationPhase,
    Phase, PhaseContext, PhaseKind, PhaseResult, PlanningPhase, SpecificationPhase, TasksPhase,
};
pub use prompt::enhanced_prompt;
pub use report::{render_checklist, render_classification, render_quality, render_summary};
pub use store::{ArtifactKind, ArtifactStore, FsArtifactStore, MemoryArtifactStore, Scope};
pub use templates::TemplateLibrary;
pub use trigger::{classify, Classification, Complexity, KeywordTables};
pub use validation::{
    validate_constitution, validate_plan, validate_specification, validate_tasks, Validation,
    HOW_TERMS,
};
