//! Workflow orchestration.
//!
//! ```text
//! Start -> Constitution -> Specification -> Planning -> Tasks
//!       -> Implementation -> [Clarification] -> Summary
//! ```
//!
//! The machine only advances on success. A hard phase failure ends in
//! `Failed`, an operator interrupt in `Cancelled`; artifacts already written
//! stay on disk either way.

use serde::Serialize;
use uuid::Uuid;

use super::analysis::{analyze_feature, QualityReport};
use super::generator::{ContentGenerator, GenerationContext};
use super::metadata::{FeatureMetadata, FeatureStatus};
use super::naming::Feature;
use super::operator::Operator;
use super::phases::{phase_for, PhaseContext, PhaseKind, PhaseResult};
use super::store::{ArtifactKind, ArtifactStore};
use super::templates::TemplateLibrary;
use super::trigger::{classify, Complexity};
use crate::core::Config;
use crate::error::Result;
use crate::roles::Role;

/// Per-run settings, passed explicitly.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// Project name used in documents
    pub project_name: String,

    /// Stop after the implementation phase
    pub skip_clarification: bool,

    /// Cap on clarification questions
    pub max_clarifications: usize,

    /// Offer to reuse a feature whose description matches the request
    pub reuse_matching_feature: bool,

    /// Template source
    pub templates: TemplateLibrary,

    /// Date stamp for documents; today when unset
    pub date: Option<String>,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            project_name: "project".to_string(),
            skip_clarification: false,
            max_clarifications: 3,
            reuse_matching_feature: true,
            templates: TemplateLibrary::builtin(),
            date: None,
        }
    }
}

impl WorkflowOptions {
    /// Options from the `[workflow]` config section.
    pub fn from_config(config: &Config, project_name: impl Into<String>) -> Self {
        let workflow = &config.workflow;
        let templates = match config.templates_dir() {
            Some(dir) => TemplateLibrary::with_dir(dir),
            None => TemplateLibrary::builtin(),
        };
        let templates =
            if workflow.builtin_templates { templates } else { templates.without_builtins() };

        Self {
            project_name: project_name.into(),
            skip_clarification: false,
            max_clarifications: workflow.max_clarifications,
            reuse_matching_feature: workflow.reuse_matching_feature,
            templates,
            date: None,
        }
    }
}

/// Where the state machine is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Start,
    Running { phase: PhaseKind },
    Summary,
    Failed { phase: PhaseKind, reason: String },
    Cancelled { phase: PhaseKind },
}

impl WorkflowState {
    /// Whether the run reached the summary.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Summary)
    }
}

/// A document produced or reused by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// Document kind
    pub kind: ArtifactKind,

    /// Store location
    pub location: String,

    /// Kept from an earlier run
    pub reused: bool,
}

/// Structured outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// Unique id of this run
    pub run_id: String,

    /// Whether every required phase succeeded
    pub success: bool,

    /// Feature key
    pub feature: String,

    /// Feature number
    pub feature_number: u32,

    /// Complexity tier of the request
    pub complexity: Complexity,

    /// Results of the phases that ran
    pub phases: Vec<PhaseResult>,

    /// Documents written or reused, in order
    pub artifacts: Vec<ArtifactRef>,

    /// Quality report, absent after a failure
    pub quality: Option<QualityReport>,

    /// Hard failure, e.g. `Planning failed: backend timeout`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    /// Validation warnings, prefixed with the phase title
    pub errors: Vec<String>,

    /// Terminal state
    pub state: WorkflowState,
}

impl WorkflowResult {
    /// Phase that failed, if any.
    pub fn failed_phase(&self) -> Option<PhaseKind> {
        match self.state {
            WorkflowState::Failed { phase, .. } => Some(phase),
            _ => None,
        }
    }

    /// Result of one phase, if it ran.
    pub fn phase(&self, kind: PhaseKind) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase == kind)
    }

    /// Whether the run was interrupted.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.state, WorkflowState::Cancelled { .. })
    }
}

/// Drives the phases of one request.
pub struct Orchestrator<'a> {
    store: &'a dyn ArtifactStore,
    generator: &'a dyn ContentGenerator,
    operator: &'a dyn Operator,
    options: WorkflowOptions,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        store: &'a dyn ArtifactStore,
        generator: &'a dyn ContentGenerator,
        operator: &'a dyn Operator,
        options: WorkflowOptions,
    ) -> Self {
        Self { store, generator, operator, options }
    }

    /// Phases this run will execute, in order.
    pub fn planned_phases(&self) -> Vec<PhaseKind> {
        PhaseKind::ALL
            .into_iter()
            .filter(|k| !(self.options.skip_clarification && *k == PhaseKind::Clarification))
            .collect()
    }

    /// Run the workflow for `request`.
    ///
    /// Phase failures are reported in the result. An `Err` means the run
    /// could not start: the store could not be listed, the feature could not
    /// be recorded, or the operator interrupted feature selection.
    pub fn run(&self, request: &str, role: &Role) -> Result<WorkflowResult> {
        let request = request.trim();
        let run_id = Uuid::new_v4().to_string();
        let complexity = classify(request).complexity;

        let mut metadata = self.select_feature(request, role)?;
        metadata.begin_run(&run_id, role.id);
        self.store.write_metadata(&metadata)?;

        let feature = metadata.feature_name.clone();
        tracing::info!(run_id = %run_id, feature = %feature, complexity = %complexity, "Starting workflow");

        let generation = GenerationContext {
            project_name: self.options.project_name.clone(),
            request: request.to_string(),
            role: role.name.to_string(),
            system_prompt: role.system_prompt.to_string(),
            feature: feature.clone(),
            date: self.options.date.clone().unwrap_or_else(today),
            ..Default::default()
        };
        let ctx = PhaseContext {
            store: self.store,
            generator: self.generator,
            operator: self.operator,
            templates: &self.options.templates,
            feature: &feature,
            generation: &generation,
            max_clarifications: self.options.max_clarifications,
        };

        let mut state = WorkflowState::Start;
        let mut phases: Vec<PhaseResult> = Vec::new();
        let mut artifacts = Vec::new();
        let mut errors = Vec::new();
        let mut failure = None;

        for kind in self.planned_phases() {
            if self.operator.is_cancelled() {
                state = WorkflowState::Cancelled { phase: kind };
                break;
            }

            let missing = kind
                .predecessors()
                .iter()
                .find(|p| !phases.iter().any(|r| r.phase == **p && r.success));
            if let Some(missing) = missing {
                let reason = format!("{} did not complete", missing.title());
                failure = Some(format!("{} failed: {reason}", kind.title()));
                metadata.fail(kind.as_str());
                state = WorkflowState::Failed { phase: kind, reason };
                break;
            }

            state = WorkflowState::Running { phase: kind };
            let span = tracing::info_span!("phase", phase = %kind, feature = %feature);
            let result = span.in_scope(|| phase_for(kind).execute(&ctx));

            errors.extend(result.errors.iter().map(|e| format!("{}: {e}", kind.title())));

            if result.success {
                let artifact = kind.artifact();
                let location = result
                    .has_artifact()
                    .then(|| self.store.location(&ctx.scope(artifact), artifact));
                if let Some(location) = &location {
                    artifacts.push(ArtifactRef {
                        kind: artifact,
                        location: location.clone(),
                        reused: result.reused,
                    });
                }
                metadata.complete_phase(kind.as_str(), location.as_deref());
                self.save_metadata(&metadata);
                phases.push(result);
                continue;
            }

            if result.cancelled {
                tracing::warn!(phase = %kind, "Workflow cancelled by operator");
                state = WorkflowState::Cancelled { phase: kind };
            } else {
                let reason = result.failure.clone().unwrap_or_else(|| "unknown failure".to_string());
                tracing::warn!(phase = %kind, reason = %reason, "Phase failed");
                failure = Some(format!("{} failed: {reason}", kind.title()));
                metadata.fail(kind.as_str());
                state = WorkflowState::Failed { phase: kind, reason };
            }
            phases.push(result);
            break;
        }

        if matches!(state, WorkflowState::Running { .. }) {
            state = WorkflowState::Summary;
        }

        let quality = match state {
            WorkflowState::Failed { .. } => None,
            _ => self.analyze(&feature),
        };

        match state {
            WorkflowState::Summary => metadata.finish(FeatureStatus::Complete),
            WorkflowState::Cancelled { .. } => metadata.finish(FeatureStatus::Cancelled),
            _ => {}
        }
        self.save_metadata(&metadata);

        tracing::info!(feature = %feature, state = ?state, "Workflow finished");

        Ok(WorkflowResult {
            run_id,
            success: state.is_complete(),
            feature,
            feature_number: metadata.feature_number,
            complexity,
            phases,
            artifacts,
            quality,
            failure,
            errors,
            state,
        })
    }

    /// Reuse a feature with the same description, or allocate a new one.
    fn select_feature(&self, request: &str, role: &Role) -> Result<FeatureMetadata> {
        let existing = self.store.list_features()?;

        if self.options.reuse_matching_feature {
            for key in existing.iter().rev() {
                let metadata = match self.store.read_metadata(key) {
                    Ok(Some(metadata)) => metadata,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::debug!(feature = %key, error = %e, "Skipping unreadable metadata");
                        continue;
                    }
                };
                if metadata.description.trim() != request {
                    continue;
                }

                let prompt = format!("Feature {key} already covers this request. Reuse it?");
                if self.operator.ask_yes_no(&prompt, true)? {
                    tracing::info!(feature = %key, "Reusing feature");
                    return Ok(metadata);
                }
                break;
            }
        }

        let feature = Feature::allocate(request, existing.iter().map(String::as_str))?;
        tracing::debug!(feature = %feature, "Allocated feature");
        Ok(FeatureMetadata::new(&feature, request, role.id))
    }

    fn analyze(&self, feature: &str) -> Option<QualityReport> {
        let report = match analyze_feature(self.store, feature) {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(feature, error = %e, "Quality analysis failed");
                return None;
            }
        };
        if let Err(e) = self.store.write_analysis(feature, &report) {
            tracing::warn!(feature, error = %e, "Failed to save analysis");
        }
        Some(report)
    }

    fn save_metadata(&self, metadata: &FeatureMetadata) {
        if let Err(e) = self.store.write_metadata(metadata) {
            tracing::warn!(feature = %metadata.feature_name, error = %e, "Failed to save metadata");
        }
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
