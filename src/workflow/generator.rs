//! Content generation.
//!
//! Phases ask a [`ContentGenerator`] for one document at a time. The AI
//! backends implement it by sending [`GenerationRequest::prompt`] to a model;
//! [`OfflineGenerator`] fills the template deterministically from the request.

use std::collections::BTreeMap;

use super::store::ArtifactKind;
use super::validation::{section, PLACEHOLDER};

/// Errors from a content generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The backend could not be reached or is not configured
    #[error("Generator unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error
    #[error("Generation failed: {0}")]
    Failed(String),

    /// The backend returned nothing usable
    #[error("Generator returned no content")]
    Empty,
}

/// Everything a generator may use to write a document.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    /// Project name
    pub project_name: String,

    /// Original request
    pub request: String,

    /// Role display name
    pub role: String,

    /// Role system prompt
    pub system_prompt: String,

    /// Feature key, empty for project-wide documents
    pub feature: String,

    /// Date stamp (YYYY-MM-DD)
    pub date: String,

    /// Extra operator input, e.g. custom principles
    pub extra: Option<String>,

    /// Explicit placeholder values
    pub vars: BTreeMap<String, String>,

    /// Documents produced by earlier phases
    pub prior: Vec<(ArtifactKind, String)>,
}

impl GenerationContext {
    /// Content of an earlier document, if present.
    pub fn prior(&self, kind: ArtifactKind) -> Option<&str> {
        self.prior.iter().find(|(k, _)| *k == kind).map(|(_, content)| content.as_str())
    }

    /// Placeholder values common to every template.
    pub fn common_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("PROJECT_NAME".to_string(), self.project_name.clone());
        vars.insert("PROJECT_DESCRIPTION".to_string(), self.request.clone());
        vars.insert("REQUEST".to_string(), self.request.clone());
        vars.insert("FEATURE_NAME".to_string(), self.feature.clone());
        vars.insert("FEATURE_TITLE".to_string(), title_case(&self.request, 8));
        vars.insert("DATE".to_string(), self.date.clone());
        vars.insert("ROLE".to_string(), self.role.clone());
        vars
    }
}

/// One document request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Which document to write
    pub kind: ArtifactKind,

    /// Template body with `[PLACEHOLDER]` slots
    pub template: &'a str,

    /// Inputs
    pub context: &'a GenerationContext,
}

impl GenerationRequest<'_> {
    /// Prompt for model-backed generators.
    pub fn prompt(&self) -> String {
        let ctx = self.context;
        let mut prompt = format!(
            "Write the {kind} document for project \"{project}\".\n\
             Follow the template below exactly: keep every section heading and replace \
             every bracketed placeholder with real content. Output only markdown.\n\n\
             ## Request\n\n{request}\n\n## Context\n\n\
             - Feature: {feature}\n- Date: {date}\n- Role: {role}\n",
            kind = self.kind,
            project = ctx.project_name,
            request = ctx.request,
            feature = if ctx.feature.is_empty() { "(project-wide)" } else { ctx.feature.as_str() },
            date = ctx.date,
            role = ctx.role,
        );

        if let Some(extra) = &ctx.extra {
            prompt.push_str(&format!("- Operator input: {extra}\n"));
        }
        for (key, value) in &ctx.vars {
            prompt.push_str(&format!("- {key}: {value}\n"));
        }

        if self.kind == ArtifactKind::Specification {
            prompt.push_str(
                "\nDescribe WHAT users need and WHY only. Do not mention storage, \
                 interfaces, code structure or other technical choices.\n",
            );
        }

        for (kind, content) in &ctx.prior {
            prompt.push_str(&format!("\n## Existing {kind}\n\n{content}\n"));
        }

        prompt.push_str(&format!("\n## Template\n\n{}\n", self.template));
        prompt
    }
}

/// Produces documents for the workflow phases.
pub trait ContentGenerator {
    /// Generator name for logs and summaries.
    fn name(&self) -> &str;

    /// Write one document.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}

/// Replace `[KEY]` slots that have a value in `vars`; leave the rest alone.
pub fn render(template: &str, vars: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures<'_>| {
            vars.get(&caps[1]).cloned().unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Deterministic, network-free generator.
///
/// Derives every section from the request and earlier documents. Useful
/// without credentials and as a baseline in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    /// Create the generator.
    pub fn new() -> Self {
        Self
    }

    fn vars(kind: ArtifactKind, ctx: &GenerationContext) -> BTreeMap<String, String> {
        let mut vars = ctx.common_vars();
        let derived = match kind {
            ArtifactKind::Constitution => constitution_vars(ctx),
            ArtifactKind::Specification => specification_vars(ctx),
            ArtifactKind::Plan => plan_vars(ctx),
            ArtifactKind::Tasks => tasks_vars(ctx),
            ArtifactKind::Implementation => implementation_vars(ctx),
            ArtifactKind::Clarifications => Vec::new(),
        };
        for (key, value) in derived {
            vars.insert(key.to_string(), value);
        }
        vars.extend(ctx.vars.clone());
        vars
    }
}

impl ContentGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        let vars = Self::vars(request.kind, request.context);
        Ok(render(request.template, &vars))
    }
}

fn constitution_vars(ctx: &GenerationContext) -> Vec<(&'static str, String)> {
    let principles = match ctx.extra.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(custom) => custom
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, line)| format!("### {}. {}", roman(i + 1), line))
            .collect::<Vec<_>>()
            .join("\n\n"),
        None => "### I. Specification First\n\n\
                 Every change begins with a written description of what it does and why it matters.\n\n\
                 ### II. Simplicity\n\n\
                 Prefer the smallest design that meets the stated requirements.\n\n\
                 ### III. Verified Before Done\n\n\
                 Behavior is checked against acceptance criteria before work is marked complete."
            .to_string(),
    };

    vec![
        ("CONSTITUTION_VERSION", "1.0.0".to_string()),
        ("RATIFICATION_DATE", ctx.date.clone()),
        ("LAST_AMENDED_DATE", ctx.date.clone()),
        ("PRINCIPLES", principles),
    ]
}

fn specification_vars(ctx: &GenerationContext) -> Vec<(&'static str, String)> {
    let goals = clauses(&ctx.request);

    let scenarios = goals
        .iter()
        .enumerate()
        .map(|(i, goal)| {
            format!(
                "{}. **Given** a user of {}, **When** they {}, **Then** the outcome is visible and correct.",
                i + 1,
                ctx.project_name,
                goal
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let user_scenarios = format!(
        "### Primary Story\n\nAs a user of {}, I want to {} so that I reach my goal without extra effort.\n\n\
         ### Acceptance Scenarios\n\n{}\n\n\
         ### Edge Cases\n\n\
         - What happens when the input is empty or incomplete?\n\
         - What happens when the same action is repeated?",
        ctx.project_name,
        lower_first(&ctx.request),
        scenarios
    );

    let mut requirements: Vec<String> = goals
        .iter()
        .enumerate()
        .map(|(i, goal)| format!("- **FR-{:03}**: Users MUST be able to {}.", i + 1, goal))
        .collect();
    requirements.push(format!(
        "- **FR-{:03}**: Users MUST receive clear feedback when an action cannot be completed.",
        goals.len() + 1
    ));

    let entities = entities(&ctx.feature)
        .into_iter()
        .map(|e| format!("- **{e}**: a core concept referenced by the request."))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        ("USER_SCENARIOS", user_scenarios),
        ("FUNCTIONAL_REQUIREMENTS", requirements.join("\n")),
        ("KEY_ENTITIES", entities),
        (
            "SUCCESS_CRITERIA",
            "- Users complete the primary story on their first attempt without assistance.\n\
             - Every functional requirement is demonstrated by at least one acceptance scenario.\n\
             - Nine out of ten users rate the experience as clear and dependable."
                .to_string(),
        ),
        (
            "ASSUMPTIONS",
            "- The request describes a single feature; related work is tracked as separate features.\n\
             - Users have access to the product when they need it."
                .to_string(),
        ),
    ]
}

fn plan_vars(ctx: &GenerationContext) -> Vec<(&'static str, String)> {
    let goals = clauses(&ctx.request);
    let module = ctx.feature.split('-').skip(2).collect::<Vec<_>>().join("_");
    let module = if module.is_empty() { "feature".to_string() } else { module };

    let architecture = goals
        .iter()
        .enumerate()
        .map(|(i, goal)| format!("- **Component {}**: responsible for \"{}\"", i + 1, goal))
        .chain(std::iter::once(
            "- **Feedback layer**: reports failures to the user in plain language".to_string(),
        ))
        .collect::<Vec<_>>()
        .join("\n");

    let coverage = ctx
        .prior(ArtifactKind::Specification)
        .and_then(|spec| section(spec, "Functional Requirements"))
        .map(|body| {
            body.lines()
                .map(str::trim)
                .filter(|l| l.starts_with('-') || l.starts_with('*'))
                .map(|l| format!("{l} Covered by the architecture above."))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "- No functional requirements were recorded.".to_string());

    vec![
        (
            "SUMMARY",
            format!(
                "This plan describes how {} will be delivered for {}. It follows the project \
                 constitution and the feature specification.",
                ctx.feature, ctx.project_name
            ),
        ),
        (
            "TECH_STACK",
            "- **Language**: match the existing codebase\n\
             - **Persistence**: local storage sized for the expected data volume\n\
             - **Testing**: unit and integration tests run on every change"
                .to_string(),
        ),
        ("ARCHITECTURE", architecture),
        (
            "FILE_STRUCTURE",
            format!("```text\nsrc/\n  {module}/\n    mod\n    model\n    service\ntests/\n  {module}\ndocs/\n```"),
        ),
        ("REQUIREMENTS_COVERAGE", coverage),
        (
            "DELIVERABLES",
            "- Working feature covering every functional requirement\n\
             - Automated tests for each acceptance scenario\n\
             - User-facing documentation"
                .to_string(),
        ),
        (
            "RISKS",
            "- **Scope growth**: keep new ideas in separate features\n\
             - **Unclear requirements**: resolve open questions in the clarification step"
                .to_string(),
        ),
    ]
}

fn tasks_vars(ctx: &GenerationContext) -> Vec<(&'static str, String)> {
    let goals = clauses(&ctx.request);

    let mut list = String::from(
        "### Phase 1: Setup\n\n\
         - [ ] **Task 1.1**: Prepare the project layout described in the plan\n  \
         - **Effort**: S (2-4 hours)\n  - **Dependencies**: None\n  \
         - **Acceptance Criteria**: The project builds and the test suite runs\n\n\
         ### Phase 2: Core Features\n\n",
    );
    for (i, goal) in goals.iter().enumerate() {
        list.push_str(&format!(
            "- [ ] **Task 2.{}**: {}\n  - **Effort**: M (1-2 days)\n  - **Dependencies**: Task 1.1\n  \
             - **Acceptance Criteria**: The matching acceptance scenario passes\n\n",
            i + 1,
            upper_first(goal)
        ));
    }
    list.push_str(
        "### Phase 3: Verification\n\n\
         - [ ] **Task 3.1**: Verify every success criterion\n  - **Effort**: S (half a day)\n  \
         - **Dependencies**: Phase 2\n  - **Acceptance Criteria**: All success criteria are demonstrated",
    );

    vec![
        (
            "OVERVIEW",
            format!(
                "Tasks for {} derived from the technical plan, grouped into setup, core features \
                 and verification.",
                ctx.feature
            ),
        ),
        ("TASK_LIST", list),
        (
            "MILESTONES",
            "- [ ] **Milestone 1**: Setup complete\n\
             - [ ] **Milestone 2**: Core features complete\n\
             - [ ] **Milestone 3**: Feature verified"
                .to_string(),
        ),
        (
            "RISK_TABLE",
            "| Scope growth | Keep new ideas in separate features |\n\
             | Unclear requirements | Run the clarification step |"
                .to_string(),
        ),
        ("NOTES", format!("Generated from the technical plan on {}.", ctx.date)),
    ]
}

fn implementation_vars(ctx: &GenerationContext) -> Vec<(&'static str, String)> {
    let tasks: Vec<String> = ctx
        .prior(ArtifactKind::Tasks)
        .map(|content| {
            content
                .lines()
                .map(str::trim)
                .filter_map(|l| l.strip_prefix("- [ ]"))
                .map(str::trim)
                .filter(|t| !t.is_empty() && !t.starts_with("**Milestone"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let (pending, next_steps) = if tasks.is_empty() {
        ("No tasks defined".to_string(), "1. Define tasks\n2. Begin work".to_string())
    } else {
        (numbered(&tasks, 10), numbered(&tasks, 3))
    };

    let deliverables = ctx
        .prior(ArtifactKind::Plan)
        .and_then(|plan| section(plan, "Deliverables"))
        .map(|body| {
            body.lines()
                .map(str::trim)
                .filter(|l| l.starts_with('-'))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            "- Working feature\n- Automated tests for key flows\n- Documentation".to_string()
        });

    vec![
        ("START_DATE", ctx.date.clone()),
        ("STATUS", "In Progress".to_string()),
        ("OVERVIEW", format!("Progress log for {} following the technical plan.", ctx.feature)),
        ("COMPLETED_TASKS", "None yet".to_string()),
        ("IN_PROGRESS_TASKS", "Awaiting the first task".to_string()),
        ("PENDING_TASKS", pending),
        ("DELIVERABLES", deliverables),
        ("ISSUES", "No issues encountered yet.".to_string()),
        ("NEXT_STEPS", next_steps),
        ("NOTES", format!("Log created on {}. Update it as tasks are completed.", ctx.date)),
    ]
}

fn numbered(items: &[String], limit: usize) -> String {
    let mut lines: Vec<String> =
        items.iter().take(limit).enumerate().map(|(i, t)| format!("{}. {t}", i + 1)).collect();
    if items.len() > limit {
        lines.push(format!("... and {} more tasks", items.len() - limit));
    }
    lines.join("\n")
}

/// Split a request into short goal phrases.
fn clauses(request: &str) -> Vec<String> {
    let mut parts = vec![request.to_string()];
    for sep in [",", ";", ".", " and ", " et ", " also "] {
        parts = parts.iter().flat_map(|p| p.split(sep).map(str::to_string).collect::<Vec<_>>()).collect();
    }

    let goals: Vec<String> = parts
        .into_iter()
        .map(|p| p.trim().trim_end_matches(['!', '?']).trim().to_string())
        .filter(|p| p.split_whitespace().count() > 1)
        .map(|p| lower_first(&p))
        .collect();

    if goals.is_empty() {
        vec![lower_first(request.trim())]
    } else {
        goals
    }
}

fn entities(feature: &str) -> Vec<String> {
    let words: Vec<&str> = feature.split('-').skip(2).collect();
    let words = if words.len() > 1 { &words[1..] } else { &words[..] };
    let mut out: Vec<String> = words.iter().map(|w| upper_first(w)).collect();
    if out.is_empty() {
        out.push("Item".to_string());
    }
    out
}

fn title_case(text: &str, max_words: usize) -> String {
    text.split_whitespace().take(max_words).map(upper_first).collect::<Vec<_>>().join(" ")
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |c| c.to_uppercase().chain(chars).collect())
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |c| c.to_lowercase().chain(chars).collect())
}

fn roman(n: usize) -> String {
    const NUMERALS: [(usize, &str); 9] = [
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut n = n;
    let mut out = String::new();
    for (value, numeral) in NUMERALS {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}
