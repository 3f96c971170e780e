//! Document validation rules.
//!
//! Each phase owns one rule set. Failing a rule never stops the workflow;
//! the errors travel back to the caller as warnings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Implementation-level vocabulary that does not belong in a specification.
pub const HOW_TERMS: &[&str] = &[
    "database",
    "api",
    "endpoint",
    "schema",
    "table",
    "query",
    "function",
    "class",
    "method",
    "algorithm",
    "implementation",
];

/// Maximum `[NEEDS CLARIFICATION]` markers allowed in a specification.
pub const MAX_CLARIFICATION_MARKERS: usize = 3;

pub(crate) static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Z][A-Z0-9_]+)\]").expect("valid placeholder regex"));

pub(crate) static CLARIFICATION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[NEEDS CLARIFICATION(?::\s*([^\]]*))?\]").expect("valid marker regex")
});

static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\.\d+\.\d+\b").expect("valid version regex"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid date regex"));

static CHECKBOX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*]\s+\[[ xX]\]").expect("valid checkbox regex"));

static KEY_TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)+\b").expect("valid key term regex")
});

static HOW_TERM_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    HOW_TERMS
        .iter()
        .map(|term| {
            let pattern = format!(r"(?i)\b{}(?:s|es)?\b", regex::escape(term));
            (*term, Regex::new(&pattern).expect("valid term regex"))
        })
        .collect()
});

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    /// Rule violations, empty when valid
    pub errors: Vec<String>,
}

impl Validation {
    /// A passing validation.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Whether every rule passed.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    fn require_headers(&mut self, content: &str, headers: &[&str]) {
        for header in headers {
            if !has_header(content, header) {
                self.push(format!("Missing required section: {header}"));
            }
        }
    }

    fn reject_placeholders(&mut self, content: &str) {
        let found = placeholders(content);
        if !found.is_empty() {
            self.push(format!("Unresolved placeholders found: {}", found.join(", ")));
        }
    }
}

/// Unique `[ALL_CAPS]` placeholders in order of appearance.
pub fn placeholders(content: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(content) {
        let name = caps[1].to_string();
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

/// Number of `[NEEDS CLARIFICATION]` markers.
pub fn clarification_markers(content: &str) -> usize {
    CLARIFICATION_MARKER.find_iter(content).count()
}

/// Whether `content` has a markdown heading starting with `title`.
pub fn has_header(content: &str, title: &str) -> bool {
    let title = title.to_lowercase();
    content.lines().any(|line| {
        let line = line.trim_start();
        line.starts_with('#')
            && line.trim_start_matches('#').trim().to_lowercase().starts_with(&title)
    })
}

/// Body of the `## title` section, up to the next `##` heading.
pub fn section<'a>(content: &'a str, title: &str) -> Option<&'a str> {
    let title = title.to_lowercase();
    let mut start = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        let is_heading = trimmed.starts_with("##");
        match start {
            None if is_heading
                && trimmed.trim_start_matches('#').trim().to_lowercase().starts_with(&title) =>
            {
                start = Some(offset + line.len());
            }
            Some(begin) if is_heading && !trimmed.starts_with("###") => {
                return Some(&content[begin..offset]);
            }
            _ => {}
        }
        offset += line.len();
    }

    start.map(|begin| &content[begin.min(content.len())..])
}

/// HOW terms present in `content`, in table order.
pub fn how_terms(content: &str) -> Vec<&'static str> {
    HOW_TERM_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(content))
        .map(|(term, _)| *term)
        .collect()
}

/// Capitalized multi-word terms (e.g. "Shopping Cart"), unique, in order.
pub fn key_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for m in KEY_TERM.find_iter(text) {
        let term = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Constitution: semantic version, ISO date, no placeholders.
pub fn validate_constitution(content: &str) -> Validation {
    let mut v = Validation::ok();
    if !VERSION.is_match(content) {
        v.push("Version not found or not in MAJOR.MINOR.PATCH format");
    }
    if !ISO_DATE.is_match(content) {
        v.push("No ISO date (YYYY-MM-DD) found");
    }
    v.reject_placeholders(content);
    v
}

/// Specification: required sections, few clarification markers, no HOW language.
pub fn validate_specification(content: &str) -> Validation {
    let mut v = Validation::ok();
    v.require_headers(content, &["User Scenarios & Testing", "Functional Requirements", "Success Criteria"]);
    v.reject_placeholders(content);

    let markers = clarification_markers(content);
    if markers > MAX_CLARIFICATION_MARKERS {
        v.push(format!(
            "Too many clarification markers: {markers} (max {MAX_CLARIFICATION_MARKERS})"
        ));
    }

    for term in how_terms(content) {
        v.push(format!(
            "Specification contains implementation detail '{term}'; describe WHAT and WHY only"
        ));
    }
    v
}

/// Plan: required sections, no placeholders, covers the spec's key terms.
pub fn validate_plan(content: &str, specification: Option<&str>) -> Validation {
    let mut v = Validation::ok();
    v.require_headers(content, &["Tech Stack", "Architecture", "File Structure"]);
    v.reject_placeholders(content);

    if let Some(requirements) = specification.and_then(|s| section(s, "Functional Requirements")) {
        let terms = key_terms(requirements);
        if !terms.is_empty() {
            let plan = content.to_lowercase();
            let covered = terms.iter().filter(|t| plan.contains(&t.to_lowercase())).count();
            if covered * 2 < terms.len() {
                v.push(format!(
                    "Plan does not cover the specification: only {covered}/{} key terms mentioned",
                    terms.len()
                ));
            }
        }
    }
    v
}

/// Tasks: checkboxes, effort estimates, acceptance criteria.
pub fn validate_tasks(content: &str) -> Validation {
    let mut v = Validation::ok();
    v.reject_placeholders(content);

    if !CHECKBOX.is_match(content) {
        v.push("No checkbox tasks found (expected '- [ ] ...')");
    }

    let lower = content.to_lowercase();
    if !lower.contains("effort") {
        v.push("Missing effort estimation for tasks");
    }
    if !lower.contains("acceptance criteria") {
        v.push("Missing acceptance criteria for tasks");
    }
    v
}
