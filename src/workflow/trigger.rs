//! Trigger classification.
//!
//! Decides whether a free-form request should go through the spec-driven
//! workflow and estimates how complex it is. Matching works on whole
//! whitespace tokens, lower-cased and stripped of surrounding punctuation.

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Creation / construction / design intent, French and English.
const TRIGGER_KEYWORDS: &[&str] = &[
    "créer",
    "creer",
    "construire",
    "développer",
    "developper",
    "réflexion",
    "reflexion",
    "penser",
    "projet",
    "application",
    "coder",
    "programmer",
    "implémenter",
    "implementer",
    "create",
    "build",
    "develop",
    "thinking",
    "think",
    "project",
    "app",
    "code",
    "program",
    "implement",
    "design",
    "architect",
];

/// Conjunctions that usually join several features into one request.
const MULTI_FEATURE_MARKERS: &[&str] =
    &["et", "and", "avec", "with", "plus", "also", "également", "egalement"];

/// Terms that point at a technically involved request.
const TECHNICAL_TERMS: &[&str] = &[
    "api",
    "database",
    "auth",
    "authentication",
    "backend",
    "frontend",
    "microservice",
    "docker",
    "kubernetes",
    "ci/cd",
    "deployment",
];

static DEFAULT_TABLES: Lazy<KeywordTables> =
    Lazy::new(|| KeywordTables::new(TRIGGER_KEYWORDS, MULTI_FEATURE_MARKERS, TECHNICAL_TERMS));

/// Estimated complexity tier of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Empty request
    None,
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Whether the workflow should run
    pub should_trigger: bool,

    /// Estimated complexity
    pub complexity: Complexity,

    /// Whitespace-separated word count
    pub words: usize,

    /// Number of multi-feature markers
    pub markers: usize,

    /// Number of technical terms
    pub technical_terms: usize,
}

/// Immutable keyword sets used by the classifier.
#[derive(Debug, Clone)]
pub struct KeywordTables {
    triggers: HashSet<String>,
    markers: HashSet<String>,
    technical: HashSet<String>,
}

impl KeywordTables {
    /// Build tables from word lists. Entries are lower-cased.
    pub fn new(triggers: &[&str], markers: &[&str], technical: &[&str]) -> Self {
        let set = |words: &[&str]| words.iter().map(|w| w.to_lowercase()).collect();
        Self { triggers: set(triggers), markers: set(markers), technical: set(technical) }
    }

    /// The built-in French/English tables.
    pub fn builtin() -> &'static Self {
        &DEFAULT_TABLES
    }

    /// Classify a message against these tables.
    pub fn classify(&self, message: &str) -> Classification {
        let tokens: Vec<String> = message.split_whitespace().map(normalize).collect();
        let words = tokens.len();

        let should_trigger = tokens.iter().any(|t| self.triggers.contains(t));
        let markers = tokens.iter().filter(|t| self.markers.contains(*t)).count();
        let technical_terms = tokens.iter().filter(|t| self.technical.contains(*t)).count();

        let complexity = if words == 0 {
            Complexity::None
        } else if words < 10 && markers == 0 && technical_terms == 0 {
            Complexity::Simple
        } else if words < 30 && !(markers > 0 && technical_terms > 0) {
            Complexity::Moderate
        } else {
            Complexity::Complex
        };

        Classification { should_trigger, complexity, words, markers, technical_terms }
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        DEFAULT_TABLES.clone()
    }
}

/// Classify a message with the built-in tables.
pub fn classify(message: &str) -> Classification {
    DEFAULT_TABLES.classify(message)
}

fn normalize(token: &str) -> String {
    token.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}
