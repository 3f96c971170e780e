//! Feature numbering and slugs.
//!
//! Features live in directories named `feature-NNN-slug`. Numbers only
//! ever grow; directories that do not parse are ignored.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkflowError};

const STOP_WORDS: &[&str] = &["a", "an", "the", "with", "for", "to", "in", "on", "at", "of", "and", "or"];

const MAX_SLUG_LEN: usize = 50;

static FEATURE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^feature-(\d+)(?:-(.*))?$").expect("valid feature regex"));

/// A numbered feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    /// Sequence number, starting at 1
    pub number: u32,

    /// Short kebab-case name
    pub slug: String,
}

impl Feature {
    /// Create a feature from its parts.
    pub fn new(number: u32, slug: impl Into<String>) -> Self {
        Self { number, slug: slug.into() }
    }

    /// Allocate the next feature for `description` given the existing keys.
    pub fn allocate<'a>(
        description: &str,
        existing: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        Ok(Self::new(next_number(existing)?, slug(description)))
    }

    /// Parse a directory key such as `feature-007-todo-app`.
    pub fn parse(key: &str) -> Option<Self> {
        let caps = FEATURE_KEY.captures(key)?;
        let number = caps.get(1)?.as_str().parse().ok()?;
        let slug = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        Some(Self { number, slug })
    }

    /// Directory key, e.g. `feature-001-todo-app`.
    pub fn key(&self) -> String {
        if self.slug.is_empty() {
            format!("feature-{:03}", self.number)
        } else {
            format!("feature-{:03}-{}", self.number, self.slug)
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Next free feature number: one past the highest parsable key, or 1.
///
/// Fails once the highest number is `u32::MAX`; numbers are never reused.
pub fn next_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> Result<u32> {
    let highest = existing
        .into_iter()
        .filter_map(|key| {
            let parsed = Feature::parse(key);
            if parsed.is_none() {
                tracing::debug!(key, "Skipping malformed feature identifier");
            }
            parsed
        })
        .map(|f| f.number)
        .max();

    match highest {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(WorkflowError::FeatureNumbersExhausted(max)),
    }
}

/// Short name derived from a free-form description.
///
/// Drops stop words, keeps the first four words longer than two characters,
/// and reduces everything else to single dashes.
pub fn slug(description: &str) -> String {
    let lowered = description.to_lowercase();
    let words: Vec<&str> = lowered
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .filter(|w| w.chars().count() > 2)
        .take(4)
        .collect();

    let joined: String = words
        .join("-")
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let collapsed = joined.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-");
    let truncated: String = collapsed.chars().take(MAX_SLUG_LEN).collect();
    let trimmed = truncated.trim_matches('-');

    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
