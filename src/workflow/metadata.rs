//! Per-feature metadata (`metadata.json`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::naming::Feature;

/// Lifecycle status of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    InProgress,
    Complete,
    Failed,
    Cancelled,
}

impl FeatureStatus {
    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Record kept next to a feature's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    /// Sequence number
    pub feature_number: u32,

    /// Slug
    pub short_name: String,

    /// Directory key (`feature-NNN-slug`)
    pub feature_name: String,

    /// Original request text
    #[serde(default)]
    pub description: String,

    /// Role the workflow ran with
    #[serde(default)]
    pub role: String,

    /// RFC 3339 creation time
    pub created_at: String,

    /// RFC 3339 time of the last update
    #[serde(default)]
    pub updated_at: String,

    /// Completion time per phase
    #[serde(default)]
    pub phases: BTreeMap<String, String>,

    /// Current status
    pub status: FeatureStatus,

    /// Phase that stopped the run, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<String>,

    /// Artifact locations written so far
    #[serde(default)]
    pub files: Vec<String>,

    /// Id of the most recent run
    #[serde(default)]
    pub run_id: String,
}

impl FeatureMetadata {
    /// Fresh metadata for a newly allocated feature.
    pub fn new(feature: &Feature, description: &str, role: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            feature_number: feature.number,
            short_name: feature.slug.clone(),
            feature_name: feature.key(),
            description: description.to_string(),
            role: role.to_string(),
            created_at: now.clone(),
            updated_at: now,
            phases: BTreeMap::new(),
            status: FeatureStatus::InProgress,
            failed_phase: None,
            files: Vec::new(),
            run_id: String::new(),
        }
    }

    /// The feature this metadata describes.
    pub fn feature(&self) -> Feature {
        Feature::new(self.feature_number, self.short_name.clone())
    }

    /// Start a new run on this feature.
    pub fn begin_run(&mut self, run_id: &str, role: &str) {
        self.run_id = run_id.to_string();
        self.role = role.to_string();
        self.status = FeatureStatus::InProgress;
        self.failed_phase = None;
        self.touch();
    }

    /// Record a completed phase and the file it produced.
    pub fn complete_phase(&mut self, phase: &str, file: Option<&str>) {
        let now = chrono::Utc::now().to_rfc3339();
        self.phases.insert(phase.to_string(), now);
        if let Some(file) = file {
            if !self.files.iter().any(|f| f == file) {
                self.files.push(file.to_string());
            }
        }
        self.touch();
    }

    /// Mark the feature as failed at `phase`.
    pub fn fail(&mut self, phase: &str) {
        self.status = FeatureStatus::Failed;
        self.failed_phase = Some(phase.to_string());
        self.touch();
    }

    /// Set a terminal status.
    pub fn finish(&mut self, status: FeatureStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}
