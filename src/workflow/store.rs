//! Artifact storage.
//!
//! The workflow only talks to [`ArtifactStore`]. [`FsArtifactStore`] lays
//! artifacts out on disk:
//!
//! ```text
//! <root>/memory/constitution.md
//! <root>/specs/feature-NNN-slug/{spec,plan,tasks,implementation,clarifications}.md
//! <root>/specs/feature-NNN-slug/metadata.json
//! <root>/specs/feature-NNN-slug/analysis.json
//! ```
//!
//! Concurrent runs on different features never touch the same files.
//! Concurrent runs on the same feature are not guarded.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;

use super::analysis::QualityReport;
use super::metadata::FeatureMetadata;
use crate::error::{Result, WorkflowError};

const MEMORY_DIR: &str = "memory";
const SPECS_DIR: &str = "specs";
const METADATA_FILE: &str = "metadata.json";
const ANALYSIS_FILE: &str = "analysis.json";

/// Kind of document produced by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Constitution,
    Specification,
    Plan,
    Tasks,
    Implementation,
    Clarifications,
}

impl ArtifactKind {
    /// All kinds in workflow order.
    pub const ALL: [Self; 6] = [
        Self::Constitution,
        Self::Specification,
        Self::Plan,
        Self::Tasks,
        Self::Implementation,
        Self::Clarifications,
    ];

    /// File name inside its directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Constitution => "constitution.md",
            Self::Specification => "spec.md",
            Self::Plan => "plan.md",
            Self::Tasks => "tasks.md",
            Self::Implementation => "implementation.md",
            Self::Clarifications => "clarifications.md",
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constitution => "constitution",
            Self::Specification => "specification",
            Self::Plan => "plan",
            Self::Tasks => "tasks",
            Self::Implementation => "implementation",
            Self::Clarifications => "clarifications",
        }
    }

    /// Whether the artifact is shared by all features.
    pub fn is_global(self) -> bool {
        matches!(self, Self::Constitution)
    }

    /// Whether the quality analysis scores this kind. Clarifications are
    /// operator answers, not generated documents.
    pub fn is_scored(self) -> bool {
        !matches!(self, Self::Clarifications)
    }

    /// Scope this kind lives in for the given feature.
    pub fn scope(self, feature_key: &str) -> Scope {
        if self.is_global() {
            Scope::Project
        } else {
            Scope::Feature(feature_key.to_string())
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where an artifact lives: project-wide or inside one feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Project,
    Feature(String),
}

/// Persistent home for workflow artifacts.
pub trait ArtifactStore {
    /// Read an artifact, `None` if it does not exist.
    fn read(&self, scope: &Scope, kind: ArtifactKind) -> Result<Option<String>>;

    /// Create or overwrite an artifact.
    fn write(&self, scope: &Scope, kind: ArtifactKind, content: &str) -> Result<()>;

    /// Whether an artifact exists.
    fn exists(&self, scope: &Scope, kind: ArtifactKind) -> Result<bool> {
        Ok(self.read(scope, kind)?.is_some())
    }

    /// Human-readable location of an artifact.
    fn location(&self, scope: &Scope, kind: ArtifactKind) -> String;

    /// Identifiers of all feature directories, sorted.
    fn list_features(&self) -> Result<BTreeSet<String>>;

    /// Read a feature's metadata.
    fn read_metadata(&self, feature: &str) -> Result<Option<FeatureMetadata>>;

    /// Write a feature's metadata.
    fn write_metadata(&self, metadata: &FeatureMetadata) -> Result<()>;

    /// Store a quality report snapshot for a feature.
    fn write_analysis(&self, feature: &str, report: &QualityReport) -> Result<()>;
}

/// Filesystem-backed store rooted at a project directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding all feature directories.
    pub fn specs_dir(&self) -> PathBuf {
        self.root.join(SPECS_DIR)
    }

    /// Directory of one feature.
    pub fn feature_dir(&self, feature: &str) -> PathBuf {
        self.specs_dir().join(feature)
    }

    /// Path of an artifact.
    pub fn path(&self, scope: &Scope, kind: ArtifactKind) -> PathBuf {
        match scope {
            Scope::Project => self.root.join(MEMORY_DIR).join(kind.file_name()),
            Scope::Feature(feature) => self.feature_dir(feature).join(kind.file_name()),
        }
    }

    fn read_optional(path: &Path) -> Result<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowError::store(path, e)),
        }
    }

    /// Write through a temp file in the same directory so readers never see
    /// a half-written artifact. The data is flushed to disk before the rename.
    fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(|e| WorkflowError::store(dir, e))?;

        let mut file =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| WorkflowError::store(dir, e))?;
        file.write_all(content).map_err(|e| WorkflowError::store(path, e))?;
        file.as_file().sync_all().map_err(|e| WorkflowError::store(path, e))?;
        file.persist(path).map_err(|e| WorkflowError::store(path, e.error))?;

        tracing::debug!(path = %path.display(), bytes = content.len(), "Wrote artifact");
        Ok(())
    }
}

impl ArtifactStore for FsArtifactStore {
    fn read(&self, scope: &Scope, kind: ArtifactKind) -> Result<Option<String>> {
        Self::read_optional(&self.path(scope, kind))
    }

    fn write(&self, scope: &Scope, kind: ArtifactKind, content: &str) -> Result<()> {
        Self::write_atomic(&self.path(scope, kind), content.as_bytes())
    }

    fn location(&self, scope: &Scope, kind: ArtifactKind) -> String {
        self.path(scope, kind).display().to_string()
    }

    fn list_features(&self) -> Result<BTreeSet<String>> {
        let dir = self.specs_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(WorkflowError::store(dir, e)),
        };

        let mut features = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| WorkflowError::store(&dir, e))?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if name.starts_with("feature-") {
                        features.insert(name.to_string());
                    }
                }
            }
        }
        Ok(features)
    }

    fn read_metadata(&self, feature: &str) -> Result<Option<FeatureMetadata>> {
        let path = self.feature_dir(feature).join(METADATA_FILE);
        match Self::read_optional(&path)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn write_metadata(&self, metadata: &FeatureMetadata) -> Result<()> {
        let path = self.feature_dir(&metadata.feature_name).join(METADATA_FILE);
        let json = serde_json::to_string_pretty(metadata)?;
        Self::write_atomic(&path, json.as_bytes())
    }

    fn write_analysis(&self, feature: &str, report: &QualityReport) -> Result<()> {
        let path = self.feature_dir(feature).join(ANALYSIS_FILE);
        let json = serde_json::to_string_pretty(report)?;
        Self::write_atomic(&path, json.as_bytes())
    }
}

/// In-memory store, useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: Mutex<HashMap<(Scope, ArtifactKind), String>>,
    metadata: Mutex<HashMap<String, FeatureMetadata>>,
    analyses: Mutex<HashMap<String, QualityReport>>,
}

impl MemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last stored analysis for a feature.
    pub fn analysis(&self, feature: &str) -> Option<QualityReport> {
        self.analyses.lock().get(feature).cloned()
    }

    /// Number of stored artifacts.
    pub fn artifact_count(&self) -> usize {
        self.artifacts.lock().len()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn read(&self, scope: &Scope, kind: ArtifactKind) -> Result<Option<String>> {
        Ok(self.artifacts.lock().get(&(scope.clone(), kind)).cloned())
    }

    fn write(&self, scope: &Scope, kind: ArtifactKind, content: &str) -> Result<()> {
        self.artifacts.lock().insert((scope.clone(), kind), content.to_string());
        Ok(())
    }

    fn location(&self, scope: &Scope, kind: ArtifactKind) -> String {
        match scope {
            Scope::Project => format!("memory://{MEMORY_DIR}/{}", kind.file_name()),
            Scope::Feature(feature) => {
                format!("memory://{SPECS_DIR}/{feature}/{}", kind.file_name())
            }
        }
    }

    fn list_features(&self) -> Result<BTreeSet<String>> {
        let mut features: BTreeSet<String> = self
            .artifacts
            .lock()
            .keys()
            .filter_map(|(scope, _)| match scope {
                Scope::Feature(feature) => Some(feature.clone()),
                Scope::Project => None,
            })
            .collect();
        features.extend(self.metadata.lock().keys().cloned());
        Ok(features)
    }

    fn read_metadata(&self, feature: &str) -> Result<Option<FeatureMetadata>> {
        Ok(self.metadata.lock().get(feature).cloned())
    }

    fn write_metadata(&self, metadata: &FeatureMetadata) -> Result<()> {
        self.metadata.lock().insert(metadata.feature_name.clone(), metadata.clone());
        Ok(())
    }

    fn write_analysis(&self, feature: &str, report: &QualityReport) -> Result<()> {
        self.analyses.lock().insert(feature.to_string(), report.clone());
        Ok(())
    }
}
