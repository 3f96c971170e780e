//! Phase templates.
//!
//! Built-in templates ship with the binary. A template directory can
//! override any of them with a `<kind>-template.md` file.

use std::path::PathBuf;

use super::store::ArtifactKind;
use crate::error::{Result, WorkflowError};

const CONSTITUTION: &str = include_str!("templates/constitution-template.md");
const SPECIFICATION: &str = include_str!("templates/specification-template.md");
const PLAN: &str = include_str!("templates/plan-template.md");
const TASKS: &str = include_str!("templates/tasks-template.md");
const IMPLEMENTATION: &str = include_str!("templates/implementation-template.md");

/// Source of phase templates.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    /// Override directory
    dir: Option<PathBuf>,

    /// Whether built-ins back up missing overrides
    builtins: bool,
}

impl TemplateLibrary {
    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self { dir: None, builtins: true }
    }

    /// Overrides from `dir`, falling back to built-ins.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()), builtins: true }
    }

    /// Disable the built-in fallback.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// File name of the override for `kind`.
    pub fn file_name(kind: ArtifactKind) -> String {
        format!("{}-template.md", kind.as_str())
    }

    /// Load the template for `kind`.
    pub fn load(&self, kind: ArtifactKind) -> Result<String> {
        if let Some(dir) = &self.dir {
            let path = dir.join(Self::file_name(kind));
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    tracing::debug!(kind = %kind, path = %path.display(), "Using template override");
                    return Ok(content);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(WorkflowError::store(path, e)),
            }
        }

        if self.builtins {
            if let Some(builtin) = Self::builtin_template(kind) {
                return Ok(builtin.to_string());
            }
        }

        let location = match &self.dir {
            Some(dir) => dir.join(Self::file_name(kind)).display().to_string(),
            None => "built-in templates".to_string(),
        };
        Err(WorkflowError::TemplateNotFound { kind: kind.to_string(), location })
    }

    fn builtin_template(kind: ArtifactKind) -> Option<&'static str> {
        match kind {
            ArtifactKind::Constitution => Some(CONSTITUTION),
            ArtifactKind::Specification => Some(SPECIFICATION),
            ArtifactKind::Plan => Some(PLAN),
            ArtifactKind::Tasks => Some(TASKS),
            ArtifactKind::Implementation => Some(IMPLEMENTATION),
            ArtifactKind::Clarifications => None,
        }
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::validation::has_header;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_templates_have_required_sections() {
        let library = TemplateLibrary::builtin();

        let spec = library.load(ArtifactKind::Specification).unwrap();
        assert!(has_header(&spec, "User Scenarios & Testing"));
        assert!(has_header(&spec, "Functional Requirements"));
        assert!(has_header(&spec, "Success Criteria"));

        let plan = library.load(ArtifactKind::Plan).unwrap();
        assert!(has_header(&plan, "Tech Stack"));
        assert!(has_header(&plan, "File Structure"));
    }

    #[test]
    fn test_no_clarification_template() {
        let err = TemplateLibrary::builtin().load(ArtifactKind::Clarifications).unwrap_err();
        assert!(matches!(err, WorkflowError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_override_directory() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("plan-template.md"), "# Custom [FEATURE_NAME]").unwrap();

        let library = TemplateLibrary::with_dir(temp.path());
        assert_eq!(library.load(ArtifactKind::Plan).unwrap(), "# Custom [FEATURE_NAME]");
        assert!(library.load(ArtifactKind::Tasks).unwrap().contains("Task Breakdown"));
    }

    #[test]
    fn test_missing_override_without_builtins() {
        let temp = TempDir::new().unwrap();
        let library = TemplateLibrary::with_dir(temp.path()).without_builtins();

        let err = library.load(ArtifactKind::Specification).unwrap_err();
        assert!(err.to_string().contains("specification-template.md"));
    }
}
