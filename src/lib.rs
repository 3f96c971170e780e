//! # Specrun
//!
//! Spec-driven development for AI requests.
//!
//! Specrun decides whether a request is substantial enough to deserve
//! structure. If it is, Specrun walks it through a fixed sequence of
//! documents (constitution, specification, plan, tasks, implementation log)
//! before the request reaches a model.
//!
//! ## Features
//!
//! - **Trigger detection**: Keyword and complexity heuristics decide when to engage
//! - **Feature numbering**: `feature-NNN-slug` directories, reused across runs
//! - **Phase validation**: Each document is checked before the next one is built
//! - **Quality analysis**: Completeness, consistency and a checklist per feature
//! - **AI backends**: Hosted task API with a local Ollama fallback (optional)
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the workflow on a request
//! specrun run "Create a todo app with user accounts"
//!
//! # Inspect the documents of a feature
//! specrun analyze feature-001-create-todo-app-user-accounts
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod core;
pub mod error;
pub mod roles;
pub mod workflow;

#[cfg(feature = "ai")]
pub mod ai;

#[cfg(feature = "ai")]
pub use ai::{AIManager, AIProvider, OllamaProvider, ProviderGenerator, TaskApiProvider};

pub use core::Config;
pub use error::{Result, WorkflowError};
pub use roles::Role;
pub use workflow::{
    classify, ArtifactKind, ArtifactStore, ContentGenerator, FsArtifactStore, Operator,
    Orchestrator, PhaseKind, WorkflowOptions, WorkflowResult,
};

/// Version of Specrun.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const APP_NAME: &str = "specrun";
