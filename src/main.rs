//! Specrun - spec-driven development for AI requests.
//!
//! Walks a request through constitution, specification, plan, tasks and
//! implementation documents before it is sent to a model.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use specrun::core::Config;
use specrun::roles::{self, Role};
use specrun::workflow::{
    analyze_feature, enhanced_prompt, load_artifacts, render_checklist, render_classification,
    render_quality, render_summary, run_checklist, ArtifactStore, AutoOperator, Complexity,
    ConsoleOperator, ContentGenerator, Feature, FsArtifactStore, OfflineGenerator, Operator,
    Orchestrator, WorkflowOptions,
};
use specrun::WorkflowError;

/// Spec-driven development for AI requests
#[derive(Parser)]
#[command(name = "specrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the spec-driven workflow on a request
    Run {
        /// The request to process
        request: String,

        /// Role the model should take (see `specrun roles`)
        #[arg(short, long)]
        role: Option<String>,

        /// Working directory holding the project
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Project name used in the documents
        #[arg(short, long)]
        project: Option<String>,

        /// Answer yes to every question
        #[arg(short = 'y', long, conflicts_with = "no")]
        yes: bool,

        /// Answer no to every question
        #[arg(short = 'n', long)]
        no: bool,

        /// Skip the clarification phase
        #[arg(long)]
        skip_clarification: bool,

        /// Run the workflow even if the request does not need it
        #[arg(short, long)]
        force: bool,

        /// Generate documents from the templates, without a model
        #[arg(long)]
        offline: bool,

        /// Send the enhanced prompt to the model after a successful run
        #[arg(long, conflicts_with = "offline")]
        submit: bool,
    },

    /// Show whether a message would trigger the workflow
    Classify {
        /// Message to classify
        message: String,
    },

    /// List features and their status
    Features {
        /// Working directory holding the project
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Analyze the documents of a feature
    Analyze {
        /// Feature directory name or number
        feature: String,

        /// Working directory holding the project
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the quality checklist on a feature
    Checklist {
        /// Feature directory name or number
        feature: String,

        /// Working directory holding the project
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// List the available roles
    Roles,

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Options of the `run` command.
struct RunArgs {
    request: String,
    role: Option<String>,
    dir: PathBuf,
    project: Option<String>,
    answer: Option<bool>,
    skip_clarification: bool,
    force: bool,
    offline: bool,
    submit: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    // Handle commands
    match cli.command {
        Commands::Run {
            request,
            role,
            dir,
            project,
            yes,
            no,
            skip_clarification,
            force,
            offline,
            submit,
        } => {
            let answer = if yes {
                Some(true)
            } else if no {
                Some(false)
            } else {
                None
            };
            cmd_run(RunArgs {
                request,
                role,
                dir,
                project,
                answer,
                skip_clarification,
                force,
                offline,
                submit,
            })?;
        }
        Commands::Classify { message } => {
            print!("{}", render_classification(&specrun::classify(&message)));
        }
        Commands::Features { dir } => {
            cmd_features(&dir)?;
        }
        Commands::Analyze { feature, dir, json } => {
            cmd_analyze(&feature, &dir, json)?;
        }
        Commands::Checklist { feature, dir } => {
            cmd_checklist(&feature, &dir)?;
        }
        Commands::Roles => {
            cmd_roles();
        }
        Commands::Config { path } => {
            cmd_config(path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

/// Content backend chosen for a run.
enum Backend {
    Offline(OfflineGenerator),
    #[cfg(feature = "ai")]
    Provider(specrun::ai::ProviderGenerator),
}

impl Backend {
    fn from_config(config: &Config, offline: bool) -> Result<Self> {
        if offline || config.api.provider == "offline" {
            return Ok(Self::Offline(OfflineGenerator::new()));
        }

        #[cfg(feature = "ai")]
        {
            use specrun::ai::{AIManager, ProviderGenerator};

            let manager = AIManager::from_config(config)?;
            return Ok(Self::Provider(ProviderGenerator::new(manager)?));
        }

        #[cfg(not(feature = "ai"))]
        {
            tracing::warn!("Built without AI support, generating documents offline");
            return Ok(Self::Offline(OfflineGenerator::new()));
        }
    }

    fn generator(&self) -> &dyn ContentGenerator {
        match self {
            Self::Offline(generator) => generator,
            #[cfg(feature = "ai")]
            Self::Provider(generator) => generator,
        }
    }

    /// Send the final prompt to the model.
    fn submit(&self, role: &Role, prompt: &str) -> Result<String> {
        match self {
            Self::Offline(_) => anyhow::bail!("Submitting needs an AI provider, not offline mode"),
            #[cfg(feature = "ai")]
            Self::Provider(generator) => generator.complete(role.system_prompt, prompt),
        }
    }
}

/// Run the workflow on one request.
fn cmd_run(args: RunArgs) -> Result<()> {
    let config = Config::load()?;

    let role_id = args.role.as_deref().unwrap_or(&config.general.default_role);
    let role = roles::find(role_id).ok_or_else(|| {
        WorkflowError::Config(format!("Unknown role '{role_id}', see `specrun roles`"))
    })?;

    let classification = specrun::classify(&args.request);
    if !args.force {
        if !config.workflow.enabled {
            println!("Spec-driven workflow is disabled in the configuration (use --force).");
            return Ok(());
        }
        if config.workflow.auto_detect && !classification.should_trigger {
            print!("{}", render_classification(&classification));
            println!("Request does not need the spec-driven workflow (use --force).");
            return Ok(());
        }
    }

    let backend = Backend::from_config(&config, args.offline)?;
    let store = FsArtifactStore::new(args.dir.join(&config.general.root_dir));

    let project_name = args.project.clone().unwrap_or_else(|| config.project_name(&args.dir));
    let mut options = WorkflowOptions::from_config(&config, project_name);
    options.skip_clarification = args.skip_clarification
        || (config.workflow.skip_clarification_for_simple
            && classification.complexity == Complexity::Simple);

    let cancelled = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&cancelled));
    let operator: Box<dyn Operator> = match args.answer {
        Some(true) => Box::new(AutoOperator::yes()),
        Some(false) => Box::new(AutoOperator::no()),
        None => Box::new(ConsoleOperator::with_cancel_flag(cancelled)),
    };

    tracing::info!(
        root = %store.root().display(),
        generator = backend.generator().name(),
        role = role.id,
        "Starting workflow"
    );

    let orchestrator = Orchestrator::new(&store, backend.generator(), operator.as_ref(), options);
    let result = match orchestrator.run(&args.request, role) {
        Ok(result) => result,
        Err(WorkflowError::Cancelled) => {
            eprintln!("Workflow cancelled.");
            std::process::exit(130);
        }
        Err(e) => return Err(e.into()),
    };

    print!("{}", render_summary(&result));

    if result.is_cancelled() {
        std::process::exit(130);
    }
    if !result.success {
        std::process::exit(1);
    }

    if args.submit {
        let artifacts = load_artifacts(&store, &result.feature)?;
        let prompt = enhanced_prompt(&args.request, role.name, &artifacts);
        println!("\nSubmitting to {}...\n", backend.generator().name());
        let answer = backend.submit(role, &prompt)?;
        println!("{answer}");
    }

    Ok(())
}

/// First Ctrl-C cancels at the next question, the second one exits.
fn install_interrupt_handler(flag: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nInterrupted, stopping at the next question (Ctrl-C again to quit)");
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "Could not install Ctrl-C handler");
    }
}

fn open_store(dir: &Path) -> Result<FsArtifactStore> {
    let config = Config::load()?;
    Ok(FsArtifactStore::new(dir.join(&config.general.root_dir)))
}

/// Accept `feature-001-slug`, `001` or `1`.
fn resolve_feature(store: &FsArtifactStore, name: &str) -> Result<String> {
    let features = store.list_features()?;
    if features.contains(name) {
        return Ok(name.to_string());
    }

    if let Ok(number) = name.trim().parse::<u32>() {
        if let Some(key) =
            features.iter().find(|key| Feature::parse(key).is_some_and(|f| f.number == number))
        {
            return Ok(key.clone());
        }
    }

    anyhow::bail!("No feature named '{name}' under {}", store.specs_dir().display())
}

/// List features.
fn cmd_features(dir: &Path) -> Result<()> {
    let store = open_store(dir)?;
    let features = store.list_features()?;

    if features.is_empty() {
        println!("No features found under {}", store.specs_dir().display());
        return Ok(());
    }

    for key in &features {
        match store.read_metadata(key) {
            Ok(Some(metadata)) => {
                println!("{key:<40} {:<12} {}", metadata.status.as_str(), metadata.description);
            }
            Ok(None) => println!("{key:<40} {:<12}", "unknown"),
            Err(e) => {
                tracing::warn!(feature = %key, error = %e, "Unreadable metadata");
                println!("{key:<40} {:<12}", "unreadable");
            }
        }
    }

    Ok(())
}

/// Analyze a feature's documents.
fn cmd_analyze(feature: &str, dir: &Path, json: bool) -> Result<()> {
    let store = open_store(dir)?;
    let feature = resolve_feature(&store, feature)?;
    let report = analyze_feature(&store, &feature)
        .with_context(|| format!("Failed to analyze {feature}"))?;
    store
        .write_analysis(&feature, &report)
        .with_context(|| format!("Failed to save analysis for {feature}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{feature}");
        print!("{}", render_quality(&report));
    }

    Ok(())
}

/// Run the checklist on a feature.
fn cmd_checklist(feature: &str, dir: &Path) -> Result<()> {
    let store = open_store(dir)?;
    let feature = resolve_feature(&store, feature)?;
    let artifacts = load_artifacts(&store, &feature)?;

    println!("{feature}\n");
    print!("{}", render_checklist(&run_checklist(&artifacts)));

    Ok(())
}

/// List roles.
fn cmd_roles() {
    for role in roles::all() {
        let marker = if role.id == roles::DEFAULT_ROLE { " (default)" } else { "" };
        println!("{:<12} {}{marker}", role.id, role.name);
    }
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = Config::load()?;
    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "specrun", &mut io::stdout());
}
