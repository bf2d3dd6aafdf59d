use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use cdedetective::classify::group_records;
use cdedetective::documents::{load_document, load_reference_list, write_run_result};
use cdedetective::llm::build_client;
use cdedetective::logging::init_logging;
use cdedetective::{
    ClassificationOrchestrator, ClassifierConfig, Config, OrchestratorConfig, PerEntryStrategy,
    PerModuleStrategy, ResponseCache,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// One request per entry, entries independent
    PerEntry,
    /// One request per entry, with earlier results of the module as context
    ModuleContext,
    /// One request per module
    PerModule,
}

#[derive(Parser, Debug)]
#[command(name = "cdedetective")]
#[command(version = "0.1.0")]
#[command(about = "Match data dictionary entries to HEAL Core Common Data Elements")]
struct Args {
    /// Data dictionary JSON (module name -> list of entries)
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the classification results
    #[arg(short, long)]
    output: PathBuf,

    /// Master CDE list to include in every prompt
    #[arg(short, long)]
    master_list: Option<PathBuf>,

    /// How entries are turned into classifier requests
    #[arg(long, value_enum, default_value = "per-entry")]
    strategy: Strategy,

    /// Treat the input as a flat list of records grouped by this column
    #[arg(long)]
    group_by: Option<String>,

    /// Maximum modules classified at once (0 = no limit)
    #[arg(long)]
    concurrency: Option<usize>,

    /// SQLite file for caching classifier replies
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Also write diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the classifier model
    #[arg(long)]
    model: Option<String>,

    /// Debug-level logging (includes prompts and raw replies)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    let config = Config::from_env()?;

    let mut classifier_config = ClassifierConfig::from(&config);
    if let Some(model) = &args.model {
        classifier_config = classifier_config.with_model(model.clone());
    }

    let mut orchestrator_config = OrchestratorConfig::from(&config);
    if let Some(limit) = args.concurrency {
        orchestrator_config.concurrency_limit = limit;
    }

    let cache_path = args
        .cache
        .clone()
        .or_else(|| config.cache_path.as_ref().map(PathBuf::from));
    let cache = match cache_path {
        Some(path) => {
            tracing::info!("Using response cache at {}", path.display());
            Some(Arc::new(ResponseCache::new(path)?))
        }
        None => None,
    };

    let client = build_client(classifier_config, cache)?;

    let mut document = load_document(&args.input)?;
    tracing::info!("Data dictionary loaded from {}", args.input.display());
    if let Some(column) = &args.group_by {
        document = group_records(&document, column)?;
    }

    let mut orchestrator = ClassificationOrchestrator::new(client, orchestrator_config);
    orchestrator = match args.strategy {
        Strategy::PerEntry => orchestrator.with_strategy(PerEntryStrategy::new()),
        Strategy::ModuleContext => {
            orchestrator.with_strategy(PerEntryStrategy::with_module_context())
        }
        Strategy::PerModule => orchestrator.with_strategy(PerModuleStrategy),
    };
    if let Some(path) = &args.master_list {
        orchestrator = orchestrator.with_reference(load_reference_list(path)?);
        tracing::info!("Master CDE list loaded from {}", path.display());
    }

    let (result, summary) = match orchestrator.run_with_summary(&document).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_fatal() => {
            tracing::error!("Input rejected, nothing was classified: {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    write_run_result(&result, &args.output)?;

    if summary.fallbacks() > 0 {
        tracing::warn!(
            "{} of {} entries used fallback values; see the log for causes",
            summary.fallbacks(),
            summary.entries
        );
    }

    Ok(())
}
