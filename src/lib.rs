pub mod config;
pub mod error;
pub mod models;
pub mod llm;
pub mod classify;
pub mod documents;
pub mod logging;
pub mod storage;

pub use config::{ClassifierConfig, Config, OrchestratorConfig, Provider};
pub use error::{Error, Result};
pub use llm::{ClassificationClient, ClaudeClassifier, OpenAIClassifier, ReferenceList};
pub use classify::{ClassificationOrchestrator, PerEntryStrategy, PerModuleStrategy};
pub use models::{ClassificationResult, ModuleOutcome, RunResult, RunSummary};
pub use storage::ResponseCache;
