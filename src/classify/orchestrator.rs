use std::sync::Arc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::classify::assembler::assemble;
use crate::classify::partition::partition;
use crate::classify::strategy::{ClassificationStrategy, PerEntryStrategy};
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::llm::{ClassificationClient, ReferenceList};
use crate::models::{
    ClassifiedEntry, EntryOutcome, FallbackCause, ModuleBatch, ModuleOutcome, Resolution,
    RunResult, RunSummary,
};

/// Lifecycle of one module unit. There is no failed state: entry-level
/// failures are absorbed into the unit's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Pending,
    Running,
    Completed,
}

impl std::fmt::Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleState::Pending => write!(f, "pending"),
            ModuleState::Running => write!(f, "running"),
            ModuleState::Completed => write!(f, "completed"),
        }
    }
}

pub struct ClassificationOrchestrator {
    client: Arc<dyn ClassificationClient>,
    strategy: Arc<dyn ClassificationStrategy>,
    reference: Option<Arc<ReferenceList>>,
    config: OrchestratorConfig,
}

impl ClassificationOrchestrator {
    pub fn new(client: Arc<dyn ClassificationClient>, config: OrchestratorConfig) -> Self {
        Self {
            client,
            strategy: Arc::new(PerEntryStrategy::new()),
            reference: None,
            config,
        }
    }

    pub fn with_strategy(mut self, strategy: impl ClassificationStrategy + 'static) -> Self {
        self.strategy = Arc::new(strategy);
        self
    }

    pub fn with_reference(mut self, reference: ReferenceList) -> Self {
        self.reference = Some(Arc::new(reference));
        self
    }

    /// Classifies every entry of `document`. Fails only when the document is
    /// not a module → entries mapping, and then before any classifier call.
    pub async fn run(&self, document: &Value) -> Result<RunResult> {
        let (result, _) = self.run_with_summary(document).await?;
        Ok(result)
    }

    pub async fn run_with_summary(&self, document: &Value) -> Result<(RunResult, RunSummary)> {
        let batches = partition(document)?;
        Ok(self.run_batches(batches).await)
    }

    pub async fn run_batches(&self, batches: Vec<ModuleBatch>) -> (RunResult, RunSummary) {
        let entry_count: usize = batches.iter().map(ModuleBatch::len).sum();
        tracing::info!(
            modules = batches.len(),
            entries = entry_count,
            strategy = self.strategy.name(),
            classifier = self.client.name(),
            "Starting classification run"
        );

        let semaphore = match self.config.concurrency_limit {
            0 => None,
            limit => Some(Arc::new(Semaphore::new(limit))),
        };

        let pb = self.progress_bar(batches.len() as u64);

        let module_futures = batches.into_iter().enumerate().map(|(slot, batch)| {
            let sem = semaphore.clone();
            let pb = pb.clone();

            async move {
                tracing::debug!(module = %batch.module_name, state = %ModuleState::Pending);
                let _permit = match sem {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };

                let (outcome, summary) = self.run_module(batch).await;
                pb.inc(1);
                (slot, outcome, summary)
            }
        });

        let completed = join_all(module_futures).await;
        pb.finish_with_message("Classification complete");

        let mut summary = RunSummary::default();
        let mut outcomes = Vec::with_capacity(completed.len());
        for (slot, outcome, module_summary) in completed {
            summary.merge(&module_summary);
            outcomes.push((slot, outcome));
        }

        let result = assemble(outcomes);

        tracing::info!(
            modules = summary.modules,
            entries = summary.entries,
            clean = summary.clean,
            transport_failures = summary.transport_failures,
            parse_failures = summary.parse_failures,
            partial_results = summary.partial_results,
            missing_entries = summary.missing_entries,
            "Classification run finished"
        );

        (result, summary)
    }

    async fn run_module(&self, batch: ModuleBatch) -> (ModuleOutcome, RunSummary) {
        tracing::debug!(
            module = %batch.module_name,
            entries = batch.len(),
            state = %ModuleState::Running
        );

        let classified = self
            .strategy
            .classify_module(self.client.as_ref(), &batch, self.reference.as_deref())
            .await;
        let classified = reconcile(&batch, classified);

        let mut summary = RunSummary {
            modules: 1,
            ..Default::default()
        };
        let entries: Vec<EntryOutcome> = classified
            .into_iter()
            .map(|entry| {
                summary.record(entry.resolution.cause.as_ref());
                entry.into()
            })
            .collect();

        tracing::debug!(
            module = %batch.module_name,
            fallbacks = summary.fallbacks(),
            state = %ModuleState::Completed
        );

        (
            ModuleOutcome {
                module_name: batch.module_name,
                entries,
            },
            summary,
        )
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} modules")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Lines strategy output up with the batch: exactly one result per entry, in
/// batch order. Entries a strategy failed to report get the no-match result.
fn reconcile(batch: &ModuleBatch, classified: Vec<ClassifiedEntry>) -> Vec<ClassifiedEntry> {
    let in_order = classified.len() == batch.len()
        && classified
            .iter()
            .zip(&batch.entries)
            .all(|(c, e)| c.name == e.name);
    if in_order {
        return classified;
    }

    tracing::warn!(
        module = %batch.module_name,
        expected = batch.len(),
        received = classified.len(),
        "Strategy output did not line up with the module's entries"
    );

    let mut remaining: Vec<Option<ClassifiedEntry>> = classified.into_iter().map(Some).collect();
    batch
        .entries
        .iter()
        .map(|entry| {
            remaining
                .iter_mut()
                .find(|slot| slot.as_ref().is_some_and(|c| c.name == entry.name))
                .and_then(Option::take)
                .unwrap_or_else(|| ClassifiedEntry {
                    name: entry.name.clone(),
                    resolution: Resolution::fallback(FallbackCause::MissingEntry),
                })
        })
        .collect()
}
