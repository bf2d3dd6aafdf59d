use serde::{Deserialize, Serialize};

use super::classification::{ClassificationResult, FallbackCause, Resolution};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub name: String,
    #[serde(flatten)]
    pub result: ClassificationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleOutcome {
    pub module_name: String,
    pub entries: Vec<EntryOutcome>,
}

/// The output document: one outcome per module, in partition order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunResult {
    pub modules: Vec<ModuleOutcome>,
}

impl RunResult {
    pub fn module(&self, module_name: &str) -> Option<&ModuleOutcome> {
        self.modules.iter().find(|m| m.module_name == module_name)
    }

    pub fn get(&self, module_name: &str, name: &str) -> Option<&ClassificationResult> {
        self.module(module_name)?
            .entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.result)
    }

    pub fn entry_count(&self) -> usize {
        self.modules.iter().map(|m| m.entries.len()).sum()
    }
}

/// An entry's resolution as produced inside a module unit, before the
/// fallback cause is dropped from the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEntry {
    pub name: String,
    pub resolution: Resolution,
}

impl From<ClassifiedEntry> for EntryOutcome {
    fn from(entry: ClassifiedEntry) -> Self {
        Self {
            name: entry.name,
            result: entry.resolution.result,
        }
    }
}

/// Diagnostic counts for a run. Logged, never written to the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub modules: usize,
    pub entries: usize,
    pub clean: usize,
    pub transport_failures: usize,
    pub parse_failures: usize,
    pub partial_results: usize,
    pub missing_entries: usize,
}

impl RunSummary {
    pub fn record(&mut self, cause: Option<&FallbackCause>) {
        self.entries += 1;
        match cause {
            None => self.clean += 1,
            Some(FallbackCause::Transport(_)) => self.transport_failures += 1,
            Some(FallbackCause::PayloadParse(_)) => self.parse_failures += 1,
            Some(FallbackCause::PartialFields(_)) => self.partial_results += 1,
            Some(FallbackCause::MissingEntry) => self.missing_entries += 1,
        }
    }

    pub fn merge(&mut self, other: &RunSummary) {
        self.modules += other.modules;
        self.entries += other.entries;
        self.clean += other.clean;
        self.transport_failures += other.transport_failures;
        self.parse_failures += other.parse_failures;
        self.partial_results += other.partial_results;
        self.missing_entries += other.missing_entries;
    }

    pub fn fallbacks(&self) -> usize {
        self.entries - self.clean
    }
}
