use crate::models::{ModuleOutcome, RunResult};

/// Builds the run result from module outcomes tagged with their partition
/// slot. Outcomes may arrive in any completion order.
pub fn assemble(mut completed: Vec<(usize, ModuleOutcome)>) -> RunResult {
    completed.sort_by_key(|(slot, _)| *slot);

    RunResult {
        modules: completed.into_iter().map(|(_, outcome)| outcome).collect(),
    }
}
