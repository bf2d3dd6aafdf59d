pub mod partition;
pub mod strategy;
pub mod orchestrator;
pub mod assembler;

pub use partition::{group_records, partition};
pub use strategy::{ClassificationStrategy, PerEntryStrategy, PerModuleStrategy};
pub use orchestrator::{ClassificationOrchestrator, ModuleState};
pub use assembler::assemble;
