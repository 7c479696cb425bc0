pub mod error;
pub mod orchestrator;
pub mod report;
pub mod step;
pub mod table;

pub use error::PipelineError;
pub use orchestrator::{wait_all, Orchestrator, RunHandle, RunOptions, RunOutcome, RunTarget};
pub use report::CompletionReport;
pub use step::{PipelineStep, StepKind};
pub use table::StepTable;
