//! Run scheduling.
//!
//! - [`BatchOrchestrator`]: per-iteration step machine and batch loop
//! - [`Supervisor`]: restarts failed runs with backoff
//! - [`RestartTracker`]: failure window and backoff calculation

pub mod orchestrator;
pub mod restart;
pub mod supervisor;

pub use orchestrator::{BatchOrchestrator, BatchSummary, IterationOutcome, Step};
pub use restart::{RestartPolicy, RestartTracker};
pub use supervisor::{Supervisor, SupervisorStats};
