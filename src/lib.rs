//! SoulBrowser resilience library
//!
//! Failure diagnosis, selector self-heal, learned fixes and result scoring
//! for browser automation, composed by [`Orchestrator`].

pub mod config;
pub mod errors;
pub mod metrics;
pub mod self_heal;

pub use config::{HealSettings, ResilienceConfig};
pub use errors::{OperationError, ResilienceError, ResilienceResult};
pub use metrics::{ExecutionStats, ResilienceStats, ToolExecutionStats};
pub use self_heal::{
    Diagnostic, HealSource, OperationOutcome, OperationRequest, Orchestrator, Provenance,
};

pub use action_gate;
pub use action_locator;
pub use memory_center;
