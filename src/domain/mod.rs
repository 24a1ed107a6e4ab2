//! Domain layer - Core models and pure decision logic.
//!
//! Amount arithmetic, vault/position models, transaction plans and the
//! vault selector. Nothing in here performs I/O; every type can be
//! built and tested in isolation.

pub mod amount;
pub mod plan;
pub mod selector;
pub mod vault;

// Re-export core types for convenience
pub use plan::{
    DeploymentPlan, ExecutionResult, RedeemPlan, StepFailure, StepKind, StepOutcome, StepRecord,
    TransactionStep,
};
pub use selector::{Selection, SelectionBreakdown, SelectionPolicy, VaultSelector};
pub use vault::{ApyFigures, ApyInterval, IdleBalance, Position, VaultCandidate, nickname};
