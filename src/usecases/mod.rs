//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! agent's caller-facing workflows.
//!
//! Use cases:
//! - `DeploymentOrchestrator`: state reads, capital deployment and redemption

pub mod orchestrator;

pub use orchestrator::{
  DeploymentOrchestrator, DeploymentReport, PositionRefresh, RedeemAllReport, RedeemOutcome, RedemptionReport,
  StateSummary,
};
