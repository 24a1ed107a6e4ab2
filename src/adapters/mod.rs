//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (HTTP client, blockchain RPC, local keys).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `api`: x402 payment-gated upstream API and its typed endpoints
//! - `chain`: EVM RPC, signing, gas checks and execution via alloy-rs

pub mod api;
pub mod chain;
