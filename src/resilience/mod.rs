//! # Resilience Module
//!
//! Failover for genuinely remote invocations. A [`ResilienceController`]
//! holds an immutable, ranked list of [`CandidateEndpoint`]s; each logical
//! call gets its own [`FailoverCursor`] and tries every candidate at most
//! once, in order, until one answers.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sbb_core::config::ResilienceConfig;
//! use sbb_core::exchange::ExchangePattern;
//! use sbb_core::resilience::{CandidateEndpoint, ResilienceController};
//! use sbb_core::service::OperationDescriptor;
//! use std::sync::Arc;
//!
//! # async fn example(candidates: Vec<Arc<dyn CandidateEndpoint>>) -> Result<(), Box<dyn std::error::Error>> {
//! let controller = ResilienceController::new(candidates, &ResilienceConfig::default());
//! let lookup = OperationDescriptor::new("inventory", "lookup", ExchangePattern::InOut);
//!
//! let stock: serde_json::Value = controller
//!     .invoke_service_operation(&lookup, &serde_json::json!({"sku": "A-1"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod cursor;

pub use controller::{CandidateEndpoint, CandidateFailure, ResilienceController};
pub use cursor::{FailoverCursor, FailoverState};
