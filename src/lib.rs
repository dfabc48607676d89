#![allow(clippy::doc_markdown)] // Allow technical terms like InOut, OneWay in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # SBB Core
//!
//! Message-exchange engine for a service bus.
//!
//! ## Overview
//!
//! For every unit of interaction between a consumer and a provider the engine
//! drives an [`Exchange`](exchange::Exchange) through policy enforcement,
//! delivery, acknowledgment, fault translation and lifecycle notification.
//! Whether the interaction is fire-and-forget, an asynchronous callback or a
//! synchronous request/response, and whether the local side is the sender
//! or the receiver, is decided by the [`Command`](command::Command) variant
//! and its role and scope.
//!
//! Remote calls that must try a ranked list of endpoints go through the
//! [`ResilienceController`](resilience::ResilienceController).
//!
//! ## Module Organization
//!
//! - [`exchange`] - Exchange, message and call context model
//! - [`command`] - Command template, variants and factory
//! - [`engine`] - Facade for common interactions
//! - [`resilience`] - Candidate failover
//! - [`fault`] - Fault document synthesis and classification
//! - [`policy`] - Policy enforcer seam and reference enforcers
//! - [`handler`] - Participant handlers and their resolution cache
//! - [`transport`] - Delivery channel seam
//! - [`service`] - Service descriptions and directory
//! - [`correlation`] - Store for exchanges awaiting a later leg
//! - [`events`] - Lifecycle notifications
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sbb_core::command::ExchangeEnvironment;
//! use sbb_core::engine::ExchangeEngine;
//! use sbb_core::exchange::{CallContext, ExchangePattern, Message};
//! use sbb_core::handler::StaticHandlerResolver;
//! use sbb_core::service::OperationDescriptor;
//! use sbb_core::transport::DeliveryChannel;
//! use std::sync::Arc;
//!
//! # async fn example(channel: Arc<dyn DeliveryChannel>) -> Result<(), Box<dyn std::error::Error>> {
//! let env = ExchangeEnvironment::builder(channel, Arc::new(StaticHandlerResolver::new())).build()?;
//! let engine = ExchangeEngine::new(env);
//!
//! let quote = OperationDescriptor::new("pricing", "quote", ExchangePattern::InOut);
//! let response = engine
//!     .call_blocking(&quote, Message::new("<quote sku=\"A-1\"/>"), CallContext::new())
//!     .await?;
//! println!("quote: {}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod constants;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod events;
pub mod exchange;
pub mod fault;
pub mod handler;
pub mod logging;
pub mod policy;
pub mod resilience;
pub mod service;
pub mod transport;

pub use command::{Command, CommandFactory, CommandVariant, ExchangeEnvironment};
pub use config::{ConfigManager, EngineConfig};
pub use engine::ExchangeEngine;
pub use error::{FaultKind, HandlerError, PolicyViolation, PolicyViolationKind, SbbError, SbbResult};
pub use events::{EventPublisher, LifecycleEvent, LifecycleState, NotificationKind, NotificationSink};
pub use exchange::{
    CallContext, EndpointReference, Exchange, ExchangePattern, ExchangeStatus, Message, Role, Scope,
};
pub use resilience::{CandidateEndpoint, FailoverCursor, ResilienceController};
