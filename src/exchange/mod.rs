//! # Exchange Model
//!
//! The unit of work the engine drives: an [`Exchange`] carries the status,
//! the immutable exchange pattern, the in/out/fault message slots and the
//! [`CallContext`] shared by every leg of the interaction.

pub mod context;
pub mod message;
pub mod types;

pub use context::{CallContext, EndpointReference, Relation, RelationType};
pub use message::Message;
pub use types::{ExchangePattern, ExchangeStatus, ParticipantRole, Role, Scope};

use crate::error::SbbError;
use crate::fault;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failure the transport attaches when it sets [`ExchangeStatus::Error`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ExchangeFailure {
    /// The remote side answered with a fault document
    RemoteFault { document: String },
    /// The transport itself failed
    Transport { reason: String },
}

impl ExchangeFailure {
    /// Translate the transport failure into the domain error taxonomy
    pub fn to_error(&self) -> SbbError {
        match self {
            Self::RemoteFault { document } => fault::classify_remote_fault(document),
            Self::Transport { reason } => SbbError::infrastructure(reason.clone()),
        }
    }
}

/// One unit of message interaction between a consumer and a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    id: Uuid,
    pattern: ExchangePattern,
    pub status: ExchangeStatus,
    pub service_id: String,
    pub operation: String,
    /// Endpoint the exchange is addressed to, when known
    pub target: Option<String>,
    pub context: CallContext,
    pub in_message: Option<Message>,
    pub out_message: Option<Message>,
    pub fault: Option<Message>,
    pub failure: Option<ExchangeFailure>,
}

impl Exchange {
    pub fn new(
        pattern: ExchangePattern,
        service_id: impl Into<String>,
        operation: impl Into<String>,
        context: CallContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pattern,
            status: ExchangeStatus::Active,
            service_id: service_id.into(),
            operation: operation.into(),
            target: None,
            context,
            in_message: None,
            out_message: None,
            fault: None,
            failure: None,
        }
    }

    pub fn with_in_message(mut self, message: Message) -> Self {
        self.in_message = Some(message);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pattern(&self) -> ExchangePattern {
        self.pattern
    }

    pub fn message_id(&self) -> Uuid {
        self.context.message_id()
    }

    pub fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// Mark the leg as failed; used by transports
    pub fn mark_error(&mut self, failure: ExchangeFailure) {
        self.status = ExchangeStatus::Error;
        self.failure = Some(failure);
    }

    /// Domain error for an exchange in [`ExchangeStatus::Error`]
    pub fn failure_error(&self) -> SbbError {
        match &self.failure {
            Some(failure) => failure.to_error(),
            None => SbbError::infrastructure(format!(
                "Exchange {} reported an error status without a cause",
                self.id
            )),
        }
    }

    /// The message relevant to the response leg: fault first, then out
    pub fn response_message(&self) -> Option<&Message> {
        self.fault.as_ref().or(self.out_message.as_ref())
    }
}
