//! Error types for the exchange engine.
//!
//! [`SbbError`] is the single domain error surfaced to callers of
//! [`Command::execute`](crate::command::Command::execute) and the
//! [`ResilienceController`](crate::resilience::ResilienceController). The
//! collaborator-facing errors ([`HandlerError`], [`PolicyViolation`]) convert
//! into it.

use crate::events::LifecycleState;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse fault categories carried inside fault documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Messaging layer could not process the message
    Messaging,
    /// Caller could not be authenticated
    Authentication,
    /// Caller is not allowed to invoke the operation
    Authorization,
    /// Anything else reported by the remote side
    Generic,
}

impl FaultKind {
    /// Tag written into the fault document's code element
    pub fn code(&self) -> &'static str {
        match self {
            Self::Messaging => "messaging",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Generic => "generic",
        }
    }

    /// Exception type name understood by older bus participants
    pub fn legacy_exception_name(&self) -> &'static str {
        match self {
            Self::Messaging => "MessagingException",
            Self::Authentication => "AuthenticationException",
            Self::Authorization => "AuthorizationException",
            Self::Generic => "RemoteException",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for FaultKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "messaging" => Ok(Self::Messaging),
            "authentication" => Ok(Self::Authentication),
            "authorization" => Ok(Self::Authorization),
            "generic" => Ok(Self::Generic),
            _ => Err(format!("Invalid fault kind: {s}")),
        }
    }
}

/// Which policy assertion rejected the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyViolationKind {
    Authentication,
    Authorization,
    Transformation,
    Other,
}

/// Error raised by a [`PolicyEnforcer`](crate::policy::PolicyEnforcer)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Policy violation ({kind:?}): {reason}")]
pub struct PolicyViolation {
    pub kind: PolicyViolationKind,
    pub reason: String,
}

impl PolicyViolation {
    pub fn new(kind: PolicyViolationKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Failure raised by a participant's [`MessageHandlerPort`](crate::handler::MessageHandlerPort)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// Application exception declared by the operation contract
    #[error("Application error: {message}")]
    Application {
        message: String,
        detail: Option<String>,
    },

    /// Anything the participant did not declare
    #[error("Unexpected participant failure: {message}")]
    Unexpected { message: String },
}

impl HandlerError {
    pub fn application(message: impl Into<String>) -> Self {
        Self::Application {
            message: message.into(),
            detail: None,
        }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// Domain error for every exchange operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SbbError {
    /// Transport or messaging layer problem
    #[error("Infrastructure failure: {reason}")]
    Infrastructure { reason: String },

    /// Local policy engine rejected the exchange
    #[error("Policy violation ({kind:?}): {reason}")]
    PolicyViolation {
        kind: PolicyViolationKind,
        reason: String,
    },

    /// The participant's handler failed
    #[error("Participant failure in {operation}: {message}")]
    Participant {
        operation: String,
        message: String,
        declared: bool,
        detail: Option<String>,
    },

    /// No handler accepts the operation
    #[error("Message not accepted for {service_id}/{operation}: {reason}")]
    MessageNotAccepted {
        service_id: String,
        operation: String,
        reason: String,
    },

    /// The counterparty reported a failure
    #[error("Remote failure ({kind}): {message}")]
    Remote { kind: FaultKind, message: String },

    /// The provider answered with a fault instead of data
    #[error("Provider fault for {operation}: {message}")]
    ProviderFault { operation: String, message: String },

    /// Engine was used without the required setup
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SbbError {
    pub fn infrastructure(reason: impl Into<String>) -> Self {
        Self::Infrastructure {
            reason: reason.into(),
        }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn remote(kind: FaultKind, message: impl Into<String>) -> Self {
        Self::Remote {
            kind,
            message: message.into(),
        }
    }

    /// Attach a handler failure to the operation it happened in
    pub fn from_handler(operation: &str, error: HandlerError) -> Self {
        match error {
            HandlerError::Application { message, detail } => Self::Participant {
                operation: operation.to_string(),
                message,
                declared: true,
                detail,
            },
            HandlerError::Unexpected { message } => Self::Participant {
                operation: operation.to_string(),
                message,
                declared: false,
                detail: None,
            },
        }
    }

    /// Coarse category used when the error travels inside a fault document
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::Infrastructure { .. } | Self::MessageNotAccepted { .. } => FaultKind::Messaging,
            Self::PolicyViolation { kind, .. } => match kind {
                PolicyViolationKind::Authentication => FaultKind::Authentication,
                PolicyViolationKind::Authorization => FaultKind::Authorization,
                PolicyViolationKind::Transformation | PolicyViolationKind::Other => {
                    FaultKind::Messaging
                }
            },
            Self::Remote { kind, .. } => *kind,
            Self::Participant { .. } | Self::ProviderFault { .. } | Self::Configuration(_) => {
                FaultKind::Generic
            }
        }
    }

    /// Human readable reason without the variant prefix
    pub fn reason(&self) -> &str {
        match self {
            Self::Infrastructure { reason } => reason,
            Self::PolicyViolation { reason, .. } => reason,
            Self::Participant { message, .. } => message,
            Self::MessageNotAccepted { reason, .. } => reason,
            Self::Remote { message, .. } => message,
            Self::ProviderFault { message, .. } => message,
            Self::Configuration(reason) => reason,
        }
    }

    /// Terminal notification state implied by this failure
    pub fn lifecycle_state(&self) -> LifecycleState {
        match self {
            Self::Infrastructure { .. } | Self::Remote { .. } => LifecycleState::AbortedNet,
            Self::Participant { .. } => LifecycleState::AbortedApp,
            Self::PolicyViolation { .. }
            | Self::MessageNotAccepted { .. }
            | Self::ProviderFault { .. }
            | Self::Configuration(_) => LifecycleState::AbortedInternal,
        }
    }

    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. })
    }

    pub fn is_participant_failure(&self) -> bool {
        matches!(self, Self::Participant { .. })
    }
}

impl From<PolicyViolation> for SbbError {
    fn from(violation: PolicyViolation) -> Self {
        Self::PolicyViolation {
            kind: violation.kind,
            reason: violation.reason,
        }
    }
}

impl From<crate::config::ConfigurationError> for SbbError {
    fn from(error: crate::config::ConfigurationError) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for SbbError {
    fn from(error: serde_json::Error) -> Self {
        Self::Infrastructure {
            reason: format!("JSON serialization error: {error}"),
        }
    }
}

pub type SbbResult<T> = std::result::Result<T, SbbError>;
