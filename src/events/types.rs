//! # Lifecycle Event Types
//!
//! Records emitted for every state change of an exchange leg so monitoring
//! can follow exchanges without reaching into the engine.

use crate::constants::events as names;
use crate::exchange::{Exchange, ParticipantRole, Role, Scope};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What the notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Regular exchange progress
    Exchange,
    /// A fault was produced, translated or dropped
    Fault,
}

/// Lifecycle state reported by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Inbound leg received from the network
    NetInPost,
    /// Outbound leg handed to the network
    NetOutPost,
    /// Message delivered to the participant
    AppIn,
    /// Leg completed
    Finished,
    /// Leg aborted by the network or transport
    AbortedNet,
    /// Leg aborted by the participant application
    AbortedApp,
    /// Leg aborted inside the engine (policy, no handler)
    AbortedInternal,
}

impl LifecycleState {
    /// Terminal states close a leg; every leg reports at least one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::AbortedNet | Self::AbortedApp | Self::AbortedInternal
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            Self::AbortedNet | Self::AbortedApp | Self::AbortedInternal
        )
    }

    /// Event name used when publishing
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::NetInPost => names::EXCHANGE_NET_IN_POST,
            Self::NetOutPost => names::EXCHANGE_NET_OUT_POST,
            Self::AppIn => names::EXCHANGE_APP_IN,
            Self::Finished => names::EXCHANGE_FINISHED,
            Self::AbortedNet => names::EXCHANGE_ABORTED_NET,
            Self::AbortedApp => names::EXCHANGE_ABORTED_APP,
            Self::AbortedInternal => names::EXCHANGE_ABORTED_INTERNAL,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// State transition record delivered to a [`NotificationSink`](super::NotificationSink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: NotificationKind,
    pub state: LifecycleState,
    pub exchange_id: Uuid,
    pub message_id: Uuid,
    pub correlation_id: Option<String>,
    pub service_id: String,
    pub operation: String,
    pub participant_role: ParticipantRole,
    pub role: Role,
    pub scope: Scope,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn for_exchange(
        exchange: &Exchange,
        role: Role,
        scope: Scope,
        kind: NotificationKind,
        state: LifecycleState,
    ) -> Self {
        Self {
            kind,
            state,
            exchange_id: exchange.id(),
            message_id: exchange.message_id(),
            correlation_id: exchange.context.correlation_id.clone(),
            service_id: exchange.service_id.clone(),
            operation: exchange.operation.clone(),
            participant_role: role.into(),
            role,
            scope,
            reason: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
