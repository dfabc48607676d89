//! Participant-side mocks: handler, policy enforcer and notification sink.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sbb_core::error::{HandlerError, PolicyViolation, PolicyViolationKind, SbbError};
use sbb_core::events::{LifecycleEvent, LifecycleState, NotificationKind, NotificationSink};
use sbb_core::exchange::{CallContext, Exchange, Role, Scope};
use sbb_core::handler::{IncomingMessage, MessageHandlerPort};
use sbb_core::policy::{AgreedPolicy, PolicyEnforcer};

/// Handler recording every delivery
#[derive(Default)]
pub struct RecordingHandler {
    messages: Mutex<Vec<IncomingMessage>>,
    errors: Mutex<Vec<SbbError>>,
    message_failure: Option<HandlerError>,
    error_failure: Option<HandlerError>,
    understood: Vec<String>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `handle_message` with `error`
    pub fn failing_with(mut self, error: HandlerError) -> Self {
        self.message_failure = Some(error);
        self
    }

    /// Fail every `handle_error` with `error`
    pub fn failing_error_callback(mut self, error: HandlerError) -> Self {
        self.error_failure = Some(error);
        self
    }

    pub fn understanding(mut self, header: &str) -> Self {
        self.understood.push(header.to_string());
        self
    }

    pub fn messages(&self) -> Vec<IncomingMessage> {
        self.messages.lock().clone()
    }

    pub fn errors(&self) -> Vec<SbbError> {
        self.errors.lock().clone()
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }
}

#[async_trait]
impl MessageHandlerPort for RecordingHandler {
    async fn handle_message(&self, incoming: IncomingMessage) -> Result<(), HandlerError> {
        self.messages.lock().push(incoming);
        match &self.message_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn handle_error(&self, error: SbbError, _context: &CallContext) -> Result<(), HandlerError> {
        self.errors.lock().push(error);
        match &self.error_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn understood_headers(&self) -> Vec<String> {
        self.understood.clone()
    }
}

/// Policy enforcer rejecting a configured role and scope
#[derive(Default)]
pub struct ScriptedPolicyEnforcer {
    rejections: Vec<(Role, Scope, PolicyViolation)>,
    calls: Mutex<Vec<(Role, Scope)>>,
}

impl ScriptedPolicyEnforcer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, role: Role, scope: Scope, kind: PolicyViolationKind, reason: &str) -> Self {
        self.rejections
            .push((role, scope, PolicyViolation::new(kind, reason)));
        self
    }

    pub fn calls(&self) -> Vec<(Role, Scope)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PolicyEnforcer for ScriptedPolicyEnforcer {
    async fn apply_policy(
        &self,
        _exchange: &mut Exchange,
        role: Role,
        _policy: Option<&AgreedPolicy>,
        scope: Scope,
    ) -> Result<(), PolicyViolation> {
        self.calls.lock().push((role, scope));
        match self
            .rejections
            .iter()
            .find(|(r, s, _)| *r == role && *s == scope)
        {
            Some((_, _, violation)) => Err(violation.clone()),
            None => Ok(()),
        }
    }
}

/// Sink collecting notifications synchronously
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    pub fn states(&self) -> Vec<LifecycleState> {
        self.events.lock().iter().map(|event| event.state).collect()
    }

    pub fn count(&self, state: LifecycleState) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.state == state)
            .count()
    }

    pub fn terminal_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.state.is_terminal())
            .count()
    }

    pub fn fault_events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind == NotificationKind::Fault)
            .cloned()
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: LifecycleEvent) {
        self.events.lock().push(event);
    }
}
