//! Shared command state and the side effects every branch may perform.
//!
//! A [`CommandCore`] is passed by `&mut` into the branch implementations of
//! each command variant. It owns the exchange for the command's lifetime and
//! tracks the two per-leg guarantees: one terminal transport signal (ack or
//! refusal) and at least one terminal lifecycle notification.

use super::environment::ExchangeEnvironment;
use crate::error::{SbbError, SbbResult};
use crate::events::{LifecycleEvent, LifecycleState, NotificationKind};
use crate::exchange::{CallContext, Exchange, Message, Role, Scope};
use crate::handler::{HandlerKey, IncomingMessage, MessageHandlerPort};
use crate::transport;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub struct CommandCore {
    pub(super) env: Arc<ExchangeEnvironment>,
    pub(super) role: Option<Role>,
    pub(super) scope: Option<Scope>,
    pub(super) exchange: Option<Exchange>,
    pub(super) handler: Option<Arc<dyn MessageHandlerPort>>,
    pub(super) rethrow: bool,
    pub(super) failed: bool,
    pub(super) throwable: Option<SbbError>,
    pub(super) begin: Option<DateTime<Utc>>,
    pub(super) end: Option<DateTime<Utc>>,
    /// Ack or refusal already handed to the transport
    pub(super) terminal_signal: bool,
    pub(super) terminal_notified: bool,
}

impl CommandCore {
    pub(super) fn new(env: Arc<ExchangeEnvironment>) -> Self {
        let rethrow = env.config.exchange.rethrow_failures;
        Self {
            env,
            role: None,
            scope: None,
            exchange: None,
            handler: None,
            rethrow,
            failed: false,
            throwable: None,
            begin: None,
            end: None,
            terminal_signal: false,
            terminal_notified: false,
        }
    }

    pub fn role(&self) -> SbbResult<Role> {
        self.role
            .ok_or_else(|| SbbError::configuration("Command role has not been set"))
    }

    pub fn scope(&self) -> SbbResult<Scope> {
        self.scope
            .ok_or_else(|| SbbError::configuration("Command scope has not been set"))
    }

    pub fn exchange(&self) -> SbbResult<&Exchange> {
        self.exchange
            .as_ref()
            .ok_or_else(|| SbbError::configuration("Command has no exchange"))
    }

    pub fn exchange_mut(&mut self) -> SbbResult<&mut Exchange> {
        self.exchange
            .as_mut()
            .ok_or_else(|| SbbError::configuration("Command has no exchange"))
    }

    pub fn environment(&self) -> &Arc<ExchangeEnvironment> {
        &self.env
    }

    /// Record a failure without propagating it
    pub fn record_failure(&mut self, error: SbbError) {
        self.failed = true;
        self.throwable = Some(error);
    }

    /// Delegate to the policy enforcer for the current role and scope
    pub async fn apply_policy(&mut self) -> SbbResult<()> {
        let role = self.role()?;
        let scope = self.scope()?;
        let env = Arc::clone(&self.env);
        let exchange = self.exchange_mut()?;
        let policy = exchange.context.agreed_policy.clone();

        env.policy
            .apply_policy(exchange, role, policy.as_ref(), scope)
            .await
            .map_err(|violation| {
                warn!(
                    exchange_id = %exchange.id(),
                    role = %role,
                    scope = %scope,
                    kind = ?violation.kind,
                    reason = %violation.reason,
                    "Policy rejected exchange"
                );
                SbbError::from(violation)
            })
    }

    /// Acknowledge the current leg; repeated calls are no-ops
    pub async fn ack_exchange(&mut self) {
        if self.terminal_signal {
            debug!("Exchange leg already terminated, skipping acknowledgment");
            return;
        }
        self.terminal_signal = true;

        let Some(exchange) = self.exchange.as_ref() else {
            return;
        };

        match self.env.channel.ack_exchange(exchange).await {
            Ok(()) => debug!(exchange_id = %exchange.id(), "Exchange acknowledged"),
            Err(e) => error!(
                exchange_id = %exchange.id(),
                error = %e,
                "Failed to acknowledge exchange"
            ),
        }
    }

    /// Refuse the current leg; ignored once the leg has been terminated
    pub async fn refuse_exchange_with_error(&mut self, cause: &SbbError) {
        if self.terminal_signal {
            debug!(
                cause = %cause,
                "Exchange leg already terminated, not refusing"
            );
            return;
        }
        self.terminal_signal = true;

        let Some(exchange) = self.exchange.as_ref() else {
            return;
        };

        warn!(exchange_id = %exchange.id(), cause = %cause, "Refusing exchange");
        if let Err(e) = self
            .env
            .channel
            .refuse_exchange_with_error(exchange, cause)
            .await
        {
            error!(
                exchange_id = %exchange.id(),
                error = %e,
                "Failed to refuse exchange"
            );
        }
    }

    /// Fire-and-forget lifecycle notification
    pub fn send_notification(
        &mut self,
        kind: NotificationKind,
        state: LifecycleState,
        reason: Option<&str>,
    ) {
        let (Some(exchange), Some(role), Some(scope)) =
            (self.exchange.as_ref(), self.role, self.scope)
        else {
            return;
        };

        let mut event = LifecycleEvent::for_exchange(exchange, role, scope, kind, state);
        if let Some(reason) = reason {
            event = event.with_reason(reason);
        }
        self.env.notifications.notify(event);

        if state.is_terminal() {
            self.terminal_notified = true;
        }
    }

    pub fn notify(&mut self, state: LifecycleState) {
        self.send_notification(NotificationKind::Exchange, state, None);
    }

    /// Notify the aborted state implied by `error`
    pub fn notify_failure(&mut self, error: &SbbError) {
        self.send_notification(
            NotificationKind::Exchange,
            error.lifecycle_state(),
            Some(error.reason()),
        );
    }

    /// Memoized lookup of the participant handler for role, service and operation
    pub fn resolve_message_handler(&mut self) -> Option<Arc<dyn MessageHandlerPort>> {
        if let Some(handler) = &self.handler {
            return Some(Arc::clone(handler));
        }

        let role = self.role?;
        let exchange = self.exchange.as_ref()?;
        let key = HandlerKey::new(role, exchange.service_id.clone(), exchange.operation.clone());
        let handler = self.env.handlers.resolve(&key)?;
        self.handler = Some(Arc::clone(&handler));
        Some(handler)
    }

    fn require_handler(&mut self) -> SbbResult<Arc<dyn MessageHandlerPort>> {
        match self.resolve_message_handler() {
            Some(handler) => Ok(handler),
            None => {
                let exchange = self.exchange()?;
                Err(SbbError::MessageNotAccepted {
                    service_id: exchange.service_id.clone(),
                    operation: exchange.operation.clone(),
                    reason: "no message handler registered".to_string(),
                })
            }
        }
    }

    /// Deliver a message to the participant after checking must-understand headers
    pub async fn invoke_handle_message(&mut self, message: Message) -> SbbResult<()> {
        let handler = self.require_handler()?;
        let role = self.role()?;
        let scope = self.scope()?;
        let exchange = self.exchange()?;

        let understood = handler.understood_headers();
        if let Some(header) = message.first_not_understood(understood.iter().map(String::as_str)) {
            return Err(SbbError::MessageNotAccepted {
                service_id: exchange.service_id.clone(),
                operation: exchange.operation.clone(),
                reason: format!("must-understand header '{header}' is not understood"),
            });
        }

        let operation = exchange.operation.clone();
        let incoming = IncomingMessage {
            exchange_id: exchange.id(),
            service_id: exchange.service_id.clone(),
            operation: operation.clone(),
            role,
            scope,
            message,
            context: exchange.context.clone(),
        };

        self.notify(LifecycleState::AppIn);
        handler
            .handle_message(incoming)
            .await
            .map_err(|e| SbbError::from_handler(&operation, e))
    }

    /// Deliver a failure to the participant's error callback
    pub async fn invoke_handle_error(&mut self, error: SbbError) -> SbbResult<()> {
        let handler = self.require_handler()?;
        let exchange = self.exchange()?;
        let operation = exchange.operation.clone();

        handler
            .handle_error(error, &exchange.context)
            .await
            .map_err(|e| SbbError::from_handler(&operation, e))
    }

    /// Deliver a failure to the participant, logging a failing callback
    pub async fn deliver_error_quietly(&mut self, error: SbbError) {
        if let Err(secondary) = self.invoke_handle_error(error).await {
            warn!(error = %secondary, "Participant error callback failed");
            self.send_notification(
                NotificationKind::Exchange,
                LifecycleState::AbortedApp,
                Some(secondary.reason()),
            );
        }
    }

    /// Hand the exchange to the transport without waiting
    pub async fn send(&mut self) -> SbbResult<()> {
        let env = Arc::clone(&self.env);
        env.channel.send(self.exchange()?).await
    }

    /// Send and wait for the transport; does not inspect the exchange status
    pub async fn send_sync(&mut self) -> SbbResult<()> {
        let env = Arc::clone(&self.env);
        let timeout = env.config.exchange.call_timeout();
        let exchange = self.exchange_mut()?;
        transport::send_sync_with_deadline(env.channel.as_ref(), exchange, timeout).await
    }

    /// Fail when the transport marked the exchange as errored
    pub fn ensure_not_error(&self) -> SbbResult<()> {
        let exchange = self.exchange()?;
        if exchange.is_error() {
            return Err(SbbError::infrastructure(exchange.failure_error().reason()));
        }
        Ok(())
    }

    /// Payload of the inbound leg for the current scope
    pub fn inbound_message(&self) -> SbbResult<Message> {
        let exchange = self.exchange()?;
        let message = match self.scope()? {
            Scope::Request => exchange.in_message.as_ref(),
            Scope::Response => exchange
                .response_message()
                .or(exchange.in_message.as_ref()),
        };
        message.cloned().ok_or_else(|| {
            SbbError::infrastructure(format!(
                "Exchange {} carries no message for the {} leg",
                exchange.id(),
                self.scope.map_or("unknown".to_string(), |s| s.to_string())
            ))
        })
    }

    pub fn context(&self) -> SbbResult<&CallContext> {
        Ok(&self.exchange()?.context)
    }
}

impl fmt::Debug for CommandCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCore")
            .field("role", &self.role)
            .field("scope", &self.scope)
            .field("exchange_id", &self.exchange.as_ref().map(Exchange::id))
            .field("has_handler", &self.handler.is_some())
            .field("rethrow", &self.rethrow)
            .field("failed", &self.failed)
            .field("throwable", &self.throwable)
            .field("begin", &self.begin)
            .field("end", &self.end)
            .finish()
    }
}
