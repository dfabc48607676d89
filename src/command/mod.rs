//! # Exchange Commands
//!
//! A [`Command`] owns one [`Exchange`] and drives it through exactly one of
//! four branches selected by the command's [`Role`] and [`Scope`]:
//!
//! | Role     | Scope    | Branch                       |
//! |----------|----------|------------------------------|
//! | Sender   | Request  | `execute_outgoing_request`   |
//! | Sender   | Response | `execute_incoming_response`  |
//! | Receiver | Request  | `execute_incoming_request`   |
//! | Receiver | Response | `execute_outgoing_response`  |
//!
//! The branches are provided by three variants ([`OneWayCommand`],
//! [`CallbackCommand`], [`RequestResponseCommand`]) over a shared
//! [`CommandCore`]. [`Command::execute`] wraps the branch with timing,
//! failure bookkeeping and the propagation rules:
//!
//! - Sender + Request: failures are returned only when rethrow is enabled
//! - Receiver + Request: failures become a refusal of the exchange
//! - Sender + Response: failures are always returned
//! - Receiver + Response: failures are returned only when rethrow is enabled
//!
//! Every leg ends with a terminal lifecycle notification; the template emits
//! one when the branch did not.

pub mod base;
pub mod callback;
pub mod environment;
pub mod factory;
pub mod one_way;
pub mod request_response;

pub use base::CommandCore;
pub use callback::CallbackCommand;
pub use environment::{ExchangeEnvironment, ExchangeEnvironmentBuilder};
pub use factory::CommandFactory;
pub use one_way::OneWayCommand;
pub use request_response::RequestResponseCommand;

use crate::error::{SbbError, SbbResult};
use crate::events::LifecycleState;
use crate::exchange::{Exchange, Message, Role, Scope};
use crate::fault;
use crate::handler::MessageHandlerPort;
use crate::logging;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// The four branch operations a command variant provides
#[async_trait]
pub trait ExchangeBranches: Send + Sync {
    async fn execute_outgoing_request(&self, core: &mut CommandCore) -> SbbResult<()>;

    async fn execute_incoming_request(&self, core: &mut CommandCore) -> SbbResult<()>;

    async fn execute_incoming_response(&self, core: &mut CommandCore) -> SbbResult<()>;

    async fn execute_outgoing_response(&self, core: &mut CommandCore) -> SbbResult<()>;
}

/// Concrete command behaviour
#[derive(Debug, Clone, Copy)]
pub enum CommandVariant {
    OneWay(OneWayCommand),
    Callback(CallbackCommand),
    RequestResponse(RequestResponseCommand),
}

impl CommandVariant {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OneWay(_) => "one_way",
            Self::Callback(_) => "callback",
            Self::RequestResponse(command) if command.is_sync() => "request_response_sync",
            Self::RequestResponse(_) => "request_response",
        }
    }

    fn branches(&self) -> &dyn ExchangeBranches {
        match self {
            Self::OneWay(command) => command,
            Self::Callback(command) => command,
            Self::RequestResponse(command) => command,
        }
    }
}

/// One exchange, executed once
#[derive(Debug)]
pub struct Command {
    core: CommandCore,
    variant: CommandVariant,
    executed: bool,
}

impl Command {
    pub fn new(env: Arc<ExchangeEnvironment>, variant: CommandVariant) -> Self {
        Self {
            core: CommandCore::new(env),
            variant,
            executed: false,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.core.role = Some(role);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.core.scope = Some(scope);
        self
    }

    pub fn with_exchange(mut self, exchange: Exchange) -> Self {
        self.core.exchange = Some(exchange);
        self
    }

    /// Use this handler instead of resolving one
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandlerPort>) -> Self {
        self.core.handler = Some(handler);
        self
    }

    pub fn with_rethrow(mut self, rethrow: bool) -> Self {
        self.core.rethrow = rethrow;
        self
    }

    pub fn variant(&self) -> &CommandVariant {
        &self.variant
    }

    pub fn role(&self) -> Option<Role> {
        self.core.role
    }

    pub fn scope(&self) -> Option<Scope> {
        self.core.scope
    }

    pub fn exchange(&self) -> Option<&Exchange> {
        self.core.exchange.as_ref()
    }

    pub fn into_exchange(self) -> Option<Exchange> {
        self.core.exchange
    }

    /// Whether the last execution recorded a failure
    pub fn failed(&self) -> bool {
        self.core.failed
    }

    /// The failure recorded by the last execution
    pub fn throwable(&self) -> Option<&SbbError> {
        self.core.throwable.as_ref()
    }

    pub fn begin(&self) -> Option<DateTime<Utc>> {
        self.core.begin
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.core.end
    }

    /// Run the branch selected by role and scope
    #[instrument(skip(self), fields(command = self.variant.name()))]
    pub async fn execute(&mut self) -> SbbResult<()> {
        if self.executed {
            return Err(SbbError::configuration("Command has already been executed"));
        }
        let role = self.core.role()?;
        let scope = self.core.scope()?;
        let exchange_id = self.core.exchange()?.id();
        self.executed = true;

        debug!(
            exchange_id = %exchange_id,
            role = %role,
            scope = %scope,
            "Executing command"
        );

        self.core.begin = Some(Utc::now());
        let branches = self.variant.branches();
        let result = match (role, scope) {
            (Role::Sender, Scope::Request) => branches.execute_outgoing_request(&mut self.core).await,
            (Role::Sender, Scope::Response) => {
                branches.execute_incoming_response(&mut self.core).await
            }
            (Role::Receiver, Scope::Request) => {
                if self.core.resolve_message_handler().is_some() {
                    branches.execute_incoming_request(&mut self.core).await
                } else {
                    let exchange = self.core.exchange()?;
                    Err(SbbError::MessageNotAccepted {
                        service_id: exchange.service_id.clone(),
                        operation: exchange.operation.clone(),
                        reason: "no message handler registered".to_string(),
                    })
                }
            }
            (Role::Receiver, Scope::Response) => {
                branches.execute_outgoing_response(&mut self.core).await
            }
        };
        self.core.end = Some(Utc::now());

        match result {
            Ok(()) => {
                if !self.core.terminal_notified {
                    self.core.notify(LifecycleState::Finished);
                }
                logging::log_exchange_operation(
                    self.variant.name(),
                    &exchange_id.to_string(),
                    &self.core.exchange()?.service_id,
                    if self.core.failed { "failed" } else { "completed" },
                    None,
                );
                Ok(())
            }
            Err(error) => self.handle_failure(role, error).await,
        }
    }

    async fn handle_failure(&mut self, role: Role, error: SbbError) -> SbbResult<()> {
        self.core.record_failure(error.clone());
        if !self.core.terminal_notified {
            self.core.notify_failure(&error);
        }

        // A synchronous round trip may have moved on to the response scope
        let scope = self.core.scope()?;
        warn!(role = %role, scope = %scope, error = %error, "Command execution failed");

        match (role, scope) {
            (Role::Receiver, Scope::Request) => {
                self.core.refuse_exchange_with_error(&error).await;
                Ok(())
            }
            (Role::Sender, Scope::Response) => Err(error),
            _ if self.core.rethrow => Err(error),
            _ => {
                logging::log_error(self.variant.name(), "execute", &error.to_string(), None);
                Ok(())
            }
        }
    }

    /// Execute a synchronous request and return the response payload
    ///
    /// A fault in the response is turned into the error it describes.
    pub async fn call_blocking(mut self) -> SbbResult<Message> {
        if let Err(error) = self.execute().await {
            return Err(error);
        }
        if let Some(error) = self.core.throwable.take() {
            return Err(error);
        }

        let exchange = self
            .core
            .exchange
            .ok_or_else(|| SbbError::configuration("Command has no exchange"))?;

        if let Some(fault) = exchange.fault {
            return Err(fault::classify_remote_fault(&fault.body));
        }

        exchange.out_message.ok_or_else(|| {
            SbbError::infrastructure(format!(
                "No response received for {}/{}",
                exchange.service_id, exchange.operation
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::exchange::{CallContext, ExchangePattern};
    use crate::handler::{IncomingMessage, StaticHandlerResolver};
    use crate::transport::DeliveryChannel;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingChannel {
        acks: AtomicUsize,
        refusals: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryChannel for CountingChannel {
        async fn send(&self, _exchange: &Exchange) -> SbbResult<()> {
            Ok(())
        }

        async fn send_sync(&self, _exchange: &mut Exchange, _timeout: Duration) -> SbbResult<()> {
            Ok(())
        }

        async fn ack_exchange(&self, _exchange: &Exchange) -> SbbResult<()> {
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn refuse_exchange_with_error(
            &self,
            _exchange: &Exchange,
            _cause: &SbbError,
        ) -> SbbResult<()> {
            self.refusals.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl MessageHandlerPort for FailingHandler {
        async fn handle_message(&self, _incoming: IncomingMessage) -> Result<(), HandlerError> {
            Err(HandlerError::unexpected("boom"))
        }

        async fn handle_error(
            &self,
            _error: SbbError,
            _context: &crate::exchange::CallContext,
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn environment(channel: Arc<CountingChannel>) -> Arc<ExchangeEnvironment> {
        ExchangeEnvironment::builder(channel, Arc::new(StaticHandlerResolver::new()))
            .build()
            .unwrap()
    }

    fn exchange(pattern: ExchangePattern) -> Exchange {
        Exchange::new(pattern, "orders", "place", CallContext::new())
            .with_in_message(Message::new("<order/>"))
    }

    #[tokio::test]
    async fn test_missing_role_is_configuration_error() {
        let channel = Arc::new(CountingChannel::default());
        let mut command = Command::new(environment(channel.clone()), CommandVariant::OneWay(OneWayCommand))
            .with_scope(Scope::Request)
            .with_exchange(exchange(ExchangePattern::OneWay));

        assert!(matches!(command.execute().await, Err(SbbError::Configuration(_))));
        assert_eq!(channel.acks.load(Ordering::SeqCst), 0);
        assert!(!command.failed());
    }

    #[tokio::test]
    async fn test_missing_exchange_is_configuration_error() {
        let channel = Arc::new(CountingChannel::default());
        let mut command = Command::new(environment(channel), CommandVariant::OneWay(OneWayCommand))
            .with_role(Role::Sender)
            .with_scope(Scope::Request);

        assert!(matches!(command.execute().await, Err(SbbError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_second_execute_is_rejected() {
        let channel = Arc::new(CountingChannel::default());
        let mut command = Command::new(environment(channel), CommandVariant::OneWay(OneWayCommand))
            .with_role(Role::Sender)
            .with_scope(Scope::Request)
            .with_exchange(exchange(ExchangePattern::OneWay));

        command.execute().await.unwrap();
        assert!(command.begin().is_some());
        assert!(command.end() >= command.begin());
        assert!(matches!(command.execute().await, Err(SbbError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_receiver_request_failure_is_not_propagated() {
        let channel = Arc::new(CountingChannel::default());
        let mut command = Command::new(
            environment(channel.clone()),
            CommandVariant::RequestResponse(RequestResponseCommand::new(false)),
        )
        .with_role(Role::Receiver)
        .with_scope(Scope::Request)
        .with_exchange(exchange(ExchangePattern::InOut))
        .with_handler(Arc::new(FailingHandler))
        .with_rethrow(true);

        assert!(command.execute().await.is_ok());
        assert!(command.failed());
        assert!(command.throwable().unwrap().is_participant_failure());
        assert_eq!(channel.refusals.load(Ordering::SeqCst), 1);
        assert_eq!(channel.acks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_explicit_handler_bypasses_resolution() {
        let channel = Arc::new(CountingChannel::default());
        let mut command = Command::new(environment(channel.clone()), CommandVariant::OneWay(OneWayCommand))
            .with_role(Role::Receiver)
            .with_scope(Scope::Request)
            .with_exchange(exchange(ExchangePattern::OneWay))
            .with_handler(Arc::new(FailingHandler));

        command.execute().await.unwrap();

        // Acknowledged before the handler ran, so no refusal follows
        assert!(command.failed());
        assert_eq!(channel.acks.load(Ordering::SeqCst), 1);
        assert_eq!(channel.refusals.load(Ordering::SeqCst), 0);
    }
}
