//! # Exchange Engine
//!
//! Entry point for embedding the engine: wraps a [`CommandFactory`] and
//! prepares commands for the common interactions so callers do not have to
//! set role, scope and exchange by hand.

use crate::command::{Command, CommandFactory, ExchangeEnvironment};
use crate::error::{SbbError, SbbResult};
use crate::exchange::{CallContext, Exchange, Message, Role, Scope};
use crate::service::OperationDescriptor;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ExchangeEngine {
    factory: CommandFactory,
}

impl ExchangeEngine {
    pub fn new(env: Arc<ExchangeEnvironment>) -> Self {
        Self {
            factory: CommandFactory::new(env),
        }
    }

    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }

    pub fn environment(&self) -> &Arc<ExchangeEnvironment> {
        self.factory.environment()
    }

    /// Synchronous request/response; returns the response payload
    #[instrument(skip(self, message, context), fields(service_id = %operation.service_id, operation = %operation.name))]
    pub async fn call_blocking(
        &self,
        operation: &OperationDescriptor,
        message: Message,
        context: CallContext,
    ) -> SbbResult<Message> {
        let exchange = self
            .factory
            .create_exchange(operation, context)
            .with_in_message(message);

        self.factory
            .create_blocking(operation)
            .with_role(Role::Sender)
            .with_scope(Scope::Request)
            .with_exchange(exchange)
            .call_blocking()
            .await
    }

    /// Send a request without waiting for a response
    ///
    /// Returns the message id a later response or callback correlates with.
    #[instrument(skip(self, message, context), fields(service_id = %operation.service_id, operation = %operation.name))]
    pub async fn send_one_way(
        &self,
        operation: &OperationDescriptor,
        message: Message,
        context: CallContext,
    ) -> SbbResult<Uuid> {
        let exchange = self
            .factory
            .create_exchange(operation, context)
            .with_in_message(message);
        let message_id = exchange.message_id();

        let mut command = self
            .factory
            .create(operation)
            .with_role(Role::Sender)
            .with_scope(Scope::Request)
            .with_exchange(exchange);
        command.execute().await?;

        match command.throwable() {
            Some(error) => Err(error.clone()),
            None => Ok(message_id),
        }
    }

    /// Run an exchange delivered by the transport
    ///
    /// The operation's declared pattern is looked up in the service
    /// directory and falls back to the exchange's own pattern. The executed
    /// command is returned for inspection.
    pub async fn dispatch_inbound(
        &self,
        role: Role,
        scope: Scope,
        exchange: Exchange,
    ) -> SbbResult<Command> {
        let operation = self.describe(&exchange);
        debug!(
            exchange_id = %exchange.id(),
            role = %role,
            scope = %scope,
            pattern = %operation.pattern,
            "Dispatching inbound exchange"
        );

        let mut command = self
            .factory
            .create(&operation)
            .with_role(role)
            .with_scope(scope)
            .with_exchange(exchange);
        command.execute().await?;
        Ok(command)
    }

    /// Complete an asynchronous request with the response the transport delivered
    ///
    /// The response is matched to the stored request by message id.
    pub async fn complete_response(&self, response: Exchange) -> SbbResult<Command> {
        let message_id = response.message_id();
        if !self.environment().store().contains(&message_id) {
            return Err(SbbError::MessageNotAccepted {
                service_id: response.service_id.clone(),
                operation: response.operation.clone(),
                reason: format!("no pending request with message id {message_id}"),
            });
        }
        self.dispatch_inbound(Role::Sender, Scope::Response, response)
            .await
    }

    fn describe(&self, exchange: &Exchange) -> OperationDescriptor {
        self.environment()
            .directory()
            .describe(&exchange.service_id)
            .and_then(|description| description.operation(&exchange.operation).cloned())
            .unwrap_or_else(|| {
                OperationDescriptor::new(
                    exchange.service_id.clone(),
                    exchange.operation.clone(),
                    exchange.pattern(),
                )
            })
    }
}
