//! Selects the command variant for an operation.

use super::{
    CallbackCommand, Command, CommandVariant, ExchangeEnvironment, OneWayCommand,
    RequestResponseCommand,
};
use crate::exchange::{CallContext, Exchange, ExchangePattern};
use crate::service::OperationDescriptor;
use std::sync::Arc;
use tracing::debug;

/// Builds commands against a shared [`ExchangeEnvironment`]
#[derive(Debug, Clone)]
pub struct CommandFactory {
    env: Arc<ExchangeEnvironment>,
}

impl CommandFactory {
    pub fn new(env: Arc<ExchangeEnvironment>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Arc<ExchangeEnvironment> {
        &self.env
    }

    /// Variant for an operation's declared pattern
    ///
    /// IN_OUT operations get an asynchronous request/response command; use
    /// [`create_blocking`](Self::create_blocking) for synchronous calls.
    pub fn variant_for(operation: &OperationDescriptor, sync: bool) -> CommandVariant {
        match operation.pattern {
            ExchangePattern::InOut => {
                CommandVariant::RequestResponse(RequestResponseCommand::new(sync))
            }
            ExchangePattern::RobustOneWay => CommandVariant::Callback(CallbackCommand::new()),
            ExchangePattern::OneWay if operation.has_callback() => {
                CommandVariant::Callback(CallbackCommand::new())
            }
            ExchangePattern::OneWay => CommandVariant::OneWay(OneWayCommand),
        }
    }

    pub fn create(&self, operation: &OperationDescriptor) -> Command {
        self.build(operation, false)
    }

    /// Command whose IN_OUT request waits for the response
    pub fn create_blocking(&self, operation: &OperationDescriptor) -> Command {
        self.build(operation, true)
    }

    /// Fresh exchange for an operation, matching its declared pattern
    pub fn create_exchange(
        &self,
        operation: &OperationDescriptor,
        context: CallContext,
    ) -> Exchange {
        Exchange::new(
            operation.pattern,
            operation.service_id.clone(),
            operation.name.clone(),
            context,
        )
    }

    fn build(&self, operation: &OperationDescriptor, sync: bool) -> Command {
        let variant = Self::variant_for(operation, sync);
        debug!(
            service_id = %operation.service_id,
            operation = %operation.name,
            pattern = %operation.pattern,
            variant = variant.name(),
            "Creating command"
        );
        Command::new(Arc::clone(&self.env), variant)
    }
}
