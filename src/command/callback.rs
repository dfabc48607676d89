//! One-way exchanges whose sender expects an asynchronous callback.
//!
//! Behaves like [`OneWayCommand`] except on the provider's request leg: when
//! the participant fails, the failure is turned into a fault document and
//! sent back to the sender's advertised reply-to endpoint, since the sender
//! has no synchronous channel to learn about it.

use super::base::CommandCore;
use super::one_way::{self, OneWayCommand};
use super::ExchangeBranches;
use crate::error::{SbbError, SbbResult};
use crate::events::{LifecycleState, NotificationKind};
use crate::exchange::{CallContext, Exchange, ExchangePattern, Message, RelationType};
use crate::fault;
use crate::transport;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct CallbackCommand {
    one_way: OneWayCommand,
}

impl CallbackCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a synthesized fault for `cause` to the sender of the current exchange
    ///
    /// Returns `Ok(false)` when the sender advertises no way to receive it.
    pub async fn send_fault_to_sender(
        &self,
        core: &mut CommandCore,
        cause: &SbbError,
    ) -> SbbResult<bool> {
        let original = core.exchange()?;
        let Some(reply_to) = original.context.reply_to.clone() else {
            return Ok(self.drop_fault(core, "sender advertised no reply-to endpoint"));
        };

        let env = Arc::clone(core.environment());
        let Some(fault_operation) = env.directory.default_fault_operation(&reply_to.service_id)
        else {
            let reason = format!(
                "service {} has no default fault operation",
                reply_to.service_id
            );
            return Ok(self.drop_fault(core, &reason));
        };

        let original = core.exchange()?;
        let correlation_id = reply_to
            .correlation_id
            .clone()
            .or_else(|| original.context.correlation_id.clone());

        let mut context = CallContext::new();
        context.fault_correlation_id = reply_to
            .fault_correlation_id
            .clone()
            .or_else(|| correlation_id.clone());
        context.correlation_id = correlation_id;
        context.agreed_policy = original.context.agreed_policy.clone();
        context.reference_parameters = reply_to.reference_parameters.clone();
        context.relate_to(original.message_id(), RelationType::Fault);

        let mut fault_exchange = Exchange::new(
            ExchangePattern::OneWay,
            reply_to.service_id.clone(),
            fault_operation,
            context,
        )
        .with_target(reply_to.address.clone())
        .with_in_message(Message::new(fault::generate_fault_message(cause)));

        info!(
            original_message_id = %original.message_id(),
            fault_exchange_id = %fault_exchange.id(),
            service_id = %fault_exchange.service_id,
            operation = %fault_exchange.operation,
            "Sending fault to sender"
        );

        let timeout = env.config.exchange.call_timeout();
        transport::send_sync_with_deadline(env.channel.as_ref(), &mut fault_exchange, timeout)
            .await?;

        if fault_exchange.is_error() {
            return Err(SbbError::infrastructure(format!(
                "Fault delivery to {} failed: {}",
                reply_to.address,
                fault_exchange.failure_error().reason()
            )));
        }

        core.send_notification(NotificationKind::Fault, LifecycleState::NetOutPost, None);
        Ok(true)
    }

    fn drop_fault(&self, core: &mut CommandCore, reason: &str) -> bool {
        warn!(reason = %reason, "Fault cannot be delivered to sender, dropping it");
        core.send_notification(
            NotificationKind::Fault,
            LifecycleState::AbortedApp,
            Some(&format!("fault dropped: {reason}")),
        );
        false
    }
}

#[async_trait]
impl ExchangeBranches for CallbackCommand {
    async fn execute_outgoing_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        self.one_way.execute_outgoing_request(core).await
    }

    #[instrument(skip_all, fields(branch = "incoming_request", callback = true))]
    async fn execute_incoming_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        if core.exchange()?.is_error() {
            return one_way::receive_failed_request(core).await;
        }

        core.notify(LifecycleState::NetInPost);
        if let Err(violation) = core.apply_policy().await {
            return one_way::receive_rejected_request(core, violation).await;
        }
        core.ack_exchange().await;

        let message = core.inbound_message()?;
        match core.invoke_handle_message(message).await {
            Ok(()) => {
                core.notify(LifecycleState::Finished);
                Ok(())
            }
            Err(failure) => {
                if let Err(secondary) = self.send_fault_to_sender(core, &failure).await {
                    error!(
                        error = %secondary,
                        cause = %failure,
                        "Failed to send fault to sender"
                    );
                }
                core.notify_failure(&failure);
                Err(failure)
            }
        }
    }

    async fn execute_incoming_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        self.one_way.execute_incoming_response(core).await
    }

    async fn execute_outgoing_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        self.one_way.execute_outgoing_response(core).await
    }
}
