//! Fire-and-forget exchanges.

use super::base::CommandCore;
use super::ExchangeBranches;
use crate::error::{SbbError, SbbResult};
use crate::events::LifecycleState;
use crate::fault;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

/// Command for ONE_WAY operations without a callback
#[derive(Debug, Clone, Copy, Default)]
pub struct OneWayCommand;

/// Inbound request whose exchange the transport already marked as failed
pub(super) async fn receive_failed_request(core: &mut CommandCore) -> SbbResult<()> {
    let failure = core.exchange()?.failure_error();
    warn!(error = %failure, "Inbound request arrived with transport error status");

    core.notify_failure(&failure);
    core.deliver_error_quietly(failure.clone()).await;
    core.ack_exchange().await;
    Err(failure)
}

/// Inbound request rejected by policy: tell the participant, then always ack
pub(super) async fn receive_rejected_request(
    core: &mut CommandCore,
    violation: SbbError,
) -> SbbResult<()> {
    core.notify_failure(&violation);
    core.deliver_error_quietly(violation.clone()).await;
    core.ack_exchange().await;
    Err(violation)
}

#[async_trait]
impl ExchangeBranches for OneWayCommand {
    #[instrument(skip_all, fields(branch = "outgoing_request"))]
    async fn execute_outgoing_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        core.apply_policy().await?;

        let sent = match core.send_sync().await {
            Ok(()) => core.ensure_not_error(),
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                core.notify(LifecycleState::NetOutPost);
                core.notify(LifecycleState::Finished);
                Ok(())
            }
            Err(e) => {
                core.notify_failure(&e);
                core.notify(LifecycleState::Finished);
                Err(e)
            }
        }
    }

    #[instrument(skip_all, fields(branch = "incoming_request"))]
    async fn execute_incoming_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        if core.exchange()?.is_error() {
            return receive_failed_request(core).await;
        }

        core.notify(LifecycleState::NetInPost);
        if let Err(violation) = core.apply_policy().await {
            return receive_rejected_request(core, violation).await;
        }

        let message = core.inbound_message()?;
        // Commit point precedes application processing
        core.ack_exchange().await;
        core.invoke_handle_message(message).await?;
        core.notify(LifecycleState::Finished);
        Ok(())
    }

    #[instrument(skip_all, fields(branch = "incoming_response"))]
    async fn execute_incoming_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        if core.exchange()?.is_error() {
            let failure = core.exchange()?.failure_error();
            core.notify_failure(&failure);
            core.ack_exchange().await;
            core.deliver_error_quietly(failure.clone()).await;
            core.record_failure(failure);
            return Ok(());
        }

        let message = core.inbound_message()?;
        core.notify(LifecycleState::NetInPost);

        match fault::classify_fault(&message.body) {
            Some(remote) => {
                info!(kind = %remote.fault_kind(), "Default fault received, delivering to error callback");
                core.ack_exchange().await;
                core.invoke_handle_error(remote.clone()).await?;
                core.record_failure(remote);
            }
            None => {
                core.ack_exchange().await;
                core.invoke_handle_message(message).await?;
            }
        }

        core.notify(LifecycleState::Finished);
        Ok(())
    }

    #[instrument(skip_all, fields(branch = "outgoing_response"))]
    async fn execute_outgoing_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        // An errored exchange already reports its fault
        if !core.exchange()?.is_error() {
            core.apply_policy().await?;
        }

        core.send_sync().await?;
        core.ensure_not_error()?;

        core.notify(LifecycleState::NetOutPost);
        core.notify(LifecycleState::Finished);
        Ok(())
    }
}
