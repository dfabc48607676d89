//! IN_OUT exchanges, synchronous or asynchronous.
//!
//! In `sync` mode the outgoing request waits for the response and re-enters
//! the same command with [`Scope::Response`], so the whole round trip runs in
//! one call stack and finishes with a single acknowledgment. In async mode
//! the request is stored for correlation and the response leg is handled by
//! a separate command.

use super::base::CommandCore;
use super::ExchangeBranches;
use crate::error::{SbbError, SbbResult};
use crate::events::LifecycleState;
use crate::exchange::Scope;
use crate::fault;
use async_trait::async_trait;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestResponseCommand {
    sync: bool,
}

impl RequestResponseCommand {
    pub fn new(sync: bool) -> Self {
        Self { sync }
    }

    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// Consumer-side failure: thrown in sync mode, routed to the handler otherwise
    async fn fail_response(&self, core: &mut CommandCore, failure: SbbError) -> SbbResult<()> {
        core.notify_failure(&failure);

        if self.sync {
            core.ack_exchange().await;
            return Err(failure);
        }

        core.deliver_error_quietly(failure.clone()).await;
        core.ack_exchange().await;
        core.record_failure(failure);
        Ok(())
    }

    fn release_correlation(core: &CommandCore) -> SbbResult<()> {
        let message_id = core.exchange()?.message_id();
        if core.environment().store().release(&message_id).is_some() {
            debug!(message_id = %message_id, "Correlated exchange released");
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeBranches for RequestResponseCommand {
    #[instrument(skip_all, fields(branch = "outgoing_request", sync = self.sync))]
    async fn execute_outgoing_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        core.apply_policy().await?;

        if !self.sync {
            let exchange = core.exchange()?;
            core.environment().store().persist(exchange);
            if let Err(e) = core.send().await {
                Self::release_correlation(core)?;
                return Err(e);
            }
            core.notify(LifecycleState::NetOutPost);
            core.notify(LifecycleState::Finished);
            return Ok(());
        }

        core.send_sync().await?;
        core.notify(LifecycleState::NetOutPost);

        core.scope = Some(Scope::Response);
        self.execute_incoming_response(core).await
    }

    #[instrument(skip_all, fields(branch = "incoming_request"))]
    async fn execute_incoming_request(&self, core: &mut CommandCore) -> SbbResult<()> {
        if core.exchange()?.is_error() {
            // A response bouncing back from the network
            let failure = core.exchange()?.failure_error();
            warn!(error = %failure, "Returned exchange received on the provider side");
            core.notify_failure(&failure);
            core.deliver_error_quietly(failure.clone()).await;
            core.ack_exchange().await;
            return Err(failure);
        }

        let exchange = core.exchange()?;
        core.environment().store().persist(exchange);
        core.notify(LifecycleState::NetInPost);

        if let Err(violation) = core.apply_policy().await {
            core.notify_failure(&violation);
            let refusal = match core.invoke_handle_error(violation.clone()).await {
                Ok(()) => violation.clone(),
                Err(secondary) => {
                    error!(
                        error = %secondary,
                        "Participant error callback failed, refusing with a generic failure"
                    );
                    SbbError::infrastructure("Request could not be processed by the provider")
                }
            };
            Self::release_correlation(core)?;
            core.refuse_exchange_with_error(&refusal).await;
            return Err(violation);
        }

        let message = core.inbound_message()?;
        if let Err(failure) = core.invoke_handle_message(message).await {
            Self::release_correlation(core)?;
            return Err(failure);
        }

        core.ack_exchange().await;
        core.notify(LifecycleState::Finished);
        Ok(())
    }

    #[instrument(skip_all, fields(branch = "incoming_response", sync = self.sync))]
    async fn execute_incoming_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        if !self.sync {
            Self::release_correlation(core)?;
        }

        if core.exchange()?.is_error() {
            let failure = core.exchange()?.failure_error();
            return self.fail_response(core, failure).await;
        }

        let message = core.inbound_message()?;
        let remote_fault = fault::classify_fault(&message.body);

        if remote_fault.is_none() {
            if let Err(violation) = core.apply_policy().await {
                return self.fail_response(core, violation).await;
            }
        }

        if self.sync {
            core.ack_exchange().await;
            match remote_fault {
                // Raised to the caller by call_blocking
                Some(remote) => {
                    core.notify_failure(&remote);
                    core.record_failure(remote);
                }
                None => core.notify(LifecycleState::Finished),
            }
            return Ok(());
        }

        let has_fault = core.exchange()?.fault.is_some();
        let delivered = match remote_fault {
            Some(remote) => {
                let delivered = core.invoke_handle_error(remote.clone()).await;
                core.record_failure(remote);
                delivered
            }
            None if has_fault => {
                let remote = fault::classify_remote_fault(&message.body);
                let delivered = core.invoke_handle_error(remote.clone()).await;
                core.record_failure(remote);
                delivered
            }
            None => core.invoke_handle_message(message).await,
        };

        // Acknowledged whatever the handler did
        core.ack_exchange().await;
        delivered?;

        core.notify(LifecycleState::Finished);
        Ok(())
    }

    #[instrument(skip_all, fields(branch = "outgoing_response"))]
    async fn execute_outgoing_response(&self, core: &mut CommandCore) -> SbbResult<()> {
        Self::release_correlation(core)?;

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
