//! Delivery Channel Abstraction
//!
//! How a message physically travels is owned by the surrounding container.
//! The engine only needs the four operations of [`DeliveryChannel`].

use crate::error::{SbbError, SbbResult};
use crate::exchange::Exchange;
use async_trait::async_trait;
use std::time::Duration;

/// Transport-facing operations consumed by commands
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Hand the exchange to the transport without waiting for a response
    async fn send(&self, exchange: &Exchange) -> SbbResult<()>;

    /// Send and wait for the response leg; the transport fills the out or
    /// fault slot, or sets the error status, before returning
    async fn send_sync(&self, exchange: &mut Exchange, timeout: Duration) -> SbbResult<()>;

    /// Terminal success signal for the current leg
    async fn ack_exchange(&self, exchange: &Exchange) -> SbbResult<()>;

    /// Terminal failure signal for the current leg
    async fn refuse_exchange_with_error(&self, exchange: &Exchange, cause: &SbbError)
        -> SbbResult<()>;
}

/// Run `send_sync` under an engine-side deadline in addition to the
/// transport's own timeout
pub async fn send_sync_with_deadline(
    channel: &dyn DeliveryChannel,
    exchange: &mut Exchange,
    timeout: Duration,
) -> SbbResult<()> {
    let outcome = tokio::time::timeout(timeout, channel.send_sync(exchange, timeout)).await;
    match outcome {
        Ok(result) => result,
        Err(_) => Err(SbbError::infrastructure(format!(
            "No response for {}/{} within {}ms",
            exchange.service_id,
            exchange.operation,
            timeout.as_millis()
        ))),
    }
}
