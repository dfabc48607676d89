//! Recording delivery channel and candidate endpoints.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sbb_core::error::{SbbError, SbbResult};
use sbb_core::exchange::Exchange;
use sbb_core::resilience::CandidateEndpoint;
use sbb_core::transport::DeliveryChannel;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Transport call observed by [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Send { exchange_id: Uuid },
    SendSync { exchange_id: Uuid, operation: String },
    Ack { exchange_id: Uuid },
    Refuse { exchange_id: Uuid, cause: SbbError },
}

/// Fills in the response slots during `send_sync`
pub type Responder = Box<dyn Fn(&mut Exchange) -> SbbResult<()> + Send + Sync>;

/// Delivery channel that records every call
pub struct RecordingChannel {
    calls: Mutex<Vec<ChannelCall>>,
    sent: Mutex<Vec<Exchange>>,
    responder: Option<Responder>,
    send_error: Option<SbbError>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            responder: None,
            send_error: None,
        }
    }

    /// Answer synchronous sends with `responder`
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&mut Exchange) -> SbbResult<()> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Fail every send with `error`
    pub fn failing_sends(mut self, error: SbbError) -> Self {
        self.send_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().clone()
    }

    /// Exchanges passed to `send` or `send_sync`, after the responder ran
    pub fn sent_exchanges(&self) -> Vec<Exchange> {
        self.sent.lock().clone()
    }

    pub fn ack_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ChannelCall::Ack { .. }))
            .count()
    }

    pub fn refusals(&self) -> Vec<SbbError> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Refuse { cause, .. } => Some(cause.clone()),
                _ => None,
            })
            .collect()
    }

    /// Acks plus refusals
    pub fn terminal_signal_count(&self) -> usize {
        self.ack_count() + self.refusals().len()
    }

    pub fn send_sync_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ChannelCall::SendSync { .. }))
            .count()
    }

    pub fn send_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, ChannelCall::Send { .. }))
            .count()
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeliveryChannel for RecordingChannel {
    async fn send(&self, exchange: &Exchange) -> SbbResult<()> {
        self.calls.lock().push(ChannelCall::Send {
            exchange_id: exchange.id(),
        });
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }
        self.sent.lock().push(exchange.clone());
        Ok(())
    }

    async fn send_sync(&self, exchange: &mut Exchange, _timeout: Duration) -> SbbResult<()> {
        self.calls.lock().push(ChannelCall::SendSync {
            exchange_id: exchange.id(),
            operation: exchange.operation.clone(),
        });
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }
        if let Some(responder) = &self.responder {
            responder(exchange)?;
        }
        self.sent.lock().push(exchange.clone());
        Ok(())
    }

    async fn ack_exchange(&self, exchange: &Exchange) -> SbbResult<()> {
        self.calls.lock().push(ChannelCall::Ack {
            exchange_id: exchange.id(),
        });
        Ok(())
    }

    async fn refuse_exchange_with_error(&self, exchange: &Exchange, cause: &SbbError) -> SbbResult<()> {
        self.calls.lock().push(ChannelCall::Refuse {
            exchange_id: exchange.id(),
            cause: cause.clone(),
        });
        Ok(())
    }
}

/// Candidate endpoint with a scripted outcome
pub struct ScriptedCandidate {
    endpoint: String,
    outcome: CandidateOutcome,
    attempts: AtomicUsize,
}

#[derive(Debug, Clone)]
pub enum CandidateOutcome {
    /// Answer with this JSON body in the out slot
    Respond(String),
    /// Answer with this body in the fault slot
    Fault(String),
    /// Fail the send
    Fail(SbbError),
    /// Never answer
    Hang,
}

impl ScriptedCandidate {
    pub fn new(endpoint: &str, outcome: CandidateOutcome) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            outcome,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateEndpoint for ScriptedCandidate {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_sync(&self, exchange: &mut Exchange, _timeout: Duration) -> SbbResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            CandidateOutcome::Respond(body) => {
                exchange.out_message = Some(sbb_core::exchange::Message::new(body.clone()));
                Ok(())
            }
            CandidateOutcome::Fault(body) => {
                exchange.fault = Some(sbb_core::exchange::Message::new(body.clone()));
                Ok(())
            }
            CandidateOutcome::Fail(error) => Err(error.clone()),
            CandidateOutcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}
