//! Failover across a ranked list of candidate endpoints.

use super::cursor::{FailoverCursor, FailoverState};
use crate::config::ResilienceConfig;
use crate::error::{FaultKind, SbbError, SbbResult};
use crate::exchange::{CallContext, Exchange, Message};
use crate::fault::FaultDocument;
use crate::policy::AgreedPolicy;
use crate::service::OperationDescriptor;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Transport-specific exchange factory for one endpoint
#[async_trait]
pub trait CandidateEndpoint: Send + Sync {
    /// Address used as the exchange target
    fn endpoint(&self) -> &str;

    fn create_exchange(
        &self,
        operation: &OperationDescriptor,
        context: CallContext,
    ) -> SbbResult<Exchange> {
        Ok(Exchange::new(
            operation.pattern,
            operation.service_id.clone(),
            operation.name.clone(),
            context,
        )
        .with_target(self.endpoint()))
    }

    /// Send the request and wait for the response leg
    async fn send_sync(&self, exchange: &mut Exchange, timeout: Duration) -> SbbResult<()>;
}

/// One failed attempt, kept for the aggregated error
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub endpoint: String,
    pub error: SbbError,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Orchestrates one outbound call over an immutable candidate list
#[derive(Clone)]
pub struct ResilienceController {
    candidates: Arc<[Arc<dyn CandidateEndpoint>]>,
    call_timeout: Duration,
    policy: Option<AgreedPolicy>,
}

impl ResilienceController {
    pub fn new(candidates: Vec<Arc<dyn CandidateEndpoint>>, config: &ResilienceConfig) -> Self {
        info!(
            candidates = candidates.len(),
            call_timeout_ms = config.call_timeout_ms,
            "Resilience controller initialized"
        );
        Self {
            candidates: candidates.into(),
            call_timeout: config.call_timeout(),
            policy: None,
        }
    }

    /// Policy stamped on every exchange created by this controller
    pub fn with_policy(mut self, policy: AgreedPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Fixed timeout applied to every attempt
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Cursor for a new logical call
    pub fn begin_call(&self) -> FailoverCursor {
        FailoverCursor::new(self.candidates.len())
    }

    /// Build an exchange against the next untried candidate
    pub fn create_in_out_exchange(
        &self,
        cursor: &mut FailoverCursor,
        operation: &OperationDescriptor,
    ) -> SbbResult<Option<(Exchange, Arc<dyn CandidateEndpoint>)>> {
        let Some(index) = cursor.advance() else {
            return Ok(None);
        };
        let candidate = self.candidates.get(index).cloned().ok_or_else(|| {
            SbbError::configuration(format!(
                "Cursor index {index} outside of {} candidates",
                self.candidates.len()
            ))
        })?;

        let mut context = CallContext::new();
        context.agreed_policy = self.policy.clone();
        let exchange = candidate.create_exchange(operation, context)?;

        debug!(
            index = index,
            endpoint = candidate.endpoint(),
            exchange_id = %exchange.id(),
            "Created exchange for candidate"
        );
        Ok(Some((exchange, candidate)))
    }

    /// Aggregate every failed attempt into one remote failure
    pub fn handle_failure(&self, operation: &str, failures: &[CandidateFailure]) -> SbbError {
        let kind = match failures.first() {
            Some(first)
                if failures
                    .iter()
                    .all(|f| f.error.fault_kind() == first.error.fault_kind()) =>
            {
                first.error.fault_kind()
            }
            _ => FaultKind::Generic,
        };
        let attempts: Vec<String> = failures.iter().map(ToString::to_string).collect();

        error!(
            operation = %operation,
            attempts = failures.len(),
            "All candidate endpoints failed"
        );

        SbbError::remote(
            kind,
            format!(
                "All {} candidate(s) failed for {operation}: [{}]",
                failures.len(),
                attempts.join("; ")
            ),
        )
    }

    /// Map the response slots into the expected payload type
    pub fn postprocess_message<T: DeserializeOwned>(
        &self,
        operation: &str,
        out: Option<&Message>,
        fault: Option<&Message>,
    ) -> SbbResult<T> {
        if let Some(fault) = fault {
            let message = FaultDocument::parse(&fault.body)
                .map(|document| document.reason)
                .unwrap_or_else(|| fault.body.clone());
            return Err(SbbError::ProviderFault {
                operation: operation.to_string(),
                message,
            });
        }

        let out = out.ok_or_else(|| {
            SbbError::infrastructure(format!("Empty response for {operation}"))
        })?;
        Ok(serde_json::from_str(&out.body)?)
    }

    /// Invoke an IN_OUT operation, failing over until a candidate answers
    #[instrument(skip(self, request), fields(service_id = %operation.service_id, operation = %operation.name))]
    pub async fn invoke_service_operation<Req, Resp>(
        &self,
        operation: &OperationDescriptor,
        request: &Req,
    ) -> SbbResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        if self.candidates.is_empty() {
            return Err(SbbError::configuration(format!(
                "No resilience factory available for {}/{}",
                operation.service_id, operation.name
            )));
        }

        let payload = Message::from_json(request)?;
        let mut cursor = self.begin_call();
        let mut failures = Vec::new();

        while let Some((exchange, candidate)) = self.create_in_out_exchange(&mut cursor, operation)? {
            let exchange = exchange.with_in_message(payload.clone());
            match self.attempt(candidate.as_ref(), exchange).await {
                Ok(exchange) => {
                    cursor.succeed();
                    info!(
                        endpoint = candidate.endpoint(),
                        attempts = cursor.attempts(),
                        "Candidate answered"
                    );
                    // Provider faults are answers, not reasons to fail over
                    return self.postprocess_message(
                        &operation.name,
                        exchange.out_message.as_ref(),
                        exchange.fault.as_ref(),
                    );
                }
                Err(error) => {
                    warn!(
                        endpoint = candidate.endpoint(),
                        error = %error,
                        "Candidate failed, trying next"
                    );
                    failures.push(CandidateFailure {
                        endpoint: candidate.endpoint().to_string(),
                        error,
                    });
                }
            }
        }

        debug_assert_eq!(cursor.state(), FailoverState::Exhausted);
        Err(self.handle_failure(&operation.name, &failures))
    }

    async fn attempt(
        &self,
        candidate: &dyn CandidateEndpoint,
        mut exchange: Exchange,
    ) -> SbbResult<Exchange> {
        let timeout = self.call_timeout;
        let outcome = tokio::time::timeout(timeout, candidate.send_sync(&mut exchange, timeout)).await;
        match outcome {
            Ok(Ok(())) if exchange.is_error() => Err(exchange.failure_error()),
            Ok(Ok(())) => Ok(exchange),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(SbbError::infrastructure(format!(
                "{} did not answer within {}ms",
                candidate.endpoint(),
                timeout.as_millis()
            ))),
        }
    }
}

impl fmt::Debug for ResilienceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let endpoints: Vec<&str> = self.candidates.iter().map(|c| c.endpoint()).collect();
        f.debug_struct("ResilienceController")
            .field("candidates", &endpoints)
            .field("call_timeout", &self.call_timeout)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangePattern;

    struct NeverCalled;

    #[async_trait]
    impl CandidateEndpoint for NeverCalled {
        fn endpoint(&self) -> &str {
            "never"
        }

        async fn send_sync(&self, _exchange: &mut Exchange, _timeout: Duration) -> SbbResult<()> {
            Err(SbbError::infrastructure("unexpected call"))
        }
    }

    fn operation() -> OperationDescriptor {
        OperationDescriptor::new("inventory", "lookup", ExchangePattern::InOut)
    }

    #[test]
    fn test_create_exchange_addresses_candidate() {
        let controller = ResilienceController::new(
            vec![Arc::new(NeverCalled)],
            &ResilienceConfig::default(),
        )
        .with_policy(AgreedPolicy::new("p1"));
        let mut cursor = controller.begin_call();

        let (exchange, candidate) = controller
            .create_in_out_exchange(&mut cursor, &operation())
            .unwrap()
            .unwrap();
        assert_eq!(exchange.target.as_deref(), Some("never"));
        assert_eq!(exchange.operation, "lookup");
        assert_eq!(exchange.context.agreed_policy().unwrap().policy_id, "p1");
        assert_eq!(candidate.endpoint(), "never");

        assert!(controller
            .create_in_out_exchange(&mut cursor, &operation())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_postprocess_fault_is_provider_fault() {
        let controller = ResilienceController::new(vec![], &ResilienceConfig::default());
        let fault = Message::new(
            FaultDocument::new(FaultKind::Generic, "unknown sku").to_xml(),
        );

        let result: SbbResult<serde_json::Value> =
            controller.postprocess_message("lookup", None, Some(&fault));
        assert_eq!(
            result.unwrap_err(),
            SbbError::ProviderFault {
                operation: "lookup".to_string(),
                message: "unknown sku".to_string(),
            }
        );
    }

    #[test]
    fn test_handle_failure_keeps_common_kind() {
        let controller = ResilienceController::new(vec![], &ResilienceConfig::default());
        let failures = vec![
            CandidateFailure {
                endpoint: "a".to_string(),
                error: SbbError::infrastructure("refused"),
            },
            CandidateFailure {
                endpoint: "b".to_string(),
                error: SbbError::infrastructure("reset"),
            },
        ];

        match controller.handle_failure("lookup", &failures) {
            SbbError::Remote { kind, message } => {
                assert_eq!(kind, FaultKind::Messaging);
                assert!(message.contains("a: Infrastructure failure: refused"));
                assert!(message.contains("b: Infrastructure failure: reset"));
            }
            other => panic!("Expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_candidates_is_configuration_error() {
        let controller = ResilienceController::new(vec![], &ResilienceConfig::default());
        let result: SbbResult<serde_json::Value> = controller
            .invoke_service_operation(&operation(), &serde_json::json!({"sku": 1}))
            .await;

        assert!(matches!(result, Err(SbbError::Configuration(_))));
    }
}
