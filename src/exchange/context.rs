use crate::policy::AgreedPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// How an earlier message relates to the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Reply,
    Fault,
    Callback,
}

/// Reference to a prior message in the relation chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub message_id: Uuid,
    pub relation: RelationType,
    pub recorded_at: DateTime<Utc>,
}

/// Address a sender advertises for replies and faults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointReference {
    pub address: String,
    pub service_id: String,
    pub correlation_id: Option<String>,
    /// Correlation id to use for faults; the regular one applies when absent
    pub fault_correlation_id: Option<String>,
    #[serde(default)]
    pub reference_parameters: BTreeMap<String, String>,
}

impl EndpointReference {
    pub fn new(address: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_fault_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.fault_correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_reference_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.reference_parameters.insert(name.into(), value.into());
        self
    }
}

/// Per-exchange metadata
///
/// Created once per exchange and dropped with it. The relation chain is
/// append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallContext {
    message_id: Uuid,
    created_at: DateTime<Utc>,
    relations: Vec<Relation>,
    pub correlation_id: Option<String>,
    pub fault_correlation_id: Option<String>,
    pub related_at: Option<DateTime<Utc>>,
    pub agreed_policy: Option<AgreedPolicy>,
    pub reply_to: Option<EndpointReference>,
    #[serde(default)]
    pub reference_parameters: BTreeMap<String, String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            created_at: Utc::now(),
            relations: Vec::new(),
            correlation_id: None,
            fault_correlation_id: None,
            related_at: None,
            agreed_policy: None,
            reply_to: None,
            reference_parameters: BTreeMap::new(),
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_policy(mut self, policy: AgreedPolicy) -> Self {
        self.agreed_policy = Some(policy);
        self
    }

    pub fn with_reply_to(mut self, reply_to: EndpointReference) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn agreed_policy(&self) -> Option<&AgreedPolicy> {
        self.agreed_policy.as_ref()
    }

    /// Append a prior message to the relation chain
    pub fn relate_to(&mut self, message_id: Uuid, relation: RelationType) {
        let recorded_at = Utc::now();
        self.related_at = Some(recorded_at);
        self.relations.push(Relation {
            message_id,
            relation,
            recorded_at,
        });
    }

    /// Correlation id to stamp on a fault sent back for this context
    pub fn effective_fault_correlation_id(&self) -> Option<&str> {
        self.fault_correlation_id
            .as_deref()
            .or(self.correlation_id.as_deref())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_chain_is_ordered() {
        let mut context = CallContext::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        context.relate_to(first, RelationType::Reply);
        context.relate_to(second, RelationType::Fault);

        let ids: Vec<Uuid> = context.relations().iter().map(|r| r.message_id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(context.related_at.is_some());
    }

    #[test]
    fn test_fault_correlation_fallback() {
        let context = CallContext::new().with_correlation_id("corr-1");
        assert_eq!(context.effective_fault_correlation_id(), Some("corr-1"));

        let mut context = context;
        context.fault_correlation_id = Some("fault-1".to_string());
        assert_eq!(context.effective_fault_correlation_id(), Some("fault-1"));
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(CallContext::new().message_id(), CallContext::new().message_id());
    }
}
