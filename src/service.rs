//! # Service Descriptions
//!
//! Resolved service descriptions as far as the engine needs them: the
//! declared pattern of each operation, whether it has a callback, and the
//! operation a service advertises for synthesized faults.

use crate::exchange::ExchangePattern;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// A single operation of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub service_id: String,
    pub name: String,
    pub pattern: ExchangePattern,
    /// Operation on the sender that receives asynchronous callbacks
    #[serde(default)]
    pub callback_operation: Option<String>,
}

impl OperationDescriptor {
    pub fn new(
        service_id: impl Into<String>,
        name: impl Into<String>,
        pattern: ExchangePattern,
    ) -> Self {
        Self {
            service_id: service_id.into(),
            name: name.into(),
            pattern,
            callback_operation: None,
        }
    }

    pub fn with_callback(mut self, callback_operation: impl Into<String>) -> Self {
        self.callback_operation = Some(callback_operation.into());
        self
    }

    pub fn has_callback(&self) -> bool {
        self.callback_operation.is_some()
    }
}

/// Compound description of a service: its operations and fault channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub service_id: String,
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
    /// Operation used to carry synthesized faults back to this service
    #[serde(default)]
    pub default_fault_operation: Option<String>,
}

impl ServiceDescription {
    pub fn new(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            ..Default::default()
        }
    }

    pub fn with_operation(mut self, operation: OperationDescriptor) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn with_default_fault_operation(mut self, operation: impl Into<String>) -> Self {
        self.default_fault_operation = Some(operation.into());
        self
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Source of resolved service descriptions
pub trait ServiceDirectory: Send + Sync {
    fn describe(&self, service_id: &str) -> Option<ServiceDescription>;

    fn default_fault_operation(&self, service_id: &str) -> Option<String> {
        self.describe(service_id)
            .and_then(|description| description.default_fault_operation)
    }
}

/// In-memory directory
#[derive(Debug, Default)]
pub struct StaticServiceDirectory {
    services: RwLock<HashMap<String, ServiceDescription>>,
}

impl StaticServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, description: ServiceDescription) {
        info!(
            service_id = %description.service_id,
            operations = description.operations.len(),
            "Registering service description"
        );
        self.services
            .write()
            .insert(description.service_id.clone(), description);
    }
}

impl ServiceDirectory for StaticServiceDirectory {
    fn describe(&self, service_id: &str) -> Option<ServiceDescription> {
        self.services.read().get(service_id).cloned()
    }
}
