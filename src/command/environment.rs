//! Collaborators shared by every command the engine prepares.

use crate::config::EngineConfig;
use crate::correlation::ExchangeStore;
use crate::error::SbbResult;
use crate::events::{EventPublisher, NotificationSink, NullNotificationSink};
use crate::handler::{HandlerCache, HandlerResolver};
use crate::policy::{PermissivePolicyEnforcer, PolicyEnforcer};
use crate::service::{ServiceDirectory, StaticServiceDirectory};
use crate::transport::DeliveryChannel;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Wiring between commands and the container-owned collaborators
pub struct ExchangeEnvironment {
    pub(crate) channel: Arc<dyn DeliveryChannel>,
    pub(crate) policy: Arc<dyn PolicyEnforcer>,
    pub(crate) notifications: Arc<dyn NotificationSink>,
    pub(crate) handlers: HandlerCache,
    pub(crate) store: Arc<ExchangeStore>,
    pub(crate) directory: Arc<dyn ServiceDirectory>,
    pub(crate) config: EngineConfig,
}

impl ExchangeEnvironment {
    pub fn builder(
        channel: Arc<dyn DeliveryChannel>,
        resolver: Arc<dyn HandlerResolver>,
    ) -> ExchangeEnvironmentBuilder {
        ExchangeEnvironmentBuilder {
            channel,
            resolver,
            policy: None,
            notifications: None,
            store: None,
            directory: None,
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ExchangeStore> {
        &self.store
    }

    pub fn handlers(&self) -> &HandlerCache {
        &self.handlers
    }

    pub fn directory(&self) -> &Arc<dyn ServiceDirectory> {
        &self.directory
    }
}

impl fmt::Debug for ExchangeEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeEnvironment")
            .field("handlers", &self.handlers)
            .field("stored_exchanges", &self.store.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`ExchangeEnvironment`]
pub struct ExchangeEnvironmentBuilder {
    channel: Arc<dyn DeliveryChannel>,
    resolver: Arc<dyn HandlerResolver>,
    policy: Option<Arc<dyn PolicyEnforcer>>,
    notifications: Option<Arc<dyn NotificationSink>>,
    store: Option<Arc<ExchangeStore>>,
    directory: Option<Arc<dyn ServiceDirectory>>,
    config: EngineConfig,
}

impl ExchangeEnvironmentBuilder {
    pub fn with_policy_enforcer(mut self, policy: Arc<dyn PolicyEnforcer>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    pub fn with_store(mut self, store: Arc<ExchangeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_service_directory(mut self, directory: Arc<dyn ServiceDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SbbResult<Arc<ExchangeEnvironment>> {
        self.config.validate()?;

        let notifications = match self.notifications {
            Some(sink) => sink,
            None if self.config.notifications.enabled => {
                Arc::new(EventPublisher::new(self.config.notifications.buffer_size))
            }
            None => Arc::new(NullNotificationSink),
        };

        info!(
            call_timeout_ms = self.config.exchange.call_timeout_ms,
            rethrow_failures = self.config.exchange.rethrow_failures,
            "Exchange environment initialized"
        );

        Ok(Arc::new(ExchangeEnvironment {
            channel: self.channel,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(PermissivePolicyEnforcer)),
            notifications,
            handlers: HandlerCache::new(self.resolver),
            store: self.store.unwrap_or_default(),
            directory: self
                .directory
                .unwrap_or_else(|| Arc::new(StaticServiceDirectory::new())),
            config: self.config,
        }))
    }
}
