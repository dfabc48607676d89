//! Test bed wiring an environment from recording mocks.

#![allow(dead_code)]

use super::mock_participants::{RecordingHandler, RecordingSink, ScriptedPolicyEnforcer};
use super::mock_transport::RecordingChannel;
use sbb_core::command::{Command, CommandFactory, ExchangeEnvironment};
use sbb_core::config::EngineConfig;
use sbb_core::exchange::{CallContext, Exchange, ExchangePattern, Message, Role, Scope};
use sbb_core::handler::StaticHandlerResolver;
use sbb_core::service::{OperationDescriptor, StaticServiceDirectory};
use std::sync::Arc;

pub const SERVICE: &str = "orders";
pub const OPERATION: &str = "place";

pub struct TestBed {
    pub channel: Arc<RecordingChannel>,
    pub resolver: Arc<StaticHandlerResolver>,
    pub policy: Arc<ScriptedPolicyEnforcer>,
    pub sink: Arc<RecordingSink>,
    pub directory: Arc<StaticServiceDirectory>,
    pub env: Arc<ExchangeEnvironment>,
    pub factory: CommandFactory,
}

pub struct TestBedBuilder {
    channel: RecordingChannel,
    policy: ScriptedPolicyEnforcer,
    config: EngineConfig,
    directory: StaticServiceDirectory,
}

impl TestBedBuilder {
    pub fn new() -> Self {
        Self {
            channel: RecordingChannel::new(),
            policy: ScriptedPolicyEnforcer::new(),
            config: EngineConfig::default(),
            directory: StaticServiceDirectory::new(),
        }
    }

    pub fn with_channel(mut self, channel: RecordingChannel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_policy(mut self, policy: ScriptedPolicyEnforcer) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_directory(mut self, directory: StaticServiceDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn build(self) -> TestBed {
        let channel = Arc::new(self.channel);
        let resolver = Arc::new(StaticHandlerResolver::new());
        let policy = Arc::new(self.policy);
        let sink = Arc::new(RecordingSink::new());
        let directory = Arc::new(self.directory);

        let env = ExchangeEnvironment::builder(channel.clone(), resolver.clone())
            .with_policy_enforcer(policy.clone())
            .with_notification_sink(sink.clone())
            .with_service_directory(directory.clone())
            .with_config(self.config)
            .build()
            .expect("test environment should build");

        TestBed {
            channel,
            resolver,
            policy,
            sink,
            directory,
            factory: CommandFactory::new(env.clone()),
            env,
        }
    }
}

impl TestBed {
    pub fn new() -> Self {
        TestBedBuilder::new().build()
    }

    pub fn builder() -> TestBedBuilder {
        TestBedBuilder::new()
    }

    /// Register `handler` for the default service and operation
    pub fn register(&self, role: Role, handler: Arc<RecordingHandler>) {
        self.resolver.register(role, SERVICE, OPERATION, handler);
    }

    pub fn command(
        &self,
        operation: &OperationDescriptor,
        role: Role,
        scope: Scope,
        exchange: Exchange,
    ) -> Command {
        self.factory
            .create(operation)
            .with_role(role)
            .with_scope(scope)
            .with_exchange(exchange)
    }
}

pub fn operation(pattern: ExchangePattern) -> OperationDescriptor {
    OperationDescriptor::new(SERVICE, OPERATION, pattern)
}

pub fn exchange(pattern: ExchangePattern, body: &str) -> Exchange {
    Exchange::new(pattern, SERVICE, OPERATION, CallContext::new()).with_in_message(Message::new(body))
}
