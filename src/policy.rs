//! # Policy Enforcement
//!
//! The engine consumes an already-resolved [`AgreedPolicy`] and hands it, with
//! the exchange, role and scope, to a [`PolicyEnforcer`]. Parsing policy
//! documents is not part of this crate.

use crate::constants::headers;
use crate::error::{PolicyViolation, PolicyViolationKind};
use crate::exchange::{Exchange, Message, Role, Scope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Negotiated rules both parties committed to for an operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreedPolicy {
    pub policy_id: String,
    /// Requests must carry an authentication token
    #[serde(default)]
    pub require_authentication: bool,
    /// Roles the caller must present; empty means no authorization check
    #[serde(default)]
    pub required_roles: BTreeSet<String>,
    /// Transport assertions agreed for the operation, passed through untouched
    #[serde(default)]
    pub transport_assertions: Vec<String>,
}

impl AgreedPolicy {
    pub fn new(policy_id: impl Into<String>) -> Self {
        Self {
            policy_id: policy_id.into(),
            ..Default::default()
        }
    }

    pub fn requiring_authentication(mut self) -> Self {
        self.require_authentication = true;
        self
    }

    pub fn requiring_role(mut self, role: impl Into<String>) -> Self {
        self.required_roles.insert(role.into());
        self
    }
}

/// Applies agreed-policy rules to an exchange leg
#[async_trait]
pub trait PolicyEnforcer: Send + Sync {
    async fn apply_policy(
        &self,
        exchange: &mut Exchange,
        role: Role,
        policy: Option<&AgreedPolicy>,
        scope: Scope,
    ) -> Result<(), PolicyViolation>;
}

/// Enforcer that accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePolicyEnforcer;

#[async_trait]
impl PolicyEnforcer for PermissivePolicyEnforcer {
    async fn apply_policy(
        &self,
        _exchange: &mut Exchange,
        _role: Role,
        _policy: Option<&AgreedPolicy>,
        _scope: Scope,
    ) -> Result<(), PolicyViolation> {
        Ok(())
    }
}

/// Enforcer checking the authentication and authorization assertions of the
/// agreed policy against request headers on the provider side
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPolicyEnforcer;

impl HeaderPolicyEnforcer {
    fn check_request(message: &Message, policy: &AgreedPolicy) -> Result<(), PolicyViolation> {
        if policy.require_authentication
            && message
                .header(headers::AUTHENTICATION_TOKEN)
                .map_or(true, str::is_empty)
        {
            return Err(PolicyViolation::new(
                PolicyViolationKind::Authentication,
                format!("Policy {} requires an authentication token", policy.policy_id),
            ));
        }

        if !policy.required_roles.is_empty() {
            let presented: BTreeSet<&str> = message
                .header(headers::AUTHORIZATION_ROLES)
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .collect();

            if let Some(missing) = policy
                .required_roles
                .iter()
                .find(|role| !presented.contains(role.as_str()))
            {
                return Err(PolicyViolation::new(
                    PolicyViolationKind::Authorization,
                    format!("Caller lacks role '{missing}' required by {}", policy.policy_id),
                ));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PolicyEnforcer for HeaderPolicyEnforcer {
    async fn apply_policy(
        &self,
        exchange: &mut Exchange,
        role: Role,
        policy: Option<&AgreedPolicy>,
        scope: Scope,
    ) -> Result<(), PolicyViolation> {
        let Some(policy) = policy else {
            return Ok(());
        };

        // Only the provider side of the request leg verifies credentials
        if role != Role::Receiver || scope != Scope::Request {
            debug!(
                exchange_id = %exchange.id(),
                role = %role,
                scope = %scope,
                "No header assertions to check for this leg"
            );
            return Ok(());
        }

        match exchange.in_message.as_ref() {
            Some(message) => Self::check_request(message, policy),
            None => Err(PolicyViolation::new(
                PolicyViolationKind::Other,
                "Request leg carries no message to check",
            )),
        }
    }
}
