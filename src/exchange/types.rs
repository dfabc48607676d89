use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the local participant initiated or is being invoked for this leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Local participant initiated the exchange
    Sender,
    /// Local participant is being invoked
    Receiver,
}

/// Which half of the exchange is being processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Request,
    Response,
}

/// Exchange status, owned by the exchange and set by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    #[default]
    Active,
    Done,
    /// Set by the transport; terminal for the current leg
    Error,
}

/// Message exchange pattern declared by the operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangePattern {
    /// Fire-and-forget
    OneWay,
    /// Request/response
    InOut,
    /// One-way with a callback leg for faults
    RobustOneWay,
}

/// Participant role reported in lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Consumer,
    Provider,
}

impl From<Role> for ParticipantRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Sender => Self::Consumer,
            Role::Receiver => Self::Provider,
        }
    }
}

impl ExchangeStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl ExchangePattern {
    /// Whether the pattern carries a response leg back to the sender
    pub fn expects_response(&self) -> bool {
        matches!(self, Self::InOut)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => write!(f, "sender"),
            Self::Receiver => write!(f, "receiver"),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "request"),
            Self::Response => write!(f, "response"),
        }
    }
}

impl fmt::Display for ExchangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for ExchangePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneWay => write!(f, "one_way"),
            Self::InOut => write!(f, "in_out"),
            Self::RobustOneWay => write!(f, "robust_one_way"),
        }
    }
}

impl std::str::FromStr for ExchangePattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_way" => Ok(Self::OneWay),
            "in_out" => Ok(Self::InOut),
            "robust_one_way" => Ok(Self::RobustOneWay),
            _ => Err(format!("Invalid exchange pattern: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_role_from_role() {
        assert_eq!(ParticipantRole::from(Role::Sender), ParticipantRole::Consumer);
        assert_eq!(ParticipantRole::from(Role::Receiver), ParticipantRole::Provider);
    }

    #[test]
    fn test_pattern_string_conversion() {
        assert_eq!(ExchangePattern::RobustOneWay.to_string(), "robust_one_way");
        assert_eq!(
            "in_out".parse::<ExchangePattern>().unwrap(),
            ExchangePattern::InOut
        );
        assert!("out_in".parse::<ExchangePattern>().is_err());
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ExchangeStatus::Error).unwrap();
        assert_eq!(json, "\"error\"");

        let parsed: ExchangeStatus = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_error());
    }
}
