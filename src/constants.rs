//! # System Constants
//!
//! Namespaces, element names, header names and defaults shared by the
//! exchange engine, the fault codec and the notification layer.

use std::time::Duration;

/// Namespace owned by the bus for synthesized documents
pub const BUS_NAMESPACE: &str = "urn:sbb:exchange:2024";

/// Prefix bound to [`BUS_NAMESPACE`] inside fault documents
pub const BUS_PREFIX: &str = "sbb";

/// Fault document element names
pub mod fault {
    pub const FAULT_ELEMENT: &str = "Fault";
    pub const CODE_ELEMENT: &str = "code";
    pub const REASON_ELEMENT: &str = "reason";
    pub const EXCEPTION_ELEMENT: &str = "exception";
    pub const DETAIL_ELEMENT: &str = "detail";

    /// Name of the operation a service advertises for synthesized faults
    pub const DEFAULT_FAULT_OPERATION: &str = "notifyFault";
}

/// Header names the engine reads or writes on messages
pub mod headers {
    pub const AUTHENTICATION_TOKEN: &str = "sbb.auth.token";
    pub const AUTHORIZATION_ROLES: &str = "sbb.auth.roles";
    pub const CORRELATION_ID: &str = "sbb.correlation_id";
    pub const FAULT_CORRELATION_ID: &str = "sbb.fault_correlation_id";
    pub const RELATES_TO: &str = "sbb.relates_to";
}

/// Lifecycle notification names
pub mod events {
    pub const EXCHANGE_NET_IN_POST: &str = "exchange.net_in_post";
    pub const EXCHANGE_NET_OUT_POST: &str = "exchange.net_out_post";
    pub const EXCHANGE_APP_IN: &str = "exchange.app_in";
    pub const EXCHANGE_FINISHED: &str = "exchange.finished";
    pub const EXCHANGE_ABORTED_NET: &str = "exchange.aborted_net";
    pub const EXCHANGE_ABORTED_APP: &str = "exchange.aborted_app";
    pub const EXCHANGE_ABORTED_INTERNAL: &str = "exchange.aborted_internal";
}

/// Engine defaults used when no configuration file is present
pub mod defaults {
    use super::Duration;

    pub const CALL_TIMEOUT: Duration = Duration::from_secs(30);
    pub const RESILIENCE_CALL_TIMEOUT: Duration = Duration::from_secs(10);
    pub const NOTIFICATION_BUFFER_SIZE: usize = 1000;
}
