//! # Fault Documents
//!
//! Synthesizes and classifies the bus-namespaced `Fault` documents used to
//! carry failures back to a sender when no ordinary response channel exists.
//!
//! ```text
//! <sbb:Fault xmlns:sbb="urn:sbb:exchange:2024">
//!   <sbb:code>authorization</sbb:code>
//!   <sbb:reason>caller lacks role 'billing'</sbb:reason>
//!   <sbb:exception>AuthorizationException</sbb:exception>
//!   <sbb:detail>...</sbb:detail>
//! </sbb:Fault>
//! ```
//!
//! Classification reads the `code` element. Documents written by older
//! participants carry no code; for those the exception type name is matched
//! against the known legacy names.

use crate::constants::{fault as names, BUS_NAMESPACE, BUS_PREFIX};
use crate::error::{FaultKind, SbbError};
use tracing::debug;

/// Parsed content of a fault document
#[derive(Debug, Clone, PartialEq)]
pub struct FaultDocument {
    pub kind: FaultKind,
    pub reason: String,
    pub exception: String,
    pub detail: Option<String>,
}

impl FaultDocument {
    pub fn new(kind: FaultKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            exception: kind.legacy_exception_name().to_string(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Serialize into the bus fault element
    pub fn to_xml(&self) -> String {
        let mut xml = format!(
            "<{p}:{f} xmlns:{p}=\"{ns}\">",
            p = BUS_PREFIX,
            f = names::FAULT_ELEMENT,
            ns = BUS_NAMESPACE
        );
        push_element(&mut xml, names::CODE_ELEMENT, self.kind.code());
        push_element(&mut xml, names::REASON_ELEMENT, &self.reason);
        push_element(&mut xml, names::EXCEPTION_ELEMENT, &self.exception);
        if let Some(detail) = &self.detail {
            push_element(&mut xml, names::DETAIL_ELEMENT, detail);
        }
        xml.push_str(&format!("</{}:{}>", BUS_PREFIX, names::FAULT_ELEMENT));
        xml
    }

    /// Parse a fault document; `None` when the body is not a bus fault
    pub fn parse(body: &str) -> Option<Self> {
        if !is_default_fault(body) {
            return None;
        }

        let reason = element_text(body, names::REASON_ELEMENT).unwrap_or_default();
        let exception = element_text(body, names::EXCEPTION_ELEMENT).unwrap_or_default();
        let detail = element_text(body, names::DETAIL_ELEMENT);

        let kind = match element_text(body, names::CODE_ELEMENT).map(|code| code.parse()) {
            Some(Ok(kind)) => kind,
            _ => {
                debug!(exception = %exception, "Fault without code element, using legacy exception name");
                legacy_kind(&exception).unwrap_or_else(|| legacy_kind(body).unwrap_or(FaultKind::Generic))
            }
        };

        Some(Self {
            kind,
            reason,
            exception,
            detail,
        })
    }

    /// Rebuild the domain error carried by this fault
    pub fn to_error(&self) -> SbbError {
        SbbError::remote(self.kind, self.reason.clone())
    }
}

/// Produce the fault document for an error
pub fn generate_fault_message(error: &SbbError) -> String {
    let detail = match error {
        SbbError::Participant {
            detail: Some(detail),
            ..
        } => detail.clone(),
        other => format!("{other:?}"),
    };

    FaultDocument::new(error.fault_kind(), error.reason())
        .with_detail(detail)
        .to_xml()
}

/// Whether a payload is a synthesized default-fault document
pub fn is_default_fault(body: &str) -> bool {
    body.contains(&format!("<{}:{}", BUS_PREFIX, names::FAULT_ELEMENT)) && body.contains(BUS_NAMESPACE)
}

/// Classify a payload back into a domain error, if it is a fault document
pub fn classify_fault(body: &str) -> Option<SbbError> {
    FaultDocument::parse(body).map(|document| document.to_error())
}

/// Classify a remote-side failure payload
///
/// Payloads that are not bus faults still originate on the remote side and
/// classify as generic remote failures carrying the raw text.
pub fn classify_remote_fault(body: &str) -> SbbError {
    classify_fault(body).unwrap_or_else(|| {
        let kind = legacy_kind(body).unwrap_or(FaultKind::Generic);
        SbbError::remote(kind, body.to_string())
    })
}

fn legacy_kind(text: &str) -> Option<FaultKind> {
    [
        FaultKind::Authentication,
        FaultKind::Authorization,
        FaultKind::Messaging,
        FaultKind::Generic,
    ]
    .into_iter()
    .find(|kind| text.contains(kind.legacy_exception_name()))
}

fn push_element(xml: &mut String, name: &str, text: &str) {
    xml.push_str(&format!(
        "<{p}:{n}>{t}</{p}:{n}>",
        p = BUS_PREFIX,
        n = name,
        t = escape(text)
    ));
}

fn element_text(body: &str, name: &str) -> Option<String> {
    let open = format!("<{BUS_PREFIX}:{name}>");
    let close = format!("</{BUS_PREFIX}:{name}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(unescape(&body[start..end]))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}
