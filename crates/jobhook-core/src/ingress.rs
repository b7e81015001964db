//! Classification of inbound event types before they reach the dispatcher.

use crate::event::EventKind;

/// What to do with an inbound event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingress {
    /// Liveness probe sent when a webhook is registered; answered directly.
    Ping,
    /// An event kind the dispatcher handles.
    Supported(EventKind),
    /// Anything else; answered directly without dispatching.
    Unsupported(String),
}

/// Classify a raw event type (the `X-GitHub-Event` header value).
pub fn classify(raw_event_type: &str) -> Ingress {
    if raw_event_type == "ping" {
        return Ingress::Ping;
    }
    match EventKind::parse(raw_event_type) {
        Some(kind) => Ingress::Supported(kind),
        None => Ingress::Unsupported(raw_event_type.to_string()),
    }
}
