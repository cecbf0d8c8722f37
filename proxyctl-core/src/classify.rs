//! Failure-response classification.
//!
//! The proxy has no single "not found" contract: over time it has answered
//! with several unrelated body shapes, under several status codes. Each shape
//! is one [`NotFoundShape`] matched structurally against the parsed body and
//! tried in order. Transient failures are limited to transport errors and
//! request timeouts; everything else is permanent.

use serde_json::Value;

use crate::error::{ErrorClass, ProxyError};

/// Statuses that mean "the request timed out", not "the request was wrong".
pub const TRANSIENT_STATUSES: &[u16] = &[408, 504];

const MAX_MESSAGE_LEN: usize = 512;

/// One recognised way of saying "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundShape {
    /// Flat message containing "model not found".
    ModelNotFoundMessage,
    /// `error.message.error` containing "Model with id=" and "not found in db".
    ModelMissingFromDb,
    /// `detail.error` containing "not found on litellm proxy".
    MissingOnProxy,
    /// Flat message containing "LLM Model List not loaded in"; the proxy has
    /// not finished loading its router, which callers treat as absence.
    ModelListNotLoaded,
    /// HTTP 404 whose structured error names a missing entity, e.g.
    /// `{"detail":{"error":"User u-1 not found"}}`. A bare route miss
    /// (`{"detail":"Not Found"}`) does not qualify.
    EntityMissing404,
}

impl NotFoundShape {
    pub const ALL: [NotFoundShape; 5] = [
        NotFoundShape::ModelNotFoundMessage,
        NotFoundShape::ModelMissingFromDb,
        NotFoundShape::MissingOnProxy,
        NotFoundShape::ModelListNotLoaded,
        NotFoundShape::EntityMissing404,
    ];

    pub fn matches(self, status: u16, body: &FailureBody<'_>) -> bool {
        match self {
            NotFoundShape::ModelNotFoundMessage => body
                .flat_messages()
                .iter()
                .any(|m| m.to_ascii_lowercase().contains("model not found")),
            NotFoundShape::ModelMissingFromDb => body
                .pointer_str("/error/message/error")
                .is_some_and(|m| m.contains("Model with id=") && m.contains("not found in db")),
            NotFoundShape::MissingOnProxy => body
                .pointer_str("/detail/error")
                .is_some_and(|m| m.contains("not found on litellm proxy")),
            NotFoundShape::ModelListNotLoaded => body
                .flat_messages()
                .iter()
                .any(|m| m.contains("LLM Model List not loaded in")),
            NotFoundShape::EntityMissing404 => {
                status == 404
                    && body
                        .entity_messages()
                        .any(|m| m.to_ascii_lowercase().contains("not found"))
            }
        }
    }
}

/// A failure body, parsed as JSON when possible.
#[derive(Debug)]
pub struct FailureBody<'a> {
    raw: &'a str,
    json: Option<Value>,
}

impl<'a> FailureBody<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            json: serde_json::from_str(raw).ok(),
        }
    }

    fn pointer_str(&self, pointer: &str) -> Option<&str> {
        self.json.as_ref()?.pointer(pointer)?.as_str()
    }

    /// Messages nested inside an error object. A top-level `detail` string
    /// is left out; that is where the web framework reports unknown routes.
    fn entity_messages(&self) -> impl Iterator<Item = &str> {
        ["/detail/error", "/detail/message", "/error/message", "/message"]
            .into_iter()
            .filter_map(move |p| self.pointer_str(p))
    }

    /// Human-readable message strings at the places the proxy puts them. A
    /// body that is not JSON counts as one message.
    pub fn flat_messages(&self) -> Vec<&str> {
        let Some(json) = self.json.as_ref() else {
            let trimmed = self.raw.trim();
            return if trimmed.is_empty() {
                vec![]
            } else {
                vec![trimmed]
            };
        };
        [
            "/message",
            "/error",
            "/error/message",
            "/detail",
            "/detail/error",
            "/detail/message",
        ]
        .iter()
        .filter_map(|p| json.pointer(p).and_then(Value::as_str))
        .collect()
    }

    /// Best single message for error display.
    pub fn message(&self) -> String {
        let msg = match self.flat_messages().first() {
            Some(m) => (*m).to_string(),
            None => self
                .json
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| self.raw.trim().to_string()),
        };
        truncate(msg)
    }
}

/// The first not-found shape the response matches.
pub fn detect_not_found(status: u16, body: &str) -> Option<NotFoundShape> {
    let parsed = FailureBody::parse(body);
    NotFoundShape::ALL
        .into_iter()
        .find(|shape| shape.matches(status, &parsed))
}

/// Classify a non-2xx response.
pub fn classify(status: u16, body: &str) -> ErrorClass {
    if detect_not_found(status, body).is_some() {
        ErrorClass::NotFound
    } else if TRANSIENT_STATUSES.contains(&status) {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Build the classified error for a non-2xx response.
pub fn error_from_response(status: u16, body: &str) -> ProxyError {
    let message = {
        let m = FailureBody::parse(body).message();
        if m.is_empty() {
            format!("HTTP {status} with empty body")
        } else {
            m
        }
    };
    match classify(status, body) {
        ErrorClass::NotFound => ProxyError::NotFound { status, message },
        ErrorClass::Transient => ProxyError::Timeout { status, message },
        ErrorClass::Permanent => ProxyError::Rejected { status, message },
    }
}

fn truncate(mut s: String) -> String {
    if s.len() > MAX_MESSAGE_LEN {
        let mut end = MAX_MESSAGE_LEN;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s.truncate(end);
        s.push('…');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_on_404_is_permanent() {
        assert_eq!(classify(404, ""), ErrorClass::Permanent);
        let err = error_from_response(404, "");
        assert!(err.to_string().contains("empty body"));
    }

    #[test]
    fn route_miss_is_not_an_entity_miss() {
        let body = FailureBody::parse(r#"{"detail":"Not Found"}"#);
        assert!(!NotFoundShape::EntityMissing404.matches(404, &body));
        let body = FailureBody::parse(r#"{"detail":{"error":"Team t-1 not found"}}"#);
        assert!(NotFoundShape::EntityMissing404.matches(404, &body));
        assert!(!NotFoundShape::EntityMissing404.matches(400, &body));
    }

    #[test]
    fn non_json_body_is_one_flat_message() {
        let body = FailureBody::parse("  upstream: model not found  ");
        assert_eq!(body.flat_messages(), vec!["upstream: model not found"]);
        assert_eq!(classify(500, "  upstream: model not found  "), ErrorClass::NotFound);
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(2000);
        let err = error_from_response(400, &long);
        let ProxyError::Rejected { message, .. } = err else {
            panic!("expected rejected");
        };
        assert!(message.chars().count() <= MAX_MESSAGE_LEN + 1);
    }

    #[test]
    fn detail_string_is_a_flat_message() {
        let body = r#"{"detail":"Authentication Error, invalid key"}"#;
        assert_eq!(classify(401, body), ErrorClass::Permanent);
        let err = error_from_response(401, body);
        assert!(err.to_string().contains("invalid key"));
    }
}
