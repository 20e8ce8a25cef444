//! Lenient JSON request bodies.
//!
//! A missing, empty or malformed body reads as `{}`; handlers then report the
//! missing fields themselves. Field values are read as text so that `42`,
//! `42.5` and `"42.50"` all reach the same exact decimal parser.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde_json::{Map, Value};
use std::convert::Infallible;

/// A JSON object body, empty when the request had none.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.unwrap_or_default();
        Ok(Self::parse(&bytes))
    }
}

impl JsonBody {
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// A field as text. `null` and `""` count as absent.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The first present field among `keys`.
    #[must_use]
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.text(key))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_reads_as_empty() {
        assert!(JsonBody::parse(b"").0.is_empty());
        assert!(JsonBody::parse(b"not json").0.is_empty());
        assert!(JsonBody::parse(b"[1,2]").0.is_empty());
    }

    #[test]
    fn fields_as_text() {
        let body = JsonBody::parse(br#"{"a": 42, "b": "42.50", "c": null, "d": "", "e": true}"#);
        assert_eq!(body.text("a").as_deref(), Some("42"));
        assert_eq!(body.text("b").as_deref(), Some("42.50"));
        assert_eq!(body.text("c"), None);
        assert_eq!(body.text("d"), None);
        assert_eq!(body.text("e").as_deref(), Some("true"));
        assert_eq!(body.text("missing"), None);
        assert_eq!(body.first_text(&["c", "d", "b"]).as_deref(), Some("42.50"));
    }
}
