//! Wire form of a statement and of the service's answer to it.

use serde_json::{Map, Value as JsonValue};

use super::{Method, StatementCore};
use crate::error::{LinkError, Result};

/// A statement resolved into verb, path, query string and body, relative
/// to the site's API base (`<url>/api/v1`).
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
}

impl StatementRequest {
    pub fn from_core(core: &StatementCore) -> Self {
        let mut path = format!("/resources/{}", core.resource().id());
        if let Some(view) = core.view() {
            path.push_str("/views/");
            path.push_str(view);
        }

        let query = core
            .query_params()
            .iter()
            .map(|(name, value)| (name.clone(), query_value(value)))
            .collect();

        let body = match core.method() {
            Method::Post | Method::Put => Some(JsonValue::Object(
                core.body()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
            Method::Get | Method::Delete => None,
        };

        Self {
            method: core.method(),
            path,
            query,
            body,
        }
    }
}

/// Render a parameter value for the query string. Strings are sent as-is,
/// everything else as JSON text.
pub fn query_value(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Raw rows and cursor extracted from a successful response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponsePayload {
    pub rows: Vec<Map<String, JsonValue>>,
    pub page_state: Option<String>,
}

/// GET answers carry `entities` plus an optional `metadata.pageState`;
/// every other verb answers with the single affected entity.
pub fn extract_payload(method: Method, body: JsonValue) -> Result<ResponsePayload> {
    match method {
        Method::Get => {
            let JsonValue::Object(mut envelope) = body else {
                return Err(LinkError::execution("read response is not a JSON object"));
            };
            let page_state = envelope
                .get("metadata")
                .and_then(|m| m.get("pageState"))
                .and_then(JsonValue::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            let rows = match envelope.remove("entities") {
                Some(JsonValue::Array(entities)) => entities
                    .into_iter()
                    .map(|entity| match entity {
                        JsonValue::Object(row) => Ok(row),
                        other => Err(LinkError::execution(format!(
                            "entity is not a JSON object: {}",
                            other
                        ))),
                    })
                    .collect::<Result<Vec<_>>>()?,
                Some(JsonValue::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(LinkError::execution(format!(
                        "'entities' is not a list: {}",
                        other
                    )))
                }
            };
            Ok(ResponsePayload { rows, page_state })
        }
        Method::Post | Method::Put | Method::Delete => match body {
            JsonValue::Object(row) if row.is_empty() => Ok(ResponsePayload::default()),
            JsonValue::Object(row) => Ok(ResponsePayload {
                rows: vec![row],
                page_state: None,
            }),
            JsonValue::Null => Ok(ResponsePayload::default()),
            other => Err(LinkError::execution(format!(
                "response is not a JSON object: {}",
                other
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_value_rendering() {
        assert_eq!(query_value(&json!("A")), "A");
        assert_eq!(query_value(&json!(50)), "50");
        assert_eq!(query_value(&json!(true)), "true");
        assert_eq!(query_value(&json!(["a", "b"])), "[\"a\",\"b\"]");
    }

    #[test]
    fn test_extract_read_payload() {
        let body = json!({
            "entities": [{"firstName": "Ann"}, {"firstName": "Bob"}],
            "metadata": {"pageState": "abc"}
        });
        let payload = extract_payload(Method::Get, body).unwrap();
        assert_eq!(payload.rows.len(), 2);
        assert_eq!(payload.page_state.as_deref(), Some("abc"));
    }

    #[test]
    fn test_extract_read_payload_last_page() {
        let body = json!({"entities": [], "metadata": {"pageState": null}});
        let payload = extract_payload(Method::Get, body).unwrap();
        assert!(payload.rows.is_empty());
        assert!(payload.page_state.is_none());
    }

    #[test]
    fn test_extract_single_entity() {
        let payload = extract_payload(Method::Post, json!({"firstName": "Ann"})).unwrap();
        assert_eq!(payload.rows.len(), 1);
        assert_eq!(payload.rows[0]["firstName"], json!("Ann"));

        let payload = extract_payload(Method::Delete, JsonValue::Null).unwrap();
        assert!(payload.rows.is_empty());
    }

    #[test]
    fn test_extract_rejects_non_object() {
        assert!(extract_payload(Method::Get, json!([1, 2])).is_err());
        assert!(extract_payload(Method::Put, json!("ok")).is_err());
    }
}
