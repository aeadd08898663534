//! Search backend client. Tool calls from the classifier are forwarded as-is.

use crate::{endpoint, ensure_success};
use async_trait::async_trait;
use deskbot_core::{
    error::DeskbotError,
    message::{HistoryEntry, Record},
    traits::SearchBackend,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

const SERVICE: &str = "search backend";

pub struct SearchClient {
    client: reqwest::Client,
    base_url: String,
}

impl SearchClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[derive(Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub tool_calls: &'a Value,
    pub history: &'a [HistoryEntry],
}

/// Normalize a search reply into records. A top-level error object becomes a
/// single error-marker record; scalar rows are wrapped as `{"value": ...}`.
pub(crate) fn into_records(body: Value) -> Result<Vec<Record>, DeskbotError> {
    match body {
        Value::Array(rows) => Ok(rows
            .into_iter()
            .map(|row| match row {
                Value::Object(map) => map,
                other => {
                    let mut map = Record::new();
                    map.insert("value".to_string(), other);
                    map
                }
            })
            .collect()),
        Value::Object(map) if map.contains_key("error") => {
            warn!("search backend returned an error marker");
            Ok(vec![map])
        }
        _ => Err(DeskbotError::collaborator(
            SERVICE,
            "expected an array of records",
        )),
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(
        &self,
        tool_calls: &Value,
        history: &[HistoryEntry],
    ) -> Result<Vec<Record>, DeskbotError> {
        let url = endpoint(&self.base_url, "query");
        debug!("search: POST {url}");

        let body = QueryRequest {
            tool_calls,
            history,
        };
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("request failed: {e}")))?;

        let parsed = ensure_success(SERVICE, resp)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("malformed response: {e}")))?;

        into_records(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_objects() {
        let records = into_records(json!([{"drug": "a", "tier": 1}, {"drug": "b"}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["tier"], json!(1));
    }

    #[test]
    fn test_scalar_rows_wrapped() {
        let records = into_records(json!([1, "two"])).unwrap();
        assert_eq!(records[1]["value"], json!("two"));
    }

    #[test]
    fn test_error_object_becomes_marker() {
        let records = into_records(json!({"error": "index not found"})).unwrap();
        assert_eq!(records.len(), 1);
        assert!(deskbot_core::message::is_error_marker(&records[0]));
    }

    #[test]
    fn test_other_shapes_rejected() {
        assert!(into_records(json!({"hits": []})).is_err());
        assert!(into_records(json!("nope")).is_err());
    }

    #[test]
    fn test_query_request_forwards_tool_calls_verbatim() {
        let calls = json!([{"name": "search", "arguments": {"q": "tier 2"}}]);
        let body = QueryRequest {
            tool_calls: &calls,
            history: &[],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tool_calls"], calls);
        assert_eq!(json["history"], json!([]));
    }
}
