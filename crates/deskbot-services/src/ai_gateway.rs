//! AI gateway client for query classification and result summarization.

use crate::{endpoint, ensure_success};
use async_trait::async_trait;
use deskbot_core::{
    error::DeskbotError,
    message::{HistoryEntry, Record},
    traits::Classifier,
};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::debug;

const SERVICE: &str = "AI gateway";

pub struct AiGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl AiGatewayClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, DeskbotError> {
        let url = endpoint(&self.base_url, path);
        let start = Instant::now();

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("request failed: {e}")))?;

        let parsed = ensure_success(SERVICE, resp)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| DeskbotError::collaborator(SERVICE, format!("malformed response: {e}")))?;

        debug!(
            "ai gateway: POST {url} answered in {}ms",
            start.elapsed().as_millis()
        );
        Ok(parsed)
    }
}

#[derive(Serialize)]
pub(crate) struct ParseRequest<'a> {
    pub messages: &'a [HistoryEntry],
    pub user_query: &'a str,
}

#[derive(Serialize)]
pub(crate) struct FormatRequest<'a> {
    pub results: &'a [Record],
    pub messages: &'a [HistoryEntry],
}

/// Pull the answer out of a `/format` reply: `{"response": "..."}` or a bare string.
pub(crate) fn extract_formatted(body: &Value) -> Result<String, DeskbotError> {
    match body {
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => map
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| DeskbotError::collaborator(SERVICE, "format reply has no `response`")),
        _ => Err(DeskbotError::collaborator(
            SERVICE,
            "format reply is neither a string nor an object",
        )),
    }
}

#[async_trait]
impl Classifier for AiGatewayClient {
    async fn classify(&self, query: &str, history: &[HistoryEntry]) -> Result<Value, DeskbotError> {
        let body = ParseRequest {
            messages: history,
            user_query: query,
        };
        self.post_json("parse", &body).await
    }

    async fn format_response(
        &self,
        results: &[Record],
        history: &[HistoryEntry],
    ) -> Result<String, DeskbotError> {
        let body = FormatRequest {
            results,
            messages: history,
        };
        let reply = self.post_json("format", &body).await?;
        extract_formatted(&reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_shape() {
        let history = vec![HistoryEntry::user("top drugs?")];
        let body = ParseRequest {
            messages: &history,
            user_query: "top drugs?",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            json!({
                "messages": [{"role": "user", "content": "top drugs?"}],
                "user_query": "top drugs?"
            })
        );
    }

    #[test]
    fn test_extract_formatted_object() {
        let text = extract_formatted(&json!({"response": "Three drugs match."})).unwrap();
        assert_eq!(text, "Three drugs match.");
    }

    #[test]
    fn test_extract_formatted_bare_string() {
        assert_eq!(extract_formatted(&json!("ok")).unwrap(), "ok");
    }

    #[test]
    fn test_extract_formatted_rejects_other_shapes() {
        assert!(extract_formatted(&json!({"text": "x"})).is_err());
        assert!(extract_formatted(&json!([1, 2])).is_err());
    }
}
