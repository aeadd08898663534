//! HTTP API server for helpdesk chat integrations.
//!
//! Provides the chat webhook, the per-conversation classifier endpoint, report
//! downloads, and a health check. All routes share the optional bearer token.

use crate::gateway::{replies, Gateway, RouteOutcome};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use deskbot_core::{config::ApiConfig, message::IncomingMessage};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

type ApiError = (StatusCode, Json<Value>);

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    gateway: Arc<Gateway>,
    api_key: Option<String>,
    uptime: Instant,
}

/// Chat webhook request body.
#[derive(Debug, Deserialize)]
struct WebhookRequest {
    #[serde(default)]
    text: String,
    #[serde(rename = "senderId", alias = "personId", default)]
    sender_id: String,
}

/// Classifier chat request body.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    query: String,
}

/// Constant-time string comparison to prevent timing attacks on API token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `Err` with the rejection when unauthorized.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Result<(), ApiError> {
    let Some(key) = api_key else {
        return Ok(());
    };

    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| bad(StatusCode::UNAUTHORIZED, "missing Authorization header"))?
        .to_str()
        .map_err(|_| bad(StatusCode::UNAUTHORIZED, "invalid Authorization header"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => Ok(()),
        _ => Err(bad(StatusCode::UNAUTHORIZED, "invalid token")),
    }
}

fn bad(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({"error": msg.into()})))
}

/// `GET /api/health`: uptime plus in-memory state sizes.
async fn health(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<Value>, ApiError> {
    check_auth(&headers, &state.api_key)?;

    Ok(Json(json!({
        "status": "ok",
        "uptime_secs": state.uptime.elapsed().as_secs(),
        "pending_actions": state.gateway.pending().len(),
        "conversations": state.gateway.router().history().conversation_count(),
    })))
}

/// `POST /webhook`: one chat turn through the confirmation dispatcher.
async fn webhook(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<WebhookRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    check_auth(&headers, &state.api_key)?;

    let Json(request) =
        body.map_err(|e| bad(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))?;

    let sender_id = request.sender_id.trim();
    if sender_id.is_empty() {
        return Err(bad(StatusCode::BAD_REQUEST, "senderId must not be empty"));
    }

    // Blank text still goes through the dispatcher: it re-prompts a pending
    // confirmation and is an unknown command otherwise.
    let incoming = IncomingMessage {
        channel: "webhook".to_string(),
        sender_id: sender_id.to_string(),
        text: request.text.trim().to_string(),
    };
    let reply = state.gateway.handle_message(&incoming).await;

    Ok(Json(json!({"text": reply})))
}

/// `POST /chat/{conversation_id}`: classifier routing for one conversation.
///
/// Answers with `{response}`, a CSV attachment for report queries, or
/// `{error}` (status 200) when a report finds no data.
async fn chat(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(conversation_id): Path<String>,
    body: Result<Json<ChatRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, ApiError> {
    check_auth(&headers, &state.api_key)?;

    let Json(request) =
        body.map_err(|e| bad(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))?;
    if request.query.trim().is_empty() {
        return Err(bad(StatusCode::BAD_REQUEST, "query must not be empty"));
    }

    let outcome = state
        .gateway
        .chat(&conversation_id, &request.query)
        .await
        .map_err(|e| {
            warn!("chat {conversation_id} failed: {e}");
            let status = if e.is_unavailable() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            bad(status, replies::failure(&e))
        })?;

    match outcome {
        RouteOutcome::Response(text) => Ok(Json(json!({"response": text})).into_response()),
        RouteOutcome::NoData(msg) => Ok(Json(json!({"error": msg})).into_response()),
        RouteOutcome::Report(artifact) => {
            let bytes = tokio::fs::read(&artifact.path).await.map_err(|e| {
                warn!("cannot read report {}: {e}", artifact.path.display());
                bad(StatusCode::INTERNAL_SERVER_ERROR, "report unavailable")
            })?;
            Ok(csv_attachment(&artifact.filename, bytes))
        }
    }
}

/// `GET /download_report/{filename}`: fetch a previously generated report.
async fn download_report(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    check_auth(&headers, &state.api_key)?;

    if filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(bad(StatusCode::BAD_REQUEST, "invalid filename"));
    }

    let path = state
        .gateway
        .router()
        .reports()
        .locate(&filename)
        .ok_or_else(|| bad(StatusCode::NOT_FOUND, "File not found"))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| bad(StatusCode::NOT_FOUND, "File not found"))?;

    info!("serving report {filename}");
    Ok(csv_attachment(&filename, bytes))
}

fn csv_attachment(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Build the axum router with shared state.
fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/webhook", post(webhook))
        .route("/chat/{conversation_id}", post(chat))
        .route("/download_report/{filename}", get(download_report))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Run the API server until it fails.
pub async fn serve(config: &ApiConfig, gateway: Arc<Gateway>) -> anyhow::Result<()> {
    let api_key = if config.api_key.is_empty() {
        None
    } else {
        Some(config.api_key.clone())
    };

    let state = ApiState {
        gateway,
        api_key,
        uptime: Instant::now(),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("API server failed to bind to {addr}: {e}"))?;

    info!("API server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Collaborators;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use deskbot_core::{
        config::{Config, UnknownIntentPolicy},
        error::DeskbotError,
        message::{HistoryEntry, Record},
        traits::{AccountDirectory, Classifier, Mailer, SearchBackend},
    };
    use deskbot_services::CsvReportWriter;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    // -----------------------------------------------------------------------
    // Stub collaborators
    // -----------------------------------------------------------------------

    struct StubDirectory;

    #[async_trait]
    impl AccountDirectory for StubDirectory {
        async fn is_user_active(&self, _user_id: &str) -> Result<bool, DeskbotError> {
            Ok(true)
        }

        async fn is_account_locked(&self, _user_id: &str) -> Result<bool, DeskbotError> {
            Ok(false)
        }
    }

    struct StubMailer;

    #[async_trait]
    impl Mailer for StubMailer {
        async fn send_welcome_email(&self) -> Result<(), DeskbotError> {
            Ok(())
        }
    }

    /// Replies with a fixed payload, or fails when `payload` is `None`.
    struct StubClassifier {
        payload: Option<Value>,
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            _query: &str,
            _history: &[HistoryEntry],
        ) -> Result<Value, DeskbotError> {
            self.payload
                .clone()
                .ok_or_else(|| DeskbotError::collaborator("AI gateway", "502 bad gateway"))
        }

        async fn format_response(
            &self,
            results: &[Record],
            _history: &[HistoryEntry],
        ) -> Result<String, DeskbotError> {
            Ok(format!("{} results", results.len()))
        }
    }

    struct StubSearch {
        records: Value,
    }

    #[async_trait]
    impl SearchBackend for StubSearch {
        async fn search(
            &self,
            _tool_calls: &Value,
            _history: &[HistoryEntry],
        ) -> Result<Vec<Record>, DeskbotError> {
            Ok(self
                .records
                .as_array()
                .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
                .unwrap_or_default())
        }
    }

    struct Harness {
        app: Router,
        reports_dir: tempfile::TempDir,
    }

    fn harness(api_key: Option<String>, payload: Option<Value>, records: Value) -> Harness {
        let reports_dir = tempfile::tempdir().unwrap();
        let collaborators = Collaborators {
            directory: Arc::new(StubDirectory),
            mailer: Arc::new(StubMailer),
            classifier: Arc::new(StubClassifier { payload }),
            search: Arc::new(StubSearch { records }),
            reports: Arc::new(CsvReportWriter::new(reports_dir.path())),
        };
        let mut config = Config::default();
        config.dispatch.unknown_intent = UnknownIntentPolicy::Reject;
        let gateway = Arc::new(Gateway::new(collaborators, &config, None));

        let state = ApiState {
            gateway,
            api_key,
            uptime: Instant::now(),
        };
        Harness {
            app: build_router(state),
            reports_dir,
        }
    }

    fn test_router(api_key: Option<String>) -> Router {
        harness(api_key, Some(json!("hi")), json!([])).app
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// Parse response body as JSON.
    async fn body_json(resp: axum::http::Response<Body>) -> Value {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    async fn body_text(resp: axum::http::Response<Body>) -> String {
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    // -----------------------------------------------------------------------
    // Health and auth
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health_no_auth() {
        let app = test_router(None);
        let req = Request::get("/api/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["pending_actions"], 0);
        assert_eq!(json["conversations"], 0);
    }

    #[tokio::test]
    async fn test_health_valid_auth() {
        let app = test_router(Some("secret".to_string()));
        let req = Request::get("/api/health")
            .header("Authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_bad_auth() {
        let app = test_router(Some("secret".to_string()));
        let req = Request::get("/api/health")
            .header("Authorization", "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_missing_auth_returns_401() {
        let app = test_router(Some("secret".to_string()));
        let resp = app
            .oneshot(post_json("/webhook", r#"{"text":"hi","senderId":"u1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    // -----------------------------------------------------------------------
    // Webhook
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_webhook_confirmation_round_trip() {
        let app = test_router(None);

        let resp = app
            .clone()
            .oneshot(post_json(
                "/webhook",
                r#"{"text":"  is user id 42 active ","senderId":"u1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["text"]
            .as_str()
            .unwrap()
            .contains("check if user `42` is active"));

        let resp = app
            .oneshot(post_json("/webhook", r#"{"text":"yes","senderId":"u1"}"#))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["text"], "✅ User 42 is active.");
    }

    #[tokio::test]
    async fn test_webhook_accepts_person_id_alias() {
        let app = test_router(None);
        let resp = app
            .oneshot(post_json(
                "/webhook",
                r#"{"text":"resend welcome email","personId":"p9"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert!(json["text"].as_str().unwrap().contains("welcome email"));
    }

    #[tokio::test]
    async fn test_webhook_missing_sender_returns_400() {
        let app = test_router(None);
        let resp = app
            .oneshot(post_json("/webhook", r#"{"text":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("senderId"));
    }

    #[tokio::test]
    async fn test_webhook_blank_text_without_pending_cannot_help() {
        let app = test_router(None);
        let resp = app
            .oneshot(post_json("/webhook", r#"{"text":"   ","senderId":"u1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["text"], replies::CANNOT_HELP);
    }

    #[tokio::test]
    async fn test_webhook_empty_text_while_pending_reprompts() {
        let app = test_router(None);
        app.clone()
            .oneshot(post_json(
                "/webhook",
                r#"{"text":"is user id 42 active","senderId":"u1"}"#,
            ))
            .await
            .unwrap();

        let resp = app
            .clone()
            .oneshot(post_json("/webhook", r#"{"text":"","senderId":"u1"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["text"], replies::REPROMPT);

        // The confirmation is still there afterwards.
        let resp = app
            .oneshot(post_json("/webhook", r#"{"text":"yes","senderId":"u1"}"#))
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["text"], "✅ User 42 is active.");
    }

    #[tokio::test]
    async fn test_webhook_malformed_json_returns_400() {
        let app = test_router(None);
        let resp = app.oneshot(post_json("/webhook", "{not json")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    // -----------------------------------------------------------------------
    // Chat and reports
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_chat_direct_response() {
        let app = harness(None, Some(json!("Tier 1 covers generics.")), json!([])).app;
        let resp = app
            .oneshot(post_json("/chat/c1", r#"{"query":"what is tier 1?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["response"], "Tier 1 covers generics.");
    }

    #[tokio::test]
    async fn test_chat_report_is_csv_attachment() {
        let h = harness(
            None,
            Some(json!({"query_category": "report", "tool_calls": []})),
            json!([{"drug": "a"}, {"drug": "b"}]),
        );
        let resp = h
            .app
            .oneshot(post_json("/chat/c1", r#"{"query":"export everything"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv");
        let disposition = resp.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"report-"));

        let csv = body_text(resp).await;
        assert_eq!(csv, "drug\na\nb\n");
        assert_eq!(std::fs::read_dir(h.reports_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_chat_report_no_data_is_200_error() {
        let app = harness(
            None,
            Some(json!({"query_category": "report", "tool_calls": []})),
            json!([]),
        )
        .app;
        let resp = app
            .oneshot(post_json("/chat/c1", r#"{"query":"export"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "No data available for report generation.");
    }

    #[tokio::test]
    async fn test_chat_classifier_down_returns_502() {
        let app = harness(None, None, json!([])).app;
        let resp = app
            .oneshot(post_json("/chat/c1", r#"{"query":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(resp).await;
        let error = json["error"].as_str().unwrap();
        assert!(error.contains("temporarily unavailable"));
        assert!(!error.contains("502 bad gateway"));
    }

    #[tokio::test]
    async fn test_download_report_serves_file() {
        let h = harness(None, None, json!([]));
        std::fs::write(h.reports_dir.path().join("report-abc.csv"), "id\n1\n").unwrap();

        let req = Request::get("/download_report/report-abc.csv")
            .body(Body::empty())
            .unwrap();
        let resp = h.app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "id\n1\n");
    }

    #[tokio::test]
    async fn test_download_report_missing_returns_404() {
        let app = test_router(None);
        let req = Request::get("/download_report/report-nope.csv")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["error"], "File not found");
    }

    #[tokio::test]
    async fn test_download_report_rejects_traversal() {
        let app = test_router(None);
        let req = Request::get("/download_report/..%2F..%2Fetc%2Fpasswd")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
