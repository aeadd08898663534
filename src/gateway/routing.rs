//! Classifier routing for free text the local parser does not recognize.
//!
//! The router owns the per-conversation history. Each query is appended, sent
//! to the classifier with the history, and the classifier's reply is appended
//! in turn before branching on its category.

use super::bounded;
use deskbot_core::{
    error::DeskbotError,
    intent::QueryCategory,
    message::{is_error_marker, payload_text, HistoryEntry, ReportArtifact},
    sanitize::sanitize_query,
    traits::{Classifier, ReportWriter, SearchBackend},
};
use deskbot_memory::HistoryStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const NO_REPORT_DATA: &str = "No data available for report generation.";

/// What a routed query produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// Text answer (direct or summarized).
    Response(String),
    /// A report file ready for download.
    Report(ReportArtifact),
    /// The search/report path found nothing usable.
    NoData(String),
}

impl RouteOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::Report(_) => "report",
            Self::NoData(_) => "no_data",
        }
    }
}

pub struct QueryRouter {
    history: HistoryStore,
    classifier: Arc<dyn Classifier>,
    search: Arc<dyn SearchBackend>,
    reports: Arc<dyn ReportWriter>,
    call_timeout: Duration,
}

impl QueryRouter {
    pub fn new(
        history: HistoryStore,
        classifier: Arc<dyn Classifier>,
        search: Arc<dyn SearchBackend>,
        reports: Arc<dyn ReportWriter>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            history,
            classifier,
            search,
            reports,
            call_timeout,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn reports(&self) -> &Arc<dyn ReportWriter> {
        &self.reports
    }

    /// Classify `query` within its conversation and act on the category.
    pub async fn route(
        &self,
        conversation_id: &str,
        query: &str,
    ) -> Result<RouteOutcome, DeskbotError> {
        let sanitized = sanitize_query(query);
        if sanitized.was_modified() {
            warn!(
                "sanitized query in {conversation_id}: {:?}",
                sanitized.warnings
            );
        }

        let history = self
            .history
            .append(conversation_id, HistoryEntry::user(&sanitized.text));

        let payload = bounded(
            self.classifier.name(),
            self.call_timeout,
            self.classifier.classify(&sanitized.text, &history),
        )
        .await?;

        let history = self
            .history
            .append(conversation_id, HistoryEntry::assistant(payload_text(&payload)));

        let category = QueryCategory::from_payload(&payload);
        info!("classifier routed {conversation_id} as {}", category.as_str());

        match category {
            QueryCategory::Report => self.generate_report(tool_calls(&payload)).await,
            QueryCategory::Structured => {
                let results = bounded(
                    self.search.name(),
                    self.call_timeout,
                    self.search.search(tool_calls(&payload), &history),
                )
                .await?;
                let text = bounded(
                    self.classifier.name(),
                    self.call_timeout,
                    self.classifier.format_response(&results, &history),
                )
                .await?;
                Ok(RouteOutcome::Response(text))
            }
            QueryCategory::Direct => Ok(RouteOutcome::Response(payload_text(&payload))),
        }
    }

    /// Run report tool calls (without conversation history) and write the CSV.
    async fn generate_report(&self, tool_calls: &Value) -> Result<RouteOutcome, DeskbotError> {
        info!("fetching data for report generation");
        let records = bounded(
            self.search.name(),
            self.call_timeout,
            self.search.search(tool_calls, &[]),
        )
        .await?;

        let usable = records.first().is_some_and(|r| !is_error_marker(r));
        if !usable {
            return Ok(RouteOutcome::NoData(NO_REPORT_DATA.to_string()));
        }

        match self.reports.write_report(&records) {
            Ok(artifact) => Ok(RouteOutcome::Report(artifact)),
            Err(DeskbotError::NoData(msg)) => Ok(RouteOutcome::NoData(msg)),
            Err(e) => Err(e),
        }
    }
}

static NO_TOOL_CALLS: Value = Value::Null;

/// The classifier's tool calls, forwarded untouched. Absent = null.
fn tool_calls(payload: &Value) -> &Value {
    payload.get("tool_calls").unwrap_or(&NO_TOOL_CALLS)
}
