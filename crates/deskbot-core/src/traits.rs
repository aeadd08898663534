use crate::{
    error::DeskbotError,
    message::{HistoryEntry, Record, ReportArtifact},
};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

/// Account status lookups (activity and lock state).
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Human-readable service name, used in "temporarily unavailable" replies.
    fn name(&self) -> &'static str {
        "account directory"
    }

    async fn is_user_active(&self, user_id: &str) -> Result<bool, DeskbotError>;

    async fn is_account_locked(&self, user_id: &str) -> Result<bool, DeskbotError>;
}

/// Outbound email.
#[async_trait]
pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str {
        "email service"
    }

    async fn send_welcome_email(&self) -> Result<(), DeskbotError>;
}

/// The external AI classifier and its response formatter.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str {
        "AI gateway"
    }

    /// Classify a query in the context of the conversation so far.
    async fn classify(&self, query: &str, history: &[HistoryEntry]) -> Result<Value, DeskbotError>;

    /// Turn raw search results into a natural-language answer.
    async fn format_response(
        &self,
        results: &[Record],
        history: &[HistoryEntry],
    ) -> Result<String, DeskbotError>;
}

/// Executes classifier tool calls. Tool calls are forwarded verbatim.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str {
        "search backend"
    }

    async fn search(
        &self,
        tool_calls: &Value,
        history: &[HistoryEntry],
    ) -> Result<Vec<Record>, DeskbotError>;
}

/// Materializes records into downloadable report files.
pub trait ReportWriter: Send + Sync {
    fn write_report(&self, records: &[Record]) -> Result<ReportArtifact, DeskbotError>;

    /// Resolve a previously generated report by filename. `None` if the name is
    /// unsafe or no such file exists.
    fn locate(&self, filename: &str) -> Option<PathBuf>;
}
