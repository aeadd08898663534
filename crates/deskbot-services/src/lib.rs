//! # deskbot-services
//!
//! Concrete collaborator implementations: JSON-over-HTTP clients for the
//! account directory, mailer, AI gateway and search backend, plus the CSV
//! report writer.

pub mod ai_gateway;
pub mod directory;
pub mod mailer;
pub mod reports;
pub mod search;

pub use ai_gateway::AiGatewayClient;
pub use directory::DirectoryClient;
pub use mailer::MailerClient;
pub use reports::CsvReportWriter;
pub use search::SearchClient;

use deskbot_core::error::DeskbotError;
use std::time::Duration;

/// Shared HTTP client for all collaborators. Per-call deadlines are applied by
/// the caller; this only bounds connection setup.
pub fn http_client(connect_timeout_secs: u64) -> Result<reqwest::Client, DeskbotError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs.max(1)))
        .build()
        .map_err(|e| DeskbotError::Config(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a non-success HTTP response into a collaborator failure.
pub(crate) async fn ensure_success(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response, DeskbotError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    Err(DeskbotError::collaborator(
        service,
        format!("returned {status}: {text}"),
    ))
}
