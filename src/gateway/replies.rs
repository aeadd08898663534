//! User-facing reply text.

use super::RouteOutcome;
use deskbot_core::{error::DeskbotError, intent::Intent};

pub const CANCELLED: &str = "❌ Action cancelled.";

pub const REPROMPT: &str = "🔁 Please reply with `yes` or `no` to confirm.";

pub const CANNOT_HELP: &str =
    "❌ Sorry, I can only help with: user activity, welcome emails, and account lock checks.";

pub const EMAIL_RESENT: &str = "📧 Welcome email resent.";

/// The question asked before running `intent`. `None` for intents that are
/// never held for confirmation.
pub fn confirmation_prompt(intent: &Intent) -> Option<String> {
    match intent {
        Intent::CheckActive { user_id } => Some(format!(
            "❓Do you want me to check if user `{user_id}` is active? Reply `yes` or `no`."
        )),
        Intent::ResendEmail => Some(
            "❓Do you want me to resend the welcome email? Reply `yes` or `no`.".to_string(),
        ),
        Intent::CheckLocked { user_id } => Some(format!(
            "❓Do you want me to check if user `{user_id}` is locked? Reply `yes` or `no`."
        )),
        Intent::Unknown => None,
    }
}

pub fn user_activity(user_id: &str, active: bool) -> String {
    let state = if active { "active" } else { "inactive" };
    format!("✅ User {user_id} is {state}.")
}

pub fn account_lock(user_id: &str, locked: bool) -> String {
    let state = if locked { "locked" } else { "not locked" };
    format!("🔒 User {user_id}'s account is {state}.")
}

/// Render a failure for the user. Backend detail stays in the logs.
pub fn failure(err: &DeskbotError) -> String {
    match err {
        DeskbotError::NoData(msg) => format!("📭 {msg}"),
        _ => match err.service() {
            Some(service) => {
                format!("⚠️ The {service} is temporarily unavailable. Please try again later.")
            }
            None => "⚠️ Something went wrong on my side. Please try again later.".to_string(),
        },
    }
}

/// Render a classifier routing outcome as chat text.
pub fn route_outcome(outcome: &RouteOutcome) -> String {
    match outcome {
        RouteOutcome::Response(text) => text.clone(),
        RouteOutcome::Report(artifact) => format!(
            "📄 Report ready ({} rows): /download_report/{}",
            artifact.row_count, artifact.filename
        ),
        RouteOutcome::NoData(msg) => format!("📭 {msg}"),
    }
}
