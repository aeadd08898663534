//! Intent parsing: raw text to a recognized operation with its parameters.
//!
//! Matching is pure and case-insensitive. Patterns are tried in a fixed
//! priority order and the first match wins, regardless of where in the text
//! each pattern occurs.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Parameters extracted from text, keyed by name (e.g. `user_id`).
pub type Entities = HashMap<String, String>;

static CHECK_ACTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"is user id (\w+) active").expect("valid regex"));

static CHECK_LOCKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"check if user (\w+) is account locked").expect("valid regex")
});

const RESEND_EMAIL_PHRASE: &str = "resend welcome email";

/// A locally recognized request. Entities travel inside the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CheckActive { user_id: String },
    ResendEmail,
    CheckLocked { user_id: String },
    Unknown,
}

impl Intent {
    /// Parse an intent from message text.
    pub fn parse(text: &str) -> Self {
        let text = text.to_lowercase();

        if let Some(user_id) = first_capture(&CHECK_ACTIVE_RE, &text) {
            return Self::CheckActive { user_id };
        }
        if text.contains(RESEND_EMAIL_PHRASE) {
            return Self::ResendEmail;
        }
        if let Some(user_id) = first_capture(&CHECK_LOCKED_RE, &text) {
            return Self::CheckLocked { user_id };
        }
        Self::Unknown
    }

    /// Stable tag name, used in logs and the audit trail.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::CheckActive { .. } => "check_active",
            Self::ResendEmail => "resend_email",
            Self::CheckLocked { .. } => "check_locked",
            Self::Unknown => "unknown",
        }
    }

    /// Entity map view of the variant's parameters.
    pub fn entities(&self) -> Entities {
        let mut entities = Entities::new();
        match self {
            Self::CheckActive { user_id } | Self::CheckLocked { user_id } => {
                entities.insert("user_id".to_string(), user_id.clone());
            }
            Self::ResendEmail | Self::Unknown => {}
        }
        entities
    }

    /// Whether this intent must be confirmed before it runs.
    pub fn is_confirmable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Category assigned by the external classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCategory {
    /// The classifier's payload is the answer.
    Direct,
    /// Run the tool calls and hand back a downloadable report.
    Report,
    /// Run the tool calls and summarize the results.
    Structured,
}

impl QueryCategory {
    /// Read `query_category` from a classifier payload. Anything unrecognized,
    /// absent, or not an object is `Direct`.
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get("query_category").and_then(Value::as_str) {
            Some("report") => Self::Report,
            Some("structured") => Self::Structured,
            _ => Self::Direct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Report => "report",
            Self::Structured => "structured",
        }
    }
}
