use thiserror::Error;

/// Top-level error type for Deskbot.
#[derive(Debug, Error)]
pub enum DeskbotError {
    /// An external collaborator failed or returned malformed data.
    #[error("{service} failed: {reason}")]
    Collaborator {
        service: &'static str,
        reason: String,
    },

    /// An external collaborator did not answer within the configured bound.
    #[error("{service} timed out after {secs}s")]
    Timeout { service: &'static str, secs: u64 },

    /// The search/report path produced nothing usable.
    #[error("no data: {0}")]
    NoData(String),

    /// Report file could not be written or read.
    #[error("report error: {0}")]
    Report(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Audit store error.
    #[error("memory error: {0}")]
    Memory(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeskbotError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            reason: reason.into(),
        }
    }

    /// Whether this error means an external service is unavailable, as opposed
    /// to a local fault or an empty result.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Collaborator { .. } | Self::Timeout { .. })
    }

    /// Name of the failing collaborator, if any.
    pub fn service(&self) -> Option<&'static str> {
        match self {
            Self::Collaborator { service, .. } | Self::Timeout { service, .. } => Some(service),
            _ => None,
        }
    }
}
