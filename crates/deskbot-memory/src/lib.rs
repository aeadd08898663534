//! # deskbot-memory
//!
//! Process-lifetime conversational state (pending confirmations, classifier
//! history) and the SQLite-backed audit log.

pub mod audit;
pub mod history;
pub mod pending;

pub use audit::AuditLogger;
pub use history::HistoryStore;
pub use pending::PendingStore;
