//! # deskbot-core
//!
//! Core types, collaborator traits, intent parsing, configuration, and error
//! handling for Deskbot.

pub mod config;
pub mod error;
pub mod intent;
pub mod message;
pub mod sanitize;
pub mod traits;

pub use config::shellexpand;
