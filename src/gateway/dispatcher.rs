//! Confirmation dispatcher. Decides whether a message answers a pending
//! confirmation or starts a new command.
//!
//! Per user: IDLE → AWAITING_CONFIRMATION on a confirmable intent;
//! AWAITING_CONFIRMATION → IDLE on yes (handler runs) or no (nothing runs);
//! any other reply leaves the pending action exactly as it was.

use super::{replies, Gateway};
use deskbot_core::{config::UnknownIntentPolicy, intent::Intent};
use deskbot_memory::pending::{Reply, Resolution};
use tracing::{info, warn};

/// A reply plus what the dispatcher did to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub reply: String,
    /// Short verb for logs and the audit trail.
    pub action: &'static str,
    /// Intent tag or classifier category involved, if any.
    pub intent: Option<String>,
    /// False when a collaborator failed along the way.
    pub ok: bool,
}

impl Dispatched {
    fn new(reply: impl Into<String>, action: &'static str, intent: Option<&str>) -> Self {
        Self {
            reply: reply.into(),
            action,
            intent: intent.map(str::to_string),
            ok: true,
        }
    }

    fn failed(mut self) -> Self {
        self.ok = false;
        self
    }
}

impl Gateway {
    /// Turn a user's message into a reply, advancing their confirmation state.
    pub async fn dispatch(&self, text: &str, user_id: &str) -> Dispatched {
        let normalized = text.trim().to_lowercase();

        match self.pending.resolve(user_id, Reply::parse(&normalized)) {
            Resolution::Confirmed(action) => {
                let tag = action.intent.tag();
                info!("{user_id} confirmed {tag}");
                match self.run_handler(&action.intent).await {
                    Ok(reply) => Dispatched::new(reply, "executed", Some(tag)),
                    Err(e) => {
                        warn!("{tag} for {user_id} failed: {e}");
                        Dispatched::new(replies::failure(&e), "failed", Some(tag)).failed()
                    }
                }
            }
            Resolution::Cancelled(action) => {
                info!("{user_id} cancelled {}", action.intent.tag());
                Dispatched::new(replies::CANCELLED, "cancelled", Some(action.intent.tag()))
            }
            Resolution::StillPending(action) => {
                Dispatched::new(replies::REPROMPT, "reprompted", Some(action.intent.tag()))
            }
            Resolution::Idle => self.dispatch_new(text.trim(), &normalized, user_id).await,
        }
    }

    /// No confirmation outstanding: parse a fresh command.
    async fn dispatch_new(&self, original: &str, normalized: &str, user_id: &str) -> Dispatched {
        let intent = Intent::parse(normalized);

        if let Some(prompt) = replies::confirmation_prompt(&intent) {
            let tag = intent.tag();
            self.pending.set_pending(user_id, intent);
            info!("{user_id} awaiting confirmation for {tag}");
            return Dispatched::new(prompt, "prompted", Some(tag));
        }

        match self.dispatch_config.unknown_intent {
            UnknownIntentPolicy::Reject => {
                Dispatched::new(replies::CANNOT_HELP, "rejected", Some(intent.tag()))
            }
            UnknownIntentPolicy::Classify => match self.router.route(user_id, original).await {
                Ok(outcome) => Dispatched::new(
                    replies::route_outcome(&outcome),
                    "classified",
                    Some(outcome.label()),
                ),
                Err(e) => {
                    warn!("classifier hand-off for {user_id} failed: {e}");
                    Dispatched::new(replies::failure(&e), "classify_failed", None).failed()
                }
            },
        }
    }
}
