//! Gateway: owns the conversational state and the collaborators, and turns
//! each incoming message into a reply.
//!
//! Includes: the confirmation dispatcher, the post-confirmation handlers,
//! classifier routing for free text, and audit logging.

mod dispatcher;
mod handlers;
pub mod replies;
mod routing;


pub use dispatcher::Dispatched;
pub use routing::{QueryRouter, RouteOutcome};

use deskbot_core::{
    config::{Config, DispatchConfig},
    error::DeskbotError,
    message::IncomingMessage,
    shellexpand,
    traits::{AccountDirectory, Classifier, Mailer, ReportWriter, SearchBackend},
};
use deskbot_memory::{
    audit::{AuditEntry, AuditStatus},
    AuditLogger, HistoryStore, PendingStore,
};
use deskbot_services::{
    AiGatewayClient, CsvReportWriter, DirectoryClient, MailerClient, SearchClient,
};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The external services the gateway talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn AccountDirectory>,
    pub mailer: Arc<dyn Mailer>,
    pub classifier: Arc<dyn Classifier>,
    pub search: Arc<dyn SearchBackend>,
    pub reports: Arc<dyn ReportWriter>,
}

impl Collaborators {
    /// Build the HTTP-backed collaborators described by the config.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let client = deskbot_services::http_client(cfg.collaborators.timeout_secs)?;
        let c = &cfg.collaborators;
        Ok(Self {
            directory: Arc::new(DirectoryClient::new(client.clone(), c.directory_url.clone())),
            mailer: Arc::new(MailerClient::new(client.clone(), c.mailer_url.clone())),
            classifier: Arc::new(AiGatewayClient::new(
                client.clone(),
                c.ai_gateway_url.clone(),
            )),
            search: Arc::new(SearchClient::new(client, c.search_url.clone())),
            reports: Arc::new(CsvReportWriter::new(shellexpand(&cfg.reports.dir))),
        })
    }
}

/// The central gateway: dispatcher state plus collaborators.
pub struct Gateway {
    pub(super) directory: Arc<dyn AccountDirectory>,
    pub(super) mailer: Arc<dyn Mailer>,
    pub(super) pending: PendingStore,
    pub(super) router: QueryRouter,
    pub(super) audit: Option<AuditLogger>,
    pub(super) dispatch_config: DispatchConfig,
    pub(super) call_timeout: Duration,
}

impl Gateway {
    /// Create a new gateway.
    pub fn new(collaborators: Collaborators, config: &Config, audit: Option<AuditLogger>) -> Self {
        let call_timeout = Duration::from_secs(config.collaborators.timeout_secs);
        let ttl = config.dispatch.pending_ttl_secs.map(Duration::from_secs);
        let history = HistoryStore::new(config.history.max_messages_per_conversation);

        info!(
            "Deskbot gateway ready | unknown intents: {:?} | pending ttl: {} | collaborator timeout: {}s",
            config.dispatch.unknown_intent,
            ttl.map(|t| format!("{}s", t.as_secs()))
                .unwrap_or_else(|| "none".to_string()),
            call_timeout.as_secs(),
        );

        Self {
            directory: collaborators.directory,
            mailer: collaborators.mailer,
            pending: PendingStore::with_ttl(ttl),
            router: QueryRouter::new(
                history,
                collaborators.classifier,
                collaborators.search,
                collaborators.reports,
                call_timeout,
            ),
            audit,
            dispatch_config: config.dispatch.clone(),
            call_timeout,
        }
    }

    pub fn pending(&self) -> &PendingStore {
        &self.pending
    }

    pub fn router(&self) -> &QueryRouter {
        &self.router
    }

    /// Process one chat message end to end: dispatch, log, audit.
    pub async fn handle_message(&self, incoming: &IncomingMessage) -> String {
        let preview = preview(&incoming.text);
        info!(
            "[{}] {} says: {}",
            incoming.channel, incoming.sender_id, preview
        );

        let start = Instant::now();
        let dispatched = self.dispatch(&incoming.text, &incoming.sender_id).await;
        let elapsed_ms = start.elapsed().as_millis() as i64;

        info!(
            "[{}] {} → {} ({}ms)",
            incoming.channel, incoming.sender_id, dispatched.action, elapsed_ms
        );

        self.audit(AuditEntry {
            channel: incoming.channel.clone(),
            sender_id: incoming.sender_id.clone(),
            input_text: incoming.text.clone(),
            intent: dispatched.intent.clone(),
            action: dispatched.action,
            output_text: Some(dispatched.reply.clone()),
            processing_ms: Some(elapsed_ms),
            status: if dispatched.ok {
                AuditStatus::Ok
            } else {
                AuditStatus::Error
            },
        })
        .await;

        dispatched.reply
    }

    /// Route a query for the per-conversation chat endpoint.
    pub async fn chat(
        &self,
        conversation_id: &str,
        query: &str,
    ) -> Result<RouteOutcome, DeskbotError> {
        info!(
            "[chat] query for conversation {conversation_id}: {}",
            preview(query)
        );
        let start = Instant::now();
        let result = self.router.route(conversation_id, query).await;

        let (action, status, output) = match &result {
            Ok(RouteOutcome::Response(text)) => ("responded", AuditStatus::Ok, Some(text.clone())),
            Ok(RouteOutcome::Report(artifact)) => (
                "reported",
                AuditStatus::Ok,
                Some(artifact.filename.clone()),
            ),
            Ok(RouteOutcome::NoData(msg)) => ("no_data", AuditStatus::Ok, Some(msg.clone())),
            Err(e) => ("failed", AuditStatus::Error, Some(e.to_string())),
        };
        self.audit(AuditEntry {
            channel: "chat".to_string(),
            sender_id: conversation_id.to_string(),
            input_text: query.to_string(),
            intent: None,
            action,
            output_text: output,
            processing_ms: Some(start.elapsed().as_millis() as i64),
            status,
        })
        .await;

        result
    }

    /// Best-effort audit write; failures are logged, never surfaced.
    async fn audit(&self, entry: AuditEntry) {
        if let Some(ref audit) = self.audit {
            if let Err(e) = audit.log(&entry).await {
                warn!("audit log failed: {e}");
            }
        }
    }

    /// Run a collaborator call under the configured timeout.
    pub(super) async fn bounded<T, F>(&self, service: &'static str, call: F) -> Result<T, DeskbotError>
    where
        F: Future<Output = Result<T, DeskbotError>>,
    {
        bounded(service, self.call_timeout, call).await
    }
}

/// Await `call`, turning an elapsed timeout into a collaborator failure.
pub(super) async fn bounded<T, F>(
    service: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, DeskbotError>
where
    F: Future<Output = Result<T, DeskbotError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DeskbotError::Timeout {
            service,
            secs: limit.as_secs(),
        }),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > 60 {
        let truncated: String = text.chars().take(60).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}
