mod api;
mod gateway;

use clap::{Parser, Subcommand};
use deskbot_core::{config, message::IncomingMessage, shellexpand};
use deskbot_memory::AuditLogger;
use gateway::{Collaborators, Gateway};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "deskbot",
    version,
    about = "Deskbot: confirmation-gated helpdesk command dispatcher"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Start,
    /// Show the effective configuration and audit summary.
    Status {
        /// Also list the audited actions for this sender id.
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Talk to the dispatcher from the terminal.
    Chat {
        /// User id the session speaks as.
        #[arg(short, long, default_value = "cli")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            let _guard = init_tracing(&cfg, true)?;

            let audit = open_audit(&cfg).await?;
            let collaborators = Collaborators::from_config(&cfg)?;
            let gw = Arc::new(Gateway::new(collaborators, &cfg, audit));

            println!("{}: starting on {}:{}", cfg.deskbot.name, cfg.api.host, cfg.api.port);
            api::serve(&cfg.api, gw).await?;
        }
        Commands::Status { user } => {
            println!("{}: Status Check\n", cfg.deskbot.name);
            println!("Config: {}", cli.config);
            println!(
                "API: {}:{} ({})",
                cfg.api.host,
                cfg.api.port,
                if cfg.api.api_key.is_empty() {
                    "no auth"
                } else {
                    "bearer token"
                }
            );
            println!("Unknown intents: {:?}", cfg.dispatch.unknown_intent);
            match cfg.dispatch.pending_ttl_secs {
                Some(secs) => println!("Pending confirmations expire after {secs}s"),
                None => println!("Pending confirmations never expire"),
            }
            println!();

            let c = &cfg.collaborators;
            println!("  account directory: {}", c.directory_url);
            println!("  email service:     {}", c.mailer_url);
            println!("  AI gateway:        {}", c.ai_gateway_url);
            println!("  search backend:    {}", c.search_url);
            println!("  call timeout:      {}s", c.timeout_secs);
            println!();

            let db_path = shellexpand(&cfg.audit.db_path);
            if !cfg.audit.enabled {
                println!("  audit: disabled");
            } else if Path::new(&db_path).exists() {
                let audit = AuditLogger::open(&db_path).await?;
                println!("  audit: {} entries in {db_path}", audit.count().await?);
                if let Some(user) = user {
                    let actions = audit.actions_for(&user).await?;
                    if actions.is_empty() {
                        println!("  {user}: no audited messages");
                    } else {
                        println!("  {user}: {}", actions.join(" → "));
                    }
                }
            } else {
                println!("  audit: no database yet at {db_path}");
            }
        }
        Commands::Chat { user } => {
            // Logs go to the file only so they don't interleave with replies.
            let _guard = init_tracing(&cfg, false)?;

            let audit = open_audit(&cfg).await?;
            let collaborators = Collaborators::from_config(&cfg)?;
            let gw = Gateway::new(collaborators, &cfg, audit);

            println!("{}: chatting as `{user}`. Ctrl-D to quit.", cfg.deskbot.name);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                print!("> ");
                std::io::stdout().flush()?;

                let Some(line) = lines.next_line().await? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let incoming = IncomingMessage {
                    channel: "cli".to_string(),
                    sender_id: user.clone(),
                    text: line,
                };
                println!("{}", gw.handle_message(&incoming).await);
            }
        }
    }

    Ok(())
}

/// Install the global subscriber: a daily rolling file under
/// `{data_dir}/logs`, plus stdout when `to_stdout` is set.
///
/// `RUST_LOG` wins over the configured `log_level`. The returned guard must
/// live as long as logging is needed.
fn init_tracing(cfg: &config::Config, to_stdout: bool) -> anyhow::Result<WorkerGuard> {
    let log_dir = PathBuf::from(shellexpand(&cfg.deskbot.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "deskbot.log"));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.deskbot.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(to_stdout.then(|| fmt::layer()))
        .init();

    info!("logging to {}", log_dir.display());
    Ok(guard)
}

/// Open the audit store when enabled.
async fn open_audit(cfg: &config::Config) -> anyhow::Result<Option<AuditLogger>> {
    if !cfg.audit.enabled {
        return Ok(None);
    }
    let audit = AuditLogger::open(&shellexpand(&cfg.audit.db_path)).await?;
    Ok(Some(audit))
}
