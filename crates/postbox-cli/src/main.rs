//! Command-line front end for the postbox mail queue.
//!
//! Messages go through a `LogMailer`, so `process` logs deliveries instead of
//! talking to a relay. Use a file store in the configuration to keep the
//! queue between invocations.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use postbox_core::impls::LogMailer;
use postbox_core::{MailQueue, OutboundMessage, QueueConfig, logging};
use tracing::debug;

/// Manage a persistent outbound mail queue
#[derive(Parser, Debug)]
#[command(name = "postbox")]
#[command(about = "Queue outbound mail and deliver it in bounded rounds", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the queue table
    Init,
    /// Queue a message for later delivery
    Enqueue {
        #[arg(long)]
        from: String,

        /// Recipient; repeat for several
        #[arg(long, required = true)]
        to: Vec<String>,

        #[arg(long)]
        subject: Option<String>,

        /// Plain-text body
        #[arg(long)]
        body: Option<String>,

        /// Hold the message back for this many seconds
        #[arg(long)]
        delay_secs: Option<i64>,
    },
    /// Run one processing round
    Process,
    /// Delete delivered messages
    Purge,
    /// Count messages per state
    Status {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => QueueConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => QueueConfig::default(),
    };
    debug!(table = %config.table, store = ?config.store, "configuration loaded");

    let store = config.open_store().context("opening queue store")?;
    let mailer = Arc::new(LogMailer::new(config.transport.clone()));
    let queue = MailQueue::builder()
        .config(config)
        .store(store)
        .mailer(mailer)
        .build()?;

    match cli.command {
        Commands::Init => {
            queue.install().await?;
            println!("table `{}` ready", queue.config().table);
        }
        Commands::Enqueue {
            from,
            to,
            subject,
            body,
            delay_secs,
        } => {
            let mut message = OutboundMessage::new(from);
            for address in to {
                message = message.with_to(address);
            }
            if let Some(subject) = subject {
                message = message.with_subject(subject);
            }
            if let Some(body) = body {
                message = message.with_text_body(body);
            }
            let time_to_send = delay_secs.map(send_time_after).transpose()?;
            let id = message.queue(&queue, time_to_send).await?;
            println!("{id}");
        }
        Commands::Process => {
            let report = queue.process_round().await?;
            println!(
                "selected {} sent {} failed {} undecodable {} dead-lettered {}",
                report.selected, report.sent, report.failed, report.undecodable, report.dead_lettered
            );
            if let Some(purged) = report.purged {
                println!("purged {purged}");
            }
            if !report.is_success() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Purge => {
            let deleted = queue.purge().await?;
            println!("purged {deleted}");
        }
        Commands::Status { format } => {
            let counts = queue.status().await?;
            match format {
                Format::Text => {
                    println!("scheduled     {}", counts.scheduled);
                    println!("pending       {}", counts.pending);
                    println!("sent          {}", counts.sent);
                    println!("dead-lettered {}", counts.dead_lettered);
                }
                Format::Json => println!("{}", serde_json::to_string_pretty(&counts)?),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Now plus `delay_secs`, or an error when that leaves chrono's range.
fn send_time_after(delay_secs: i64) -> anyhow::Result<DateTime<Utc>> {
    Duration::try_seconds(delay_secs)
        .and_then(|delay| Utc::now().checked_add_signed(delay))
        .with_context(|| format!("--delay-secs {delay_secs} is out of range"))
}
