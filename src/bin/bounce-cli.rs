#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for scanning bounce mailboxes and inspecting the logs

use bounce_processor::{
    BounceClassifier, BounceProcessor, FileStore, RunnerConfig, SmtpClient,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bounce-cli")]
#[command(
    about = "Scan IMAP mailboxes for bounces and relay notifications"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one mailbox for bounces
    Scan {
        /// Mailbox id from the config file
        mailbox_id: u32,

        /// Maximum number of messages to examine
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// List configured mailboxes
    Mailboxes,

    /// Show recent activity log entries
    Activity {
        /// Maximum number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show recorded bounces
    Bounces {
        /// Maximum number of records to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Test connectivity to the configured SMTP relay
    SmtpTest,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let runner = RunnerConfig::from_env();
    let store = FileStore::open(&runner.config_path)?;

    match &args.command {
        Command::Scan { mailbox_id, limit } => {
            cmd_scan(&store, &runner, &args, *mailbox_id, *limit).await;
        }
        Command::Mailboxes => {
            cmd_mailboxes(&store, &args)?;
        }
        Command::Activity { limit } => {
            cmd_activity(&store, &args, *limit)?;
        }
        Command::Bounces { limit } => {
            cmd_bounces(&store, &args, *limit)?;
        }
        Command::SmtpTest => {
            cmd_smtp_test(&store, &runner).await;
        }
    }

    Ok(())
}

async fn cmd_scan(
    store: &FileStore,
    runner: &RunnerConfig,
    args: &Args,
    mailbox_id: u32,
    limit: usize,
) {
    let classifier =
        BounceClassifier::with_extra_patterns(&store.config().bounce_patterns);
    let processor = BounceProcessor::new(store, store, store, store)
        .with_classifier(classifier)
        .with_local_name(runner.helo_name.clone());

    let outcome = processor.scan(mailbox_id, limit).await;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome)
                .unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("Processed {} bounce(s)", outcome.processed);
        if let Some(error) = &outcome.error {
            println!("Error: {error}");
        }
    }
}

fn cmd_mailboxes(store: &FileStore, args: &Args) -> anyhow::Result<()> {
    let mailboxes = store.mailboxes();

    if args.json {
        println!("{}", serde_json::to_string_pretty(mailboxes)?);
        return Ok(());
    }

    if mailboxes.is_empty() {
        println!("No mailboxes configured.");
        return Ok(());
    }

    let header = format!(
        "{:<6} {:<16} {:<30} {:<6} {}",
        "ID", "Name", "Host", "Port", "Security"
    );
    println!("{header}");
    println!("{}", "-".repeat(70));
    for mb in mailboxes {
        println!(
            "{:<6} {:<16} {:<30} {:<6} {}",
            mb.id,
            truncate(&mb.name, 14),
            truncate(&mb.host, 28),
            mb.port,
            mb.effective_security(),
        );
    }
    println!("\n{} mailbox(es)", mailboxes.len());
    Ok(())
}

fn cmd_activity(store: &FileStore, args: &Args, limit: usize) -> anyhow::Result<()> {
    let events = store.read_activity()?;
    let start = events.len().saturating_sub(limit);
    let recent = &events[start..];

    if args.json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }

    for event in recent {
        println!(
            "{}  {:<24} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.action,
            event.details,
        );
    }
    Ok(())
}

fn cmd_bounces(store: &FileStore, args: &Args, limit: usize) -> anyhow::Result<()> {
    let records = store.read_bounces()?;
    let start = records.len().saturating_sub(limit);
    let recent = &records[start..];

    if args.json {
        println!("{}", serde_json::to_string_pretty(recent)?);
        return Ok(());
    }

    if recent.is_empty() {
        println!("No bounces recorded.");
        return Ok(());
    }

    for record in recent {
        println!(
            "mailbox {:<4} {:<30} {} {}  to: {}  cc: {}",
            record.mailbox_id,
            truncate(&record.subject, 28),
            record.code,
            record.diagnostic,
            record.original_to,
            record.cc_addresses,
        );
    }
    Ok(())
}

async fn cmd_smtp_test(store: &FileStore, runner: &RunnerConfig) {
    let settings = store.config().smtp.clone();
    if settings.host.trim().is_empty() {
        println!("No SMTP relay configured; notifications use the platform sendmail.");
        return;
    }

    println!("Probing {} ...", settings.addr());
    let mut client = SmtpClient::new(settings)
        .with_local_name(runner.helo_name.clone())
        .with_transcript();
    let result = client.probe().await;

    if let Some(transcript) = client.transcript() {
        for line in transcript.lines() {
            println!("  {line}");
        }
    }

    match result {
        Ok(()) => println!("Relay reachable."),
        Err(e) => println!("Relay test failed: {e}"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String =
            s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
