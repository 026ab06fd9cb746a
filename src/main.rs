//! erc360-panel command line
//!
//! Drives the structure page interactions against a live server and wallet
//! node: structure refresh, retried form submission, deposit, and amount
//! formatting.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use erc360_panel::amount::format_amount;
use erc360_panel::channel::{FormFields, HttpTransport, RetryChannel, SubmissionStatus};
use erc360_panel::config::Config;
use erc360_panel::refresh::{update_structure, Stage, StructureAddress};
use erc360_panel::session::SessionStore;
use erc360_panel::surface::{MemorySurface, RECIPIENT_ELEMENT, STRUCTURE_PANEL};
use erc360_panel::wallet::{DepositInitiator, DepositOutcome, JsonRpcWallet};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", env = "PANEL_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute a structure on the server and print its new markup
    Refresh {
        #[arg(short, long)]
        address: String,
    },
    /// Submit form fields, resubmitting on failure
    Submit {
        #[arg(short, long)]
        endpoint: String,
        /// Form field as name=value; repeatable
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    /// Send the fixed deposit from the connected wallet
    Deposit {
        /// Structure address receiving the deposit
        #[arg(short, long)]
        recipient: String,
    },
    /// Print the sanitized form of an amount
    FormatAmount { text: String },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.json_logs)?;
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    let surface = Arc::new(MemorySurface::new());
    let (_session, plan) = SessionStore::new(&config.session.state_path)
        .initialize()
        .context("Failed to initialize session")?;
    plan.unload(&*surface).await;

    match args.command {
        Command::Refresh { address } => {
            let address = StructureAddress::new(&address)?;
            let transport = Arc::new(HttpTransport::new(
                &config.server.base_url,
                config.server.timeout(),
            )?);
            let (stage, error) =
                update_structure(transport, surface.clone(), config.refresh_options(), address)
                    .await;
            match stage {
                Stage::Done => {
                    println!("{}", surface.markup(STRUCTURE_PANEL).unwrap_or_default());
                }
                _ => {
                    return Err(anyhow!(
                        "refresh ended in stage {}: {}",
                        stage,
                        error.map(|e| e.to_string()).unwrap_or_default()
                    ))
                }
            }
        }

        Command::Submit { endpoint, fields } => {
            let transport = Arc::new(HttpTransport::new(
                &config.server.base_url,
                config.server.timeout(),
            )?);
            let channel = RetryChannel::new(transport, config.retry.policy());
            let (tx, mut rx) = mpsc::unbounded_channel();
            let handle = channel.submit(
                endpoint,
                move |response| {
                    let _ = tx.send(response.body);
                },
                fields.into_iter().collect::<FormFields>(),
            );
            info!(submission_id = %handle.id(), "Submission started");

            tokio::select! {
                status = handle.finished() => match status {
                    SubmissionStatus::Delivered { .. } => {
                        if let Some(body) = rx.recv().await {
                            println!("{}", body);
                        }
                    }
                    SubmissionStatus::GaveUp { attempts, error } => {
                        return Err(anyhow!("gave up after {} attempts: {}", attempts, error));
                    }
                    SubmissionStatus::Cancelled { .. } => {}
                },
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, abandoning submission");
                }
            }
        }

        Command::Deposit { recipient } => {
            let page = Arc::new(MemorySurface::new().with_text(RECIPIENT_ELEMENT, &recipient));
            let wallet = Arc::new(JsonRpcWallet::new(
                &config.wallet.rpc_url,
                config.server.timeout(),
            )?);
            let initiator = DepositInitiator::new(wallet, page)?
                .with_amount(&config.wallet.deposit_ether)?
                .require_main_network(config.wallet.require_main_network);

            match initiator.open_deposit_window().await {
                DepositOutcome::Sent { tx_hash } => println!("{}", tx_hash),
                other => info!(outcome = ?other, "No deposit sent"),
            }
        }

        Command::FormatAmount { text } => {
            println!("{}", format_amount(&text));
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "erc360_panel=debug,info"
    } else {
        "erc360_panel=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("name=Alice").unwrap(),
            ("name".to_string(), "Alice".to_string())
        );
        assert_eq!(
            parse_field("eq=a=b").unwrap(),
            ("eq".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
    }

    #[test]
    fn test_cli_parses_submit() {
        let args = Args::try_parse_from([
            "erc360-panel",
            "submit",
            "--endpoint",
            "/save",
            "--field",
            "a=1",
            "--field",
            "b=2",
        ])
        .unwrap();
        match args.command {
            Command::Submit { endpoint, fields } => {
                assert_eq!(endpoint, "/save");
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
