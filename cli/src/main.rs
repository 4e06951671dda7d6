// pushsync — diagnostic CLI for the push subscription endpoints
//
// Talks to the same backend endpoints as the browser client, which makes it
// handy for checking a deployment's VAPID key, replaying a subscription
// captured from a browser, or triggering a test push.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use pushsync_core::{
    decode_vapid_key, HttpSubscriptionApi, PushSubscription, StaticSession, SubscriptionApi,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pushsync")]
#[command(about = "Web push subscription diagnostics", long_about = None)]
#[command(version)]
struct Cli {
    /// Override the configured backend URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the configured bearer token
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the server's VAPID public key
    VapidKey {
        /// Also decode it and check the key format
        #[arg(short, long)]
        decode: bool,
    },
    /// Decode a base64url VAPID key locally
    DecodeKey { key: String },
    /// Register a subscription JSON (as produced by PushSubscription.toJSON())
    Register {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Remove the session's subscription from the server
    Unregister,
    /// Ask the server to send a test notification
    Test,
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    tracing::debug!("using backend {}", config.api_base_url);

    match cli.command {
        Commands::VapidKey { decode } => cmd_vapid_key(&config, decode).await,
        Commands::DecodeKey { key } => cmd_decode_key(&key),
        Commands::Register { file } => cmd_register(&config, &file).await,
        Commands::Unregister => cmd_unregister(&config).await,
        Commands::Test => cmd_test(&config).await,
        Commands::Config { action } => cmd_config(action),
    }
}

fn bridge(config: &config::Config) -> Result<HttpSubscriptionApi<StaticSession>> {
    let session = match &config.token {
        Some(token) => StaticSession::new(token.clone()),
        None => StaticSession::anonymous(),
    };
    HttpSubscriptionApi::new(config.client_config(), session).context("Failed to create HTTP client")
}

/// Print the decoded key's shape and whether a push service would accept it.
fn describe_key(key: &str) -> Result<()> {
    let bytes = decode_vapid_key(key).context("Key is not valid base64url")?;
    println!("  Decoded length: {} bytes", bytes.len());
    if bytes.len() == 65 && bytes[0] == 0x04 {
        println!("  {} Uncompressed P-256 public key", "✓".green());
    } else {
        println!(
            "  {} Expected a 65-byte uncompressed P-256 point (0x04 prefix)",
            "✗".red()
        );
    }
    Ok(())
}

async fn cmd_vapid_key(config: &config::Config, decode: bool) -> Result<()> {
    let key = bridge(config)?
        .fetch_vapid_public_key()
        .await
        .context("Failed to fetch VAPID key")?;
    println!("{}", key);
    if decode {
        describe_key(&key)?;
    }
    Ok(())
}

fn cmd_decode_key(key: &str) -> Result<()> {
    println!("{}", "VAPID key".bold());
    describe_key(key.trim())
}

async fn cmd_register(config: &config::Config, file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let subscription: PushSubscription =
        serde_json::from_str(&contents).context("File is not a push subscription JSON")?;

    bridge(config)?
        .register_subscription(&subscription)
        .await
        .context("Registration failed")?;
    println!("{} Registered {}", "✓".green(), subscription.endpoint);
    Ok(())
}

async fn cmd_unregister(config: &config::Config) -> Result<()> {
    bridge(config)?
        .deregister_subscription()
        .await
        .context("Deregistration failed")?;
    println!("{} Subscription removed from server", "✓".green());
    Ok(())
}

async fn cmd_test(config: &config::Config) -> Result<()> {
    bridge(config)?
        .send_test_notification()
        .await
        .context("Test notification failed")?;
    println!("{} Test notification requested", "✓".green());
    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} {} updated", "✓".green(), key);
        }
        ConfigAction::Get { key } => match config.get(&key) {
            Some(value) => println!("{}", value),
            None => println!("{}", "(not set)".dimmed()),
        },
        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            for (key, value) in config.list() {
                println!("  {:<22} {}", key, value);
            }
            println!();
            println!("  File: {}", config::Config::config_file()?.display());
        }
    }
    Ok(())
}
