use crate::attestor::Attestor;
use crate::config::AttestorConfig;
use crate::AttestorServer;
use agegate_crypto::{commit, generate_salt};
use agegate_types::{AttestationRequest, SigningPrivateKey};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// AgeGate attestation service.
#[derive(Parser)]
#[command(name = "agegate-attestor")]
#[command(about = "Trusted attestation service for privacy-preserving age verification")]
pub struct Cli {
    /// Path to the config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the attestation HTTP service.
    Run {
        /// Override the bind address.
        #[arg(long)]
        listen: Option<String>,

        /// Override the API port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Compute an age commitment, minting a fresh salt unless one is given.
    Commit {
        #[arg(long)]
        age: u64,

        /// Hex salt; omit to generate a new one.
        #[arg(long)]
        salt: Option<String>,
    },

    /// Run one attestation locally and print the response JSON.
    Attest {
        #[arg(long)]
        age: u64,

        #[arg(long)]
        salt: String,

        #[arg(long)]
        minimum_age: u64,

        #[arg(long)]
        commitment: String,

        #[arg(long)]
        user_id: String,

        /// Signing key (hex); falls back to the configured key.
        #[arg(long)]
        key: Option<String>,
    },
}

pub fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "info,agegate_attestor=debug",
            2 => "debug",
            _ => "trace",
        }
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.verbose >= 2)
        .init();
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".agegate").join("attestor.toml"))
            .unwrap_or_else(|| PathBuf::from("attestor.toml"))
    })
}

fn load_config(cli: &Cli) -> anyhow::Result<AttestorConfig> {
    AttestorConfig::load(config_path(cli)).context("failed to load attestor config")
}

pub async fn run_server(
    cli: &Cli,
    listen: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let mut config = load_config(cli)?;

    if let Some(listen) = listen {
        config.bind_address = listen.parse().context("invalid listen address")?;
    }
    if let Some(port) = port {
        config.port = port;
    }

    let signing_key = config.resolve_signing_key()?;
    let attestor = Arc::new(Attestor::new(signing_key)?);

    let server = AttestorServer::new(&config, attestor);
    server.start().await?;

    info!("Attestor running; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    server.stop().await;
    Ok(())
}

pub fn handle_commit(age: u64, salt: Option<String>) -> anyhow::Result<()> {
    let salt = salt.unwrap_or_else(generate_salt);
    let commitment = commit(age, &salt)?;

    let output = serde_json::json!({
        "age_commitment": commitment,
        "salt": salt,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn handle_attest(
    cli: &Cli,
    age: u64,
    salt: &str,
    minimum_age: u64,
    commitment: &str,
    user_id: &str,
    key: Option<String>,
) -> anyhow::Result<()> {
    let signing_key = match key {
        Some(hex) => Some(SigningPrivateKey::from_hex(&hex)?),
        // No --key given: fall back to whatever the config resolves.
        None => load_config(cli)?.resolve_signing_key()?,
    };

    let attestor = Attestor::new(signing_key)?;
    let request = AttestationRequest {
        age,
        salt: salt.to_string(),
        minimum_age,
        age_commitment: commitment.to_string(),
        user_id: user_id.to_string(),
    };

    let response = attestor.attest(&request);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
