//! Key generation tool for the AgeGate attestation service.
//!
//! Usage:
//!   cargo run --bin agegate-keygen -- generate --output ./keys
//!   cargo run --bin agegate-keygen -- inspect --key ./keys/attestor.key

use agegate_crypto::{derive_verifying_key, generate_signing_key};
use agegate_types::SigningPrivateKey;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

/// Generate and inspect attestation signing keys.
#[derive(Parser)]
#[command(name = "agegate-keygen")]
#[command(about = "Generate secp256k1 signing keys for the AgeGate attestor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new signing keypair.
    Generate {
        /// Output directory for key files.
        #[arg(short, long, default_value = "./agegate-keys")]
        output: PathBuf,
    },

    /// Print the public key for an existing private key file.
    Inspect {
        /// Path to the private key file (hex).
        #[arg(short, long)]
        key: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { output } => {
            fs::create_dir_all(&output)?;

            let private = generate_signing_key();
            let public = derive_verifying_key(&private)?;

            let key_path = output.join("attestor.key");
            let pub_path = output.join("attestor.pub");

            fs::write(&key_path, private.to_hex())?;
            fs::write(&pub_path, public.to_hex())?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&key_path, fs::Permissions::from_mode(0o600))?;
            }

            println!("Private key: {}", key_path.display());
            println!("Public key:  {}", pub_path.display());
            println!();
            println!("Publish the public key to verifiers:");
            println!("  {}", public.to_hex());
        }

        Commands::Inspect { key } => {
            let contents = fs::read_to_string(&key)?;
            let private = SigningPrivateKey::from_hex(contents.trim())?;
            let public = derive_verifying_key(&private)?;
            println!("{}", public.to_hex());
        }
    }

    Ok(())
}
