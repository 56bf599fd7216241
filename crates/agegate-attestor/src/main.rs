use agegate_attestor::cli::{
    handle_attest, handle_commit, init_logging, run_server, Cli, Commands,
};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli);

    match &cli.command {
        Commands::Run { listen, port } => {
            run_server(&cli, listen.clone(), *port).await?;
        }
        Commands::Commit { age, salt } => {
            handle_commit(*age, salt.clone())?;
        }
        Commands::Attest {
            age,
            salt,
            minimum_age,
            commitment,
            user_id,
            key,
        } => {
            handle_attest(&cli, *age, salt, *minimum_age, commitment, user_id, key.clone())?;
        }
    }

    Ok(())
}
