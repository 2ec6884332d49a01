use std::{io::IsTerminal, path::PathBuf};

use clap::Parser;
use grist_launcher::{
    exit_notice, user_home_dir, BollardEngine, ContainerSpec, LaunchConfig, Launcher, Outcome, Relay,
    Termination,
};
use stacked_errors::{Result, StackableErr};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs Grist in a local docker container until it exits or you hit ctrl-c
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Host directory mounted at `/persist`, defaults to `<home>/grist`
    #[arg(long, env = "GRIST_DIR")]
    dir: Option<PathBuf>,
    /// Email given to Grist as `GRIST_DEFAULT_EMAIL`
    #[arg(long, env = "GRIST_DEFAULT_EMAIL")]
    email: Option<String>,
    /// Remove a leftover `gristcontainer` before creating a new one
    #[arg(long)]
    replace: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    // installed before anything else so an early signal is not lost
    let mut termination = Termination::register().stack()?;

    let config = LaunchConfig::resolve(args.dir, args.email, user_home_dir())
        .await
        .stack()?;

    let engine = BollardEngine::connect()
        .await
        .stack_err("could not connect to the docker daemon")?;

    let outcome = Launcher::new(&engine, ContainerSpec::grist(&config))
        .replace_existing(args.replace)
        .run(termination.recv(), &mut Relay::stdio())
        .await
        .stack()?;
    match outcome {
        Outcome::Exited { status_code } => info!("Grist exited with status {status_code}"),
        Outcome::TornDown => info!("Grist container stopped and removed"),
        Outcome::Interrupted => info!("interrupted before the container was created"),
    }

    println!("{}", exit_notice(std::io::stdout().is_terminal()));
    Ok(())
}
