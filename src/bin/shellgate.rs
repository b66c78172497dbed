//! shellgate CLI - the SSH login gate
//!
//! Meant to run as the forced entry point of an SSH account: `login`
//! challenges for a one-time password and execs the operator's shell on
//! success. `setup`, `test` and `reset` manage the enrolled credential.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shellgate::{
    challenge::{Challenge, Outcome, StdinPrompt},
    config::Config,
    enroll, session,
};

#[derive(Parser)]
#[command(name = "shellgate")]
#[command(about = "TOTP second factor for interactive SSH logins")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the credential file (defaults to ~/.shellgate.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Challenge for a one-time password, then exec the login shell
    Login,

    /// Run the challenge without granting a shell
    Test,

    /// Provision a secret and print the enrollment URI
    Setup,

    /// Remove the stored secret
    Reset,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shellgate=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load_from(&config_path)?;

    match cli.command {
        Commands::Login => login(&config),
        Commands::Test => test(&config),
        Commands::Setup => setup(config, &config_path),
        Commands::Reset => reset(config, &config_path),
    }
}

fn login(config: &Config) -> anyhow::Result<()> {
    let mut prompt = StdinPrompt::new();

    match Challenge::new(config).run(&mut prompt)? {
        Outcome::Admit => {
            let command = session::ssh_command();
            Err(session::handoff(command.as_deref()).into())
        }
        Outcome::Deny => session::deny(),
    }
}

fn test(config: &Config) -> anyhow::Result<()> {
    if !config.is_enrolled() {
        println!("\nTest failed!");
        std::process::exit(1);
    }

    let mut prompt = StdinPrompt::new();
    match Challenge::new(config).run(&mut prompt)? {
        Outcome::Admit => {
            println!("Successful!");
            Ok(())
        }
        Outcome::Deny => {
            println!("\nTest failed!");
            std::process::exit(1);
        }
    }
}

fn setup(mut config: Config, path: &Path) -> anyhow::Result<()> {
    if !config.is_enrolled() {
        config.set_secret(enroll::generate_secret());
        config.save_to(path)?;
    }

    let uri = enroll::enrollment_uri(&config.secret, &enroll::operator(), &enroll::host());

    println!("Secret: {}", config.secret);
    println!("URI: {uri}");
    println!("QR code: {}", enroll::qr_url(&uri));
    Ok(())
}

fn reset(mut config: Config, path: &Path) -> anyhow::Result<()> {
    config.clear_secret();
    config.save_to(path)?;

    println!("Secret removed.");
    Ok(())
}
