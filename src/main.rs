use anyhow::Result;
use clap::{Parser, Subcommand};
use fxproxy::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Start the conversion proxy (default)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Setup) = cli.command {
        let path = fxproxy::cli::setup::setup()?;
        println!("Created default configuration at {}", path.display());
        return Ok(());
    }

    let config = fxproxy::load_config(cli.config_path.as_deref())?;
    let _guards = init_logging(cli.verbose, &config.logging)?;

    let result = fxproxy::run(config).await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
