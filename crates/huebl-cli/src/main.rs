use anyhow::Result;
use clap::Parser;
use huebl_cli::cli::{Cli, Commands, ConfigAction};
use huebl_cli::commands::{cmd_config, cmd_discover, cmd_set, cmd_state};
use huebl_cli::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // An explicit --config must exist, except when it is being created or located.
    let creating = matches!(
        cli.command,
        Commands::Config {
            action: ConfigAction::Init { .. } | ConfigAction::Path
        }
    );
    let path = cli.config.clone().unwrap_or_else(Config::path);
    let config = if creating {
        Config::default()
    } else {
        Config::load(&path, cli.config.is_some())?
    };

    match cli.command {
        Commands::Discover { timeout, output } => {
            cmd_discover(&config, timeout, &output, cli.quiet).await
        }
        Commands::State { light, output } => cmd_state(&config, light.light, &output).await,
        Commands::Set { light, change } => cmd_set(&config, light.light, &change, cli.quiet).await,
        Commands::Config { action } => cmd_config(&action, &config, &path),
    }
}
