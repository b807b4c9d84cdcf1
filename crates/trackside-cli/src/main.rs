use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trackside_cli::commands::{data, events, insights, standings, status};
use trackside_cli::{Cli, Commands, Config};

/// Load config, letting the `--data-root` and `--event` flags win over every other layer.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_data_root(cli.data_root.clone())
        .with_event(cli.event.clone());
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON output stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(&cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Status => status::run(&mut out, &config)?,
        Commands::Events { json } => events::run(&mut out, &config, *json)?,
        Commands::Data { json } => data::run(&mut out, &config, *json)?,
        Commands::Standings { json } => standings::run(&mut out, &config, *json)?,
        Commands::Insights { kind, json } => insights::run(&mut out, &config, *kind, *json)?,
    }

    out.flush()?;
    Ok(())
}
