//! svault - inspect and maintain stored settings.

use clap::Parser;
use settings_vault::cli::{Cli, Commands};
use settings_vault::commands::{self, Output};
use settings_vault::config::resolve_config;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling log output (e.g. `SVAULT_LOG=debug`).
const LOG_ENV: &str = "SVAULT_LOG";

fn main() {
    init_logging();

    let cli = Cli::parse();
    let human = cli.human_readable;

    if let Err(e) = run_command(cli, human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", commands::error_json(&e.to_string()));
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_command(cli: Cli, human: bool) -> Result<(), settings_vault::Error> {
    let config = resolve_config(&cli.overrides())?;
    tracing::debug!(dir = %config.dir().display(), format = %config.format(), "resolved configuration");

    match cli.command {
        Commands::Encrypt { value } => {
            let result = commands::encrypt(&config, &value)?;
            output(&result, human);
        }
        Commands::Decrypt { value } => {
            let result = commands::decrypt(&config, &value)?;
            output(&result, human);
        }
        Commands::Check { name, fix } => {
            let result = commands::check(&config, &name, fix)?;
            output(&result, human);
        }
        Commands::Purge { name, backup } => {
            let result = commands::purge(&config, &name, backup)?;
            output(&result, human);
        }
        Commands::List => {
            let result = commands::list(&config)?;
            output(&result, human);
        }
        Commands::Config => {
            let result = commands::config_show(&config)?;
            output(&result, human);
        }
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
