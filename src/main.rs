//! `waldorf` CLI: inspect and re-render recorded per-test profiling runs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use waldorf::{Config, ProfileCommand, profile_command};

mod cli_logger;

use cli_logger::CliLogger;

#[derive(Debug, Parser)]
#[command(
    name = "waldorf",
    version,
    about = "Per-test CPU profiling and call graphs for HTML test reports"
)]
struct Cli {
    /// Emit machine-readable JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,

    /// Path to the config file.
    #[arg(long, global = true, default_value = "waldorf.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: ProfileCommand,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logger = CliLogger::new(cli.json, cli.no_color);
    let config = Config::load_optional(&cli.config);

    match profile_command(&config, &cli.command) {
        Ok(value) => {
            if let Err(err) = logger.print_serialized(&value) {
                logger.print_error(&err.to_string());
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            logger.print_error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}
