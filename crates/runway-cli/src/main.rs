//! Runway CLI - inventory runway report.
//!
//! The main entry point for the `runway` binary.

use anyhow::Result;
use clap::Parser;
use runway_core::init_logging;
use tokio_util::sync::CancellationToken;

use runway_cli::interrupt::{INTERRUPTED_EXIT_CODE, watch_interrupts};
use runway_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format.into());
    let config = cli.config()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        tokio::spawn(watch_interrupts(tokio::signal::ctrl_c, cancel.clone(), || {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }));

        match cli.command {
            Commands::Run(args) => runway_cli::commands::run::execute(args, &config, &cancel).await,
            Commands::Forecast(args) => {
                runway_cli::commands::forecast::execute(args, &config, &cancel).await
            }
            Commands::Path(args) => runway_cli::commands::path::execute(&args, &config),
        }
    })
}
