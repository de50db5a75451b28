//! BeToCQ CLI entry point

use clap::Parser;
use tracing::{error, info};

use betocq_cli::{cli::Cli, commands, logging, CliError};

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    logging::init(cli.verbose);

    // Execute the command
    match commands::execute(cli) {
        Ok(()) => {
            info!("BeToCQ finished successfully");
            Ok(())
        }
        Err(e @ CliError::ScenariosFailed { .. }) => {
            error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
