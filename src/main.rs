//! Interaction FSM command-line front-end

use clap::Parser;
use interaction_fsm::{Config, Result, VERSION, cli, init_file_logging, init_logging};

fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let config = if let Some(config_path) = &args.config {
        Config::from_file(config_path)?
    } else {
        Config::load()?
    };

    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    match &config.logging.file {
        Some(path) => init_file_logging(level, path)?,
        None => init_logging(level),
    }

    tracing::info!("Interaction FSM v{}", VERSION);
    tracing::debug!("Parsed arguments: {:?}", args);
    tracing::debug!("Loaded configuration: {:?}", config);

    cli::execute(args, config)
}
