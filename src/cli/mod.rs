//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::event::EventId;
use crate::{Config, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// Interaction FSM CLI
#[derive(Parser, Debug)]
#[command(name = "interaction-fsm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (overrides config)
    #[arg(long, global = true, env = "INTERACTION_FSM_LOG")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a behavior file and report patterns, events and problems
    Validate {
        /// Behavior description file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Print a pattern as Graphviz DOT
    Dot {
        /// Behavior description file
        file: PathBuf,

        /// Pattern name
        #[arg(short, long)]
        pattern: String,
    },

    /// Drive one machine with a sequence of event ids
    Replay {
        /// Behavior description file
        file: PathBuf,

        /// Pattern name
        #[arg(short, long)]
        pattern: String,

        /// Comma separated event ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        events: Vec<EventId>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
}

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text table
    Table,
}

/// Execute the CLI command
pub fn execute(args: Cli, config: Config) -> Result<()> {
    match args.command {
        Commands::Validate { file, output } => commands::validate::execute(&file, output),
        Commands::Dot { file, pattern } => commands::dot::execute(&file, &pattern),
        Commands::Replay {
            file,
            pattern,
            events,
            output,
        } => commands::replay::execute(&config, &file, &pattern, &events, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from([
            "interaction-fsm",
            "replay",
            "behavior.xml",
            "--pattern",
            "toggle",
            "--events",
            "10,11,10",
        ])
        .unwrap();

        match cli.command {
            Commands::Replay { events, output, .. } => {
                assert_eq!(events, vec![10, 11, 10]);
                assert_eq!(output, OutputFormat::Table);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validate_requires_file() {
        assert!(Cli::try_parse_from(["interaction-fsm", "validate"]).is_err());
        assert!(Cli::try_parse_from(["interaction-fsm", "validate", "b.xml", "-o", "json"]).is_ok());
    }
}
