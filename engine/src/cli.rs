//! CLI interface for Kisum
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kisum Key Information summary generator
///
/// Summarizes a long study document section by section with retrieval
/// augmented question answering, and prints the assembled Key Information text.
#[derive(Parser, Debug)]
#[command(name = "kisum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the summary of a document
    Summarize {
        /// Document to summarize (.txt, .md, .docx, .pdf)
        file: PathBuf,

        /// Also write the summary to this file
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Section plan to use instead of the configured one
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,
    },

    /// Show the sections and fallbacks of a section plan
    Plan {
        /// Section plan to show instead of the configured one
        #[arg(long, value_name = "PATH")]
        plan: Option<PathBuf>,
    },

    /// Check configuration, section plan, credentials and provider health
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_summarize() {
        let cli = Cli::parse_from([
            "kisum",
            "--json",
            "summarize",
            "protocol.txt",
            "-o",
            "summary.txt",
        ]);

        assert!(cli.json);
        match cli.command {
            Command::Summarize { file, output, plan } => {
                assert_eq!(file, PathBuf::from("protocol.txt"));
                assert_eq!(output, Some(PathBuf::from("summary.txt")));
                assert!(plan.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["kisum", "plan", "--log", "debug", "--config", "c.toml"]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        assert!(matches!(cli.command, Command::Plan { plan: None }));
    }
}
