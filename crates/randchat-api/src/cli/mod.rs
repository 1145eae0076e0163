//! CLI command definitions for the `randchat` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod show;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Anonymous one-to-one chat roulette.
#[derive(Parser)]
#[command(name = "randchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP/WebSocket chat server.
    Serve {
        /// Port to listen on (defaults to `server.port` from config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` from config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Service status: user counts, talks, storage.
    Status,

    /// Show a stored user record.
    Show {
        /// Numeric user id.
        user_id: i64,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

impl Cli {
    /// Default tracing directives for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,randchat=debug",
            _ => "trace",
        }
    }
}
