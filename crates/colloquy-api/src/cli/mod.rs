//! CLI command definitions for the `clqy` binary.
//!
//! Uses clap derive macros for argument parsing. The binary has two
//! front ends: an interactive terminal chat (`clqy chat`) and a REST
//! API server (`clqy serve`). Both speak to the same command router.

pub mod chat;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Multi-user conversational session manager.
#[derive(Parser)]
#[command(name = "clqy", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans via OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Chat interactively from the terminal.
    Chat {
        /// User identity to chat as.
        #[arg(long, default_value = "local")]
        user: String,
    },

    /// Run the REST API server.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value_t = 8610)]
        port: u16,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}
