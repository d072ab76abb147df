//! CLI for the DeskAgent Gateway

pub mod serve;

use clap::{Parser, Subcommand};

/// DeskAgent Gateway - local API authentication and key management
#[derive(Parser)]
#[command(name = "deskagent-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway server
    Serve,
}
