use clap::Parser;

pub mod root_commands;
pub mod subcommands;

pub use root_commands::Commands;

/// Top-level CLI parser for the `nessie-tools` binary.
#[derive(Debug, Parser)]
#[command(
    name = "nessie-tools",
    version,
    about = "Generate synthetic Nessie tables and audit their metadata accessibility"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}
