use clap::Subcommand;

use crate::cli::subcommands::{CheckTarget, GenerateTarget};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Create tables with synthetic snapshot histories.
    GenerateTables {
        #[command(subcommand)]
        target: GenerateTarget,
    },
    /// Check that the metadata of every table in the catalog is reachable.
    CheckAccessibility {
        #[command(subcommand)]
        target: CheckTarget,
    },
}
