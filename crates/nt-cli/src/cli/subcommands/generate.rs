use clap::{Args, Subcommand};

use super::shared::{NessieArgs, S3Args};

/// Where generated tables store their files.
#[derive(Clone, Debug, Subcommand)]
pub enum GenerateTarget {
    /// Warehouse in S3.
    S3(GenerateS3Args),
    /// Warehouse on the local filesystem.
    Local(GenerateArgs),
}

#[derive(Clone, Debug, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub nessie: NessieArgs,

    /// Root location for table files.
    #[arg(short, long)]
    pub warehouse: String,

    /// Number of tables to create [default: 100]
    #[arg(long, visible_alias = "tc")]
    pub tables_count: Option<usize>,

    /// Snapshots appended to each table [default: 2]
    #[arg(long, visible_alias = "ts")]
    pub snapshots_count: Option<usize>,
}

#[derive(Clone, Debug, Args)]
pub struct GenerateS3Args {
    #[command(flatten)]
    pub generate: GenerateArgs,

    #[command(flatten)]
    pub s3: S3Args,
}
