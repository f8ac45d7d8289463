use clap::{ArgAction, Args, Subcommand};

use super::shared::{NessieArgs, S3Args};

/// Which storage the audited metadata lives in.
#[derive(Clone, Debug, Subcommand)]
pub enum CheckTarget {
    /// Metadata in S3.
    S3(CheckS3Args),
    /// Metadata on the local filesystem.
    Local(CheckArgs),
}

#[derive(Clone, Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub nessie: NessieArgs,

    /// Only print tables that are not accessible; `--errors-only=false` turns it off.
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub errors_only: Option<bool>,

    /// Check reference heads only; `false` also walks every commit [default: true]
    #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
    pub check_heads_only: Option<bool>,
}

#[derive(Clone, Debug, Args)]
pub struct CheckS3Args {
    #[command(flatten)]
    pub check: CheckArgs,

    #[command(flatten)]
    pub s3: S3Args,
}
