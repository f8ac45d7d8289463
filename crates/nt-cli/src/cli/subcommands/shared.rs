use clap::Args;

/// Catalog endpoint override.
#[derive(Clone, Debug, Default, Args)]
pub struct NessieArgs {
    /// Nessie REST API v2 base URI [default: http://localhost:19120/api/v2]
    #[arg(long)]
    pub nessie_uri: Option<String>,
}

/// S3 connection overrides.
#[derive(Clone, Debug, Default, Args)]
pub struct S3Args {
    /// AWS access key id.
    #[arg(long, visible_alias = "ak")]
    pub aws_access_key: Option<String>,

    /// AWS secret access key.
    #[arg(long, visible_alias = "as")]
    pub aws_secret_key: Option<String>,

    /// AWS region code [default: us-west-2]
    #[arg(long, visible_alias = "ar")]
    pub aws_region_code: Option<String>,

    /// Custom S3-compatible endpoint (e.g. MinIO).
    #[arg(long)]
    pub s3_endpoint: Option<String>,
}
