//! Defaults for the generate and audit commands.

use serde::{Deserialize, Serialize};

const fn default_tables_count() -> usize {
    100
}

const fn default_snapshots_count() -> usize {
    2
}

const fn default_parallelism() -> usize {
    8
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Number of tables to create.
    #[serde(default = "default_tables_count")]
    pub tables_count: usize,

    /// Snapshots appended to each table.
    #[serde(default = "default_snapshots_count")]
    pub snapshots_count: usize,

    /// Tables provisioned concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tables_count: default_tables_count(),
            snapshots_count: default_snapshots_count(),
            parallelism: default_parallelism(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Only report tables that are not accessible.
    #[serde(default)]
    pub errors_only: bool,

    /// Skip the commit-log walk and check reference heads only.
    #[serde(default = "default_true")]
    pub check_heads_only: bool,

    /// Concurrent references, and concurrent checks per reference.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            errors_only: false,
            check_heads_only: default_true(),
            parallelism: default_parallelism(),
        }
    }
}
