//! Accessibility check results and the findings an audit reports.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::ContentKey;

/// Classified outcome of probing a metadata location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Success,
    NotFound,
    AccessDenied,
    Error,
}

impl CheckStatus {
    pub const ALL: [Self; 4] = [Self::Success, Self::NotFound, Self::AccessDenied, Self::Error];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::NotFound => "NOT_FOUND",
            Self::AccessDenied => "ACCESS_DENIED",
            Self::Error => "ERROR",
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
}

impl CheckResult {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: CheckStatus::Success,
            message: "Table metadata is accessible".to_string(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            status: CheckStatus::NotFound,
            message: "Table metadata not found".to_string(),
        }
    }

    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::AccessDenied,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Error,
            message: message.into(),
        }
    }
}

/// Where in the catalog a finding was observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "at")]
pub enum FindingOrigin {
    /// Current state of a reference.
    Head(String),
    /// A historical commit.
    Commit(String),
}

impl fmt::Display for FindingOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Head(name) | Self::Commit(name) => f.write_str(name),
        }
    }
}

/// One accessibility result for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub key: ContentKey,
    pub origin: FindingOrigin,
    pub metadata_location: String,
    pub result: CheckResult,
}

impl AuditFinding {
    #[must_use]
    pub const fn status(&self) -> CheckStatus {
        self.result.status
    }
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table [{}@{}], Metadata [{}], Accessibility Status [{}]",
            self.key, self.origin, self.metadata_location, self.result.status
        )?;
        if !self.result.status.is_success() {
            write!(f, ", Message [{}]", self.result.message)?;
        }
        Ok(())
    }
}

/// Per-status counts over every finding of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTally {
    pub success: usize,
    pub not_found: usize,
    pub access_denied: usize,
    pub error: usize,
}

impl AuditTally {
    pub const fn record(&mut self, status: CheckStatus) {
        match status {
            CheckStatus::Success => self.success += 1,
            CheckStatus::NotFound => self.not_found += 1,
            CheckStatus::AccessDenied => self.access_denied += 1,
            CheckStatus::Error => self.error += 1,
        }
    }

    #[must_use]
    pub const fn count(&self, status: CheckStatus) -> usize {
        match status {
            CheckStatus::Success => self.success,
            CheckStatus::NotFound => self.not_found,
            CheckStatus::AccessDenied => self.access_denied,
            CheckStatus::Error => self.error,
        }
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.success + self.not_found + self.access_denied + self.error
    }
}

impl fmt::Display for AuditTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checked {} tables:", self.total())?;
        for status in CheckStatus::ALL {
            write!(f, " {status}={}", self.count(status))?;
        }
        Ok(())
    }
}
