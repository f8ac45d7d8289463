//! # nt-engine
//!
//! The two workflows of nessie-tools:
//!
//! - [`ProvisioningEngine`]: creates `table<R><i>` tables on the default
//!   branch in parallel, each with a chain of fast-append snapshots copied from
//!   one shared template file, then sets GC and commit-retry properties.
//! - [`AuditEngine`]: walks every reference (and optionally its full commit
//!   log), checks each table's metadata location with an
//!   [`AccessibilityChecker`] and streams [`nt_core::AuditFinding`]s.
//!
//! Both take their collaborators as `Arc<dyn Trait>` so callers pick the
//! catalog and storage backends at startup.

pub mod audit;
pub mod checker;
mod error;
pub mod provisioning;
pub mod template;

pub use audit::{AuditEngine, AuditOptions, AuditRun, ProcessedCommitSet};
pub use checker::{AccessibilityChecker, StorageChecker};
pub use error::{AuditError, CheckError, GenerationError, SetupError, WorkUnitError};
pub use provisioning::{GenerationEvent, GenerationSummary, ProgressFn, ProvisioningEngine};
