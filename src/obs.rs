//! Optional observability helpers for registry operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (default) to emit structured spans named `dex_registry.op` with the `op`
//!   and `stage` fields, plus warnings for skipped fragments and errors for failed activations.
//! - Enable `metrics` to increment the `dex_registry_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Registry operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Directory listing.
	List,
	/// Single fragment read.
	Get,
	/// Fragment creation.
	Create,
	/// Whole-record replacement.
	Update,
	/// Fragment removal.
	Delete,
	/// Regenerate + restart cycle.
	Activate,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::List => "list",
			OpKind::Get => "get",
			OpKind::Create => "create",
			OpKind::Update => "update",
			OpKind::Delete => "delete",
			OpKind::Activate => "activate",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a registry operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
