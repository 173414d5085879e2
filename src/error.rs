//! Registry-level error types shared across the store, codec, and activation layers.

// self
use crate::{
	_prelude::*,
	activation::ActivationError,
	client::{ClientRecord, Filename, ValidationError},
	codec::DecodeError,
	config::ConfigError,
};

/// Registry-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical registry error exposed by public APIs.
///
/// Every variant except [`Error::Activation`] guarantees the failing call left the client
/// directory untouched. [`Error::Activation`] means the change is on disk but the identity
/// provider is still serving the previous configuration.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Required client fields are missing or blank.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Fragment content does not match the client schema.
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// Registry configuration is unusable.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// No fragment exists for the requested filename.
	#[error("Client fragment `{filename}` does not exist.")]
	NotFound {
		/// Filename that was looked up.
		filename: Filename,
	},
	/// Client record could not be rendered as fragment text.
	#[error("Client record could not be encoded.")]
	Encode(#[source] serde_yaml::Error),
	/// Filesystem failure (permission denied, disk full, etc.).
	#[error("I/O error while trying to {context}.")]
	Io {
		/// Operation that failed, including the affected path.
		context: String,
		/// Underlying filesystem error.
		#[source]
		source: std::io::Error,
	},
	/// The change was persisted but regenerate or restart failed afterwards.
	#[error("Client change was persisted but not activated.")]
	Activation {
		/// Change that is already on disk.
		change: PersistedChange,
		/// Failed activation step and its diagnostics.
		#[source]
		source: ActivationError,
	},
	/// Caller passed an argument outside the accepted range.
	#[error("Invalid argument `{name}`: {reason}.")]
	InvalidArgument {
		/// Argument name.
		name: &'static str,
		/// Why the value was rejected.
		reason: String,
	},
}
impl Error {
	/// Wraps a filesystem error with the attempted operation.
	pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
		Self::Io { context: context.into(), source }
	}

	/// Returns the on-disk change that is not yet active, if this is an activation failure.
	pub fn persisted_change(&self) -> Option<&PersistedChange> {
		match self {
			Self::Activation { change, .. } => Some(change),
			_ => None,
		}
	}

	/// Returns `true` when the client directory and the running service now disagree.
	pub fn is_persisted_but_inactive(&self) -> bool {
		self.persisted_change().is_some()
	}
}

/// Mutation that reached the client directory before activation failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistedChange {
	/// A fragment was created or replaced.
	Written {
		/// Fragment filename.
		filename: Filename,
		/// Record as persisted.
		record: ClientRecord,
	},
	/// A fragment was removed.
	Removed {
		/// Fragment filename.
		filename: Filename,
	},
}
impl PersistedChange {
	/// Filename affected by the change.
	pub fn filename(&self) -> &Filename {
		match self {
			Self::Written { filename, .. } | Self::Removed { filename } => filename,
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;
	use crate::activation::{ActivationStep, StepFailure};

	#[test]
	fn activation_error_exposes_change_and_source() {
		let filename = Filename::new("app.yaml").expect("Filename fixture should be valid.");
		let failure = ActivationError {
			step: ActivationStep::Restart,
			failure: StepFailure::Exit { code: Some(1), output: "unit dex not found".into() },
		};
		let error = Error::Activation {
			change: PersistedChange::Removed { filename: filename.clone() },
			source: failure,
		};

		assert!(error.is_persisted_but_inactive());
		assert_eq!(error.persisted_change().map(PersistedChange::filename), Some(&filename));
		assert_eq!(error.to_string(), "Client change was persisted but not activated.");

		let source = StdError::source(&error)
			.expect("Activation error should expose the failed step as its source.");

		assert_eq!(source.to_string(), "The restart step failed.");

		let failure = StdError::source(source).expect("Failed step should expose its diagnostics.");

		assert_eq!(failure.to_string(), "exited with status 1: unit dex not found");
	}

	#[test]
	fn non_activation_errors_report_nothing_persisted() {
		let filename = Filename::new("missing.yaml").expect("Filename fixture should be valid.");
		let error = Error::NotFound { filename };

		assert!(!error.is_persisted_but_inactive());
		assert_eq!(error.to_string(), "Client fragment `missing.yaml` does not exist.");
	}
}
