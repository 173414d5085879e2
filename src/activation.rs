//! Apply-and-activate protocol: regenerate Dex's derived configuration, then restart Dex.
//!
//! Activation is not transactional with persistence. A failed step leaves the fragment
//! directory changed while the running service still reflects the previous configuration;
//! the registry reports that state instead of retrying.

pub mod command;
pub mod recording;

pub use command::*;
pub use recording::*;

// self
use crate::{
	_prelude::*,
	obs::{self, OpKind, OpOutcome},
};

/// Future returned by [`Activator`] steps.
pub type ActivationFuture<'a> =
	Pin<Box<dyn Future<Output = Result<(), StepFailure>> + 'a + Send>>;

/// Side-effecting capability that makes persisted fragments live.
///
/// Implementations must be safe to re-run on an unchanged fragment set.
pub trait Activator
where
	Self: Send + Sync,
{
	/// Rebuilds the aggregate configuration from the fragment directory.
	fn regenerate(&self) -> ActivationFuture<'_>;

	/// Restarts the dependent service so it serves the regenerated configuration.
	fn restart(&self) -> ActivationFuture<'_>;

	/// Human-readable summary used in status reports.
	fn describe(&self) -> String {
		String::from("custom activator")
	}
}

/// Activation steps, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationStep {
	/// Aggregate configuration regeneration.
	Regenerate,
	/// Service restart.
	Restart,
}
impl ActivationStep {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ActivationStep::Regenerate => "regenerate",
			ActivationStep::Restart => "restart",
		}
	}
}
impl Display for ActivationStep {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why a single activation step failed.
#[derive(Debug, ThisError)]
pub enum StepFailure {
	/// The external program could not be started.
	#[error("`{program}` could not be started")]
	Spawn {
		/// Program that failed to launch.
		program: String,
		/// Launch failure.
		#[source]
		source: std::io::Error,
	},
	/// The external program exited unsuccessfully.
	#[error("exited with {}: {output}", exit_label(.code))]
	Exit {
		/// Exit code, absent when the process was killed by a signal.
		code: Option<i32>,
		/// Captured diagnostic output.
		output: String,
	},
	/// The step did not finish within the configured bound.
	#[error("timed out after {after}")]
	TimedOut {
		/// Bound that expired.
		after: Duration,
	},
}

/// Activation failure naming the step that failed.
#[derive(Debug, ThisError)]
#[error("The {step} step failed.")]
pub struct ActivationError {
	/// Step that failed; later steps were not run.
	pub step: ActivationStep,
	/// Failure details and diagnostics.
	#[source]
	pub failure: StepFailure,
}

/// Runs regenerate then restart, short-circuiting on the first failure.
#[derive(Clone)]
pub struct ActivationController {
	activator: Arc<dyn Activator>,
	timeout: Duration,
}
impl ActivationController {
	/// Per-step bound used unless overridden.
	pub const DEFAULT_TIMEOUT: Duration = Duration::seconds(60);

	/// Creates a controller around the provided activator.
	pub fn new(activator: Arc<dyn Activator>) -> Self {
		Self { activator, timeout: Self::DEFAULT_TIMEOUT }
	}

	/// Overrides the per-step timeout; non-positive values fall back to the default.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = if timeout.is_positive() { timeout } else { Self::DEFAULT_TIMEOUT };

		self
	}

	/// Per-step timeout.
	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	/// Underlying activator.
	pub fn activator(&self) -> &Arc<dyn Activator> {
		&self.activator
	}

	/// Regenerates, then restarts only if regeneration succeeded.
	pub async fn activate(&self) -> Result<(), ActivationError> {
		const KIND: OpKind = OpKind::Activate;

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = async {
			self.run_step(ActivationStep::Regenerate).await?;
			self.run_step(ActivationStep::Restart).await
		}
		.await;

		match &result {
			Ok(()) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::error!(
					step = _e.step.as_str(),
					error = %_e.failure,
					"Activation failed; fragments are persisted but not live."
				);

				obs::record_op_outcome(KIND, OpOutcome::Failure);
			},
		}

		result
	}

	async fn run_step(&self, step: ActivationStep) -> Result<(), ActivationError> {
		let span = obs::OpSpan::new(OpKind::Activate, step.as_str());
		let future = match step {
			ActivationStep::Regenerate => self.activator.regenerate(),
			ActivationStep::Restart => self.activator.restart(),
		};
		let outcome =
			span.instrument(tokio::time::timeout(self.timeout.unsigned_abs(), future)).await;

		match outcome {
			Ok(Ok(())) => Ok(()),
			Ok(Err(failure)) => Err(ActivationError { step, failure }),
			Err(_elapsed) =>
				Err(ActivationError { step, failure: StepFailure::TimedOut { after: self.timeout } }),
		}
	}
}
impl Debug for ActivationController {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ActivationController")
			.field("activator", &self.activator.describe())
			.field("timeout", &self.timeout)
			.finish()
	}
}

fn exit_label(code: &Option<i32>) -> String {
	match code {
		Some(code) => format!("status {code}"),
		None => String::from("a signal"),
	}
}
