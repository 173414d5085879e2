//! In-process [`Activator`] that records invocations instead of touching a real service.

// self
use crate::{
	_prelude::*,
	activation::{ActivationFuture, ActivationStep, Activator, StepFailure},
};

/// Thread-safe activator for tests and dry runs.
///
/// Every step is recorded in call order. A step can be told to fail with a diagnostic, and
/// all steps can be delayed to exercise timeouts.
#[derive(Debug, Default)]
pub struct RecordingActivator {
	calls: Mutex<Vec<ActivationStep>>,
	failure: Mutex<Option<(ActivationStep, String)>>,
	delay: Mutex<Option<Duration>>,
}
impl RecordingActivator {
	/// Makes `step` fail with exit code 1 and the given diagnostic output.
	pub fn fail_on(&self, step: ActivationStep, output: impl Into<String>) {
		*self.failure.lock() = Some((step, output.into()));
	}

	/// Clears any configured failure.
	pub fn succeed(&self) {
		*self.failure.lock() = None;
	}

	/// Delays every step by `delay` before it completes.
	pub fn delay(&self, delay: Duration) {
		*self.delay.lock() = Some(delay);
	}

	/// Steps invoked so far, in order.
	pub fn calls(&self) -> Vec<ActivationStep> {
		self.calls.lock().clone()
	}

	/// Number of restart invocations, failed ones included.
	pub fn restarts(&self) -> usize {
		self.calls.lock().iter().filter(|step| **step == ActivationStep::Restart).count()
	}

	/// Forgets recorded calls.
	pub fn reset_calls(&self) {
		self.calls.lock().clear();
	}

	async fn invoke(&self, step: ActivationStep) -> Result<(), StepFailure> {
		self.calls.lock().push(step);

		let delay = *self.delay.lock();

		if let Some(delay) = delay {
			tokio::time::sleep(delay.unsigned_abs()).await;
		}

		let failure = self.failure.lock().clone();

		match failure {
			Some((failing, output)) if failing == step =>
				Err(StepFailure::Exit { code: Some(1), output }),
			_ => Ok(()),
		}
	}
}
impl Activator for RecordingActivator {
	fn regenerate(&self) -> ActivationFuture<'_> {
		Box::pin(self.invoke(ActivationStep::Regenerate))
	}

	fn restart(&self) -> ActivationFuture<'_> {
		Box::pin(self.invoke(ActivationStep::Restart))
	}

	fn describe(&self) -> String {
		String::from("recording activator")
	}
}
