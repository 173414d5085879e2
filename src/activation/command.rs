//! [`Activator`] that shells out to the regeneration script and the service manager.

// std
use std::process::{Output, Stdio};
// crates.io
use tokio::process::Command;
// self
use crate::{
	_prelude::*,
	activation::{ActivationFuture, Activator, StepFailure},
};

const DIAGNOSTIC_MAX_LEN: usize = 4096;

/// Program plus arguments for one external step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
	/// Executable name or path, resolved through `PATH` when relative.
	pub program: String,
	/// Arguments passed verbatim, without a shell.
	#[serde(default)]
	pub args: Vec<String>,
}
impl CommandSpec {
	/// Creates a spec with no arguments.
	pub fn new(program: impl Into<String>) -> Self {
		Self { program: program.into(), args: Vec::new() }
	}

	/// Appends an argument.
	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());

		self
	}

	/// Runs `script` through `bash`, the way the regeneration script is normally invoked.
	pub fn bash_script(script: impl AsRef<Path>) -> Self {
		Self::new("bash").arg(script.as_ref().to_string_lossy())
	}
}
impl Display for CommandSpec {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.program)?;

		for arg in &self.args {
			write!(f, " {arg}")?;
		}

		Ok(())
	}
}

/// Runs one command per step and treats any non-zero exit as a failure.
///
/// Children are killed if the step future is dropped, which is what enforces the
/// controller's timeout.
#[derive(Clone, Debug)]
pub struct CommandActivator {
	/// Regeneration command.
	pub regenerate: CommandSpec,
	/// Restart command.
	pub restart: CommandSpec,
	working_dir: Option<PathBuf>,
}
impl CommandActivator {
	/// Creates an activator from the two command specs.
	pub fn new(regenerate: CommandSpec, restart: CommandSpec) -> Self {
		Self { regenerate, restart, working_dir: None }
	}

	/// Runs both commands from `dir` instead of the process working directory.
	pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.working_dir = Some(dir.into());

		self
	}

	async fn run(&self, spec: &CommandSpec) -> Result<(), StepFailure> {
		let mut command = Command::new(&spec.program);

		command.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);

		if let Some(dir) = &self.working_dir {
			command.current_dir(dir);
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(command = %spec, "Running activation command.");

		let output = command
			.output()
			.await
			.map_err(|source| StepFailure::Spawn { program: spec.program.clone(), source })?;

		if output.status.success() {
			return Ok(());
		}

		Err(StepFailure::Exit { code: output.status.code(), output: diagnostic(&output) })
	}
}
impl Activator for CommandActivator {
	fn regenerate(&self) -> ActivationFuture<'_> {
		Box::pin(self.run(&self.regenerate))
	}

	fn restart(&self) -> ActivationFuture<'_> {
		Box::pin(self.run(&self.restart))
	}

	fn describe(&self) -> String {
		format!("regenerate: `{}`, restart: `{}`", self.regenerate, self.restart)
	}
}

/// Prefers stderr, falls back to stdout, and caps the text length.
fn diagnostic(output: &Output) -> String {
	let stderr = String::from_utf8_lossy(&output.stderr);
	let text = match stderr.trim() {
		"" => String::from_utf8_lossy(&output.stdout).trim().to_owned(),
		trimmed => trimmed.to_owned(),
	};

	truncate(text, DIAGNOSTIC_MAX_LEN)
}

fn truncate(mut text: String, max: usize) -> String {
	if text.len() <= max {
		return text;
	}

	let mut cut = max;

	while !text.is_char_boundary(cut) {
		cut -= 1;
	}

	text.truncate(cut);
	text.push('…');

	text
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn spec_display_joins_arguments() {
		let spec = CommandSpec::new("sudo").arg("systemctl").arg("restart").arg("dex");

		assert_eq!(spec.to_string(), "sudo systemctl restart dex");
		assert_eq!(
			CommandSpec::bash_script("/var/www/dex/regenerate_config.sh").to_string(),
			"bash /var/www/dex/regenerate_config.sh"
		);
	}

	#[test]
	fn truncate_respects_char_boundaries() {
		assert_eq!(truncate("short".into(), 10), "short");
		assert_eq!(truncate("ééé".into(), 3), "é…");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn exit_status_and_stderr_are_captured() {
		let activator = CommandActivator::new(
			CommandSpec::new("sh").arg("-c").arg("echo regenerated"),
			CommandSpec::new("sh").arg("-c").arg("echo 'unit dex.service not found' >&2; exit 5"),
		);

		activator.regenerate().await.expect("Regenerate command should succeed.");

		match activator.restart().await {
			Err(StepFailure::Exit { code, output }) => {
				assert_eq!(code, Some(5));
				assert_eq!(output, "unit dex.service not found");
			},
			other => panic!("Unexpected restart outcome: {other:?}"),
		}
	}

	#[tokio::test]
	async fn missing_program_is_a_spawn_failure() {
		let activator = CommandActivator::new(
			CommandSpec::new("/nonexistent/dex-registry-regenerate"),
			CommandSpec::new("/nonexistent/dex-registry-restart"),
		);

		assert!(matches!(
			activator.regenerate().await,
			Err(StepFailure::Spawn { ref program, .. }) if program == "/nonexistent/dex-registry-regenerate"
		));
	}
}
