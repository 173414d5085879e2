//! Registry configuration passed explicitly at construction time.
//!
//! Nothing below the registry facade reads the process environment. [`RegistryConfig::from_env`]
//! exists for binaries that want the historical `DEX_CONFIG_DIR`/`DEX_REGENERATE_SCRIPT`
//! variables and should be called once at startup.

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	activation::{ActivationStep, CommandSpec},
	secret::DEFAULT_SECRET_LENGTH,
};

/// Default fragment directory.
pub const DEFAULT_CLIENT_DIR: &str = "/var/www/dex/config.yaml.d";
/// Default regeneration script.
pub const DEFAULT_REGENERATE_SCRIPT: &str = "/var/www/dex/regenerate_config.sh";
/// Environment variable overriding [`RegistryConfig::client_dir`].
pub const CLIENT_DIR_ENV: &str = "DEX_CONFIG_DIR";
/// Environment variable overriding the regeneration script path.
pub const REGENERATE_SCRIPT_ENV: &str = "DEX_REGENERATE_SCRIPT";
/// Largest configurable byte length for generated secrets.
pub const MAX_SECRET_LENGTH: usize = 1024;

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Configuration loading and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration file could not be read.
	#[error("Configuration file {path} could not be read.")]
	Read {
		/// File that failed to load.
		path: PathBuf,
		/// Underlying filesystem error.
		#[source]
		source: std::io::Error,
	},
	/// Configuration text is not valid YAML for the expected shape.
	#[error("Configuration is malformed.")]
	Parse(#[source] serde_path_to_error::Error<serde_yaml::Error>),
	/// Secret length is zero or too large.
	#[error("Secret length must be between 1 and {max} bytes, got {value}.")]
	SecretLength {
		/// Rejected value.
		value: usize,
		/// Largest accepted value.
		max: usize,
	},
	/// A step has no program to run.
	#[error("The {step} command has an empty program.")]
	EmptyCommand {
		/// Step with the empty command.
		step: ActivationStep,
	},
	/// Activation timeout is zero or too large.
	#[error("Activation timeout must be between 1 and {max} seconds, got {value}.")]
	Timeout {
		/// Rejected value.
		value: u64,
		/// Largest accepted value.
		max: u64,
	},
}

/// Top-level registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
	/// Directory holding one fragment file per client.
	pub client_dir: PathBuf,
	/// How fragments are made live.
	pub activation: ActivationConfig,
	/// Byte length of auto-generated secrets.
	pub secret_length: usize,
}
impl RegistryConfig {
	/// Creates a configuration for `client_dir` with default activation settings.
	pub fn new(client_dir: impl Into<PathBuf>) -> Self {
		Self { client_dir: client_dir.into(), ..Default::default() }
	}

	/// Builds a configuration from `DEX_CONFIG_DIR` and `DEX_REGENERATE_SCRIPT`.
	pub fn from_env() -> Self {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Builds a configuration from an arbitrary variable lookup; unset or empty values keep
	/// their defaults.
	pub fn from_lookup<F>(lookup: F) -> Self
	where
		F: Fn(&str) -> Option<String>,
	{
		let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
		let mut config = Self::default();

		if let Some(dir) = lookup(CLIENT_DIR_ENV) {
			config.client_dir = dir.into();
		}
		if let Some(script) = lookup(REGENERATE_SCRIPT_ENV) {
			config.activation.regenerate = CommandSpec::bash_script(script);
		}

		config
	}

	/// Parses a YAML configuration document.
	pub fn from_yaml_str(text: &str) -> Result<Self> {
		let config: Self =
			serde_path_to_error::deserialize(serde_yaml::Deserializer::from_str(text))
				.map_err(ConfigError::Parse)?;

		config.validate()?;

		Ok(config)
	}

	/// Loads and validates a YAML configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

		Self::from_yaml_str(&text)
	}

	/// Replaces the activation settings.
	pub fn with_activation(mut self, activation: ActivationConfig) -> Self {
		self.activation = activation;

		self
	}

	/// Overrides the generated secret length.
	pub fn with_secret_length(mut self, length: usize) -> Self {
		self.secret_length = length;

		self
	}

	/// Checks ranges and required values.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.secret_length == 0 || self.secret_length > MAX_SECRET_LENGTH {
			return Err(ConfigError::SecretLength {
				value: self.secret_length,
				max: MAX_SECRET_LENGTH,
			});
		}

		self.activation.validate()
	}
}
impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			client_dir: PathBuf::from(DEFAULT_CLIENT_DIR),
			activation: ActivationConfig::default(),
			secret_length: DEFAULT_SECRET_LENGTH,
		}
	}
}

/// External commands and bounds for the activation protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
	/// Rebuilds Dex's aggregate configuration from the fragment directory.
	pub regenerate: CommandSpec,
	/// Restarts Dex.
	pub restart: CommandSpec,
	/// Per-step timeout in seconds.
	pub timeout_secs: u64,
	/// Working directory for both commands; inherits the process directory when unset.
	pub working_dir: Option<PathBuf>,
}
impl ActivationConfig {
	/// Per-step timeout.
	pub fn timeout(&self) -> Duration {
		Duration::seconds(i64::try_from(self.timeout_secs).unwrap_or(i64::MAX))
	}

	/// Checks that both commands are runnable and the timeout is bounded.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (step, spec) in
			[(ActivationStep::Regenerate, &self.regenerate), (ActivationStep::Restart, &self.restart)]
		{
			if spec.program.trim().is_empty() {
				return Err(ConfigError::EmptyCommand { step });
			}
		}
		if self.timeout_secs == 0 || self.timeout_secs > MAX_TIMEOUT_SECS {
			return Err(ConfigError::Timeout { value: self.timeout_secs, max: MAX_TIMEOUT_SECS });
		}

		Ok(())
	}
}
impl Default for ActivationConfig {
	fn default() -> Self {
		Self {
			regenerate: CommandSpec::bash_script(DEFAULT_REGENERATE_SCRIPT),
			restart: CommandSpec::new("sudo").arg("systemctl").arg("restart").arg("dex"),
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			working_dir: None,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_the_stock_deployment() {
		let config = RegistryConfig::default();

		assert_eq!(config.client_dir, PathBuf::from("/var/www/dex/config.yaml.d"));
		assert_eq!(
			config.activation.regenerate.to_string(),
			"bash /var/www/dex/regenerate_config.sh"
		);
		assert_eq!(config.activation.restart.to_string(), "sudo systemctl restart dex");
		assert_eq!(config.activation.timeout(), Duration::seconds(60));
		assert_eq!(config.secret_length, 32);
		config.validate().expect("Default configuration should validate.");
	}

	#[test]
	fn lookup_overrides_dir_and_script() {
		let config = RegistryConfig::from_lookup(|key| match key {
			CLIENT_DIR_ENV => Some("/etc/dex/clients.d".into()),
			REGENERATE_SCRIPT_ENV => Some("/opt/dex/rebuild.sh".into()),
			_ => None,
		});

		assert_eq!(config.client_dir, PathBuf::from("/etc/dex/clients.d"));
		assert_eq!(config.activation.regenerate.to_string(), "bash /opt/dex/rebuild.sh");

		let blank = RegistryConfig::from_lookup(|_| Some("  ".into()));

		assert_eq!(blank, RegistryConfig::default());
	}

	#[test]
	fn yaml_documents_fill_missing_fields_with_defaults() {
		let config = RegistryConfig::from_yaml_str(
			"client_dir: /srv/dex/clients\nactivation:\n  restart:\n    program: systemctl\n    args: [restart, dex]\n  timeout_secs: 5\n",
		)
		.expect("Partial configuration should parse.");

		assert_eq!(config.client_dir, PathBuf::from("/srv/dex/clients"));
		assert_eq!(config.activation.restart.to_string(), "systemctl restart dex");
		assert_eq!(
			config.activation.regenerate.to_string(),
			"bash /var/www/dex/regenerate_config.sh"
		);
		assert_eq!(config.activation.timeout(), Duration::seconds(5));
	}

	#[test]
	fn invalid_values_are_rejected() {
		assert!(matches!(
			RegistryConfig::from_yaml_str("secret_length: 0\n"),
			Err(Error::Config(ConfigError::SecretLength { value: 0, .. }))
		));
		assert!(matches!(
			RegistryConfig::from_yaml_str("secret_length: 1025\n"),
			Err(Error::Config(ConfigError::SecretLength { value: 1025, max: MAX_SECRET_LENGTH }))
		));
		assert!(matches!(
			RegistryConfig::from_yaml_str("activation:\n  timeout_secs: 0\n"),
			Err(Error::Config(ConfigError::Timeout { value: 0, .. }))
		));
		assert!(matches!(
			RegistryConfig::from_yaml_str("activation:\n  restart:\n    program: ''\n"),
			Err(Error::Config(ConfigError::EmptyCommand { step: ActivationStep::Restart }))
		));

		match RegistryConfig::from_yaml_str("secret_length: many\n") {
			Err(Error::Config(ConfigError::Parse(e))) =>
				assert_eq!(e.path().to_string(), "secret_length"),
			other => panic!("Unexpected parse outcome: {other:?}"),
		}
	}
}
