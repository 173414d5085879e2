//! Client registry facade: validated CRUD over fragments followed by activation.
//!
//! Every mutation validates before touching the disk, persists with a single atomic file
//! operation, and then runs the activation protocol. Activation failures are reported as
//! [`Error::Activation`] carrying the change that is already on disk; nothing is rolled back
//! and nothing is retried. The registry adds no locking: concurrent writers to the same
//! filename race with last-write-wins semantics, and concurrent mutations may trigger
//! overlapping activation cycles.

// self
use crate::{
	_prelude::*,
	activation::{ActivationController, ActivationError, Activator, CommandActivator},
	client::{ClientFields, ClientRecord, Filename, ValidationError},
	config::RegistryConfig,
	error::PersistedChange,
	obs::{self, OpKind, OpOutcome, OpSpan},
	secret::{self, ClientSecret, DEFAULT_SECRET_LENGTH},
	store::{ClientListing, ClientStore},
};

/// Snapshot of the registry's wiring, suitable for health endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RegistryStatus {
	/// Fragment directory.
	pub client_dir: PathBuf,
	/// Activator summary.
	pub activator: String,
	/// Per-step activation timeout.
	pub activation_timeout: Duration,
	/// Byte length of generated secrets.
	pub secret_length: usize,
}

/// Composes the store, codec, secret generator, and activation controller.
#[derive(Clone, Debug)]
pub struct ClientRegistry {
	store: ClientStore,
	activation: ActivationController,
	secret_length: usize,
}
impl ClientRegistry {
	/// Creates a registry from already-built parts.
	pub fn new(store: ClientStore, activation: ActivationController) -> Self {
		Self { store, activation, secret_length: DEFAULT_SECRET_LENGTH }
	}

	/// Builds a registry that activates through the configured external commands.
	pub fn from_config(config: &RegistryConfig) -> Result<Self> {
		let mut activator = CommandActivator::new(
			config.activation.regenerate.clone(),
			config.activation.restart.clone(),
		);

		if let Some(dir) = &config.activation.working_dir {
			activator = activator.with_working_dir(dir);
		}

		Self::with_activator(config, Arc::new(activator))
	}

	/// Builds a registry from `config` but activates through `activator`.
	pub fn with_activator(config: &RegistryConfig, activator: Arc<dyn Activator>) -> Result<Self> {
		config.validate()?;

		let store = ClientStore::open(&config.client_dir)?;
		let activation =
			ActivationController::new(activator).with_timeout(config.activation.timeout());

		Ok(Self::new(store, activation).with_secret_length(config.secret_length))
	}

	/// Overrides the byte length of generated secrets.
	pub fn with_secret_length(mut self, length: usize) -> Self {
		self.secret_length = length;

		self
	}

	/// Underlying store, for read-only inspection.
	pub fn store(&self) -> &ClientStore {
		&self.store
	}

	/// Lists every client; malformed fragments are reported in [`ClientListing::skipped`].
	pub fn list_clients(&self) -> Result<ClientListing> {
		observe_sync(OpKind::List, None, || self.store.list())
	}

	/// Reads one client by filename.
	pub fn get_client(&self, filename: &str) -> Result<ClientRecord> {
		observe_sync(OpKind::Get, Some(filename), || {
			let filename = parse_filename(filename)?;

			self.store.read(&filename)
		})
	}

	/// Creates a client under a filename that is not yet taken.
	///
	/// A secret is generated when none is supplied, public clients included. If activation
	/// fails the fragment stays on disk and the error carries the persisted record.
	pub async fn create_client(
		&self,
		filename: &str,
		fields: ClientFields,
	) -> Result<ClientRecord> {
		observe(OpKind::Create, filename, async {
			let filename = parse_filename(filename)?;
			let record = fields.into_record(|| self.generate_secret(None))?;

			if self.store.exists(&filename)? {
				return Err(ValidationError::FilenameInUse { filename }.into());
			}

			self.persist(filename, record).await
		})
		.await
	}

	/// Replaces a client record wholesale.
	///
	/// Existence is not required: updating an unknown filename creates the fragment.
	pub async fn update_client(
		&self,
		filename: &str,
		fields: ClientFields,
	) -> Result<ClientRecord> {
		observe(OpKind::Update, filename, async {
			let filename = parse_filename(filename)?;
			let record = fields.into_record(|| self.generate_secret(None))?;

			// Log only; an existence check error never fails the update.
			#[cfg(feature = "tracing")]
			if !self.store.exists(&filename).unwrap_or(true) {
				tracing::info!(%filename, "Update targets a missing fragment; creating it.");
			}

			self.persist(filename, record).await
		})
		.await
	}

	/// Removes a client, then activates. The removal is not undone if activation fails.
	pub async fn delete_client(&self, filename: &str) -> Result<()> {
		observe(OpKind::Delete, filename, async {
			let filename = parse_filename(filename)?;

			self.store.remove(&filename)?;
			self.activate_change(PersistedChange::Removed { filename }).await
		})
		.await
	}

	/// Generates a hex secret of `length` bytes, or of the configured length when `None`.
	pub fn generate_secret(&self, length: Option<usize>) -> Result<ClientSecret> {
		secret::generate_secret(length.unwrap_or(self.secret_length))
	}

	/// Re-runs regenerate and restart without changing any fragment.
	///
	/// Safe to call after an [`Error::Activation`] to bring the service in line with disk.
	pub async fn reactivate(&self) -> Result<(), ActivationError> {
		self.activation.activate().await
	}

	/// Reports the registry's wiring.
	pub fn status(&self) -> RegistryStatus {
		RegistryStatus {
			client_dir: self.store.dir().to_path_buf(),
			activator: self.activation.activator().describe(),
			activation_timeout: self.activation.timeout(),
			secret_length: self.secret_length,
		}
	}

	async fn persist(&self, filename: Filename, record: ClientRecord) -> Result<ClientRecord> {
		self.store.write(&filename, &record)?;
		self.activate_change(PersistedChange::Written { filename, record: record.clone() })
			.await?;

		Ok(record)
	}

	async fn activate_change(&self, change: PersistedChange) -> Result<()> {
		self.activation.activate().await.map_err(|source| Error::Activation { change, source })
	}
}

fn parse_filename(raw: &str) -> Result<Filename, ValidationError> {
	if raw.trim().is_empty() {
		return Err(ValidationError::MissingField { field: "filename" });
	}

	Filename::new(raw).map_err(ValidationError::from)
}

fn op_span(kind: OpKind, filename: Option<&str>) -> OpSpan {
	let span = OpSpan::new(kind, "registry");

	match filename {
		Some(filename) => span.with_filename(filename),
		None => span,
	}
}

async fn observe<T, Fut>(kind: OpKind, filename: &str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = op_span(kind, Some(filename));

	obs::record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	record_result(kind, &result);

	result
}

fn observe_sync<T, F>(kind: OpKind, filename: Option<&str>, op: F) -> Result<T>
where
	F: FnOnce() -> Result<T>,
{
	let _guard = op_span(kind, filename).entered();

	obs::record_op_outcome(kind, OpOutcome::Attempt);

	let result = op();

	record_result(kind, &result);

	result
}

fn record_result<T>(kind: OpKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_e) => {
			#[cfg(feature = "tracing")]
			tracing::warn!(op = kind.as_str(), error = %_e, "Registry operation failed.");

			obs::record_op_outcome(kind, OpOutcome::Failure);
		},
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn blank_filename_is_a_missing_field() {
		assert_eq!(parse_filename("  "), Err(ValidationError::MissingField { field: "filename" }));
		assert!(matches!(parse_filename("../escape"), Err(ValidationError::InvalidFilename(_))));
		assert_eq!(parse_filename("app.yaml").map(String::from), Ok(String::from("app.yaml")));
	}
}
