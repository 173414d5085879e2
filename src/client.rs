//! Client record model, caller-supplied fields, and the validation rules shared by every layer.

pub mod filename;

pub use filename::*;

// self
use crate::{_prelude::*, secret::ClientSecret};

/// Errors emitted when required client fields are missing or blank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum ValidationError {
	/// A required field is absent or blank.
	#[error("Missing required field `{field}`.")]
	MissingField {
		/// Wire name of the field.
		field: &'static str,
	},
	/// The fragment filename is not usable.
	#[error(transparent)]
	InvalidFilename(#[from] FilenameError),
	/// Create targeted a filename that already has a fragment.
	#[error("Filename `{filename}` is already in use.")]
	FilenameInUse {
		/// Taken filename.
		filename: Filename,
	},
}

/// A single OAuth 2.0/OIDC client as Dex sees it.
///
/// `secret` is optional only because a hand-edited fragment may omit it; records written by
/// the registry always carry one, public clients included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
	/// Opaque client identifier.
	pub id: String,
	/// Human-readable label.
	pub name: String,
	/// Allowed redirect URIs, in order.
	#[serde(rename = "redirectURIs")]
	pub redirect_uris: Vec<String>,
	/// Client secret; never log the exposed value.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub secret: Option<ClientSecret>,
	/// Client ids allowed to mint tokens on behalf of this client.
	#[serde(rename = "trustedPeers", default)]
	pub trusted_peers: Vec<String>,
	/// Whether the client is public (no confidential secret required).
	#[serde(default)]
	pub public: bool,
}
impl ClientRecord {
	/// Checks the fields every persisted record must carry.
	pub fn validate(&self) -> Result<(), ValidationError> {
		validate_required(&self.id, &self.name, &self.redirect_uris)
	}
}

/// Caller-supplied fields for create and update.
///
/// Updates replace the whole record; there is no partial patch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFields {
	/// Opaque client identifier.
	#[serde(default)]
	pub id: String,
	/// Human-readable label.
	#[serde(default)]
	pub name: String,
	/// Redirect URIs; blank entries are dropped.
	#[serde(rename = "redirectURIs", default)]
	pub redirect_uris: Vec<String>,
	/// Explicit secret; `None` or an empty string triggers generation.
	#[serde(default)]
	pub secret: Option<ClientSecret>,
	/// Trusted peer ids; blanks are dropped and duplicates collapsed.
	#[serde(rename = "trustedPeers", default)]
	pub trusted_peers: Vec<String>,
	/// Whether the client is public.
	#[serde(default)]
	pub public: bool,
}
impl ClientFields {
	/// Starts a field set with the two required scalar fields.
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self { id: id.into(), name: name.into(), ..Default::default() }
	}

	/// Appends a redirect URI.
	pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
		self.redirect_uris.push(uri.into());

		self
	}

	/// Sets an explicit secret instead of generating one.
	pub fn secret(mut self, secret: impl Into<String>) -> Self {
		self.secret = Some(ClientSecret::new(secret));

		self
	}

	/// Appends a trusted peer id.
	pub fn trusted_peer(mut self, peer: impl Into<String>) -> Self {
		self.trusted_peers.push(peer.into());

		self
	}

	/// Marks the client as public.
	pub fn public(mut self, public: bool) -> Self {
		self.public = public;

		self
	}

	/// Validates required fields without touching the filesystem.
	pub fn validate(&self) -> Result<(), ValidationError> {
		validate_required(&self.id, &self.name, &self.redirect_uris)
	}

	/// Returns the caller's secret unless it is missing or empty.
	pub fn provided_secret(&self) -> Option<&ClientSecret> {
		self.secret.as_ref().filter(|secret| !secret.expose().is_empty())
	}

	/// Validates and normalizes the fields into a persistable record.
	///
	/// Redirect URIs and trusted peers are trimmed with blanks dropped; duplicate peers keep
	/// their first occurrence. `generate` is only invoked when no usable secret was supplied.
	pub fn into_record<F>(self, generate: F) -> Result<ClientRecord>
	where
		F: FnOnce() -> Result<ClientSecret>,
	{
		self.validate()?;

		let secret = match self.provided_secret() {
			Some(secret) => secret.clone(),
			None => generate()?,
		};
		let redirect_uris = normalize_list(self.redirect_uris, false);
		let trusted_peers = normalize_list(self.trusted_peers, true);

		Ok(ClientRecord {
			id: self.id,
			name: self.name,
			redirect_uris,
			secret: Some(secret),
			trusted_peers,
			public: self.public,
		})
	}
}
impl From<ClientRecord> for ClientFields {
	fn from(record: ClientRecord) -> Self {
		Self {
			id: record.id,
			name: record.name,
			redirect_uris: record.redirect_uris,
			secret: record.secret,
			trusted_peers: record.trusted_peers,
			public: record.public,
		}
	}
}

fn validate_required(
	id: &str,
	name: &str,
	redirect_uris: &[String],
) -> Result<(), ValidationError> {
	require_text("id", id)?;
	require_text("name", name)?;

	if !redirect_uris.iter().any(|uri| !uri.trim().is_empty()) {
		return Err(ValidationError::MissingField { field: "redirectURIs" });
	}

	Ok(())
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
	if value.trim().is_empty() {
		return Err(ValidationError::MissingField { field });
	}

	Ok(())
}

fn normalize_list(values: Vec<String>, dedup: bool) -> Vec<String> {
	let mut out: Vec<String> = Vec::with_capacity(values.len());

	for value in values {
		let trimmed = value.trim();

		if trimmed.is_empty() || (dedup && out.iter().any(|seen| seen == trimmed)) {
			continue;
		}

		out.push(trimmed.to_owned());
	}

	out
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn fixed_secret() -> Result<ClientSecret> {
		Ok(ClientSecret::new("generated"))
	}

	#[test]
	fn validation_names_the_first_missing_field() {
		let missing_id = ClientFields::new(" ", "App").redirect_uri("https://app/cb");
		let missing_name = ClientFields::new("app", "").redirect_uri("https://app/cb");
		let blank_uris = ClientFields::new("app", "App").redirect_uri("  ").redirect_uri("");

		assert_eq!(missing_id.validate(), Err(ValidationError::MissingField { field: "id" }));
		assert_eq!(missing_name.validate(), Err(ValidationError::MissingField { field: "name" }));
		assert_eq!(
			blank_uris.validate(),
			Err(ValidationError::MissingField { field: "redirectURIs" })
		);
	}

	#[test]
	fn into_record_normalizes_lists_and_fills_secret() {
		let record = ClientFields::new("app", "App")
			.redirect_uri(" https://app/cb ")
			.redirect_uri("")
			.trusted_peer("peer-a")
			.trusted_peer(" peer-a")
			.trusted_peer(" ")
			.trusted_peer("peer-b")
			.secret("")
			.into_record(fixed_secret)
			.expect("Fields fixture should normalize.");

		assert_eq!(record.redirect_uris, vec!["https://app/cb".to_string()]);
		assert_eq!(record.trusted_peers, vec!["peer-a".to_string(), "peer-b".to_string()]);
		assert_eq!(record.secret.as_ref().map(ClientSecret::expose), Some("generated"));
		assert!(!record.public);
	}

	#[test]
	fn provided_secret_skips_generation() {
		let record = ClientFields::new("app", "App")
			.redirect_uri("https://app/cb")
			.secret("caller-secret")
			.public(true)
			.into_record(|| panic!("Generator must not run when a secret is supplied."))
			.expect("Fields fixture should normalize.");

		assert_eq!(record.secret.as_ref().map(ClientSecret::expose), Some("caller-secret"));
		assert!(record.public);
	}

	#[test]
	fn fields_deserialize_from_wire_names() {
		let fields: ClientFields = serde_json::from_str(
			r#"{"id":"app","name":"App","redirectURIs":["https://app/cb"],"trustedPeers":["peer"],"public":true}"#,
		)
		.expect("Wire payload should deserialize.");

		assert_eq!(fields.redirect_uris, vec!["https://app/cb".to_string()]);
		assert_eq!(fields.trusted_peers, vec!["peer".to_string()]);
		assert!(fields.public);
		assert!(fields.secret.is_none());
	}
}
