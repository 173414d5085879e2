//! Fragment codec: one YAML file holds a one-element sequence with a single client record.
//!
//! Defaulting rules live here and nowhere else. On encode, `trustedPeers` is omitted when
//! empty and `public` when false; `id`, `name`, `redirectURIs`, and `secret` are always
//! written. On decode, missing or null `trustedPeers`/`public` become `[]`/`false`, a missing
//! `secret` stays `None`, and sequence elements after the first are ignored.
//!
//! Dex reads fragments as YAML 1.1, where plain `yes`, `on`, `n`, and friends are booleans.
//! Encoded string values spelled like those words are single-quoted.

// self
use crate::{
	_prelude::*,
	client::{ClientRecord, ValidationError},
	secret::ClientSecret,
};

/// Errors produced while decoding fragment text.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// The fragment bytes are not UTF-8.
	#[error("Fragment is not valid UTF-8.")]
	Utf8(#[source] std::string::FromUtf8Error),
	/// The text is not valid YAML.
	#[error("Fragment is not valid YAML.")]
	Yaml(#[source] serde_yaml::Error),
	/// The document root is not a sequence.
	#[error("Fragment root must be a sequence of client records.")]
	NotASequence,
	/// The document root is an empty sequence.
	#[error("Fragment sequence is empty.")]
	EmptySequence,
	/// The first element does not match the client schema.
	#[error("Fragment record does not match the client schema.")]
	Schema(#[source] serde_path_to_error::Error<serde_yaml::Error>),
	/// The first element is missing or blanks a required field.
	#[error("Fragment record is incomplete.")]
	Invalid(#[source] ValidationError),
}

#[derive(Deserialize)]
struct FragmentEntry {
	id: String,
	name: String,
	#[serde(rename = "redirectURIs")]
	redirect_uris: Vec<String>,
	#[serde(default)]
	secret: Option<String>,
	#[serde(rename = "trustedPeers", default)]
	trusted_peers: Option<Vec<String>>,
	#[serde(default)]
	public: Option<bool>,
}
impl From<FragmentEntry> for ClientRecord {
	fn from(entry: FragmentEntry) -> Self {
		Self {
			id: entry.id,
			name: entry.name,
			redirect_uris: entry.redirect_uris,
			secret: entry.secret.map(ClientSecret::new),
			trusted_peers: entry.trusted_peers.unwrap_or_default(),
			public: entry.public.unwrap_or(false),
		}
	}
}

// Field order is the on-disk order.
#[derive(Serialize)]
struct FragmentEntryRef<'a> {
	id: &'a str,
	name: &'a str,
	#[serde(rename = "redirectURIs")]
	redirect_uris: &'a [String],
	secret: &'a str,
	#[serde(rename = "trustedPeers", skip_serializing_if = "slice_is_empty")]
	trusted_peers: &'a [String],
	#[serde(skip_serializing_if = "is_false")]
	public: bool,
}

/// Parses raw fragment bytes into a client record.
pub fn decode_bytes(raw: Vec<u8>) -> Result<ClientRecord, DecodeError> {
	let text = String::from_utf8(raw).map_err(DecodeError::Utf8)?;

	decode(&text)
}

/// Parses fragment text into a client record.
pub fn decode(raw: &str) -> Result<ClientRecord, DecodeError> {
	let root: serde_yaml::Value = serde_yaml::from_str(raw).map_err(DecodeError::Yaml)?;
	let serde_yaml::Value::Sequence(entries) = root else {
		return Err(DecodeError::NotASequence);
	};
	let Some(first) = entries.into_iter().next() else {
		return Err(DecodeError::EmptySequence);
	};
	let entry: FragmentEntry =
		serde_path_to_error::deserialize(first).map_err(DecodeError::Schema)?;
	let record = ClientRecord::from(entry);

	record.validate().map_err(DecodeError::Invalid)?;

	Ok(record)
}

/// Renders a client record as fragment text.
///
/// Fails with a validation error when a required field, `secret` included, is missing.
pub fn encode(record: &ClientRecord) -> Result<String> {
	record.validate()?;

	let secret =
		record.secret.as_ref().ok_or(ValidationError::MissingField { field: "secret" })?;
	let entry = FragmentEntryRef {
		id: &record.id,
		name: &record.name,
		redirect_uris: &record.redirect_uris,
		secret: secret.expose(),
		trusted_peers: &record.trusted_peers,
		public: record.public,
	};

	let text = serde_yaml::to_string(&[entry]).map_err(Error::Encode)?;

	// Block scalars only appear for multi-line values; their content lines must stay verbatim.
	if [record.id.as_str(), record.name.as_str(), secret.expose()]
		.into_iter()
		.chain(record.redirect_uris.iter().map(String::as_str))
		.chain(record.trusted_peers.iter().map(String::as_str))
		.any(|value| value.contains('\n'))
	{
		return Ok(text);
	}

	Ok(quote_yaml11_booleans(&text))
}

/// Plain scalars that YAML 1.1 resolves to booleans but serde_yaml leaves unquoted.
const YAML11_BOOLEANS: [&str; 16] = [
	"y", "Y", "yes", "Yes", "YES", "n", "N", "no", "No", "NO", "on", "On", "ON", "off", "Off",
	"OFF",
];

fn quote_yaml11_booleans(text: &str) -> String {
	let mut out = String::with_capacity(text.len());

	for line in text.lines() {
		let value_at = match line.find(": ") {
			Some(i) => Some(i + 2),
			None => line
				.trim_start()
				.starts_with("- ")
				.then(|| line.len() - line.trim_start().len() + 2),
		};

		match value_at {
			Some(at) if YAML11_BOOLEANS.contains(&&line[at..]) => {
				out.push_str(&line[..at]);
				out.push('\'');
				out.push_str(&line[at..]);
				out.push('\'');
			},
			_ => out.push_str(line),
		}

		out.push('\n');
	}

	out
}

fn slice_is_empty(values: &&[String]) -> bool {
	values.is_empty()
}

fn is_false(value: &bool) -> bool {
	!*value
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DEX_FRAGMENT: &str = "\
- id: example-app
  name: Example App
  redirectURIs:
    - http://127.0.0.1:5555/callback
  secret: ZXhhbXBsZS1hcHAtc2VjcmV0
";

	fn record(trusted_peers: &[&str], public: bool) -> ClientRecord {
		ClientRecord {
			id: "example-app".into(),
			name: "Example App".into(),
			redirect_uris: vec!["http://127.0.0.1:5555/callback".into()],
			secret: Some(ClientSecret::new("0a1b2c3d")),
			trusted_peers: trusted_peers.iter().map(|peer| peer.to_string()).collect(),
			public,
		}
	}

	#[test]
	fn decode_fills_optional_defaults() {
		let decoded = decode(DEX_FRAGMENT).expect("Dex fragment fixture should decode.");

		assert_eq!(decoded.id, "example-app");
		assert_eq!(decoded.name, "Example App");
		assert_eq!(decoded.redirect_uris, vec!["http://127.0.0.1:5555/callback".to_string()]);
		assert_eq!(
			decoded.secret.as_ref().map(ClientSecret::expose),
			Some("ZXhhbXBsZS1hcHAtc2VjcmV0")
		);
		assert!(decoded.trusted_peers.is_empty());
		assert!(!decoded.public);
	}

	#[test]
	fn decode_leaves_missing_secret_absent() {
		let decoded = decode("- id: cli\n  name: CLI\n  redirectURIs: [\"urn:ietf:wg:oauth:2.0:oob\"]\n  public: true\n")
			.expect("Public fragment without secret should decode.");

		assert!(decoded.secret.is_none());
		assert!(decoded.public);
	}

	#[test]
	fn decode_treats_null_optionals_as_absent() {
		let decoded = decode("- id: a\n  name: A\n  redirectURIs: [x]\n  secret: s\n  public: ~\n  trustedPeers:\n")
			.expect("Null optional fields should decode.");

		assert!(!decoded.public);
		assert!(decoded.trusted_peers.is_empty());

		let bare = decode("- id: a\n  name: A\n  redirectURIs: [x]\n  public:\n")
			.expect("Bare optional fields should decode.");

		assert!(!bare.public);
	}

	#[test]
	fn decode_bytes_rejects_invalid_utf8() {
		assert!(matches!(decode_bytes(b"- id: \xff\xfe\n".to_vec()), Err(DecodeError::Utf8(_))));
		assert_eq!(
			decode_bytes(DEX_FRAGMENT.as_bytes().to_vec())
				.expect("UTF-8 fragment should decode.")
				.id,
			"example-app"
		);
	}

	#[test]
	fn decode_ignores_trailing_elements() {
		let text = format!("{DEX_FRAGMENT}- 42\n- not: a client\n");
		let decoded = decode(&text).expect("Trailing elements should be ignored.");

		assert_eq!(decoded.id, "example-app");
	}

	#[test]
	fn decode_rejects_malformed_roots_and_records() {
		assert!(matches!(decode("id: app\nname: App\n"), Err(DecodeError::NotASequence)));
		assert!(matches!(decode("[]"), Err(DecodeError::EmptySequence)));
		assert!(matches!(decode("- id: [unterminated"), Err(DecodeError::Yaml(_))));
		assert!(decode("").is_err());

		let schema = decode("- id: app\n  name: App\n  redirectURIs: nope\n")
			.expect_err("Scalar redirectURIs should fail schema checks.");

		match schema {
			DecodeError::Schema(e) => assert_eq!(e.path().to_string(), "redirectURIs"),
			other => panic!("Unexpected decode error: {other:?}"),
		}

		assert!(matches!(
			decode("- id: app\n  name: App\n  redirectURIs: []\n"),
			Err(DecodeError::Invalid(ValidationError::MissingField { field: "redirectURIs" }))
		));
	}

	#[test]
	fn encode_omits_defaults() {
		let text = encode(&record(&[], false)).expect("Record fixture should encode.");

		assert!(text.contains("id: example-app"));
		assert!(text.contains("redirectURIs:"));
		assert!(text.contains("secret: 0a1b2c3d"));
		assert!(!text.contains("trustedPeers"));
		assert!(!text.contains("public"));

		let text = encode(&record(&["peer-app"], true)).expect("Record fixture should encode.");

		assert!(text.contains("trustedPeers:"));
		assert!(text.contains("public: true"));
	}

	#[test]
	fn encode_requires_secret_and_fields() {
		let mut missing_secret = record(&[], true);

		missing_secret.secret = None;

		assert!(matches!(
			encode(&missing_secret),
			Err(Error::Validation(ValidationError::MissingField { field: "secret" }))
		));

		let mut missing_name = record(&[], false);

		missing_name.name.clear();

		assert!(matches!(
			encode(&missing_name),
			Err(Error::Validation(ValidationError::MissingField { field: "name" }))
		));
	}

	#[test]
	fn yaml11_boolean_words_are_quoted() {
		let mut fixture = record(&["No", "peer"], true);

		fixture.id = "yes".into();
		fixture.name = "on".into();
		fixture.redirect_uris = vec!["y".into(), "https://app/cb".into()];

		let text = encode(&fixture).expect("Record fixture should encode.");

		assert!(text.contains("- id: 'yes'\n"));
		assert!(text.contains("  name: 'on'\n"));
		assert!(text.contains("- 'y'\n"));
		assert!(text.contains("- 'No'\n"));
		assert!(text.contains("- peer\n"));
		assert!(text.contains("public: true\n"));
		assert_eq!(decode(&text).expect("Quoted text should decode."), fixture);
	}

	#[test]
	fn multi_line_values_are_left_verbatim() {
		let mut fixture = record(&[], false);

		fixture.name = "first\n- yes".into();

		let text = encode(&fixture).expect("Multi-line fixture should encode.");

		assert_eq!(decode(&text).expect("Multi-line text should decode."), fixture);
	}

	#[test]
	fn canonical_text_survives_decode_then_encode() {
		for fixture in [record(&[], false), record(&["peer-a", "peer-b"], true)] {
			let text = encode(&fixture).expect("Record fixture should encode.");
			let decoded = decode(&text).expect("Encoded text should decode.");

			assert_eq!(decoded, fixture);
			assert_eq!(encode(&decoded).expect("Decoded record should encode."), text);
		}
	}
}
