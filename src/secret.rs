//! Client secret generation and the redacted wrapper that carries secrets through the registry.

// crates.io
use rand::RngCore;
// self
use crate::_prelude::*;

/// Default number of random bytes in a generated secret (64 hex characters).
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// Generates a hex-encoded secret from `length` bytes of cryptographically secure randomness.
///
/// The returned string is always `2 * length` characters long. `rand::rng()` is a
/// thread-local CSPRNG seeded from the operating system, so concurrent callers share no state.
/// Only a zero length is rejected; bounding caller-chosen lengths is left to the adapter.
pub fn generate_secret(length: usize) -> Result<ClientSecret> {
	if length == 0 {
		return Err(Error::InvalidArgument {
			name: "length",
			reason: "secret length must be positive".into(),
		});
	}

	let mut bytes = vec![0_u8; length];

	rand::rng().fill_bytes(&mut bytes);

	Ok(ClientSecret::new(hex::encode(bytes)))
}

/// Redacted client secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for ClientSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}
impl Display for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
