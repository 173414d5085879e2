//! Validated fragment filename used as the registry's primary key.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

const FILENAME_MAX_LEN: usize = 255;

/// Error returned when a fragment filename is not a plain file name inside the client directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum FilenameError {
	/// The filename was empty.
	#[error("Filename cannot be empty.")]
	Empty,
	/// The filename contains a path separator or NUL byte.
	#[error("Filename must not contain path separators or NUL bytes.")]
	InvalidCharacter,
	/// The filename starts with a dot; those names are reserved for in-flight writes.
	#[error("Filename must not start with a dot.")]
	Hidden,
	/// The filename exceeded the allowed byte count.
	#[error("Filename exceeds {max} bytes.")]
	TooLong {
		/// Maximum permitted byte count.
		max: usize,
	},
}

/// Caller-chosen fragment filename, stable for the life of a client record.
///
/// The filename is never derived from the client `id`; the two may diverge and the store
/// performs no reconciliation between them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Filename(String);
impl Filename {
	/// Creates a new filename after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, FilenameError> {
		let view = value.as_ref();

		validate_view(view)?;

		Ok(Self(view.to_owned()))
	}

	/// Returns the filename as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Deref for Filename {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for Filename {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl AsRef<Path> for Filename {
	fn as_ref(&self) -> &Path {
		Path::new(&self.0)
	}
}
impl Borrow<str> for Filename {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl From<Filename> for String {
	fn from(value: Filename) -> Self {
		value.0
	}
}
impl TryFrom<String> for Filename {
	type Error = FilenameError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view(&value)?;

		Ok(Self(value))
	}
}
impl Debug for Filename {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Filename({})", self.0)
	}
}
impl Display for Filename {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for Filename {
	type Err = FilenameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(view: &str) -> Result<(), FilenameError> {
	if view.is_empty() {
		return Err(FilenameError::Empty);
	}
	if view.contains(['/', '\\', '\0']) {
		return Err(FilenameError::InvalidCharacter);
	}
	// Also rejects `.` and `..`.
	if view.starts_with('.') {
		return Err(FilenameError::Hidden);
	}
	if view.len() > FILENAME_MAX_LEN {
		return Err(FilenameError::TooLong { max: FILENAME_MAX_LEN });
	}

	Ok(())
}
