//! Directory-backed client store: one fragment file per client, keyed by caller-chosen filename.
//!
//! The store is the only writer of persisted client state. Filenames are never derived from
//! the client `id`, so the two may diverge; the store does not reconcile them. Every
//! non-hidden regular file in the directory is a candidate fragment. Hidden names are
//! reserved for in-flight writes and are never listed.

mod atomic;

// std
use std::{error::Error as StdError, fs, io::ErrorKind};
// self
use crate::{
	_prelude::*,
	client::{ClientRecord, Filename},
	codec,
};

/// Fragment mode: owner and group read/write, nothing for others.
pub const FRAGMENT_MODE: u32 = 0o660;

/// A decoded fragment together with its filename.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientFragment {
	/// Fragment filename (primary key).
	pub filename: Filename,
	/// Decoded client record.
	#[serde(flatten)]
	pub record: ClientRecord,
}

/// Directory entry that looked like a fragment but could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedFragment {
	/// Raw directory entry name.
	pub name: String,
	/// Human-readable reason the entry was skipped.
	pub reason: String,
}

/// Result of [`ClientStore::list`].
///
/// A malformed fragment never fails the whole listing: it lands in `skipped` (and is logged
/// when the `tracing` feature is on) while every valid client stays visible.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ClientListing {
	/// Valid clients, sorted by filename.
	pub clients: Vec<ClientFragment>,
	/// Entries that were skipped, sorted by name.
	pub skipped: Vec<SkippedFragment>,
}
impl ClientListing {
	/// Looks up a listed client by filename.
	pub fn get(&self, filename: &str) -> Option<&ClientFragment> {
		self.clients.iter().find(|fragment| fragment.filename.as_str() == filename)
	}

	/// Returns `true` if every candidate fragment decoded cleanly.
	pub fn is_complete(&self) -> bool {
		self.skipped.is_empty()
	}
}

/// Owns the fragment directory.
#[derive(Clone, Debug)]
pub struct ClientStore {
	dir: PathBuf,
}
impl ClientStore {
	/// Opens (or creates) the fragment directory.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();

		fs::create_dir_all(&dir)
			.map_err(|e| Error::io(format!("create client directory {}", dir.display()), e))?;

		Ok(Self { dir })
	}

	/// Fragment directory.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Absolute path of the fragment for `filename`.
	pub fn path_of(&self, filename: &Filename) -> PathBuf {
		self.dir.join(filename.as_str())
	}

	/// Enumerates and decodes every fragment in the directory.
	///
	/// Only an unreadable directory fails the call. The listing is not a consistent snapshot
	/// if writers run concurrently.
	pub fn list(&self) -> Result<ClientListing> {
		let entries = fs::read_dir(&self.dir)
			.map_err(|e| Error::io(format!("list {}", self.dir.display()), e))?;
		let mut listing = ClientListing::default();

		for entry in entries {
			let entry =
				entry.map_err(|e| Error::io(format!("list {}", self.dir.display()), e))?;
			let raw_name = entry.file_name().to_string_lossy().into_owned();

			if raw_name.starts_with('.') {
				continue;
			}

			let path = entry.path();

			// Follows symlinks; directories and special files are not fragments.
			match fs::metadata(&path) {
				Ok(meta) if meta.is_file() => {},
				Ok(_) => continue,
				Err(e) => {
					skip(&mut listing, raw_name, format!("cannot inspect entry: {e}"));

					continue;
				},
			}

			let filename = match Filename::new(&raw_name) {
				Ok(filename) => filename,
				Err(e) => {
					skip(&mut listing, raw_name, e.to_string());

					continue;
				},
			};

			match self.read_path(&filename, &path) {
				Ok(record) => listing.clients.push(ClientFragment { filename, record }),
				Err(e) => skip(&mut listing, raw_name, error_chain(&e)),
			}
		}

		listing.clients.sort_by(|a, b| a.filename.cmp(&b.filename));
		listing.skipped.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(listing)
	}

	/// Reads and decodes one fragment.
	pub fn read(&self, filename: &Filename) -> Result<ClientRecord> {
		self.read_path(filename, &self.path_of(filename))
	}

	/// Returns `true` if a fragment file exists for `filename`.
	pub fn exists(&self, filename: &Filename) -> Result<bool> {
		let path = self.path_of(filename);

		path.try_exists().map_err(|e| Error::io(format!("inspect {}", path.display()), e))
	}

	/// Encodes and atomically writes a fragment, replacing any existing file.
	///
	/// The record is encoded before anything touches the disk, and readers only ever see the
	/// old or the new content.
	pub fn write(&self, filename: &Filename, record: &ClientRecord) -> Result<()> {
		let text = codec::encode(record)?;
		let path = self.path_of(filename);

		atomic::write(&self.dir, &path, text.as_bytes(), FRAGMENT_MODE)
			.map_err(|e| Error::io(format!("write {}", path.display()), e))
	}

	/// Removes a fragment; fails with [`Error::NotFound`] if there is none.
	pub fn remove(&self, filename: &Filename) -> Result<()> {
		let path = self.path_of(filename);

		fs::remove_file(&path).map_err(|e| match e.kind() {
			ErrorKind::NotFound => Error::NotFound { filename: filename.clone() },
			_ => Error::io(format!("remove {}", path.display()), e),
		})
	}

	fn read_path(&self, filename: &Filename, path: &Path) -> Result<ClientRecord> {
		let bytes = fs::read(path).map_err(|e| match e.kind() {
			ErrorKind::NotFound => Error::NotFound { filename: filename.clone() },
			_ => Error::io(format!("read {}", path.display()), e),
		})?;

		codec::decode_bytes(bytes).map_err(Error::from)
	}
}

fn skip(listing: &mut ClientListing, name: String, reason: String) {
	#[cfg(feature = "tracing")]
	tracing::warn!(fragment = %name, %reason, "Skipping unreadable client fragment.");

	listing.skipped.push(SkippedFragment { name, reason });
}

fn error_chain(error: &Error) -> String {
	let mut out = error.to_string();
	let mut source = StdError::source(error);

	while let Some(cause) = source {
		out.push_str(": ");
		out.push_str(&cause.to_string());

		source = StdError::source(cause);
	}

	out
}
