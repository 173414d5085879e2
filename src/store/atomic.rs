//! Temp-then-rename writes so readers never observe a half-written fragment.

// std
use std::{
	io::{Result as IoResult, Write},
	path::Path,
};
// crates.io
use tempfile::Builder;

/// Prefix of in-flight temp files; the leading dot keeps them out of listings.
pub(super) const TEMP_PREFIX: &str = ".fragment-";

/// Writes `contents` to `target` via a sibling temp file in `dir`, applying `mode` before the
/// rename so the final path never exists with looser permissions.
pub(super) fn write(dir: &Path, target: &Path, contents: &[u8], mode: u32) -> IoResult<()> {
	let mut tmp = Builder::new().prefix(TEMP_PREFIX).suffix(".tmp").tempfile_in(dir)?;

	tmp.write_all(contents)?;

	#[cfg(unix)]
	{
		use std::{fs::Permissions, os::unix::fs::PermissionsExt};

		tmp.as_file().set_permissions(Permissions::from_mode(mode))?;
	}
	#[cfg(not(unix))]
	{
		let _ = mode;
	}

	tmp.as_file().sync_all()?;
	tmp.persist(target).map_err(|e| e.error)?;

	Ok(())
}
