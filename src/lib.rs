//! File-backed OAuth 2.0/OIDC client registry for Dex.
//!
//! Each client lives in its own YAML fragment file. The registry validates and persists
//! fragments, generates secrets, and then regenerates Dex's configuration and restarts it,
//! reporting a failed activation separately from a failed write.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod activation;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod obs;
pub mod registry;
pub mod secret;
pub mod store;

pub use activation::{ActivationController, Activator, CommandActivator, RecordingActivator};
pub use client::{ClientFields, ClientRecord, Filename};
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use registry::{ClientRegistry, RegistryStatus};
pub use secret::{ClientSecret, generate_secret};
pub use store::{ClientListing, ClientStore};

mod _prelude {
	pub use std::{
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::Mutex;
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use {color_eyre as _, serde_json as _};
