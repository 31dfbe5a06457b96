//! Application settings.
//!
//! Settings are read from a TOML document. Every field has a default, so an
//! empty document (or a missing file) yields [`Settings::default`].
//!
//! ```toml
//! [router]
//! mode = "path"
//! render_loading_phase = true
//!
//! [document]
//! title = "Todo App"
//!
//! [logging]
//! level = "debug"
//! directives = ["tessera_pages::router=trace"]
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_pages::{DocumentOptions, RouterOptions};

/// Errors raised while loading settings.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("failed to read settings file `{}`: {source}", path.display())]
	Io {
		/// File path.
		path: PathBuf,
		/// Underlying error.
		#[source]
		source: io::Error,
	},

	/// The document is not valid TOML or has wrongly typed fields.
	#[error("invalid settings: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
	/// Default level for every target.
	pub level: String,
	/// Extra `target=level` filter directives.
	pub directives: Vec<String>,
	/// Colorize output.
	pub ansi: bool,
}

impl Default for LogSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			directives: Vec::new(),
			ansi: true,
		}
	}
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	/// Router options.
	pub router: RouterOptions,
	/// Server document shell options.
	pub document: DocumentOptions,
	/// Logging options.
	pub logging: LogSettings,
}

impl Settings {
	/// Parses settings from a TOML string.
	///
	/// # Errors
	///
	/// [`SettingsError::Toml`] on malformed input.
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	/// Loads settings from a TOML file. A missing file yields the defaults.
	///
	/// # Errors
	///
	/// [`SettingsError::Io`] if the file exists but cannot be read, and
	/// [`SettingsError::Toml`] on malformed content.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		if !path.exists() {
			tracing::debug!(path = %path.display(), "settings file not found; using defaults");
			return Ok(Self::default());
		}
		let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}
}
