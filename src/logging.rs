//! Logging initialisation.
//!
//! Every crate logs through `tracing`. Hosts call [`init`] once to install a
//! `fmt` subscriber; `RUST_LOG` overrides the configured filter.

use tracing_subscriber::EnvFilter;

use crate::settings::LogSettings;

/// Errors raised while installing the subscriber.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
	/// A filter directive is malformed.
	#[error("invalid log filter: {0}")]
	Filter(#[from] tracing_subscriber::filter::ParseError),

	/// A global subscriber is already installed.
	#[error("failed to install log subscriber: {0}")]
	Init(String),
}

/// Builds the filter described by `settings`.
///
/// # Errors
///
/// [`LoggingError::Filter`] if the level or a directive does not parse.
pub fn filter(settings: &LogSettings) -> Result<EnvFilter, LoggingError> {
	let mut directives = vec![settings.level.clone()];
	directives.extend(settings.directives.iter().cloned());
	Ok(EnvFilter::try_new(directives.join(","))?)
}

/// Installs the global subscriber.
///
/// # Errors
///
/// [`LoggingError::Filter`] for a bad configured filter and
/// [`LoggingError::Init`] when a subscriber is already installed.
pub fn init(settings: &LogSettings) -> Result<(), LoggingError> {
	let filter = match EnvFilter::try_from_default_env() {
		Ok(filter) => filter,
		Err(_) => filter(settings)?,
	};
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(settings.ansi)
		.try_init()
		.map_err(|err| LoggingError::Init(err.to_string()))
}
