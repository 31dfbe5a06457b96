//! Settings files and logger installation.

use std::io::Write as _;

use rstest::rstest;
use serial_test::serial;
use tessera::logging::{self, LoggingError};
use tessera::{LogSettings, Settings, SettingsError};
use tessera_pages::HistoryMode;

#[rstest]
fn test_settings_file_is_loaded() {
	// Arrange
	let mut file = tempfile::NamedTempFile::new().unwrap();
	writeln!(file, "[router]\nmode = \"path\"\norigin = \"https://todo.test\"\n\n[document]\ntitle = \"Todos\"").unwrap();

	// Act
	let settings = Settings::from_file(file.path()).unwrap();

	// Assert
	assert_eq!(settings.router.mode, HistoryMode::Path);
	assert_eq!(settings.router.origin.as_deref(), Some("https://todo.test"));
	assert_eq!(settings.document.title, "Todos");
}

#[rstest]
fn test_missing_settings_file_yields_defaults() {
	let dir = tempfile::tempdir().unwrap();
	let settings = Settings::from_file(dir.path().join("absent.toml")).unwrap();
	assert_eq!(settings, Settings::default());
}

#[rstest]
fn test_malformed_settings_file_is_rejected() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	writeln!(file, "[router").unwrap();

	let err = Settings::from_file(file.path()).unwrap_err();

	assert!(matches!(err, SettingsError::Toml(_)));
}

#[rstest]
#[serial(global_subscriber)]
fn test_logger_installs_once() {
	// Arrange
	let settings = LogSettings {
		ansi: false,
		..LogSettings::default()
	};

	// Act
	let first = logging::init(&settings);
	let second = logging::init(&settings);

	// Assert
	assert!(first.is_ok());
	assert!(matches!(second, Err(LoggingError::Init(_))));
}
