use crate::config::types::{Settings, is_identifier};
use crate::error::{ClassmergeError, Result};
use std::path::Path;

/// Parse a settings file from the given path.
pub fn parse_settings_file(path: &Path) -> Result<Settings> {
	let content =
		std::fs::read_to_string(path).map_err(|source| ClassmergeError::SettingsReadError {
			path: path.to_path_buf(),
			source,
		})?;

	parse_settings_str(&content, path)
}

/// Parse settings from a string (useful for testing).
pub fn parse_settings_str(content: &str, path: &Path) -> Result<Settings> {
	let settings: Settings =
		toml::from_str(content).map_err(|source| ClassmergeError::SettingsParseError {
			path: path.to_path_buf(),
			source,
		})?;

	settings.validate()?;

	Ok(settings)
}

/// Parse a `-D` style definition: `NAME` or `NAME=VALUE`.
///
/// A bare name defines the macro as `1`, matching common preprocessor usage.
pub fn parse_define(definition: &str) -> Result<(String, String)> {
	let (name, value) = match definition.split_once('=') {
		Some((name, value)) => (name.trim(), value.to_string()),
		None => (definition.trim(), "1".to_string()),
	};

	if !is_identifier(name) {
		return Err(ClassmergeError::InvalidDefine {
			definition: definition.to_string(),
		});
	}

	Ok((name.to_string(), value))
}
