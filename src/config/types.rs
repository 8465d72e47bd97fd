use crate::error::{ClassmergeError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level settings from a `.classmerge.toml` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
	/// If true, stop directory cascade and jump directly to ~/.classmerge.toml.
	#[serde(default)]
	pub root: bool,

	/// If true, use only this file and ignore every other settings file.
	#[serde(default)]
	pub no_external_lookup: bool,

	/// Environment variable name that, if truthy, skips ~/.classmerge.toml lookup.
	/// Useful for CI environments.
	#[serde(default)]
	pub root_config_lookup_disable_env_var: Option<String>,

	/// Directories searched for `#include` targets, relative to this file.
	#[serde(default)]
	pub include_dirs: Vec<PathBuf>,

	/// Macros defined before preprocessing starts.
	#[serde(default)]
	pub defines: BTreeMap<String, String>,

	/// Treat unexpanded macro statements as errors instead of warnings.
	#[serde(default)]
	pub strict: bool,
}

/// Settings with the path they were loaded from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
	/// The parsed settings.
	pub settings: Settings,

	/// The path these settings were loaded from.
	pub path: PathBuf,
}

/// A predefined macro with the settings file (or flag) it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DefineWithSource {
	pub name: String,
	pub value: String,
	pub source: PathBuf,
}

/// Effective settings after merging the cascade.
#[derive(Debug, Clone, Default)]
pub struct MergedSettings {
	/// Include search path, most specific first. Already resolved against
	/// the directory of the settings file that declared each entry.
	pub include_dirs: Vec<PathBuf>,

	/// Predefined macros. Names are unique; the most specific file wins.
	pub defines: Vec<DefineWithSource>,

	/// Whether any settings file asked for strict parsing.
	pub strict: bool,
}

/// Check that a macro name is a plain identifier.
pub(crate) fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Settings {
	/// Validate define names.
	pub fn validate(&self) -> Result<()> {
		for name in self.defines.keys() {
			if !is_identifier(name) {
				return Err(ClassmergeError::InvalidDefine {
					definition: name.clone(),
				});
			}
		}
		Ok(())
	}
}

impl MergedSettings {
	/// Apply `-I` and `-D` flags on top of the cascade.
	///
	/// Command-line include dirs are searched first and command-line defines
	/// replace cascade defines of the same name.
	pub fn apply_overrides(&mut self, include_dirs: &[PathBuf], defines: &[String]) -> Result<()> {
		let mut dirs = include_dirs.to_vec();
		dirs.append(&mut self.include_dirs);
		self.include_dirs = dirs;

		for definition in defines {
			let (name, value) = crate::config::parser::parse_define(definition)?;
			self.defines.retain(|d| d.name != name);
			self.defines.push(DefineWithSource {
				name,
				value,
				source: PathBuf::from("<command line>"),
			});
		}
		Ok(())
	}

	/// Look up a predefined macro by name.
	pub fn define(&self, name: &str) -> Option<&str> {
		self.defines
			.iter()
			.find(|d| d.name == name)
			.map(|d| d.value.as_str())
	}
}
