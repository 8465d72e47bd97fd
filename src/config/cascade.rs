use crate::config::parser::parse_settings_file;
use crate::config::template::SETTINGS_FILE_NAME;
use crate::config::types::{DefineWithSource, LoadedSettings, MergedSettings};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Discover and load all settings files in the cascade.
///
/// The cascade order is:
/// 1. Start from `start_dir` and look for `.classmerge.toml`
/// 2. If found and `root = true`, skip to user settings only
/// 3. Otherwise, continue up the directory tree
/// 4. Finally, check ~/.classmerge.toml (unless disabled)
///
/// Returns settings in cascade order (most specific first).
pub fn discover_settings(start_dir: &Path) -> Result<Vec<LoadedSettings>> {
	let mut found = Vec::new();
	let mut current_dir = start_dir.to_path_buf();

	loop {
		let settings_path = current_dir.join(SETTINGS_FILE_NAME);

		if settings_path.exists() {
			let settings = parse_settings_file(&settings_path)?;
			tracing::debug!(path = %settings_path.display(), "loaded settings file");

			if settings.no_external_lookup {
				found.push(LoadedSettings {
					settings,
					path: settings_path,
				});
				return Ok(found);
			}

			let stop = settings.root;
			found.push(LoadedSettings {
				settings,
				path: settings_path,
			});

			if stop {
				break;
			}
		}

		match current_dir.parent() {
			Some(parent) => current_dir = parent.to_path_buf(),
			None => break,
		}
	}

	if let Some(user_settings) = load_user_settings(&found, user_settings_path())? {
		found.push(user_settings);
	}

	Ok(found)
}

/// Load the user's ~/.classmerge.toml if it exists and isn't disabled.
fn load_user_settings(
	existing: &[LoadedSettings],
	user_path: Option<PathBuf>,
) -> Result<Option<LoadedSettings>> {
	for loaded in existing {
		if let Some(ref env_var) = loaded.settings.root_config_lookup_disable_env_var
			&& is_env_truthy(env_var)
		{
			return Ok(None);
		}
	}

	let Some(user_path) = user_path else {
		return Ok(None);
	};

	// The walk up the tree may already have picked up the home directory file.
	if existing.iter().any(|loaded| loaded.path == user_path) {
		return Ok(None);
	}

	if user_path.exists() {
		let settings = parse_settings_file(&user_path)?;
		Ok(Some(LoadedSettings {
			settings,
			path: user_path,
		}))
	} else {
		Ok(None)
	}
}

/// Check if an environment variable is set to a truthy value.
fn is_env_truthy(var_name: &str) -> bool {
	match std::env::var(var_name) {
		Ok(value) => {
			let lower = value.to_lowercase();
			!value.is_empty() && lower != "0" && lower != "false" && lower != "no"
		}
		Err(_) => false,
	}
}

/// Merge multiple settings files into the effective settings.
///
/// Include dirs are concatenated in cascade order and resolved against the
/// directory of the file that declared them. For defines the most specific
/// file wins. `strict` is set if any file sets it.
pub fn merge_settings(found: &[LoadedSettings]) -> MergedSettings {
	let mut merged = MergedSettings::default();

	for loaded in found {
		let base = loaded.path.parent().unwrap_or(Path::new("."));

		for dir in &loaded.settings.include_dirs {
			let dir = if dir.is_absolute() {
				dir.clone()
			} else {
				base.join(dir)
			};
			if !merged.include_dirs.contains(&dir) {
				merged.include_dirs.push(dir);
			}
		}

		for (name, value) in &loaded.settings.defines {
			if merged.define(name).is_none() {
				merged.defines.push(DefineWithSource {
					name: name.clone(),
					value: value.clone(),
					source: loaded.path.clone(),
				});
			}
		}

		merged.strict |= loaded.settings.strict;
	}

	merged
}

/// Convenience function to discover, load, and merge settings from a directory.
pub fn load_merged_settings(start_dir: &Path) -> Result<MergedSettings> {
	let found = discover_settings(start_dir)?;
	Ok(merge_settings(&found))
}

/// Get the path to the user's settings file, if a home directory is known.
pub fn user_settings_path() -> Option<PathBuf> {
	dirs::home_dir().map(|home| home.join(SETTINGS_FILE_NAME))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::types::Settings;
	use std::collections::BTreeMap;

	fn loaded(path: &str, settings: Settings) -> LoadedSettings {
		LoadedSettings {
			settings,
			path: PathBuf::from(path),
		}
	}

	#[test]
	fn test_is_env_truthy() {
		// SAFETY: These env var operations are safe in single-threaded test context
		unsafe {
			std::env::remove_var("TEST_CLASSMERGE_ENV_1");
			assert!(!is_env_truthy("TEST_CLASSMERGE_ENV_1"));

			std::env::set_var("TEST_CLASSMERGE_ENV_2", "");
			assert!(!is_env_truthy("TEST_CLASSMERGE_ENV_2"));

			std::env::set_var("TEST_CLASSMERGE_ENV_3", "FALSE");
			assert!(!is_env_truthy("TEST_CLASSMERGE_ENV_3"));

			std::env::set_var("TEST_CLASSMERGE_ENV_4", "no");
			assert!(!is_env_truthy("TEST_CLASSMERGE_ENV_4"));

			std::env::set_var("TEST_CLASSMERGE_ENV_5", "1");
			assert!(is_env_truthy("TEST_CLASSMERGE_ENV_5"));

			std::env::set_var("TEST_CLASSMERGE_ENV_6", "yes");
			assert!(is_env_truthy("TEST_CLASSMERGE_ENV_6"));

			for i in 1..=6 {
				std::env::remove_var(format!("TEST_CLASSMERGE_ENV_{}", i));
			}
		}
	}

	#[test]
	fn test_merge_most_specific_define_wins() {
		let inner = Settings {
			defines: BTreeMap::from([("MODE".to_string(), "inner".to_string())]),
			..Default::default()
		};
		let outer = Settings {
			defines: BTreeMap::from([
				("MODE".to_string(), "outer".to_string()),
				("EXTRA".to_string(), "1".to_string()),
			]),
			strict: true,
			..Default::default()
		};

		let merged = merge_settings(&[
			loaded("/work/addon/.classmerge.toml", inner),
			loaded("/work/.classmerge.toml", outer),
		]);

		assert_eq!(merged.define("MODE"), Some("inner"));
		assert_eq!(merged.define("EXTRA"), Some("1"));
		assert!(merged.strict);
	}

	#[test]
	fn test_merge_resolves_include_dirs_relative_to_file() {
		let inner = Settings {
			include_dirs: vec![PathBuf::from("include")],
			..Default::default()
		};
		let outer = Settings {
			include_dirs: vec![PathBuf::from("/opt/shared"), PathBuf::from("common")],
			..Default::default()
		};

		let merged = merge_settings(&[
			loaded("/work/addon/.classmerge.toml", inner),
			loaded("/work/.classmerge.toml", outer),
		]);

		assert_eq!(
			merged.include_dirs,
			vec![
				PathBuf::from("/work/addon/include"),
				PathBuf::from("/opt/shared"),
				PathBuf::from("/work/common"),
			]
		);
	}

	#[test]
	fn test_apply_overrides_puts_flags_first() {
		let mut merged = merge_settings(&[loaded(
			"/work/.classmerge.toml",
			Settings {
				include_dirs: vec![PathBuf::from("include")],
				defines: BTreeMap::from([("MODE".to_string(), "file".to_string())]),
				..Default::default()
			},
		)]);

		merged
			.apply_overrides(&[PathBuf::from("/cli")], &["MODE=cli".to_string()])
			.unwrap();

		assert_eq!(merged.include_dirs[0], PathBuf::from("/cli"));
		assert_eq!(merged.define("MODE"), Some("cli"));
		assert_eq!(merged.defines.len(), 1);
	}

	#[test]
	fn test_discover_stops_at_root() {
		let temp_dir = tempfile::tempdir().unwrap();
		let outer = temp_dir.path();
		let inner = outer.join("addon");
		std::fs::create_dir(&inner).unwrap();

		std::fs::write(outer.join(SETTINGS_FILE_NAME), "strict = true\n").unwrap();
		std::fs::write(
			inner.join(SETTINGS_FILE_NAME),
			"root = true\nroot-config-lookup-disable-env-var = \"PATH\"\n",
		)
		.unwrap();

		let found = discover_settings(&inner).unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].path, inner.join(SETTINGS_FILE_NAME));
	}

	#[test]
	fn test_no_external_lookup_ignores_parents() {
		let temp_dir = tempfile::tempdir().unwrap();
		let outer = temp_dir.path();
		let inner = outer.join("addon");
		std::fs::create_dir(&inner).unwrap();

		std::fs::write(outer.join(SETTINGS_FILE_NAME), "strict = true\n").unwrap();
		std::fs::write(inner.join(SETTINGS_FILE_NAME), "no-external-lookup = true\n").unwrap();

		let found = discover_settings(&inner).unwrap();
		assert_eq!(found.len(), 1);
		assert_eq!(found[0].path, inner.join(SETTINGS_FILE_NAME));
		assert!(!merge_settings(&found).strict);
	}

	#[test]
	fn test_user_settings_disabled_by_env_var() {
		let temp_dir = tempfile::tempdir().unwrap();
		let user_path = temp_dir.path().join(SETTINGS_FILE_NAME);
		std::fs::write(&user_path, "strict = true\n").unwrap();

		let existing = [loaded(
			"/work/.classmerge.toml",
			Settings {
				root_config_lookup_disable_env_var: Some("TEST_CLASSMERGE_SKIP_USER".to_string()),
				..Default::default()
			},
		)];

		// SAFETY: These env var operations are safe in single-threaded test context
		unsafe {
			std::env::set_var("TEST_CLASSMERGE_SKIP_USER", "1");
			let skipped = load_user_settings(&existing, Some(user_path.clone())).unwrap();
			assert!(skipped.is_none());

			std::env::set_var("TEST_CLASSMERGE_SKIP_USER", "false");
			let used = load_user_settings(&existing, Some(user_path.clone())).unwrap();
			assert_eq!(used.map(|l| l.path), Some(user_path.clone()));

			std::env::remove_var("TEST_CLASSMERGE_SKIP_USER");
		}

		// A user file already picked up by the directory walk is not loaded twice.
		let walked = [loaded(user_path.to_str().unwrap(), Settings::default())];
		assert!(load_user_settings(&walked, Some(user_path)).unwrap().is_none());
	}

	#[test]
	fn test_user_settings_path() {
		if let Some(path) = user_settings_path() {
			assert!(path.ends_with(".classmerge.toml"));
		}
	}
}
