//! Tool settings for classmerge.
//!
//! This module handles:
//! - `.classmerge.toml` parsing
//! - Directory cascade discovery
//! - Settings merging and command-line overrides
//! - The `--init` template

pub mod cascade;
pub mod parser;
pub mod template;
pub mod types;

pub use cascade::{discover_settings, load_merged_settings, merge_settings, user_settings_path};
pub use parser::{parse_define, parse_settings_file, parse_settings_str};
pub use template::{SETTINGS_FILE_NAME, generate_init_template};
pub use types::{DefineWithSource, LoadedSettings, MergedSettings, Settings};
