use crate::preprocess::Location;
use regex::Regex;
use std::path::PathBuf;

/// Library-level structured errors for classmerge.
///
/// Use `thiserror` for structured errors that library consumers can match on.
/// The CLI binary wraps these with `anyhow` for rich context chains.
#[derive(Debug, thiserror::Error)]
pub enum ClassmergeError {
	#[error("Failed to read settings file: {path}")]
	SettingsReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("Failed to parse settings file: {path}")]
	SettingsParseError {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("Invalid define (expected NAME or NAME=VALUE): {definition}")]
	InvalidDefine { definition: String },

	#[error("Invalid regex pattern: {pattern}")]
	InvalidRegex {
		pattern: String,
		#[source]
		source: regex::Error,
	},

	#[error("Failed to read source file: {path}")]
	SourceReadError {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{location}: include not found: \"{include}\"")]
	IncludeNotFound { include: String, location: Location },

	#[error("Include cycle detected at {path}")]
	IncludeCycle { path: PathBuf },

	#[error("Include depth exceeds {limit} at {path}")]
	IncludeTooDeep { path: PathBuf, limit: usize },

	#[error("{location}: invalid directive: {directive}")]
	InvalidDirective { directive: String, location: Location },

	#[error("{path}: unterminated conditional block")]
	UnterminatedConditional { path: PathBuf },

	#[error("{location}: macro {name} expects {expected} argument(s), got {found}")]
	MacroArity {
		name: String,
		expected: usize,
		found: usize,
		location: Location,
	},

	#[error("{location}: {message}")]
	Syntax { message: String, location: Location },

	#[error("{location}: unexpanded macro {name}")]
	UnexpandedMacro { name: String, location: Location },

	#[error("Class {class} inherits from undefined class {parent}")]
	UndefinedParent { class: String, parent: String },

	#[error("Class {class} is already declared with parent {existing}, cannot change it to {requested}")]
	ConflictingParent {
		class: String,
		existing: String,
		requested: String,
	},

	#[error("Cyclic inheritance involving class {class}")]
	CyclicInheritance { class: String },

	#[error("Cannot delete {name} in {scope}: no such class is visible")]
	DeleteUndefined { scope: String, name: String },

	#[error("Class not found: {path}")]
	ClassNotFound { path: String },

	#[error("Malformed rapified data at offset {offset}: {message}")]
	RapFormat { offset: usize, message: String },

	#[error("Value of {key} does not fit in a 32-bit integer: {value}")]
	IntegerOutOfRange { key: String, value: i64 },
}

/// Result type alias using ClassmergeError.
pub type Result<T> = std::result::Result<T, ClassmergeError>;

/// Compile a regex pattern, reporting the pattern on failure.
pub fn compile_regex(pattern: &str) -> Result<Regex> {
	Regex::new(pattern).map_err(|source| ClassmergeError::InvalidRegex {
		pattern: pattern.to_string(),
		source,
	})
}
