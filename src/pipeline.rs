//! Loading a source file from disk through every stage up to resolution.

use crate::config::MergedSettings;
use crate::error::Result;
use crate::preprocess::{PreprocessedSource, Preprocessor};
use crate::resolve::{ClassTree, ResolvedConfig};
use crate::syntax::{ConfigFile, Diagnostic, parse_source};
use std::path::Path;

/// A parsed source file together with the text it was parsed from.
#[derive(Debug)]
pub struct Loaded {
	pub source: PreprocessedSource,
	pub file: ConfigFile,
	pub diagnostics: Vec<Diagnostic>,
}

/// Run the preprocessor over `path` with the include dirs and defines of `settings`.
pub fn preprocess(path: &Path, settings: &MergedSettings) -> Result<PreprocessedSource> {
	let mut preprocessor = Preprocessor::new(settings)?;
	let source = preprocessor.process_file(path)?;
	tracing::debug!(
		path = %path.display(),
		files = source.files().len(),
		lines = source.line_count(),
		macros = preprocessor.macros().len(),
		"preprocessed source"
	);
	Ok(source)
}

/// Preprocess and parse `path`.
pub fn parse(path: &Path, settings: &MergedSettings) -> Result<Loaded> {
	let source = preprocess(path, settings)?;
	let parsed = parse_source(&source, settings.strict)?;
	Ok(Loaded {
		source,
		file: parsed.file,
		diagnostics: parsed.diagnostics,
	})
}

/// Preprocess, parse and resolve `path`.
pub fn load(path: &Path, settings: &MergedSettings) -> Result<(Loaded, ResolvedConfig)> {
	let loaded = parse(path, settings)?;
	let resolved = ClassTree::build(&loaded.file)?.resolve()?;
	Ok((loaded, resolved))
}
