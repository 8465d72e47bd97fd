//! Textual preprocessing of config sources.
//!
//! This module handles:
//! - Comment stripping and line continuations
//! - `#include` resolution with case-insensitive file lookup
//! - `#define` / `#undef` and macro expansion
//! - `#ifdef` / `#ifndef` / `#else` / `#endif`
//! - Mapping every output line back to its source file and line

pub mod directive;
pub mod macros;
pub mod source;

pub use directive::{Directive, parse_directive};
pub use macros::{Macro, MacroTable};
pub use source::{Location, PreprocessedSource};

use crate::config::MergedSettings;
use crate::error::{ClassmergeError, Result, compile_regex};
use regex::Regex;
use std::path::{Component, Path, PathBuf};

/// Deepest allowed `#include` nesting.
pub const MAX_INCLUDE_DEPTH: usize = 32;

const DIRECTIVE_PATTERN: &str = r"^\s*#\s*([A-Za-z_]\w*)\s*(.*)$";

#[derive(Debug)]
struct Condition {
	taken: bool,
	active: bool,
	seen_else: bool,
}

/// Expands includes, macros and conditionals into a single text.
#[derive(Debug)]
pub struct Preprocessor {
	include_dirs: Vec<PathBuf>,
	macros: MacroTable,
	directive_pattern: Regex,
}

impl Preprocessor {
	/// Create a preprocessor seeded with the include dirs and defines of `settings`.
	pub fn new(settings: &MergedSettings) -> Result<Self> {
		let mut macros = MacroTable::new();
		for define in &settings.defines {
			macros.define(Macro::object(&define.name, &define.value));
		}

		Ok(Preprocessor {
			include_dirs: settings.include_dirs.clone(),
			macros,
			directive_pattern: compile_regex(DIRECTIVE_PATTERN)?,
		})
	}

	/// Macros defined so far, including those from processed files.
	pub fn macros(&self) -> &MacroTable {
		&self.macros
	}

	/// Preprocess a file and everything it includes.
	pub fn process_file(&mut self, path: &Path) -> Result<PreprocessedSource> {
		let mut out = PreprocessedSource::default();
		let mut stack = Vec::new();
		self.include_file(path, &mut out, &mut stack)?;
		Ok(out)
	}

	/// Preprocess in-memory content as if it were read from `path`.
	pub fn process_str(&mut self, content: &str, path: &Path) -> Result<PreprocessedSource> {
		let mut out = PreprocessedSource::default();
		let mut stack = vec![include_key(path)];
		self.process_content(content, path, &mut out, &mut stack)?;
		Ok(out)
	}

	fn include_file(
		&mut self,
		path: &Path,
		out: &mut PreprocessedSource,
		stack: &mut Vec<PathBuf>,
	) -> Result<()> {
		let key = include_key(path);
		if stack.contains(&key) {
			return Err(ClassmergeError::IncludeCycle {
				path: path.to_path_buf(),
			});
		}
		if stack.len() >= MAX_INCLUDE_DEPTH {
			return Err(ClassmergeError::IncludeTooDeep {
				path: path.to_path_buf(),
				limit: MAX_INCLUDE_DEPTH,
			});
		}

		let content =
			std::fs::read_to_string(path).map_err(|source| ClassmergeError::SourceReadError {
				path: path.to_path_buf(),
				source,
			})?;

		stack.push(key);
		let result = self.process_content(&content, path, out, stack);
		stack.pop();
		result
	}

	fn process_content(
		&mut self,
		content: &str,
		path: &Path,
		out: &mut PreprocessedSource,
		stack: &mut Vec<PathBuf>,
	) -> Result<()> {
		let file = out.file_index(path);
		let stripped = strip_comments(content);
		let mut conditions: Vec<Condition> = Vec::new();

		for (line_no, line) in logical_lines(&stripped) {
			let location = Location::new(path, line_no, 0);
			let active = conditions.iter().all(|c| c.active);

			let captured = self
				.directive_pattern
				.captures(&line)
				.map(|caps| (caps[1].to_string(), caps[2].to_string()));

			let Some((name, rest)) = captured else {
				if active {
					let expanded = self.macros.expand(&line, &location)?;
					out.push_line(&expanded, file, line_no);
				}
				continue;
			};

			let directive = match parse_directive(&name, &rest) {
				Some(directive) => directive,
				None if !active => continue,
				None => {
					return Err(ClassmergeError::InvalidDirective {
						directive: line.trim().to_string(),
						location,
					});
				}
			};

			if !active && !directive.is_conditional() {
				continue;
			}

			match directive {
				Directive::IfDef(macro_name) => {
					let taken = self.macros.is_defined(&macro_name);
					conditions.push(Condition {
						taken,
						active: taken,
						seen_else: false,
					});
				}
				Directive::IfNDef(macro_name) => {
					let taken = !self.macros.is_defined(&macro_name);
					conditions.push(Condition {
						taken,
						active: taken,
						seen_else: false,
					});
				}
				Directive::Else => match conditions.last_mut() {
					Some(condition) if !condition.seen_else => {
						condition.seen_else = true;
						condition.active = !condition.taken;
					}
					_ => {
						return Err(ClassmergeError::InvalidDirective {
							directive: "#else".to_string(),
							location,
						});
					}
				},
				Directive::EndIf => {
					if conditions.pop().is_none() {
						return Err(ClassmergeError::InvalidDirective {
							directive: "#endif".to_string(),
							location,
						});
					}
				}
				Directive::Include(target) => {
					let resolved = self.resolve_include(&target, path).ok_or_else(|| {
						ClassmergeError::IncludeNotFound {
							include: target.clone(),
							location: location.clone(),
						}
					})?;
					tracing::debug!(
						include = %target,
						resolved = %resolved.display(),
						"resolved include"
					);
					self.include_file(&resolved, out, stack)?;
				}
				Directive::Define(definition) => {
					self.macros.define(definition);
				}
				Directive::Undef(macro_name) => {
					self.macros.undefine(&macro_name);
				}
			}
		}

		if !conditions.is_empty() {
			return Err(ClassmergeError::UnterminatedConditional {
				path: path.to_path_buf(),
			});
		}

		Ok(())
	}

	/// Find the file an `#include` refers to.
	///
	/// Backslashes are path separators. A leading separator makes the path
	/// rooted, so only the include dirs are searched; otherwise the including
	/// file's directory is tried first.
	fn resolve_include(&self, target: &str, from: &Path) -> Option<PathBuf> {
		let normalized = target.replace('\\', "/");
		let rooted = normalized.starts_with('/');
		let relative = Path::new(normalized.trim_start_matches('/'));

		let mut bases = Vec::new();
		if !rooted && let Some(dir) = from.parent() {
			bases.push(dir.to_path_buf());
		}
		bases.extend(self.include_dirs.iter().cloned());

		bases
			.iter()
			.find_map(|base| find_case_insensitive(base, relative))
	}
}

fn include_key(path: &Path) -> PathBuf {
	std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve `relative` under `base`, matching each component case-insensitively
/// when no exact match exists.
fn find_case_insensitive(base: &Path, relative: &Path) -> Option<PathBuf> {
	let mut current = if base.as_os_str().is_empty() {
		PathBuf::from(".")
	} else {
		base.to_path_buf()
	};

	for component in relative.components() {
		match component {
			Component::CurDir => {}
			Component::ParentDir => current.push(".."),
			Component::Normal(name) => {
				let exact = current.join(name);
				if exact.exists() {
					current = exact;
					continue;
				}
				let wanted = name.to_string_lossy().to_lowercase();
				let entry = std::fs::read_dir(&current)
					.ok()?
					.filter_map(|entry| entry.ok())
					.find(|entry| entry.file_name().to_string_lossy().to_lowercase() == wanted)?;
				current = entry.path();
			}
			_ => return None,
		}
	}

	current.is_file().then_some(current)
}

/// Remove `//` and `/* */` comments outside string literals.
///
/// Newlines inside block comments are kept so line numbers stay stable.
fn strip_comments(content: &str) -> String {
	let mut out = String::with_capacity(content.len());
	let mut chars = content.chars().peekable();
	let mut in_string = false;

	while let Some(c) = chars.next() {
		if in_string {
			out.push(c);
			if c == '"' || c == '\n' {
				in_string = false;
			}
			continue;
		}

		match c {
			'"' => {
				in_string = true;
				out.push(c);
			}
			'/' if chars.peek() == Some(&'/') => {
				while chars.peek().is_some_and(|&n| n != '\n') {
					chars.next();
				}
			}
			'/' if chars.peek() == Some(&'*') => {
				chars.next();
				let mut prev = '\0';
				for n in chars.by_ref() {
					if n == '\n' {
						out.push('\n');
					}
					if prev == '*' && n == '/' {
						break;
					}
					prev = n;
				}
			}
			_ => out.push(c),
		}
	}

	out
}

/// Join backslash-continued lines. Each item carries its first line number.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
	let mut lines = Vec::new();
	let mut pending: Option<(usize, String)> = None;

	for (index, raw) in text.lines().enumerate() {
		let (start, mut joined) = pending.take().unwrap_or((index + 1, String::new()));
		let trimmed = raw.trim_end();

		if let Some(head) = trimmed.strip_suffix('\\') {
			joined.push_str(head);
			joined.push(' ');
			pending = Some((start, joined));
		} else {
			joined.push_str(raw);
			lines.push((start, joined));
		}
	}

	if let Some(last) = pending {
		lines.push(last);
	}

	lines
}
