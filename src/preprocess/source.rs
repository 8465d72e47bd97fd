use std::fmt;
use std::path::{Path, PathBuf};

/// A position in an original source file (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
	pub path: PathBuf,
	pub line: usize,
	pub column: usize,
}

impl Location {
	pub fn new(path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
		Location {
			path: path.into(),
			line,
			column,
		}
	}
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.column == 0 {
			write!(f, "{}:{}", self.path.display(), self.line)
		} else {
			write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct LineOrigin {
	file: usize,
	line: usize,
}

/// Preprocessor output: expanded text plus the origin of every output line.
#[derive(Debug, Clone, Default)]
pub struct PreprocessedSource {
	text: String,
	files: Vec<PathBuf>,
	origins: Vec<LineOrigin>,
}

impl PreprocessedSource {
	/// The fully expanded text fed to the parser.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// Every file that contributed lines, in first-seen order.
	pub fn files(&self) -> &[PathBuf] {
		&self.files
	}

	/// Number of output lines.
	pub fn line_count(&self) -> usize {
		self.origins.len()
	}

	pub(crate) fn file_index(&mut self, path: &Path) -> usize {
		match self.files.iter().position(|p| p == path) {
			Some(index) => index,
			None => {
				self.files.push(path.to_path_buf());
				self.files.len() - 1
			}
		}
	}

	/// Append one output line originating from `line` of file `file`.
	///
	/// Expanded macros may contain newlines; every produced line maps back to
	/// the same origin.
	pub(crate) fn push_line(&mut self, content: &str, file: usize, line: usize) {
		for part in content.split('\n') {
			self.text.push_str(part);
			self.text.push('\n');
			self.origins.push(LineOrigin { file, line });
		}
	}

	/// Map a 1-based line/column of the expanded text back to its source.
	///
	/// Columns are only meaningful when the line was not changed by macro
	/// expansion, so they are passed through as-is.
	pub fn locate(&self, line: usize, column: usize) -> Location {
		match line.checked_sub(1).and_then(|i| self.origins.get(i)) {
			Some(origin) => Location::new(self.files[origin.file].clone(), origin.line, column),
			// Past the last line (end of input): continue counting in the last file
			None => match self.origins.last() {
				Some(last) => {
					let overflow = line.saturating_sub(self.origins.len());
					Location::new(self.files[last.file].clone(), last.line + overflow, column)
				}
				None => {
					let path = self.files.first().cloned().unwrap_or_default();
					Location::new(path, line, column)
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_locate_maps_through_files() {
		let mut source = PreprocessedSource::default();
		let main = source.file_index(Path::new("config.cpp"));
		let inc = source.file_index(Path::new("support.hpp"));
		source.push_line("class A {};", main, 3);
		source.push_line("class B {};\nclass C {};", inc, 10);
		source.push_line("class D {};", main, 4);

		assert_eq!(source.line_count(), 4);
		assert_eq!(source.locate(1, 7), Location::new("config.cpp", 3, 7));
		assert_eq!(source.locate(3, 1), Location::new("support.hpp", 10, 1));
		assert_eq!(source.locate(4, 0), Location::new("config.cpp", 4, 0));
		assert_eq!(source.files().len(), 2);
		assert_eq!(source.locate(5, 1), Location::new("config.cpp", 5, 1));
	}

	#[test]
	fn test_location_display() {
		assert_eq!(Location::new("a.hpp", 2, 5).to_string(), "a.hpp:2:5");
		assert_eq!(Location::new("a.hpp", 2, 0).to_string(), "a.hpp:2");
	}
}
