use crate::error::{Result, compile_regex};
use crate::resolve::{ResolvedClass, ResolvedConfig};
use regex::Regex;

/// Criteria a resolved class must meet to be selected.
#[derive(Debug, Default)]
pub struct ClassSelector {
	/// Compiled pattern matched against the class path.
	pub path_regex: Option<Regex>,

	/// Only select classes that are, or inherit from, this class.
	pub inherits: Option<String>,

	/// Also select classes only known through forward declarations.
	pub include_external: bool,
}

impl ClassSelector {
	/// Build a selector from an optional path pattern and ancestor name.
	pub fn new(pattern: Option<&str>, inherits: Option<&str>) -> Result<Self> {
		Ok(ClassSelector {
			path_regex: pattern.map(compile_regex).transpose()?,
			inherits: inherits.map(str::to_string),
			include_external: false,
		})
	}

	/// Check if a class at `path` is selected.
	pub fn matches(&self, path: &str, class: &ResolvedClass) -> bool {
		if class.is_external() && !self.include_external {
			return false;
		}

		if let Some(ref regex) = self.path_regex
			&& !regex.is_match(path)
		{
			return false;
		}

		if let Some(ref ancestor) = self.inherits
			&& !class.inherits_from(ancestor)
		{
			return false;
		}

		true
	}
}

/// All classes in `config` the selector accepts, depth-first with their paths.
pub fn select_classes<'a>(
	config: &'a ResolvedConfig,
	selector: &ClassSelector,
) -> Vec<(String, &'a ResolvedClass)> {
	config
		.walk()
		.into_iter()
		.filter(|(path, class)| selector.matches(path, class))
		.collect()
}
