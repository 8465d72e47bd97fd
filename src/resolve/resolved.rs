use crate::error::{ClassmergeError, Result};
use crate::resolve::name_key;
use crate::syntax::Value;
use indexmap::IndexMap;
use std::rc::Rc;

/// A class with every inherited field and nested class applied.
#[derive(Debug, Clone, Default)]
pub struct ResolvedClass {
	pub(crate) name: String,
	pub(crate) parent: Option<String>,
	pub(crate) base: Option<Rc<ResolvedClass>>,
	pub(crate) external: bool,
	/// Keyed by lowercase name; the value keeps the declared spelling.
	pub(crate) fields: IndexMap<String, (String, Value)>,
	pub(crate) classes: IndexMap<String, Rc<ResolvedClass>>,
}

impl ResolvedClass {
	pub(crate) fn external(name: &str) -> Self {
		ResolvedClass {
			name: name.to_string(),
			external: true,
			..Default::default()
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The parent name as written in the declaration.
	pub fn parent_name(&self) -> Option<&str> {
		self.parent.as_deref()
	}

	/// The resolved parent class.
	pub fn base(&self) -> Option<&ResolvedClass> {
		self.base.as_deref()
	}

	/// True for classes only known through a forward declaration.
	pub fn is_external(&self) -> bool {
		self.external
	}

	/// Look up a field by key, ignoring case.
	pub fn field(&self, key: &str) -> Option<&Value> {
		self.fields.get(&name_key(key)).map(|(_, value)| value)
	}

	/// Effective fields in declaration order, inherited ones first.
	pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.fields
			.values()
			.map(|(key, value)| (key.as_str(), value))
	}

	pub fn field_count(&self) -> usize {
		self.fields.len()
	}

	/// Look up a nested class by name, ignoring case.
	pub fn class(&self, name: &str) -> Option<&ResolvedClass> {
		self.classes.get(&name_key(name)).map(Rc::as_ref)
	}

	/// Effective nested classes, inherited ones first.
	pub fn classes(&self) -> impl Iterator<Item = &ResolvedClass> {
		self.classes.values().map(Rc::as_ref)
	}

	pub fn class_count(&self) -> usize {
		self.classes.len()
	}

	/// Names along the inheritance chain, nearest parent first.
	pub fn ancestors(&self) -> Vec<&str> {
		let mut chain = Vec::new();
		let mut current = self.base();
		while let Some(class) = current {
			chain.push(class.name());
			current = class.base();
		}
		chain
	}

	/// True if `name` is this class or one of its ancestors.
	pub fn inherits_from(&self, name: &str) -> bool {
		self.name.eq_ignore_ascii_case(name)
			|| self
				.ancestors()
				.iter()
				.any(|ancestor| ancestor.eq_ignore_ascii_case(name))
	}
}

/// The resolved class database of one source file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
	pub(crate) root: Rc<ResolvedClass>,
}

impl ResolvedConfig {
	/// The implicit root class holding top-level fields and classes.
	pub fn root(&self) -> &ResolvedClass {
		&self.root
	}

	/// Number of top-level classes.
	pub fn len(&self) -> usize {
		self.root.class_count()
	}

	pub fn is_empty(&self) -> bool {
		self.root.class_count() == 0
	}

	/// Look up a class by `/`-separated path, ignoring case.
	pub fn class(&self, path: &str) -> Result<&ResolvedClass> {
		path.split('/')
			.filter(|segment| !segment.is_empty())
			.try_fold(self.root.as_ref(), |class, segment| class.class(segment))
			.ok_or_else(|| ClassmergeError::ClassNotFound {
				path: path.to_string(),
			})
	}

	/// Inheritance chain of the class at `path`, nearest parent first.
	pub fn ancestors(&self, path: &str) -> Result<Vec<&str>> {
		Ok(self.class(path)?.ancestors())
	}

	/// Visit every class depth-first with its path, inherited nested classes included.
	pub fn walk(&self) -> Vec<(String, &ResolvedClass)> {
		fn visit<'a>(prefix: &str, class: &'a ResolvedClass, out: &mut Vec<(String, &'a ResolvedClass)>) {
			for child in class.classes() {
				let path = if prefix.is_empty() {
					child.name().to_string()
				} else {
					format!("{prefix}/{}", child.name())
				};
				out.push((path.clone(), child));
				visit(&path, child, out);
			}
		}

		let mut out = Vec::new();
		visit("", &self.root, &mut out);
		out
	}
}
