//! Inheritance resolution for parsed class declarations.
//!
//! This module handles:
//! - Building a class table where redeclarations reopen existing classes
//! - Parent lookup through sibling, inherited and enclosing scopes
//! - Memoized field overlay, nested-class override, `delete` and `+=`

pub mod resolved;
pub mod tree;

pub use resolved::{ResolvedClass, ResolvedConfig};
pub use tree::ClassTree;

use crate::error::Result;
use crate::syntax::ConfigFile;

/// Build the class table for `file` and resolve every class in it.
pub fn resolve_file(file: &ConfigFile) -> Result<ResolvedConfig> {
	ClassTree::build(file)?.resolve()
}

/// Names are matched case-insensitively; this is the lookup key.
pub(crate) fn name_key(name: &str) -> String {
	name.to_ascii_lowercase()
}
