use crate::error::{ClassmergeError, Result};
use crate::preprocess::source::Location;
use std::collections::HashMap;

/// Nested expansions deeper than this are left unexpanded.
const MAX_EXPANSION_DEPTH: usize = 64;

/// A `#define`d macro.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
	pub name: String,

	/// Parameter names for function-like macros, `None` for object-like ones.
	pub params: Option<Vec<String>>,

	pub body: String,
}

impl Macro {
	pub fn object(name: impl Into<String>, body: impl Into<String>) -> Self {
		Macro {
			name: name.into(),
			params: None,
			body: body.into(),
		}
	}

	pub fn function(name: impl Into<String>, params: Vec<String>, body: impl Into<String>) -> Self {
		Macro {
			name: name.into(),
			params: Some(params),
			body: body.into(),
		}
	}
}

/// The set of macros visible at a point of preprocessing.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
	macros: HashMap<String, Macro>,
}

pub(crate) fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

/// Return the index just past the string literal starting at `start`.
///
/// A doubled quote closes one literal and opens the next, which copies both
/// verbatim, so `""` escapes need no special handling here.
fn skip_string(chars: &[char], start: usize) -> usize {
	let mut i = start + 1;
	while i < chars.len() && chars[i] != '"' {
		i += 1;
	}
	(i + 1).min(chars.len())
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
	let mut end = start;
	while end < chars.len() && is_ident_continue(chars[end]) {
		end += 1;
	}
	(chars[start..end].iter().collect(), end)
}

/// Skip a numeric literal so its suffix letters are not taken for identifiers.
fn skip_number(chars: &[char], start: usize) -> usize {
	let mut end = start;
	while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '.') {
		end += 1;
	}
	end
}

fn followed_by_paste(chars: &[char], mut i: usize) -> bool {
	while i < chars.len() && chars[i].is_whitespace() {
		i += 1;
	}
	chars.get(i) == Some(&'#') && chars.get(i + 1) == Some(&'#')
}

/// Split the argument list whose `(` is at `open`.
///
/// Returns the trimmed arguments and the index just past the closing `)`.
/// Only parentheses nest; commas inside braces separate arguments.
fn collect_args(chars: &[char], open: usize) -> Option<(Vec<String>, usize)> {
	let mut args = Vec::new();
	let mut current = String::new();
	let mut depth = 0usize;
	let mut i = open + 1;

	while i < chars.len() {
		match chars[i] {
			'"' => {
				let end = skip_string(chars, i);
				current.extend(&chars[i..end]);
				i = end;
				continue;
			}
			'(' => {
				depth += 1;
				current.push('(');
			}
			')' if depth == 0 => {
				args.push(current.trim().to_string());
				return Some((args, i + 1));
			}
			')' => {
				depth -= 1;
				current.push(')');
			}
			',' if depth == 0 => {
				args.push(current.trim().to_string());
				current.clear();
			}
			c => current.push(c),
		}
		i += 1;
	}

	None
}

/// Replace parameters in a macro body.
///
/// Operands of `#` and `##` use the raw argument text, every other use gets
/// the pre-expanded argument.
fn substitute(body: &str, params: &[String], raw: &[String], expanded: &[String]) -> String {
	let chars: Vec<char> = body.chars().collect();
	let mut out = String::with_capacity(body.len());
	let mut pasting = false;
	let mut i = 0;

	while i < chars.len() {
		let c = chars[i];

		if c == '#' && chars.get(i + 1) == Some(&'#') {
			out.truncate(out.trim_end().len());
			i += 2;
			while i < chars.len() && chars[i].is_whitespace() {
				i += 1;
			}
			pasting = true;
			continue;
		}

		if c == '#' {
			let mut j = i + 1;
			while j < chars.len() && chars[j] == ' ' {
				j += 1;
			}
			if j < chars.len() && is_ident_start(chars[j]) {
				let (ident, end) = read_ident(&chars, j);
				if let Some(p) = params.iter().position(|param| *param == ident) {
					out.push('"');
					out.push_str(&raw[p]);
					out.push('"');
					i = end;
					pasting = false;
					continue;
				}
			}
			out.push('#');
			i += 1;
			continue;
		}

		if c == '"' {
			let end = skip_string(&chars, i);
			out.extend(&chars[i..end]);
			i = end;
		} else if c.is_ascii_digit() {
			let end = skip_number(&chars, i);
			out.extend(&chars[i..end]);
			i = end;
		} else if is_ident_start(c) {
			let (ident, end) = read_ident(&chars, i);
			match params.iter().position(|param| *param == ident) {
				Some(p) if pasting || followed_by_paste(&chars, end) => out.push_str(&raw[p]),
				Some(p) => out.push_str(&expanded[p]),
				None => out.push_str(&ident),
			}
			i = end;
		} else {
			out.push(c);
			i += 1;
		}
		pasting = false;
	}

	out
}

impl MacroTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Define (or redefine) a macro, returning the previous definition.
	pub fn define(&mut self, definition: Macro) -> Option<Macro> {
		tracing::trace!(name = %definition.name, "define macro");
		self.macros.insert(definition.name.clone(), definition)
	}

	/// Remove a macro. Returns whether it was defined.
	pub fn undefine(&mut self, name: &str) -> bool {
		self.macros.remove(name).is_some()
	}

	pub fn is_defined(&self, name: &str) -> bool {
		self.macros.contains_key(name)
	}

	pub fn get(&self, name: &str) -> Option<&Macro> {
		self.macros.get(name)
	}

	pub fn len(&self) -> usize {
		self.macros.len()
	}

	pub fn is_empty(&self) -> bool {
		self.macros.is_empty()
	}

	/// Expand every macro use in `text`. String literals are left untouched.
	pub fn expand(&self, text: &str, location: &Location) -> Result<String> {
		if self.macros.is_empty() {
			return Ok(text.to_string());
		}
		let mut hidden = Vec::new();
		self.expand_with(text, location, &mut hidden)
	}

	fn expand_with(&self, text: &str, location: &Location, hidden: &mut Vec<String>) -> Result<String> {
		let chars: Vec<char> = text.chars().collect();
		let mut out = String::with_capacity(text.len());
		let mut i = 0;

		while i < chars.len() {
			let c = chars[i];

			if c == '"' {
				let end = skip_string(&chars, i);
				out.extend(&chars[i..end]);
				i = end;
				continue;
			}

			if c.is_ascii_digit() {
				let end = skip_number(&chars, i);
				out.extend(&chars[i..end]);
				i = end;
				continue;
			}

			if !is_ident_start(c) {
				out.push(c);
				i += 1;
				continue;
			}

			let (name, end) = read_ident(&chars, i);
			i = end;

			let definition = match self.macros.get(&name) {
				Some(definition)
					if !hidden.contains(&name) && hidden.len() < MAX_EXPANSION_DEPTH =>
				{
					definition
				}
				_ => {
					out.push_str(&name);
					continue;
				}
			};

			let body = match &definition.params {
				None => definition.body.clone(),
				Some(params) => {
					let mut open = i;
					while open < chars.len() && chars[open].is_whitespace() {
						open += 1;
					}
					if chars.get(open) != Some(&'(') {
						// A function-like macro name without arguments is plain text.
						out.push_str(&name);
						continue;
					}

					let (mut args, close) =
						collect_args(&chars, open).ok_or_else(|| ClassmergeError::Syntax {
							message: format!("unterminated argument list for macro {name}"),
							location: location.clone(),
						})?;
					if params.is_empty() && args.len() == 1 && args[0].is_empty() {
						args.clear();
					}
					if args.len() != params.len() {
						return Err(ClassmergeError::MacroArity {
							name,
							expected: params.len(),
							found: args.len(),
							location: location.clone(),
						});
					}

					let expanded = args
						.iter()
						.map(|arg| self.expand_with(arg, location, hidden))
						.collect::<Result<Vec<_>>>()?;
					i = close;
					substitute(&definition.body, params, &args, &expanded)
				}
			};

			hidden.push(name);
			let result = self.expand_with(&body, location, hidden);
			hidden.pop();
			out.push_str(&result?);
		}

		Ok(out)
	}
}
