use crate::preprocess::macros::{Macro, is_ident_continue, is_ident_start};

/// A parsed preprocessor directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
	Include(String),
	Define(Macro),
	Undef(String),
	IfDef(String),
	IfNDef(String),
	Else,
	EndIf,
}

impl Directive {
	/// Conditional directives are interpreted even inside inactive blocks.
	pub fn is_conditional(&self) -> bool {
		matches!(
			self,
			Directive::IfDef(_) | Directive::IfNDef(_) | Directive::Else | Directive::EndIf
		)
	}
}

/// Build a directive from its name and the rest of the line.
///
/// Returns `None` for unknown directives or malformed arguments.
pub fn parse_directive(name: &str, rest: &str) -> Option<Directive> {
	let rest = rest.trim();
	match name {
		"include" => parse_include_target(rest).map(Directive::Include),
		"define" => parse_define(rest).map(Directive::Define),
		"undef" => single_name(rest).map(Directive::Undef),
		"ifdef" => single_name(rest).map(Directive::IfDef),
		"ifndef" => single_name(rest).map(Directive::IfNDef),
		"else" if rest.is_empty() => Some(Directive::Else),
		"endif" if rest.is_empty() => Some(Directive::EndIf),
		_ => None,
	}
}

fn parse_include_target(rest: &str) -> Option<String> {
	let (open, close) = match rest.chars().next()? {
		'"' => ('"', '"'),
		'<' => ('<', '>'),
		_ => return None,
	};
	let inner = rest.strip_prefix(open)?;
	let end = inner.find(close)?;
	if !inner[end + 1..].trim().is_empty() || end == 0 {
		return None;
	}
	Some(inner[..end].to_string())
}

fn single_name(rest: &str) -> Option<String> {
	let mut chars = rest.chars();
	let first = chars.next()?;
	if is_ident_start(first) && chars.all(is_ident_continue) {
		Some(rest.to_string())
	} else {
		None
	}
}

/// Parse `NAME body` or `NAME(a, b) body`.
///
/// A function-like macro requires the `(` to follow the name directly.
fn parse_define(rest: &str) -> Option<Macro> {
	let name_end = rest
		.char_indices()
		.find(|&(_, c)| !is_ident_continue(c))
		.map(|(i, _)| i)
		.unwrap_or(rest.len());
	let name = &rest[..name_end];
	if name.is_empty() || !name.starts_with(is_ident_start) {
		return None;
	}

	let after = &rest[name_end..];
	if let Some(params_src) = after.strip_prefix('(') {
		let close = params_src.find(')')?;
		let params: Vec<String> = params_src[..close]
			.split(',')
			.map(|p| p.trim().to_string())
			.filter(|p| !p.is_empty())
			.collect();
		if params.iter().any(|p| single_name(p).is_none()) {
			return None;
		}
		let body = params_src[close + 1..].trim();
		Some(Macro::function(name, params, body))
	} else {
		Some(Macro::object(name, after.trim()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_include_forms() {
		assert_eq!(
			parse_directive("include", "\"Support.hpp\""),
			Some(Directive::Include("Support.hpp".to_string()))
		);
		assert_eq!(
			parse_directive("include", "<\\x\\cba\\main\\script_macros.hpp>"),
			Some(Directive::Include(
				"\\x\\cba\\main\\script_macros.hpp".to_string()
			))
		);
		assert_eq!(parse_directive("include", "Support.hpp"), None);
		assert_eq!(parse_directive("include", "\"a.hpp\" junk"), None);
		assert_eq!(parse_directive("include", "\"\""), None);
	}

	#[test]
	fn test_parse_object_define() {
		assert_eq!(
			parse_directive("define", "_ARMA_"),
			Some(Directive::Define(Macro::object("_ARMA_", "")))
		);
		assert_eq!(
			parse_directive("define", "FUEL   10000"),
			Some(Directive::Define(Macro::object("FUEL", "10000")))
		);
		// A space before the paren makes it part of the body.
		assert_eq!(
			parse_directive("define", "PAREN (1)"),
			Some(Directive::Define(Macro::object("PAREN", "(1)")))
		);
	}

	#[test]
	fn test_parse_function_define() {
		assert_eq!(
			parse_directive("define", "PAIR(a, b) {a, b}"),
			Some(Directive::Define(Macro::function(
				"PAIR",
				vec!["a".to_string(), "b".to_string()],
				"{a, b}"
			)))
		);
		assert_eq!(parse_directive("define", "BAD(a"), None);
		assert_eq!(parse_directive("define", "BAD(1x) y"), None);
	}

	#[test]
	fn test_parse_conditionals() {
		assert_eq!(
			parse_directive("ifdef", "DEBUG"),
			Some(Directive::IfDef("DEBUG".to_string()))
		);
		assert_eq!(
			parse_directive("ifndef", "DEBUG"),
			Some(Directive::IfNDef("DEBUG".to_string()))
		);
		assert_eq!(parse_directive("else", ""), Some(Directive::Else));
		assert_eq!(parse_directive("endif", ""), Some(Directive::EndIf));
		assert_eq!(parse_directive("ifdef", "A B"), None);
		assert!(Directive::Else.is_conditional());
		assert!(!Directive::Undef("A".into()).is_conditional());
	}

	#[test]
	fn test_unknown_directive() {
		assert_eq!(parse_directive("pragma", "once"), None);
	}
}
