use crate::error::{ClassmergeError, Result};
use crate::preprocess::{Location, PreprocessedSource};
use crate::syntax::ast::{ClassDecl, ConfigFile, Entry, Field, FieldOp, Value};
use std::path::Path;

/// A non-fatal finding reported while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
	pub message: String,
	pub location: Location,
}

/// Parser output.
#[derive(Debug, Clone, Default)]
pub struct Parsed {
	pub file: ConfigFile,
	pub diagnostics: Vec<Diagnostic>,
}

/// Where parser positions map back to.
enum Origin<'a> {
	Source(&'a PreprocessedSource),
	Path(&'a Path),
}

impl Origin<'_> {
	fn locate(&self, line: usize, column: usize) -> Location {
		match self {
			Origin::Source(source) => source.locate(line, column),
			Origin::Path(path) => Location::new(*path, line, column),
		}
	}
}

/// Parse preprocessed text, reporting locations in the original files.
pub fn parse_source(source: &PreprocessedSource, strict: bool) -> Result<Parsed> {
	Parser::new(source.text(), Origin::Source(source), strict).parse()
}

/// Parse text that needs no preprocessing (useful for testing).
pub fn parse_str(content: &str, path: &Path, strict: bool) -> Result<Parsed> {
	Parser::new(content, Origin::Path(path), strict).parse()
}

struct Parser<'a> {
	chars: Vec<char>,
	pos: usize,
	line: usize,
	column: usize,
	origin: Origin<'a>,
	strict: bool,
	diagnostics: Vec<Diagnostic>,
}

fn is_ident_start(c: char) -> bool {
	c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

/// Classify an unquoted value: integer, float, or bare word.
fn parse_scalar(raw: &str) -> Value {
	let hex = raw
		.strip_prefix("0x")
		.or_else(|| raw.strip_prefix("0X"));
	if let Some(digits) = hex
		&& let Ok(v) = i64::from_str_radix(digits, 16)
	{
		return Value::Int(v);
	}

	if let Ok(v) = raw.parse::<i64>() {
		return Value::Int(v);
	}

	let numeric = raw.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
		&& raw
			.chars()
			.all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
	if numeric && let Ok(v) = raw.parse::<f64>() {
		return Value::Float(v);
	}

	Value::Str(raw.to_string())
}

impl<'a> Parser<'a> {
	fn new(content: &str, origin: Origin<'a>, strict: bool) -> Self {
		Parser {
			chars: content.chars().collect(),
			pos: 0,
			line: 1,
			column: 1,
			origin,
			strict,
			diagnostics: Vec::new(),
		}
	}

	fn parse(mut self) -> Result<Parsed> {
		let entries = self.parse_entries(false)?;
		Ok(Parsed {
			file: ConfigFile { entries },
			diagnostics: self.diagnostics,
		})
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn bump(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += 1;
		if c == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
		Some(c)
	}

	fn skip_whitespace(&mut self) {
		while self.peek().is_some_and(char::is_whitespace) {
			self.bump();
		}
	}

	fn location(&self) -> Location {
		self.origin.locate(self.line, self.column)
	}

	fn error<T>(&self, message: impl Into<String>) -> Result<T> {
		Err(ClassmergeError::Syntax {
			message: message.into(),
			location: self.location(),
		})
	}

	fn describe_next(&self) -> String {
		match self.peek() {
			Some(c) => format!("'{c}'"),
			None => "end of input".to_string(),
		}
	}

	fn expect(&mut self, expected: char) -> Result<()> {
		self.skip_whitespace();
		if self.peek() == Some(expected) {
			self.bump();
			Ok(())
		} else {
			let found = self.describe_next();
			self.error(format!("expected '{expected}', found {found}"))
		}
	}

	fn identifier(&mut self, what: &str) -> Result<String> {
		self.skip_whitespace();
		if !self.peek().is_some_and(is_ident_start) {
			let found = self.describe_next();
			return self.error(format!("expected {what}, found {found}"));
		}
		let mut ident = String::new();
		while let Some(c) = self.peek().filter(|&c| is_ident_continue(c)) {
			ident.push(c);
			self.bump();
		}
		Ok(ident)
	}

	fn parse_entries(&mut self, nested: bool) -> Result<Vec<Entry>> {
		let mut entries = Vec::new();

		loop {
			self.skip_whitespace();
			match self.peek() {
				None if nested => return self.error("expected '}', found end of input"),
				None => return Ok(entries),
				Some('}') if nested => {
					self.bump();
					return Ok(entries);
				}
				Some('}') => return self.error("unexpected '}'"),
				Some(';') => {
					self.bump();
					continue;
				}
				_ => {}
			}

			let start = self.location();
			let word = self.identifier("class, delete or property")?;
			match word.as_str() {
				"class" => entries.push(Entry::Class(self.parse_class()?)),
				"delete" => {
					let name = self.identifier("class name")?;
					self.expect(';')?;
					entries.push(Entry::Delete(name));
				}
				_ => {
					if let Some(field) = self.parse_field(word, start)? {
						entries.push(Entry::Field(field));
					}
				}
			}
		}
	}

	fn parse_class(&mut self) -> Result<ClassDecl> {
		let name = self.identifier("class name")?;
		self.skip_whitespace();

		let parent = if self.peek() == Some(':') {
			self.bump();
			Some(self.identifier("parent class name")?)
		} else {
			None
		};

		self.skip_whitespace();
		match self.peek() {
			Some(';') if parent.is_none() => {
				self.bump();
				Ok(ClassDecl::forward(name))
			}
			Some(';') => self.error(format!(
				"forward declaration of {name} cannot name a parent"
			)),
			Some('{') => {
				self.bump();
				let body = self.parse_entries(true)?;
				self.expect(';')?;
				Ok(ClassDecl {
					name,
					parent,
					body: Some(body),
				})
			}
			_ => {
				let found = self.describe_next();
				self.error(format!("expected '{{' or ';' after class {name}, found {found}"))
			}
		}
	}

	/// Parse the remainder of a statement that started with `key`.
	///
	/// Returns `None` for a skipped macro statement.
	fn parse_field(&mut self, key: String, start: Location) -> Result<Option<Field>> {
		self.skip_whitespace();
		match self.peek() {
			Some('[') => {
				self.bump();
				self.expect(']')?;
				self.skip_whitespace();
				let op = if self.peek() == Some('+') {
					self.bump();
					FieldOp::Append
				} else {
					FieldOp::Assign
				};
				self.expect('=')?;
				self.skip_whitespace();
				if self.peek() != Some('{') {
					let found = self.describe_next();
					return self.error(format!("expected array for {key}[], found {found}"));
				}
				let value = self.parse_array()?;
				self.expect(';')?;
				Ok(Some(Field { key, value, op }))
			}
			Some('=') => {
				self.bump();
				self.skip_whitespace();
				if self.peek() == Some('{') {
					return self.error(format!("array value for {key} requires '{key}[]'"));
				}
				let value = self.parse_value(&[';'])?;
				self.expect(';')?;
				Ok(Some(Field::assign(key, value)))
			}
			Some(';') => {
				self.bump();
				self.unexpanded_macro(key, start)?;
				Ok(None)
			}
			Some('(') => {
				self.skip_balanced_parens()?;
				self.expect(';')?;
				self.unexpanded_macro(key, start)?;
				Ok(None)
			}
			_ => {
				let found = self.describe_next();
				self.error(format!("expected '=' after {key}, found {found}"))
			}
		}
	}

	fn unexpanded_macro(&mut self, name: String, location: Location) -> Result<()> {
		if self.strict {
			return Err(ClassmergeError::UnexpandedMacro { name, location });
		}
		tracing::warn!(%location, macro_name = %name, "skipping unexpanded macro statement");
		self.diagnostics.push(Diagnostic {
			message: format!("unexpanded macro {name} skipped"),
			location,
		});
		Ok(())
	}

	fn skip_balanced_parens(&mut self) -> Result<()> {
		let mut depth = 0usize;
		while let Some(c) = self.bump() {
			match c {
				'(' => depth += 1,
				')' => {
					depth -= 1;
					if depth == 0 {
						return Ok(());
					}
				}
				'"' => {
					self.string_body()?;
				}
				_ => {}
			}
		}
		self.error("unterminated macro arguments")
	}

	/// Read the rest of a string literal after its opening quote.
	fn string_body(&mut self) -> Result<String> {
		let mut value = String::new();
		loop {
			match self.bump() {
				Some('"') if self.peek() == Some('"') => {
					self.bump();
					value.push('"');
				}
				Some('"') => return Ok(value),
				Some(c) => value.push(c),
				None => return self.error("unterminated string"),
			}
		}
	}

	/// Parse a scalar ending at one of `terminators` (not consumed).
	fn parse_value(&mut self, terminators: &[char]) -> Result<Value> {
		self.skip_whitespace();
		if self.peek() == Some('"') {
			self.bump();
			return Ok(Value::Str(self.string_body()?));
		}

		let mut raw = String::new();
		while let Some(c) = self
			.peek()
			.filter(|c| !terminators.contains(c) && *c != '\n')
		{
			raw.push(c);
			self.bump();
		}

		let raw = raw.trim();
		if raw.is_empty() {
			let found = self.describe_next();
			return self.error(format!("expected value, found {found}"));
		}
		Ok(parse_scalar(raw))
	}

	fn parse_array(&mut self) -> Result<Value> {
		self.expect('{')?;
		let mut items = Vec::new();

		loop {
			self.skip_whitespace();
			if self.peek() == Some('}') {
				self.bump();
				return Ok(Value::Array(items));
			}

			let item = if self.peek() == Some('{') {
				self.parse_array()?
			} else {
				self.parse_value(&[',', '}', ';'])?
			};
			items.push(item);

			self.skip_whitespace();
			match self.peek() {
				Some(',') => {
					self.bump();
				}
				Some('}') => {}
				_ => {
					let found = self.describe_next();
					return self.error(format!("expected ',' or '}}' in array, found {found}"));
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(content: &str) -> ConfigFile {
		parse_str(content, Path::new("test.hpp"), false).unwrap().file
	}

	fn class<'e>(entries: &'e [Entry], name: &str) -> &'e ClassDecl {
		entries
			.iter()
			.find_map(|entry| match entry {
				Entry::Class(class) if class.name == name => Some(class),
				_ => None,
			})
			.unwrap()
	}

	fn field<'e>(entries: &'e [Entry], key: &str) -> &'e Field {
		entries
			.iter()
			.find_map(|entry| match entry {
				Entry::Field(field) if field.key == key => Some(field),
				_ => None,
			})
			.unwrap()
	}

	#[test]
	fn test_forward_and_inheriting_classes() {
		let file = parse("class LandVehicle;\nclass Car: LandVehicle {};\nclass Car_F : Car{};");
		assert_eq!(file.entries.len(), 3);

		let land = class(&file.entries, "LandVehicle");
		assert!(land.is_forward());

		let car = class(&file.entries, "Car");
		assert_eq!(car.parent.as_deref(), Some("LandVehicle"));
		assert_eq!(car.body, Some(vec![]));

		assert_eq!(
			class(&file.entries, "Car_F").parent.as_deref(),
			Some("Car")
		);
	}

	#[test]
	fn test_scalar_fields() {
		let file = parse(
			r#"class A {
	transportFuel = 0;
	requiredVersion = 0.1;
	mask = 0x1F;
	big = 1e3;
	negative = -3.35;
	ace_fastroping_friesType = "ACE_friesGantry";
	typeName = BOOL;
};"#,
		);
		let body = class(&file.entries, "A").entries();
		assert_eq!(field(body, "transportFuel").value, Value::Int(0));
		assert_eq!(field(body, "requiredVersion").value, Value::Float(0.1));
		assert_eq!(field(body, "mask").value, Value::Int(31));
		assert_eq!(field(body, "big").value, Value::Float(1000.0));
		assert_eq!(field(body, "negative").value, Value::Float(-3.35));
		assert_eq!(
			field(body, "ace_fastroping_friesType").value,
			Value::Str("ACE_friesGantry".to_string())
		);
		assert_eq!(field(body, "typeName").value, Value::Str("BOOL".to_string()));
	}

	#[test]
	fn test_string_with_doubled_quotes() {
		let file = parse(
			r#"condition = "this doorPhase ""CargoDoorR"" > 0.5 && !(this getVariable ['ace_fastroping_doorsLocked', false])";"#,
		);
		assert_eq!(
			field(&file.entries, "condition").value,
			Value::Str(
				r#"this doorPhase "CargoDoorR" > 0.5 && !(this getVariable ['ace_fastroping_doorsLocked', false])"#
					.to_string()
			)
		);
	}

	#[test]
	fn test_nested_arrays() {
		let file = parse(
			"ace_refuel_hooks[] = {{-1.09, -0.01, -0.5},{1, -0.01, -0.5}};\nunits[] = {};\norigins[] = {\"ropeOriginLeft\", \"ropeOriginRight\",};",
		);

		let hooks = &field(&file.entries, "ace_refuel_hooks").value;
		let hooks = hooks.as_array().unwrap();
		assert_eq!(hooks.len(), 2);
		assert_eq!(
			hooks[0],
			Value::Array(vec![
				Value::Float(-1.09),
				Value::Float(-0.01),
				Value::Float(-0.5)
			])
		);
		assert_eq!(hooks[1].as_array().unwrap()[0], Value::Int(1));

		assert_eq!(field(&file.entries, "units").value, Value::Array(vec![]));
		assert_eq!(
			field(&file.entries, "origins").value.as_array().unwrap().len(),
			2
		);
	}

	#[test]
	fn test_append_and_delete() {
		let file = parse("class B: A { items[] += {1}; delete Turrets; };");
		let body = class(&file.entries, "B").entries();
		assert_eq!(field(body, "items").op, FieldOp::Append);
		assert!(body.contains(&Entry::Delete("Turrets".to_string())));
	}

	#[test]
	fn test_unexpanded_macro_is_diagnostic() {
		let parsed = parse_str(
			"class H {\n\tace_fastroping_enabled = 2;\n\tEQUIP_FRIES_ATTRIBUTE;\n\tOTHER(1, \")\");\n};",
			Path::new("helicopters.hpp"),
			false,
		)
		.unwrap();

		assert_eq!(parsed.diagnostics.len(), 2);
		assert_eq!(parsed.diagnostics[0].location.line, 3);
		assert!(parsed.diagnostics[0].message.contains("EQUIP_FRIES_ATTRIBUTE"));
		assert_eq!(class(&parsed.file.entries, "H").entries().len(), 1);
	}

	#[test]
	fn test_unexpanded_macro_strict_is_error() {
		let result = parse_str("EQUIP_FRIES_ATTRIBUTE;", Path::new("h.hpp"), true);
		match result.unwrap_err() {
			ClassmergeError::UnexpandedMacro { name, location } => {
				assert_eq!(name, "EQUIP_FRIES_ATTRIBUTE");
				assert_eq!(location.line, 1);
				assert_eq!(location.column, 1);
			}
			other => panic!("Expected UnexpandedMacro error, got {other:?}"),
		}
	}

	#[test]
	fn test_syntax_errors_have_locations() {
		let cases = [
			("class A {\n  x = 1;\n", 3),
			("class A {}", 1),
			("class A: B;", 1),
			("x = {1};", 1),
			("x[] = {1, 2;", 1),
			("x = \"open;", 1),
			("\n\n}", 3),
			("x[] = 1;", 1),
			("class {};", 1),
		];

		for (source, line) in cases {
			match parse_str(source, Path::new("bad.hpp"), false) {
				Err(ClassmergeError::Syntax { location, .. }) => {
					assert_eq!(location.line, line, "source: {source:?}");
				}
				other => panic!("Expected syntax error for {source:?}, got {other:?}"),
			}
		}
	}

	#[test]
	fn test_class_count_includes_nested() {
		let file = parse(
			"class Car: LandVehicle { class ACE_Actions { class ACE_MainActions {}; }; };\nclass LandVehicle;",
		);
		assert_eq!(file.class_count(), 4);
	}
}
