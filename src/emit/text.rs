use crate::resolve::{ResolvedClass, ResolvedConfig};
use crate::syntax::{ClassDecl, ConfigFile, Entry, Field, FieldOp, Value};
use std::fmt::Write;

/// Render a value the way it is written on the right-hand side of a field.
pub fn render_value(value: &Value) -> String {
	let mut out = String::new();
	write_value(&mut out, value);
	out
}

fn write_value(out: &mut String, value: &Value) {
	match value {
		Value::Int(v) => {
			let _ = write!(out, "{v}");
		}
		// Debug keeps a fractional part, so the text reads back as a float
		Value::Float(v) => {
			let _ = write!(out, "{v:?}");
		}
		Value::Str(v) => {
			out.push('"');
			out.push_str(&v.replace('"', "\"\""));
			out.push('"');
		}
		Value::Array(items) => {
			out.push('{');
			for (i, item) in items.iter().enumerate() {
				if i > 0 {
					out.push_str(", ");
				}
				write_value(out, item);
			}
			out.push('}');
		}
	}
}

fn indent(out: &mut String, depth: usize) {
	for _ in 0..depth {
		out.push('\t');
	}
}

fn write_field(out: &mut String, depth: usize, key: &str, value: &Value, op: FieldOp) {
	indent(out, depth);
	out.push_str(key);
	if matches!(value, Value::Array(_)) {
		out.push_str("[]");
	}
	out.push_str(match op {
		FieldOp::Assign => " = ",
		FieldOp::Append => " += ",
	});
	write_value(out, value);
	out.push_str(";\n");
}

fn write_header(out: &mut String, depth: usize, name: &str, parent: Option<&str>) {
	indent(out, depth);
	out.push_str("class ");
	out.push_str(name);
	if let Some(parent) = parent {
		out.push_str(": ");
		out.push_str(parent);
	}
}

/// Render parsed declarations back to config text.
pub fn render_file(file: &ConfigFile) -> String {
	let mut out = String::new();
	write_entries(&mut out, 0, &file.entries);
	out
}

fn write_entries(out: &mut String, depth: usize, entries: &[Entry]) {
	for entry in entries {
		match entry {
			Entry::Field(Field { key, value, op }) => write_field(out, depth, key, value, *op),
			Entry::Class(class) => write_decl(out, depth, class),
			Entry::Delete(name) => {
				indent(out, depth);
				let _ = writeln!(out, "delete {name};");
			}
		}
	}
}

fn write_decl(out: &mut String, depth: usize, class: &ClassDecl) {
	write_header(out, depth, &class.name, class.parent.as_deref());
	match class.body {
		None => out.push_str(";\n"),
		Some(ref entries) if entries.is_empty() => out.push_str(" {};\n"),
		Some(ref entries) => {
			out.push('\n');
			indent(out, depth);
			out.push_str("{\n");
			write_entries(out, depth + 1, entries);
			indent(out, depth);
			out.push_str("};\n");
		}
	}
}

/// Render one resolved class with every effective field flattened into it.
pub fn render_class(class: &ResolvedClass) -> String {
	let mut out = String::new();
	write_resolved(&mut out, 0, class);
	out
}

/// Render a whole resolved database.
pub fn render_config(config: &ResolvedConfig) -> String {
	let mut out = String::new();
	write_members(&mut out, 0, config.root());
	out
}

fn write_members(out: &mut String, depth: usize, class: &ResolvedClass) {
	for (key, value) in class.fields() {
		write_field(out, depth, key, value, FieldOp::Assign);
	}
	for child in class.classes() {
		write_resolved(out, depth, child);
	}
}

fn write_resolved(out: &mut String, depth: usize, class: &ResolvedClass) {
	write_header(out, depth, class.name(), class.parent_name());
	if class.is_external() {
		out.push_str(";\n");
	} else if class.field_count() == 0 && class.class_count() == 0 {
		out.push_str(" {};\n");
	} else {
		out.push('\n');
		indent(out, depth);
		out.push_str("{\n");
		write_members(out, depth + 1, class);
		indent(out, depth);
		out.push_str("};\n");
	}
}
