use super::{
	ENTRY_APPEND, ENTRY_ARRAY, ENTRY_CLASS, ENTRY_DELETE, ENTRY_EXTERNAL, ENTRY_VALUE,
	MAGIC, TYPE_ARRAY, TYPE_FLOAT, TYPE_INT, TYPE_STRING, write_compressed,
};
use crate::error::{ClassmergeError, Result};
use crate::syntax::{ConfigFile, Entry, Field, FieldOp, Value};

/// Serialize parsed declarations into the binary class database format.
pub fn encode(file: &ConfigFile) -> Result<Vec<u8>> {
	let mut out = Vec::with_capacity(4096);
	out.extend_from_slice(MAGIC);
	out.extend_from_slice(&0u32.to_le_bytes());
	out.extend_from_slice(&8u32.to_le_bytes());
	out.extend_from_slice(&0u32.to_le_bytes());

	write_body(&mut out, None, &file.entries)?;

	let enum_offset = offset(&out)?;
	patch_u32(&mut out, 12, enum_offset);
	out.extend_from_slice(&0u32.to_le_bytes());

	tracing::debug!(bytes = out.len(), "encoded class database");
	Ok(out)
}

fn offset(out: &[u8]) -> Result<u32> {
	u32::try_from(out.len()).map_err(|_| ClassmergeError::RapFormat {
		offset: out.len(),
		message: "output exceeds 4 GiB".to_string(),
	})
}

fn patch_u32(out: &mut [u8], at: usize, value: u32) {
	out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_asciiz(out: &mut Vec<u8>, text: &str) {
	out.extend_from_slice(text.as_bytes());
	out.push(0);
}

fn write_body(out: &mut Vec<u8>, parent: Option<&str>, entries: &[Entry]) -> Result<()> {
	write_asciiz(out, parent.unwrap_or(""));
	let count = u32::try_from(entries.len()).map_err(|_| ClassmergeError::RapFormat {
		offset: out.len(),
		message: "too many entries in one class".to_string(),
	})?;
	write_compressed(out, count);

	// Bodies follow once this level is complete; remember where to patch their offsets.
	let mut pending = Vec::new();
	for entry in entries {
		match entry {
			Entry::Class(class) => match class.body {
				Some(ref body) => {
					out.push(ENTRY_CLASS);
					write_asciiz(out, &class.name);
					pending.push((out.len(), class.parent.as_deref(), body));
					out.extend_from_slice(&0u32.to_le_bytes());
				}
				None => {
					out.push(ENTRY_EXTERNAL);
					write_asciiz(out, &class.name);
				}
			},
			Entry::Delete(name) => {
				out.push(ENTRY_DELETE);
				write_asciiz(out, name);
			}
			Entry::Field(field) => write_field(out, field)?,
		}
	}

	for (at, parent, body) in pending {
		let start = offset(out)?;
		patch_u32(out, at, start);
		write_body(out, parent, body)?;
	}
	Ok(())
}

fn write_field(out: &mut Vec<u8>, field: &Field) -> Result<()> {
	match (&field.value, field.op) {
		(Value::Array(items), FieldOp::Assign) => {
			out.push(ENTRY_ARRAY);
			write_asciiz(out, &field.key);
			write_array(out, &field.key, items)
		}
		(value, FieldOp::Append) => {
			out.push(ENTRY_APPEND);
			out.extend_from_slice(&1u32.to_le_bytes());
			write_asciiz(out, &field.key);
			match value {
				Value::Array(items) => write_array(out, &field.key, items),
				scalar => write_array(out, &field.key, std::slice::from_ref(scalar)),
			}
		}
		(scalar, FieldOp::Assign) => {
			out.push(ENTRY_VALUE);
			let subtype = match scalar {
				Value::Str(_) => TYPE_STRING,
				Value::Float(_) => TYPE_FLOAT,
				_ => TYPE_INT,
			};
			out.push(subtype);
			write_asciiz(out, &field.key);
			write_scalar(out, &field.key, scalar)
		}
	}
}

fn write_scalar(out: &mut Vec<u8>, key: &str, value: &Value) -> Result<()> {
	match value {
		Value::Str(text) => write_asciiz(out, text),
		Value::Float(v) => out.extend_from_slice(&(*v as f32).to_le_bytes()),
		Value::Int(v) => {
			let narrowed = i32::try_from(*v).map_err(|_| ClassmergeError::IntegerOutOfRange {
				key: key.to_string(),
				value: *v,
			})?;
			out.extend_from_slice(&narrowed.to_le_bytes());
		}
		Value::Array(items) => write_array(out, key, items)?,
	}
	Ok(())
}

fn write_array(out: &mut Vec<u8>, key: &str, items: &[Value]) -> Result<()> {
	let count = u32::try_from(items.len()).map_err(|_| ClassmergeError::RapFormat {
		offset: out.len(),
		message: format!("array {key} is too long"),
	})?;
	write_compressed(out, count);

	for item in items {
		out.push(match item {
			Value::Str(_) => TYPE_STRING,
			Value::Float(_) => TYPE_FLOAT,
			Value::Int(_) => TYPE_INT,
			Value::Array(_) => TYPE_ARRAY,
		});
		write_scalar(out, key, item)?;
	}
	Ok(())
}
