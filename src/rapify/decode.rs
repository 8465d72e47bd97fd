use super::{
	ENTRY_APPEND, ENTRY_ARRAY, ENTRY_CLASS, ENTRY_DELETE, ENTRY_EXTERNAL, ENTRY_VALUE,
	HEADER_LEN, MAGIC, TYPE_ARRAY, TYPE_FLOAT, TYPE_INT, TYPE_STRING,
};
use crate::error::{ClassmergeError, Result};
use crate::syntax::{ClassDecl, ConfigFile, Entry, Field, FieldOp, Value};
use std::collections::HashSet;

const MAX_DEPTH: usize = 128;

/// Parse a binary class database back into declarations.
pub fn decode(data: &[u8]) -> Result<ConfigFile> {
	let mut reader = Reader {
		data,
		pos: 0,
		bodies: HashSet::new(),
	};
	let magic = reader.take(4)?;
	if magic != MAGIC {
		return Err(ClassmergeError::RapFormat {
			offset: 0,
			message: "missing raP signature".to_string(),
		});
	}
	let _ = reader.u32()?;
	let _ = reader.u32()?;
	let _enum_offset = reader.u32()?;
	reader.bodies.insert(reader.pos);

	let (_, entries) = reader.body(0)?;
	tracing::debug!(bytes = data.len(), "decoded class database");
	Ok(ConfigFile { entries })
}

struct Reader<'a> {
	data: &'a [u8],
	pos: usize,
	/// Offsets of class bodies already decoded; each body belongs to one class.
	bodies: HashSet<usize>,
}

impl<'a> Reader<'a> {
	fn error<T>(&self, message: impl Into<String>) -> Result<T> {
		Err(ClassmergeError::RapFormat {
			offset: self.pos,
			message: message.into(),
		})
	}

	fn take(&mut self, len: usize) -> Result<&'a [u8]> {
		match self.data.get(self.pos..self.pos + len) {
			Some(bytes) => {
				self.pos += len;
				Ok(bytes)
			}
			None => self.error(format!("unexpected end of data reading {len} byte(s)")),
		}
	}

	fn u8(&mut self) -> Result<u8> {
		Ok(self.take(1)?[0])
	}

	fn u32(&mut self) -> Result<u32> {
		let mut bytes = [0u8; 4];
		bytes.copy_from_slice(self.take(4)?);
		Ok(u32::from_le_bytes(bytes))
	}

	fn i32(&mut self) -> Result<i32> {
		let mut bytes = [0u8; 4];
		bytes.copy_from_slice(self.take(4)?);
		Ok(i32::from_le_bytes(bytes))
	}

	fn f32(&mut self) -> Result<f32> {
		let mut bytes = [0u8; 4];
		bytes.copy_from_slice(self.take(4)?);
		Ok(f32::from_le_bytes(bytes))
	}

	fn asciiz(&mut self) -> Result<String> {
		let rest = &self.data[self.pos.min(self.data.len())..];
		let Some(end) = rest.iter().position(|&b| b == 0) else {
			return self.error("unterminated string");
		};
		let text = String::from_utf8_lossy(&rest[..end]).into_owned();
		self.pos += end + 1;
		Ok(text)
	}

	fn compressed(&mut self) -> Result<u32> {
		let mut value = 0u32;
		for shift in (0..35).step_by(7) {
			let byte = self.u8()?;
			value |= u32::from(byte & 0x7f) << shift;
			if byte & 0x80 == 0 {
				return Ok(value);
			}
		}
		self.error("compressed integer is too long")
	}

	fn body(&mut self, depth: usize) -> Result<(Option<String>, Vec<Entry>)> {
		if depth > MAX_DEPTH {
			return self.error(format!("class nesting deeper than {MAX_DEPTH}"));
		}

		let parent = self.asciiz()?;
		let count = self.compressed()?;
		let mut entries = Vec::new();

		for _ in 0..count {
			let entry = match self.u8()? {
				ENTRY_CLASS => {
					let name = self.asciiz()?;
					let offset = self.u32()? as usize;
					let resume = self.pos;
					if offset >= self.data.len() {
						return self.error(format!("class {name} body offset {offset} is out of range"));
					}
					if offset < HEADER_LEN || !self.bodies.insert(offset) {
						return self.error(format!("class {name} body offset {offset} is already in use"));
					}
					self.pos = offset;
					let (parent, body) = self.body(depth + 1)?;
					self.pos = resume;
					Entry::Class(ClassDecl {
						name,
						parent,
						body: Some(body),
					})
				}
				ENTRY_VALUE => {
					let subtype = self.u8()?;
					let key = self.asciiz()?;
					let value = self.scalar(subtype)?;
					Entry::Field(Field::assign(key, value))
				}
				ENTRY_ARRAY => {
					let key = self.asciiz()?;
					Entry::Field(Field::assign(key, self.array(depth)?))
				}
				ENTRY_EXTERNAL => Entry::Class(ClassDecl::forward(self.asciiz()?)),
				ENTRY_DELETE => Entry::Delete(self.asciiz()?),
				ENTRY_APPEND => {
					let _flag = self.u32()?;
					let key = self.asciiz()?;
					Entry::Field(Field {
						key,
						value: self.array(depth)?,
						op: FieldOp::Append,
					})
				}
				other => return self.error(format!("unknown entry type {other}")),
			};
			entries.push(entry);
		}

		let parent = Some(parent).filter(|name| !name.is_empty());
		Ok((parent, entries))
	}

	fn scalar(&mut self, tag: u8) -> Result<Value> {
		match tag {
			TYPE_STRING => Ok(Value::Str(self.asciiz()?)),
			TYPE_FLOAT => Ok(Value::Float(f64::from(self.f32()?))),
			TYPE_INT => Ok(Value::Int(i64::from(self.i32()?))),
			other => self.error(format!("unknown value type {other}")),
		}
	}

	fn array(&mut self, depth: usize) -> Result<Value> {
		if depth > MAX_DEPTH {
			return self.error(format!("array nesting deeper than {MAX_DEPTH}"));
		}

		let count = self.compressed()?;
		let mut items = Vec::new();
		for _ in 0..count {
			let item = match self.u8()? {
				TYPE_ARRAY => self.array(depth + 1)?,
				tag => self.scalar(tag)?,
			};
			items.push(item);
		}
		Ok(Value::Array(items))
	}
}
