/// A scalar or array value on the right-hand side of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Int(i64),
	Float(f64),
	/// String literal or bare word. Script expressions are kept verbatim.
	Str(String),
	Array(Vec<Value>),
}

impl Value {
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	/// Numeric value, converting integers.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Int(v) => Some(*v as f64),
			Value::Float(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::Str(v) => Some(v),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&[Value]> {
		match self {
			Value::Array(items) => Some(items),
			_ => None,
		}
	}
}

/// How a field combines with an inherited value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
	/// `key = value;` replaces any inherited value.
	Assign,
	/// `key[] += {...};` extends the inherited array.
	Append,
}

/// A `key = value;` assignment. Array fields are written `key[]` in source.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	pub key: String,
	pub value: Value,
	pub op: FieldOp,
}

impl Field {
	pub fn assign(key: impl Into<String>, value: Value) -> Self {
		Field {
			key: key.into(),
			value,
			op: FieldOp::Assign,
		}
	}

	pub fn is_array(&self) -> bool {
		matches!(self.value, Value::Array(_))
	}
}

/// A class declaration. Without a body it is a forward declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
	pub name: String,
	pub parent: Option<String>,
	pub body: Option<Vec<Entry>>,
}

impl ClassDecl {
	pub fn forward(name: impl Into<String>) -> Self {
		ClassDecl {
			name: name.into(),
			parent: None,
			body: None,
		}
	}

	pub fn is_forward(&self) -> bool {
		self.body.is_none()
	}

	pub fn entries(&self) -> &[Entry] {
		self.body.as_deref().unwrap_or(&[])
	}
}

/// One statement inside a class body or at file level.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
	Field(Field),
	Class(ClassDecl),
	/// `delete Name;`
	Delete(String),
}

/// A parsed source file: the entries of the implicit root class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
	pub entries: Vec<Entry>,
}

impl ConfigFile {
	/// Count class declarations at every depth, forward declarations included.
	pub fn class_count(&self) -> usize {
		fn count(entries: &[Entry]) -> usize {
			entries
				.iter()
				.map(|entry| match entry {
					Entry::Class(class) => 1 + count(class.entries()),
					_ => 0,
				})
				.sum()
		}
		count(&self.entries)
	}
}
