//! Parsing of the brace-delimited class syntax.
//!
//! This module handles:
//! - The declaration tree (`ConfigFile`, `ClassDecl`, `Field`, `Value`)
//! - A recursive-descent parser over preprocessed text
//! - Diagnostics for unexpanded macro statements

pub mod ast;
pub mod parser;

pub use ast::{ClassDecl, ConfigFile, Entry, Field, FieldOp, Value};
pub use parser::{Diagnostic, Parsed, parse_source, parse_str};
