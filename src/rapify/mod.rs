//! Binary class database (`config.bin`) codec.
//!
//! Format (little-endian):
//! - `\0raP`, u32 0, u32 8, u32 offset of the enum table
//! - root class body, then nested class bodies depth-first
//! - class body: asciiz parent name, compressed entry count, entries
//! - enum table: u32 count, always written empty
//!
//! Entry types: 0 class (asciiz name, u32 body offset), 1 scalar
//! (subtype 0 string, 1 f32, 2 i32; asciiz name; value), 2 array,
//! 3 external class, 4 delete, 5 array append (u32 flag, name, array).
//! Array elements are tagged 0 string, 1 f32, 2 i32, 3 nested array.
//!
//! Floats are stored as f32, so decoded values carry f32 precision.

pub mod decode;
pub mod encode;

pub use decode::decode;
pub use encode::encode;

pub(crate) const MAGIC: &[u8; 4] = b"\0raP";
pub(crate) const HEADER_LEN: usize = 16;

pub(crate) const ENTRY_CLASS: u8 = 0;
pub(crate) const ENTRY_VALUE: u8 = 1;
pub(crate) const ENTRY_ARRAY: u8 = 2;
pub(crate) const ENTRY_EXTERNAL: u8 = 3;
pub(crate) const ENTRY_DELETE: u8 = 4;
pub(crate) const ENTRY_APPEND: u8 = 5;

pub(crate) const TYPE_STRING: u8 = 0;
pub(crate) const TYPE_FLOAT: u8 = 1;
pub(crate) const TYPE_INT: u8 = 2;
pub(crate) const TYPE_ARRAY: u8 = 3;

/// Append a 7-bit little-endian varint.
pub(crate) fn write_compressed(out: &mut Vec<u8>, mut value: u32) {
	loop {
		let byte = (value & 0x7f) as u8;
		value >>= 7;
		if value == 0 {
			out.push(byte);
			return;
		}
		out.push(byte | 0x80);
	}
}
