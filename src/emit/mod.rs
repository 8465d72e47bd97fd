//! Rendering of parsed and resolved class databases.
//!
//! This module handles:
//! - Canonical config text for declarations and resolved classes
//! - JSON value trees for resolved classes

pub mod json;
pub mod text;

pub use json::{class_to_json, config_to_json};
pub use text::{render_class, render_config, render_file, render_value};
