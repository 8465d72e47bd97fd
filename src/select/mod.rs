//! Class selection for output commands.
//!
//! This module handles:
//! - Regex matching against slash-separated class paths
//! - Filtering by ancestry and external (forward-only) status

pub mod matcher;

pub use matcher::{ClassSelector, select_classes};
