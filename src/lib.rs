//! Classmerge - preprocessor, parser and inheritance resolver for class configs.
//!
//! This library provides the core functionality for classmerge, including:
//! - Settings file parsing and cascade discovery
//! - Preprocessing of `#include`, `#define` and conditional directives
//! - Parsing of brace-delimited class declarations
//! - Resolution of single inheritance with field overlay
//! - Text/JSON rendering and the binary `raP` codec
//!
//! # Example
//!
//! ```no_run
//! use classmerge_cli::config::load_merged_settings;
//! use classmerge_cli::pipeline::load;
//! use std::path::Path;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let settings = load_merged_settings(&cwd).unwrap();
//! let (_, resolved) = load(Path::new("config.cpp"), &settings).unwrap();
//!
//! let refuel = resolved.class("CfgVehicles/CUP_MTVR_Refuel_Base").unwrap();
//! println!("{:?}", refuel.field("ace_refuel_fuelCargo"));
//! println!("inherits from {:?}", refuel.ancestors());
//! ```

pub mod config;
pub mod emit;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod preprocess;
pub mod rapify;
pub mod resolve;
pub mod select;
pub mod syntax;

pub use error::{ClassmergeError, Result};
