//! Shared types, diagnostics, error model, and configuration for the PLSS parser.
//!
//! This crate is the foundation depended on by all other PLSS crates.
//! It provides:
//! - [`PlssError`]: the unified error type
//! - The [`Trs`] key and [`Layout`] tags
//! - [`Flag`] / [`Diagnostics`]: warning and error accumulation
//! - Configuration ([`ParseConfig`], [`AppConfig`], config loading)

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, OutputConfig, OutputFormat, ParseConfig, RequireColon, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use diagnostics::{Diagnostics, Flag};
pub use error::{PlssError, Result};
pub use types::{
    ERROR_TRS, EastWest, Layout, NorthSouth, Part, Range, Township, Trs, UNDEF_TRS,
};
