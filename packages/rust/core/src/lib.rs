//! Description parsing engine for PLSS land descriptions.
//!
//! This crate ties together preprocessing, layout detection, Twp/Rge and
//! section matching, and tract assembly into one call,
//! [`parse_description`], which turns free text such as
//! `T154N-R97W Sec 14: NE/4` into one [`Tract`] per Township/Range/Section.

pub mod assembler;
pub mod cache;
pub mod layout;
pub mod pipeline;
pub mod preprocess;
pub mod section;
pub mod segment;
pub mod tract;
pub mod twprge;

pub use cache::TrsCache;
pub use pipeline::{
    ParsedDescription, ProgressReporter, SilentProgress, parse_batch, parse_description,
    parse_description_cached,
};
pub use tract::Tract;
