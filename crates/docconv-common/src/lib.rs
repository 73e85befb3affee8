//! Docconv-Common: shared types and utilities.
//!
//! This crate provides the pieces every other docconv crate leans on:
//!
//! - **Formats**: the [`Format`] descriptor and the [`FormatRegistry`] catalog
//! - **Conversion logs**: [`ConversionLog`], the diagnostic transcript of a job
//! - **Path Utilities**: extension splitting and MIME guessing by extension
//! - **Error Handling**: the [`Error`] taxonomy and [`Result`] alias
//!
//! # Examples
//!
//! ```
//! use docconv_common::{Error, FormatRegistry, Result};
//!
//! let registry = FormatRegistry::builtin();
//! let docx = registry.by_extension("DOCX").unwrap();
//! assert_eq!(docx.extension, "docx");
//!
//! fn example() -> Result<()> {
//!     Err(Error::MissingMetadata)
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod formats;
pub mod log;
pub mod paths;

pub use error::{Error, FormatRole, Result};
pub use formats::{Format, FormatRegistry};
pub use log::ConversionLog;
