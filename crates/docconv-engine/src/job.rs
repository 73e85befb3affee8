//! Resolve request metadata into a conversion job.
//!
//! Everything here is pure: resolution never touches the filesystem, so a
//! rejected request never causes a temporary directory to be created.

use std::path::{Path, PathBuf};

use docconv_common::paths::{base_name, split_extension};
use docconv_common::{Error, Format, FormatRegistry, Result};

/// Stem shared by every temporary file of a job.
pub const TEMP_STEM: &str = "conversion";

/// A validated request, not yet bound to a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    original_filename: String,
    source: Format,
    destination: Format,
}

impl ConversionRequest {
    /// Validate the destination token and the Content-Disposition header.
    ///
    /// The destination is checked first so that an unknown output format is
    /// reported even when the header is also missing.
    ///
    /// # Errors
    ///
    /// - [`Error::UnknownFormat`] if either extension is not registered.
    /// - [`Error::MissingMetadata`] if no header was supplied.
    /// - [`Error::MalformedMetadata`] if the header is not
    ///   `<type>; filename="<name>"`.
    pub fn resolve(
        registry: &FormatRegistry,
        content_disposition: Option<&str>,
        destination: &str,
    ) -> Result<Self> {
        let destination = registry
            .by_extension(destination)
            .cloned()
            .ok_or_else(|| Error::unknown_destination(destination))?;

        let header = content_disposition.ok_or(Error::MissingMetadata)?;
        let original_filename = parse_filename(header)?;

        let (_, extension) = split_extension(&original_filename);
        let extension = extension.unwrap_or_default();
        let source = registry
            .by_extension(extension)
            .cloned()
            .ok_or_else(|| Error::unknown_source(extension))?;

        Ok(Self {
            original_filename,
            source,
            destination,
        })
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn source(&self) -> &Format {
        &self.source
    }

    pub fn destination(&self) -> &Format {
        &self.destination
    }

    /// Bind the request to its private working directory.
    pub fn into_job(self, work_dir: &Path) -> ConversionJob {
        let (stem, _) = split_extension(&self.original_filename);
        let output_filename = format!("{}.{}", stem, self.destination.extension);

        ConversionJob {
            input_filename: format!("{}.{}", TEMP_STEM, self.source.extension),
            output_filename: format!("{}.{}", TEMP_STEM, self.destination.extension),
            original_filename: self.original_filename,
            download_filename: output_filename,
            source: self.source,
            destination: self.destination,
            work_dir: work_dir.to_path_buf(),
        }
    }
}

/// Extract the quoted filename from `<type>; filename="<name>"`.
fn parse_filename(header: &str) -> Result<String> {
    let parts: Vec<&str> = header.split(';').collect();
    let [disposition, param] = parts.as_slice() else {
        return Err(Error::malformed(format!(
            "expected 2 ';'-separated parts, found {}",
            parts.len()
        )));
    };

    if disposition.trim().is_empty() {
        return Err(Error::malformed("empty disposition type"));
    }

    let (key, value) = param
        .trim()
        .split_once('=')
        .ok_or_else(|| Error::malformed("missing '=' in filename parameter"))?;

    if !key.trim().eq_ignore_ascii_case("filename") {
        return Err(Error::malformed(format!(
            "expected 'filename' parameter, found '{}'",
            key.trim()
        )));
    }

    let name = value
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| Error::malformed("filename must be double-quoted"))?;

    if name.contains('"') {
        return Err(Error::malformed("filename contains a stray quote"));
    }

    let name = base_name(name);
    if name.is_empty() {
        return Err(Error::malformed("empty filename"));
    }

    Ok(name.to_string())
}

/// One request's unit of work: formats, working directory, and file names.
///
/// Temporary names are always `conversion.<ext>` and never derived from the
/// uploaded filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    original_filename: String,
    download_filename: String,
    input_filename: String,
    output_filename: String,
    source: Format,
    destination: Format,
    work_dir: PathBuf,
}

impl ConversionJob {
    /// Filename as supplied by the client (directory parts stripped).
    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    /// Filename offered to the client for the converted document.
    pub fn download_filename(&self) -> &str {
        &self.download_filename
    }

    pub fn source(&self) -> &Format {
        &self.source
    }

    pub fn destination(&self) -> &Format {
        &self.destination
    }

    /// MIME type of the converted document.
    pub fn response_mime_type(&self) -> &str {
        &self.destination.content_type
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `conversion.<src-ext>`
    pub fn input_filename(&self) -> &str {
        &self.input_filename
    }

    /// `conversion.<dst-ext>`
    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }

    pub fn input_path(&self) -> PathBuf {
        self.work_dir.join(&self.input_filename)
    }

    pub fn output_path(&self) -> PathBuf {
        self.work_dir.join(&self.output_filename)
    }

    /// `<work_dir>/conversion`, the prefix extraction tools write around.
    pub fn stem_path(&self) -> PathBuf {
        self.work_dir.join(TEMP_STEM)
    }
}
