//! Catalog of document formats the conversion engine understands.
//!
//! Formats are plain data: an extension, the MIME type used for responses,
//! and the LibreOffice import/export filter names. The catalog is populated
//! once at startup and only read afterwards.

use serde::{Deserialize, Serialize};

/// Descriptor for a supported document format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    /// Lowercase file extension, e.g. `pdf`.
    pub extension: String,
    /// MIME type sent back to the client.
    pub content_type: String,
    /// Import filter passed as `--infilter=` when this is the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_filter: Option<String>,
    /// Export filter passed to `--convert-to` when this is the destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filter: Option<String>,
}

impl Format {
    /// Create a format with no engine filters.
    pub fn new(extension: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            extension: extension.into().to_lowercase(),
            content_type: content_type.into(),
            input_filter: None,
            output_filter: None,
        }
    }

    pub fn with_input_filter(mut self, filter: impl Into<String>) -> Self {
        self.input_filter = Some(filter.into());
        self
    }

    pub fn with_output_filter(mut self, filter: impl Into<String>) -> Self {
        self.output_filter = Some(filter.into());
        self
    }

    /// Value for `--convert-to`: the export filter, or the bare extension.
    pub fn convert_to_target(&self) -> &str {
        self.output_filter.as_deref().unwrap_or(&self.extension)
    }

    /// Whether this format has the given extension (case-insensitive).
    pub fn matches(&self, extension: &str) -> bool {
        self.extension.eq_ignore_ascii_case(extension)
    }
}

/// Formats shipped with docconv.
fn builtin_formats() -> Vec<Format> {
    vec![
        Format::new("pdf", "application/pdf")
            .with_input_filter("writer_pdf_import")
            .with_output_filter("pdf"),
        Format::new("doc", "application/msword").with_output_filter("doc:MS Word 97"),
        Format::new("odt", "application/vnd.oasis.opendocument.text")
            .with_output_filter("odt:writer8"),
        Format::new(
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        )
        .with_output_filter("docx:Office Open XML Text"),
        Format::new("html", "text/html").with_output_filter("html:HTML (StarWriter):EmbedImages"),
    ]
}

/// Ordered catalog of formats, looked up by extension.
///
/// The first format registered for an extension wins; later entries with the
/// same extension are kept but never returned by [`FormatRegistry::by_extension`].
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<Format>,
}

impl FormatRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in formats.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for format in builtin_formats() {
            registry.register(format);
        }
        registry
    }

    /// Append a format to the catalog, lowercasing its extension.
    ///
    /// Returns `false` when an earlier entry already owns the extension, in
    /// which case the new entry is shadowed.
    pub fn register(&mut self, mut format: Format) -> bool {
        format.extension = format.extension.trim().to_lowercase();
        let shadowed = self.by_extension(&format.extension).is_some();
        if shadowed {
            tracing::warn!(
                "Format '{}' is already registered; the new entry ({}) is shadowed",
                format.extension,
                format.content_type
            );
        }
        self.formats.push(format);
        !shadowed
    }

    /// Look up a format by extension, ignoring case.
    pub fn by_extension(&self, extension: &str) -> Option<&Format> {
        if extension.is_empty() {
            return None;
        }
        self.formats.iter().find(|f| f.matches(extension))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Format> {
        self.formats.iter()
    }

    /// Registered extensions in registration order, duplicates included.
    pub fn extensions(&self) -> Vec<&str> {
        self.formats.iter().map(|f| f.extension.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}
