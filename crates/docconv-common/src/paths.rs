//! Path utilities for filenames and extensions.
//!
//! These helpers never touch the filesystem. They operate on untrusted names
//! taken from request headers as well as on files produced by the engine.

use std::path::Path;

/// Image extensions and the MIME types used when inlining them.
const IMAGE_MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
];

/// Fallback MIME type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Split a filename into its stem and extension at the last dot.
///
/// Returns `None` for the extension when there is no dot.
///
/// # Examples
///
/// ```
/// use docconv_common::paths::split_extension;
///
/// assert_eq!(split_extension("report.final.odt"), ("report.final", Some("odt")));
/// assert_eq!(split_extension("README"), ("README", None));
/// ```
pub fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (filename, None),
    }
}

/// Strip any directory components from an untrusted filename.
///
/// Both `/` and `\` count as separators so Windows-style names are handled.
///
/// # Examples
///
/// ```
/// use docconv_common::paths::base_name;
///
/// assert_eq!(base_name("../../etc/passwd"), "passwd");
/// assert_eq!(base_name(r"C:\Users\me\report.odt"), "report.odt");
/// ```
pub fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Guess a MIME type from a path's extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use docconv_common::paths::guess_mime_type;
///
/// assert_eq!(guess_mime_type(Path::new("conversion001.png")), "image/png");
/// assert_eq!(guess_mime_type(Path::new("blob")), "application/octet-stream");
/// ```
pub fn guess_mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_MIME_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("report.odt"), ("report", Some("odt")));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_extension("trailing."), ("trailing", Some("")));
        assert_eq!(split_extension(".hidden"), ("", Some("hidden")));
        assert_eq!(split_extension("noext"), ("noext", None));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("report.odt"), "report.odt");
        assert_eq!(base_name("/tmp/report.odt"), "report.odt");
        assert_eq!(base_name("a\\b\\c.doc"), "c.doc");
        assert_eq!(base_name("dir/"), "");
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Path::new("a.png")), "image/png");
        assert_eq!(guess_mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(guess_mime_type(Path::new("dir/a.svg")), "image/svg+xml");
        assert_eq!(guess_mime_type(Path::new("a.xyz")), OCTET_STREAM);
        assert_eq!(guess_mime_type(Path::new("noext")), OCTET_STREAM);
    }
}
