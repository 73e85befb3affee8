//! Embed extracted images into generated HTML.
//!
//! `pdftohtml -c` writes one HTML file plus a PNG/JPEG per page background
//! or picture. Clients get exactly one file back, so every local image
//! reference is rewritten into a `data:` URI and the HTML is re-emitted
//! under the job's output name.

use std::path::{Component, Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use docconv_common::paths::guess_mime_type;
use docconv_common::{ConversionLog, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static RE_SRC: Lazy<Regex> = Lazy::new(|| Regex::new(r#"src="(.*?)""#).unwrap());

/// Rewrite `intermediate` into `output` with local images inlined.
///
/// Files are treated as Latin-1 so that arbitrary bytes survive the round
/// trip unchanged. A missing `intermediate` is not an error: the extractor
/// simply failed this attempt and the supervisor will notice the missing
/// output. The intermediate file is deleted once `output` is written.
pub fn inline_images(
    intermediate: &Path,
    output: &Path,
    base_dir: &Path,
    log: &mut ConversionLog,
) -> Result<()> {
    if !intermediate.is_file() {
        return Ok(());
    }

    let raw = std::fs::read(intermediate)?;
    let html = decode_latin1(&raw);

    let rewritten = RE_SRC.replace_all(&html, |caps: &Captures<'_>| {
        let reference = &caps[1];
        let Some(path) = local_reference(base_dir, reference) else {
            return caps[0].to_string();
        };

        log.push(format!("Inlining image: {}", path.display()));
        match std::fs::read(&path) {
            Ok(bytes) => format!(
                r#"src="data:{};base64,{}""#,
                guess_mime_type(&path),
                STANDARD.encode(bytes)
            ),
            Err(e) => {
                log.push(format!("Cannot read {}: {e}", path.display()));
                caps[0].to_string()
            }
        }
    });

    std::fs::write(output, encode_latin1(&rewritten))?;
    std::fs::remove_file(intermediate)?;
    Ok(())
}

/// Resolve `reference` to an existing file strictly inside `base_dir`.
fn local_reference(base_dir: &Path, reference: &str) -> Option<PathBuf> {
    if reference.is_empty() || reference.contains(':') || reference.contains('\\') {
        return None;
    }

    let relative = Path::new(reference);
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let path = base_dir.join(relative);
    path.is_file().then_some(path)
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    struct Fixture {
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new(html: &[u8]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(dir.path().join("conversion-html.html"), html).unwrap();
            Self { dir }
        }

        fn intermediate(&self) -> PathBuf {
            self.dir.path().join("conversion-html.html")
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("conversion.html")
        }

        fn run(&self) -> ConversionLog {
            let mut log = ConversionLog::new();
            inline_images(&self.intermediate(), &self.output(), self.dir.path(), &mut log)
                .unwrap();
            log
        }
    }

    #[test]
    fn inlines_local_png() {
        let fixture = Fixture::new(br#"<img src="conversion001.png" alt="page">"#);
        fs::write(fixture.dir.path().join("conversion001.png"), PNG_BYTES).unwrap();

        let log = fixture.run();

        let html = fs::read_to_string(fixture.output()).unwrap();
        let expected = format!(
            r#"<img src="data:image/png;base64,{}" alt="page">"#,
            STANDARD.encode(PNG_BYTES)
        );
        assert_eq!(html, expected);
        assert!(!fixture.intermediate().exists());
        assert_eq!(log.len(), 1);
        assert!(log.lines()[0].starts_with("Inlining image: "));
    }

    #[test]
    fn leaves_missing_and_remote_references() {
        let html = concat!(
            r#"<img src="missing.png">"#,
            r#"<img src="https://example.org/a.png">"#,
            r#"<img src="data:image/png;base64,AAAA">"#,
            r#"<img src="">"#
        );
        let fixture = Fixture::new(html.as_bytes());

        let log = fixture.run();

        assert_eq!(fs::read_to_string(fixture.output()).unwrap(), html);
        assert!(log.is_empty());
    }

    #[test]
    fn refuses_references_outside_workspace() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.png"), PNG_BYTES).unwrap();

        let work = outer.path().join("job");
        fs::create_dir(&work).unwrap();
        let html = format!(
            r#"<img src="../secret.png"><img src="{}">"#,
            outer.path().join("secret.png").display()
        );
        fs::write(work.join("conversion-html.html"), &html).unwrap();

        let mut log = ConversionLog::new();
        inline_images(
            &work.join("conversion-html.html"),
            &work.join("conversion.html"),
            &work,
            &mut log,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(work.join("conversion.html")).unwrap(), html);
        assert!(log.is_empty());
    }

    #[test]
    fn preserves_latin1_bytes() {
        let mut html = b"<p>caf".to_vec();
        html.push(0xe9);
        html.extend_from_slice(b"</p>");
        let fixture = Fixture::new(&html);

        fixture.run();

        assert_eq!(fs::read(fixture.output()).unwrap(), html);
    }

    #[test]
    fn missing_intermediate_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ConversionLog::new();
        inline_images(
            &dir.path().join("conversion-html.html"),
            &dir.path().join("conversion.html"),
            dir.path(),
            &mut log,
        )
        .unwrap();
        assert!(!dir.path().join("conversion.html").exists());
        assert!(log.is_empty());
    }

    #[test]
    fn infers_jpeg_mime_type() {
        let fixture = Fixture::new(br#"<img src="./photo.JPG">"#);
        fs::write(fixture.dir.path().join("photo.JPG"), b"jpeg").unwrap();

        fixture.run();

        let html = fs::read_to_string(fixture.output()).unwrap();
        assert!(html.starts_with(r#"<img src="data:image/jpeg;base64,"#));
    }
}
