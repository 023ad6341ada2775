//! Reading plain-text files into [`Document`]s.

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use smartdoc_rag::Document;
use tracing::warn;

const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "text"];

/// Read one file. The document id is the path as given.
///
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_document(path: &Path) -> anyhow::Result<Document> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        bail!(
            "{}: unsupported file type; extract PDF or DOCX files to text first",
            path.display()
        );
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %path.display(), "file is not valid UTF-8; replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    Ok(Document::new(path.display().to_string(), text)
        .with_metadata("file_name", file_name)
        .with_source_uri(path.display().to_string()))
}

/// Read every file, failing on the first unreadable one.
pub fn read_documents(paths: &[impl AsRef<Path>]) -> anyhow::Result<Vec<Document>> {
    paths.iter().map(|p| read_document(p.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn reads_text_with_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\n\nSome text.").unwrap();

        let document = read_document(&path).unwrap();
        assert_eq!(document.id, path.display().to_string());
        assert_eq!(document.text, "# Notes\n\nSome text.");
        assert_eq!(document.metadata.get("file_name").map(String::as_str), Some("notes.md"));
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"caf\xe9 menu").unwrap();

        let document = read_document(&path).unwrap();
        assert_eq!(document.text, "caf\u{FFFD} menu");
    }

    #[test]
    fn binary_formats_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF-1.7").unwrap();

        let err = read_document(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }
}
