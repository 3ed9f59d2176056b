//! Text extraction for stored course material.
//!
//! Two kinds are recognised: paginated PDF documents, whose per-page text is
//! joined with blank lines, and everything else, decoded as UTF-8 with
//! undecodable bytes replaced. Extraction either returns the whole text or
//! fails; there is no partial result.

use std::path::Path;

use crate::error::ExtractError;
use crate::models::ContentKind;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Separator placed between the text of consecutive PDF pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Read `path` and extract its text.
pub fn extract_path(path: &Path) -> Result<(String, ContentKind), ExtractError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    extract_bytes(&bytes, &name)
}

/// Extract text from raw bytes. `name` is only used for kind detection.
pub fn extract_bytes(bytes: &[u8], name: &str) -> Result<(String, ContentKind), ExtractError> {
    let kind = detect_kind(bytes, name);
    let text = match kind {
        ContentKind::Pdf => extract_pdf(bytes)?,
        ContentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok((text, kind))
}

/// Extension first, then the `%PDF-` header.
pub fn detect_kind(bytes: &[u8], name: &str) -> ContentKind {
    let by_ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if by_ext || bytes.starts_with(PDF_MAGIC) {
        ContentKind::Pdf
    } else {
        ContentKind::Text
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(pages.join(PAGE_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind_by_extension() {
        assert_eq!(detect_kind(b"hello", "notes.PDF"), ContentKind::Pdf);
        assert_eq!(detect_kind(b"hello", "notes.md"), ContentKind::Text);
        assert_eq!(detect_kind(b"hello", ""), ContentKind::Text);
    }

    #[test]
    fn test_detect_kind_by_magic() {
        assert_eq!(detect_kind(b"%PDF-1.7\n...", "upload.bin"), ContentKind::Pdf);
    }

    #[test]
    fn test_text_is_lossy_utf8() {
        let (text, kind) = extract_bytes(b"caf\xc3\xa9 \xff ok", "a.txt").unwrap();
        assert_eq!(kind, ContentKind::Text);
        assert_eq!(text, "café \u{FFFD} ok");
    }

    #[test]
    fn test_corrupt_pdf_is_error() {
        let result = extract_bytes(b"%PDF-1.4 garbage without xref", "broken.pdf");
        assert!(matches!(result, Err(ExtractError::Pdf(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = extract_path(Path::new("/definitely/not/here.txt"));
        assert!(matches!(result, Err(ExtractError::Io(_))));
    }

    #[test]
    fn test_extract_path_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lab.py");
        std::fs::write(&path, "def main():\n    pass\n").unwrap();
        let (text, kind) = extract_path(&path).unwrap();
        assert_eq!(kind, ContentKind::Text);
        assert!(text.starts_with("def main"));
    }
}
